//! The declarative flag and pipeline schema read from the config file.

mod flag;
mod pass;

use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

pub use self::{
    flag::{EnumFlag, Flag, GuessNumber, GuessParams, Scaling, SwitchFlag, ValueFlag, ValueType},
    pass::Pass,
};
use self::pass::{RawPassToken, Template};
use crate::error::ConfigError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    passes: Vec<Vec<RawPassToken>>,
    required_args: Vec<String>,
    #[serde(default)]
    enums: IndexMap<String, EnumFlag>,
    #[serde(default)]
    switches: IndexMap<String, SwitchFlag>,
    #[serde(default)]
    values: IndexMap<String, ValueFlag>,
}

/// A validated schema. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct CmdConfig {
    pub passes: Vec<Pass>,
    pub required_args: Vec<String>,
    pub enums: IndexMap<String, EnumFlag>,
    pub switches: IndexMap<String, SwitchFlag>,
    pub values: IndexMap<String, ValueFlag>,
}

impl CmdConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&source).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(source)?;
        Ok(Self::from_raw(raw)?)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let RawConfig {
            passes,
            required_args,
            mut enums,
            mut switches,
            mut values,
        } = raw;

        for (name, flag) in &mut enums {
            flag.name.clone_from(name);
        }
        for (name, flag) in &mut switches {
            flag.name.clone_from(name);
        }
        for (name, flag) in &mut values {
            flag.name.clone_from(name);
        }

        if passes.is_empty() {
            return Err(ConfigError::NoPasses);
        }
        let passes = passes
            .into_iter()
            .enumerate()
            .map(|(i, pass)| Pass::from_raw(i, pass))
            .collect::<Result<Vec<_>, _>>()?;

        let config = Self {
            passes,
            required_args,
            enums,
            switches,
            values,
        };
        config.check_arg_templates()?;
        config.check_default_options()?;
        config.check_flag_names()?;
        config.map_flag_aliases()?;
        Ok(config)
    }

    /// Extra args are rendered like pass tokens, so they must parse too.
    fn check_arg_templates(&self) -> Result<(), ConfigError> {
        let option_args = self
            .enums
            .values()
            .flat_map(|flag| flag.options.values())
            .flat_map(|option| &option.args);
        let switch_args = self.switches.values().flat_map(|flag| &flag.args);
        let value_args = self.values.values().flat_map(|flag| &flag.args);

        for arg in self
            .required_args
            .iter()
            .chain(option_args)
            .chain(switch_args)
            .chain(value_args)
        {
            Template::parse(arg)?;
        }
        Ok(())
    }

    fn check_default_options(&self) -> Result<(), ConfigError> {
        for flag in self.enums.values() {
            let defaults: Vec<String> = flag.default_names().map(str::to_owned).collect();
            match defaults.len() {
                1 => (),
                0 => {
                    return Err(ConfigError::NoDefaultOption {
                        flag: flag.name.clone(),
                    });
                }
                _ => {
                    return Err(ConfigError::MultipleDefaultOptions {
                        flag: flag.name.clone(),
                        options: defaults,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_flag_names(&self) -> Result<(), ConfigError> {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for flag in self.flags() {
            *counts.entry(flag.name()).or_default() += 1;
        }
        let duplicates: Vec<String> = counts
            .into_iter()
            .filter(|&(_, count)| count > 1)
            .map(|(name, _)| name.to_owned())
            .collect();
        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::DuplicateFlagName(duplicates))
        }
    }

    /// Every flag, values first, then switches, then enums, each in
    /// declaration order. This is also the order flags are applied in, so an
    /// enum option's placeholders override value defaults.
    pub fn flags(&self) -> impl Iterator<Item = Flag<'_>> {
        self.values
            .values()
            .map(Flag::Value)
            .chain(self.switches.values().map(Flag::Switch))
            .chain(self.enums.values().map(Flag::Enum))
    }

    /// Maps each alias to the flag it selects.
    pub fn map_flag_aliases(&self) -> Result<HashMap<&str, Flag<'_>>, ConfigError> {
        let mut aliases = HashMap::new();
        for flag in self.flags() {
            for alias in flag.aliases() {
                if aliases.insert(alias.as_str(), flag).is_some() {
                    return Err(ConfigError::DuplicateAlias {
                        alias: alias.clone(),
                        flag: flag.name().to_owned(),
                    });
                }
            }
        }
        Ok(aliases)
    }

    /// Names of values the size search can drive.
    pub fn guessable_values(&self) -> impl Iterator<Item = &str> {
        self.values
            .values()
            .filter(|flag| flag.guess_params.is_some())
            .map(|flag| flag.name.as_str())
    }
}
