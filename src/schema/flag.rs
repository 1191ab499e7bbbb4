use std::fmt::Display;

use indexmap::IndexMap;
use num_traits::{Num, NumCast};
use serde::Deserialize;

use crate::{error::ArgError, params::CmdParams};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumOption {
    pub description: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub placeholders: IndexMap<String, String>,
}

impl EnumOption {
    pub fn apply(&self, params: &mut CmdParams) {
        params.extend_args(&self.args);
        params.merge_placeholders(&self.placeholders);
    }
}

/// Picks one of several named options, falling back to the default one.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumFlag {
    /// Assigned from the config key after loading.
    #[serde(skip)]
    pub name: String,
    pub description: String,
    pub aliases: Vec<String>,
    pub options: IndexMap<String, EnumOption>,
}

impl EnumFlag {
    /// Names of every option marked as default.
    pub fn default_names(&self) -> impl Iterator<Item = &str> {
        self.options
            .iter()
            .filter(|&(_, option)| option.default)
            .map(|(name, _)| name.as_str())
    }

    /// The single default option. Only `None` for an unvalidated flag.
    #[must_use]
    pub fn default_option(&self) -> Option<&EnumOption> {
        self.options.values().find(|option| option.default)
    }

    fn apply(&self, args: Option<&[String]>, params: &mut CmdParams) -> Result<(), ArgError> {
        let Some(option_name) = args.and_then(<[String]>::first) else {
            self.default_option()
                .expect("exactly one default option is checked at load")
                .apply(params);
            return Ok(());
        };

        let option = self
            .options
            .get(option_name)
            .ok_or_else(|| ArgError::UnknownOption {
                flag: self.name.clone(),
                option: option_name.clone(),
            })?;
        option.apply(params);
        Ok(())
    }
}

/// Adds fixed args when given (or when missing, if `inverted`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchFlag {
    #[serde(skip)]
    pub name: String,
    pub description: String,
    pub aliases: Vec<String>,
    #[serde(default)]
    pub inverted: bool,
    pub args: Vec<String>,
}

impl SwitchFlag {
    fn apply(&self, args: Option<&[String]>, params: &mut CmdParams) {
        if args.is_some() ^ self.inverted {
            params.extend_args(&self.args);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[serde(alias = "integer")]
    Int,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scaling {
    /// Bigger values make bigger files.
    Direct,
    /// Bigger values make smaller files.
    Inverse,
}

impl Scaling {
    #[must_use]
    pub const fn is_inverse(self) -> bool {
        matches!(self, Self::Inverse)
    }
}

/// Bounds and behaviour of a value the size search may drive.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuessParams {
    pub min: f64,
    pub max: f64,
    #[serde(rename = "type")]
    pub kind: ValueType,
    pub scaling: Scaling,
}

/// A number the search can bisect over.
pub trait GuessNumber: Num + NumCast + PartialOrd + Copy + Display {
    /// Canonical textual form handed to the encoder.
    fn format(self) -> String;

    fn parse(text: &str) -> Option<Self>;

    #[must_use]
    fn halfway(low: Self, high: Self) -> Self {
        low + (high - low) / (Self::one() + Self::one())
    }
}

impl GuessNumber for i64 {
    fn format(self) -> String {
        self.to_string()
    }

    fn parse(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }

    // `high - low` overflows for brackets wider than `i64::MAX`.
    fn halfway(low: Self, high: Self) -> Self {
        let half = low.abs_diff(high) / 2;
        if low <= high {
            low.saturating_add_unsigned(half)
        } else {
            low.saturating_sub_unsigned(half)
        }
    }
}

impl GuessNumber for f64 {
    fn format(self) -> String {
        format!("{self:.2}")
    }

    fn parse(text: &str) -> Option<Self> {
        text.trim().parse().ok().filter(|value: &f64| value.is_finite())
    }
}

/// Stores its single argument as a placeholder named after the flag.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueFlag {
    #[serde(skip)]
    pub name: String,
    pub description: String,
    pub aliases: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub optional: bool,
    pub default_value: Option<String>,
    pub guess_params: Option<GuessParams>,
}

impl ValueFlag {
    pub fn apply(&self, args: Option<&[String]>, params: &mut CmdParams) -> Result<(), ArgError> {
        if let Some(value) = args.and_then(<[String]>::first) {
            params.set_value_args(&self.name, &self.args);
            params.set_placeholder(&self.name, value.clone());
            return Ok(());
        }

        if !self.optional {
            return Err(ArgError::RequiredValueMissing(self.name.clone()));
        }
        if let Some(ref default_value) = self.default_value {
            params.set_value_args(&self.name, &self.args);
            params.set_placeholder(&self.name, default_value.clone());
        }
        Ok(())
    }
}

/// The closed set of flag kinds, behind one dispatch surface.
#[derive(Debug, Clone, Copy)]
pub enum Flag<'a> {
    Enum(&'a EnumFlag),
    Switch(&'a SwitchFlag),
    Value(&'a ValueFlag),
}

impl<'a> Flag<'a> {
    #[must_use]
    pub fn name(self) -> &'a str {
        match self {
            Flag::Enum(flag) => &flag.name,
            Flag::Switch(flag) => &flag.name,
            Flag::Value(flag) => &flag.name,
        }
    }

    #[must_use]
    pub fn description(self) -> &'a str {
        match self {
            Flag::Enum(flag) => &flag.description,
            Flag::Switch(flag) => &flag.description,
            Flag::Value(flag) => &flag.description,
        }
    }

    #[must_use]
    pub fn aliases(self) -> &'a [String] {
        match self {
            Flag::Enum(flag) => &flag.aliases,
            Flag::Switch(flag) => &flag.aliases,
            Flag::Value(flag) => &flag.aliases,
        }
    }

    /// Number of command line tokens following the alias.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Flag::Switch(_) => 0,
            Flag::Enum(_) | Flag::Value(_) => 1,
        }
    }

    /// Applies the flag to `params`. `args` is `None` if the flag was not
    /// given on the command line.
    pub fn apply(self, args: Option<&[String]>, params: &mut CmdParams) -> Result<(), ArgError> {
        match self {
            Flag::Enum(flag) => flag.apply(args, params),
            Flag::Switch(flag) => {
                flag.apply(args, params);
                Ok(())
            }
            Flag::Value(flag) => flag.apply(args, params),
        }
    }
}
