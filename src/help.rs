use std::io::{self, Write};

use crate::{
    convert::NO_GUESS,
    schema::{CmdConfig, EnumFlag, SwitchFlag, ValueFlag},
};

fn write_flag<W: Write>(out: &mut W, aliases: &[String], description: &str) -> io::Result<()> {
    writeln!(out, "{:<23} {description}", aliases.join(", "))
}

fn write_enum<W: Write>(out: &mut W, flag: &EnumFlag) -> io::Result<()> {
    writeln!(out)?;
    write_flag(out, &flag.aliases, &flag.description)?;
    for (name, option) in &flag.options {
        let marker = if option.default { " (default)" } else { "" };
        writeln!(out, "    {name:<23} {}{marker}", option.description)?;
    }
    Ok(())
}

fn write_switch<W: Write>(out: &mut W, flag: &SwitchFlag) -> io::Result<()> {
    write_flag(out, &flag.aliases, &flag.description)
}

fn write_value<W: Write>(out: &mut W, flag: &ValueFlag) -> io::Result<()> {
    if flag.guess_params.is_some() {
        write_flag(out, &flag.aliases, &format!("{} (guessable)", flag.description))
    } else {
        write_flag(out, &flag.aliases, &flag.description)
    }
}

/// Describes every flag of the schema, grouped by kind.
pub fn write_help<W: Write>(config: &CmdConfig, out: &mut W) -> io::Result<()> {
    writeln!(out, "\nEnum flags. Usage: '--flag <OPTION>'\n")?;
    for flag in config.enums.values() {
        write_enum(out, flag)?;
    }

    writeln!(out, "\n\nSwitch flags. Usage: '--flag' to turn on\n")?;
    for flag in config.switches.values() {
        write_switch(out, flag)?;
    }

    let guessable: Vec<&str> = config.guessable_values().chain([NO_GUESS]).collect();
    writeln!(
        out,
        "\n\nValue flags. Usage: '--flag <VALUE>'\n\nGuessable values: {}\n",
        guessable.join(", ")
    )?;
    for flag in config.values.values() {
        write_value(out, flag)?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULT_CONFIG;

    #[test]
    fn lists_every_flag() {
        let config = CmdConfig::from_toml(DEFAULT_CONFIG).unwrap();
        let mut out = Vec::new();
        write_help(&config, &mut out).unwrap();
        let help = String::from_utf8(out).unwrap();

        for flag in config.flags() {
            assert!(help.contains(&flag.aliases().join(", ")), "{}", flag.name());
        }
        assert!(help.contains("Guessable values: crf, bitrate, none"));
        assert!(help.contains("Good quality in reasonable time (default)"));
        assert!(help.contains("Constant rate factor, lower is better (guessable)"));
    }
}
