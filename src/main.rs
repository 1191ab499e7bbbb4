#![deny(clippy::all)]
#![warn(clippy::nursery)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::inconsistent_struct_constructor)]
#![allow(clippy::inline_always)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::similar_names)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::use_self)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::create_dir)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::default_numeric_fallback)]
#![warn(clippy::exit)]
#![warn(clippy::filetype_is_file)]
#![warn(clippy::float_cmp_const)]
#![warn(clippy::if_then_some_else_none)]
#![warn(clippy::lossy_float_literal)]
#![warn(clippy::map_err_ignore)]
#![warn(clippy::mem_forget)]
#![warn(clippy::multiple_inherent_impl)]
#![warn(clippy::pattern_type_mismatch)]
#![warn(clippy::rc_buffer)]
#![warn(clippy::rc_mutex)]
#![warn(clippy::rest_pat_in_fully_bound_structs)]
#![warn(clippy::same_name_method)]
#![warn(clippy::self_named_module_files)]
#![warn(clippy::str_to_string)]
#![warn(clippy::string_to_string)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(clippy::unnecessary_self_imports)]
#![warn(clippy::unneeded_field_pattern)]
#![warn(clippy::use_debug)]
#![warn(clippy::verbose_file_reads)]
// For binary-only crates
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod args;
pub mod convert;
pub mod ebml;
pub mod error;
pub mod guess;
pub mod help;
pub mod params;
pub mod pipeline;
pub mod schema;
pub mod settings;
pub mod spoof;

use std::{
    env,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use log::{error, info};

use crate::{error::ExternalProcessError, help::write_help, pipeline::ProcessRunner};

pub fn main() -> ExitCode {
    let filters = env::var("RUST_LOG").unwrap_or_else(|_| "error,tgradish=info".to_owned());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(process_err) = err.downcast_ref::<ExternalProcessError>() {
                error!("{process_err}");
                return ExitCode::from(u8::try_from(process_err.exit_code()).unwrap_or(1));
            }
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Commands::Convert { flags } => {
            let config = settings::get_config(&settings::config_path()?)?;
            if flags
                .first()
                .is_none_or(|first| first == "-h" || first == "--help")
            {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "tgradish convert [FLAGS]")?;
                write_help(&config, &mut stdout)?;
                return Ok(());
            }

            let (params, run_info) = convert::prepare(&config, &flags)?;
            if !confirm_overwrite(&run_info.output, args.yes)? {
                eprintln!("Not overwriting existing file. Exiting.");
                return Ok(());
            }
            convert::convert_video(&config, &params, &run_info, &mut ProcessRunner)?;
        }
        Commands::Spoof { input, output } => {
            if !input.exists() {
                bail!("File '{}' does not exist", input.display());
            }
            if !confirm_overwrite(&output, args.yes)? {
                eprintln!("Not overwriting existing file. Exiting.");
                return Ok(());
            }
            spoof::spoof_file_duration(&input, &output)?;
            info!("Done.");
        }
        Commands::Config { action } => {
            let path = settings::config_path()?;
            match action {
                ConfigAction::Showpath => println!("{}", path.display()),
                ConfigAction::Restore => {
                    settings::set_default_config(&path)?;
                    info!("Done.");
                }
                ConfigAction::Copyfrom { file } => {
                    settings::copy_config_from(&file, &path)?;
                    info!("Done.");
                }
            }
        }
    }

    Ok(())
}

fn confirm_overwrite(output: &Path, yes: bool) -> Result<bool> {
    if yes || !output.exists() {
        return Ok(true);
    }
    Ok(Confirm::new()
        .with_prompt(format!(
            "File {} exists. Overwrite?",
            output.to_string_lossy()
        ))
        .interact()?)
}

#[derive(Parser, Debug)]
#[clap(version, about)]
pub struct Args {
    /// Overwrite existing output files without asking.
    #[clap(long, short)]
    yes: bool,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converts a video into a video sticker with spoofed duration.
    ///
    /// The accepted flags are defined by the config file.
    /// Run without flags to list them.
    #[clap(disable_help_flag = true)]
    Convert {
        /// Flags as described in the config file.
        #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
        flags: Vec<String>,
    },
    /// Spoofs the duration of a .webm file.
    Spoof {
        /// The .webm file to spoof.
        #[clap(value_parser)]
        input: PathBuf,
        /// Where to write the spoofed file.
        #[clap(value_parser)]
        output: PathBuf,
    },
    /// Manages the tgradish config file.
    Config {
        #[clap(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Shows the path to the config.
    Showpath,
    /// Restores the default config.
    Restore,
    /// Copies the config from a file, if it is valid.
    Copyfrom {
        #[clap(value_parser)]
        file: PathBuf,
    },
}
