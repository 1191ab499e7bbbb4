use std::{path::Path, process::Command};

use anyhow::{Result, bail};
use log::info;

use crate::{error::ExternalProcessError, params::CmdParams, schema::CmdConfig};

/// Runs one fully expanded pass.
pub trait PassRunner {
    fn run(&mut self, command: &[String]) -> Result<()>;
}

/// Spawns the pass as a process, without a shell in between.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl PassRunner for ProcessRunner {
    fn run(&mut self, command: &[String]) -> Result<()> {
        let Some((program, args)) = command.split_first() else {
            bail!("Pipeline pass expanded to an empty command");
        };

        let status = Command::new(program).args(args).status()?;
        if !status.success() {
            return Err(ExternalProcessError {
                program: program.clone(),
                status,
            }
            .into());
        }
        Ok(())
    }
}

/// Runs every pass in order with `output` pointing at `output_path`.
/// The first failing pass aborts the rest.
pub fn run_passes<R: PassRunner>(
    config: &CmdConfig,
    params: &CmdParams,
    output_path: &Path,
    runner: &mut R,
) -> Result<()> {
    let mut placeholders = params.placeholders.clone();
    placeholders.insert(
        "output".to_owned(),
        output_path.to_string_lossy().into_owned(),
    );

    for pass in &config.passes {
        let command = pass.expand(&params.args, &placeholders)?;
        info!("$ {}", command.join(" "));
        runner.run(&command)?;
    }

    Ok(())
}
