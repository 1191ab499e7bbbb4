use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::info;

use crate::{
    args::parse_command_args,
    error::ArgError,
    guess::{GuessRun, guess_value},
    params::CmdParams,
    pipeline::{PassRunner, run_passes},
    schema::CmdConfig,
    spoof::{WEBM_EXTENSION, spoof_file_duration},
};

/// Guess value that turns the size search off.
pub const NO_GUESS: &str = "none";

/// The placeholders that steer the conversion itself rather than the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    pub input: PathBuf,
    pub output: PathBuf,
    pub guess_value: Option<String>,
    pub guess_iterations: Option<String>,
    pub guess_min: Option<String>,
    pub guess_max: Option<String>,
}

impl RunInfo {
    pub fn from_placeholders(placeholders: &HashMap<String, String>) -> Result<Self, ArgError> {
        let required = |name: &str| {
            placeholders
                .get(name)
                .map(PathBuf::from)
                .ok_or_else(|| ArgError::MissingPlaceholder(name.to_owned()))
        };
        let optional = |name: &str| placeholders.get(name).cloned();

        Ok(Self {
            input: required("input")?,
            output: required("output")?,
            guess_value: optional("guess_value").filter(|value| value != NO_GUESS),
            guess_iterations: optional("guess_iterations"),
            guess_min: optional("guess_min"),
            guess_max: optional("guess_max"),
        })
    }

    /// Directory the encoder writes its candidates to.
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.output
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join("tmp")
    }
}

/// Resolves `argv` against the schema and applies every flag.
pub fn prepare(config: &CmdConfig, argv: &[String]) -> Result<(CmdParams, RunInfo)> {
    let aliases = config.map_flag_aliases()?;
    let flag_args = parse_command_args(&aliases, argv)?;

    let mut params = CmdParams::new(&config.required_args);
    for flag in config.flags() {
        flag.apply(
            flag_args.get(flag.name()).map(Vec::as_slice),
            &mut params,
        )?;
    }
    params.set_default_output();

    let run_info = RunInfo::from_placeholders(&params.placeholders)?;
    Ok((params, run_info))
}

/// Encodes, searching for the best fitting value if asked to, and writes the
/// duration-spoofed result to the output path.
pub fn convert_video<R: PassRunner>(
    config: &CmdConfig,
    params: &CmdParams,
    run_info: &RunInfo,
    runner: &mut R,
) -> Result<()> {
    let scratch_dir = run_info.scratch_dir();
    fs::create_dir_all(&scratch_dir)
        .with_context(|| format!("Failed to create {}", scratch_dir.display()))?;

    let encoded = match run_info.guess_value {
        Some(ref name) => {
            let iterations = run_info
                .guess_iterations
                .as_deref()
                .ok_or_else(|| ArgError::RequiredValueMissing("guess_iterations".to_owned()))?;
            let run = GuessRun::new(
                config,
                name,
                iterations,
                run_info.guess_min.as_deref(),
                run_info.guess_max.as_deref(),
            )?;
            guess_value(
                config,
                params,
                &run,
                &scratch_dir,
                &run_info.output,
                runner,
            )?
        }
        None => {
            let stem = run_info
                .output
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy();
            let path = scratch_dir.join(format!("{stem}.tmp.{WEBM_EXTENSION}"));
            run_passes(config, params, &path, runner)?;
            path
        }
    };

    spoof_file_duration(&encoded, &run_info.output)?;
    info!("Done, wrote sticker to {}", run_info.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ebml::find_element_by_path,
        spoof::{DURATION_PATH, FAKE_DURATION, tests::webm},
    };

    const CONFIG: &str = r#"
        required_args = ["-an"]
        passes = [["fake", "{quality}", {}, "{output}"]]

        [enums.speed]
        description = "Encoding speed"
        aliases = ["-s"]
        options.slow = { description = "Slow", default = true, args = ["-cpu-used", "0"] }
        options.fast = { description = "Fast", args = ["-cpu-used", "4"] }

        [switches.loop]
        description = "Do not loop"
        aliases = ["--no-loop"]
        inverted = true
        args = ["-loop", "1"]

        [values.input]
        description = "Input file"
        aliases = ["-i"]

        [values.output]
        description = "Output file"
        aliases = ["-o"]
        optional = true

        [values.quality]
        description = "Quality"
        aliases = ["-q"]
        optional = true
        default_value = "100"
        guess_params = { min = 0, max = 1000, type = "int", scaling = "direct" }

        [values.guess_value]
        description = "Value to guess"
        aliases = ["-g"]
        optional = true

        [values.guess_iterations]
        description = "Guess iterations"
        aliases = ["--iterations"]
        optional = true
        default_value = "10"

        [values.guess_min]
        description = "Lower bound"
        aliases = ["--min"]
        optional = true

        [values.guess_max]
        description = "Upper bound"
        aliases = ["--max"]
        optional = true
    "#;

    /// Writes a webm of `1000 * quality` bytes.
    #[derive(Default)]
    struct FakeEncoder {
        commands: Vec<Vec<String>>,
    }

    impl PassRunner for FakeEncoder {
        fn run(&mut self, command: &[String]) -> Result<()> {
            let quality: usize = command[1].parse()?;
            let mut data = webm(&[0; 8]);
            data.resize(data.len().max(1000 * quality), 0);
            fs::write(command.last().unwrap(), data)?;
            self.commands.push(command.to_vec());
            Ok(())
        }
    }

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|&t| t.to_owned()).collect()
    }

    fn has_fake_duration(path: &Path) -> bool {
        let data = fs::read(path).unwrap();
        let span = find_element_by_path(&data, &DURATION_PATH).unwrap();
        data[span] == FAKE_DURATION.to_be_bytes()
    }

    #[test]
    fn flags_apply_in_declaration_order() {
        let config = CmdConfig::from_toml(CONFIG).unwrap();
        let (params, run_info) =
            prepare(&config, &argv(&["-i", "cat.mp4", "-s", "fast"])).unwrap();

        assert_eq!(params.args, vec!["-an", "-loop", "1", "-cpu-used", "4"]);
        assert_eq!(run_info.input, Path::new("cat.mp4"));
        assert_eq!(run_info.output, Path::new("cat.webm"));
        assert_eq!(run_info.guess_value, None);
        assert_eq!(params.placeholder("quality"), Some("100"));
    }

    #[test]
    fn enum_placeholders_override_value_defaults() {
        let config = CmdConfig::from_toml(
            r#"
            required_args = []
            passes = [["fake", "{crf}", {}, "{output}"]]

            [enums.preset]
            description = "Preset"
            aliases = ["-p"]
            options.small = { description = "Small", default = true, args = ["-preset"], placeholders = { crf = "45" } }

            [values.input]
            description = "Input file"
            aliases = ["-i"]
            args = ["-i"]

            [values.crf]
            description = "Quality"
            aliases = ["-q"]
            optional = true
            default_value = "30"
            "#,
        )
        .unwrap();
        let (params, _) = prepare(&config, &argv(&["-i", "cat.mp4"])).unwrap();

        assert_eq!(params.args, vec!["-i", "-preset"]);
        assert_eq!(params.placeholder("crf"), Some("45"));
    }

    #[test]
    fn input_is_required() {
        let config = CmdConfig::from_toml(CONFIG).unwrap();
        let err = prepare(&config, &argv(&["--no-loop"])).unwrap_err();
        assert_eq!(
            err.downcast::<ArgError>().unwrap(),
            ArgError::RequiredValueMissing("input".to_owned())
        );
    }

    #[test]
    fn none_disables_the_search() {
        let config = CmdConfig::from_toml(CONFIG).unwrap();
        let (_, run_info) = prepare(&config, &argv(&["-i", "a.mp4", "-g", "none"])).unwrap();
        assert_eq!(run_info.guess_value, None);
    }

    #[test]
    fn single_run_is_spoofed_into_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("cat.webm");
        let config = CmdConfig::from_toml(CONFIG).unwrap();
        let (params, run_info) = prepare(
            &config,
            &argv(&["-i", "cat.mp4", "-o", output.to_str().unwrap(), "-q", "5"]),
        )
        .unwrap();

        let mut encoder = FakeEncoder::default();
        convert_video(&config, &params, &run_info, &mut encoder).unwrap();

        assert_eq!(encoder.commands.len(), 1);
        assert_eq!(
            encoder.commands[0].last().unwrap(),
            dir.path().join("tmp").join("cat.tmp.webm").to_str().unwrap()
        );
        assert_eq!(fs::metadata(&output).unwrap().len(), 5000);
        assert!(has_fake_duration(&output));
    }

    #[test]
    fn searched_run_writes_best_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("cat.webm");
        let config = CmdConfig::from_toml(CONFIG).unwrap();
        let (params, run_info) = prepare(
            &config,
            &argv(&["-i", "cat.mp4", "-o", output.to_str().unwrap(), "-g", "quality"]),
        )
        .unwrap();

        let mut encoder = FakeEncoder::default();
        convert_video(&config, &params, &run_info, &mut encoder).unwrap();

        assert_eq!(encoder.commands.len(), 10);
        assert_eq!(fs::metadata(&output).unwrap().len(), 262_000);
        assert!(has_fake_duration(&output));
        assert!(dir.path().join("tmp").join("cat.v_262.webm").exists());
    }

    #[test]
    fn unknown_guess_value() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("cat.webm");
        let config = CmdConfig::from_toml(CONFIG).unwrap();
        let (params, run_info) = prepare(
            &config,
            &argv(&["-i", "cat.mp4", "-o", output.to_str().unwrap(), "-g", "speed"]),
        )
        .unwrap();

        let err = convert_video(&config, &params, &run_info, &mut FakeEncoder::default())
            .unwrap_err();
        assert_eq!(
            err.downcast::<ArgError>().unwrap(),
            ArgError::UnknownGuessValue("speed".to_owned())
        );
    }
}
