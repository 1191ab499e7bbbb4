use std::{num::ParseIntError, process::ExitStatus};

use thiserror::Error;

/// The flag schema is malformed. Raised while loading the config.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("There is no default option in '{flag}' flag, should be 1")]
    NoDefaultOption { flag: String },
    #[error("There are {} default options in '{flag}' flag: {}, should be only 1", .options.len(), .options.join(", "))]
    MultipleDefaultOptions { flag: String, options: Vec<String> },
    #[error("Duplicate flag names: {}", .0.join(", "))]
    DuplicateFlagName(Vec<String>),
    #[error("Duplicate alias '{alias}' for the '{flag}' flag")]
    DuplicateAlias { alias: String, flag: String },
    #[error("Malformed template \"{template}\": {reason}")]
    MalformedTemplate { template: String, reason: String },
    #[error("Pass {pass} has {count} argument markers, should have exactly 1")]
    MarkerCount { pass: usize, count: usize },
    #[error("No pipeline passes are configured")]
    NoPasses,
}

/// The command line does not fit the schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    #[error("Unknown flag: '{0}'")]
    UnknownFlag(String),
    #[error("Not enough arguments for a '{0}'")]
    MissingArguments(String),
    #[error("Duplicate flag: '{0}'")]
    DuplicateFlag(String),
    #[error("Required value '{0}' is not present")]
    RequiredValueMissing(String),
    #[error("Unknown '{flag}' option: '{option}'")]
    UnknownOption { flag: String, option: String },
    #[error("Unknown guess value: '{0}'")]
    UnknownGuessValue(String),
    #[error("Value '{0}' is not guessable")]
    NotGuessable(String),
    #[error("Guess iterations is '{value}', should be an integer")]
    InvalidIterations {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("Guess bound '{name}' is '{value}', should be a number")]
    InvalidBound { name: &'static str, value: String },
    #[error("Placeholder '{0}' is not set")]
    MissingPlaceholder(String),
}

/// The container could not be walked or patched. Detected before any byte is
/// overwritten.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("Duration value was not found")]
    ElementNotFound,
    #[error("Malformed variable-length integer at byte {0}")]
    MalformedVint(usize),
    #[error("Element at byte {0} runs past the end of its parent")]
    Truncated(usize),
    #[error("Duration payload is {0} bytes wide, expected 0, 4 or 8")]
    UnsupportedWidth(usize),
}

/// The encoder exited unsuccessfully. The process' own output is the diagnostic.
#[derive(Debug, Error)]
#[error("'{program}' failed with {status}")]
pub struct ExternalProcessError {
    pub program: String,
    pub status: ExitStatus,
}

impl ExternalProcessError {
    /// Exit code to propagate. Processes killed by a signal have none, so 1 is
    /// used instead.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(1)
    }
}

#[derive(Debug, Error)]
#[error(
    "Could not find settings for a sufficiently small final file, try increasing the number \
     of iterations or reducing the quality settings"
)]
pub struct SearchExhausted;
