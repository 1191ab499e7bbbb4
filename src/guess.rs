//! Bisection over one value flag until the output fits the size limit.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::{
    error::{ArgError, SearchExhausted},
    params::CmdParams,
    pipeline::{PassRunner, run_passes},
    schema::{CmdConfig, GuessNumber, GuessParams, Scaling, ValueFlag, ValueType},
    spoof::WEBM_EXTENSION,
};

/// Video stickers may not be larger than 256 KiB.
pub const SIZE_LIMIT: u64 = 1 << 18;

/// What to search and with how many tries.
#[derive(Debug, Clone, Copy)]
pub struct GuessRun<'a> {
    pub flag: &'a ValueFlag,
    pub params: GuessParams,
    /// Bounds given on the command line, overriding the schema ones.
    pub min: Option<&'a str>,
    pub max: Option<&'a str>,
    pub iterations: usize,
}

impl<'a> GuessRun<'a> {
    /// Looks up `name` as a guessable value flag.
    pub fn new(
        config: &'a CmdConfig,
        name: &str,
        iterations: &str,
        min: Option<&'a str>,
        max: Option<&'a str>,
    ) -> Result<Self, ArgError> {
        let flag = config
            .values
            .get(name)
            .ok_or_else(|| ArgError::UnknownGuessValue(name.to_owned()))?;
        let params = flag
            .guess_params
            .ok_or_else(|| ArgError::NotGuessable(name.to_owned()))?;
        let count: i64 = iterations
            .trim()
            .parse()
            .map_err(|source| ArgError::InvalidIterations {
                value: iterations.to_owned(),
                source,
            })?;
        // A negative budget runs no candidates at all.
        let iterations = usize::try_from(count.max(0)).unwrap_or(usize::MAX);

        Ok(Self {
            flag,
            params,
            min,
            max,
            iterations,
        })
    }
}

/// The current bracket.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bisection<T> {
    low: T,
    high: T,
    scaling: Scaling,
}

impl<T: GuessNumber> Bisection<T> {
    fn new(run: &GuessRun<'_>) -> Result<Self, ArgError> {
        Ok(Self {
            low: bound("guess_min", run.min, run.params.min)?,
            high: bound("guess_max", run.max, run.params.max)?,
            scaling: run.params.scaling,
        })
    }

    fn midpoint(&self) -> T {
        T::halfway(self.low, self.high)
    }

    /// Moves the edge that brings the next file closer to the limit.
    fn narrow(&mut self, mid: T, smaller: bool) {
        if smaller ^ self.scaling.is_inverse() {
            self.low = mid;
        } else {
            self.high = mid;
        }
        debug!("Bracket is now [{}, {}]", self.low, self.high);
    }
}

fn bound<T: GuessNumber>(
    name: &'static str,
    given: Option<&str>,
    fallback: f64,
) -> Result<T, ArgError> {
    match given {
        Some(text) => T::parse(text).ok_or_else(|| ArgError::InvalidBound {
            name,
            value: text.to_owned(),
        }),
        None => <T as num_traits::NumCast>::from(fallback).ok_or_else(|| ArgError::InvalidBound {
            name,
            value: fallback.to_string(),
        }),
    }
}

/// Where a candidate with the formatted `value` is encoded to.
#[must_use]
pub fn candidate_path(scratch_dir: &Path, output: &Path, value: &str) -> PathBuf {
    let stem = output.file_stem().unwrap_or_default().to_string_lossy();
    scratch_dir.join(format!("{stem}.v_{value}.{WEBM_EXTENSION}"))
}

/// Searches for the value that makes the output fit [`SIZE_LIMIT`] and returns
/// the path of the best fitting candidate.
pub fn guess_value<R: PassRunner>(
    config: &CmdConfig,
    params: &CmdParams,
    run: &GuessRun<'_>,
    scratch_dir: &Path,
    output: &Path,
    runner: &mut R,
) -> Result<PathBuf> {
    match run.params.kind {
        ValueType::Int => bisect::<i64, R>(config, params, run, scratch_dir, output, runner),
        ValueType::Float => bisect::<f64, R>(config, params, run, scratch_dir, output, runner),
    }
}

fn bisect<T: GuessNumber, R: PassRunner>(
    config: &CmdConfig,
    params: &CmdParams,
    run: &GuessRun<'_>,
    scratch_dir: &Path,
    output: &Path,
    runner: &mut R,
) -> Result<PathBuf> {
    let mut bisection = Bisection::<T>::new(run)?;
    let mut tried = HashSet::new();
    let mut best_valid_option = None;
    let name = run.flag.name.as_str();

    for i in 0..run.iterations {
        let mean_value = bisection.midpoint();
        let value = mean_value.format();
        if !tried.insert(value.clone()) {
            warn!("{name} = {value} was already tried, the search cannot narrow any further");
            break;
        }

        let mut candidate = params.clone();
        run.flag.apply(Some(&[value.clone()]), &mut candidate)?;
        let path = candidate_path(scratch_dir, output, &value);

        info!(
            "Iteration {}, running encoder with {name} = {value}...",
            i + 1
        );
        run_passes(config, &candidate, &path, runner)?;
        let size = fs::metadata(&path)
            .with_context(|| format!("Encoder did not produce {}", path.display()))?
            .len();

        if size == SIZE_LIMIT {
            info!("Result is ideal size");
            best_valid_option = Some(path);
            break;
        }

        let smaller = size < SIZE_LIMIT;
        if smaller {
            info!("Result is smaller than limit ({size} bytes), keeping it as the best so far");
            best_valid_option = Some(path);
        } else {
            info!("Result is bigger than limit ({size} bytes)");
        }
        bisection.narrow(mean_value, smaller);
    }

    best_valid_option.ok_or_else(|| SearchExhausted.into())
}
