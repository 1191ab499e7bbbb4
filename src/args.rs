use std::collections::{HashMap, VecDeque};

use crate::{error::ArgError, schema::Flag};

/// Tokens left to consume, front first.
struct ArgsQueue<'a> {
    args: VecDeque<&'a String>,
}

impl<'a> ArgsQueue<'a> {
    fn new(argv: &'a [String]) -> Self {
        Self {
            args: argv.iter().collect(),
        }
    }

    fn pop_next(&mut self) -> Option<&'a String> {
        self.args.pop_front()
    }

    fn pop_next_n(&mut self, n: usize) -> Option<Vec<String>> {
        if self.args.len() < n {
            return None;
        }
        Some(self.args.drain(..n).cloned().collect())
    }
}

/// Splits `argv` into the raw arguments of each flag, keyed by flag name.
/// Flags missing from `argv` are missing from the result.
pub fn parse_command_args(
    aliases: &HashMap<&str, Flag<'_>>,
    argv: &[String],
) -> Result<HashMap<String, Vec<String>>, ArgError> {
    let mut args = ArgsQueue::new(argv);
    let mut flag_args = HashMap::new();

    while let Some(alias) = args.pop_next() {
        let flag = *aliases
            .get(alias.as_str())
            .ok_or_else(|| ArgError::UnknownFlag(alias.clone()))?;

        let values = args
            .pop_next_n(flag.arity())
            .ok_or_else(|| ArgError::MissingArguments(flag.name().to_owned()))?;

        if flag_args.contains_key(flag.name()) {
            return Err(ArgError::DuplicateFlag(flag.name().to_owned()));
        }
        flag_args.insert(flag.name().to_owned(), values);
    }

    Ok(flag_args)
}
