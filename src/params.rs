use std::{collections::HashMap, ops::Range, path::Path};

use log::info;

/// Everything the flags contribute to a run: the extra arguments spliced into
/// each pass and the values for named placeholders.
///
/// Cloned for every search iteration so a candidate never leaks into the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdParams {
    pub args: Vec<String>,
    pub placeholders: HashMap<String, String>,
    /// Where each value flag's args sit in `args`.
    value_args: HashMap<String, Range<usize>>,
}

impl CmdParams {
    #[must_use]
    pub fn new(required_args: &[String]) -> Self {
        Self {
            args: required_args.to_vec(),
            ..Self::default()
        }
    }

    pub fn extend_args(&mut self, args: &[String]) {
        self.args.extend_from_slice(args);
    }

    /// Adds the args of the value flag `owner`, replacing what an earlier
    /// application of the same flag added.
    pub fn set_value_args(&mut self, owner: &str, args: &[String]) {
        if let Some(range) = self.value_args.get(owner) {
            // A flag's args never change length, so later spans stay valid.
            self.args[range.clone()].clone_from_slice(args);
            return;
        }
        let start = self.args.len();
        self.args.extend_from_slice(args);
        self.value_args
            .insert(owner.to_owned(), start..self.args.len());
    }

    /// Later writes for the same name win.
    pub fn merge_placeholders<'a, I>(&mut self, placeholders: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        self.placeholders.extend(
            placeholders
                .into_iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
    }

    pub fn set_placeholder(&mut self, name: &str, value: String) {
        self.placeholders.insert(name.to_owned(), value);
    }

    #[must_use]
    pub fn placeholder(&self, name: &str) -> Option<&str> {
        self.placeholders.get(name).map(String::as_str)
    }

    /// Derives `output` from `input` if no output was given. Returns `true` if
    /// the default was used.
    pub fn set_default_output(&mut self) -> bool {
        if self.placeholders.contains_key("output") {
            return false;
        }
        let Some(input) = self.placeholder("input") else {
            return false;
        };

        let output = Path::new(input).with_extension(crate::spoof::WEBM_EXTENSION);
        info!("Output file defaults to '{}'", output.display());
        self.set_placeholder("output", output.to_string_lossy().into_owned());
        true
    }
}
