//! Directive and role options.

use std::collections::BTreeMap;

use super::node::make_id;
use crate::error::OptionError;

/// Option values as written in the source, keyed by option name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    values: BTreeMap<String, String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Remove the `class` option and return its parsed class names.
    pub fn take_classes(&mut self) -> Result<Vec<String>, OptionError> {
        match self.values.remove("class") {
            Some(value) => class_option(&value).map_err(|message| OptionError::Invalid {
                name: "class".to_string(),
                message,
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Fail on the first option name not in `allowed`.
    pub fn check(&self, allowed: &[&str]) -> Result<(), OptionError> {
        match self.names().find(|name| !allowed.contains(name)) {
            Some(name) => Err(OptionError::Unknown(name.to_string())),
            None => Ok(()),
        }
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.values
    }
}

/// Parse a whitespace separated list of class names.
///
/// Each name is converted with [`make_id`]; a name that converts to nothing
/// is an error.
pub fn class_option(value: &str) -> Result<Vec<String>, String> {
    value
        .split_whitespace()
        .map(|name| {
            let class = make_id(name);
            if class.is_empty() {
                Err(format!("cannot make \"{}\" into a class name", name))
            } else {
                Ok(class)
            }
        })
        .collect()
}
