//! Declarative command-line option schema
//!
//! Every recognised flag or positional argument is an [`OptionSpec`] stored
//! under a unique name in an [`OptionSchema`]. The schema also holds the
//! values collected for each option: defaults first, then whatever the
//! command line appended. Accessors return the most recent value.
//!
//! - `getopt`: getopt_long-compatible argv scanner
//! - `parser`: applies scanned flags and positionals to the schema
//! - `help`: usage text and version banner
//! - `connector`: built-in option sets shared by network services

pub mod connector;
pub mod getopt;
pub mod help;
pub mod parser;

pub use parser::ParseOutcome;

use crate::error::{ConfigError, EXIT_UNKNOWN_OPTION};
use crate::process::DEFAULT_DEBUG_LEVEL;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// Version of this library, reported by the version banner
pub const LIB_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A single option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum OptionValue {
    /// Placeholder inserted when an option is read before it has a value
    #[default]
    Null,
    Int(i64),
    Str(String),
}

impl OptionValue {
    /// Render as text; integers in decimal, null as ""
    pub fn as_string(&self) -> String {
        match self {
            OptionValue::Null => String::new(),
            OptionValue::Int(n) => n.to_string(),
            OptionValue::Str(s) => s.clone(),
        }
    }

    /// Integer view; strings are read up to the first non-digit, like `atoll`
    pub fn as_int(&self) -> i64 {
        match self {
            OptionValue::Null => 0,
            OptionValue::Int(n) => *n,
            OptionValue::Str(s) => leading_int(s),
        }
    }

    /// True for non-zero integers and non-empty strings
    pub fn as_bool(&self) -> bool {
        match self {
            OptionValue::Null => false,
            OptionValue::Int(n) => *n != 0,
            OptionValue::Str(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<i64> for OptionValue {
    fn from(n: i64) -> Self {
        OptionValue::Int(n)
    }
}

impl From<i32> for OptionValue {
    fn from(n: i32) -> Self {
        OptionValue::Int(i64::from(n))
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Str(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Str(s)
    }
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(|b| b.is_ascii_digit()) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    if negative {
        -value
    } else {
        value
    }
}

/// Declaration of one option
///
/// Field names match the JSON declaration format, so a declaration can also be
/// written as `{"short": "p", "long": "port", "arg": "integer", ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionSpec {
    /// Short flag character, e.g. `p` for `-p`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<char>,
    /// Long flag name, e.g. `port` for `--port`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,
    /// Short flag that switches a boolean off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_off: Option<char>,
    /// Long flag that switches a boolean off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_off: Option<String>,
    /// Argument type label. Only shown in help; presence means the flag takes an argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    /// Collected values, oldest first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<OptionValue>>,
    /// Folded into `value` by `add_option` when no value list was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<OptionValue>,
    /// 1-based position for positional arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg_num: Option<u32>,
    pub help: String,
}

impl OptionSpec {
    pub fn new(help: impl Into<String>) -> Self {
        Self {
            help: help.into(),
            ..Self::default()
        }
    }

    pub fn with_short(mut self, c: char) -> Self {
        self.short = Some(c);
        self
    }

    pub fn with_long(mut self, name: impl Into<String>) -> Self {
        self.long = Some(name.into());
        self
    }

    pub fn with_short_off(mut self, c: char) -> Self {
        self.short_off = Some(c);
        self
    }

    pub fn with_long_off(mut self, name: impl Into<String>) -> Self {
        self.long_off = Some(name.into());
        self
    }

    pub fn with_arg(mut self, label: impl Into<String>) -> Self {
        self.arg = Some(label.into());
        self
    }

    /// Append an initial value
    pub fn with_value(mut self, value: impl Into<OptionValue>) -> Self {
        self.value.get_or_insert_with(Vec::new).push(value.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<OptionValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_arg_num(mut self, position: u32) -> Self {
        self.arg_num = Some(position);
        self
    }

    /// Whether the flag consumes an argument
    pub fn takes_arg(&self) -> bool {
        self.arg.is_some()
    }

    /// Whether a non-empty value list is present
    pub fn has_value(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !v.is_empty())
    }

    fn long_slots(&self) -> usize {
        usize::from(self.long.is_some()) + usize::from(self.long_off.is_some())
    }
}

/// Registry of options keyed by unique name, iterated in name order
#[derive(Debug, Clone, Default)]
pub struct OptionSchema {
    options: BTreeMap<String, OptionSpec>,
    long_count: usize,
}

impl OptionSchema {
    /// Schema holding the built-in `cmd`, `version`, `help` and `debug` options
    pub fn new(cmd: impl Into<String>, version: impl Into<String>) -> Self {
        let mut schema = Self::default();

        schema.add_option("cmd", OptionSpec::default().with_value(cmd.into()));
        schema.add_option(
            "version",
            OptionSpec::new("Display library and application version, then exit.")
                .with_long("version")
                .with_short('v')
                .with_value(LIB_VERSION)
                .with_value(version.into()),
        );
        schema.add_option(
            "help",
            OptionSpec::new("Display usage and version information, then exit.")
                .with_long("help")
                .with_short('h'),
        );
        schema.add_option(
            "debug",
            OptionSpec::new("The debug level at which messages need to be printed.")
                .with_long("debug")
                .with_short('g')
                .with_arg("integer")
                .with_value(i64::from(DEFAULT_DEBUG_LEVEL)),
        );

        schema
    }

    /// Register `spec` under `name`, replacing any previous declaration.
    pub fn add_option(&mut self, name: impl Into<String>, mut spec: OptionSpec) {
        if spec.value.is_none() {
            if let Some(default) = spec.default.take() {
                spec.value = Some(vec![default]);
            }
        }
        self.options.insert(name.into(), spec);
        self.long_count = self.options.values().map(OptionSpec::long_slots).sum();
    }

    /// Register an option from its JSON declaration
    pub fn add_option_json(
        &mut self,
        name: &str,
        declaration: serde_json::Value,
    ) -> Result<(), ConfigError> {
        let spec: OptionSpec =
            serde_json::from_value(declaration).map_err(|e| ConfigError::InvalidDeclaration {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        self.add_option(name, spec);
        Ok(())
    }

    /// Remove an option; later lookups of `name` are fatal again
    pub fn remove_option(&mut self, name: &str) -> Option<OptionSpec> {
        let removed = self.options.remove(name);
        self.long_count = self.options.values().map(OptionSpec::long_slots).sum();
        removed
    }

    /// Number of long-option table entries (`long` plus `long_off` flags)
    pub fn long_count(&self) -> usize {
        self.long_count
    }

    pub fn contains(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    pub fn spec(&self, name: &str) -> Option<&OptionSpec> {
        self.options.get(name)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, OptionSpec> {
        self.options.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, OptionSpec> {
        self.options.iter_mut()
    }

    /// Value list of `name`, inserting a null placeholder if it has none
    pub fn try_get_values(&mut self, name: &str) -> Result<&[OptionValue], ConfigError> {
        let spec = self
            .options
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownOption(name.to_string()))?;

        let values = spec.value.get_or_insert_with(Vec::new);
        if values.is_empty() {
            values.push(OptionValue::Null);
        }
        Ok(values.as_slice())
    }

    /// Most recent value of `name`
    pub fn try_get_option(&mut self, name: &str) -> Result<&OptionValue, ConfigError> {
        let values = self.try_get_values(name)?;
        // try_get_values never returns an empty list
        Ok(&values[values.len() - 1])
    }

    /// Like [`try_get_values`](Self::try_get_values) but terminates the
    /// process with exit status 37 for unregistered names.
    pub fn get_option_array(&mut self, name: &str) -> &[OptionValue] {
        match self.try_get_values(name) {
            Ok(values) => values,
            Err(_) => unknown_option(name),
        }
    }

    /// Like [`try_get_option`](Self::try_get_option) but terminates the
    /// process with exit status 37 for unregistered names.
    pub fn get_option(&mut self, name: &str) -> &OptionValue {
        let values = self.get_option_array(name);
        &values[values.len() - 1]
    }

    pub fn get_string(&mut self, name: &str) -> String {
        self.get_option(name).as_string()
    }

    pub fn get_integer(&mut self, name: &str) -> i64 {
        self.get_option(name).as_int()
    }

    pub fn get_bool(&mut self, name: &str) -> bool {
        self.get_option(name).as_bool()
    }
}

fn unknown_option(name: &str) -> ! {
    println!("Fatal error: {}.", ConfigError::UnknownOption(name.to_string()));
    std::process::exit(EXIT_UNKNOWN_OPTION);
}
