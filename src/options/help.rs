//! Usage text and version banner

use super::{OptionSchema, OptionSpec, LIB_VERSION};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Padding after `--long` / `-s` flag text
const FLAG_MARGIN: usize = 2;
/// Padding after a positional argument name
const POSITIONAL_MARGIN: usize = 3;

/// `--long, -s`, `--long` or `-s`; `None` when neither is set
fn flag_text(long: Option<&str>, short: Option<char>) -> Option<String> {
    match (long, short) {
        (Some(long), Some(short)) => Some(format!("--{}, -{}", long, short)),
        (Some(long), None) => Some(format!("--{}", long)),
        (None, Some(short)) => Some(format!("-{}", short)),
        (None, None) => None,
    }
}

fn on_text(spec: &OptionSpec) -> Option<String> {
    flag_text(spec.long.as_deref(), spec.short)
}

fn off_text(spec: &OptionSpec) -> Option<String> {
    flag_text(spec.long_off.as_deref(), spec.short_off)
}

fn description(spec: &OptionSpec) -> String {
    match &spec.arg {
        Some(label) => format!("({}) {}", label, spec.help),
        None => spec.help.clone(),
    }
}

/// Positional lines always carry the parenthesised type, empty if unlabelled
fn positional_description(spec: &OptionSpec) -> String {
    format!("({}) {}", spec.arg.as_deref().unwrap_or(""), spec.help)
}

impl OptionSchema {
    /// Column at which every help description starts
    pub fn help_column(&self) -> usize {
        let mut longest = 0;
        for (name, spec) in self.iter() {
            for text in [on_text(spec), off_text(spec)].into_iter().flatten() {
                longest = longest.max(text.len() + FLAG_MARGIN);
            }
            if spec.arg_num.is_some() {
                longest = longest.max(name.len() + POSITIONAL_MARGIN);
            }
        }
        longest
    }

    /// Positional options keyed by `arg_num`
    fn positionals(&self) -> BTreeMap<u32, (&str, &OptionSpec)> {
        self.iter()
            .filter_map(|(name, spec)| spec.arg_num.map(|n| (n, (name.as_str(), spec))))
            .collect()
    }

    /// Full usage text: synopsis line, then one aligned line per flag and positional
    pub fn help_text(&self) -> String {
        let width = self.help_column();
        let cmd = self
            .spec("cmd")
            .and_then(|spec| spec.value.as_ref())
            .and_then(|values| values.last())
            .map(|value| value.as_string())
            .unwrap_or_default();

        let mut out = String::new();
        let _ = write!(out, "Usage: {} [options]", cmd);
        let positionals = self.positionals();
        for (name, spec) in positionals.values() {
            if spec.has_value() {
                let _ = write!(out, " [{}]", name);
            } else {
                let _ = write!(out, " {}", name);
            }
        }
        out.push_str("\n\n");

        for (_, spec) in self.iter() {
            for text in [on_text(spec), off_text(spec)].into_iter().flatten() {
                let _ = writeln!(out, "{:<width$}{}", text, description(spec), width = width);
            }
        }

        for (name, spec) in positionals.values() {
            let _ = writeln!(
                out,
                "{:<width$}{}",
                name,
                positional_description(spec),
                width = width
            );
        }

        out
    }

    /// Library and application version lines
    pub fn version_banner(&self) -> String {
        let app_version = self
            .spec("version")
            .and_then(|spec| spec.value.as_ref())
            .and_then(|values| values.last())
            .map(|value| value.as_string())
            .unwrap_or_default();

        format!(
            "Library version: {}\nApplication version: {}\n",
            LIB_VERSION, app_version
        )
    }
}
