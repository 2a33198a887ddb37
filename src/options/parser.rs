//! Command-line parsing against an [`OptionSchema`]
//!
//! Flags append to their option's value list: the argument text for
//! options with an `arg` label, `1` for plain switches and `0` for
//! switch-off flags. Bare tokens fill positional options in `arg_num`
//! order. When several options share a short character the first one in
//! registry order receives the value.

use super::getopt::{Getopt, LongOption, OptTarget, Scanned};
use super::{OptionSchema, OptionSpec, OptionValue};
use crate::error::EXIT_HELP;
use crate::logging;
use crate::process::ProcessState;
use std::io::{self, Write};

/// Result of scanning an argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// All flags applied and every required positional supplied
    Parsed,
    /// Fewer positional tokens than the highest required `arg_num`
    MissingPositional { supplied: usize, required: u32 },
    /// Help flag given, or an option was not recognised
    ShowHelp,
    /// Version flag given
    ShowVersion,
}

fn push_value(spec: &mut OptionSpec, value: OptionValue) {
    spec.value.get_or_insert_with(Vec::new).push(value);
}

impl OptionSchema {
    /// getopt short-option string: each short character, `:` after those taking an argument
    pub fn short_options(&self) -> String {
        let mut shortopts = String::new();
        for (_, spec) in self.iter() {
            for c in [spec.short, spec.short_off].into_iter().flatten() {
                shortopts.push(c);
                if spec.takes_arg() {
                    shortopts.push(':');
                }
            }
        }
        shortopts
    }

    /// Long-option table, one entry per `long` and `long_off` flag
    pub fn long_options(&self) -> Vec<LongOption> {
        let mut table = Vec::with_capacity(self.long_count());
        for (name, spec) in self.iter() {
            if let Some(long) = &spec.long {
                table.push(LongOption {
                    name: long.clone(),
                    has_arg: spec.takes_arg(),
                    target: match spec.short {
                        Some(c) => OptTarget::Short(c),
                        None => OptTarget::Named {
                            name: name.clone(),
                            off: false,
                        },
                    },
                });
            }
            if let Some(long_off) = &spec.long_off {
                table.push(LongOption {
                    name: long_off.clone(),
                    has_arg: spec.takes_arg(),
                    target: match spec.short_off {
                        Some(c) => OptTarget::Short(c),
                        None => OptTarget::Named {
                            name: name.clone(),
                            off: true,
                        },
                    },
                });
            }
        }
        table
    }

    /// Highest `arg_num` among positional options that have no value yet
    pub fn required_positionals(&self) -> u32 {
        self.iter()
            .filter(|(_, spec)| !spec.has_value())
            .filter_map(|(_, spec)| spec.arg_num)
            .max()
            .unwrap_or(0)
    }

    fn is_builtin_flag(&self, builtin: &str, target: &OptTarget) -> bool {
        match target {
            OptTarget::Short(c) => self.spec(builtin).and_then(|s| s.short) == Some(*c),
            OptTarget::Named { name, off } => !off && name == builtin,
        }
    }

    fn apply_short(&mut self, c: char, arg: Option<String>) {
        for (_, spec) in self.iter_mut() {
            if spec.short == Some(c) {
                let value = if spec.takes_arg() {
                    OptionValue::Str(arg.unwrap_or_default())
                } else {
                    OptionValue::Int(1)
                };
                push_value(spec, value);
                return;
            }
            if spec.short_off == Some(c) {
                push_value(spec, OptionValue::Int(0));
                return;
            }
        }
    }

    fn apply_named(&mut self, name: &str, off: bool, arg: Option<String>) {
        let Some(spec) = self.options.get_mut(name) else {
            return;
        };
        let value = match (off, spec.takes_arg()) {
            (true, _) => OptionValue::Int(0),
            (false, true) => OptionValue::Str(arg.unwrap_or_default()),
            (false, false) => OptionValue::Int(1),
        };
        push_value(spec, value);
    }

    fn apply_positional(&mut self, position: u32, token: &str) {
        if let Some((_, spec)) = self
            .iter_mut()
            .find(|(_, spec)| spec.arg_num == Some(position))
        {
            push_value(spec, OptionValue::from(token));
        }
    }

    /// Apply `args` (with `args[0]` the program name) to the schema.
    ///
    /// Never exits; [`parse_args`](Self::parse_args) turns the help and
    /// version outcomes into process exits.
    pub fn parse(&mut self, args: &[String]) -> ParseOutcome {
        let shortopts = self.short_options();
        let longopts = self.long_options();
        let required = self.required_positionals();

        let mut getopt = Getopt::new(args, &shortopts, &longopts);
        for scanned in getopt.by_ref() {
            let (target, arg) = match scanned {
                Scanned::Invalid(_) => return ParseOutcome::ShowHelp,
                Scanned::Flag { target, arg } => (target, arg),
            };

            if self.is_builtin_flag("help", &target) {
                return ParseOutcome::ShowHelp;
            }
            if self.is_builtin_flag("version", &target) {
                return ParseOutcome::ShowVersion;
            }

            match target {
                OptTarget::Short(c) => self.apply_short(c, arg),
                OptTarget::Named { name, off } => self.apply_named(&name, off, arg),
            }
        }

        let positionals = getopt.into_positionals();
        for (position, token) in (1u32..).zip(positionals.iter()) {
            self.apply_positional(position, token);
        }

        if positionals.len() < required as usize {
            return ParseOutcome::MissingPositional {
                supplied: positionals.len(),
                required,
            };
        }

        ParseOutcome::Parsed
    }

    /// Parse the command line and publish the debug level to `state` and
    /// to the log filter, if one is already installed.
    ///
    /// Help (or an unrecognised flag) prints the usage text followed by
    /// the version banner and exits with status 1; the version flag prints
    /// the banner and exits with status 1. Returns false when required
    /// positional arguments are missing.
    pub fn parse_args(&mut self, args: &[String], state: &ProcessState) -> bool {
        match self.parse(args) {
            ParseOutcome::Parsed => {
                state.set_debug_level(self.get_integer("debug"));
                logging::set_level(state.debug_level());
                true
            }
            ParseOutcome::MissingPositional { supplied, required } => {
                tracing::debug!(supplied, required, "missing positional arguments");
                false
            }
            ParseOutcome::ShowHelp => {
                let mut out = io::stdout().lock();
                let _ = out.write_all(self.help_text().as_bytes());
                let _ = out.write_all(self.version_banner().as_bytes());
                let _ = out.flush();
                std::process::exit(EXIT_HELP);
            }
            ParseOutcome::ShowVersion => {
                let mut out = io::stdout().lock();
                let _ = out.write_all(self.version_banner().as_bytes());
                let _ = out.flush();
                std::process::exit(EXIT_HELP);
            }
        }
    }
}
