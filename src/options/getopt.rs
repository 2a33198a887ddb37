//! getopt_long-compatible argument scanner
//!
//! Short options are described by an option string (`"ab:c"`, a trailing `:`
//! marks an option taking an argument), long options by a table. Supports
//! bundled shorts (`-abc`), attached or separate arguments (`-p80`,
//! `-p 80`, `--port=80`, `--port 80`), unique-prefix abbreviation of long
//! names, and `--` to end option processing. Bare tokens are collected in
//! order and scanning continues past them.

/// What a long option resolves to when matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptTarget {
    /// Reported as if the short character had been given
    Short(char),
    /// Long-only flag of a named option; `off` for its switch-off form
    Named { name: String, off: bool },
}

/// One entry of the long-option table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongOption {
    pub name: String,
    pub has_arg: bool,
    pub target: OptTarget,
}

/// A scanned flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scanned {
    Flag {
        target: OptTarget,
        arg: Option<String>,
    },
    /// Unrecognised option or missing argument; a diagnostic was printed
    Invalid(String),
}

/// Iterator over the flags in an argument vector; `args[0]` is the program name
pub struct Getopt<'a> {
    args: &'a [String],
    shortopts: &'a str,
    longopts: &'a [LongOption],
    index: usize,
    /// Char offset inside a short-option bundle, 0 when not in one
    bundle_pos: usize,
    positionals: Vec<String>,
}

impl<'a> Getopt<'a> {
    pub fn new(args: &'a [String], shortopts: &'a str, longopts: &'a [LongOption]) -> Self {
        Self {
            args,
            shortopts,
            longopts,
            index: 1,
            bundle_pos: 0,
            positionals: Vec::new(),
        }
    }

    /// Bare tokens seen so far, in command-line order
    pub fn positionals(&self) -> &[String] {
        &self.positionals
    }

    pub fn into_positionals(self) -> Vec<String> {
        self.positionals
    }

    fn program(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("")
    }

    /// Look up a short character; `Some(true)` if it takes an argument
    fn lookup_short(&self, c: char) -> Option<bool> {
        if c == ':' {
            return None;
        }
        let mut chars = self.shortopts.chars().peekable();
        while let Some(ch) = chars.next() {
            let needs_arg = chars.peek() == Some(&':');
            if needs_arg {
                chars.next();
            }
            if ch == c {
                return Some(needs_arg);
            }
        }
        None
    }

    fn finish_bundle(&mut self) {
        self.index += 1;
        self.bundle_pos = 0;
    }

    fn scan_short(&mut self) -> Scanned {
        let chars: Vec<char> = self.args[self.index].chars().collect();
        let c = chars[self.bundle_pos];
        self.bundle_pos += 1;
        let at_end = self.bundle_pos >= chars.len();

        match self.lookup_short(c) {
            None => {
                eprintln!("{}: invalid option -- '{}'", self.program(), c);
                if at_end {
                    self.finish_bundle();
                }
                Scanned::Invalid(format!("-{}", c))
            }
            Some(false) => {
                if at_end {
                    self.finish_bundle();
                }
                Scanned::Flag {
                    target: OptTarget::Short(c),
                    arg: None,
                }
            }
            Some(true) => {
                if !at_end {
                    let arg: String = chars[self.bundle_pos..].iter().collect();
                    self.finish_bundle();
                    Scanned::Flag {
                        target: OptTarget::Short(c),
                        arg: Some(arg),
                    }
                } else if self.index + 1 < self.args.len() {
                    let arg = self.args[self.index + 1].clone();
                    self.index += 2;
                    self.bundle_pos = 0;
                    Scanned::Flag {
                        target: OptTarget::Short(c),
                        arg: Some(arg),
                    }
                } else {
                    eprintln!("{}: option requires an argument -- '{}'", self.program(), c);
                    self.finish_bundle();
                    Scanned::Invalid(format!("-{}", c))
                }
            }
        }
    }

    fn find_long(&self, name: &str) -> Result<&'a LongOption, String> {
        if let Some(exact) = self.longopts.iter().find(|o| o.name == name) {
            return Ok(exact);
        }

        let candidates: Vec<&'a LongOption> = self
            .longopts
            .iter()
            .filter(|o| o.name.starts_with(name))
            .collect();

        match candidates.as_slice() {
            [] => Err(format!("unrecognized option '--{}'", name)),
            [only] => Ok(*only),
            [first, rest @ ..] => {
                // Abbreviations are fine as long as every candidate means the same thing
                if rest
                    .iter()
                    .all(|o| o.target == first.target && o.has_arg == first.has_arg)
                {
                    Ok(*first)
                } else {
                    Err(format!("option '--{}' is ambiguous", name))
                }
            }
        }
    }

    fn scan_long(&mut self) -> Scanned {
        let args = self.args;
        let token = &args[self.index];
        let body = &token[2..];
        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (body, None),
        };
        self.index += 1;

        if name.is_empty() {
            eprintln!("{}: unrecognized option '{}'", self.program(), token);
            return Scanned::Invalid(token.clone());
        }

        let option = match self.find_long(name) {
            Ok(option) => option,
            Err(message) => {
                eprintln!("{}: {}", self.program(), message);
                return Scanned::Invalid(token.clone());
            }
        };

        let arg = match (option.has_arg, inline) {
            (true, Some(value)) => Some(value),
            (true, None) => {
                if self.index < args.len() {
                    let value = args[self.index].clone();
                    self.index += 1;
                    Some(value)
                } else {
                    eprintln!(
                        "{}: option '--{}' requires an argument",
                        self.program(),
                        option.name
                    );
                    return Scanned::Invalid(token.clone());
                }
            }
            (false, Some(_)) => {
                eprintln!(
                    "{}: option '--{}' doesn't allow an argument",
                    self.program(),
                    option.name
                );
                return Scanned::Invalid(token.clone());
            }
            (false, None) => None,
        };

        Scanned::Flag {
            target: option.target.clone(),
            arg,
        }
    }
}

impl Iterator for Getopt<'_> {
    type Item = Scanned;

    fn next(&mut self) -> Option<Scanned> {
        let args = self.args;
        loop {
            if self.bundle_pos > 0 {
                return Some(self.scan_short());
            }

            let token = args.get(self.index)?;

            if token == "--" {
                self.positionals.extend(args[self.index + 1..].iter().cloned());
                self.index = args.len();
                return None;
            }

            if token.starts_with("--") {
                return Some(self.scan_long());
            }

            if token.starts_with('-') && token.len() > 1 {
                self.bundle_pos = 1;
                continue;
            }

            self.positionals.push(token.clone());
            self.index += 1;
        }
    }
}
