//! Brace-balance cleanup of regenerated source text

use std::fmt;
use tracing::{debug, warn};

/// Final text for one file, with no line at which closing braces outnumber
/// opening ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedSource(String);

impl CleanedSource {
    /// Wrap text that did not go through structural pruning
    pub(crate) fn trusted(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for CleanedSource {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CleanedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for CleanedSource {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    BlockComment,
    Str(char),
    Template,
    /// `${ ... }` inside a template, opened at the given brace depth
    Interpolation(i64),
    /// Regular expression literal, possibly inside a `[...]` class
    Regex { in_class: bool },
}

/// Keywords after which a `/` starts a regular expression rather than a division
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw",
    "case", "do", "else", "yield", "await",
];

/// Tracks lexical state and brace depth across lines.
///
/// Braces are only counted in code; strings, comments, regex literals and
/// template text are skipped, and the `{`/`}` delimiting a template
/// interpolation do not count.
#[derive(Debug)]
struct BraceScanner {
    modes: Vec<Mode>,
    depth: i64,
    /// Whether a `/` at the current position would open a regex literal
    regex_allowed: bool,
    word: String,
}

impl BraceScanner {
    fn new() -> Self {
        Self {
            modes: vec![Mode::Code],
            depth: 0,
            regex_allowed: true,
            word: String::new(),
        }
    }

    fn mode(&self) -> Mode {
        self.modes.last().copied().unwrap_or(Mode::Code)
    }

    fn set_mode(&mut self, mode: Mode) {
        if let Some(top) = self.modes.last_mut() {
            *top = mode;
        }
    }

    fn in_plain_code(&self) -> bool {
        self.modes.len() == 1 && self.mode() == Mode::Code
    }

    fn end_word(&mut self) {
        if !self.word.is_empty() {
            self.regex_allowed = REGEX_PRECEDING_KEYWORDS.contains(&self.word.as_str());
            self.word.clear();
        }
    }

    fn scan_line(&mut self, line: &str) {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();
            match self.mode() {
                Mode::Code | Mode::Interpolation(_) => {
                    if c.is_alphanumeric() || c == '_' || c == '$' {
                        self.word.push(c);
                        i += 1;
                        continue;
                    }
                    self.end_word();
                    match c {
                        '/' if next == Some('/') => return,
                        '/' if next == Some('*') => {
                            self.modes.push(Mode::BlockComment);
                            i += 1;
                        }
                        '/' if self.regex_allowed => {
                            self.modes.push(Mode::Regex { in_class: false });
                        }
                        '\'' | '"' => {
                            self.modes.push(Mode::Str(c));
                            self.regex_allowed = false;
                        }
                        '`' => {
                            self.modes.push(Mode::Template);
                            self.regex_allowed = false;
                        }
                        '{' => {
                            self.depth += 1;
                            self.regex_allowed = true;
                        }
                        '}' => {
                            match self.mode() {
                                Mode::Interpolation(open) if open == self.depth => {
                                    self.modes.pop();
                                }
                                _ => self.depth -= 1,
                            }
                            self.regex_allowed = true;
                        }
                        // `</` closes a JSX tag
                        ')' | ']' | '<' => self.regex_allowed = false,
                        c if c.is_whitespace() => {}
                        _ => self.regex_allowed = true,
                    }
                }
                Mode::BlockComment => {
                    if c == '*' && next == Some('/') {
                        self.modes.pop();
                        i += 1;
                    }
                }
                Mode::Str(quote) => match c {
                    '\\' => i += 1,
                    '\n' => {
                        self.modes.pop();
                    }
                    c if c == quote => {
                        self.modes.pop();
                    }
                    _ => {}
                },
                Mode::Template => match c {
                    '\\' => i += 1,
                    '`' => {
                        self.modes.pop();
                    }
                    '$' if next == Some('{') => {
                        self.modes.push(Mode::Interpolation(self.depth));
                        self.regex_allowed = true;
                        i += 1;
                    }
                    _ => {}
                },
                Mode::Regex { in_class } => match c {
                    '\\' => i += 1,
                    '\n' => {
                        self.modes.pop();
                    }
                    '[' => self.set_mode(Mode::Regex { in_class: true }),
                    ']' => self.set_mode(Mode::Regex { in_class: false }),
                    '/' if !in_class => {
                        self.modes.pop();
                        self.regex_allowed = false;
                    }
                    _ => {}
                },
            }
            i += 1;
        }
        self.end_word();
    }
}

/// Remove lines consisting solely of a `}` that would close more blocks than
/// are open. No other content is ever changed.
pub fn clean(text: &str) -> CleanedSource {
    let mut scanner = BraceScanner::new();
    let mut out = String::with_capacity(text.len());
    let mut dropped = 0usize;

    for (index, line) in text.split_inclusive('\n').enumerate() {
        if scanner.in_plain_code() && scanner.depth == 0 && line.trim() == "}" {
            debug!(line = index + 1, "Dropping orphaned closing brace");
            dropped += 1;
            continue;
        }
        scanner.scan_line(line);
        out.push_str(line);
    }

    if dropped > 0 {
        debug!(dropped, "Brace cleanup removed lines");
    }
    if scanner.depth != 0 {
        warn!(depth = scanner.depth, "Regenerated text ends with unbalanced braces");
    }
    CleanedSource(out)
}

/// Whether the running brace depth of `text` never goes negative and ends at zero
pub fn is_balanced(text: &str) -> bool {
    let mut scanner = BraceScanner::new();
    for line in text.split_inclusive('\n') {
        scanner.scan_line(line);
        if scanner.depth < 0 {
            return false;
        }
    }
    scanner.depth == 0
}
