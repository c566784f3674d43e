//! Position-tagged diagnostics and their rendering.

use serde::Serialize;
use std::fmt;

use crate::position::Position;

/// A single diagnostic. The position, if valid, points to the beginning
/// of the offending token; the condition is described by `msg`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Error {
    pub pos: Position,
    pub msg: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.pos.filename.is_empty() || self.pos.is_valid() {
            write!(f, "{}: {}", self.pos, self.msg)
        } else {
            f.write_str(&self.msg)
        }
    }
}

impl std::error::Error for Error {}

/// An ordered collection of diagnostics. The default value is an empty
/// list ready to use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorList {
    errors: Vec<Error>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic with the given position and message.
    pub fn add(&mut self, pos: Position, msg: impl Into<String>) {
        self.errors.push(Error { pos, msg: msg.into() });
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.errors.iter()
    }

    /// Sorts the list by filename, line, column and finally message text,
    /// giving reproducible output across repeated parses of the same
    /// erroneous input. Sorting an already sorted list is a no-op.
    pub fn sort(&mut self) {
        self.errors.sort_by(|a, b| {
            (&a.pos.filename, a.pos.line, a.pos.column, &a.msg)
                .cmp(&(&b.pos.filename, b.pos.line, b.pos.column, &b.msg))
        });
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => f.write_str("no errors"),
            [err] => write!(f, "{err}"),
            [first, rest @ ..] => write!(f, "{first} (and {} more errors)", rest.len()),
        }
    }
}

impl std::error::Error for ErrorList {}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Errors surfaced by the front-end tooling around the parser. The parser
/// itself never fails on malformed input; it accumulates an [`ErrorList`].
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ErrorList),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Renders each diagnostic as a terminal report with the offending source
/// region underlined.
pub fn render(source: &str, errors: &ErrorList) {
    use ariadne::{Label, Report, ReportKind, Source};

    let len = source.chars().count();
    for err in errors {
        let start = (err.pos.offset as usize).min(len);
        let end = (start + 1).min(len).max(start);
        let _ = Report::build(ReportKind::Error, (), start)
            .with_message(&err.msg)
            .with_label(Label::new(start..end).with_message(&err.msg))
            .finish()
            .eprint(Source::from(source));
    }
}
