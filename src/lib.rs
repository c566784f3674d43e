//! Front end for the simple programming language (SPL): scanner, parser,
//! syntax tree and identifier resolution, plus the thin tooling around
//! them (diagnostics rendering, REPL, configuration).

pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod position;
pub mod repl;
pub mod types;

pub use diagnostics::{CompileError, ErrorList};
pub use parser::{parse, parse_file, parse_statement};
