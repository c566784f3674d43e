//! Interactive read-eval-print shell.
//!
//! Each non-empty input line is parsed as a single statement and printed
//! back as an indented JSON rendering of its syntax tree, preceded by any
//! diagnostics the parse produced.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::io::{BufRead, Write};

use crate::config::Config;
use crate::parser::ast::Stmt;
use crate::parser::parse_statement;

const PROMPT: &str = ">> ";

/// Runs the read-eval-print loop until `input` is exhausted.
pub fn start(input: impl BufRead, mut out: impl Write, config: &Config) -> std::io::Result<()> {
    let indent = " ".repeat(config.format.indent as usize);
    write!(out, "{PROMPT}")?;
    out.flush()?;
    for line in input.lines() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            write!(out, "{PROMPT}")?;
            out.flush()?;
            continue;
        }

        let (stmt, errors) = parse_statement(text);
        for err in &errors {
            writeln!(out, "{err}")?;
        }
        match to_json(&stmt, indent.as_bytes()) {
            Ok(dump) => writeln!(out, "{dump}")?,
            Err(_) => writeln!(out, "{stmt:#?}")?,
        }
        write!(out, "{PROMPT}")?;
        out.flush()?;
    }
    Ok(())
}

fn to_json(stmt: &Stmt, indent: &[u8]) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    stmt.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
