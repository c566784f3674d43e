//! Lexical scanner for SPL source code.
//!
//! The scanner is a pull-based tokenizer: every call to [`Scanner::scan`]
//! yields one `(Token, String, Position)` triple. Malformed input never
//! aborts the scan; it degrades to [`Token::Illegal`] carrying the
//! offending literal text, and the parser turns that into a diagnostic.

pub mod token;

use crate::position::Position;
use token::Token;

/// A lexical scanner which tokenizes source code.
pub struct Scanner {
    chars: Vec<char>,
    filename: String,
    /// Index of the next unread character.
    offset: usize,
    line: u32,
    /// Characters consumed on the current line.
    column: u32,
    /// One token of pushback, armed by `unscan`.
    pending: Option<(Token, String, Position)>,
    last: Option<(Token, String, Position)>,
}

impl Scanner {
    /// Returns a new scanner reading from the given source text.
    pub fn new(source: &str) -> Self {
        Self::with_filename(source, "")
    }

    /// Like `new`, but token positions carry the given filename.
    pub fn with_filename(source: &str, filename: impl Into<String>) -> Self {
        Scanner {
            chars: source.chars().collect(),
            filename: filename.into(),
            offset: 0,
            line: 1,
            column: 0,
            pending: None,
            last: None,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Scans the next token and returns the token itself, its literal text
    /// and its position in the source. The source end is indicated by
    /// `Token::Eof`, which is returned again on every subsequent call.
    pub fn scan(&mut self) -> (Token, String, Position) {
        if let Some(tok) = self.pending.take() {
            self.last = Some(tok.clone());
            return tok;
        }
        let tok = self.scan_token();
        self.last = Some(tok.clone());
        tok
    }

    /// Pushes the most recently scanned token back onto the scanner; the
    /// next call to `scan` returns it again. Exactly one token of pushback
    /// is supported.
    pub fn unscan(&mut self) {
        self.pending = self.last.take();
    }

    fn scan_token(&mut self) -> (Token, String, Position) {
        self.skip_whitespace();

        let Some(ch) = self.peek() else {
            let pos = Position {
                filename: self.filename.clone(),
                line: self.line,
                column: self.column,
                offset: self.offset as u32,
            };
            return (Token::Eof, String::new(), pos);
        };

        let pos = self.pos();
        if ch.is_ascii_alphabetic() {
            return self.scan_ident(pos);
        } else if ch.is_ascii_digit() {
            return self.scan_integer(pos);
        } else if ch == '\'' {
            return self.scan_char_literal(pos);
        }

        // Tokenize individual characters. No match yields an illegal token.
        self.consume();
        let tok = match ch {
            '+' => Token::Add,
            '-' => Token::Sub,
            '*' => Token::Mul,
            '/' => {
                if self.peek() == Some('/') {
                    return self.scan_comment(pos);
                }
                Token::Quo
            }
            '=' => Token::Eql,
            '<' => {
                if self.peek() == Some('=') {
                    self.consume();
                    return (Token::Leq, "<=".to_string(), pos);
                }
                Token::Lss
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.consume();
                    return (Token::Geq, ">=".to_string(), pos);
                }
                Token::Gtr
            }
            '#' => Token::Not,
            ':' => {
                if self.peek() == Some('=') {
                    self.consume();
                    return (Token::Assign, ":=".to_string(), pos);
                }
                Token::Colon
            }
            '(' => Token::Lparen,
            '[' => Token::Lbrack,
            '{' => Token::Lbrace,
            ')' => Token::Rparen,
            ']' => Token::Rbrack,
            '}' => Token::Rbrace,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            _ => Token::Illegal,
        };
        (tok, ch.to_string(), pos)
    }

    /// Consumes the current character and all contiguous comment
    /// characters up to (excluding) the end of the line.
    fn scan_comment(&mut self, pos: Position) -> (Token, String, Position) {
        let mut lit = String::from("/");
        while let Some(ch) = self.peek() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            lit.push(ch);
            self.consume();
        }
        (Token::Comment, lit, pos)
    }

    /// Consumes the current character and all contiguous identifier
    /// characters. A trailing underscore is illegal.
    fn scan_ident(&mut self, pos: Position) -> (Token, String, Position) {
        let mut lit = String::new();
        while let Some(ch) = self.peek() {
            if !ch.is_ascii_alphanumeric() && ch != '_' {
                break;
            }
            lit.push(ch);
            self.consume();
        }
        if lit.ends_with('_') {
            return (Token::Illegal, lit, pos);
        }
        (Token::lookup(&lit), lit, pos)
    }

    /// Consumes the current character and all contiguous integer
    /// characters. Accepts decimal and `0x`-prefixed hexadecimal runs that
    /// fit a 32-bit signed integer; an uppercase `X` marker is illegal.
    fn scan_integer(&mut self, pos: Position) -> (Token, String, Position) {
        let mut lit = String::new();
        while let Some(ch) = self.peek() {
            if !ch.is_ascii_alphanumeric() {
                break;
            }
            lit.push(ch);
            self.consume();
        }
        let parsed = if lit.contains('X') {
            Err(())
        } else if let Some(hex) = lit.strip_prefix("0x") {
            i32::from_str_radix(hex, 16).map(|_| ()).map_err(|_| ())
        } else {
            lit.parse::<i32>().map(|_| ()).map_err(|_| ())
        };
        match parsed {
            Ok(()) => (Token::Int, lit, pos),
            Err(()) => (Token::Illegal, lit, pos),
        }
    }

    /// Consumes a quoted character literal, which denotes the ASCII value
    /// of the enclosed character and is therefore an integer token.
    /// Valid forms are a single printable character (`'a'`) or a
    /// backslash escape (`'\n'`).
    fn scan_char_literal(&mut self, pos: Position) -> (Token, String, Position) {
        let mut lit = String::from("'");
        self.consume();

        let mut char_count = 1u32;
        let mut quote_count = 1u32;
        let mut space_count = 0u32;
        while let Some(ch) = self.peek() {
            if (quote_count == 2 && char_count >= 3) || quote_count > 2 || space_count > 2 {
                break;
            }
            char_count += 1;
            if ch == '\'' {
                quote_count += 1;
            } else if ch == ' ' {
                space_count += 1;
            }
            lit.push(ch);
            self.consume();
        }

        let b = lit.as_bytes();
        let n = b.len();
        if n < 3 || b[n - 1] != b'\'' {
            return (Token::Illegal, lit, pos);
        }
        let valid = match n {
            3 => (32..=126).contains(&b[1]) && b[1] != b'\\' && b[1] != b'\'',
            4 => b[1] == b'\\' && b[2].is_ascii_alphabetic(),
            _ => false,
        };
        if valid {
            (Token::Int, lit, pos)
        } else {
            (Token::Illegal, lit, pos)
        }
    }

    /// Consumes contiguous spaces, tabs and newlines, keeping the line and
    /// column counters current. Carriage returns fold into the following
    /// line feed, so CRLF and LF both count as a single line break.
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' => {
                    self.offset += 1;
                    self.column += 1;
                }
                '\n' => {
                    self.offset += 1;
                    self.line += 1;
                    self.column = 0;
                }
                '\r' => {
                    self.offset += 1;
                    self.column = 0;
                }
                _ => break,
            }
        }
    }

    /// Position of the next character to be read.
    fn pos(&self) -> Position {
        Position {
            filename: self.filename.clone(),
            line: self.line,
            column: self.column + 1,
            offset: self.offset as u32,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.offset).copied()
    }

    fn consume(&mut self) {
        self.offset += 1;
        self.column += 1;
    }
}
