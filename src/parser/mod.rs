//! Recursive-descent parser for SPL.
//!
//! The parser pulls tokens from a [`Scanner`] one at a time, builds the
//! syntax tree bottom-up per grammar rule, and interleaves scope
//! management and identifier resolution with parsing. Malformed input is
//! never fatal: unexpected tokens become diagnostics, recovery advances
//! to a synchronization set, and the affected region is covered by a
//! `Bad*` placeholder node spanning exactly the skipped tokens.

pub mod ast;
pub mod scope;

use std::mem;
use std::path::Path;

use crate::diagnostics::ErrorList;
use crate::lexer::Scanner;
use crate::lexer::token::{LOWEST_PREC, Token};
use crate::position::Position;
use ast::*;
use scope::{Binding, ObjKind, Object, ScopeArena, ScopeId};

/// Tokens a failed statement synchronizes on.
const STMT_START: &[Token] = &[
    Token::Array,
    Token::Else,
    Token::If,
    Token::Of,
    Token::Proc,
    Token::Ref,
    Token::Type,
    Token::Var,
    Token::While,
];

/// Tokens a failed top-level declaration synchronizes on.
const DECL_START: &[Token] = &[Token::Proc, Token::Type, Token::Var];

/// Tokens a failed type expression synchronizes on.
const EXPR_END: &[Token] = &[Token::Rparen];

/// Parses a complete source unit and resolves as many identifiers as
/// possible against the whole top-level declaration set.
pub fn parse(source: &str) -> (Program, ErrorList) {
    Parser::new(source).parse_program()
}

/// Like [`parse`], reading the source from a file; token and diagnostic
/// positions carry the filename.
pub fn parse_file(path: impl AsRef<Path>) -> std::io::Result<(Program, ErrorList)> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    let mut parser = Parser::with_filename(&source, path.display().to_string());
    Ok(parser.parse_program())
}

/// Parses exactly one statement from a text snippet. The statement does
/// not participate in whole-program resolution.
pub fn parse_statement(source: &str) -> (Stmt, ErrorList) {
    let mut p = Parser::new(source);
    p.next();
    let stmt = p.parse_stmt();
    let mut errors = p.errors;
    errors.sort();
    (stmt, errors)
}

/// A parser for the simple programming language. The parser owns its
/// scanner, its scope stack and its diagnostic list; a single instance is
/// not meant to be shared between threads, and each independent source
/// should use its own instance.
pub struct Parser {
    scanner: Scanner,
    errors: ErrorList,

    // Current token.
    tok: Token,
    lit: String,
    pos: Position,

    // Error recovery stall guard.
    sync_pos: Position,
    sync_cnt: u32,

    // Identifier scopes.
    arena: ScopeArena,
    pkg_scope: ScopeId,
    top_scope: ScopeId,
}

impl Parser {
    /// Returns a new parser reading from the given source text.
    pub fn new(source: &str) -> Self {
        Self::with_scanner(Scanner::new(source))
    }

    /// Like `new`, but positions carry the given filename.
    pub fn with_filename(source: &str, filename: impl Into<String>) -> Self {
        Self::with_scanner(Scanner::with_filename(source, filename))
    }

    fn with_scanner(scanner: Scanner) -> Self {
        let mut arena = ScopeArena::new();
        let pkg_scope = arena.push_scope(None);
        Parser {
            scanner,
            errors: ErrorList::new(),
            tok: Token::Eof,
            lit: String::new(),
            pos: Position::default(),
            sync_pos: Position::default(),
            sync_cnt: 0,
            arena,
            pkg_scope,
            top_scope: pkg_scope,
        }
    }

    /// Provides the parser with a new character source, effectively adding
    /// a new source of tokens while preserving the scope and diagnostic
    /// context built so far.
    pub fn feed(&mut self, source: &str) {
        self.scanner = Scanner::new(source);
    }

    /// Parses the source the parser currently reads from: a sequence of
    /// top-level declarations up to end of input. Identifiers that stayed
    /// unresolved during parsing are retried once against the completed
    /// package scope, which is what lets mutually recursive procedures
    /// refer to each other without forward declarations.
    pub fn parse_program(&mut self) -> (Program, ErrorList) {
        let name = self.scanner.filename().to_string();

        // If scanning the first token already fails, this is probably not
        // an SPL source at all.
        let before = self.errors.len();
        self.next();
        if self.errors.len() > before {
            let mut errors = self.errors.clone();
            errors.sort();
            let program = Program {
                name,
                decls: Vec::new(),
                unresolved: Vec::new(),
                scopes: self.arena.clone(),
                pkg_scope: self.pkg_scope,
            };
            return (program, errors);
        }

        let mut decls = Vec::new();
        while self.tok != Token::Eof {
            decls.push(self.parse_decl(DECL_START));
        }

        // Resolve global identifiers against the completed package scope.
        let mut unresolved = Vec::new();
        for decl in &decls {
            decl.for_each_ident(&mut |ident| {
                if ident.binding.get() == Binding::Unresolved {
                    match self.arena.lookup(self.pkg_scope, &ident.name) {
                        Some(obj) => ident.binding.set(Binding::Resolved(obj)),
                        None => unresolved.push(ident.clone()),
                    }
                }
            });
        }

        let mut errors = self.errors.clone();
        errors.sort();
        let program = Program {
            name,
            decls,
            unresolved,
            scopes: self.arena.clone(),
            pkg_scope: self.pkg_scope,
        };
        (program, errors)
    }

    // -------------------------------------------------------------------
    // Declarations

    fn parse_decl(&mut self, sync: &[Token]) -> Decl {
        match self.tok {
            Token::Var => Decl::Var(self.parse_var_decl()),
            Token::Type => Decl::Type(self.parse_type_decl()),
            Token::Proc => Decl::Proc(self.parse_proc_decl()),
            _ => {
                let pos = self.pos.clone();
                self.advance(sync);
                self.error_expected(pos.clone(), "declaration");
                Decl::Bad(BadDecl { from: pos, to: self.pos.clone() })
            }
        }
    }

    fn parse_var_decl(&mut self) -> VarDecl {
        self.expect(Token::Var);
        let ident = self.parse_ident();
        self.expect(Token::Colon);
        let typ = self.try_type();
        self.expect_semi();
        let typ = match typ {
            Some(typ) => typ,
            None => {
                self.error(ident.name_pos.clone(), "missing variable type");
                Expr::Bad(BadExpr { from: ident.name_pos.clone(), to: ident.name_pos.clone() })
            }
        };

        self.declare(ObjKind::Var, self.top_scope, &ident);
        VarDecl { name: ident, typ }
    }

    fn parse_type_decl(&mut self) -> TypeDecl {
        self.expect(Token::Type);
        let ident = self.parse_ident();
        // The type name is visible to its own definition.
        self.declare(ObjKind::Type, self.top_scope, &ident);
        let assign = self.expect(Token::Eql);
        let typ = self.parse_type();
        self.expect_semi();
        TypeDecl { name: ident, assign, typ }
    }

    fn parse_proc_decl(&mut self) -> ProcDecl {
        let pos = self.expect(Token::Proc);
        let scope = self.arena.push_scope(Some(self.top_scope));
        let ident = self.parse_ident();
        let params = self.parse_parameters(scope);
        let body = self.parse_body(scope);

        // Procedure names land in the package scope so procedures may call
        // each other regardless of declaration order.
        self.declare(ObjKind::Proc, self.pkg_scope, &ident);
        ProcDecl { proc_pos: pos, name: ident, params, body }
    }

    // -------------------------------------------------------------------
    // Identifiers

    fn parse_ident(&mut self) -> Ident {
        let pos = self.pos.clone();
        let name = if self.tok == Token::Ident {
            let name = mem::take(&mut self.lit);
            self.next();
            name
        } else {
            self.expect(Token::Ident);
            String::new()
        };
        Ident::new(pos, name)
    }

    // -------------------------------------------------------------------
    // Common productions

    /// Parses a left-hand-side expression. Identifier resolution is
    /// deferred until the construct is known not to be a type position,
    /// then applied to the outermost operand.
    fn parse_lhs(&mut self) -> Expr {
        let x = self.parse_expr(true);
        let x = self.check_expr(x);
        self.resolve(&x);
        x
    }

    /// Parses a right-hand-side expression; identifiers resolve as they
    /// are consumed.
    fn parse_rhs(&mut self) -> Expr {
        let x = self.parse_expr(false);
        self.check_expr(x)
    }

    // -------------------------------------------------------------------
    // Types

    fn parse_type(&mut self) -> Expr {
        match self.try_type() {
            Some(typ) => typ,
            None => {
                let pos = self.pos.clone();
                self.error_expected(pos.clone(), "type");
                self.advance(EXPR_END);
                Expr::Bad(BadExpr { from: pos, to: self.pos.clone() })
            }
        }
    }

    fn try_type(&mut self) -> Option<Expr> {
        let typ = self.try_ident_or_type();
        if let Some(typ) = &typ {
            self.resolve(typ);
        }
        typ
    }

    /// Parses an identifier, array type or parenthesized type, or returns
    /// `None` if the current token starts none of them. The result is not
    /// resolved; value-expression callers must vet it with `check_expr`.
    fn try_ident_or_type(&mut self) -> Option<Expr> {
        match self.tok {
            Token::Ident => Some(Expr::Ident(self.parse_ident())),
            Token::Array => Some(self.parse_array_type()),
            Token::Lparen => {
                let lparen = self.pos.clone();
                self.next();
                let typ = self.parse_type();
                let rparen = self.expect(Token::Rparen);
                Some(Expr::Paren(ParenExpr { lparen, x: Box::new(typ), rparen }))
            }
            _ => None,
        }
    }

    /// Like `parse_type` but recovers by skipping a single token, which
    /// keeps parameter-list parsing on track.
    fn parse_var_type(&mut self) -> Expr {
        match self.try_ident_or_type() {
            Some(typ) => typ,
            None => {
                let pos = self.pos.clone();
                self.error_expected(pos.clone(), "type");
                self.next();
                Expr::Bad(BadExpr { from: pos, to: self.pos.clone() })
            }
        }
    }

    fn parse_array_type(&mut self) -> Expr {
        let array = self.expect(Token::Array);
        self.expect(Token::Lbrack);
        let len = self.parse_rhs();
        self.expect(Token::Rbrack);
        let of = self.expect(Token::Of);
        let elt = self.parse_type();
        Expr::Array(ArrayType { array, len: Box::new(len), of, elt: Box::new(elt) })
    }

    fn parse_parameters(&mut self, scope: ScopeId) -> FieldList {
        let opening = self.expect(Token::Lparen);
        let list = if self.tok != Token::Rparen {
            self.parse_parameter_list(scope)
        } else {
            Vec::new()
        };
        let closing = self.expect(Token::Rparen);
        FieldList { opening, list, closing }
    }

    fn parse_parameter_list(&mut self, scope: ScopeId) -> Vec<Field> {
        let mut params = Vec::new();
        while self.tok != Token::Rparen && self.tok != Token::Eof {
            let ref_pos = self.optional(Token::Ref);
            let ident = self.parse_ident();
            self.expect(Token::Colon);
            let typ = self.parse_var_type();
            self.declare(ObjKind::Var, scope, &ident);
            self.resolve(&typ);
            params.push(Field { ref_pos, name: ident, typ });
            if !self.at_comma("parameter list", Token::Rparen) {
                break;
            }
            self.next();
        }
        params
    }

    // -------------------------------------------------------------------
    // Blocks

    fn parse_stmt_list(&mut self) -> Vec<Stmt> {
        let mut list = Vec::new();
        while self.tok != Token::Rbrace && self.tok != Token::Eof {
            // A bare semicolon terminates an empty statement.
            if self.tok == Token::Semicolon {
                self.next();
                continue;
            }
            list.push(self.parse_stmt());
        }
        list
    }

    /// Parses a procedure body into the given parameter scope.
    fn parse_body(&mut self, scope: ScopeId) -> BlockStmt {
        let lbrace = self.expect(Token::Lbrace);
        self.top_scope = scope;
        let list = self.parse_stmt_list();
        self.close_scope();
        let rbrace = self.expect(Token::Rbrace);
        BlockStmt { lbrace, list, rbrace }
    }

    fn parse_block_stmt(&mut self) -> BlockStmt {
        let lbrace = self.expect(Token::Lbrace);
        self.open_scope();
        let list = self.parse_stmt_list();
        self.close_scope();
        let rbrace = self.expect(Token::Rbrace);
        BlockStmt { lbrace, list, rbrace }
    }

    // -------------------------------------------------------------------
    // Expressions

    /// Checks that `x` is an expression and not a type.
    fn check_expr(&mut self, x: Expr) -> Expr {
        match unparen(&x) {
            Expr::Array(_) => {
                let (from, to) = (x.pos(), x.end());
                self.error_expected(from.clone(), "expression");
                Expr::Bad(BadExpr { from, to })
            }
            _ => x,
        }
    }

    /// If `lhs` is set and the result is an identifier, it is not
    /// resolved. The result may be a type; callers must vet it with
    /// `check_expr`.
    fn parse_expr(&mut self, lhs: bool) -> Expr {
        self.parse_binary_expr(lhs, LOWEST_PREC + 1)
    }

    fn parse_binary_expr(&mut self, lhs: bool, prec1: i32) -> Expr {
        let mut x = self.parse_unary_expr(lhs);
        let mut lhs = lhs;
        loop {
            let op = self.tok;
            let oprec = op.precedence();
            if oprec < prec1 {
                return x;
            }
            let pos = self.expect(op);
            if lhs {
                self.resolve(&x);
                lhs = false;
            }
            // The left operand binds before the right at every level,
            // matching the language's left-to-right evaluation order.
            let y = self.parse_binary_expr(false, oprec + 1);
            let x_checked = self.check_expr(x);
            let y_checked = self.check_expr(y);
            x = Expr::Binary(BinaryExpr {
                x: Box::new(x_checked),
                op_pos: pos,
                op,
                y: Box::new(y_checked),
            });
        }
    }

    fn parse_unary_expr(&mut self, lhs: bool) -> Expr {
        if matches!(self.tok, Token::Add | Token::Sub | Token::Not | Token::Mul) {
            let (pos, op) = (self.pos.clone(), self.tok);
            self.next();
            let x = self.parse_unary_expr(false);
            let x = self.check_expr(x);
            return Expr::Unary(UnaryExpr { op_pos: pos, op, x: Box::new(x) });
        }
        self.parse_primary_expr(lhs)
    }

    /// Chains postfix `[...]` indexing and `(...)` calls onto an operand,
    /// left-associatively.
    fn parse_primary_expr(&mut self, lhs: bool) -> Expr {
        let mut x = self.parse_operand(lhs);
        let mut lhs = lhs;
        loop {
            match self.tok {
                Token::Lbrack => {
                    if lhs {
                        self.resolve(&x);
                    }
                    let x_checked = self.check_expr(x);
                    x = self.parse_index(x_checked);
                }
                Token::Lparen => {
                    if lhs {
                        self.resolve(&x);
                    }
                    let x_checked = self.check_expr(x);
                    x = self.parse_call(x_checked);
                }
                _ => return x,
            }
            lhs = false;
        }
    }

    /// Parses an operand, which may also be a raw type (including array
    /// types); callers must verify the result.
    fn parse_operand(&mut self, lhs: bool) -> Expr {
        match self.tok {
            Token::Ident => {
                let ident = Expr::Ident(self.parse_ident());
                if !lhs {
                    self.resolve(&ident);
                }
                return ident;
            }
            Token::Int => {
                let lit = IntLit { value_pos: self.pos.clone(), value: mem::take(&mut self.lit) };
                self.next();
                return Expr::IntLit(lit);
            }
            Token::Lparen => {
                let lparen = self.pos.clone();
                self.next();
                let x = self.parse_rhs();
                let rparen = self.expect(Token::Rparen);
                return Expr::Paren(ParenExpr { lparen, x: Box::new(x), rparen });
            }
            _ => {}
        }

        if let Some(typ) = self.try_ident_or_type() {
            return typ;
        }

        let pos = self.pos.clone();
        self.error_expected(pos.clone(), "operand");
        self.advance(STMT_START);
        Expr::Bad(BadExpr { from: pos, to: self.pos.clone() })
    }

    fn parse_index(&mut self, x: Expr) -> Expr {
        let lbrack = self.expect(Token::Lbrack);
        let index = self.parse_rhs();
        let rbrack = self.expect(Token::Rbrack);
        Expr::Index(IndexExpr { x: Box::new(x), lbrack, index: Box::new(index), rbrack })
    }

    fn parse_call(&mut self, pro: Expr) -> Expr {
        let lparen = self.expect(Token::Lparen);
        let mut args = Vec::new();
        while self.tok != Token::Rparen && self.tok != Token::Eof {
            args.push(self.parse_rhs());
            if !self.at_comma("argument list", Token::Rparen) {
                break;
            }
            self.next();
        }
        let rparen = self.expect_closing(Token::Rparen, "argument list");
        Expr::Call(CallExpr { pro: Box::new(pro), lparen, args, rparen })
    }

    // -------------------------------------------------------------------
    // Statements

    fn parse_stmt(&mut self) -> Stmt {
        match self.tok {
            Token::Var | Token::Type => Stmt::Decl(DeclStmt { decl: self.parse_decl(STMT_START) }),
            Token::Ident
            | Token::Int
            | Token::Lparen
            | Token::Lbrack
            | Token::Add
            | Token::Sub
            | Token::Mul
            | Token::Not => {
                let stmt = self.parse_simple_stmt();
                self.expect_semi();
                stmt
            }
            Token::Lbrace => {
                let block = self.parse_block_stmt();
                self.expect_semi();
                Stmt::Block(block)
            }
            Token::While => self.parse_while_stmt(),
            Token::If => self.parse_if_stmt(),
            _ => {
                let pos = self.pos.clone();
                self.error_expected(pos.clone(), "statement");
                self.advance(STMT_START);
                Stmt::Bad(BadStmt { from: pos, to: self.pos.clone() })
            }
        }
    }

    fn parse_simple_stmt(&mut self) -> Stmt {
        let x = self.parse_lhs();
        if self.tok == Token::Assign {
            let (pos, tok) = (self.pos.clone(), self.tok);
            self.next();
            let y = self.parse_rhs();
            return Stmt::Assign(AssignStmt { left: x, tok_pos: pos, tok, right: y });
        }
        Stmt::Expr(ExprStmt { x })
    }

    /// Parses an `if`/`while` body: a brace block (without a trailing
    /// semicolon) or any single statement.
    fn parse_body_or_stmt(&mut self) -> Stmt {
        if self.tok == Token::Lbrace {
            Stmt::Block(self.parse_block_stmt())
        } else {
            self.parse_stmt()
        }
    }

    fn parse_while_stmt(&mut self) -> Stmt {
        let pos = self.expect(Token::While);
        self.expect(Token::Lparen);
        let cond = self.parse_rhs();
        self.expect(Token::Rparen);
        let body = self.parse_body_or_stmt();
        Stmt::While(WhileStmt { while_pos: pos, cond, body: Box::new(body) })
    }

    fn parse_if_stmt(&mut self) -> Stmt {
        let pos = self.expect(Token::If);
        self.expect(Token::Lparen);
        let cond = self.parse_rhs();
        self.expect(Token::Rparen);
        let body = self.parse_body_or_stmt();

        // An else binds to the nearest still-unmatched if.
        let else_stmt = if self.tok == Token::Else {
            self.next();
            Some(Box::new(self.parse_body_or_stmt()))
        } else {
            None
        };

        Stmt::If(IfStmt { if_pos: pos, cond, body: Box::new(body), else_stmt })
    }

    // -------------------------------------------------------------------
    // Scoping support

    fn open_scope(&mut self) {
        self.top_scope = self.arena.push_scope(Some(self.top_scope));
    }

    fn close_scope(&mut self) {
        self.top_scope = self
            .arena
            .outer(self.top_scope)
            .expect("scope stack underflow");
    }

    /// Declares the identifier in the given scope. Redeclaring a name is a
    /// diagnostic, not a fatal error; the original binding wins.
    fn declare(&mut self, kind: ObjKind, scope: ScopeId, ident: &Ident) {
        let id = self.arena.alloc(Object {
            kind,
            name: ident.name.clone(),
            decl: ident.name_pos.clone(),
        });
        ident.binding.set(Binding::Resolved(id));
        if let Some(prev) = self.arena.insert(scope, id) {
            let mut msg = format!("{} redeclared in this block", ident.name);
            let prev_pos = &self.arena.object(prev).decl;
            if prev_pos.is_valid() {
                msg.push_str(&format!("\n\tprevious declaration at {prev_pos}"));
            }
            self.error(ident.name_pos.clone(), msg);
        }
    }

    /// If `x` is an identifier, binds it to the object its name resolves
    /// to, walking outward from the top scope. A miss marks the identifier
    /// unresolved so the end-of-program pass can retry it.
    fn resolve(&mut self, x: &Expr) {
        let Expr::Ident(ident) = x else { return };
        match self.arena.resolve(self.top_scope, &ident.name) {
            Some(obj) => ident.binding.set(Binding::Resolved(obj)),
            None => ident.binding.set(Binding::Unresolved),
        }
    }

    // -------------------------------------------------------------------
    // Parsing support

    fn expect(&mut self, tok: Token) -> Position {
        let pos = self.pos.clone();
        if self.tok != tok {
            self.error_expected(pos.clone(), &format!("'{tok}'"));
        }
        self.next();
        pos
    }

    fn optional(&mut self, tok: Token) -> Option<Position> {
        if self.tok != tok {
            return None;
        }
        let pos = self.pos.clone();
        self.next();
        Some(pos)
    }

    /// Like `expect` but with a better message for the common case of a
    /// missing comma before a newline-synthesized semicolon.
    fn expect_closing(&mut self, tok: Token, context: &str) -> Position {
        if self.tok != tok && self.tok == Token::Semicolon && self.lit == "\n" {
            self.error(self.pos.clone(), format!("missing ',' before newline in {context}"));
            self.next();
        }
        self.expect(tok)
    }

    fn expect_semi(&mut self) {
        // A closing ')' or '}' stands in for a semicolon.
        if self.tok != Token::Rparen && self.tok != Token::Rbrace {
            match self.tok {
                Token::Comma => {
                    self.error_expected(self.pos.clone(), "';'");
                    self.next();
                }
                Token::Semicolon => self.next(),
                _ => {
                    self.error_expected(self.pos.clone(), "';'");
                    self.advance(STMT_START);
                }
            }
        }
    }

    fn at_comma(&mut self, context: &str, follow: Token) -> bool {
        if self.tok == Token::Comma {
            return true;
        }
        if self.tok != follow {
            let mut msg = String::from("missing ','");
            if self.tok == Token::Semicolon && self.lit == "\n" {
                msg.push_str(" before newline");
            }
            msg.push_str(&format!(" in {context}"));
            self.error(self.pos.clone(), msg);
            return true;
        }
        false
    }

    /// Advances to the next non-comment token, reporting and skipping any
    /// illegal tokens on the way so lexical garbage cannot cascade into
    /// grammar errors.
    fn next(&mut self) {
        loop {
            let (tok, lit, pos) = self.scanner.scan();
            match tok {
                Token::Comment => continue,
                Token::Illegal => {
                    self.error(pos, format!("illegal token '{lit}'"));
                    continue;
                }
                _ => {
                    self.tok = tok;
                    self.lit = lit;
                    self.pos = pos;
                    return;
                }
            }
        }
    }

    /// Consumes tokens until the current token is in `to` or end of input.
    /// A stall guard permits at most 10 stops at the same position without
    /// forward progress, bounding worst-case recovery on malformed input.
    fn advance(&mut self, to: &[Token]) {
        while self.tok != Token::Eof {
            if to.contains(&self.tok) {
                if self.pos == self.sync_pos && self.sync_cnt < 10 {
                    self.sync_cnt += 1;
                    return;
                }
                if self.pos.line > self.sync_pos.line && self.pos.column > self.sync_pos.column {
                    self.sync_pos = self.pos.clone();
                    self.sync_cnt = 0;
                    return;
                }
            }
            self.next();
        }
    }

    // -------------------------------------------------------------------
    // Errors

    fn error(&mut self, pos: Position, msg: impl Into<String>) {
        self.errors.add(pos, msg);
    }

    fn error_expected(&mut self, pos: Position, what: &str) {
        let mut msg = format!("expected {what}");
        if pos == self.pos {
            // The error happened at the current position; make the message
            // more specific.
            if self.tok == Token::Semicolon && self.lit == "\n" {
                msg.push_str(", found newline");
            } else if self.tok.is_literal() {
                msg.push_str(&format!(", found {}", self.lit));
            } else {
                msg.push_str(&format!(", found '{}'", self.tok));
            }
        }
        self.error(pos, msg);
    }
}
