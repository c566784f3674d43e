//! Property-based tests for the front end: termination, no panics, and
//! structural position invariants across generated programs.

use proptest::prelude::*;

use spl::lexer::Scanner;
use spl::lexer::token::Token;
use spl::parser::ast::{Decl, Expr, Stmt};
use spl::position::Position;
use spl::{parse, parse_statement};

// ---------------------------------------------------------------------
// Generators

/// One unique top-level declaration per index, so generated programs never
/// trip the redeclaration diagnostic.
fn arb_decl(index: usize) -> impl Strategy<Value = String> {
    prop_oneof![
        prop::bool::ANY.prop_map(move |use_vector| {
            let typ = if use_vector { "vector0" } else { "int" };
            format!("var v{index}: {typ};")
        }),
        (1u32..100).prop_map(move |n| format!("type t{index} = array [{n}] of int;")),
        (1u32..100).prop_map(move |n| {
            format!("proc p{index}(a: int, ref b: int) {{ b := a + {n}; }}")
        }),
    ]
}

fn arb_program() -> impl Strategy<Value = String> {
    (1usize..6)
        .prop_flat_map(|count| {
            let decls: Vec<_> = (0..count).map(arb_decl).collect();
            decls
        })
        .prop_map(|decls| {
            // A leading type declaration keeps the "vector0" type name
            // resolvable wherever the variable generator picked it.
            let mut source = String::from("type vector0 = array [4] of int;\n");
            for decl in decls {
                source.push_str(&decl);
                source.push('\n');
            }
            source
        })
}

fn arb_statement() -> impl Strategy<Value = String> {
    // The generated names get an "x" prefix so they can never collide
    // with a keyword.
    prop_oneof![
        ("[a-z][a-z0-9]{0,5}", 0i32..1000).prop_map(|(name, n)| format!("x{name} := {n};")),
        ("[a-z][a-z0-9]{0,5}", 1i32..9)
            .prop_map(|(name, n)| format!("while (x{name} < {n}) x{name} := x{name} + 1;")),
        ("[a-z][a-z0-9]{0,5}", 1i32..9)
            .prop_map(|(name, n)| format!("if (x{name} = {n}) x{name} := 0; else x{name} := {n};")),
        ("[a-z][a-z0-9]{0,5}", 0i32..100)
            .prop_map(|(name, n)| format!("x{name}({n}, x{name}[{n}]);")),
    ]
}

// ---------------------------------------------------------------------
// Position invariant checking

fn check_span(pos: &Position, end: &Position, what: &str) {
    assert!(pos <= end, "{what}: end {end:?} precedes pos {pos:?}");
}

fn check_expr(x: &Expr) {
    check_span(&x.pos(), &x.end(), "expr");
    match x {
        Expr::Bad(_) | Expr::Ident(_) | Expr::IntLit(_) => {}
        Expr::Paren(p) => check_expr(&p.x),
        Expr::Unary(u) => check_expr(&u.x),
        Expr::Binary(b) => {
            check_expr(&b.x);
            check_expr(&b.y);
        }
        Expr::Index(i) => {
            check_expr(&i.x);
            check_expr(&i.index);
        }
        Expr::Call(c) => {
            check_expr(&c.pro);
            for arg in &c.args {
                check_expr(arg);
            }
        }
        Expr::Array(a) => {
            check_expr(&a.len);
            check_expr(&a.elt);
        }
    }
}

fn check_stmt(stmt: &Stmt) {
    check_span(&stmt.pos(), &stmt.end(), "stmt");
    match stmt {
        Stmt::Bad(_) => {}
        Stmt::Decl(d) => check_decl(&d.decl),
        Stmt::Block(b) => {
            for stmt in &b.list {
                check_stmt(stmt);
            }
        }
        Stmt::Expr(e) => check_expr(&e.x),
        Stmt::Assign(a) => {
            check_expr(&a.left);
            check_expr(&a.right);
        }
        Stmt::While(w) => {
            check_expr(&w.cond);
            check_stmt(&w.body);
        }
        Stmt::If(i) => {
            check_expr(&i.cond);
            check_stmt(&i.body);
            if let Some(alt) = &i.else_stmt {
                check_stmt(alt);
            }
        }
    }
}

fn check_decl(decl: &Decl) {
    check_span(&decl.pos(), &decl.end(), "decl");
    match decl {
        Decl::Bad(_) => {}
        Decl::Var(d) => check_expr(&d.typ),
        Decl::Type(d) => check_expr(&d.typ),
        Decl::Proc(d) => {
            for param in &d.params.list {
                check_span(&param.pos(), &param.end(), "param");
                check_expr(&param.typ);
            }
            for stmt in &d.body.list {
                check_stmt(stmt);
            }
        }
    }
}

// ---------------------------------------------------------------------
// Properties

proptest! {
    /// The scanner terminates on any input and positions never regress.
    #[test]
    fn scanner_terminates_and_positions_advance(source in ".{0,200}") {
        let mut scanner = Scanner::new(&source);
        let mut last_offset = 0u32;
        let mut reached_eof = false;
        for _ in 0..=source.chars().count() + 1 {
            let (tok, _, pos) = scanner.scan();
            prop_assert!(pos.offset >= last_offset);
            last_offset = pos.offset;
            if tok == Token::Eof {
                reached_eof = true;
                break;
            }
        }
        prop_assert!(reached_eof, "scanner failed to reach EOF");
    }

    /// Parsing arbitrary input terminates without panicking.
    #[test]
    fn parse_never_panics(source in ".{0,200}") {
        let (_, _) = parse(&source);
    }

    /// Parsing is deterministic: the same erroneous input produces the
    /// same diagnostics, in the same order, on every parse.
    #[test]
    fn parse_is_deterministic(source in ".{0,200}") {
        let (_, first) = parse(&source);
        let (_, second) = parse(&source);
        prop_assert_eq!(first, second);
    }

    /// parse_statement always yields exactly one statement, panic-free.
    #[test]
    fn parse_statement_never_panics(source in ".{0,120}") {
        let (_stmt, _errors) = parse_statement(&source);
    }

    /// Generated valid programs parse with zero diagnostics and a
    /// non-empty declaration list.
    #[test]
    fn valid_programs_parse_clean(source in arb_program()) {
        let (program, errors) = parse(&source);
        prop_assert!(errors.is_empty(), "unexpected errors for {source:?}: {errors}");
        prop_assert!(!program.decls.is_empty());
    }

    /// For every node in a parsed program, end() is never earlier than
    /// pos() under the position total order.
    #[test]
    fn node_spans_are_ordered(source in arb_program()) {
        let (program, _) = parse(&source);
        for decl in &program.decls {
            check_decl(decl);
        }
    }

    /// Statement snippets parse to position-ordered trees as well.
    #[test]
    fn statement_spans_are_ordered(source in arb_statement()) {
        let (stmt, errors) = parse_statement(&source);
        prop_assert!(errors.is_empty(), "unexpected errors for {source:?}: {errors}");
        check_stmt(&stmt);
    }

    /// Sorting a diagnostic list twice equals sorting it once.
    #[test]
    fn diagnostic_sort_is_idempotent(source in ".{0,200}") {
        let (_, mut errors) = parse(&source);
        errors.sort();
        let once = errors.clone();
        errors.sort();
        prop_assert_eq!(errors, once);
    }
}
