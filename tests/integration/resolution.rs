//! Identifier resolution across whole programs.

use spl::parse;
use spl::parser::ast::{Decl, Expr, Ident, Program, Stmt};
use spl::parser::scope::{Binding, ObjKind};

/// Collects `(name, binding)` for every identifier in the program, in
/// source order.
fn bindings(program: &Program) -> Vec<(String, Binding)> {
    let mut out = Vec::new();
    for decl in &program.decls {
        decl.for_each_ident(&mut |ident: &Ident| {
            out.push((ident.name.clone(), ident.binding.get()));
        });
    }
    out
}

#[test]
fn mutually_recursive_procedures_resolve() {
    let source = "proc a() { b(); }\nproc b() { a(); }";
    let (program, errors) = parse(source);
    assert!(errors.is_empty(), "unexpected errors: {errors}");

    for (name, binding) in bindings(&program) {
        let Binding::Resolved(obj) = binding else {
            panic!("{name} left {binding:?}");
        };
        let object = program.scopes.object(obj);
        assert_eq!(object.name, name);
        assert_eq!(object.kind, ObjKind::Proc);
    }
    assert!(
        !program.unresolved.iter().any(|i| i.name == "a" || i.name == "b"),
        "recursive names left unresolved"
    );
}

#[test]
fn forward_procedure_reference_resolves() {
    let source = "proc caller() { callee(1); }\nproc callee(n: int) {}";
    let (program, errors) = parse(source);
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    assert!(
        !program.unresolved.iter().any(|i| i.name == "callee"),
        "forward reference left unresolved"
    );
}

#[test]
fn undeclared_identifier_stays_unresolved() {
    let (program, errors) = parse("proc main() { mystery := 1; }");
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    assert_eq!(program.unresolved.len(), 1);
    assert_eq!(program.unresolved[0].name, "mystery");
    assert_eq!(program.unresolved[0].binding.get(), Binding::Unresolved);
}

#[test]
fn builtin_type_stays_unresolved_for_the_semantic_pass() {
    let (program, errors) = parse("var x: int;");
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    assert_eq!(program.unresolved.len(), 1);
    assert_eq!(program.unresolved[0].name, "int");
}

#[test]
fn local_variable_resolves_to_its_declaration() {
    let (program, errors) = parse("proc main() { var x: int; x := 1; }");
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    let Decl::Proc(main) = &program.decls[0] else {
        panic!("want proc decl, got {:?}", program.decls[0]);
    };
    let Stmt::Assign(assign) = &main.body.list[1] else {
        panic!("want assignment, got {:?}", main.body.list[1]);
    };
    let Expr::Ident(x) = &assign.left else {
        panic!("want identifier lhs, got {:?}", assign.left);
    };
    let Binding::Resolved(obj) = x.binding.get() else {
        panic!("x left {:?}", x.binding.get());
    };
    assert_eq!(program.scopes.object(obj).kind, ObjKind::Var);
    assert_eq!(program.scopes.object(obj).name, "x");
}

#[test]
fn parameters_are_visible_in_the_body() {
    let (program, errors) = parse("proc inc(ref n: int) { n := n + 1; }");
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    assert!(
        !program.unresolved.iter().any(|i| i.name == "n"),
        "parameter use left unresolved"
    );
}

#[test]
fn inner_scope_shadows_outer() {
    let source = "var x: int;\nproc main() { var x: int; x := 1; }";
    let (program, errors) = parse(source);
    assert!(errors.is_empty(), "unexpected errors: {errors}");

    let Decl::Var(global) = &program.decls[0] else {
        panic!("want var decl, got {:?}", program.decls[0]);
    };
    let Binding::Resolved(global_obj) = global.name.binding.get() else {
        panic!("global binding missing");
    };

    let Decl::Proc(main) = &program.decls[1] else {
        panic!("want proc decl, got {:?}", program.decls[1]);
    };
    let Stmt::Assign(assign) = &main.body.list[1] else {
        panic!("want assignment, got {:?}", main.body.list[1]);
    };
    let Expr::Ident(x) = &assign.left else {
        panic!("want identifier lhs, got {:?}", assign.left);
    };
    let Binding::Resolved(local_obj) = x.binding.get() else {
        panic!("local x unbound");
    };
    assert_ne!(local_obj, global_obj, "use bound to the shadowed global");
}

#[test]
fn block_scope_ends_at_closing_brace() {
    // x is declared inside a nested block; the use after the block cannot
    // see it and must go to the unresolved list.
    let source = "proc main() { { var x: int; x := 1; }; x := 2; }";
    let (program, errors) = parse(source);
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    assert_eq!(program.unresolved.len(), 1);
    assert_eq!(program.unresolved[0].name, "x");
}

#[test]
fn type_names_resolve_in_later_declarations() {
    let source = "type vector = array [5] of int;\nvar v: vector;";
    let (program, errors) = parse(source);
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    assert!(
        !program.unresolved.iter().any(|i| i.name == "vector"),
        "previously declared type left unresolved"
    );

    let Decl::Var(var) = &program.decls[1] else {
        panic!("want var decl, got {:?}", program.decls[1]);
    };
    let Expr::Ident(typ) = &var.typ else {
        panic!("want type identifier, got {:?}", var.typ);
    };
    let Binding::Resolved(obj) = typ.binding.get() else {
        panic!("vector unbound");
    };
    assert_eq!(program.scopes.object(obj).kind, ObjKind::Type);
}

#[test]
fn declared_names_bind_to_their_own_objects() {
    let (program, errors) = parse("var x: int;");
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    let Decl::Var(var) = &program.decls[0] else {
        panic!("want var decl, got {:?}", program.decls[0]);
    };
    let Binding::Resolved(obj) = var.name.binding.get() else {
        panic!("declared name unbound");
    };
    let object = program.scopes.object(obj);
    assert_eq!(object.kind, ObjKind::Var);
    assert_eq!(object.decl, var.name.name_pos);
    assert_eq!(program.scopes.lookup(program.pkg_scope, "x"), Some(obj));
}
