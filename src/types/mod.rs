//! A skeletal semantic pass over parsed programs.
//!
//! The parser leaves identifiers it could not bind in the program's
//! unresolved list; deciding whether such a name is a builtin or a
//! genuine error is this pass's job. Full type checking (compatibility,
//! array bounds) is deliberately out of scope.

use crate::diagnostics::ErrorList;
use crate::parser::ast::Program;
use crate::parser::scope::ObjKind;

/// The predeclared objects of SPL: the builtin integer type and the
/// runtime procedures. They live conceptually in a universe scope
/// enclosing every package scope.
pub const UNIVERSE: &[(&str, ObjKind)] = &[
    ("int", ObjKind::Type),
    ("printi", ObjKind::Proc),
    ("printc", ObjKind::Proc),
    ("readi", ObjKind::Proc),
    ("readc", ObjKind::Proc),
    ("exit", ObjKind::Proc),
    ("time", ObjKind::Proc),
    ("clearAll", ObjKind::Proc),
    ("setPixel", ObjKind::Proc),
    ("drawLine", ObjKind::Proc),
    ("drawCircle", ObjKind::Proc),
];

/// Returns the kind of the predeclared object with the given name.
pub fn lookup(name: &str) -> Option<ObjKind> {
    UNIVERSE.iter().find(|(n, _)| *n == name).map(|(_, kind)| *kind)
}

/// Reports whether the name is predeclared in the universe scope.
pub fn is_predeclared(name: &str) -> bool {
    lookup(name).is_some()
}

/// Checks the identifiers the parser left unresolved: names found in the
/// universe are accepted, everything else is reported as undeclared.
pub fn check(program: &Program) -> ErrorList {
    let mut errors = ErrorList::new();
    for ident in &program.unresolved {
        if !is_predeclared(&ident.name) {
            errors.add(ident.name_pos.clone(), format!("undeclared name: {}", ident.name));
        }
    }
    errors.sort();
    errors
}
