//! Lexical scopes and the named entities declared inside them.
//!
//! Scopes form a tree: each scope records its immediately surrounding
//! (outer) scope by id. A [`ScopeArena`] owns every scope record and every
//! [`Object`] created during a parse, so identifiers can refer to their
//! declaring object by plain index without reference cycles or shared
//! ownership.

use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use crate::position::Position;

/// Identifies a scope record inside a [`ScopeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScopeId(u32);

/// Identifies an object inside a [`ScopeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectId(u32);

/// What an object represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjKind {
    Bad,
    Type,
    Var,
    Proc,
}

impl fmt::Display for ObjKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjKind::Bad => "bad",
            ObjKind::Type => "type",
            ObjKind::Var => "var",
            ObjKind::Proc => "proc",
        })
    }
}

/// A named language entity such as a type, variable or procedure. `decl`
/// is the position of the declaring name, the no-position sentinel when
/// unknown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Object {
    pub kind: ObjKind,
    pub name: String,
    pub decl: Position,
}

/// Resolution state of an identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Binding {
    /// Resolution has not been attempted.
    #[default]
    Unbound,
    /// Lookup missed every scope; retried once against the package scope
    /// when the whole program has been parsed.
    Unresolved,
    /// Bound to a declared object.
    Resolved(ObjectId),
}

/// One lexical scope: the set of names declared in it and a link to the
/// enclosing scope.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Scope {
    outer: Option<ScopeId>,
    objects: HashMap<String, ObjectId>,
}

impl Scope {
    pub fn outer(&self) -> Option<ScopeId> {
        self.outer
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Owns every scope and object created during one parse. Scopes are
/// created strictly top-down, so outer links never form a cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    objects: Vec<Object>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new scope nested in `outer`.
    pub fn push_scope(&mut self, outer: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope { outer, objects: HashMap::new() });
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn outer(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes[id.0 as usize].outer
    }

    /// Records a new object; the object is not visible anywhere until it
    /// is inserted into a scope.
    pub fn alloc(&mut self, obj: Object) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(obj);
        id
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id.0 as usize]
    }

    /// Attempts to insert the object into the scope. If the scope already
    /// contains an object with the same name the scope is left unchanged
    /// and the previous entry is returned.
    pub fn insert(&mut self, scope: ScopeId, id: ObjectId) -> Option<ObjectId> {
        let name = self.objects[id.0 as usize].name.clone();
        match self.scopes[scope.0 as usize].objects.entry(name) {
            Entry::Occupied(prev) => Some(*prev.get()),
            Entry::Vacant(slot) => {
                slot.insert(id);
                None
            }
        }
    }

    /// Returns the object declared under `name` in this scope alone;
    /// outer scopes are ignored.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<ObjectId> {
        self.scopes[scope.0 as usize].objects.get(name).copied()
    }

    /// Returns the object `name` resolves to from `scope`, walking
    /// outward through the enclosing scopes.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<ObjectId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(obj) = self.lookup(id, name) {
                return Some(obj);
            }
            current = self.outer(id);
        }
        None
    }
}
