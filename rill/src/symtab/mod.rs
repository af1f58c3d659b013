//! Symbols and the scope tree
//!
//! Scopes form a tree: the global scope at the root, one child per struct
//! body, function signature/body and template parameter list. The tree is
//! arena-allocated; a `ScopeId` is a plain index, and the parent link of a
//! scope is a lookup key only — never an owning pointer. A `Type` that
//! introduces a naming context stores the id of the scope it owns.

use std::collections::HashMap;

use crate::types::Type;

/// A named value binding: `(name, type, optional constant)`
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    /// Constant value when known (const folds, array sizes)
    pub value: Option<i64>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, ty: Type, value: Option<i64>) -> Self {
        Self {
            name: name.into(),
            ty,
            value,
        }
    }
}

/// Index of a scope inside a `ScopeArena`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// What kind of type owns a scope; the root and plain blocks have none
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeOwner {
    Struct(String),
    Function,
}

/// One scope node: a type table and a symbol table plus the parent link
#[derive(Debug, Clone)]
struct Scope {
    parent: Option<ScopeId>,
    owner: Option<ScopeOwner>,
    types: HashMap<String, Type>,
    symbols: HashMap<String, Symbol>,
    /// Strictly-incrementing allocator for anonymous type names; never
    /// resets or reuses values, even if entries are later replaced.
    next_anon: u32,
}

impl Scope {
    fn new(parent: Option<ScopeId>, owner: Option<ScopeOwner>) -> Self {
        Self {
            parent,
            owner,
            types: HashMap::new(),
            symbols: HashMap::new(),
            next_anon: 0,
        }
    }
}

/// Arena holding every scope of a compilation
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    /// Create an arena with the global scope at the root
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(None, None)],
        }
    }

    /// The global scope created by `new`
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Allocate a child scope
    pub fn push_scope(&mut self, parent: ScopeId, owner: Option<ScopeOwner>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(Some(parent), owner));
        id
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scope(id).parent
    }

    pub fn owner(&self, id: ScopeId) -> Option<&ScopeOwner> {
        self.scope(id).owner.as_ref()
    }

    /// A scope is global iff it has no parent
    pub fn is_global(&self, id: ScopeId) -> bool {
        self.scope(id).parent.is_none()
    }

    /// Walk parent links to the root
    pub fn global_of(&self, id: ScopeId) -> ScopeId {
        let mut current = id;
        while let Some(parent) = self.scope(current).parent {
            current = parent;
        }
        current
    }

    /// Insert or overwrite a symbol in the local table. Shadowing an outer
    /// name is legal; no check against parent scopes is performed.
    pub fn add_symbol(
        &mut self,
        id: ScopeId,
        name: impl Into<String>,
        ty: Type,
        value: Option<i64>,
    ) -> Symbol {
        let symbol = Symbol::new(name, ty, value);
        self.scope_mut(id)
            .symbols
            .insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// Insert or overwrite a type in the local table; returns the name it
    /// was registered under.
    pub fn add_type(&mut self, id: ScopeId, name: impl Into<String>, ty: Type) -> String {
        let name = name.into();
        self.scope_mut(id).types.insert(name.clone(), ty);
        name
    }

    /// Mint the next anonymous type name for this scope without inserting
    pub fn fresh_anonymous_name(&mut self, id: ScopeId) -> String {
        let scope = self.scope_mut(id);
        let name = format!("tmp_type_{}", scope.next_anon);
        scope.next_anon += 1;
        name
    }

    /// Register a type under a synthesized `tmp_type_<N>` name, unique
    /// within this scope for its whole lifetime.
    pub fn add_anonymous_type(&mut self, id: ScopeId, ty: Type) -> String {
        let name = self.fresh_anonymous_name(id);
        self.add_type(id, name.clone(), ty);
        name
    }

    /// Lexical type lookup: local table first, then the parent chain.
    /// `None` at the root is a miss, not an error.
    pub fn get_type(&self, id: ScopeId, name: &str) -> Option<&Type> {
        let mut current = Some(id);
        while let Some(sid) = current {
            let scope = self.scope(sid);
            if let Some(ty) = scope.types.get(name) {
                return Some(ty);
            }
            current = scope.parent;
        }
        None
    }

    /// Lexical symbol lookup through the parent chain
    pub fn get_symbol(&self, id: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(id);
        while let Some(sid) = current {
            let scope = self.scope(sid);
            if let Some(symbol) = scope.symbols.get(name) {
                return Some(symbol);
            }
            current = scope.parent;
        }
        None
    }

    /// Local-only symbol lookup, for shadow and redeclaration checks
    pub fn get_symbol_local(&self, id: ScopeId, name: &str) -> Option<&Symbol> {
        self.scope(id).symbols.get(name)
    }

    /// Replace a type in the local table only. A missing name is a no-op;
    /// callers that require presence must check first.
    pub fn modify_type_local(&mut self, id: ScopeId, name: &str, ty: Type) -> Option<&Type> {
        match self.scope_mut(id).types.get_mut(name) {
            Some(slot) => {
                *slot = ty;
                Some(&*slot)
            }
            None => None,
        }
    }

    /// Replace a symbol's type in the local table only, keeping its name
    /// and constant value. A missing name is a no-op.
    pub fn modify_symbol_type_local(
        &mut self,
        id: ScopeId,
        name: &str,
        ty: Type,
    ) -> Option<&Symbol> {
        match self.scope_mut(id).symbols.get_mut(name) {
            Some(symbol) => {
                symbol.ty = ty;
                Some(&*symbol)
            }
            None => None,
        }
    }

    /// Deep-copy a scope into a fresh arena slot: both tables and the
    /// anonymous-name counter are copied; the parent link and owner are
    /// identity, never duplicated.
    pub fn clone_scope(&mut self, id: ScopeId) -> ScopeId {
        let copy = self.scope(id).clone();
        let new_id = ScopeId(self.scopes.len());
        self.scopes.push(copy);
        new_id
    }

    fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Primitive;

    fn int() -> Type {
        Type::basic(Primitive::Int)
    }

    fn boolean() -> Type {
        Type::basic(Primitive::Bool)
    }

    #[test]
    fn test_root_is_global() {
        let arena = ScopeArena::new();
        assert!(arena.is_global(arena.root()));
        assert_eq!(arena.parent(arena.root()), None);
    }

    #[test]
    fn test_child_is_not_global() {
        let mut arena = ScopeArena::new();
        let child = arena.push_scope(arena.root(), None);
        assert!(!arena.is_global(child));
        assert_eq!(arena.parent(child), Some(arena.root()));
    }

    #[test]
    fn test_global_of_walks_to_root() {
        let mut arena = ScopeArena::new();
        let a = arena.push_scope(arena.root(), None);
        let b = arena.push_scope(a, Some(ScopeOwner::Function));
        let c = arena.push_scope(b, None);
        assert_eq!(arena.global_of(c), arena.root());
        assert_eq!(arena.global_of(arena.root()), arena.root());
    }

    #[test]
    fn test_owner_is_recorded() {
        let mut arena = ScopeArena::new();
        let s = arena.push_scope(arena.root(), Some(ScopeOwner::Struct("Foo".to_string())));
        assert_eq!(arena.owner(s), Some(&ScopeOwner::Struct("Foo".to_string())));
        assert_eq!(arena.owner(arena.root()), None);
    }

    #[test]
    fn test_get_type_falls_back_to_parent() {
        let mut arena = ScopeArena::new();
        let root = arena.root();
        arena.add_type(root, "Id", int());
        let child = arena.push_scope(root, None);
        assert_eq!(arena.get_type(child, "Id"), Some(&int()));
    }

    #[test]
    fn test_lookup_miss_is_none() {
        let mut arena = ScopeArena::new();
        let child = arena.push_scope(arena.root(), None);
        assert_eq!(arena.get_type(child, "Missing"), None);
        assert_eq!(arena.get_symbol(child, "missing"), None);
    }

    #[test]
    fn test_shadowing_inner_wins() {
        let mut arena = ScopeArena::new();
        let root = arena.root();
        arena.add_type(root, "x", int());
        let child = arena.push_scope(root, None);
        arena.add_type(child, "x", boolean());

        assert_eq!(arena.get_type(child, "x"), Some(&boolean()));
        assert_eq!(arena.get_type(root, "x"), Some(&int()));
    }

    #[test]
    fn test_get_symbol_local_ignores_parent() {
        let mut arena = ScopeArena::new();
        let root = arena.root();
        arena.add_symbol(root, "y", int(), None);
        let child = arena.push_scope(root, None);

        assert_eq!(arena.get_symbol_local(child, "y"), None);
        assert!(arena.get_symbol(child, "y").is_some());
    }

    #[test]
    fn test_add_symbol_overwrites_local() {
        let mut arena = ScopeArena::new();
        let root = arena.root();
        arena.add_symbol(root, "x", int(), Some(1));
        arena.add_symbol(root, "x", boolean(), Some(2));

        let symbol = arena.get_symbol(root, "x").unwrap();
        assert_eq!(symbol.ty, boolean());
        assert_eq!(symbol.value, Some(2));
    }

    #[test]
    fn test_anonymous_names_are_unique_and_monotonic() {
        let mut arena = ScopeArena::new();
        let root = arena.root();

        let a = arena.add_anonymous_type(root, int());
        // An intervening explicit registration must not perturb the counter
        arena.add_type(root, "Named", boolean());
        let b = arena.add_anonymous_type(root, boolean());
        let c = arena.add_anonymous_type(root, int());

        assert_eq!(a, "tmp_type_0");
        assert_eq!(b, "tmp_type_1");
        assert_eq!(c, "tmp_type_2");
        assert!(arena.get_type(root, &a).is_some());
        assert!(arena.get_type(root, &b).is_some());
    }

    #[test]
    fn test_anonymous_counter_is_per_scope() {
        let mut arena = ScopeArena::new();
        let root = arena.root();
        let child = arena.push_scope(root, None);

        assert_eq!(arena.add_anonymous_type(root, int()), "tmp_type_0");
        assert_eq!(arena.add_anonymous_type(child, int()), "tmp_type_0");
        assert_eq!(arena.add_anonymous_type(root, int()), "tmp_type_1");
    }

    #[test]
    fn test_modify_type_local_replaces() {
        let mut arena = ScopeArena::new();
        let root = arena.root();
        arena.add_type(root, "T", Type::auto());
        let updated = arena.modify_type_local(root, "T", int());
        assert_eq!(updated, Some(&int()));
        assert_eq!(arena.get_type(root, "T"), Some(&int()));
    }

    #[test]
    fn test_modify_type_local_missing_is_noop() {
        let mut arena = ScopeArena::new();
        let root = arena.root();
        assert_eq!(arena.modify_type_local(root, "T", int()), None);
        assert_eq!(arena.get_type(root, "T"), None);
    }

    #[test]
    fn test_modify_type_local_does_not_touch_parent() {
        let mut arena = ScopeArena::new();
        let root = arena.root();
        arena.add_type(root, "T", Type::auto());
        let child = arena.push_scope(root, None);

        assert_eq!(arena.modify_type_local(child, "T", int()), None);
        assert_eq!(arena.get_type(root, "T"), Some(&Type::auto()));
    }

    #[test]
    fn test_modify_symbol_type_keeps_name_and_value() {
        let mut arena = ScopeArena::new();
        let root = arena.root();
        arena.add_symbol(root, "n", Type::auto(), Some(7));

        let updated = arena.modify_symbol_type_local(root, "n", int()).unwrap();
        assert_eq!(updated.name, "n");
        assert_eq!(updated.value, Some(7));
        assert_eq!(updated.ty, int());
    }

    #[test]
    fn test_clone_scope_is_independent() {
        let mut arena = ScopeArena::new();
        let root = arena.root();
        let original = arena.push_scope(root, Some(ScopeOwner::Function));
        arena.add_symbol(original, "x", int(), None);

        let copy = arena.clone_scope(original);
        arena.add_symbol(copy, "y", boolean(), None);
        arena.modify_symbol_type_local(copy, "x", boolean());

        // The original scope must not observe the copy's mutations
        assert_eq!(arena.get_symbol(original, "x").unwrap().ty, int());
        assert_eq!(arena.get_symbol_local(original, "y"), None);
        assert_eq!(arena.get_symbol(copy, "x").unwrap().ty, boolean());
    }

    #[test]
    fn test_clone_scope_keeps_parent_and_counter() {
        let mut arena = ScopeArena::new();
        let root = arena.root();
        let original = arena.push_scope(root, None);
        arena.add_anonymous_type(original, int());
        arena.add_anonymous_type(original, int());

        let copy = arena.clone_scope(original);
        assert_eq!(arena.parent(copy), Some(root));
        // The counter travels with the copy: no name reuse
        assert_eq!(arena.add_anonymous_type(copy, int()), "tmp_type_2");
    }
}
