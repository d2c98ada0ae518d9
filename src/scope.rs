//! Scopes and identifier lookup (spec.md §3 Scope, §4.1).
//!
//! A [`Scope`] maps an unqualified name to an ordered list of expressions
//! (a list, not a single value, because hooks may be multiply defined — see
//! spec.md §3 "except hooks which may be multiply defined if consistent").
//! Scopes chain via a `parent` pointer for unqualified lookup and install
//! named `children` for scoped lookup (`a.b.c` finds child scope `a`, then
//! recurses for `b.c` there). A cross-module `import M` installs a child
//! scope that is an **alias** of `M`'s own top-level scope — looked up
//! live through the [`crate::context::CompilerContext`]'s module table
//! rather than copied, so later additions to `M` stay visible.

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::{ast::expr::ExprId, context::ModuleId, intern::StringId};

/// Index into one module's local scope arena ([`Scopes`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ScopeId(u32);

impl ScopeId {
    /// Every module's top-level scope, guaranteed to be the first one
    /// `resolve::build_scopes` pushes into a fresh module's (empty)
    /// `Scopes` arena — relied on by `resolve::wire_imports` to find the
    /// scope an `import` aliases into another module's arena.
    pub const ROOT: Self = Self(0);
}

/// A fully-qualified reference to a scope: which module owns the arena it
/// indexes into. Needed because `import` installs children that live in a
/// *different* module's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ScopeRef {
    pub module: ModuleId,
    pub scope: ScopeId,
}

/// One binding: the module that owns the referenced expression, and the
/// expression itself (an index into that module's expression arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Binding {
    pub module: ModuleId,
    pub expr: ExprId,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Scope {
    parent: Option<ScopeId>,
    /// Name -> candidates. Length > 1 only ever holds hook overloads once
    /// the well-formedness check (`insert_unique`) has run.
    bindings: AHashMap<StringId, SmallVec<[Binding; 1]>>,
    /// Named child scopes: enum/bitset/unit type-scopes (same module) and
    /// `import` aliases (any module).
    children: AHashMap<StringId, ScopeRef>,
}

impl Scope {
    #[must_use]
    pub fn with_parent(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            bindings: AHashMap::default(),
            children: AHashMap::default(),
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Inserts a binding. Returns `Err` if `name` already has a
    /// non-hook binding in this scope and `is_hook` is false or the
    /// existing binding isn't also a hook (spec.md §4.1 "a duplicate
    /// non-hook ID in the same scope is an error").
    pub fn insert(&mut self, name: StringId, binding: Binding, is_hook: bool) -> Result<(), ()> {
        let entry = self.bindings.entry(name).or_default();
        if !entry.is_empty() && !is_hook {
            return Err(());
        }
        entry.push(binding);
        Ok(())
    }

    #[must_use]
    pub fn lookup_local(&self, name: StringId) -> &[Binding] {
        self.bindings.get(&name).map_or(&[], SmallVec::as_slice)
    }

    pub fn insert_child(&mut self, name: StringId, child: ScopeRef) {
        self.children.insert(name, child);
    }

    #[must_use]
    pub fn child(&self, name: StringId) -> Option<ScopeRef> {
        self.children.get(&name).copied()
    }
}

/// A module's local collection of scopes: one per `Block` statement plus
/// one per declared enum/bitset/unit type (its `typeScope`, spec.md §4.1).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Scopes {
    arena: Vec<Scope>,
}

impl Scopes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scope: Scope) -> ScopeId {
        let id = ScopeId(u32::try_from(self.arena.len()).expect("scope arena overflow"));
        self.arena.push(scope);
        id
    }

    #[must_use]
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.arena[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.arena[id.0 as usize]
    }
}
