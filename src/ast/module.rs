//! The module (spec.md §3 Module): owns every arena for one compilation unit.

use ahash::AHashMap;

use crate::{
    ast::{
        arena::Arena,
        decl::{DeclId, Declaration},
        expr::{ExprId, ExprNode},
        stmt::{StmtId, StmtNode},
        ty::{TypeId, TypeNode},
    },
    cfg::Cfg,
    id::Id,
    intern::StringId,
    liveness::Liveness,
    scope::Scopes,
};

/// One compilation unit: its own arenas for types, expressions, statements,
/// and declarations, plus the scope tree, import/export lists, and (once
/// computed) CFG/liveness results (spec.md §3 Module, §4.6, §4.7).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Module {
    pub name: StringId,
    pub filename: StringId,

    pub types: Arena<TypeNode>,
    pub exprs: Arena<ExprNode>,
    pub stmts: Arena<StmtNode>,
    pub decls: Arena<Declaration>,
    pub scopes: Scopes,

    /// The top-level `Block` statement holding module-level declarations.
    pub body: StmtId,

    /// Modules imported by name; `libhilti` is implicitly present for every
    /// module but `Main` itself (spec.md §4.8).
    pub imports: Vec<StringId>,

    /// Identifiers/types this module exposes across module boundaries
    /// (spec.md §3 Module).
    pub exports: Vec<Id>,

    /// The unit execution-context struct type, if this module declares one
    /// (spec.md §4.5 Thread/Scope rules reference it).
    pub context: Option<TypeId>,

    /// One [`Cfg`]/[`Liveness`] pair per analyzed function or hook body,
    /// keyed by the declaration they belong to (spec.md §4.6, §4.7 — both
    /// are computed per function body, not once for the whole module).
    pub function_cfgs: AHashMap<DeclId, Cfg>,
    pub function_liveness: AHashMap<DeclId, Liveness>,
}

impl Module {
    #[must_use]
    pub fn new(name: StringId, filename: StringId, body: StmtId, scopes: Scopes) -> Self {
        Self {
            name,
            filename,
            types: Arena::new(),
            exprs: Arena::new(),
            stmts: Arena::new(),
            decls: Arena::new(),
            scopes,
            body,
            imports: Vec::new(),
            exports: Vec::new(),
            context: None,
            function_cfgs: AHashMap::default(),
            function_liveness: AHashMap::default(),
        }
    }

    #[must_use]
    pub fn is_main(&self, interner: &crate::intern::Interner) -> bool {
        interner.resolve(self.name) == "Main"
    }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &ExprNode {
        self.exprs.get(id)
    }

    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &StmtNode {
        self.stmts.get(id)
    }

    #[must_use]
    pub fn ty(&self, id: TypeId) -> &TypeNode {
        self.types.get(id)
    }

    #[must_use]
    pub fn decl(&self, id: DeclId) -> &Declaration {
        self.decls.get(id)
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Declaration {
        self.decls.get_mut(id)
    }

    #[must_use]
    pub fn cfg(&self, function: DeclId) -> Option<&Cfg> {
        self.function_cfgs.get(&function)
    }

    #[must_use]
    pub fn liveness(&self, function: DeclId) -> Option<&Liveness> {
        self.function_liveness.get(&function)
    }
}
