//! [`ModuleBuilder`]: the cursor object front ends use to construct a
//! [`Module`] (spec.md §4.4 IR Module Builder operations).

use ahash::AHashMap;

use crate::{
    ast::{
        decl::{DeclId, DeclKind, Declaration, Linkage},
        expr::{ExprId, ExprNode},
        module::Module,
        stmt::{Block, Instruction, InstructionOperands, Stmt, StmtId, StmtNode},
        ty::TypeId,
    },
    id::Id,
    intern::StringId,
    location::SourceRange,
};

/// What to do when a caller asks to add a global/constant/type whose name
/// already has a declaration (spec.md §4.4 "addGlobal ... disposition").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Reuse the existing declaration if its type matches; error otherwise.
    ReuseIfEqual,
    /// Always install a fresh declaration, never reusing an existing one.
    AlwaysNew,
    /// Treat a name collision as a hard error.
    ErrorOnCollision,
}

#[derive(Debug, Clone)]
pub struct BuildError(pub String);

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for BuildError {}

struct FunctionCtx {
    decl: DeclId,
}

/// Incrementally builds a [`Module`]'s declarations and statement bodies.
/// Holds a stack of "current function" and "current block" cursors so
/// callers don't have to thread `StmtId`s through every call
/// (spec.md §4.4).
pub struct ModuleBuilder<'m> {
    module: &'m mut Module,
    function_stack: Vec<FunctionCtx>,
    block_stack: Vec<StmtId>,
    /// Memoization of previously-built nodes, keyed by a caller-chosen
    /// string (e.g. a mangled constant key) — `cache_node`/`lookup_node`
    /// (spec.md §4.4 "cacheNode/lookupNode avoid rebuilding identical
    /// constant/container nodes").
    node_cache: AHashMap<String, ExprId>,
}

impl<'m> ModuleBuilder<'m> {
    pub fn new(module: &'m mut Module) -> Self {
        Self {
            module,
            function_stack: Vec::new(),
            block_stack: Vec::new(),
            node_cache: AHashMap::default(),
        }
    }

    fn current_block(&self) -> StmtId {
        *self.block_stack.last().expect("no builder block pushed")
    }

    /// Declares a module-level global variable (spec.md §4.4 "addGlobal").
    pub fn add_global(
        &mut self,
        name: StringId,
        ty: TypeId,
        init: Option<ExprId>,
        linkage: Linkage,
        location: SourceRange,
        disposition: Disposition,
    ) -> Result<DeclId, BuildError> {
        if disposition == Disposition::ErrorOnCollision && self.find_decl(name).is_some() {
            return Err(BuildError(format!("global `{name:?}` already declared")));
        }
        if disposition == Disposition::ReuseIfEqual {
            if let Some(existing) = self.find_decl(name) {
                return Ok(existing);
            }
        }
        Ok(self.module.decls.push(Declaration {
            id: Id::unqualified(name, location),
            linkage,
            kind: DeclKind::Variable { ty, init },
            location,
            comments: Vec::new(),
        }))
    }

    /// Declares a module-level constant (spec.md §4.4 "addConstant").
    pub fn add_constant(&mut self, name: StringId, ty: TypeId, value: ExprId, location: SourceRange) -> DeclId {
        self.module.decls.push(Declaration {
            id: Id::unqualified(name, location),
            linkage: Linkage::Local,
            kind: DeclKind::Constant { ty, value },
            location,
            comments: Vec::new(),
        })
    }

    /// Declares a named type (spec.md §4.4 "addType").
    pub fn add_type(&mut self, name: StringId, ty: TypeId, linkage: Linkage, location: SourceRange) -> DeclId {
        self.module.decls.push(Declaration {
            id: Id::unqualified(name, location),
            linkage,
            kind: DeclKind::Type { ty },
            location,
            comments: Vec::new(),
        })
    }

    /// Declares a local variable in the current function
    /// (spec.md §4.4 "addLocal").
    pub fn add_local(&mut self, name: StringId, ty: TypeId, location: SourceRange) -> DeclId {
        self.module.decls.push(Declaration {
            id: Id::unqualified(name, location),
            linkage: Linkage::Local,
            kind: DeclKind::Variable { ty, init: None },
            location,
            comments: Vec::new(),
        })
    }

    /// Allocates a fresh compiler-internal temporary in the current
    /// function (spec.md §4.4 "addTmp"). The interner lives on
    /// `CompilerContext`, not on `Module`, so the builder can't mint a
    /// `__tmp<n>` name itself; the caller interns one (e.g.
    /// `format!("__tmp{n}")` against its own counter) and passes it in.
    pub fn add_tmp(&mut self, name: StringId, ty: TypeId, location: SourceRange) -> DeclId {
        assert!(!self.function_stack.is_empty(), "addTmp outside a function");
        self.add_local(name, ty, location)
    }

    fn find_decl(&self, name: StringId) -> Option<DeclId> {
        self.module.decls.iter().find(|(_, d)| d.id.local_name() == name).map(|(id, _)| id)
    }

    /// Declares a function, without a body yet (spec.md §4.4 "declareFunction").
    pub fn declare_function(&mut self, name: StringId, ty: TypeId, linkage: Linkage, location: SourceRange) -> DeclId {
        self.module.decls.push(Declaration {
            id: Id::unqualified(name, location),
            linkage,
            kind: DeclKind::Function { ty, body: None },
            location,
            comments: Vec::new(),
        })
    }

    /// Makes `decl` the current function, pushing its (fresh) body block
    /// as the current builder block (spec.md §4.4 "pushFunction").
    pub fn push_function(&mut self, decl: DeclId, scope: crate::scope::ScopeId) {
        let body = self.new_block(scope);
        if let DeclKind::Function { body: slot, .. } = &mut self.module.decl_mut(decl).kind {
            *slot = Some(body);
        }
        self.function_stack.push(FunctionCtx { decl });
        self.block_stack.push(body);
    }

    /// Pops the current function, returning its declaration id
    /// (spec.md §4.4 "popFunction").
    pub fn pop_function(&mut self) -> DeclId {
        self.block_stack.pop();
        self.function_stack.pop().expect("popFunction without a matching push").decl
    }

    /// Declares a hook with the given priority and pushes its body as the
    /// current block (spec.md §4.4 "declareHook"/"pushHook").
    pub fn push_hook(&mut self, name: StringId, ty: TypeId, priority: i32, location: SourceRange, scope: crate::scope::ScopeId) -> DeclId {
        let body = self.new_block(scope);
        let decl = self.module.decls.push(Declaration {
            id: Id::unqualified(name, location),
            linkage: Linkage::Local,
            kind: DeclKind::Hook { ty, priority, body },
            location,
            comments: Vec::new(),
        });
        self.function_stack.push(FunctionCtx { decl });
        self.block_stack.push(body);
        decl
    }

    pub fn pop_hook(&mut self) -> DeclId {
        self.pop_function()
    }

    /// Pushes a fresh nested block as the current builder block without
    /// associating it with a function/hook declaration — used for `if`/
    /// `foreach` bodies (spec.md §4.4 "newBuilder"/"pushBuilder").
    pub fn new_builder(&mut self, scope: crate::scope::ScopeId) -> StmtId {
        let block = self.new_block(scope);
        self.block_stack.push(block);
        block
    }

    pub fn push_builder(&mut self, block: StmtId) {
        self.block_stack.push(block);
    }

    pub fn pop_builder(&mut self) -> StmtId {
        self.block_stack.pop().expect("popBuilder without a matching push")
    }

    fn new_block(&mut self, scope: crate::scope::ScopeId) -> StmtId {
        self.module.stmts.push(StmtNode {
            kind: Stmt::Block(Block { scope, statements: Vec::new(), declarations: Vec::new() }),
            location: SourceRange::synthetic(),
            comments: Vec::new(),
            chain_next: None,
        })
    }

    /// Appends an instruction statement to the current block, linking it
    /// after the block's previous last statement via `chain_next`
    /// (spec.md §4.4 "addInstruction").
    pub fn add_instruction(
        &mut self,
        target: Option<ExprId>,
        name: Id,
        operands: InstructionOperands,
        location: SourceRange,
    ) -> StmtId {
        let stmt = self.module.stmts.push(StmtNode {
            kind: Stmt::Instruction(Instruction::Unresolved { name, target, operands }),
            location,
            comments: Vec::new(),
            chain_next: None,
        });
        self.append_to_current_block(stmt);
        stmt
    }

    fn append_to_current_block(&mut self, stmt: StmtId) {
        let block_id = self.current_block();
        let Stmt::Block(block) = &mut self.module.stmts.get_mut(block_id).kind else {
            panic!("current builder block is not a Block");
        };
        if let Some(&last) = block.statements.last() {
            self.module.stmts.get_mut(last).chain_next = Some(stmt);
        }
        let Stmt::Block(block) = &mut self.module.stmts.get_mut(block_id).kind else {
            unreachable!()
        };
        block.statements.push(stmt);
    }

    /// Emits an `if (cond) { then } ` with no else clause, returning the
    /// `then`-branch block so the caller can push it and continue emitting
    /// into it (spec.md §4.4 "addIf").
    pub fn add_if(&mut self, cond: ExprId, scope: crate::scope::ScopeId, location: SourceRange) -> StmtId {
        let then_branch = self.new_block(scope);
        let stmt = self.module.stmts.push(StmtNode {
            kind: Stmt::IfElse(crate::ast::stmt::IfElseStmt { cond, then_branch, else_branch: None }),
            location,
            comments: Vec::new(),
            chain_next: None,
        });
        self.append_to_current_block(stmt);
        then_branch
    }

    /// Emits an `if (cond) { then } else { otherwise }`, returning both
    /// branch blocks (spec.md §4.4 "addIfElse").
    pub fn add_if_else(&mut self, cond: ExprId, scope: crate::scope::ScopeId, location: SourceRange) -> (StmtId, StmtId) {
        let then_branch = self.new_block(scope);
        let else_branch = self.new_block(scope);
        let stmt = self.module.stmts.push(StmtNode {
            kind: Stmt::IfElse(crate::ast::stmt::IfElseStmt { cond, then_branch, else_branch: Some(else_branch) }),
            location,
            comments: Vec::new(),
            chain_next: None,
        });
        self.append_to_current_block(stmt);
        (then_branch, else_branch)
    }

    /// Memoizes `expr` under `key`, returning any previously-cached node
    /// under the same key instead when one exists
    /// (spec.md §4.4 "cacheNode"/"lookupNode").
    pub fn cache_node(&mut self, key: impl Into<String>, expr: ExprId) -> ExprId {
        *self.node_cache.entry(key.into()).or_insert(expr)
    }

    #[must_use]
    pub fn lookup_node(&self, key: &str) -> Option<ExprId> {
        self.node_cache.get(key).copied()
    }

    /// Adds a bare expression node directly, bypassing statement
    /// attachment — used by callers building expression trees (ctors,
    /// operator operands) before they're wired into an instruction.
    pub fn push_expr(&mut self, node: ExprNode) -> ExprId {
        self.module.exprs.push(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{
            arena::Arena,
            stmt::{Stmt, StmtNode},
            ty::{CallingConvention, Type, TypeNode},
        },
        id::Id,
        intern::Interner,
        scope::ScopeId,
    };

    fn new_module(interner: &mut Interner) -> Module {
        let mut scratch: Arena<StmtNode> = Arena::new();
        let placeholder = scratch.push(StmtNode {
            kind: Stmt::NoOp,
            location: SourceRange::synthetic(),
            comments: Vec::new(),
            chain_next: None,
        });
        let name = interner.intern("Main");
        Module::new(name, name, placeholder, crate::scope::Scopes::new())
    }

    #[test]
    fn push_function_wires_the_body_into_the_declaration() {
        let mut interner = Interner::new();
        let mut module = new_module(&mut interner);
        let void_ty = module.types.push(TypeNode { kind: Type::Void, location: SourceRange::synthetic(), doc: None });
        let fn_ty = module.types.push(TypeNode {
            kind: Type::Function(void_ty, Vec::new(), CallingConvention::Hilti),
            location: SourceRange::synthetic(),
            doc: None,
        });

        let mut builder = ModuleBuilder::new(&mut module);
        let name = interner.intern("run");
        let decl = builder.declare_function(name, fn_ty, Linkage::Local, SourceRange::synthetic());
        builder.push_function(decl, ScopeId::ROOT);
        let body_while_open = builder.current_block();
        let popped = builder.pop_function();

        assert_eq!(popped, decl);
        let DeclKind::Function { body, .. } = &module.decl(decl).kind else { panic!("not a function") };
        assert_eq!(*body, Some(body_while_open));
    }

    #[test]
    fn add_instruction_chains_statements_in_order() {
        let mut interner = Interner::new();
        let mut module = new_module(&mut interner);
        let int_ty = module.types.push(TypeNode { kind: Type::Integer { width: 32, signed: true }, location: SourceRange::synthetic(), doc: None });
        let x_expr = module.exprs.push(ExprNode {
            kind: crate::ast::expr::Expr::Constant(crate::ast::constant::Constant::Integer { value: 1, ty: int_ty }),
            ty: int_ty,
            location: SourceRange::synthetic(),
            comments: Vec::new(),
        });

        let mut builder = ModuleBuilder::new(&mut module);
        let block = builder.new_builder(ScopeId::ROOT);
        builder.push_builder(block);
        let name = interner.intern("int.add");
        let first = builder.add_instruction(None, Id::unqualified(name, SourceRange::synthetic()), [x_expr].into_iter().collect(), SourceRange::synthetic());
        let second = builder.add_instruction(None, Id::unqualified(name, SourceRange::synthetic()), [x_expr].into_iter().collect(), SourceRange::synthetic());
        builder.pop_builder();

        assert_eq!(module.stmt(first).chain_next, Some(second));
        let Stmt::Block(block_kind) = &module.stmt(block).kind else { panic!("not a block") };
        assert_eq!(block_kind.statements, vec![first, second]);
    }

    #[test]
    fn add_if_returns_an_empty_then_branch() {
        let mut interner = Interner::new();
        let mut module = new_module(&mut interner);
        let bool_ty = module.types.push(TypeNode { kind: Type::Bool, location: SourceRange::synthetic(), doc: None });
        let cond = module.exprs.push(ExprNode {
            kind: crate::ast::expr::Expr::Constant(crate::ast::constant::Constant::Bool(true)),
            ty: bool_ty,
            location: SourceRange::synthetic(),
            comments: Vec::new(),
        });

        let mut builder = ModuleBuilder::new(&mut module);
        let root = builder.new_builder(ScopeId::ROOT);
        builder.push_builder(root);
        let then_branch = builder.add_if(cond, ScopeId::ROOT, SourceRange::synthetic());

        let Stmt::Block(then_block) = &module.stmt(then_branch).kind else { panic!("then branch is not a block") };
        assert!(then_block.statements.is_empty());
    }

    #[test]
    fn cache_node_returns_the_first_value_for_a_repeated_key() {
        let mut interner = Interner::new();
        let mut module = new_module(&mut interner);
        let int_ty = module.types.push(TypeNode { kind: Type::Integer { width: 32, signed: true }, location: SourceRange::synthetic(), doc: None });
        let first = module.exprs.push(ExprNode { kind: crate::ast::expr::Expr::PlaceHolder(int_ty), ty: int_ty, location: SourceRange::synthetic(), comments: Vec::new() });
        let second = module.exprs.push(ExprNode { kind: crate::ast::expr::Expr::PlaceHolder(int_ty), ty: int_ty, location: SourceRange::synthetic(), comments: Vec::new() });

        let mut builder = ModuleBuilder::new(&mut module);
        assert_eq!(builder.cache_node("k", first), first);
        assert_eq!(builder.cache_node("k", second), first, "second insert under the same key must not replace the first");
        assert_eq!(builder.lookup_node("k"), Some(first));
        assert_eq!(builder.lookup_node("missing"), None);
    }

    #[test]
    #[should_panic(expected = "addTmp outside a function")]
    fn add_tmp_outside_a_function_panics() {
        let mut interner = Interner::new();
        let mut module = new_module(&mut interner);
        let int_ty = module.types.push(TypeNode { kind: Type::Integer { width: 32, signed: true }, location: SourceRange::synthetic(), doc: None });
        let mut builder = ModuleBuilder::new(&mut module);
        let name = interner.intern("__tmp0");
        builder.add_tmp(name, int_ty, SourceRange::synthetic());
    }
}
