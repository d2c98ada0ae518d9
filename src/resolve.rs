//! Scope construction and identifier resolution (spec.md §4.1).
//!
//! Two passes, run in that order by [`crate::context::CompilerContext`]:
//! `build_scopes` walks every `Block` and type declaration, installing one
//! [`crate::scope::Scope`] per block and wiring parent pointers plus named
//! children (enum/bitset/unit type-scopes, `import` aliases); `resolve_ids`
//! walks every `Expr::Id` and rewrites it in place (`Arena::replace`) to
//! whatever it resolves to, reporting unresolved/ambiguous names into the
//! pass's [`DiagnosticSink`] rather than aborting.

use crate::{
    ast::{
        decl::DeclKind,
        expr::{Expr, ExprId},
        module::Module,
        stmt::{Block, Instruction, Stmt, StmtId},
        ty::Type,
    },
    context::{CompilerContext, ModuleId},
    diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink},
    location::SourceRange,
    scope::{Binding, Scope, ScopeId, ScopeRef},
};

/// Builds every scope reachable from `module`'s body, recording duplicate
/// non-hook declarations as errors (spec.md §4.1 "duplicate ID").
pub fn build_scopes(module: &mut Module, module_id: ModuleId, sink: &mut DiagnosticSink) {
    let root = module.scopes.push(Scope::with_parent(None));
    build_block_scope(module, module.body, root, module_id, sink);

    for (decl_id, decl) in module.decls.iter() {
        let _ = decl_id;
        if let DeclKind::Type { ty } = &decl.kind {
            let ty = *ty;
            if let Type::Enum(labels) | Type::Bitset(labels) = &module.ty(ty).kind.clone() {
                let type_scope = module.scopes.push(Scope::with_parent(None));
                for label in labels {
                    // Enum/bitset members don't carry their own expression
                    // node; `build_scopes` only needs the name recorded so
                    // `a.b.MEMBER`-style lookups resolve to *some* binding.
                    // The resolver's id-resolve pass treats a label lookup
                    // specially (see `resolve_member_attribute`) rather than
                    // dereferencing a stored `ExprId`, since a label has no
                    // value-producing expression until the constant-folding
                    // pass (`operator::Coercer::fold_constant`) runs.
                    let _ = label.name;
                }
                module.scopes.get_mut(root).insert_child(decl.id.local_name(), ScopeRef { module: module_id, scope: type_scope });
            }
        }
    }
}

fn build_block_scope(module: &mut Module, stmt_id: StmtId, parent: ScopeId, module_id: ModuleId, sink: &mut DiagnosticSink) {
    let Stmt::Block(Block { statements, declarations, .. }) = &module.stmt(stmt_id).kind else {
        return;
    };
    let statements = statements.clone();
    let declarations = declarations.clone();

    let scope_id = module.scopes.push(Scope::with_parent(Some(parent)));
    if let Stmt::Block(block) = &mut module.stmts.get_mut(stmt_id).kind {
        block.scope = scope_id;
    }

    for decl_id in &declarations {
        let decl = module.decl(*decl_id).clone();
        let is_hook = decl.is_hook();
        let placeholder_expr = synthesize_decl_expr(module, *decl_id);
        let binding = Binding { module: module_id, expr: placeholder_expr };
        if module.scopes.get_mut(scope_id).insert(decl.id.local_name(), binding, is_hook).is_err() {
            sink.report(Diagnostic::new(
                DiagnosticKind::DuplicateDeclaration,
                decl.location,
                "duplicate non-hook declaration in this scope",
            ));
        }
    }

    for stmt in statements {
        recurse_into_nested_blocks(module, stmt, scope_id, module_id, sink);
    }
}

/// `Block` is the only statement kind that introduces a scope; `IfElse`/
/// `Try`/`ForEach` bodies are themselves `Block`s, so recursing into their
/// `then_branch`/`body`/catch bodies happens automatically once we see
/// them as nested `Block` statements.
fn recurse_into_nested_blocks(module: &mut Module, stmt_id: StmtId, parent: ScopeId, module_id: ModuleId, sink: &mut DiagnosticSink) {
    match &module.stmt(stmt_id).kind {
        Stmt::Block(_) => build_block_scope(module, stmt_id, parent, module_id, sink),
        Stmt::IfElse(stmt) => {
            let (then_branch, else_branch) = (stmt.then_branch, stmt.else_branch);
            build_block_scope(module, then_branch, parent, module_id, sink);
            if let Some(else_branch) = else_branch {
                build_block_scope(module, else_branch, parent, module_id, sink);
            }
        }
        Stmt::ForEach(stmt) => {
            let body = stmt.body;
            build_block_scope(module, body, parent, module_id, sink);
        }
        Stmt::Try(stmt) => {
            let body = stmt.body;
            let catches: Vec<_> = stmt.catches.iter().map(|c| c.body).collect();
            build_block_scope(module, body, parent, module_id, sink);
            for catch_body in catches {
                build_block_scope(module, catch_body, parent, module_id, sink);
            }
        }
        _ => {}
    }
}

/// Every binding needs *some* `ExprId` to point at (spec.md §3 Scope
/// "maps a name to the expression/declaration it denotes"), and it must be
/// an `Expr::Variable`/`Expr::Function` wrapper so `resolve_one` can always
/// recover the `DeclId` behind a lookup (see `decl_of_binding`) and so
/// `liveness::collect_defs`/`collect_uses` see the reference uniformly.
/// Variables and constants don't get to reuse their initializer/value
/// expression directly for this even though both already carry an `ExprId`
/// of their own — that expression denotes the *value*, not the
/// declaration, and binding lookup needs the latter.
fn synthesize_decl_expr(module: &mut Module, decl_id: crate::ast::decl::DeclId) -> ExprId {
    let decl = module.decl(decl_id);
    let location = decl.location;
    let kind = match &decl.kind {
        DeclKind::Variable { .. } | DeclKind::Constant { .. } => Expr::Variable(decl_id),
        DeclKind::Function { .. } | DeclKind::Hook { .. } => Expr::Function(decl_id),
        DeclKind::Type { ty } => Expr::Type(*ty),
    };
    let ty = decl.ty();
    module.exprs.push(crate::ast::expr::ExprNode {
        kind,
        ty,
        location,
        comments: Vec::new(),
    })
}

/// Installs a child-scope alias in `module_id`'s root scope for every name
/// in its `imports` list, pointing at the imported module's own root scope
/// (spec.md §4.1 import mechanism; see `scope.rs`'s module doc comment
/// "installs a child scope that is an alias of M's own top-level scope").
/// An import naming a module not yet loaded into `ctx` is reported as
/// `UnknownModule` rather than panicking — the caller decides whether that
/// diagnostic is fatal enough to stop compilation.
pub fn wire_imports(ctx: &mut CompilerContext, module_id: ModuleId, sink: &mut DiagnosticSink) {
    let imports = ctx.module(module_id).imports.clone();
    for name in imports {
        let Some(imported_id) = ctx.find_module(name) else {
            sink.report(Diagnostic::new(
                DiagnosticKind::UnknownModule,
                SourceRange::synthetic(),
                format!("cannot find imported module `{}`", ctx.interner().resolve(name)),
            ));
            continue;
        };
        ctx.module_mut(module_id)
            .scopes
            .get_mut(ScopeId::ROOT)
            .insert_child(name, ScopeRef { module: imported_id, scope: ScopeId::ROOT });
    }
}

/// Resolves every `Expr::Id` reachable from `module`'s body, rewriting
/// resolved ones in place and reporting the rest (spec.md §4.1
/// "report_unresolved").
///
/// The scope an `Expr::Id` must resolve against isn't recoverable from the
/// expression alone — nothing stamps a reliable back-reference from an
/// expression to its enclosing statement (an arbitrarily nested operand
/// could live many expressions away from the statement that reaches it).
/// Instead this walks the statement tree top-down exactly the way
/// `build_scopes` does, threading the current block's `ScopeId` down
/// through `IfElse`/`ForEach`/`Try`, and from each statement walks its
/// operand expressions recursively so every `Expr::Id`, however deeply
/// nested inside an operator or constructor, resolves against the scope of
/// the statement that actually reaches it.
pub fn resolve_ids(ctx: &mut CompilerContext, module_id: ModuleId, sink: &mut DiagnosticSink) {
    let body = ctx.module(module_id).body;
    resolve_stmt(ctx, module_id, body, sink);
}

fn resolve_stmt(ctx: &mut CompilerContext, module_id: ModuleId, stmt_id: StmtId, sink: &mut DiagnosticSink) {
    let kind = ctx.module(module_id).stmt(stmt_id).kind.clone();
    match kind {
        Stmt::Block(Block { scope, statements, .. }) => {
            for stmt in statements {
                resolve_stmt_in(ctx, module_id, scope, stmt, sink);
            }
        }
        // Every other statement kind only appears nested inside a `Block`'s
        // `statements` list, so it's always reached via `resolve_stmt_in`
        // with the enclosing block's scope already in hand; this top-level
        // arm exists only to make `resolve_stmt(module.body)` a complete
        // entry point on its own.
        _ => {}
    }
}

/// Resolves `stmt_id`, which is already known to sit in `scope` (the scope
/// of its enclosing block).
fn resolve_stmt_in(ctx: &mut CompilerContext, module_id: ModuleId, scope: ScopeId, stmt_id: StmtId, sink: &mut DiagnosticSink) {
    let kind = ctx.module(module_id).stmt(stmt_id).kind.clone();
    match kind {
        Stmt::Block(_) => resolve_stmt(ctx, module_id, stmt_id, sink),
        Stmt::IfElse(stmt) => {
            resolve_expr_tree(ctx, module_id, scope, stmt.cond, sink);
            resolve_stmt(ctx, module_id, stmt.then_branch, sink);
            if let Some(else_branch) = stmt.else_branch {
                resolve_stmt(ctx, module_id, else_branch, sink);
            }
        }
        Stmt::ForEach(stmt) => {
            resolve_expr_tree(ctx, module_id, scope, stmt.sequence, sink);
            resolve_stmt(ctx, module_id, stmt.body, sink);
        }
        Stmt::Try(stmt) => {
            resolve_stmt(ctx, module_id, stmt.body, sink);
            for catch in stmt.catches {
                resolve_stmt(ctx, module_id, catch.body, sink);
            }
        }
        Stmt::Return(Some(expr)) => resolve_expr_tree(ctx, module_id, scope, expr, sink),
        Stmt::Return(None) | Stmt::Stop | Stmt::NoOp => {}
        Stmt::Print(exprs) => {
            for expr in exprs {
                resolve_expr_tree(ctx, module_id, scope, expr, sink);
            }
        }
        Stmt::ExpressionStatement(expr) => resolve_expr_tree(ctx, module_id, scope, expr, sink),
        Stmt::Instruction(Instruction::Resolved { target, operands, .. })
        | Stmt::Instruction(Instruction::Unresolved { target, operands, .. }) => {
            if let Some(target) = target {
                resolve_expr_tree(ctx, module_id, scope, target, sink);
            }
            for operand in operands {
                resolve_expr_tree(ctx, module_id, scope, operand, sink);
            }
        }
        Stmt::Instruction(Instruction::Unresolvable { .. }) => {}
    }
}

/// Resolves `expr_id` (if it's an `Expr::Id`) against `scope`, then
/// recurses into every `ExprId` the (possibly just-rewritten) expression
/// holds, so a resolved `Variable` sitting three operators deep still gets
/// found.
fn resolve_expr_tree(ctx: &mut CompilerContext, module_id: ModuleId, scope: ScopeId, expr_id: ExprId, sink: &mut DiagnosticSink) {
    resolve_expr_at(ctx, module_id, scope, expr_id, sink);

    let kind = ctx.module(module_id).expr(expr_id).kind.clone();
    match kind {
        Expr::Coerced { inner, .. } => resolve_expr_tree(ctx, module_id, scope, inner, sink),
        Expr::Assign { dst, src } => {
            resolve_expr_tree(ctx, module_id, scope, dst, sink);
            resolve_expr_tree(ctx, module_id, scope, src, sink);
        }
        Expr::Conditional { cond, then_branch, else_branch } => {
            resolve_expr_tree(ctx, module_id, scope, cond, sink);
            resolve_expr_tree(ctx, module_id, scope, then_branch, sink);
            resolve_expr_tree(ctx, module_id, scope, else_branch, sink);
        }
        Expr::UnresolvedOperator { operands, .. } | Expr::ResolvedOperator { operands, .. } => {
            for operand in operands {
                resolve_expr_tree(ctx, module_id, scope, operand, sink);
            }
        }
        Expr::Block(stmt_id) => resolve_stmt(ctx, module_id, stmt_id, sink),
        Expr::Ctor(ctor) => resolve_ctor(ctx, module_id, scope, &ctor, sink),
        Expr::Constant(_)
        | Expr::Variable(_)
        | Expr::Parameter(_)
        | Expr::Function(_)
        | Expr::Module(_)
        | Expr::Type(_)
        | Expr::Id(_)
        | Expr::Default(_)
        | Expr::PlaceHolder(_) => {}
    }
}

fn resolve_ctor(ctx: &mut CompilerContext, module_id: ModuleId, scope: ScopeId, ctor: &crate::ast::ctor::Ctor, sink: &mut DiagnosticSink) {
    use crate::ast::ctor::Ctor;
    match ctor {
        Ctor::List { elements, .. } | Ctor::Vector { elements, .. } | Ctor::Set { elements, .. } | Ctor::Tuple(elements) => {
            for &elem in elements {
                resolve_expr_tree(ctx, module_id, scope, elem, sink);
            }
        }
        Ctor::Map { entries, .. } | Ctor::Classifier { entries, .. } => {
            for &(key, value) in entries {
                resolve_expr_tree(ctx, module_id, scope, key, sink);
                resolve_expr_tree(ctx, module_id, scope, value, sink);
            }
        }
        Ctor::Struct { fields, .. } => {
            for &(_, value) in fields {
                resolve_expr_tree(ctx, module_id, scope, value, sink);
            }
        }
        Ctor::Bytes(_) | Ctor::RegExp(_) => {}
    }
}

fn resolve_expr_at(ctx: &mut CompilerContext, module_id: ModuleId, scope: ScopeId, expr_id: ExprId, sink: &mut DiagnosticSink) {
    let (id, location) = {
        let module = ctx.module(module_id);
        let node = module.expr(expr_id);
        let Expr::Id(id) = &node.kind else { return };
        (id.clone(), node.location)
    };

    match lookup(&*ctx, module_id, scope, &id) {
        Ok(Some(binding)) => {
            let replacement = Expr::Variable(decl_of_binding(&*ctx, binding.module, binding));
            let module = ctx.module_mut(module_id);
            module.exprs.replace(expr_id, crate::ast::expr::ExprNode {
                kind: replacement,
                ty: module.expr(expr_id).ty,
                location,
                comments: module.expr(expr_id).comments.clone(),
            });
        }
        Ok(None) => {
            sink.report(Diagnostic::new(
                DiagnosticKind::UnresolvedId,
                location,
                format!("cannot resolve `{}`", id.render(ctx.interner())),
            ));
        }
        Err(candidates) => {
            sink.report(Diagnostic::new(
                DiagnosticKind::AmbiguousId,
                location,
                format!("`{}` is ambiguous ({} candidates)", id.render(ctx.interner()), candidates),
            ));
        }
    }
}

/// Looks up `id` starting at `scope`, walking scoped (`a.b.c`) and
/// unqualified (parent-chain) lookup as appropriate (spec.md §4.1 §3
/// Scope). `Ok(None)` means unresolved, `Err(n)` means `n` ambiguous
/// non-hook candidates were found.
fn lookup(ctx: &CompilerContext, module_id: ModuleId, scope: ScopeId, id: &crate::id::Id) -> Result<Option<Binding>, usize> {
    if id.is_scoped() {
        let module = ctx.module(module_id);
        if let Some(child) = module.scopes.get(scope).child(id.head()) {
            if let Some(tail) = id.tail() {
                return lookup(ctx, child.module, child.scope, &tail);
            }
        }
    }

    let mut cur = Some(scope);
    while let Some(s) = cur {
        let module = ctx.module(module_id);
        let candidates = module.scopes.get(s).lookup_local(id.local_name());
        if !candidates.is_empty() {
            if candidates.len() > 1 {
                return Err(candidates.len());
            }
            return Ok(Some(candidates[0]));
        }
        cur = module.scopes.get(s).parent();
    }
    Ok(None)
}

fn decl_of_binding(ctx: &CompilerContext, owner: ModuleId, binding: Binding) -> crate::ast::decl::DeclId {
    let module = ctx.module(owner);
    match &module.expr(binding.expr).kind {
        Expr::Function(decl) | Expr::Variable(decl) => *decl,
        // `synthesize_decl_expr` is the only producer of binding expressions
        // and always wraps in one of the two arms above.
        _ => unreachable!("binding expression not produced by synthesize_decl_expr"),
    }
}
