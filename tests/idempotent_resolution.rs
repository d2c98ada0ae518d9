//! Running `resolve_ids` again over an already-resolved module must be a
//! no-op: every `Expr::Id` was already rewritten in place, so there's
//! nothing left for a second pass to find or re-report.

use hilta::ast::arena::Arena;
use hilta::ast::decl::{DeclKind, Declaration, Linkage};
use hilta::ast::expr::{Expr, ExprNode};
use hilta::ast::module::Module;
use hilta::ast::stmt::{Block, Stmt, StmtNode};
use hilta::ast::ty::{Type, TypeNode};
use hilta::diagnostics::DiagnosticSink;
use hilta::id::Id;
use hilta::location::SourceRange;
use hilta::scope::Scopes;
use hilta::{CompilerContext, CompilerOptions};

#[test]
fn second_resolve_pass_leaves_the_binding_untouched() {
    let mut ctx = CompilerContext::new(CompilerOptions::default());
    let name = ctx.interner_mut().intern("Main");
    let x_name = ctx.interner_mut().intern("x");

    let mut scratch: Arena<StmtNode> = Arena::new();
    let placeholder = scratch.push(StmtNode { kind: Stmt::NoOp, location: SourceRange::synthetic(), comments: Vec::new(), chain_next: None });
    let mut module = Module::new(name, name, placeholder, Scopes::new());

    let int_ty = module.types.push(TypeNode { kind: Type::Integer { width: 32, signed: true }, location: SourceRange::synthetic(), doc: None });
    let x = module.decls.push(Declaration {
        id: Id::unqualified(x_name, SourceRange::synthetic()),
        linkage: Linkage::Local,
        kind: DeclKind::Variable { ty: int_ty, init: None },
        location: SourceRange::synthetic(),
        comments: Vec::new(),
    });

    let reference = module.exprs.push(ExprNode {
        kind: Expr::Id(Id::unqualified(x_name, SourceRange::synthetic())),
        ty: int_ty,
        location: SourceRange::synthetic(),
        comments: Vec::new(),
    });
    let use_stmt = module.stmts.push(StmtNode {
        kind: Stmt::ExpressionStatement(reference),
        location: SourceRange::synthetic(),
        comments: Vec::new(),
        chain_next: None,
    });

    let root = module.stmts.push(StmtNode {
        kind: Stmt::Block(Block { scope: hilta::ScopeId::ROOT, statements: vec![use_stmt], declarations: vec![x] }),
        location: SourceRange::synthetic(),
        comments: Vec::new(),
        chain_next: None,
    });
    module.body = root;

    let module_id = ctx.add_module(module);

    let mut sink = DiagnosticSink::new();
    {
        let module = ctx.module_mut(module_id);
        hilta::resolve::build_scopes(module, module_id, &mut sink);
    }
    hilta::resolve::resolve_ids(&mut ctx, module_id, &mut sink);
    assert!(!sink.has_errors());
    assert!(matches!(ctx.module(module_id).expr(reference).kind, Expr::Variable(decl) if decl == x));

    let mut second_sink = DiagnosticSink::new();
    hilta::resolve::resolve_ids(&mut ctx, module_id, &mut second_sink);
    assert!(second_sink.is_empty(), "a second resolve_ids pass should find nothing left to resolve");
    assert!(matches!(ctx.module(module_id).expr(reference).kind, Expr::Variable(decl) if decl == x));
}
