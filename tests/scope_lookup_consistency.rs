//! Two separate unqualified references to the same outer-scope name,
//! read from within a nested block, must resolve to the identical
//! declaration via the parent-chain walk.

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
fn both_references_resolve_to_the_same_outer_declaration() {
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

    let ref1 = module.exprs.push(ExprNode {
        kind: Expr::Id(Id::unqualified(x_name, SourceRange::synthetic())),
        ty: int_ty,
        location: SourceRange::synthetic(),
        comments: Vec::new(),
    });
    let ref2 = module.exprs.push(ExprNode {
        kind: Expr::Id(Id::unqualified(x_name, SourceRange::synthetic())),
        ty: int_ty,
        location: SourceRange::synthetic(),
        comments: Vec::new(),
    });
    let stmt1 = module.stmts.push(StmtNode { kind: Stmt::ExpressionStatement(ref1), location: SourceRange::synthetic(), comments: Vec::new(), chain_next: None });
    let stmt2 = module.stmts.push(StmtNode { kind: Stmt::ExpressionStatement(ref2), location: SourceRange::synthetic(), comments: Vec::new(), chain_next: None });
    module.stmts.get_mut(stmt1).chain_next = Some(stmt2);

    let inner = module.stmts.push(StmtNode {
        kind: Stmt::Block(Block { scope: hilta::ScopeId::ROOT, statements: vec![stmt1, stmt2], declarations: Vec::new() }),
        location: SourceRange::synthetic(),
        comments: Vec::new(),
        chain_next: None,
    });

    let root = module.stmts.push(StmtNode {
        kind: Stmt::Block(Block { scope: hilta::ScopeId::ROOT, statements: vec![inner], declarations: vec![x] }),
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

    let module = ctx.module(module_id);
    let Expr::Variable(decl1) = module.expr(ref1).kind else { panic!("ref1 did not resolve to a Variable") };
    let Expr::Variable(decl2) = module.expr(ref2).kind else { panic!("ref2 did not resolve to a Variable") };
    assert_eq!(decl1, x);
    assert_eq!(decl1, decl2);
}
