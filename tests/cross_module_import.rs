//! End-to-end `import` wiring: a scoped reference into another module's
//! top-level scope must resolve once both modules have gone through
//! `compile_module` (exercising `resolve::wire_imports`, called right
//! after `build_scopes`, from inside the pipeline itself).

use hilta::ast::arena::Arena;
use hilta::ast::decl::{DeclKind, Declaration, Linkage};
use hilta::ast::expr::{Expr, ExprNode};
use hilta::ast::module::Module;
use hilta::ast::stmt::{Block, Stmt, StmtNode};
use hilta::ast::ty::{Type, TypeNode};
use hilta::id::Id;
use hilta::location::SourceRange;
use hilta::scope::Scopes;
use hilta::{CompilerContext, CompilerOptions};

#[test]
fn scoped_reference_into_an_imported_module_resolves() {
    let mut ctx = CompilerContext::new(CompilerOptions::default());
    let utils_name = ctx.interner_mut().intern("Utils");
    let main_name = ctx.interner_mut().intern("Main");
    let helper_name = ctx.interner_mut().intern("helper");

    // `Utils` module: a single top-level `helper` variable declaration.
    let mut utils_scratch: Arena<StmtNode> = Arena::new();
    let utils_placeholder = utils_scratch.push(StmtNode { kind: Stmt::NoOp, location: SourceRange::synthetic(), comments: Vec::new(), chain_next: None });
    let mut utils = Module::new(utils_name, utils_name, utils_placeholder, Scopes::new());

    let int_ty = utils.types.push(TypeNode { kind: Type::Integer { width: 32, signed: true }, location: SourceRange::synthetic(), doc: None });
    let helper = utils.decls.push(Declaration {
        id: Id::unqualified(helper_name, SourceRange::synthetic()),
        linkage: Linkage::Local,
        kind: DeclKind::Variable { ty: int_ty, init: None },
        location: SourceRange::synthetic(),
        comments: Vec::new(),
    });
    let utils_root = utils.stmts.push(StmtNode {
        kind: Stmt::Block(Block { scope: hilta::ScopeId::ROOT, statements: Vec::new(), declarations: vec![helper] }),
        location: SourceRange::synthetic(),
        comments: Vec::new(),
        chain_next: None,
    });
    utils.body = utils_root;

    // `Main` module: imports `Utils` and reads `Utils::helper`.
    let mut main_scratch: Arena<StmtNode> = Arena::new();
    let main_placeholder = main_scratch.push(StmtNode { kind: Stmt::NoOp, location: SourceRange::synthetic(), comments: Vec::new(), chain_next: None });
    let mut main = Module::new(main_name, main_name, main_placeholder, Scopes::new());
    main.imports.push(utils_name);

    let main_int_ty = main.types.push(TypeNode { kind: Type::Integer { width: 32, signed: true }, location: SourceRange::synthetic(), doc: None });
    let reference = main.exprs.push(ExprNode {
        kind: Expr::Id(Id::new([utils_name, helper_name], SourceRange::synthetic())),
        ty: main_int_ty,
        location: SourceRange::synthetic(),
        comments: Vec::new(),
    });
    let use_stmt = main.stmts.push(StmtNode {
        kind: Stmt::ExpressionStatement(reference),
        location: SourceRange::synthetic(),
        comments: Vec::new(),
        chain_next: None,
    });
    let main_root = main.stmts.push(StmtNode {
        kind: Stmt::Block(Block { scope: hilta::ScopeId::ROOT, statements: vec![use_stmt], declarations: Vec::new() }),
        location: SourceRange::synthetic(),
        comments: Vec::new(),
        chain_next: None,
    });
    main.body = main_root;

    let utils_id = ctx.add_module(utils);
    let main_id = ctx.add_module(main);

    let utils_sink = ctx.compile_module(utils_id);
    assert!(!utils_sink.has_errors());

    let main_sink = ctx.compile_module(main_id);
    assert!(
        !main_sink.iter().any(|d| d.kind == hilta::DiagnosticKind::UnresolvedId),
        "Utils::helper should resolve once wire_imports has aliased Utils's root scope into Main's"
    );

    let resolved = ctx.module(main_id).expr(reference);
    assert!(matches!(resolved.kind, Expr::Variable(decl) if decl == helper));
}
