//! Liveness over a loop back-edge (`foreach` body chaining back to the
//! `foreach` statement itself) must actually reach a fixed point, and
//! re-running the solver over the same CFG must reproduce it exactly.

use hilta::ast::arena::Arena;
use hilta::ast::constant::Constant;
use hilta::ast::decl::{DeclKind, Declaration, Linkage};
use hilta::ast::expr::{Expr, ExprNode};
use hilta::ast::module::Module;
use hilta::ast::stmt::{Block, ForEachStmt, Instruction, InstructionOperands, Stmt, StmtId, StmtNode};
use hilta::ast::ty::{Type, TypeNode};
use hilta::id::Id;
use hilta::intern::Interner;
use hilta::location::SourceRange;
use hilta::scope::Scopes;
use hilta::{Cfg, Liveness, Opcode};

fn push_stmt(module: &mut Module, kind: Stmt, chain_next: Option<StmtId>) -> StmtId {
    module.stmts.push(StmtNode { kind, location: SourceRange::synthetic(), comments: Vec::new(), chain_next })
}

#[test]
fn recomputing_over_the_same_cfg_is_deterministic() {
    let mut interner = Interner::new();
    let name = interner.intern("Main");

    let mut scratch: Arena<StmtNode> = Arena::new();
    let placeholder = scratch.push(StmtNode { kind: Stmt::NoOp, location: SourceRange::synthetic(), comments: Vec::new(), chain_next: None });
    let mut module = Module::new(name, name, placeholder, Scopes::new());

    let int_ty = module.types.push(TypeNode { kind: Type::Integer { width: 32, signed: true }, location: SourceRange::synthetic(), doc: None });
    let x = module.decls.push(Declaration {
        id: Id::unqualified(interner.intern("x"), SourceRange::synthetic()),
        linkage: Linkage::Local,
        kind: DeclKind::Variable { ty: int_ty, init: None },
        location: SourceRange::synthetic(),
        comments: Vec::new(),
    });
    let y = module.decls.push(Declaration {
        id: Id::unqualified(interner.intern("y"), SourceRange::synthetic()),
        linkage: Linkage::Local,
        kind: DeclKind::Variable { ty: int_ty, init: None },
        location: SourceRange::synthetic(),
        comments: Vec::new(),
    });
    let x_expr = module.exprs.push(ExprNode { kind: Expr::Variable(x), ty: int_ty, location: SourceRange::synthetic(), comments: Vec::new() });
    let y_expr = module.exprs.push(ExprNode { kind: Expr::Variable(y), ty: int_ty, location: SourceRange::synthetic(), comments: Vec::new() });
    let seq_expr = module.exprs.push(ExprNode { kind: Expr::Variable(y), ty: int_ty, location: SourceRange::synthetic(), comments: Vec::new() });

    let mut operands: InstructionOperands = InstructionOperands::new();
    operands.push(y_expr);

    // `foreach` body assigns `x := y`, then chains back to the `foreach`
    // statement itself — the back-edge the solver's reverse-post-order
    // iteration is meant to converge over in more than one pass.
    let body = module.stmts.push(StmtNode {
        kind: Stmt::Instruction(Instruction::Resolved { opcode: Opcode::Assign, target: Some(x_expr), operands }),
        location: SourceRange::synthetic(),
        comments: Vec::new(),
        chain_next: None,
    });

    let foreach_stmt = push_stmt(&mut module, Stmt::ForEach(ForEachStmt { var: y, sequence: seq_expr, body }), None);
    module.stmts.get_mut(body).chain_next = Some(foreach_stmt);

    let root = push_stmt(
        &mut module,
        Stmt::Block(Block { scope: hilta::ScopeId::ROOT, statements: vec![foreach_stmt], declarations: Vec::new() }),
        None,
    );
    module.body = root;

    let cfg = Cfg::build(&module, root);
    let first = Liveness::compute(&module, &cfg);
    let second = Liveness::compute(&module, &cfg);

    for &id in &cfg.reverse_post_order {
        assert_eq!(first.live_in(id), second.live_in(id), "live_in diverged at {id:?} across two solver runs");
        assert_eq!(first.live_out(id), second.live_out(id), "live_out diverged at {id:?} across two solver runs");
    }

    // `body`'s own instruction reads `y` as its assign operand, so `y`
    // must be live going into it.
    assert!(first.live_in(body).contains(&y));
}
