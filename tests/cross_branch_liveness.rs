//! A variable assigned differently in each branch of an `if`/`else` and
//! read only after the branches rejoin must be live-out of *both*
//! branches — exercising the cfg.rs fix that actually walks into
//! `IfElse` bodies instead of only following `chain_next`.

use hilta::ast::arena::Arena;
use hilta::ast::constant::Constant;
use hilta::ast::decl::{DeclKind, Declaration, Linkage};
use hilta::ast::expr::{Expr, ExprNode};
use hilta::ast::module::Module;
use hilta::ast::stmt::{Block, IfElseStmt, Instruction, InstructionOperands, Stmt, StmtId, StmtNode};
use hilta::ast::ty::{Type, TypeNode};
use hilta::id::Id;
use hilta::intern::Interner;
use hilta::location::SourceRange;
use hilta::scope::Scopes;
use hilta::{Cfg, Liveness, Opcode};

fn push_stmt(module: &mut Module, kind: Stmt, chain_next: Option<StmtId>) -> StmtId {
    module.stmts.push(StmtNode { kind, location: SourceRange::synthetic(), comments: Vec::new(), chain_next })
}

fn const_expr(module: &mut Module, int_ty: hilta::ast::ty::TypeId, value: i64) -> hilta::ast::expr::ExprId {
    module.exprs.push(ExprNode {
        kind: Expr::Constant(Constant::Integer { value, ty: int_ty }),
        ty: int_ty,
        location: SourceRange::synthetic(),
        comments: Vec::new(),
    })
}

#[test]
fn variable_read_after_merge_is_live_out_of_both_branches() {
    let mut interner = Interner::new();
    let name = interner.intern("Main");

    let mut scratch: Arena<StmtNode> = Arena::new();
    let placeholder = scratch.push(StmtNode { kind: Stmt::NoOp, location: SourceRange::synthetic(), comments: Vec::new(), chain_next: None });
    let mut module = Module::new(name, name, placeholder, Scopes::new());

    let bool_ty = module.types.push(TypeNode { kind: Type::Bool, location: SourceRange::synthetic(), doc: None });
    let int_ty = module.types.push(TypeNode { kind: Type::Integer { width: 32, signed: true }, location: SourceRange::synthetic(), doc: None });
    let cond = module.exprs.push(ExprNode { kind: Expr::Constant(Constant::Bool(true)), ty: bool_ty, location: SourceRange::synthetic(), comments: Vec::new() });

    let x = module.decls.push(Declaration {
        id: Id::unqualified(interner.intern("x"), SourceRange::synthetic()),
        linkage: Linkage::Local,
        kind: DeclKind::Variable { ty: int_ty, init: None },
        location: SourceRange::synthetic(),
        comments: Vec::new(),
    });
    let x_expr = module.exprs.push(ExprNode { kind: Expr::Variable(x), ty: int_ty, location: SourceRange::synthetic(), comments: Vec::new() });

    let one = const_expr(&mut module, int_ty, 1);
    let two = const_expr(&mut module, int_ty, 2);

    let after = push_stmt(&mut module, Stmt::ExpressionStatement(x_expr), None);

    let mut then_operands: InstructionOperands = InstructionOperands::new();
    then_operands.push(one);
    let then_branch = module.stmts.push(StmtNode {
        kind: Stmt::Instruction(Instruction::Resolved { opcode: Opcode::Assign, target: Some(x_expr), operands: then_operands }),
        location: SourceRange::synthetic(),
        comments: Vec::new(),
        chain_next: Some(after),
    });

    let mut else_operands: InstructionOperands = InstructionOperands::new();
    else_operands.push(two);
    let else_branch = module.stmts.push(StmtNode {
        kind: Stmt::Instruction(Instruction::Resolved { opcode: Opcode::Assign, target: Some(x_expr), operands: else_operands }),
        location: SourceRange::synthetic(),
        comments: Vec::new(),
        chain_next: Some(after),
    });

    let ifelse_stmt = push_stmt(&mut module, Stmt::IfElse(IfElseStmt { cond, then_branch, else_branch: Some(else_branch) }), None);

    let root = push_stmt(
        &mut module,
        Stmt::Block(Block { scope: hilta::ScopeId::ROOT, statements: vec![ifelse_stmt], declarations: vec![x] }),
        None,
    );
    module.body = root;

    let cfg = Cfg::build(&module, root);
    assert!(cfg.predecessors(after).contains(&then_branch));
    assert!(cfg.predecessors(after).contains(&else_branch));

    let liveness = Liveness::compute(&module, &cfg);
    assert!(liveness.live_in(after).contains(&x));
    assert!(liveness.live_out(then_branch).contains(&x));
    assert!(liveness.live_out(else_branch).contains(&x));
    // Each branch's own live_in excludes `x`: it's written, not read,
    // there.
    assert!(!liveness.live_in(then_branch).contains(&x));
    assert!(!liveness.live_in(else_branch).contains(&x));
}
