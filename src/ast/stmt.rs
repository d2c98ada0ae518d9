//! Statements (spec.md §3 Statement).
//!
//! `IfElse`/`ForEach`/`Try` are the surface, pre-lowering structured forms
//! the IR builder exposes through `addIf`/`addIfElse`/`pushHook` etc.
//! (spec.md §4.4). The `block-flatten` pass (spec.md §4.8 pipeline) lowers
//! them into the flat `Instruction` family — `flow.jump`, `flow.ifelse`,
//! `flow.switch`, … — that the CFG/liveness passes and the downstream code
//! generator actually walk. Rather than one Rust enum variant per opcode
//! (spec.md's "large closed family", closed over ~60 instructions in the
//! original), `Instruction` holds an [`crate::instruction::Opcode`] plus a
//! fixed operand shape; per-opcode behavior (stack effect, flow info, flow
//! effects) is a table lookup on the opcode, exactly like
//! `CodeBuilder::stack_effect` dispatches on `Opcode` in the teacher.

use smallvec::SmallVec;

use crate::{
    ast::{arena::Idx, decl::DeclId, expr::ExprId, ty::TypeId},
    instruction::Opcode,
    location::SourceRange,
    scope::ScopeId,
};

pub type StmtId = Idx<StmtNode>;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StmtNode {
    pub kind: Stmt,
    pub location: SourceRange,
    pub comments: Vec<String>,
    /// Successor in declaration order within the enclosing block, linked by
    /// the instruction resolver once all statements resolve successfully
    /// (spec.md §4.3 "linked via a successor chain"). `None` for the last
    /// statement of a block.
    pub chain_next: Option<StmtId>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub scope: ScopeId,
    pub statements: Vec<StmtId>,
    pub declarations: Vec<DeclId>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CatchClause {
    pub exception_ty: Option<TypeId>,
    pub var: Option<DeclId>,
    pub body: StmtId,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TryStmt {
    pub body: StmtId,
    pub catches: Vec<CatchClause>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ForEachStmt {
    pub var: DeclId,
    pub sequence: ExprId,
    pub body: StmtId,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IfElseStmt {
    pub cond: ExprId,
    pub then_branch: StmtId,
    pub else_branch: Option<StmtId>,
}

/// Up to three operands plus an optional target (spec.md §3 Statement).
pub type InstructionOperands = SmallVec<[ExprId; 3]>;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Instruction {
    /// Carries only a name and operands; rewritten by the resolver
    /// (spec.md §4.3).
    Unresolved {
        name: crate::id::Id,
        target: Option<ExprId>,
        operands: InstructionOperands,
    },
    /// Uniquely matched against the instruction registry.
    Resolved {
        opcode: Opcode,
        target: Option<ExprId>,
        operands: InstructionOperands,
    },
    /// Diagnosed: zero or more than one candidate matched (spec.md §4.3,
    /// §7). Kept as a statement (rather than aborting the pass) so later
    /// passes can still walk the block; the validator/CFG treat it as an
    /// unconditional terminator with no successors.
    Unresolvable { name: crate::id::Id },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Stmt {
    Block(Block),
    Try(TryStmt),
    ForEach(ForEachStmt),
    IfElse(IfElseStmt),
    Return(Option<ExprId>),
    Stop,
    NoOp,
    Print(Vec<ExprId>),
    ExpressionStatement(ExprId),
    Instruction(Instruction),
}

impl Stmt {
    /// Blocks are transparent for CFG purposes — their first non-block
    /// statement is the effective entry (spec.md §4.6).
    #[must_use]
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block(_))
    }
}
