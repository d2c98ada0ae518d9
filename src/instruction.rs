//! Instructions and the instruction resolver (spec.md §4.3).
//!
//! `Opcode` plus a fixed operand shape stands in for one Rust variant per
//! instruction (spec.md's literal "large closed family" of roughly sixty
//! mnemonics) the same way the teacher's own `bytecode::op::Opcode` single
//! enum, dispatched through table lookups (`stack_effect`, here
//! `flow_info`), stands in for per-opcode structs in `CodeBuilder`.

use smallvec::SmallVec;

use crate::{
    ast::stmt::InstructionOperands,
    diagnostics::{Diagnostic, DiagnosticKind},
    location::SourceRange,
    operator::{OperandSpec, TypeShape},
};

/// The closed instruction catalog. Grouped the way spec.md §4.3 groups
/// them: value instructions (arithmetic/comparison/container ops lowered
/// from resolved operators), flow instructions (block-flatten output),
/// and the handful of binpac-specific parse-control instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum Opcode {
    // --- Value instructions, lowered from a resolved operator ---
    IntAdd,
    IntSub,
    IntMul,
    IntDiv,
    IntMod,
    DoubleAdd,
    DoubleSub,
    DoubleMul,
    DoubleDiv,
    Equal,
    NotEqual,
    Lower,
    Greater,
    BoolAnd,
    BoolOr,
    BoolNot,
    Assign,
    Coerce,
    New,
    CallFunction,
    CallHook,
    StructGet,
    StructSet,
    ListPushBack,
    ListPopFront,
    VectorGet,
    VectorSet,
    MapGet,
    MapSet,
    MapExists,
    SetInsert,
    SetExists,
    BytesLength,
    BegIter,
    EndIter,
    IterIncr,
    IterDeref,
    Unpack,
    Pack,

    // --- Flow instructions, emitted by block-flatten ---
    FlowJump,
    FlowIfElse,
    FlowSwitch,
    FlowReturnVoid,
    FlowReturnValue,
    FlowBeginHandler,
    FlowEndHandler,
    FlowThrow,
    FlowYield,
    FlowBlockEnd,

    // --- Binpac parse-control instructions (supplemental; grounded in
    // `original_source/binpac/codegen`'s parse-stage opcodes) ---
    ParseStartUnit,
    ParseEndUnit,
    ParseField,
    ParseSkip,
    SinkWrite,
    SinkConnect,

    // --- Thread/scope instructions (spec.md §4.5 Thread/Scope) ---
    ThreadGetContext,
    ThreadSetContext,
    ThreadSchedule,
}

/// How control flow continues after an instruction of this opcode, for
/// the CFG builder (spec.md §4.6 "successor computation uses flowInfo").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowInfo {
    /// Falls through to the statement chain's `chain_next`.
    Linear,
    /// Jumps to the operand-named target exclusively; no fallthrough.
    UnconditionalJump,
    /// Branches to either of two operand-named targets.
    ConditionalBranch,
    /// Branches to any of a set of operand-named targets (switch).
    MultiBranch,
    /// Leaves the function: no successors within this function's CFG.
    Terminal,
}

impl Opcode {
    /// Flow classification used by the CFG builder (spec.md §4.6).
    #[must_use]
    pub fn flow_info(self) -> FlowInfo {
        match self {
            Self::FlowJump => FlowInfo::UnconditionalJump,
            Self::FlowIfElse => FlowInfo::ConditionalBranch,
            Self::FlowSwitch => FlowInfo::MultiBranch,
            Self::FlowReturnVoid | Self::FlowReturnValue | Self::FlowThrow => FlowInfo::Terminal,
            _ => FlowInfo::Linear,
        }
    }

    /// True for the exception-handler bracket instructions that inject
    /// extra CFG successors onto every statement within their span
    /// (spec.md §4.6 "`__BeginHandler`/`__EndHandler` successor injection").
    #[must_use]
    pub fn is_handler_bracket(self) -> bool {
        matches!(self, Self::FlowBeginHandler | Self::FlowEndHandler)
    }
}

/// A single registered instruction signature: a mnemonic name plus fixed
/// operand/target shape (spec.md §4.3 "instructions are matched on name
/// and operand arity/coercibility, exactly like operators").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InstructionDef {
    pub name: &'static str,
    pub opcode: Opcode,
    pub target: Option<OperandSpec>,
    pub operands: SmallVec<[OperandSpec; 3]>,
    pub doc: &'static str,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct InstructionRegistry {
    defs: Vec<InstructionDef>,
}

impl InstructionRegistry {
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut reg = Self::default();
        reg.register_builtins();
        reg
    }

    pub fn register(
        &mut self,
        name: &'static str,
        opcode: Opcode,
        target: Option<OperandSpec>,
        operands: &[OperandSpec],
        doc: &'static str,
    ) {
        self.defs.push(InstructionDef {
            name,
            opcode,
            target,
            operands: operands.iter().copied().collect(),
            doc,
        });
    }

    fn register_builtins(&mut self) {
        use OperandSpec::{Any, Shape};
        use TypeShape as S;

        self.register("int.add", Opcode::IntAdd, Some(Shape(S::Integer)), &[Shape(S::Integer), Shape(S::Integer)], "integer add");
        self.register("int.sub", Opcode::IntSub, Some(Shape(S::Integer)), &[Shape(S::Integer), Shape(S::Integer)], "integer sub");
        self.register("int.mul", Opcode::IntMul, Some(Shape(S::Integer)), &[Shape(S::Integer), Shape(S::Integer)], "integer mul");
        self.register("equal", Opcode::Equal, Some(Shape(S::Bool)), &[Any, Any], "equality test");
        self.register("assign", Opcode::Assign, Some(Any), &[Any], "assignment");
        self.register("new", Opcode::New, Some(Any), &[Any], "heap allocation");
        self.register("call", Opcode::CallFunction, Some(Any), &[Shape(S::Function), Any], "function call");
        self.register("hook.run", Opcode::CallHook, None, &[Any], "hook invocation");
        self.register("struct.get", Opcode::StructGet, Some(Any), &[Shape(S::Struct), Any], "struct field read");
        self.register("struct.set", Opcode::StructSet, None, &[Shape(S::Struct), Any, Any], "struct field write");
        self.register("list.push_back", Opcode::ListPushBack, None, &[Shape(S::List), Any], "list append");
        self.register("vector.index", Opcode::VectorGet, Some(Any), &[Shape(S::Vector), Shape(S::Integer)], "vector index");
        self.register("map.index", Opcode::MapGet, Some(Any), &[Shape(S::Map), Any], "map lookup");
        self.register("map.insert", Opcode::MapSet, None, &[Shape(S::Map), Any, Any], "map insert");
        self.register("bytes.length", Opcode::BytesLength, Some(Shape(S::Integer)), &[Shape(S::Bytes)], "bytes length");
        self.register("begin", Opcode::BegIter, Some(Any), &[Any], "sequence begin iterator");
        self.register("end", Opcode::EndIter, Some(Any), &[Any], "sequence end iterator");
        self.register("unpack", Opcode::Unpack, Some(Any), &[Shape(S::Bytes), Any], "binary unpacking");
        self.register("sink.write", Opcode::SinkWrite, None, &[Shape(S::Sink), Shape(S::Bytes)], "sink write");
        self.register("sink.connect", Opcode::SinkConnect, None, &[Shape(S::Sink), Shape(S::Unit)], "sink connect");
        self.register("flow.return.void", Opcode::FlowReturnVoid, None, &[], "void return");
        self.register("flow.return.value", Opcode::FlowReturnValue, None, &[Any], "value return");
        self.register("flow.jump", Opcode::FlowJump, None, &[], "unconditional jump");
        self.register("flow.ifelse", Opcode::FlowIfElse, None, &[Shape(S::Bool)], "conditional branch");
        self.register("thread.get_context", Opcode::ThreadGetContext, Some(Any), &[], "read the current execution context");
        self.register("thread.set_context", Opcode::ThreadSetContext, None, &[Any], "write the current execution context");
        self.register("thread.schedule", Opcode::ThreadSchedule, None, &[Shape(S::Function), Any], "schedule a call into another scope");
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Vec<&InstructionDef> {
        self.defs.iter().filter(|d| d.name == name).collect()
    }

    fn operands_match(def: &InstructionDef, target: Option<&crate::ast::ty::Type>, operand_types: &[&crate::ast::ty::Type]) -> bool {
        if def.operands.len() != operand_types.len() {
            return false;
        }
        let target_ok = match (&def.target, target) {
            (None, None) => true,
            (Some(spec), Some(ty)) => spec.matches(ty, true),
            _ => false,
        };
        target_ok
            && def
                .operands
                .iter()
                .zip(operand_types.iter())
                .all(|(spec, ty)| spec.matches(ty, true))
    }

    /// Resolves an `Unresolved` instruction to exactly one candidate,
    /// matching on name plus operand arity/coercibility (spec.md §4.3).
    ///
    /// When `name` names no known instruction at all but exactly matches
    /// `assign`-shaped usage (a bare `target = value`), the resolver
    /// rewrites it to the `Assign` opcode regardless of arity — preserving
    /// the historical fallback behavior recorded as an open question in
    /// spec.md §9(b): kept rather than tightened, since narrowing it would
    /// reject currently-valid single-operand assignment shorthand.
    pub fn resolve(
        &self,
        name_str: &str,
        target: Option<&crate::ast::ty::Type>,
        operand_types: &[&crate::ast::ty::Type],
        location: SourceRange,
    ) -> Result<Opcode, Diagnostic> {
        let candidates = self.by_name(name_str);
        let matches: Vec<_> = candidates
            .iter()
            .filter(|d| Self::operands_match(d, target, operand_types))
            .collect();
        match matches.len() {
            1 => Ok(matches[0].opcode),
            0 if name_str == "assign" && operand_types.len() == 1 => Ok(Opcode::Assign),
            0 => Err(Diagnostic::new(
                DiagnosticKind::UnknownInstruction,
                location,
                format!("unknown instruction `{name_str}`"),
            )),
            _ => Err(Diagnostic::new(
                DiagnosticKind::AmbiguousInstruction,
                location,
                format!(
                    "use of overloaded instruction `{name_str}` is ambiguous\ncandidates:\n{}",
                    matches.iter().map(|d| format!("  - {} :: {}", d.name, d.doc)).collect::<Vec<_>>().join("\n")
                ),
            )),
        }
    }
}

/// Up-to-three operand helper shared with the block-flatten pass when it
/// synthesizes a `Resolved` instruction directly (skipping the by-name
/// lookup because the opcode is already statically known, e.g. the
/// `flow.jump` the pass emits for every lowered `if`/`foreach`).
#[must_use]
pub fn fixed_operands(ops: &[crate::ast::expr::ExprId]) -> InstructionOperands {
    ops.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_jump_has_no_fallthrough() {
        assert_eq!(Opcode::FlowJump.flow_info(), FlowInfo::UnconditionalJump);
        assert_eq!(Opcode::IntAdd.flow_info(), FlowInfo::Linear);
    }

    #[test]
    fn return_is_terminal() {
        assert_eq!(Opcode::FlowReturnValue.flow_info(), FlowInfo::Terminal);
    }
}
