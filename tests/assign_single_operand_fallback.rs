//! Regression test for the `assign` single-operand fallback preserved in
//! `InstructionRegistry::resolve` (spec.md §9 open question (b)): a bare
//! `target = value` with no explicit target operand still resolves to
//! `Opcode::Assign` even though it matches no registered signature by
//! name+arity+target alone.

use hilta::ast::ty::Type;
use hilta::diagnostics::DiagnosticKind;
use hilta::instruction::InstructionRegistry;
use hilta::location::SourceRange;
use hilta::Opcode;

#[test]
fn assign_with_one_operand_and_no_target_still_resolves() {
    let reg = InstructionRegistry::with_builtins();
    let i32_ty = Type::Integer { width: 32, signed: true };
    let opcode = reg
        .resolve("assign", None, &[&i32_ty], SourceRange::synthetic())
        .expect("single-operand `assign` with no target must hit the fallback arm");
    assert_eq!(opcode, Opcode::Assign);
}

#[test]
fn assign_with_explicit_target_resolves_via_the_normal_registered_signature() {
    let reg = InstructionRegistry::with_builtins();
    let i32_ty = Type::Integer { width: 32, signed: true };
    let opcode = reg
        .resolve("assign", Some(&i32_ty), &[&i32_ty], SourceRange::synthetic())
        .expect("`assign` with a target and one operand matches the registered signature directly");
    assert_eq!(opcode, Opcode::Assign);
}

#[test]
fn the_fallback_is_named_to_assign_specifically() {
    let reg = InstructionRegistry::with_builtins();
    let i32_ty = Type::Integer { width: 32, signed: true };
    let err = reg
        .resolve("not_a_real_instruction", None, &[&i32_ty], SourceRange::synthetic())
        .expect_err("an unregistered name with no target must not silently become Assign");
    assert_eq!(err.kind, DiagnosticKind::UnknownInstruction);
}
