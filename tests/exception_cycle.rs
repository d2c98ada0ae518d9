//! Two exception types whose `base` chains point at each other must be
//! reported as cyclic rather than looping the validator forever.

use hilta::ast::arena::Arena;
use hilta::ast::module::Module;
use hilta::ast::stmt::{Stmt, StmtNode};
use hilta::ast::ty::{Type, TypeNode};
use hilta::diagnostics::{DiagnosticKind, DiagnosticSink};
use hilta::location::SourceRange;
use hilta::scope::Scopes;
use hilta::validate::{clear_exception_cycles, Validator};
use hilta::{CompilerContext, CompilerOptions};

#[test]
fn mutually_referencing_bases_are_reported_as_a_cycle() {
    let mut ctx = CompilerContext::new(CompilerOptions::default());
    let name = ctx.interner_mut().intern("Errors");

    let mut scratch: Arena<StmtNode> = Arena::new();
    let placeholder = scratch.push(StmtNode { kind: Stmt::NoOp, location: SourceRange::synthetic(), comments: Vec::new(), chain_next: None });
    let mut module = Module::new(name, name, placeholder, Scopes::new());

    // Reserve both slots first, patch `base` in afterward, since each one's
    // `base` needs the other's `TypeId` to already exist.
    let a = module.types.push(TypeNode { kind: Type::Exception { base: None, arg: None }, location: SourceRange::synthetic(), doc: None });
    let b = module.types.push(TypeNode { kind: Type::Exception { base: Some(a), arg: None }, location: SourceRange::synthetic(), doc: None });
    module.types.get_mut(a).kind = Type::Exception { base: Some(b), arg: None };

    let module_id = ctx.add_module(module);
    let mut sink = DiagnosticSink::new();
    Validator::new(&ctx, module_id).run(&mut sink);

    assert!(sink.iter().any(|d| d.kind == DiagnosticKind::ExceptionCycle));

    // Reporting the cycle must not be the end of it: both participating
    // types need their `base` cleared before anything downstream (e.g. a
    // dump or a later pass walking the chain) can run over this module
    // without looping forever.
    clear_exception_cycles(ctx.module_mut(module_id));
    let module = ctx.module(module_id);
    assert!(matches!(module.ty(a).kind, Type::Exception { base: None, .. }), "a's base was not cleared");
    assert!(matches!(module.ty(b).kind, Type::Exception { base: None, .. }), "b's base was not cleared");
}

#[test]
fn a_linear_base_chain_is_not_flagged() {
    let mut ctx = CompilerContext::new(CompilerOptions::default());
    let name = ctx.interner_mut().intern("Errors");

    let mut scratch: Arena<StmtNode> = Arena::new();
    let placeholder = scratch.push(StmtNode { kind: Stmt::NoOp, location: SourceRange::synthetic(), comments: Vec::new(), chain_next: None });
    let mut module = Module::new(name, name, placeholder, Scopes::new());

    let root = module.types.push(TypeNode { kind: Type::Exception { base: None, arg: None }, location: SourceRange::synthetic(), doc: None });
    let leaf = module.types.push(TypeNode { kind: Type::Exception { base: Some(root), arg: None }, location: SourceRange::synthetic(), doc: None });

    let module_id = ctx.add_module(module);
    let mut sink = DiagnosticSink::new();
    Validator::new(&ctx, module_id).run(&mut sink);

    assert!(!sink.iter().any(|d| d.kind == DiagnosticKind::ExceptionCycle));

    clear_exception_cycles(ctx.module_mut(module_id));
    let module = ctx.module(module_id);
    assert!(matches!(module.ty(leaf).kind, Type::Exception { base: Some(b), .. } if b == root), "non-cyclic base chain must be left untouched");
}
