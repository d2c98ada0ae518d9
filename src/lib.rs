//! Front-end and mid-end compiler core for a protocol-parsing language:
//! typed AST, scope/id resolution, operator and instruction overload
//! resolution, a typed IR builder, validation, and per-function CFG and
//! liveness analysis. No lexer/parser, no code generator, no linker/JIT —
//! callers build a [`ast::module::Module`] (by hand or through
//! [`ir::ModuleBuilder`]) and hand it to [`context::CompilerContext`].

pub mod ast;
pub mod cfg;
pub mod context;
pub mod diagnostics;
pub mod id;
pub mod instruction;
pub mod intern;
pub mod ir;
pub mod liveness;
pub mod location;
pub mod operator;
pub mod resolve;
pub mod scope;
pub mod validate;

pub use crate::{
    ast::module::Module,
    cfg::Cfg,
    context::{CompilerContext, CompilerOptions, ModuleId},
    diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink},
    instruction::{InstructionRegistry, Opcode},
    intern::{Interner, StringId},
    ir::{BuildError, Disposition, ModuleBuilder},
    liveness::Liveness,
    operator::{Coercer, OperatorRegistry},
    scope::{Scope, ScopeId, Scopes},
    validate::Validator,
};
