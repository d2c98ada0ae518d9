//! The typed IR module builder (spec.md §4.4).
//!
//! Front ends that feed this crate (the concrete parser/lexer is out of
//! scope, spec.md Non-goals) construct a [`crate::ast::module::Module`]
//! incrementally through a [`ModuleBuilder`] rather than building the AST
//! by hand: `add_global`/`add_local`/`declare_function` install
//! declarations, `push_function`/`push_builder` track the current
//! function and block being appended to, and `add_instruction`/`add_if`
//! emit statements into whichever block is on top of the builder stack.
//! Modeled on the teacher's `CodeBuilder` (`bytecode/builder.rs`): a
//! cursor-style object threading state through a sequence of `emit_*`
//! calls rather than a tree built bottom-up by hand.

mod builder;

pub use builder::{BuildError, Disposition, ModuleBuilder};
