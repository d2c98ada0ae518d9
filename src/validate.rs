//! Validation (spec.md §4.5): rule families checked once the AST is fully
//! resolved and before codegen would ever see it. Each `check_*` method
//! corresponds to one rule family named in spec.md §4.5; all of them run
//! unconditionally and report into a shared [`DiagnosticSink`] rather than
//! stopping at the first violation, matching the rest of the pass
//! pipeline (spec.md §4.8).

use ahash::AHashMap;

use crate::{
    ast::{
        constant::Constant,
        decl::DeclKind,
        expr::Expr,
        module::Module,
        stmt::{Block, Instruction, Stmt, StmtId},
        ty::{CallingConvention, OverlayStart, TraitSet, Type, TypeId},
    },
    context::{CompilerContext, ModuleId},
    diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink},
    instruction::Opcode,
    intern::StringId,
    operator::{shape_of, Coercer},
};

pub struct Validator<'a> {
    ctx: &'a CompilerContext,
    module_id: ModuleId,
}

impl<'a> Validator<'a> {
    #[must_use]
    pub fn new(ctx: &'a CompilerContext, module_id: ModuleId) -> Self {
        Self { ctx, module_id }
    }

    fn module(&self) -> &Module {
        self.ctx.module(self.module_id)
    }

    pub fn run(&self, sink: &mut DiagnosticSink) {
        self.check_module(sink);
        self.check_declarations(sink);
        self.check_function_hook_types(sink);
        self.check_variable_types(sink);
        self.check_return_statements(sink);
        self.check_thread_scope(sink);
        self.check_hook_redefinitions(sink);
        self.check_overlay_fields(sink);
        self.check_struct_defaults(sink);
        self.check_container_traits(sink);
        self.check_integer_widths(sink);
        self.check_integer_constants(sink);
        self.check_unreachable_code(sink);
        self.check_instructions(sink);
        self.check_exception_hierarchy(sink);
    }

    /// Module rule: `Main` must export a `run` hook/function
    /// (spec.md §4.5 Module).
    fn check_module(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        if !module.is_main(self.ctx.interner()) {
            return;
        }
        let has_run = module.decls.iter().any(|(_, decl)| {
            self.ctx.interner().resolve(decl.id.local_name()) == "run"
                && matches!(decl.kind, DeclKind::Function { .. } | DeclKind::Hook { .. })
        });
        if !has_run {
            sink.report(Diagnostic::internal(
                crate::location::SourceRange::synthetic(),
                "module `Main` has no `run` entry point",
            ));
        }
    }

    /// Hook rule (spec.md §4.5 Hooks): a hook's signature type must
    /// already be resolved by the time validation runs — an unresolved
    /// hook signature means the enclosing unit/type itself failed to
    /// resolve, which id-resolve should already have reported, but the
    /// validator re-checks it directly since hooks can be declared in a
    /// separate module from the unit they extend.
    fn check_declarations(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        for (_, decl) in module.decls.iter() {
            if let DeclKind::Hook { ty, .. } = &decl.kind {
                if module.ty(*ty).kind.is_unresolved() {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::HookSignatureMismatch,
                        decl.location,
                        "hook declared against an unresolved type",
                    ));
                }
            }
        }
    }

    /// Function/Hook rule (spec.md §4.5 "Function/Hook types"): result
    /// type is Void or a ValueType (Any allowed only for non-HILTI calling
    /// conventions); each parameter is a ValueType, TypeType, or
    /// OptionalArgument of either; a HILTI-CC signature may not take a
    /// bare tuple parameter.
    fn check_function_hook_types(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        for (_, decl) in module.decls.iter() {
            let ty_id = match &decl.kind {
                DeclKind::Function { ty, .. } | DeclKind::Hook { ty, .. } => *ty,
                _ => continue,
            };
            let Type::Function(ret, params, cc) = &module.ty(ty_id).kind else { continue };

            let ret_kind = &module.ty(*ret).kind;
            let ret_ok = matches!(ret_kind, Type::Void)
                || ret_kind.is_value_type()
                || (matches!(ret_kind, Type::Any) && *cc != CallingConvention::Hilti);
            if !ret_ok {
                sink.report(Diagnostic::new(
                    DiagnosticKind::TypeMismatch,
                    decl.location,
                    "function/hook result type must be void or a value type",
                ));
            }

            for param in params {
                let declared = &module.ty(param.ty).kind;
                let unwrapped = match declared {
                    Type::OptionalArgument(inner) => &module.ty(*inner).kind,
                    other => other,
                };
                let param_ok = unwrapped.is_value_type() || matches!(unwrapped, Type::TypeType(_));
                if !param_ok {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::TypeMismatch,
                        param.location,
                        "function/hook parameter must be a value type, a type, or optional thereof",
                    ));
                }
                if *cc == CallingConvention::Hilti && matches!(unwrapped, Type::Tuple(_)) {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::TypeMismatch,
                        param.location,
                        "a HILTI calling-convention function/hook may not take a tuple parameter",
                    ));
                }
            }
        }
    }

    /// Variable rule (spec.md §4.5 Variable): a declared variable's type
    /// must already be resolved and must be a ValueType — heap types and
    /// wildcards are only valid behind a `Reference`/`Unknown` the
    /// resolver should have already rewritten.
    fn check_variable_types(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        for (_, decl) in module.decls.iter() {
            if let DeclKind::Variable { ty, .. } = &decl.kind {
                let kind = &module.ty(*ty).kind;
                if kind.is_unresolved() || !kind.is_value_type() {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::TypeMismatch,
                        decl.location,
                        "variable declaration must name a resolved value type",
                    ));
                }
            }
        }
    }

    /// Return-statement rule (spec.md §4.5 "Return statement"): a hook may
    /// not return a value; a function's `return value` must coerce to its
    /// declared result type; a bare `return` is forbidden when the result
    /// is non-void. Also flags a `return` reached outside any function or
    /// hook body — module-level code has nothing to return from.
    fn check_return_statements(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        for (_, decl) in module.decls.iter() {
            let (ty_id, body, is_hook) = match &decl.kind {
                DeclKind::Function { ty, body: Some(body) } => (*ty, *body, false),
                DeclKind::Hook { ty, body, .. } => (*ty, *body, true),
                _ => continue,
            };
            let Type::Function(ret, _, _) = &module.ty(ty_id).kind else { continue };
            let ret_is_void = matches!(module.ty(*ret).kind, Type::Void);
            let ret_ty = *ret;

            for_each_statement(module, body, &mut |module, stmt_id| {
                let Stmt::Return(expr) = &module.stmt(stmt_id).kind else { return };
                let location = module.stmt(stmt_id).location;
                match expr {
                    Some(expr_id) => {
                        if is_hook {
                            sink.report(Diagnostic::new(
                                DiagnosticKind::InvalidFlowTarget,
                                location,
                                "return with a value is forbidden inside a hook",
                            ));
                            return;
                        }
                        let expr_ty = module.expr(*expr_id).ty;
                        if !Coercer::can_coerce(&module.ty(expr_ty).kind, &module.ty(ret_ty).kind) {
                            sink.report(Diagnostic::new(
                                DiagnosticKind::TypeMismatch,
                                location,
                                "returned expression does not coerce to the declared result type",
                            ));
                        }
                    }
                    None if !ret_is_void && !is_hook => {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::MissingReturn,
                            location,
                            "function with a non-void result must return a value",
                        ));
                    }
                    None => {}
                }
            });
        }

        for_each_statement(module, module.body, &mut |module, stmt_id| {
            if matches!(module.stmt(stmt_id).kind, Stmt::Return(_)) {
                sink.report(Diagnostic::new(
                    DiagnosticKind::InvalidFlowTarget,
                    module.stmt(stmt_id).location,
                    "return statement outside any function or hook body",
                ));
            }
        });
    }

    /// Thread/Scope rule (spec.md §4.5 Thread/Scope): `thread.get_context`/
    /// `thread.set_context` require the module to declare an execution
    /// context; `thread.schedule`'s callee-context operand's fields must
    /// all be present, by name and shape, in the caller's own context.
    fn check_thread_scope(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        for (_, stmt_node) in module.stmts.iter() {
            let Stmt::Instruction(Instruction::Resolved { opcode, operands, .. }) = &stmt_node.kind else { continue };
            match opcode {
                Opcode::ThreadGetContext | Opcode::ThreadSetContext => {
                    if module.context.is_none() {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::ThreadScopeViolation,
                            stmt_node.location,
                            "thread.get_context/thread.set_context require the module to declare an execution context",
                        ));
                    }
                }
                Opcode::ThreadSchedule => {
                    let Some(caller_ctx) = module.context else {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::ThreadScopeViolation,
                            stmt_node.location,
                            "thread.schedule requires the module to declare an execution context",
                        ));
                        continue;
                    };
                    let Type::Struct(caller_fields) = &module.ty(caller_ctx).kind else { continue };
                    let Some(&callee_operand) = operands.get(1) else { continue };
                    let callee_ty = module.expr(callee_operand).ty;
                    let Type::Struct(callee_fields) = &module.ty(callee_ty).kind else { continue };
                    let incompatible = callee_fields.iter().any(|callee_field| {
                        !caller_fields.iter().any(|caller_field| {
                            caller_field.name == callee_field.name
                                && shape_of(&module.ty(caller_field.ty).kind) == shape_of(&module.ty(callee_field.ty).kind)
                        })
                    });
                    if incompatible {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::ThreadScopeViolation,
                            stmt_node.location,
                            "scope of callee function is incompatible with the current scope",
                        ));
                    }
                }
                _ => {}
            }
        }
    }

    /// Hook rule (spec.md §4.5 Hooks): every declaration sharing a name
    /// must agree on calling convention, result shape, and parameter
    /// shapes — only the priority and body may differ between overloads.
    fn check_hook_redefinitions(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        let mut by_name: AHashMap<StringId, TypeId> = AHashMap::default();
        for (_, decl) in module.decls.iter() {
            let DeclKind::Hook { ty, .. } = &decl.kind else { continue };
            match by_name.get(&decl.id.local_name()) {
                Some(&first) => {
                    if !hook_types_compatible(module, first, *ty) {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::HookSignatureMismatch,
                            decl.location,
                            "hook redefinition has a different hook type than an earlier declaration",
                        ));
                    }
                }
                None => {
                    by_name.insert(decl.id.local_name(), *ty);
                }
            }
        }
    }

    /// Overlay rule: `AfterField` must name an earlier-declared field in
    /// the same overlay (spec.md §4.5 Overlay fields).
    fn check_overlay_fields(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        for (_, ty_node) in module.types.iter() {
            let Type::Overlay(fields) = &ty_node.kind else { continue };
            for (i, field) in fields.iter().enumerate() {
                if let OverlayStart::AfterField(name) = &field.start {
                    let predecessor_declared_earlier = fields[..i].iter().any(|f| f.name == *name);
                    if !predecessor_declared_earlier {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::InvalidOverlayField,
                            field.location,
                            "overlay field start refers to a field not yet declared",
                        ));
                    }
                }
            }
        }
    }

    /// Struct rule: a field's compile-time default must coerce to the
    /// field's declared type (spec.md §4.5 Struct).
    fn check_struct_defaults(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        for (_, ty_node) in module.types.iter() {
            let Type::Struct(fields) = &ty_node.kind else { continue };
            for field in fields {
                let Some(default) = field.default else { continue };
                let default_ty = module.expr(default).ty;
                let field_ty = &module.ty(field.ty).kind;
                let default_ty_kind = &module.ty(default_ty).kind;
                if !Coercer::can_coerce(default_ty_kind, field_ty) {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::InvalidStructField,
                        field.location,
                        "field default does not coerce to the field's declared type",
                    ));
                }
            }
        }
    }

    /// Container/Iterator/Reference rule (spec.md §4.5, §3 invariants): an
    /// `Iterator` must wrap something Iterable, a `Reference` must wrap a
    /// heap type, and a `Map`/`Classifier` key type must be Hashable/
    /// Classifiable respectively.
    fn check_container_traits(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        for (_, ty_node) in module.types.iter() {
            match &ty_node.kind {
                Type::Iterator(inner) => {
                    if !module.ty(*inner).kind.has_trait(TraitSet::ITERABLE) {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::TypeMismatch,
                            ty_node.location,
                            "iterator type must wrap an iterable container",
                        ));
                    }
                }
                Type::Reference(inner) => {
                    if !module.ty(*inner).kind.is_heap_type() {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::TypeMismatch,
                            ty_node.location,
                            "reference type must wrap a heap type",
                        ));
                    }
                }
                Type::Map(key, _) => {
                    if !module.ty(*key).kind.has_trait(TraitSet::HASHABLE) {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::TypeMismatch,
                            ty_node.location,
                            "map key type must be hashable",
                        ));
                    }
                }
                Type::Classifier(key, _) => {
                    if !module.ty(*key).kind.has_trait(TraitSet::CLASSIFIABLE) {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::TypeMismatch,
                            ty_node.location,
                            "classifier key type must be classifiable",
                        ));
                    }
                }
                _ => {}
            }
        }
    }

    /// Integer-width rule (spec.md §4.5 "Integer width"): only 8/16/32/64
    /// bit widths are valid.
    fn check_integer_widths(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        for (_, ty_node) in module.types.iter() {
            if let Type::Integer { width, .. } = &ty_node.kind {
                if !matches!(width, 8 | 16 | 32 | 64) {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::TypeMismatch,
                        ty_node.location,
                        format!("integer width {width} is not one of 8, 16, 32, 64"),
                    ));
                }
            }
        }
    }

    /// Flags a declared constant whose literal value doesn't fit the
    /// constant's own declared integer type (spec.md §4.2 constant
    /// folding relies on this already holding by the time codegen sees
    /// it).
    fn check_integer_constants(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        for (_, decl) in module.decls.iter() {
            let DeclKind::Constant { ty, value } = &decl.kind else { continue };
            let Type::Integer { width, signed } = &module.ty(*ty).kind else { continue };
            let Expr::Constant(Constant::Integer { value: literal, .. }) = &module.expr(*value).kind else { continue };
            if !Constant::fits_integer_width(*literal, *width, *signed) {
                sink.report(Diagnostic::new(
                    DiagnosticKind::IntegerOverflow,
                    decl.location,
                    format!("constant value {literal} does not fit in its declared type (width {width}, signed {signed})"),
                ));
            }
        }
    }

    /// Flags a statement following an unconditional `return`/`stop` in the
    /// same block — it can never execute.
    fn check_unreachable_code(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        for (_, stmt_node) in module.stmts.iter() {
            let Stmt::Block(Block { statements, .. }) = &stmt_node.kind else { continue };
            let Some(terminator_pos) = statements.iter().position(|&s| is_terminator(&module.stmt(s).kind)) else { continue };
            if let Some(&next) = statements.get(terminator_pos + 1) {
                sink.report(Diagnostic::new(
                    DiagnosticKind::UnreachableCode,
                    module.stmt(next).location,
                    "statement is unreachable after a return/stop",
                ));
            }
        }
    }

    /// Call rule (spec.md §4.5): an instruction the resolver could not
    /// uniquely match is surfaced here rather than silently dropped —
    /// `instruction-resolve` already reported it once, but validation is
    /// the pass a caller actually inspects for pass/fail, so it must show
    /// up in this sink too.
    fn check_instructions(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        for (_, stmt_node) in module.stmts.iter() {
            if let Stmt::Instruction(Instruction::Unresolvable { name }) = &stmt_node.kind {
                sink.report(Diagnostic::new(
                    DiagnosticKind::UnknownInstruction,
                    stmt_node.location,
                    format!("unresolved instruction `{}`", name.render(self.ctx.interner())),
                ));
            }
        }
    }

    /// Exception rule: the `base` chain of every `Exception` type must be
    /// acyclic (spec.md §4.5 Exception, §9 open question (c) duplicate
    /// `_equal` note doesn't apply here — this is the separate cycle
    /// check named directly in the rule family list). This only detects
    /// and reports; breaking the cycle in place is
    /// [`clear_exception_cycles`]'s job, run by the pipeline right after
    /// validation (spec.md §8 scenario 3).
    fn check_exception_hierarchy(&self, sink: &mut DiagnosticSink) {
        let module = self.module();
        for (id, ty_node) in module.types.iter() {
            let Type::Exception { base: Some(base), .. } = &ty_node.kind else { continue };
            let mut cursor = *base;
            let mut seen = vec![id];
            loop {
                if seen.contains(&cursor) {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::ExceptionCycle,
                        ty_node.location,
                        "exception type's base chain is cyclic",
                    ));
                    break;
                }
                seen.push(cursor);
                match &module.ty(cursor).kind {
                    Type::Exception { base: Some(next), .. } => cursor = *next,
                    _ => break,
                }
            }
        }
    }
}

fn is_terminator(kind: &Stmt) -> bool {
    matches!(kind, Stmt::Return(_) | Stmt::Stop)
}

/// Walks every statement reachable from `stmt_id` (itself included),
/// descending into `Block`/`IfElse`/`ForEach`/`Try` bodies, calling `f` on
/// each. Mirrors `resolve.rs`'s own recursive structure over the same
/// statement shapes.
fn for_each_statement(module: &Module, stmt_id: StmtId, f: &mut impl FnMut(&Module, StmtId)) {
    f(module, stmt_id);
    match &module.stmt(stmt_id).kind {
        Stmt::Block(Block { statements, .. }) => {
            for &s in statements {
                for_each_statement(module, s, f);
            }
        }
        Stmt::IfElse(stmt) => {
            for_each_statement(module, stmt.then_branch, f);
            if let Some(else_branch) = stmt.else_branch {
                for_each_statement(module, else_branch, f);
            }
        }
        Stmt::ForEach(stmt) => for_each_statement(module, stmt.body, f),
        Stmt::Try(stmt) => {
            for_each_statement(module, stmt.body, f);
            for catch in &stmt.catches {
                for_each_statement(module, catch.body, f);
            }
        }
        _ => {}
    }
}

/// Whether two hook declarations' types agree closely enough to be valid
/// redefinitions of the same hook (spec.md §4.5 "Redefinitions must have
/// identical hook types"): same calling convention, same result shape, and
/// pairwise same parameter shape/optionality. Priority and body are
/// allowed to differ — that's the entire point of redefining a hook.
fn hook_types_compatible(module: &Module, a: TypeId, b: TypeId) -> bool {
    let (Type::Function(ret_a, params_a, cc_a), Type::Function(ret_b, params_b, cc_b)) = (&module.ty(a).kind, &module.ty(b).kind) else {
        return true;
    };
    if cc_a != cc_b || params_a.len() != params_b.len() {
        return false;
    }
    if shape_of(&module.ty(*ret_a).kind) != shape_of(&module.ty(*ret_b).kind) {
        return false;
    }
    params_a
        .iter()
        .zip(params_b.iter())
        .all(|(pa, pb)| pa.optional == pb.optional && shape_of(&module.ty(pa.ty).kind) == shape_of(&module.ty(pb.ty).kind))
}

/// Breaks every cyclic exception `base` chain in `module` in place, so a
/// fatal `ExceptionCycle` diagnostic still leaves the AST printable
/// (spec.md §7 "broken in place before abort", §8 scenario 3 "both A and B
/// have baseType cleared before dumping"). Idempotent: a no-op when no
/// cycle exists.
pub fn clear_exception_cycles(module: &mut Module) {
    let cyclic: Vec<TypeId> = module
        .types
        .iter()
        .flat_map(|(id, ty_node)| {
            let Type::Exception { base: Some(base), .. } = &ty_node.kind else { return Vec::new() };
            let mut cursor = *base;
            let mut seen = vec![id];
            loop {
                if seen.contains(&cursor) {
                    return seen;
                }
                seen.push(cursor);
                match &module.ty(cursor).kind {
                    Type::Exception { base: Some(next), .. } => cursor = *next,
                    _ => return Vec::new(),
                }
            }
        })
        .collect();

    for id in cyclic {
        if let Type::Exception { base, .. } = &mut module.types.get_mut(id).kind {
            *base = None;
        }
    }
}
