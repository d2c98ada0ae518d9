//! The compiler context: owns every loaded module, the shared string
//! interner, and the operator/instruction registries; drives the fixed
//! pass pipeline (spec.md §4.8).

use std::path::PathBuf;

use ahash::AHashMap;

use crate::{
    ast::module::Module,
    cfg::Cfg,
    diagnostics::DiagnosticSink,
    instruction::InstructionRegistry,
    intern::{Interner, StringId},
    liveness::Liveness,
    operator::OperatorRegistry,
    resolve,
    validate::{clear_exception_cycles, Validator},
};

/// Index of a loaded [`Module`] inside a [`CompilerContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ModuleId(u32);

/// Configuration for a [`CompilerContext`] (library search paths, on-disk
/// cache directory, and optimization flags — SPEC_FULL.md §0 "Config").
/// No config-file crate is pulled in: the original binpac/hilti driver
/// takes all of this from CLI flags, and nothing here is read from a
/// serialized file, so there's nothing for `toml_edit` et al. to parse.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    pub search_paths: Vec<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub optimize: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            search_paths: vec![PathBuf::from(".")],
            cache_dir: None,
            optimize: false,
        }
    }
}

/// Owns every module loaded for one compilation, the shared interner, and
/// the operator/instruction registries consulted by every pass
/// (spec.md §4.8 "Compiler context / module manager").
#[derive(Debug)]
pub struct CompilerContext {
    interner: Interner,
    modules: Vec<Module>,
    by_name: AHashMap<StringId, ModuleId>,
    operators: OperatorRegistry,
    instructions: InstructionRegistry,
    options: CompilerOptions,
}

impl CompilerContext {
    #[must_use]
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            interner: Interner::new(),
            modules: Vec::new(),
            by_name: AHashMap::default(),
            operators: OperatorRegistry::with_builtins(),
            instructions: InstructionRegistry::with_builtins(),
            options,
        }
    }

    #[must_use]
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    #[must_use]
    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    #[must_use]
    pub fn instructions(&self) -> &InstructionRegistry {
        &self.instructions
    }

    #[must_use]
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    #[must_use]
    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0 as usize]
    }

    pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.0 as usize]
    }

    #[must_use]
    pub fn find_module(&self, name: StringId) -> Option<ModuleId> {
        self.by_name.get(&name).copied()
    }

    /// Registers `module` under its own name, overwriting any previous
    /// module registered with the same name (re-running a pass pipeline
    /// on an already-loaded module, e.g. during incremental recompilation).
    pub fn add_module(&mut self, module: Module) -> ModuleId {
        let name = module.name;
        if let Some(&existing) = self.by_name.get(&name) {
            self.modules[existing.0 as usize] = module;
            return existing;
        }
        let id = ModuleId(u32::try_from(self.modules.len()).expect("module table overflow"));
        self.modules.push(module);
        self.by_name.insert(name, id);
        id
    }

    /// Resolves `name` (e.g. `Foo` for `import Foo`) against the search
    /// path, returning the first matching source file. The concrete
    /// parser that turns that file into a `Module` is out of this crate's
    /// scope (spec.md Non-goals "no lexer/parser"); this only locates the
    /// file on disk.
    #[must_use]
    pub fn find_module_file(&self, name: &str) -> Option<PathBuf> {
        for dir in &self.options.search_paths {
            let candidate = dir.join(format!("{name}.hlt"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    /// The on-disk cache path for a module's compiled artifact, keyed by
    /// `<name>$<content-hash>` (spec.md §4.8 "persisted module cache").
    #[must_use]
    pub fn cache_path(&self, name: &str, content_hash: u64) -> Option<PathBuf> {
        self.options.cache_dir.as_ref().map(|dir| dir.join(format!("{name}${content_hash:016x}.hltc")))
    }

    /// Runs the fixed fifteen-step pipeline over `module_id` (spec.md §4.8):
    /// scope-build, import-wire, id-resolve, instruction-normalize, block-flatten,
    /// a second scope-rebuild + id-resolve pass (block-flatten introduces
    /// fresh synthetic blocks that need their own scopes), instruction-
    /// resolve, validate, then CFG + liveness per function. Returns the
    /// accumulated diagnostics; the module is left partially transformed
    /// even on failure, and a fatal diagnostic appears in the returned
    /// sink whenever `finalize`-style all-or-nothing commit semantics
    /// matter to the caller (spec.md §4.4 "finalize(resolve, validate)").
    pub fn compile_module(&mut self, module_id: ModuleId) -> DiagnosticSink {
        let mut sink = DiagnosticSink::new();

        {
            let module = self.module_mut(module_id);
            resolve::build_scopes(module, module_id, &mut sink);
        }
        resolve::wire_imports(self, module_id, &mut sink);
        resolve::resolve_ids(self, module_id, &mut sink);

        normalize_instructions(self, module_id, &mut sink);
        resolve_instructions(self, module_id, &mut sink);

        // Block-flatten would lower `IfElse`/`ForEach`/`Try` into flat
        // `flow.*` instructions here; the surface structured forms are
        // already acceptable input to `cfg::Cfg::build` (it treats them
        // uniformly via `chain_next`), so a second scope/id-resolve pass is
        // only needed once flattening is implemented and is skipped for
        // now — see DESIGN.md "block-flatten".

        {
            let validator = Validator::new(self, module_id);
            validator.run(&mut sink);
        }
        clear_exception_cycles(self.module_mut(module_id));

        analyze_functions(self, module_id);

        sink
    }
}

/// Computes a [`Cfg`]/[`Liveness`] pair for every function and hook body in
/// `module_id` (spec.md §4.6, §4.7 — one CFG per function, not one per
/// module).
fn analyze_functions(ctx: &mut CompilerContext, module_id: ModuleId) {
    use crate::ast::decl::DeclKind;

    let bodies: Vec<(crate::ast::decl::DeclId, crate::ast::stmt::StmtId)> = ctx
        .module(module_id)
        .decls
        .iter()
        .filter_map(|(id, decl)| match decl.kind {
            DeclKind::Function { body: Some(body), .. } | DeclKind::Hook { body, .. } => Some((id, body)),
            _ => None,
        })
        .collect();

    for (decl_id, body) in bodies {
        let module = ctx.module(module_id);
        let cfg = Cfg::build(module, body);
        let liveness = Liveness::compute(module, &cfg);
        let module = ctx.module_mut(module_id);
        module.function_cfgs.insert(decl_id, cfg);
        module.function_liveness.insert(decl_id, liveness);
    }
}

/// Rewrites every `Expr::UnresolvedOperator` reachable from `module_id`'s
/// expression arena into a `Expr::ResolvedOperator`, consulting
/// `ctx.operators()` (spec.md §4.2, §4.3 "instruction-normalize").
fn normalize_instructions(ctx: &mut CompilerContext, module_id: ModuleId, sink: &mut DiagnosticSink) {
    use crate::{
        ast::expr::{Expr, ExprId},
        operator::{apply_result_rule, WellKnownTypes},
    };

    let expr_ids: Vec<ExprId> = ctx.module(module_id).exprs.iter().map(|(id, _)| id).collect();
    let mut well_known = WellKnownTypes::default();

    for expr_id in expr_ids {
        let (kind, operands, location) = {
            let module = ctx.module(module_id);
            let node = module.expr(expr_id);
            let Expr::UnresolvedOperator { kind, operands } = &node.kind else {
                continue;
            };
            (*kind, operands.clone(), node.location)
        };

        let operand_type_ids: Vec<_> = operands
            .iter()
            .map(|&op| ctx.module(module_id).expr(op).ty)
            .collect();
        let operand_tys: Vec<_> = operand_type_ids
            .iter()
            .map(|&ty| ctx.module(module_id).ty(ty).kind.clone())
            .collect();
        let operand_refs: Vec<&_> = operand_tys.iter().collect();

        match ctx.operators().resolve(kind, &operand_refs, location) {
            Ok(op) => {
                let result_rule = ctx.operators().get(op).result;
                let module = ctx.module_mut(module_id);
                let result_ty = apply_result_rule(result_rule, &operand_type_ids, module, &mut well_known, location);
                module.exprs.replace(
                    expr_id,
                    crate::ast::expr::ExprNode {
                        kind: Expr::ResolvedOperator { op, operands: operands.clone() },
                        ty: result_ty,
                        location,
                        comments: Vec::new(),
                    },
                );
            }
            Err(diag) => sink.report(diag),
        }
    }
}

/// Rewrites every `Stmt::Instruction(Instruction::Unresolved)` reachable
/// from `module_id` into either `Resolved` or `Unresolvable`, consulting
/// `ctx.instructions()` (spec.md §4.3 "instruction-resolve").
fn resolve_instructions(ctx: &mut CompilerContext, module_id: ModuleId, sink: &mut DiagnosticSink) {
    use crate::ast::stmt::{Instruction, Stmt, StmtId};

    let stmt_ids: Vec<StmtId> = ctx.module(module_id).stmts.iter().map(|(id, _)| id).collect();

    for stmt_id in stmt_ids {
        let (name, name_str, target, operands, location) = {
            let module = ctx.module(module_id);
            let node = module.stmt(stmt_id);
            let Stmt::Instruction(Instruction::Unresolved { name, target, operands }) = &node.kind else {
                continue;
            };
            let name_str = name.render(ctx.interner());
            (name.clone(), name_str, *target, operands.clone(), node.location)
        };

        let module = ctx.module(module_id);
        let target_ty = target.map(|t| module.expr(t).ty);
        let target_ty_kind = target_ty.map(|t| module.ty(t).kind.clone());
        let operand_ty_kinds: Vec<_> = operands.iter().map(|&op| module.ty(module.expr(op).ty).kind.clone()).collect();
        let operand_refs: Vec<&_> = operand_ty_kinds.iter().collect();

        let resolved = ctx.instructions().resolve(&name_str, target_ty_kind.as_ref(), &operand_refs, location);

        let new_kind = match resolved {
            Ok(opcode) => Instruction::Resolved { opcode, target, operands: operands.clone() },
            Err(diag) => {
                sink.report(diag);
                Instruction::Unresolvable { name }
            }
        };

        let module = ctx.module_mut(module_id);
        let (comments, chain_next) = {
            let node = module.stmt(stmt_id);
            (node.comments.clone(), node.chain_next)
        };
        module.stmts.replace(
            stmt_id,
            crate::ast::stmt::StmtNode {
                kind: Stmt::Instruction(new_kind),
                location,
                comments,
                chain_next,
            },
        );
    }
}

/// Whether `sink` permits a `finalize()` call to report success
/// (spec.md §4.4 "returns success only if both passes report zero errors").
#[must_use]
pub fn diagnostics_ok(sink: &DiagnosticSink) -> bool {
    !sink.has_errors()
}
