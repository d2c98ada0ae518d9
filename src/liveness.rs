//! Liveness analysis (spec.md §4.7).
//!
//! Per-statement live-in/live-out/dead-out sets over local variable
//! declarations, computed as the standard backward dataflow fixed point:
//! `live_in[n] = use[n] ∪ (live_out[n] - def[n])`, `live_out[n] = ∪ live_in[s]`
//! over successors `s`. Rather than reprocess a raw worklist until nothing
//! changes (the direct reading of spec.md §4.7), the solver iterates the
//! CFG's reverse-post-order — a function body's CFG is overwhelmingly
//! acyclic except for the rare `foreach`/loop back-edge, so RPO converges
//! in one or two passes instead of however many the worklist happens to
//! dequeue in (SPEC_FULL.md §9 redesign note).

use ahash::AHashMap;

use crate::{
    ast::{
        decl::DeclId,
        expr::{Expr, ExprId},
        module::Module,
        stmt::{Instruction, Stmt, StmtId},
    },
    cfg::Cfg,
};

type DeclSet = ahash::AHashSet<DeclId>;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct StmtLiveness {
    live_in: DeclSet,
    live_out: DeclSet,
}

/// Per-statement liveness results for one function body (spec.md §4.7).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Liveness {
    sets: AHashMap<StmtId, StmtLiveness>,
}

impl Liveness {
    #[must_use]
    pub fn live_in(&self, id: StmtId) -> DeclSet {
        self.sets.get(&id).map(|s| s.live_in.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn live_out(&self, id: StmtId) -> DeclSet {
        self.sets.get(&id).map(|s| s.live_out.clone()).unwrap_or_default()
    }

    /// Declarations defined at `id` whose value is never subsequently read
    /// — dead stores (spec.md §4.7 "deadOut").
    #[must_use]
    pub fn dead_out(&self, module: &Module, id: StmtId) -> DeclSet {
        let (def, _use_set) = transfer_sets(module, id);
        let live_out = self.live_out(id);
        def.difference(&live_out).copied().collect()
    }

    /// Runs the fixed-point solver over `cfg` (spec.md §4.7).
    #[must_use]
    pub fn compute(module: &Module, cfg: &Cfg) -> Self {
        let mut result = Self::default();
        for &id in &cfg.reverse_post_order {
            result.sets.insert(id, StmtLiveness::default());
        }

        let mut changed = true;
        while changed {
            changed = false;
            // Reverse-post-order front-to-back on a backward problem means
            // walking from the last statement to the first, so visit in
            // reverse of the stored (already-reversed) order.
            for &id in cfg.reverse_post_order.iter().rev() {
                let (def, use_set) = transfer_sets(module, id);

                let mut new_out = DeclSet::default();
                for &succ in cfg.successors(id) {
                    new_out.extend(result.sets.get(&succ).map(|s| s.live_in.clone()).unwrap_or_default());
                }

                let mut new_in = use_set;
                new_in.extend(new_out.difference(&def).copied());

                let entry = result.sets.entry(id).or_default();
                if entry.live_in != new_in || entry.live_out != new_out {
                    entry.live_in = new_in;
                    entry.live_out = new_out;
                    changed = true;
                }
            }
        }
        result
    }
}

/// `def`/`use` sets for one statement: `def` is the variable a target
/// expression writes, `use` is every `Variable`/`Parameter` read among the
/// operands (spec.md §4.7 transfer function).
fn transfer_sets(module: &Module, id: StmtId) -> (DeclSet, DeclSet) {
    let mut def = DeclSet::default();
    let mut use_set = DeclSet::default();

    let node = module.stmt(id);
    match &node.kind {
        Stmt::Instruction(Instruction::Resolved { target, operands, .. }) => {
            if let Some(target) = target {
                collect_defs(module, *target, &mut def);
            }
            for &op in operands {
                collect_uses(module, op, &mut use_set);
            }
        }
        Stmt::ExpressionStatement(expr) => collect_uses(module, *expr, &mut use_set),
        Stmt::Return(Some(expr)) => collect_uses(module, *expr, &mut use_set),
        Stmt::Print(exprs) => {
            for &e in exprs {
                collect_uses(module, e, &mut use_set);
            }
        }
        _ => {}
    }
    (def, use_set)
}

fn collect_defs(module: &Module, expr: ExprId, def: &mut DeclSet) {
    if let Expr::Variable(decl) = &module.expr(expr).kind {
        def.insert(*decl);
    }
}

fn collect_uses(module: &Module, expr: ExprId, use_set: &mut DeclSet) {
    let node = module.expr(expr);
    match &node.kind {
        Expr::Variable(decl) | Expr::Parameter(decl) => {
            use_set.insert(*decl);
        }
        Expr::Coerced { inner, .. } => collect_uses(module, *inner, use_set),
        Expr::Assign { src, .. } => collect_uses(module, *src, use_set),
        Expr::Conditional { cond, then_branch, else_branch } => {
            collect_uses(module, *cond, use_set);
            collect_uses(module, *then_branch, use_set);
            collect_uses(module, *else_branch, use_set);
        }
        Expr::ResolvedOperator { operands, .. } | Expr::UnresolvedOperator { operands, .. } => {
            for &op in operands {
                collect_uses(module, op, use_set);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{
            arena::Arena,
            decl::{Declaration, DeclKind, Linkage},
            expr::ExprNode,
            module::Module,
            stmt::{Instruction, InstructionOperands, StmtNode},
            ty::{Type, TypeNode},
        },
        id::Id,
        instruction::Opcode,
        intern::Interner,
        location::SourceRange,
        scope::Scopes,
    };

    #[test]
    fn dead_store_is_detected_when_never_read_again() {
        let mut interner = Interner::new();
        let name = interner.intern("Main");
        let scopes = Scopes::new();

        let mut scratch: Arena<StmtNode> = Arena::new();
        let placeholder = scratch.push(StmtNode {
            kind: Stmt::NoOp,
            location: SourceRange::synthetic(),
            comments: Vec::new(),
            chain_next: None,
        });
        let mut module = Module::new(name, name, placeholder, scopes);

        let int_ty = module.types.push(TypeNode {
            kind: Type::Integer { width: 32, signed: true },
            location: SourceRange::synthetic(),
            doc: None,
        });
        let x = module.decls.push(Declaration {
            id: Id::unqualified(interner.intern("x"), SourceRange::synthetic()),
            linkage: Linkage::Local,
            kind: DeclKind::Variable { ty: int_ty, init: None },
            location: SourceRange::synthetic(),
            comments: Vec::new(),
        });
        let x_expr = module.exprs.push(ExprNode {
            kind: Expr::Variable(x),
            ty: int_ty,
            location: SourceRange::synthetic(),
            comments: Vec::new(),
        });

        let assign = module.stmts.push(StmtNode {
            kind: Stmt::Instruction(Instruction::Resolved {
                opcode: Opcode::Assign,
                target: Some(x_expr),
                operands: InstructionOperands::new(),
            }),
            location: SourceRange::synthetic(),
            comments: Vec::new(),
            chain_next: None,
        });

        let cfg = Cfg::build(&module, assign);
        let liveness = Liveness::compute(&module, &cfg);
        assert!(liveness.dead_out(&module, assign).contains(&x));
    }
}
