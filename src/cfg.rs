//! Control-flow graph construction (spec.md §4.6).
//!
//! Built once per function body. Once block-flatten lowers structured
//! statements (`IfElse`/`ForEach`/`Try`) into the flat `Instruction` family,
//! successor/predecessor sets come from each instruction's
//! `Opcode::flow_info`; until then, those structured forms are walked
//! directly (branch into `then`/`else`, loop body, try body and catches) so
//! the CFG stays correct either way. `Block` statements are transparent —
//! their first non-block statement stands in as the effective node.

use ahash::AHashMap;

use crate::{
    ast::{
        module::Module,
        stmt::{Stmt, StmtId},
    },
    instruction::FlowInfo,
};

/// The control-flow graph for one function body: successor/predecessor
/// sets keyed by the *effective* (block-transparent) statement id, plus
/// the depth-first traversal order the liveness solver iterates in.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Cfg {
    pub entry: Option<StmtId>,
    successors: AHashMap<StmtId, Vec<StmtId>>,
    predecessors: AHashMap<StmtId, Vec<StmtId>>,
    /// Depth-first post-order, reversed to reverse-post-order at the end of
    /// `build` — the iteration order the liveness fixed-point solver uses
    /// (SPEC_FULL.md §9 redesign note: reverse-post-order over raw
    /// worklist reprocessing, converges in fewer passes for the acyclic-
    /// dominated shapes a parser grammar's CFG usually produces).
    pub reverse_post_order: Vec<StmtId>,
}

impl Cfg {
    #[must_use]
    pub fn successors(&self, id: StmtId) -> &[StmtId] {
        self.successors.get(&id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn predecessors(&self, id: StmtId) -> &[StmtId] {
        self.predecessors.get(&id).map_or(&[], Vec::as_slice)
    }

    fn add_edge(&mut self, from: StmtId, to: StmtId) {
        self.successors.entry(from).or_default().push(to);
        self.predecessors.entry(to).or_default().push(from);
    }

    /// Builds the CFG for the block rooted at `root` (spec.md §4.6).
    ///
    /// `handler_stack` tracks the exception handlers active at each point
    /// in traversal order; entering a `Try`'s body (already lowered to a
    /// `FlowBeginHandler`/`FlowEndHandler` bracket pair by block-flatten)
    /// pushes a frame so every statement inside the bracket additionally
    /// gets an edge to the handler's first catch statement
    /// (spec.md §4.6 "`__BeginHandler`/`__EndHandler` successor injection").
    #[must_use]
    pub fn build(module: &Module, root: StmtId) -> Self {
        let mut cfg = Self::default();
        let entry = effective_entry(module, root);
        cfg.entry = Some(entry);

        let mut handler_stack: Vec<StmtId> = Vec::new();
        let mut visited = AHashMap::default();
        let mut post_order = Vec::new();
        walk(module, entry, &mut handler_stack, &mut cfg, &mut visited, &mut post_order);

        cfg.reverse_post_order = post_order.into_iter().rev().collect();
        cfg
    }
}

/// Blocks are transparent: the effective node for a `Block` statement is
/// its first non-block child, recursively (spec.md §4.6).
fn effective_entry(module: &Module, id: StmtId) -> StmtId {
    let node = module.stmt(id);
    if let Stmt::Block(block) = &node.kind {
        if let Some(&first) = block.statements.first() {
            return effective_entry(module, first);
        }
    }
    id
}

fn walk(
    module: &Module,
    id: StmtId,
    handler_stack: &mut Vec<StmtId>,
    cfg: &mut Cfg,
    visited: &mut AHashMap<StmtId, ()>,
    post_order: &mut Vec<StmtId>,
) {
    if visited.contains_key(&id) {
        return;
    }
    visited.insert(id, ());

    let node = module.stmt(id);
    let mut targets: Vec<StmtId> = Vec::new();

    match &node.kind {
        Stmt::Block(block) => {
            if let Some(&first) = block.statements.first() {
                targets.push(effective_entry(module, first));
            }
        }
        Stmt::Instruction(instr) => {
            if let crate::ast::stmt::Instruction::Resolved { opcode, .. } = instr {
                if opcode.is_handler_bracket() {
                    if matches!(opcode, crate::instruction::Opcode::FlowBeginHandler) {
                        handler_stack.push(id);
                    } else {
                        handler_stack.pop();
                    }
                }
                match opcode.flow_info() {
                    FlowInfo::Linear | FlowInfo::UnconditionalJump | FlowInfo::ConditionalBranch | FlowInfo::MultiBranch => {
                        if let Some(next) = node.chain_next {
                            targets.push(effective_entry(module, next));
                        }
                    }
                    FlowInfo::Terminal => {}
                }
            }
        }
        // Pre-block-flatten structured forms (`IfElse`/`ForEach`/`Try`) carry
        // their own nested bodies rather than flat `flow.*` instructions;
        // walk into those bodies directly so the CFG is still a faithful
        // superset of what block-flatten would later make explicit.
        Stmt::IfElse(stmt) => {
            targets.push(effective_entry(module, stmt.then_branch));
            if let Some(else_branch) = stmt.else_branch {
                targets.push(effective_entry(module, else_branch));
            } else if let Some(next) = node.chain_next {
                targets.push(effective_entry(module, next));
            }
        }
        Stmt::ForEach(stmt) => {
            targets.push(effective_entry(module, stmt.body));
            if let Some(next) = node.chain_next {
                targets.push(effective_entry(module, next));
            }
        }
        Stmt::Try(stmt) => {
            targets.push(effective_entry(module, stmt.body));
            for catch in &stmt.catches {
                targets.push(effective_entry(module, catch.body));
            }
        }
        _ => {
            if let Some(next) = node.chain_next {
                targets.push(effective_entry(module, next));
            }
        }
    }

    if let Some(&handler) = handler_stack.last() {
        targets.push(handler);
    }

    for &target in &targets {
        cfg.add_edge(id, target);
    }
    for &target in &targets {
        walk(module, target, handler_stack, cfg, visited, post_order);
    }
    post_order.push(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{
            arena::Arena,
            module::Module,
            stmt::{Block, Stmt, StmtNode},
        },
        intern::Interner,
        location::SourceRange,
        scope::Scopes,
    };

    fn push_stmt(module: &mut Module, kind: Stmt) -> StmtId {
        module.stmts.push(StmtNode {
            kind,
            location: SourceRange::synthetic(),
            comments: Vec::new(),
            chain_next: None,
        })
    }

    #[test]
    fn linear_chain_has_no_back_edges() {
        let mut interner = Interner::new();
        let name = interner.intern("Main");
        let mut scopes = Scopes::new();
        let scope_id = scopes.push(crate::scope::Scope::with_parent(None));

        // A throwaway `Idx<StmtNode>` just to satisfy `Module::new`'s
        // constructor; `module.body` is overwritten below with the real
        // block id once it exists.
        let mut scratch: Arena<StmtNode> = Arena::new();
        let placeholder = scratch.push(StmtNode {
            kind: Stmt::NoOp,
            location: SourceRange::synthetic(),
            comments: Vec::new(),
            chain_next: None,
        });
        let mut module = Module::new(name, name, placeholder, scopes);

        let stop = push_stmt(&mut module, Stmt::Stop);
        let noop = push_stmt(&mut module, Stmt::NoOp);
        module.stmts.get_mut(noop).chain_next = Some(stop);
        let block = push_stmt(
            &mut module,
            Stmt::Block(Block { scope: scope_id, statements: vec![noop], declarations: Vec::new() }),
        );
        module.body = block;

        let cfg = Cfg::build(&module, block);
        assert_eq!(cfg.successors(noop), &[stop]);
        assert!(cfg.predecessors(stop).contains(&noop));
    }
}
