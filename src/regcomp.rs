// regcomp.rs - Writer: pattern tree + analysis -> opcode program.
//
// The tree is walked iteratively with an explicit (node, child) stack, so
// deep trees cost heap, not native stack. Every construct is emitted as a
// before-child / after-child fragment pair; forward jumps are emitted with
// a placeholder target and patched once the target is known.
//
// The program always starts with a `Lazybranch` to the final `Stop`: when
// every path has failed, backtracking lands there and the attempt reports
// whatever group 0 recorded (nothing).

use log::{debug, warn};

use crate::error::RegexError;
use crate::reganalyze::{analyze_with_limit, AnalysisResults};
use crate::regenc::{CaseEquivalence, CharClass};
use crate::regfind::FindOptimizations;
use crate::regint::*;
use crate::regtree::{Anchor, NodeAtom, NodeId, NodeKind, RegexTree};

/// Compile-time knobs.
#[derive(Clone, Copy, Debug)]
pub struct CompileConfig {
    /// Recursion budget of the tree analysis.
    pub analysis_depth_limit: u32,
    /// Reject trees whose analysis is incomplete instead of compiling
    /// them without analysis-driven specializations.
    pub strict_analysis: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        CompileConfig {
            analysis_depth_limit: DEFAULT_ANALYSIS_DEPTH_LIMIT,
            strict_analysis: false,
        }
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Analyzes and compiles `tree`.
pub fn compile_tree(
    tree: &RegexTree,
    culture: &dyn CaseEquivalence,
    config: CompileConfig,
) -> Result<RegexProgram, RegexError> {
    let analysis = analyze_with_limit(tree, config.analysis_depth_limit);
    if !analysis.complete() {
        if config.strict_analysis {
            return Err(RegexError::AnalysisIncomplete {
                depth_limit: config.analysis_depth_limit,
            });
        }
        warn!("compiling without atomic specializations: analysis incomplete");
    }

    let mut writer = Writer {
        tree,
        analysis: &analysis,
        culture,
        ops: Vec::with_capacity(tree.node_count() * 2 + 2),
        classes: Vec::new(),
        patches: Vec::new(),
    };
    writer.write()?;
    let Writer { ops, classes, .. } = writer;

    let find = FindOptimizations::new(tree, culture);
    debug!(
        "compiled {} ops, {} classes, {} groups, find mode {:?}",
        ops.len(),
        classes.len(),
        tree.cap_count(),
        find.mode()
    );

    Ok(RegexProgram {
        ops,
        classes,
        cap_count: tree.cap_count(),
        cap_names: tree.cap_names().clone(),
        options: tree.options(),
        find,
        analysis,
    })
}

// ============================================================================
// Writer
// ============================================================================

struct Writer<'a> {
    tree: &'a RegexTree,
    analysis: &'a AnalysisResults,
    culture: &'a dyn CaseEquivalence,
    ops: Vec<Operation>,
    classes: Vec<CharClass>,
    /// Pending jump sources, and loop body starts.
    patches: Vec<usize>,
}

/// Leaves that match at most one way and push no backtrack frames.
fn is_single_step(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Empty
            | NodeKind::Nothing
            | NodeKind::Char(_)
            | NodeKind::Multi(_)
            | NodeKind::Anchor(_)
            | NodeKind::Backreference(_)
    )
}

fn malformed(id: NodeId, what: &str) -> RegexError {
    RegexError::InternalBug {
        message: format!("malformed tree at node {}: {}", id.index(), what),
    }
}

impl Writer<'_> {
    fn write(&mut self) -> Result<(), RegexError> {
        self.emit(OpCode::Lazybranch, OperationPayload::Jump { addr: 0 });

        let mut parents: Vec<(NodeId, usize)> = Vec::new();
        let mut cur = self.tree.root();
        let mut child = 0usize;
        loop {
            let child_count = self.tree.children(cur).len();
            if child_count == 0 {
                self.emit_leaf(cur)?;
            } else if child < child_count {
                if child == 0 {
                    self.check_arity(cur, child_count)?;
                }
                self.before_child(cur, child)?;
                parents.push((cur, child));
                cur = self.tree.child(cur, self.emission_index(cur, child, child_count));
                child = 0;
                continue;
            }

            let Some((parent, index)) = parents.pop() else {
                break;
            };
            cur = parent;
            self.after_child(cur, index)?;
            child = index + 1;
        }

        let end = self.ops.len();
        self.patch_jump(0, end);
        self.emit(OpCode::Stop, OperationPayload::None);
        Ok(())
    }

    /// Trees keep concatenations in reading order; a right-to-left one
    /// consumes its last child first.
    fn emission_index(&self, id: NodeId, index: usize, child_count: usize) -> usize {
        let node = self.tree.node(id);
        if matches!(node.kind, NodeKind::Concatenate) && node.is_right_to_left() {
            child_count - 1 - index
        } else {
            index
        }
    }

    fn emit(&mut self, opcode: OpCode, payload: OperationPayload) -> usize {
        self.ops.push(Operation::new(opcode, payload));
        self.ops.len() - 1
    }

    /// Emits a consuming op carrying the node's direction and case flags.
    fn emit_for(&mut self, id: NodeId, opcode: OpCode, payload: OperationPayload) -> usize {
        let node = self.tree.node(id);
        let (rtl, ci) = (node.is_right_to_left(), node.is_ignore_case());
        let pos = self.emit(opcode, payload);
        self.ops[pos].rtl = rtl;
        self.ops[pos].ci = ci;
        pos
    }

    fn patch_jump(&mut self, pos: usize, target: usize) {
        match &mut self.ops[pos].payload {
            OperationPayload::Jump { addr } | OperationPayload::CountedJump { addr, .. } => {
                *addr = target
            }
            _ => unreachable!("patching a non-jump op at {}", pos),
        }
    }

    fn pop_patch(&mut self, id: NodeId) -> Result<usize, RegexError> {
        self.patches
            .pop()
            .ok_or_else(|| malformed(id, "unbalanced jump bookkeeping"))
    }

    fn check_arity(&self, id: NodeId, n: usize) -> Result<(), RegexError> {
        let ok = match self.tree.kind(id) {
            NodeKind::Loop { .. }
            | NodeKind::Capture { .. }
            | NodeKind::Atomic
            | NodeKind::PositiveLookaround
            | NodeKind::NegativeLookaround => n == 1,
            NodeKind::BackreferenceConditional(_) => n == 1 || n == 2,
            NodeKind::ExpressionConditional => n == 2 || n == 3,
            NodeKind::Concatenate | NodeKind::Alternate => true,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(malformed(id, "unexpected number of children"))
        }
    }

    fn atom(&mut self, atom: &NodeAtom, ci: bool) -> CharAtom {
        match atom {
            NodeAtom::One(c) if ci => CharAtom::One(self.culture.fold(*c)),
            NodeAtom::One(c) => CharAtom::One(*c),
            NodeAtom::Notone(c) if ci => CharAtom::Notone(self.culture.fold(*c)),
            NodeAtom::Notone(c) => CharAtom::Notone(*c),
            NodeAtom::Set(class) => {
                let class = if ci {
                    class.fold_case(self.culture)
                } else {
                    class.clone()
                };
                self.classes.push(class);
                CharAtom::Set(self.classes.len() - 1)
            }
        }
    }

    /// An atomic group only needs its Setjump/Forejump pair if its body can
    /// leave an alternative behind. `may_backtrack` cannot answer this: it
    /// is cleared for everything under an atomic ancestor.
    fn atomic_needs_frame(&self, id: NodeId) -> bool {
        let body = self.tree.child(id, 0);
        match self.tree.kind(body) {
            // Written as CharLoopAtomic or a bare CharRep only when analysis says so.
            NodeKind::CharLoop { .. } => !self.analysis.is_atomic_by_ancestor(body),
            kind => !is_single_step(kind),
        }
    }

    // === Fragments ===

    fn before_child(&mut self, id: NodeId, index: usize) -> Result<(), RegexError> {
        let tree = self.tree;
        let child_count = tree.children(id).len();
        match *tree.kind(id) {
            NodeKind::Concatenate => {}

            NodeKind::Alternate => {
                if index < child_count - 1 {
                    self.patches.push(self.ops.len());
                    self.emit(OpCode::Lazybranch, OperationPayload::Jump { addr: 0 });
                }
            }

            NodeKind::BackreferenceConditional(group) => {
                if index == 0 {
                    self.emit(OpCode::Setjump, OperationPayload::None);
                    self.patches.push(self.ops.len());
                    self.emit(OpCode::Lazybranch, OperationPayload::Jump { addr: 0 });
                    self.emit(OpCode::TestBackreference, OperationPayload::Group { num: group });
                    self.emit(OpCode::Forejump, OperationPayload::None);
                }
            }

            NodeKind::ExpressionConditional => {
                if index == 0 {
                    self.emit(OpCode::Setjump, OperationPayload::None);
                    self.emit(OpCode::Setmark, OperationPayload::None);
                    self.patches.push(self.ops.len());
                    self.emit(OpCode::Lazybranch, OperationPayload::Jump { addr: 0 });
                }
            }

            NodeKind::Loop { min, max, .. } => {
                if max < INFINITE_REPEAT || min > 1 {
                    if min == 0 {
                        self.emit(OpCode::Nullcount, OperationPayload::Count { initial: 0 });
                    } else {
                        self.emit(OpCode::Setcount, OperationPayload::Count { initial: 1 - min });
                    }
                } else if min == 0 {
                    self.emit(OpCode::Nullmark, OperationPayload::None);
                } else {
                    self.emit(OpCode::Setmark, OperationPayload::None);
                }
                if min == 0 {
                    self.patches.push(self.ops.len());
                    self.emit(OpCode::Goto, OperationPayload::Jump { addr: 0 });
                }
                self.patches.push(self.ops.len());
            }

            NodeKind::Capture { .. } => {
                self.emit(OpCode::Setmark, OperationPayload::None);
            }

            NodeKind::Atomic => {
                if self.atomic_needs_frame(id) {
                    self.emit(OpCode::Setjump, OperationPayload::None);
                }
            }

            NodeKind::PositiveLookaround => {
                self.emit(OpCode::Setjump, OperationPayload::None);
                self.emit(OpCode::Setmark, OperationPayload::None);
            }

            NodeKind::NegativeLookaround => {
                self.emit(OpCode::Setjump, OperationPayload::None);
                self.patches.push(self.ops.len());
                self.emit(OpCode::Lazybranch, OperationPayload::Jump { addr: 0 });
            }

            _ => return Err(malformed(id, "leaf kind with children")),
        }
        Ok(())
    }

    fn after_child(&mut self, id: NodeId, index: usize) -> Result<(), RegexError> {
        let tree = self.tree;
        let child_count = tree.children(id).len();
        match *tree.kind(id) {
            NodeKind::Concatenate => {}

            NodeKind::Alternate => {
                if index < child_count - 1 {
                    let branch = self.pop_patch(id)?;
                    self.patches.push(self.ops.len());
                    self.emit(OpCode::Goto, OperationPayload::Jump { addr: 0 });
                    let here = self.ops.len();
                    self.patch_jump(branch, here);
                } else {
                    let here = self.ops.len();
                    for _ in 0..index {
                        let pos = self.pop_patch(id)?;
                        self.patch_jump(pos, here);
                    }
                }
            }

            NodeKind::BackreferenceConditional(_) => match index {
                0 => {
                    let branch = self.pop_patch(id)?;
                    self.patches.push(self.ops.len());
                    self.emit(OpCode::Goto, OperationPayload::Jump { addr: 0 });
                    let here = self.ops.len();
                    self.patch_jump(branch, here);
                    self.emit(OpCode::Forejump, OperationPayload::None);
                    if child_count == 1 {
                        self.patch_end(id)?;
                    }
                }
                _ => self.patch_end(id)?,
            },

            NodeKind::ExpressionConditional => match index {
                0 => {
                    self.emit(OpCode::Getmark, OperationPayload::None);
                    self.emit(OpCode::Forejump, OperationPayload::None);
                }
                1 => {
                    let branch = self.pop_patch(id)?;
                    self.patches.push(self.ops.len());
                    self.emit(OpCode::Goto, OperationPayload::Jump { addr: 0 });
                    let here = self.ops.len();
                    self.patch_jump(branch, here);
                    self.emit(OpCode::Getmark, OperationPayload::None);
                    self.emit(OpCode::Forejump, OperationPayload::None);
                    if child_count == 2 {
                        self.patch_end(id)?;
                    }
                }
                _ => self.patch_end(id)?,
            },

            NodeKind::Loop { min, max, lazy } => {
                let closing = self.ops.len();
                let body = self.pop_patch(id)?;
                if max < INFINITE_REPEAT || min > 1 {
                    let limit = if is_infinite_repeat(max) {
                        INFINITE_REPEAT
                    } else {
                        max - min
                    };
                    let opcode = if lazy {
                        OpCode::Lazybranchcount
                    } else {
                        OpCode::Branchcount
                    };
                    self.emit(opcode, OperationPayload::CountedJump { addr: body, limit });
                } else {
                    let opcode = if lazy {
                        OpCode::Lazybranchmark
                    } else {
                        OpCode::Branchmark
                    };
                    self.emit(opcode, OperationPayload::Jump { addr: body });
                }
                if min == 0 {
                    let goto = self.pop_patch(id)?;
                    self.patch_jump(goto, closing);
                }
            }

            NodeKind::Capture { group, uncapture } => {
                self.emit(
                    OpCode::Capturemark,
                    OperationPayload::Capture {
                        num: group,
                        uncapture,
                    },
                );
            }

            NodeKind::Atomic => {
                if self.atomic_needs_frame(id) {
                    self.emit(OpCode::Forejump, OperationPayload::None);
                }
            }

            NodeKind::PositiveLookaround => {
                self.emit(OpCode::Getmark, OperationPayload::None);
                self.emit(OpCode::Forejump, OperationPayload::None);
            }

            NodeKind::NegativeLookaround => {
                self.emit(OpCode::Backjump, OperationPayload::None);
                let branch = self.pop_patch(id)?;
                let here = self.ops.len();
                self.patch_jump(branch, here);
                self.emit(OpCode::Forejump, OperationPayload::None);
            }

            _ => return Err(malformed(id, "leaf kind with children")),
        }
        Ok(())
    }

    fn patch_end(&mut self, id: NodeId) -> Result<(), RegexError> {
        let pos = self.pop_patch(id)?;
        let here = self.ops.len();
        self.patch_jump(pos, here);
        Ok(())
    }

    fn emit_leaf(&mut self, id: NodeId) -> Result<(), RegexError> {
        let tree = self.tree;
        let ci = tree.node(id).is_ignore_case();
        match tree.kind(id) {
            NodeKind::Empty => {}
            NodeKind::Nothing => {
                self.emit(OpCode::Nothing, OperationPayload::None);
            }
            NodeKind::Char(atom) => {
                let atom = self.atom(atom, ci);
                self.emit_for(id, OpCode::Char, OperationPayload::Atom { atom });
            }
            NodeKind::Multi(s) => {
                let s: Box<str> = if ci {
                    s.chars().map(|c| self.culture.fold(c)).collect()
                } else {
                    s.as_str().into()
                };
                self.emit_for(id, OpCode::Multi, OperationPayload::Multi { s });
            }
            NodeKind::CharLoop {
                atom,
                min,
                max,
                lazy,
            } => {
                let (min, max, lazy) = (*min, *max, *lazy);
                let atom = self.atom(atom, ci);
                if min > 0 {
                    self.emit_for(id, OpCode::CharRep, OperationPayload::AtomCount { atom, count: min });
                }
                if max > min {
                    let count = if is_infinite_repeat(max) {
                        INFINITE_REPEAT
                    } else {
                        max - min
                    };
                    let atomic = self.analysis.is_atomic_by_ancestor(id);
                    let opcode = match (lazy, atomic) {
                        // Nothing can follow: the minimum is the match.
                        (true, true) => None,
                        (true, false) => Some(OpCode::CharLazy),
                        (false, true) => Some(OpCode::CharLoopAtomic),
                        (false, false) => Some(OpCode::CharLoop),
                    };
                    if let Some(opcode) = opcode {
                        self.emit_for(id, opcode, OperationPayload::AtomCount { atom, count });
                    }
                }
            }
            NodeKind::Backreference(group) => {
                self.emit_for(id, OpCode::Backreference, OperationPayload::Group { num: *group });
            }
            NodeKind::Anchor(anchor) => {
                let opcode = match anchor {
                    Anchor::Bol => OpCode::Bol,
                    Anchor::Eol => OpCode::Eol,
                    Anchor::Beginning => OpCode::Beginning,
                    Anchor::Start => OpCode::Start,
                    Anchor::EndZ => OpCode::EndZ,
                    Anchor::End => OpCode::End,
                    Anchor::Boundary => OpCode::Boundary,
                    Anchor::NonBoundary => OpCode::NonBoundary,
                    Anchor::EcmaBoundary => OpCode::EcmaBoundary,
                    Anchor::NonEcmaBoundary => OpCode::NonEcmaBoundary,
                };
                self.emit(opcode, OperationPayload::None);
            }
            _ => return Err(malformed(id, "construct without children")),
        }
        Ok(())
    }
}
