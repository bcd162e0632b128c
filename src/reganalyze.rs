// reganalyze.rs - Static analysis over the pattern tree.
//
// One top-down walk carrying two inherited facts (atomic-by-ancestor,
// in-loop) and a post-order roll-up of two synthesized facts
// (contains-capture, may-backtrack). The walk is recursive with an explicit
// depth budget; running out of budget yields an incomplete result whose
// queries all answer conservatively.

use bitflags::bitflags;
use log::warn;

use crate::regint::DEFAULT_ANALYSIS_DEPTH_LIMIT;
use crate::regtree::{NodeId, NodeKind, RegexTree};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    struct NodeFacts: u8 {
        const ATOMIC_BY_ANCESTOR = 1 << 0;
        const MAY_BACKTRACK = 1 << 1;
        const CONTAINS_CAPTURE = 1 << 2;
        const IN_LOOP = 1 << 3;
    }
}

/// Facts about a tree, keyed by node identity.
#[derive(Clone, Debug)]
pub struct AnalysisResults {
    facts: Vec<NodeFacts>,
    complete: bool,
    has_ignore_case: bool,
    has_right_to_left: bool,
    depth_limit: u32,
}

impl AnalysisResults {
    fn new(node_count: usize, depth_limit: u32) -> Self {
        AnalysisResults {
            facts: vec![NodeFacts::empty(); node_count],
            complete: false,
            has_ignore_case: false,
            has_right_to_left: false,
            depth_limit,
        }
    }

    #[inline]
    fn has(&self, node: NodeId, fact: NodeFacts) -> bool {
        self.facts
            .get(node.index())
            .is_some_and(|f| f.contains(fact))
    }

    #[inline]
    fn add(&mut self, node: NodeId, fact: NodeFacts) {
        self.facts[node.index()] |= fact;
    }

    /// `false` if the walk ran out of depth budget before visiting every node.
    pub fn complete(&self) -> bool {
        self.complete
    }

    pub fn depth_limit(&self) -> u32 {
        self.depth_limit
    }

    /// Whether backtracking into `node` after it matched is impossible.
    /// Always `false` for an incomplete analysis.
    pub fn is_atomic_by_ancestor(&self, node: NodeId) -> bool {
        self.complete && self.has(node, NodeFacts::ATOMIC_BY_ANCESTOR)
    }

    /// Whether `node` (or something under it that is not sealed off by an
    /// atomic construct) can yield more than one match.
    pub fn may_backtrack(&self, node: NodeId) -> bool {
        !self.complete || self.has(node, NodeFacts::MAY_BACKTRACK)
    }

    pub fn may_contain_capture(&self, node: NodeId) -> bool {
        !self.complete || self.has(node, NodeFacts::CONTAINS_CAPTURE)
    }

    pub fn is_in_loop(&self, node: NodeId) -> bool {
        !self.complete || self.has(node, NodeFacts::IN_LOOP)
    }

    pub fn has_ignore_case(&self) -> bool {
        !self.complete || self.has_ignore_case
    }

    pub fn has_right_to_left(&self) -> bool {
        !self.complete || self.has_right_to_left
    }
}

/// Analyzes `tree` with the default depth budget.
pub fn analyze(tree: &RegexTree) -> AnalysisResults {
    analyze_with_limit(tree, DEFAULT_ANALYSIS_DEPTH_LIMIT)
}

pub fn analyze_with_limit(tree: &RegexTree, depth_limit: u32) -> AnalysisResults {
    let mut results = AnalysisResults::new(tree.node_count(), depth_limit);
    // The whole pattern is atomic: the first match found is the match.
    results.complete = try_analyze(tree, tree.root(), &mut results, true, false, 0);
    if !results.complete {
        warn!(
            "tree analysis stopped at depth {} of {} nodes; answers will be conservative",
            depth_limit,
            tree.node_count()
        );
    }
    results
}

fn try_analyze(
    tree: &RegexTree,
    id: NodeId,
    results: &mut AnalysisResults,
    is_atomic_by_ancestor: bool,
    mut is_in_loop: bool,
    depth: u32,
) -> bool {
    if depth >= results.depth_limit {
        return false;
    }

    let node = tree.node(id);
    results.has_ignore_case |= node.is_ignore_case();
    results.has_right_to_left |= node.is_right_to_left();

    if is_in_loop {
        results.add(id, NodeFacts::IN_LOOP);
    }

    if is_atomic_by_ancestor {
        results.add(id, NodeFacts::ATOMIC_BY_ANCESTOR);
    } else {
        let has_choice = match node.kind {
            NodeKind::Alternate => true,
            NodeKind::Loop { min, max, lazy } | NodeKind::CharLoop { min, max, lazy, .. } => {
                min != max || lazy
            }
            _ => false,
        };
        if has_choice {
            results.add(id, NodeFacts::MAY_BACKTRACK);
        }
    }

    let mut is_atomic_by_self = false;
    match node.kind {
        NodeKind::Atomic | NodeKind::PositiveLookaround | NodeKind::NegativeLookaround => {
            is_atomic_by_self = true;
        }
        NodeKind::Capture { .. } => results.add(id, NodeFacts::CONTAINS_CAPTURE),
        NodeKind::Loop { .. } => is_in_loop = true,
        _ => {}
    }

    let child_count = node.children.len();
    for (i, &child) in node.children.iter().enumerate() {
        let treat_child_as_atomic = (is_atomic_by_ancestor || is_atomic_by_self)
            && match node.kind {
                NodeKind::Atomic | NodeKind::PositiveLookaround | NodeKind::NegativeLookaround => {
                    true
                }
                NodeKind::Alternate
                | NodeKind::BackreferenceConditional(_)
                | NodeKind::ExpressionConditional => true,
                NodeKind::Capture { .. } => true,
                // Reading order; right-to-left runs the first child last.
                NodeKind::Concatenate if node.is_right_to_left() => i == 0,
                NodeKind::Concatenate => i == child_count - 1,
                NodeKind::Loop { max, .. } => max == 1,
                _ => false,
            };

        if !try_analyze(tree, child, results, treat_child_as_atomic, is_in_loop, depth + 1) {
            return false;
        }

        if results.has(child, NodeFacts::CONTAINS_CAPTURE) {
            results.add(id, NodeFacts::CONTAINS_CAPTURE);
        }
        if !is_atomic_by_self && results.has(child, NodeFacts::MAY_BACKTRACK) {
            results.add(id, NodeFacts::MAY_BACKTRACK);
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regint::{RegexOptions, INFINITE_REPEAT};
    use crate::regtree::TreeBuilder;

    #[test]
    fn last_element_of_top_level_concat_is_atomic() {
        // a+ab
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let a = b.one('a');
        let a_plus = b.plus(a);
        let a2 = b.one('a');
        let bb = b.one('b');
        let body = b.concat([a_plus, a2, bb]);
        let tree = b.finish(body);
        let r = analyze(&tree);

        assert!(r.complete());
        assert!(r.is_atomic_by_ancestor(tree.root()));
        assert!(r.is_atomic_by_ancestor(body));
        assert!(r.is_atomic_by_ancestor(bb));
        assert!(!r.is_atomic_by_ancestor(a_plus));
        assert!(r.may_backtrack(a_plus));
        assert!(r.may_backtrack(body));
        assert!(!r.may_backtrack(a2));
    }

    #[test]
    fn atomic_group_seals_backtracking() {
        // (?>a|b)c
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let a = b.one('a');
        let bb = b.one('b');
        let alt = b.alternate([a, bb]);
        let atomic = b.atomic(alt);
        let c = b.one('c');
        let body = b.concat([atomic, c]);
        let tree = b.finish(body);
        let r = analyze(&tree);

        assert!(r.is_atomic_by_ancestor(alt));
        assert!(!r.may_backtrack(alt));
        assert!(!r.may_backtrack(atomic));
        assert!(!r.may_backtrack(body));
    }

    #[test]
    fn captures_and_loops_propagate() {
        // (?:(x)y)*z
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let x = b.one('x');
        let cap = b.capture(1, x);
        let y = b.one('y');
        let inner = b.concat([cap, y]);
        let lp = b.star(inner);
        let z = b.one('z');
        let body = b.concat([lp, z]);
        let tree = b.finish(body);
        let r = analyze(&tree);

        assert!(r.may_contain_capture(cap));
        assert!(r.may_contain_capture(lp));
        assert!(r.may_contain_capture(body));
        assert!(!r.may_contain_capture(z));
        assert!(r.is_in_loop(x));
        assert!(r.is_in_loop(inner));
        assert!(!r.is_in_loop(lp));
        assert!(!r.is_in_loop(z));
    }

    #[test]
    fn single_iteration_loop_passes_atomicity() {
        // x(?:a+)?  -- the optional is last, its body inherits atomicity
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let x = b.one('x');
        let a = b.one('a');
        let a_plus = b.plus(a);
        let ab = b.multi("ab");
        let group = b.concat([ab, a_plus]);
        let opt = b.optional(group);
        let body = b.concat([x, opt]);
        let tree = b.finish(body);
        let r = analyze(&tree);

        assert!(r.is_atomic_by_ancestor(opt));
        assert!(r.is_atomic_by_ancestor(group));
        assert!(r.is_atomic_by_ancestor(a_plus));
        assert!(!r.is_atomic_by_ancestor(ab));
    }

    #[test]
    fn fixed_loops_have_no_choice() {
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let a = b.one('a');
        let three = b.repeat(a, 3, 3);
        let c = b.one('c');
        let lazy = b.repeat_lazy(c, 2, 2);
        let end = b.one('e');
        let body = b.concat([three, lazy, end]);
        let tree = b.finish(body);
        let r = analyze(&tree);

        assert!(!r.may_backtrack(three));
        assert!(r.may_backtrack(lazy));
    }

    #[test]
    fn options_are_collected() {
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let a = b.one('a');
        let a = b.ignore_case(a);
        let x = b.one('x');
        let lb = b.lookbehind(x);
        let body = b.concat([lb, a]);
        let tree = b.finish(body);
        let r = analyze(&tree);
        assert!(r.has_ignore_case());
        assert!(r.has_right_to_left());

        let mut b = TreeBuilder::new(RegexOptions::empty());
        let a = b.one('a');
        let tree = b.finish(a);
        let r = analyze(&tree);
        assert!(!r.has_ignore_case());
        assert!(!r.has_right_to_left());
    }

    #[test]
    fn depth_limit_degrades_conservatively() {
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let mut node = b.one('a');
        for _ in 0..64 {
            node = b.atomic(node);
        }
        let leaf_loop = {
            let c = b.one('c');
            b.repeat(c, 0, INFINITE_REPEAT)
        };
        let body = b.concat([node, leaf_loop]);
        let tree = b.finish(body);

        let r = analyze_with_limit(&tree, 16);
        assert!(!r.complete());
        assert_eq!(r.depth_limit(), 16);
        assert!(r.may_backtrack(body));
        assert!(r.may_contain_capture(body));
        assert!(r.is_in_loop(body));
        assert!(r.has_ignore_case());
        assert!(!r.is_atomic_by_ancestor(leaf_loop));

        let r = analyze_with_limit(&tree, 128);
        assert!(r.complete());
        assert!(r.is_atomic_by_ancestor(leaf_loop));
    }
}
