// regtree.rs - Pattern tree.
//
// Nodes live in an arena owned by `RegexTree` and are identified by
// `NodeId`. The tree is what a parser produces after its reductions:
// single-character repetitions are already `CharLoop`s, one-character
// strings are already `Char`s. Once built it is never mutated; the
// analyzer and the writer only read it.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::regenc::CharClass;
use crate::regint::{RegexOptions, INFINITE_REPEAT};

// === Node identity ===

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// === Node kinds ===

/// A single-character test as it appears in the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeAtom {
    One(char),
    Notone(char),
    Set(CharClass),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    /// `^` in multiline mode.
    Bol,
    /// `$` in multiline mode.
    Eol,
    /// `\A`
    Beginning,
    /// `\G`
    Start,
    /// `\Z`
    EndZ,
    /// `\z`
    End,
    /// `\b`
    Boundary,
    /// `\B`
    NonBoundary,
    EcmaBoundary,
    NonEcmaBoundary,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Matches the empty string.
    Empty,
    /// Never matches.
    Nothing,
    Char(NodeAtom),
    Multi(String),
    /// Single-character repetition `atom{min,max}`.
    CharLoop {
        atom: NodeAtom,
        min: i32,
        max: i32,
        lazy: bool,
    },
    /// General repetition of the only child.
    Loop { min: i32, max: i32, lazy: bool },
    /// Capture group; `uncapture` makes it a balancing group.
    Capture {
        group: Option<usize>,
        uncapture: Option<usize>,
    },
    Concatenate,
    Alternate,
    Atomic,
    Backreference(usize),
    PositiveLookaround,
    NegativeLookaround,
    /// `(?(n)yes|no)`: children are yes and, optionally, no.
    BackreferenceConditional(usize),
    /// `(?(cond)yes|no)`: children are condition, yes and, optionally, no.
    ExpressionConditional,
    Anchor(Anchor),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub children: SmallVec<[NodeId; 2]>,
    pub options: RegexOptions,
}

impl Node {
    #[inline]
    pub fn is_right_to_left(&self) -> bool {
        self.options.contains(RegexOptions::RIGHT_TO_LEFT)
    }

    #[inline]
    pub fn is_ignore_case(&self) -> bool {
        self.options.contains(RegexOptions::IGNORE_CASE)
    }
}

// === Capture names ===

/// Group-name table: name to number and back.
#[derive(Clone, Debug, Default)]
pub struct CaptureNames {
    by_name: HashMap<String, usize>,
    by_number: HashMap<usize, String>,
}

impl CaptureNames {
    pub fn insert(&mut self, name: &str, group: usize) {
        self.by_name.insert(name.to_string(), group);
        self.by_number.insert(group, name.to_string());
    }

    /// Resolves a group name. Purely numeric names resolve to their number.
    pub fn number(&self, name: &str) -> Option<usize> {
        self.by_name
            .get(name)
            .copied()
            .or_else(|| name.parse::<usize>().ok())
    }

    pub fn name(&self, group: usize) -> Option<&str> {
        self.by_number.get(&group).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

// === RegexTree ===

#[derive(Clone, Debug)]
pub struct RegexTree {
    nodes: Vec<Node>,
    root: NodeId,
    cap_count: usize,
    cap_names: CaptureNames,
    options: RegexOptions,
}

impl RegexTree {
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    #[inline]
    pub fn child(&self, id: NodeId, i: usize) -> NodeId {
        self.nodes[id.index()].children[i]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of capture groups including group 0.
    pub fn cap_count(&self) -> usize {
        self.cap_count
    }

    pub fn cap_names(&self) -> &CaptureNames {
        &self.cap_names
    }

    pub fn options(&self) -> RegexOptions {
        self.options
    }

    pub fn is_right_to_left(&self) -> bool {
        self.options.contains(RegexOptions::RIGHT_TO_LEFT)
    }
}

// === TreeBuilder ===

/// Builds a `RegexTree` bottom-up.
///
/// ```
/// use rxvm::regtree::TreeBuilder;
/// use rxvm::regint::RegexOptions;
///
/// // (\w+)@
/// let mut b = TreeBuilder::new(RegexOptions::empty());
/// let word = b.set(rxvm::regenc::CharClass::word());
/// let word = b.plus(word);
/// let user = b.capture(1, word);
/// let at = b.one('@');
/// let body = b.concat([user, at]);
/// let tree = b.finish(body);
/// assert_eq!(tree.cap_count(), 2);
/// ```
pub struct TreeBuilder {
    nodes: Vec<Node>,
    options: RegexOptions,
    cap_names: CaptureNames,
    max_group: usize,
}

impl TreeBuilder {
    /// `options` apply to every node; `RIGHT_TO_LEFT` here makes the whole
    /// pattern scan right-to-left.
    pub fn new(options: RegexOptions) -> Self {
        TreeBuilder {
            nodes: Vec::new(),
            options,
            cap_names: CaptureNames::default(),
            max_group: 0,
        }
    }

    fn push(&mut self, kind: NodeKind, children: &[NodeId]) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            children: children.iter().copied().collect(),
            options: self.options,
        });
        id
    }

    fn note_group(&mut self, group: usize) {
        self.max_group = self.max_group.max(group);
    }

    fn set_options_recursive(&mut self, id: NodeId, add: RegexOptions) {
        let mut pending = vec![id];
        while let Some(n) = pending.pop() {
            let node = &mut self.nodes[n.index()];
            node.options |= add;
            pending.extend(node.children.iter().copied());
        }
    }

    pub fn empty(&mut self) -> NodeId {
        self.push(NodeKind::Empty, &[])
    }

    pub fn nothing(&mut self) -> NodeId {
        self.push(NodeKind::Nothing, &[])
    }

    pub fn one(&mut self, c: char) -> NodeId {
        self.push(NodeKind::Char(NodeAtom::One(c)), &[])
    }

    pub fn notone(&mut self, c: char) -> NodeId {
        self.push(NodeKind::Char(NodeAtom::Notone(c)), &[])
    }

    pub fn set(&mut self, class: CharClass) -> NodeId {
        self.push(NodeKind::Char(NodeAtom::Set(class)), &[])
    }

    /// A literal string; one character becomes `one`, none becomes `empty`.
    pub fn multi(&mut self, s: &str) -> NodeId {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (None, _) => self.empty(),
            (Some(c), None) => self.one(c),
            _ => self.push(NodeKind::Multi(s.to_string()), &[]),
        }
    }

    pub fn anchor(&mut self, anchor: Anchor) -> NodeId {
        self.push(NodeKind::Anchor(anchor), &[])
    }

    fn quantify(&mut self, child: NodeId, min: i32, max: i32, lazy: bool) -> NodeId {
        debug_assert!(min >= 0 && min <= max);
        if min == 1 && max == 1 {
            return child;
        }
        if let NodeKind::Char(atom) = &self.nodes[child.index()].kind {
            let atom = atom.clone();
            let options = self.nodes[child.index()].options;
            let id = self.push(
                NodeKind::CharLoop {
                    atom,
                    min,
                    max,
                    lazy,
                },
                &[],
            );
            self.nodes[id.index()].options = options;
            return id;
        }
        self.push(NodeKind::Loop { min, max, lazy }, &[child])
    }

    /// Greedy `child{min,max}`; `max` may be `INFINITE_REPEAT`.
    pub fn repeat(&mut self, child: NodeId, min: i32, max: i32) -> NodeId {
        self.quantify(child, min, max, false)
    }

    /// Lazy `child{min,max}?`.
    pub fn repeat_lazy(&mut self, child: NodeId, min: i32, max: i32) -> NodeId {
        self.quantify(child, min, max, true)
    }

    pub fn star(&mut self, child: NodeId) -> NodeId {
        self.repeat(child, 0, INFINITE_REPEAT)
    }

    pub fn plus(&mut self, child: NodeId) -> NodeId {
        self.repeat(child, 1, INFINITE_REPEAT)
    }

    pub fn optional(&mut self, child: NodeId) -> NodeId {
        self.repeat(child, 0, 1)
    }

    pub fn lazy_star(&mut self, child: NodeId) -> NodeId {
        self.repeat_lazy(child, 0, INFINITE_REPEAT)
    }

    pub fn lazy_plus(&mut self, child: NodeId) -> NodeId {
        self.repeat_lazy(child, 1, INFINITE_REPEAT)
    }

    /// Numbered capture group. Group 0 is reserved for the whole match.
    pub fn capture(&mut self, group: usize, child: NodeId) -> NodeId {
        debug_assert!(group > 0, "group 0 is added by finish()");
        self.note_group(group);
        self.push(
            NodeKind::Capture {
                group: Some(group),
                uncapture: None,
            },
            &[child],
        )
    }

    pub fn named_capture(&mut self, group: usize, name: &str, child: NodeId) -> NodeId {
        self.cap_names.insert(name, group);
        self.capture(group, child)
    }

    /// Balancing group `(?<group-uncapture>child)`; `group` may be `None`
    /// for `(?<-uncapture>child)`.
    pub fn balancing(&mut self, group: Option<usize>, uncapture: usize, child: NodeId) -> NodeId {
        if let Some(g) = group {
            self.note_group(g);
        }
        self.note_group(uncapture);
        self.push(
            NodeKind::Capture {
                group,
                uncapture: Some(uncapture),
            },
            &[child],
        )
    }

    /// Children in reading order, also under `RIGHT_TO_LEFT`.
    pub fn concat<I: IntoIterator<Item = NodeId>>(&mut self, children: I) -> NodeId {
        let children: SmallVec<[NodeId; 8]> = children.into_iter().collect();
        match children.len() {
            0 => self.empty(),
            1 => children[0],
            _ => self.push(NodeKind::Concatenate, &children),
        }
    }

    pub fn alternate<I: IntoIterator<Item = NodeId>>(&mut self, children: I) -> NodeId {
        let children: SmallVec<[NodeId; 8]> = children.into_iter().collect();
        match children.len() {
            0 => self.nothing(),
            1 => children[0],
            _ => self.push(NodeKind::Alternate, &children),
        }
    }

    pub fn atomic(&mut self, child: NodeId) -> NodeId {
        self.push(NodeKind::Atomic, &[child])
    }

    pub fn backreference(&mut self, group: usize) -> NodeId {
        self.note_group(group);
        self.push(NodeKind::Backreference(group), &[])
    }

    pub fn lookahead(&mut self, child: NodeId) -> NodeId {
        self.push(NodeKind::PositiveLookaround, &[child])
    }

    pub fn negative_lookahead(&mut self, child: NodeId) -> NodeId {
        self.push(NodeKind::NegativeLookaround, &[child])
    }

    /// Lookbehind: the subtree is matched right-to-left, ending at the
    /// current position.
    pub fn lookbehind(&mut self, child: NodeId) -> NodeId {
        self.set_options_recursive(child, RegexOptions::RIGHT_TO_LEFT);
        let id = self.push(NodeKind::PositiveLookaround, &[child]);
        self.nodes[id.index()].options |= RegexOptions::RIGHT_TO_LEFT;
        id
    }

    pub fn negative_lookbehind(&mut self, child: NodeId) -> NodeId {
        self.set_options_recursive(child, RegexOptions::RIGHT_TO_LEFT);
        let id = self.push(NodeKind::NegativeLookaround, &[child]);
        self.nodes[id.index()].options |= RegexOptions::RIGHT_TO_LEFT;
        id
    }

    pub fn backreference_conditional(
        &mut self,
        group: usize,
        yes: NodeId,
        no: Option<NodeId>,
    ) -> NodeId {
        self.note_group(group);
        match no {
            Some(no) => self.push(NodeKind::BackreferenceConditional(group), &[yes, no]),
            None => self.push(NodeKind::BackreferenceConditional(group), &[yes]),
        }
    }

    pub fn expression_conditional(
        &mut self,
        condition: NodeId,
        yes: NodeId,
        no: Option<NodeId>,
    ) -> NodeId {
        match no {
            Some(no) => self.push(NodeKind::ExpressionConditional, &[condition, yes, no]),
            None => self.push(NodeKind::ExpressionConditional, &[condition, yes]),
        }
    }

    /// `(?i:child)`
    pub fn ignore_case(&mut self, child: NodeId) -> NodeId {
        self.set_options_recursive(child, RegexOptions::IGNORE_CASE);
        child
    }

    /// Wraps `body` in group 0 and freezes the tree.
    pub fn finish(mut self, body: NodeId) -> RegexTree {
        let root = self.push(
            NodeKind::Capture {
                group: Some(0),
                uncapture: None,
            },
            &[body],
        );
        RegexTree {
            nodes: self.nodes,
            root,
            cap_count: self.max_group + 1,
            cap_names: self.cap_names,
            options: self.options,
        }
    }
}
