// regfind.rs - Starting-position pre-filter.
//
// Derives a cheap search from the tree's leading (or, right-to-left,
// trailing) construct and uses it to skip positions where a match cannot
// start. A `None` from `find` means no later position can match.

use memchr::{memchr, memmem, memrchr};

use crate::regenc::{is_char_in_class, CaseEquivalence, CharClass};
use crate::regtree::{Anchor, NodeAtom, NodeId, NodeKind, RegexTree};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FindMode {
    /// Every position is a candidate.
    NoSearch,
    /// `\A`: only position 0.
    LeadingBeginning,
    /// `\G`: only the scan's starting position.
    LeadingStart,
    /// Case-sensitive literal prefix.
    LeadingString(Box<str>),
    LeadingChar(char),
    /// Case-folded leading character.
    LeadingCharIgnoreCase(char),
    LeadingSet { class: CharClass, ignore_case: bool },
    /// Right-to-left `\z`: only the end of input.
    TrailingEnd,
    /// Right-to-left: the match must end just after this character.
    TrailingChar(char),
}

#[derive(Clone, Debug)]
pub struct FindOptimizations {
    mode: FindMode,
    right_to_left: bool,
}

impl FindOptimizations {
    pub fn new(tree: &RegexTree, culture: &dyn CaseEquivalence) -> Self {
        let right_to_left = tree.is_right_to_left();
        let mode = if right_to_left {
            trailing_mode(tree, tree.root())
        } else {
            leading_mode(tree, tree.root(), culture)
        };
        FindOptimizations {
            mode: mode.unwrap_or(FindMode::NoSearch),
            right_to_left,
        }
    }

    pub fn mode(&self) -> &FindMode {
        &self.mode
    }

    /// Returns the first position at or after `pos` (before, for
    /// right-to-left) at which a match might start.
    pub fn find(
        &self,
        input: &str,
        pos: usize,
        text_start: usize,
        culture: &dyn CaseEquivalence,
    ) -> Option<usize> {
        let bytes = input.as_bytes();
        match &self.mode {
            FindMode::NoSearch => Some(pos),
            FindMode::LeadingBeginning => (pos == 0).then_some(0),
            FindMode::LeadingStart => (pos == text_start).then_some(pos),
            FindMode::LeadingString(s) => {
                memmem::find(&bytes[pos..], s.as_bytes()).map(|i| pos + i)
            }
            FindMode::LeadingChar(c) => {
                if c.is_ascii() {
                    memchr(*c as u8, &bytes[pos..]).map(|i| pos + i)
                } else {
                    let mut buf = [0u8; 4];
                    let needle = c.encode_utf8(&mut buf);
                    memmem::find(&bytes[pos..], needle.as_bytes()).map(|i| pos + i)
                }
            }
            FindMode::LeadingCharIgnoreCase(c) => input[pos..]
                .char_indices()
                .find(|&(_, ch)| culture.fold(ch) == *c)
                .map(|(i, _)| pos + i),
            FindMode::LeadingSet { class, ignore_case } => input[pos..]
                .char_indices()
                .find(|&(_, ch)| {
                    let ch = if *ignore_case { culture.fold(ch) } else { ch };
                    is_char_in_class(ch, class)
                })
                .map(|(i, _)| pos + i),
            FindMode::TrailingEnd => (pos == input.len()).then_some(pos),
            FindMode::TrailingChar(c) => {
                if c.is_ascii() {
                    memrchr(*c as u8, &bytes[..pos]).map(|i| i + 1)
                } else {
                    let mut buf = [0u8; 4];
                    let needle = c.encode_utf8(&mut buf);
                    memmem::rfind(&bytes[..pos], needle.as_bytes()).map(|i| i + needle.len())
                }
            }
        }
    }

    pub fn is_right_to_left(&self) -> bool {
        self.right_to_left
    }
}

/// Walks down the leading edge of the tree. Iterative, so arbitrarily deep
/// trees are fine.
fn leading_mode(tree: &RegexTree, mut id: NodeId, culture: &dyn CaseEquivalence) -> Option<FindMode> {
    loop {
        let node = tree.node(id);
        if node.is_right_to_left() {
            return None;
        }
        let ci = node.is_ignore_case();
        id = match &node.kind {
            NodeKind::Capture { uncapture: None, .. } | NodeKind::Atomic => node.children[0],
            NodeKind::Loop { min, .. } if *min >= 1 => node.children[0],
            NodeKind::Concatenate => node
                .children
                .iter()
                .copied()
                .find(|&c| !matches!(tree.kind(c), NodeKind::Empty))?,
            NodeKind::Anchor(Anchor::Beginning) => return Some(FindMode::LeadingBeginning),
            NodeKind::Anchor(Anchor::Start) => return Some(FindMode::LeadingStart),
            NodeKind::Multi(s) if !ci => return Some(FindMode::LeadingString(s.as_str().into())),
            NodeKind::Multi(s) => {
                return s
                    .chars()
                    .next()
                    .map(|c| FindMode::LeadingCharIgnoreCase(culture.fold(c)))
            }
            NodeKind::Char(atom) => return atom_mode(atom, ci, culture),
            NodeKind::CharLoop { atom, min, .. } if *min >= 1 => return atom_mode(atom, ci, culture),
            _ => return None,
        };
    }
}

fn atom_mode(atom: &NodeAtom, ci: bool, culture: &dyn CaseEquivalence) -> Option<FindMode> {
    match atom {
        NodeAtom::One(c) if ci => Some(FindMode::LeadingCharIgnoreCase(culture.fold(*c))),
        NodeAtom::One(c) => Some(FindMode::LeadingChar(*c)),
        NodeAtom::Set(class) => {
            let class = if ci { class.fold_case(culture) } else { class.clone() };
            match class.single_char() {
                Some(c) if !ci => Some(FindMode::LeadingChar(c)),
                _ => Some(FindMode::LeadingSet {
                    class,
                    ignore_case: ci,
                }),
            }
        }
        NodeAtom::Notone(_) => None,
    }
}

fn trailing_mode(tree: &RegexTree, mut id: NodeId) -> Option<FindMode> {
    loop {
        let node = tree.node(id);
        if !node.is_right_to_left() {
            return None;
        }
        let ci = node.is_ignore_case();
        id = match &node.kind {
            NodeKind::Capture { uncapture: None, .. } | NodeKind::Atomic => node.children[0],
            NodeKind::Loop { min, .. } if *min >= 1 => node.children[0],
            // Right-to-left concatenations run their children last to first.
            NodeKind::Concatenate => node
                .children
                .iter()
                .rev()
                .copied()
                .find(|&c| !matches!(tree.kind(c), NodeKind::Empty))?,
            NodeKind::Anchor(Anchor::End) => return Some(FindMode::TrailingEnd),
            NodeKind::Multi(s) if !ci => return s.chars().next_back().map(FindMode::TrailingChar),
            NodeKind::Char(NodeAtom::One(c)) if !ci => return Some(FindMode::TrailingChar(*c)),
            NodeKind::CharLoop {
                atom: NodeAtom::One(c),
                min,
                ..
            } if *min >= 1 && !ci => return Some(FindMode::TrailingChar(*c)),
            _ => return None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regenc::InvariantCulture;
    use crate::regint::RegexOptions;
    use crate::regtree::TreeBuilder;

    fn mode_of(tree: &RegexTree) -> FindOptimizations {
        FindOptimizations::new(tree, &InvariantCulture)
    }

    #[test]
    fn leading_string() {
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let s = b.multi("abc");
        let d = b.set(CharClass::digit());
        let body = b.concat([s, d]);
        let tree = b.finish(body);
        let f = mode_of(&tree);
        assert_eq!(f.mode(), &FindMode::LeadingString("abc".into()));
        assert_eq!(f.find("xxabcabc", 0, 0, &InvariantCulture), Some(2));
        assert_eq!(f.find("xxabcabc", 3, 0, &InvariantCulture), Some(5));
        assert_eq!(f.find("xxabcabc", 6, 0, &InvariantCulture), None);
    }

    #[test]
    fn leading_char_through_capture_and_loop() {
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let e = b.one('é');
        let lp = b.plus(e);
        let cap = b.capture(1, lp);
        let tree = b.finish(cap);
        let f = mode_of(&tree);
        assert_eq!(f.mode(), &FindMode::LeadingChar('é'));
        assert_eq!(f.find("abé", 0, 0, &InvariantCulture), Some(2));
    }

    #[test]
    fn leading_ignore_case() {
        let mut b = TreeBuilder::new(RegexOptions::IGNORE_CASE);
        let s = b.multi("Hello");
        let tree = b.finish(s);
        let f = mode_of(&tree);
        assert_eq!(f.mode(), &FindMode::LeadingCharIgnoreCase('h'));
        assert_eq!(f.find("say HELLO", 0, 0, &InvariantCulture), Some(4));
    }

    #[test]
    fn leading_set() {
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let d = b.set(CharClass::digit());
        let tree = b.finish(d);
        let f = mode_of(&tree);
        assert_eq!(f.find("ab7", 0, 0, &InvariantCulture), Some(2));
        assert_eq!(f.find("abc", 0, 0, &InvariantCulture), None);
    }

    #[test]
    fn anchors() {
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let a = b.anchor(Anchor::Beginning);
        let x = b.one('x');
        let body = b.concat([a, x]);
        let tree = b.finish(body);
        let f = mode_of(&tree);
        assert_eq!(f.find("xx", 0, 0, &InvariantCulture), Some(0));
        assert_eq!(f.find("xx", 1, 0, &InvariantCulture), None);

        let mut b = TreeBuilder::new(RegexOptions::empty());
        let g = b.anchor(Anchor::Start);
        let tree = b.finish(g);
        let f = mode_of(&tree);
        assert_eq!(f.find("xx", 1, 1, &InvariantCulture), Some(1));
        assert_eq!(f.find("xx", 2, 1, &InvariantCulture), None);
    }

    #[test]
    fn optional_prefix_disables_search() {
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let a = b.one('a');
        let opt = b.optional(a);
        let c = b.one('c');
        let body = b.concat([opt, c]);
        let tree = b.finish(body);
        assert_eq!(mode_of(&tree).mode(), &FindMode::NoSearch);
    }

    #[test]
    fn trailing_char_right_to_left() {
        let mut b = TreeBuilder::new(RegexOptions::RIGHT_TO_LEFT);
        let a = b.one('a');
        let s = b.multi("bc");
        let body = b.concat([a, s]);
        let tree = b.finish(body);
        let f = mode_of(&tree);
        assert!(f.is_right_to_left());
        assert_eq!(f.mode(), &FindMode::TrailingChar('c'));
        assert_eq!(f.find("abcabx", 6, 6, &InvariantCulture), Some(3));
        assert_eq!(f.find("abcabx", 2, 6, &InvariantCulture), None);
    }

    #[test]
    fn deep_nesting_reaches_the_leading_char() {
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let mut node = b.one('q');
        for i in 0..100_000 {
            node = if i % 2 == 0 { b.atomic(node) } else { b.plus(node) };
        }
        let tree = b.finish(node);
        assert_eq!(mode_of(&tree).mode(), &FindMode::LeadingChar('q'));

        let mut b = TreeBuilder::new(RegexOptions::RIGHT_TO_LEFT);
        let mut node = b.one('z');
        for _ in 0..100_000 {
            let a = b.one('a');
            node = b.concat([a, node]);
        }
        let tree = b.finish(node);
        assert_eq!(mode_of(&tree).mode(), &FindMode::TrailingChar('z'));
    }
}
