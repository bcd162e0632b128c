// regenc.rs - Character semantics.
//
// Character-class membership, word-character tests and the case-equivalence
// capability injected into matchers. Culture-specific casing tables are out
// of scope: folding is a single-character lowercase mapping, with the
// Turkish dotted/dotless I as the one culture-sensitive exception.

use std::fmt;

use bitflags::bitflags;
use smallvec::SmallVec;

// === Categories ===

bitflags! {
    /// Shorthand categories a class may include (`\w`, `\W`, `\d`, ...).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ClassCategories: u8 {
        const WORD = 1 << 0;
        const NOT_WORD = 1 << 1;
        const DIGIT = 1 << 2;
        const NOT_DIGIT = 1 << 3;
        const SPACE = 1 << 4;
        const NOT_SPACE = 1 << 5;
    }
}

const ZERO_WIDTH_NON_JOINER: char = '\u{200C}';
const ZERO_WIDTH_JOINER: char = '\u{200D}';

/// `\w`: letters, digits and connector punctuation.
#[inline]
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\u{203F}' || c == '\u{2040}'
}

/// Word test used by `\b`/`\B`; also treats ZWJ and ZWNJ as word characters.
#[inline]
pub fn is_boundary_word_char(c: char) -> bool {
    is_word_char(c) || c == ZERO_WIDTH_JOINER || c == ZERO_WIDTH_NON_JOINER
}

/// Word test used by ECMAScript boundaries: `[a-zA-Z0-9_]` only.
#[inline]
pub fn is_ecma_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `\d`.
#[inline]
pub fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || (!c.is_ascii() && c.is_numeric())
}

/// `\s`.
#[inline]
pub fn is_space(c: char) -> bool {
    c.is_whitespace()
}

impl ClassCategories {
    fn contains_char(self, c: char) -> bool {
        (self.contains(ClassCategories::WORD) && is_word_char(c))
            || (self.contains(ClassCategories::NOT_WORD) && !is_word_char(c))
            || (self.contains(ClassCategories::DIGIT) && is_digit(c))
            || (self.contains(ClassCategories::NOT_DIGIT) && !is_digit(c))
            || (self.contains(ClassCategories::SPACE) && is_space(c))
            || (self.contains(ClassCategories::NOT_SPACE) && !is_space(c))
    }
}

// === CharClass ===

/// A character class: inclusive ranges plus categories, optionally negated,
/// optionally with a subtracted class (`[a-z-[aeiou]]`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CharClass {
    negated: bool,
    ranges: SmallVec<[(char, char); 4]>,
    categories: ClassCategories,
    subtraction: Option<Box<CharClass>>,
}

impl CharClass {
    /// An empty class (matches nothing until ranges or categories are added).
    pub fn new() -> Self {
        CharClass::default()
    }

    /// `\d`
    pub fn digit() -> Self {
        CharClass::new().with_categories(ClassCategories::DIGIT)
    }

    /// `\w`
    pub fn word() -> Self {
        CharClass::new().with_categories(ClassCategories::WORD)
    }

    /// `\s`
    pub fn space() -> Self {
        CharClass::new().with_categories(ClassCategories::SPACE)
    }

    /// `.` without singleline: everything but `\n`.
    pub fn not_newline() -> Self {
        CharClass::new().with_char('\n').negate()
    }

    /// `.` with singleline: every character.
    pub fn any() -> Self {
        CharClass::new().with_range('\0', char::MAX)
    }

    pub fn with_char(self, c: char) -> Self {
        self.with_range(c, c)
    }

    pub fn with_range(mut self, first: char, last: char) -> Self {
        let (lo, hi) = if first <= last { (first, last) } else { (last, first) };
        self.ranges.push((lo, hi));
        self
    }

    pub fn with_categories(mut self, categories: ClassCategories) -> Self {
        self.categories |= categories;
        self
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn subtract(mut self, other: CharClass) -> Self {
        self.subtraction = Some(Box::new(other));
        self
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Returns the single character this class matches, if it is exactly one.
    pub fn single_char(&self) -> Option<char> {
        if self.negated || !self.categories.is_empty() || self.subtraction.is_some() {
            return None;
        }
        match self.ranges.as_slice() {
            [(lo, hi)] if lo == hi => Some(*lo),
            _ => None,
        }
    }

    fn contains_internal(&self, c: char) -> bool {
        let hit = self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi)
            || self.categories.contains_char(c);
        hit != self.negated
    }

    /// Adds the case-folded equivalent of every range member, the way the
    /// parser lowercases a class compiled under ignore-case.
    pub fn fold_case(&self, culture: &dyn CaseEquivalence) -> CharClass {
        // Ranges wider than this are assumed to already cover their folds.
        const MAX_FOLDED_RANGE: u32 = 0x3000;

        let mut folded = self.clone();
        for &(lo, hi) in &self.ranges {
            if (hi as u32) - (lo as u32) > MAX_FOLDED_RANGE {
                continue;
            }
            for c in (lo..=hi).filter(|c| !c.is_ascii() || c.is_ascii_alphabetic()) {
                let f = culture.fold(c);
                if f != c && !folded.ranges.iter().any(|&(l, h)| l <= f && f <= h) {
                    folded.ranges.push((f, f));
                }
            }
        }
        folded.subtraction = self
            .subtraction
            .as_ref()
            .map(|sub| Box::new(sub.fold_case(culture)));
        folded
    }
}

/// Class membership test used at every class opcode.
pub fn is_char_in_class(c: char, class: &CharClass) -> bool {
    let mut in_class = class.contains_internal(c);
    if in_class {
        if let Some(sub) = &class.subtraction {
            in_class = !is_char_in_class(c, sub);
        }
    }
    in_class
}

// === Case equivalence ===

/// Case-folding capability. Implementations are immutable and shared
/// read-only by every matcher built from a pattern.
pub trait CaseEquivalence: fmt::Debug + Send + Sync {
    /// Maps `c` to the representative of its case-equivalence set.
    fn fold(&self, c: char) -> char;

    /// Returns `true` if `a` and `b` are equal under this culture's folding.
    fn equivalent(&self, a: char, b: char) -> bool {
        a == b || self.fold(a) == self.fold(b)
    }
}

#[inline]
fn simple_lowercase(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_lowercase();
    }
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Culture-independent folding.
#[derive(Clone, Copy, Debug, Default)]
pub struct InvariantCulture;

impl CaseEquivalence for InvariantCulture {
    fn fold(&self, c: char) -> char {
        simple_lowercase(c)
    }
}

/// Turkish and Azeri folding: `I` folds to dotless `ı`, `İ` folds to `i`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TurkishCulture;

impl CaseEquivalence for TurkishCulture {
    fn fold(&self, c: char) -> char {
        match c {
            'I' => '\u{0131}',
            '\u{0130}' => 'i',
            _ => simple_lowercase(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_ranges_and_negation() {
        let class = CharClass::new().with_range('a', 'f').with_char('x');
        assert!(is_char_in_class('c', &class));
        assert!(is_char_in_class('x', &class));
        assert!(!is_char_in_class('g', &class));

        let not = class.clone().negate();
        assert!(!is_char_in_class('c', &not));
        assert!(is_char_in_class('g', &not));
    }

    #[test]
    fn class_categories() {
        assert!(is_char_in_class('7', &CharClass::digit()));
        assert!(!is_char_in_class('a', &CharClass::digit()));
        assert!(is_char_in_class('_', &CharClass::word()));
        assert!(is_char_in_class('\t', &CharClass::space()));
        assert!(!is_char_in_class('\n', &CharClass::not_newline()));
        assert!(is_char_in_class('\n', &CharClass::any()));
    }

    #[test]
    fn class_subtraction() {
        let vowels = CharClass::new()
            .with_char('a')
            .with_char('e')
            .with_char('i')
            .with_char('o')
            .with_char('u');
        let consonants = CharClass::new().with_range('a', 'z').subtract(vowels);
        assert!(is_char_in_class('b', &consonants));
        assert!(!is_char_in_class('e', &consonants));
    }

    #[test]
    fn single_char_detection() {
        assert_eq!(CharClass::new().with_char('q').single_char(), Some('q'));
        assert_eq!(CharClass::new().with_range('a', 'b').single_char(), None);
        assert_eq!(CharClass::digit().single_char(), None);
    }

    #[test]
    fn fold_case_adds_lowercase() {
        let upper = CharClass::new().with_range('A', 'C');
        let folded = upper.fold_case(&InvariantCulture);
        assert!(is_char_in_class('b', &folded));
        assert!(is_char_in_class('B', &folded));
        assert!(!is_char_in_class('d', &folded));
    }

    #[test]
    fn turkish_i() {
        assert!(InvariantCulture.equivalent('I', 'i'));
        assert!(!TurkishCulture.equivalent('I', 'i'));
        assert!(TurkishCulture.equivalent('I', '\u{0131}'));
        assert!(TurkishCulture.equivalent('\u{0130}', 'i'));
    }

    #[test]
    fn boundary_word_chars() {
        assert!(is_boundary_word_char('\u{200D}'));
        assert!(!is_word_char('\u{200D}'));
        assert!(is_ecma_word_char('Z'));
        assert!(!is_ecma_word_char('é'));
        assert!(is_word_char('é'));
    }
}
