// regreplace.rs - Replacement templates.
//
// A template is compiled once into a rule list: literal runs (indices into
// a literal table) interleaved with references to match-dependent text.
// Applying it walks the matches of a regex and stitches preserved input
// and rule output together.
//
// Template syntax:
//
//   $n  ${n}     group n (all digits are taken; must name an existing group)
//   ${name}      named group
//   $$           a literal `$`
//   $&           the whole match
//   $`  $'       input left / right of the match
//   $+           the highest-numbered group
//   $_           the whole input
//
// A `$` that does not start one of these is literal text.

use std::borrow::Cow;

use crate::api::{Match, Regex};
use crate::error::RegexError;
use crate::regenc::is_word_char;
use crate::regtree::CaptureNames;

/// One step of a compiled template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplacementRule {
    Literal(usize),
    Group(usize),
    LeftPortion,
    RightPortion,
    LastGroup,
    WholeString,
}

/// A compiled replacement template. Immutable; one instance serves any
/// number of matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegexReplacement {
    pattern: String,
    literals: Vec<Box<str>>,
    rules: Vec<ReplacementRule>,
    has_backreferences: bool,
}

// ============================================================================
// Template parsing
// ============================================================================

struct TemplateParser<'a> {
    template: &'a str,
    pos: usize,
    cap_count: usize,
    names: &'a CaptureNames,
    literal: String,
    literals: Vec<Box<str>>,
    rules: Vec<ReplacementRule>,
}

impl<'a> TemplateParser<'a> {
    fn peek(&self) -> Option<char> {
        self.template[self.pos..].chars().next()
    }

    fn flush_literal(&mut self) {
        if !self.literal.is_empty() {
            let text = std::mem::take(&mut self.literal);
            self.rules.push(ReplacementRule::Literal(self.literals.len()));
            self.literals.push(text.into_boxed_str());
        }
    }

    fn emit(&mut self, rule: ReplacementRule) {
        self.flush_literal();
        self.rules.push(rule);
    }

    /// Consumes a run of ASCII digits. `None` when the run is empty or
    /// does not fit.
    fn scan_decimal(&mut self) -> Option<usize> {
        let template = self.template;
        let rest = &template[self.pos..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        self.pos += digits;
        rest[..digits].parse().ok()
    }

    fn scan_name(&mut self) -> &'a str {
        let template = self.template;
        let rest = &template[self.pos..];
        let len = rest
            .char_indices()
            .find(|&(_, c)| !is_word_char(c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += len;
        &rest[..len]
    }

    fn is_capture_slot(&self, n: usize) -> bool {
        n < self.cap_count
    }

    /// Parses what follows a `$` (already consumed). Returns `None`,
    /// leaving the position untouched, if the `$` is literal.
    fn scan_dollar(&mut self) -> Option<ReplacementRule> {
        let after_dollar = self.pos;
        let ch = self.peek()?;

        if ch == '{' {
            self.pos += 1;
            let group = match self.peek() {
                Some(c) if c.is_ascii_digit() => self
                    .scan_decimal()
                    .filter(|&n| self.is_capture_slot(n)),
                Some(c) if is_word_char(c) => {
                    let name = self.scan_name();
                    self.names.number(name).filter(|&n| self.is_capture_slot(n))
                }
                _ => None,
            };
            if let Some(n) = group {
                if self.peek() == Some('}') {
                    self.pos += 1;
                    return Some(ReplacementRule::Group(n));
                }
            }
            self.pos = after_dollar;
            return None;
        }

        if ch.is_ascii_digit() {
            if let Some(n) = self.scan_decimal().filter(|&n| self.is_capture_slot(n)) {
                return Some(ReplacementRule::Group(n));
            }
            self.pos = after_dollar;
            return None;
        }

        let rule = match ch {
            '&' => ReplacementRule::Group(0),
            '`' => ReplacementRule::LeftPortion,
            '\'' => ReplacementRule::RightPortion,
            '+' => ReplacementRule::LastGroup,
            '_' => ReplacementRule::WholeString,
            _ => return None,
        };
        self.pos += 1;
        Some(rule)
    }

    fn parse(mut self) -> RegexReplacement {
        while let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            if c != '$' {
                self.literal.push(c);
                continue;
            }
            if self.peek() == Some('$') {
                self.pos += 1;
                self.literal.push('$');
                continue;
            }
            match self.scan_dollar() {
                Some(rule) => self.emit(rule),
                None => self.literal.push('$'),
            }
        }
        self.flush_literal();

        let has_backreferences = self
            .rules
            .iter()
            .any(|r| !matches!(r, ReplacementRule::Literal(_)));
        RegexReplacement {
            pattern: self.template.to_string(),
            literals: self.literals,
            rules: self.rules,
            has_backreferences,
        }
    }
}

impl RegexReplacement {
    /// Compiles `template` against a pattern with `cap_count` groups.
    pub fn parse(template: &str, cap_count: usize, names: &CaptureNames) -> Self {
        TemplateParser {
            template,
            pos: 0,
            cap_count,
            names,
            literal: String::new(),
            literals: Vec::new(),
            rules: Vec::new(),
        }
        .parse()
    }

    /// The template this was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn rules(&self) -> &[ReplacementRule] {
        &self.rules
    }

    pub fn literal(&self, index: usize) -> &str {
        &self.literals[index]
    }

    /// Whether any rule depends on the match.
    pub fn has_backreferences(&self) -> bool {
        self.has_backreferences
    }

    fn segment<'s, 't: 's>(&'s self, rule: ReplacementRule, m: &Match<'t>) -> &'s str {
        match rule {
            ReplacementRule::Literal(i) => &self.literals[i],
            ReplacementRule::Group(n) => m.group(n).map_or("", |g| g.as_str()),
            ReplacementRule::LeftPortion => m.left(),
            ReplacementRule::RightPortion => m.right(),
            ReplacementRule::LastGroup => m.group(m.last_group()).map_or("", |g| g.as_str()),
            ReplacementRule::WholeString => m.text(),
        }
    }

    /// Appends the rule outputs for `m`, in order, or reversed for
    /// right-to-left assembly.
    fn push_segments<'s, 't: 's>(&'s self, m: &Match<'t>, out: &mut Vec<&'s str>, reverse: bool) {
        if reverse {
            out.extend(self.rules.iter().rev().map(|&r| self.segment(r, m)));
        } else {
            out.extend(self.rules.iter().map(|&r| self.segment(r, m)));
        }
    }

    /// The replacement text for one match.
    pub fn expand(&self, m: &Match<'_>) -> String {
        let mut out = String::new();
        for &rule in &self.rules {
            out.push_str(self.segment(rule, m));
        }
        out
    }

    /// Replaces up to `count` matches (`-1` for all) found from `startat`.
    /// Arguments are validated by the caller.
    pub(crate) fn replace<'t>(
        &self,
        regex: &Regex,
        input: &'t str,
        count: i32,
        startat: usize,
    ) -> Result<Cow<'t, str>, RegexError> {
        if count == 0 {
            return Ok(Cow::Borrowed(input));
        }
        let limit = usize::try_from(count).unwrap_or(usize::MAX);

        if !self.has_backreferences && !regex.right_to_left() {
            return self.replace_simple(regex, input, limit, startat);
        }

        let mut segments: Vec<&str> = Vec::new();
        let mut replaced = 0;

        if !regex.right_to_left() {
            let mut prevat = 0;
            for m in regex.find_iter_at(input, startat)? {
                let m = m?;
                segments.push(&input[prevat..m.start()]);
                prevat = m.end();
                self.push_segments(&m, &mut segments, false);
                replaced += 1;
                if replaced == limit {
                    break;
                }
            }
            if replaced == 0 {
                return Ok(Cow::Borrowed(input));
            }
            segments.push(&input[prevat..]);
        } else {
            let mut prevat = input.len();
            for m in regex.find_iter_at(input, startat)? {
                let m = m?;
                segments.push(&input[m.end()..prevat]);
                prevat = m.start();
                self.push_segments(&m, &mut segments, true);
                replaced += 1;
                if replaced == limit {
                    break;
                }
            }
            if replaced == 0 {
                return Ok(Cow::Borrowed(input));
            }
            segments.push(&input[..prevat]);
            segments.reverse();
        }

        Ok(Cow::Owned(segments.concat()))
    }

    /// Literal-only template, left to right: record the preserved spans,
    /// size the output exactly, then write it in one pass.
    fn replace_simple<'t>(
        &self,
        regex: &Regex,
        input: &'t str,
        limit: usize,
        startat: usize,
    ) -> Result<Cow<'t, str>, RegexError> {
        let replacement: &str = match self.rules.first() {
            Some(&ReplacementRule::Literal(i)) => &self.literals[i],
            _ => "",
        };

        let mut kept: Vec<(usize, usize)> = Vec::new();
        let mut prevat = 0;
        for m in regex.find_iter_at(input, startat)? {
            let m = m?;
            kept.push((prevat, m.start() - prevat));
            prevat = m.end();
            if kept.len() == limit {
                break;
            }
        }
        if kept.is_empty() {
            return Ok(Cow::Borrowed(input));
        }
        let replaced = kept.len();
        kept.push((prevat, input.len() - prevat));

        let total = kept.iter().map(|&(_, len)| len).sum::<usize>() + replacement.len() * replaced;
        let mut out = String::with_capacity(total);
        for (i, &(start, len)) in kept.iter().enumerate() {
            if i > 0 {
                out.push_str(replacement);
            }
            out.push_str(&input[start..start + len]);
        }
        debug_assert_eq!(out.len(), total);
        Ok(Cow::Owned(out))
    }
}

/// Replaces up to `count` matches with whatever `evaluator` returns.
pub(crate) fn replace_with_evaluator<'t, F>(
    regex: &Regex,
    input: &'t str,
    count: i32,
    startat: usize,
    mut evaluator: F,
) -> Result<Cow<'t, str>, RegexError>
where
    F: FnMut(&Match<'t>) -> String,
{
    if count == 0 {
        return Ok(Cow::Borrowed(input));
    }
    let limit = usize::try_from(count).unwrap_or(usize::MAX);
    let right_to_left = regex.right_to_left();

    let mut segments: Vec<Cow<'t, str>> = Vec::new();
    let mut prevat = if right_to_left { input.len() } else { 0 };
    let mut replaced = 0;

    for m in regex.find_iter_at(input, startat)? {
        let m = m?;
        if right_to_left {
            segments.push(Cow::Borrowed(&input[m.end()..prevat]));
            prevat = m.start();
        } else {
            segments.push(Cow::Borrowed(&input[prevat..m.start()]));
            prevat = m.end();
        }
        segments.push(Cow::Owned(evaluator(&m)));
        replaced += 1;
        if replaced == limit {
            break;
        }
    }
    if replaced == 0 {
        return Ok(Cow::Borrowed(input));
    }

    if right_to_left {
        segments.push(Cow::Borrowed(&input[..prevat]));
        segments.reverse();
    } else {
        segments.push(Cow::Borrowed(&input[prevat..]));
    }
    Ok(Cow::Owned(segments.concat()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(template: &str, cap_count: usize) -> RegexReplacement {
        let mut names = CaptureNames::default();
        names.insert("year", 1);
        RegexReplacement::parse(template, cap_count, &names)
    }

    #[test]
    fn literal_only() {
        let r = parse("plain text", 1);
        assert!(!r.has_backreferences());
        assert_eq!(r.rules(), &[ReplacementRule::Literal(0)]);
        assert_eq!(r.literal(0), "plain text");
        assert_eq!(r.pattern(), "plain text");
    }

    #[test]
    fn empty_template() {
        let r = parse("", 1);
        assert!(r.rules().is_empty());
        assert!(!r.has_backreferences());
    }

    #[test]
    fn numbered_groups() {
        let r = parse("$2-$1", 3);
        assert_eq!(
            r.rules(),
            &[
                ReplacementRule::Group(2),
                ReplacementRule::Literal(0),
                ReplacementRule::Group(1)
            ]
        );
        assert!(r.has_backreferences());
    }

    #[test]
    fn braced_and_named_groups() {
        let r = parse("${1}x${year}", 2);
        assert_eq!(
            r.rules(),
            &[
                ReplacementRule::Group(1),
                ReplacementRule::Literal(0),
                ReplacementRule::Group(1)
            ]
        );
    }

    #[test]
    fn invalid_references_stay_literal() {
        // $9 and ${nope} do not exist; `${1` is unterminated.
        let r = parse("$9 ${nope} ${1", 2);
        assert_eq!(r.rules(), &[ReplacementRule::Literal(0)]);
        assert_eq!(r.literal(0), "$9 ${nope} ${1");
    }

    #[test]
    fn all_digits_are_taken() {
        // `$12` is group 12, not group 1 followed by `2`.
        let r = parse("$12", 2);
        assert_eq!(r.literal(0), "$12");
        let r = parse("$12", 13);
        assert_eq!(r.rules(), &[ReplacementRule::Group(12)]);
    }

    #[test]
    fn special_tokens() {
        let r = parse("$&$`$'$+$_", 2);
        assert_eq!(
            r.rules(),
            &[
                ReplacementRule::Group(0),
                ReplacementRule::LeftPortion,
                ReplacementRule::RightPortion,
                ReplacementRule::LastGroup,
                ReplacementRule::WholeString
            ]
        );
    }

    #[test]
    fn dollar_escapes_and_trailing_dollar() {
        let r = parse("a$$b$", 1);
        assert_eq!(r.rules(), &[ReplacementRule::Literal(0)]);
        assert_eq!(r.literal(0), "a$b$");
        assert!(!r.has_backreferences());

        let r = parse("$x", 1);
        assert_eq!(r.literal(0), "$x");
    }
}
