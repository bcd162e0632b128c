// generated.rs - Matchers specialized by hand for fixed patterns.
//
// Each matcher implements the two phases directly instead of interpreting
// a program, but keeps the runner discipline: captures go through
// `RunnerBase` (and are undone with `uncapture_until` when an alternative
// is abandoned), positions to backtrack to live on `base.stack`, and the
// timeout is polled inside every loop that backtracks.

use std::sync::Arc;

use memchr::memchr;

use crate::api::Regex;
use crate::error::RegexError;
use crate::regenc::{is_digit, is_word_char};
use crate::regint::RegexOptions;
use crate::regtree::CaptureNames;
use crate::runner::{scan_phased, PhasedMatcher, RegexRunner, RegexRunnerFactory, RunnerBase};

#[inline]
fn char_at(input: &str, pos: usize) -> Option<char> {
    input[pos..].chars().next()
}

/// Moves `base.text_pos` to the first position at or after it where `pred`
/// holds; on failure parks it at the end.
fn find_char(base: &mut RunnerBase, input: &str, pred: fn(char) -> bool) -> bool {
    let from = base.text_pos;
    match input[from..].char_indices().find(|&(_, c)| pred(c)) {
        Some((i, _)) => {
            base.text_pos = from + i;
            true
        }
        None => {
            base.text_pos = input.len();
            false
        }
    }
}

macro_rules! phased_runner {
    ($matcher:ident, $factory:ident) => {
        impl RegexRunner for $matcher {
            fn base(&mut self) -> &mut RunnerBase {
                &mut self.base
            }

            fn scan(&mut self, input: &str) -> Result<(), RegexError> {
                scan_phased(self, input)
            }
        }

        pub struct $factory;

        impl RegexRunnerFactory for $factory {
            fn create(&self) -> Box<dyn RegexRunner> {
                Box::new($matcher::new())
            }
        }
    };
}

// ============================================================================
// (\d{4})-(\d{2})-(\d{2})
// ============================================================================

pub struct IsoDateMatcher {
    base: RunnerBase,
}

impl IsoDateMatcher {
    pub const GROUPS: usize = 4;

    pub fn new() -> Self {
        IsoDateMatcher {
            base: RunnerBase::new(Self::GROUPS, false),
        }
    }

    fn digits(input: &str, mut pos: usize, n: usize) -> Option<usize> {
        for _ in 0..n {
            let c = char_at(input, pos).filter(|&c| is_digit(c))?;
            pos += c.len_utf8();
        }
        Some(pos)
    }
}

impl Default for IsoDateMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PhasedMatcher for IsoDateMatcher {
    fn try_find_next_possible_starting_position(&mut self, input: &str) -> bool {
        find_char(&mut self.base, input, is_digit)
    }

    fn try_match_at_current_position(&mut self, input: &str) -> Result<bool, RegexError> {
        let start = self.base.text_pos;
        let Some(year_end) = Self::digits(input, start, 4) else {
            return Ok(false);
        };
        if char_at(input, year_end) != Some('-') {
            return Ok(false);
        }
        let month_start = year_end + 1;
        let Some(month_end) = Self::digits(input, month_start, 2) else {
            return Ok(false);
        };
        if char_at(input, month_end) != Some('-') {
            return Ok(false);
        }
        let day_start = month_end + 1;
        let Some(day_end) = Self::digits(input, day_start, 2) else {
            return Ok(false);
        };

        let base = &mut self.base;
        base.capture(1, start, year_end);
        base.capture(2, month_start, month_end);
        base.capture(3, day_start, day_end);
        base.capture(0, start, day_end);
        base.text_pos = day_end;
        Ok(true)
    }
}

phased_runner!(IsoDateMatcher, IsoDateFactory);

/// `(\d{4})-(\d{2})-(\d{2})`
pub fn iso_date() -> Regex {
    Regex::from_factory(
        Arc::new(IsoDateFactory),
        IsoDateMatcher::GROUPS,
        CaptureNames::default(),
        RegexOptions::empty(),
    )
}

// ============================================================================
// (\w+)(\d)
// ============================================================================

/// `\d` is a subset of `\w`, so the greedy `\w+` always overshoots and has
/// to give characters back one at a time.
pub struct WordThenDigitMatcher {
    base: RunnerBase,
}

impl WordThenDigitMatcher {
    pub const GROUPS: usize = 3;

    pub fn new() -> Self {
        WordThenDigitMatcher {
            base: RunnerBase::new(Self::GROUPS, false),
        }
    }
}

impl Default for WordThenDigitMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PhasedMatcher for WordThenDigitMatcher {
    fn try_find_next_possible_starting_position(&mut self, input: &str) -> bool {
        find_char(&mut self.base, input, is_word_char)
    }

    fn try_match_at_current_position(&mut self, input: &str) -> Result<bool, RegexError> {
        let base = &mut self.base;
        let start = base.text_pos;
        let stack_floor = base.stack.len();

        // \w+ : remember the end of every iteration.
        let mut pos = start;
        while let Some(c) = char_at(input, pos).filter(|&c| is_word_char(c)) {
            pos += c.len_utf8();
            base.stack.push(pos as isize);
        }

        while let Some(&top) = base.stack.last() {
            if base.stack.len() == stack_floor {
                break;
            }
            base.check_timeout()?;
            let word_end = top as usize;
            let crawl = base.crawl_pos();
            base.capture(1, start, word_end);

            if let Some(d) = char_at(input, word_end).filter(|&c| is_digit(c)) {
                let end = word_end + d.len_utf8();
                base.capture(2, word_end, end);
                base.capture(0, start, end);
                base.stack.truncate(stack_floor);
                base.text_pos = end;
                return Ok(true);
            }

            base.uncapture_until(crawl);
            base.stack.pop();
        }

        Ok(false)
    }
}

phased_runner!(WordThenDigitMatcher, WordThenDigitFactory);

/// `(\w+)(\d)`
pub fn word_then_digit() -> Regex {
    Regex::from_factory(
        Arc::new(WordThenDigitFactory),
        WordThenDigitMatcher::GROUPS,
        CaptureNames::default(),
        RegexOptions::empty(),
    )
}

// ============================================================================
// "([^"]*)"
// ============================================================================

pub struct QuotedMatcher {
    base: RunnerBase,
}

impl QuotedMatcher {
    pub const GROUPS: usize = 2;

    pub fn new() -> Self {
        QuotedMatcher {
            base: RunnerBase::new(Self::GROUPS, false),
        }
    }
}

impl Default for QuotedMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PhasedMatcher for QuotedMatcher {
    fn try_find_next_possible_starting_position(&mut self, input: &str) -> bool {
        let from = self.base.text_pos;
        match memchr(b'"', &input.as_bytes()[from..]) {
            Some(i) => {
                self.base.text_pos = from + i;
                true
            }
            None => {
                self.base.text_pos = input.len();
                false
            }
        }
    }

    fn try_match_at_current_position(&mut self, input: &str) -> Result<bool, RegexError> {
        let start = self.base.text_pos;
        if char_at(input, start) != Some('"') {
            return Ok(false);
        }
        // [^"]* is greedy and stops only at a quote or the end, so the
        // closing quote is the next quote.
        let body = start + 1;
        let Some(close) = memchr(b'"', &input.as_bytes()[body..]).map(|i| body + i) else {
            return Ok(false);
        };
        let base = &mut self.base;
        base.capture(1, body, close);
        base.capture(0, start, close + 1);
        base.text_pos = close + 1;
        Ok(true)
    }
}

phased_runner!(QuotedMatcher, QuotedFactory);

/// `"([^"]*)"`
pub fn quoted() -> Regex {
    Regex::from_factory(
        Arc::new(QuotedFactory),
        QuotedMatcher::GROUPS,
        CaptureNames::default(),
        RegexOptions::empty(),
    )
}
