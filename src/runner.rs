// runner.rs - State and contract shared by every matcher.
//
// A runner owns the mutable state of a scan: the text cursor, the value
// stack, the crawl stack of capture transitions and the per-group capture
// history. The interpreter, delegated scan routines and hand-specialized
// matchers all drive the same `RunnerBase`, so they are interchangeable
// behind `RegexRunner`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use log::{debug, trace};
use smallvec::SmallVec;

use crate::error::RegexError;
use crate::regint::CHECK_TIMEOUT_INTERVAL;

// ============================================================================
// Process-wide default timeout
// ============================================================================

static DEFAULT_TIMEOUT_SET: AtomicBool = AtomicBool::new(false);
static DEFAULT_TIMEOUT_NANOS: AtomicU64 = AtomicU64::new(0);

/// Sets the timeout used by regexes built without an explicit one.
/// `None` means no limit.
pub fn set_default_match_timeout(timeout: Option<Duration>) {
    match timeout {
        Some(t) => {
            let nanos = u64::try_from(t.as_nanos()).unwrap_or(u64::MAX);
            DEFAULT_TIMEOUT_NANOS.store(nanos, Ordering::Relaxed);
            DEFAULT_TIMEOUT_SET.store(true, Ordering::Relaxed);
        }
        None => DEFAULT_TIMEOUT_SET.store(false, Ordering::Relaxed),
    }
}

pub fn default_match_timeout() -> Option<Duration> {
    if DEFAULT_TIMEOUT_SET.load(Ordering::Relaxed) {
        Some(Duration::from_nanos(
            DEFAULT_TIMEOUT_NANOS.load(Ordering::Relaxed),
        ))
    } else {
        None
    }
}

// ============================================================================
// Timeout polling
// ============================================================================

#[derive(Debug)]
struct TimeoutChecker {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    countdown: u32,
}

impl TimeoutChecker {
    fn new() -> Self {
        TimeoutChecker {
            timeout: None,
            deadline: None,
            countdown: CHECK_TIMEOUT_INTERVAL,
        }
    }

    fn start(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
        self.deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        self.countdown = CHECK_TIMEOUT_INTERVAL;
    }

    #[inline]
    fn check(&mut self) -> Result<(), RegexError> {
        let Some(deadline) = self.deadline else {
            return Ok(());
        };
        self.countdown -= 1;
        if self.countdown > 0 {
            return Ok(());
        }
        self.countdown = CHECK_TIMEOUT_INTERVAL;
        if Instant::now() >= deadline {
            let timeout = self.timeout.unwrap_or_default();
            debug!("match abandoned after {:?}", timeout);
            return Err(RegexError::MatchTimeout { timeout });
        }
        Ok(())
    }
}

// ============================================================================
// Capture history
// ============================================================================

/// One entry in a group's capture history. A balancing group does not
/// delete the capture it cancels; it appends a `Balance` entry that
/// points at the capture now visible, or at nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CaptureSlot {
    Span { start: usize, len: usize },
    Balance(Option<usize>),
}

#[derive(Debug, Default)]
struct MatchBuilder {
    groups: Vec<SmallVec<[CaptureSlot; 2]>>,
    balancing: bool,
}

impl MatchBuilder {
    fn reset(&mut self, cap_count: usize) {
        self.groups.resize_with(cap_count, SmallVec::new);
        self.groups.truncate(cap_count);
        for g in &mut self.groups {
            g.clear();
        }
        self.balancing = false;
    }

    fn add(&mut self, cap: usize, start: usize, len: usize) {
        self.groups[cap].push(CaptureSlot::Span { start, len });
    }

    fn remove(&mut self, cap: usize) {
        self.groups[cap].pop();
    }

    /// Index of the entry whose span is currently visible for `cap`.
    fn visible(&self, cap: usize) -> Option<usize> {
        let slots = self.groups.get(cap)?;
        let last = slots.len().checked_sub(1)?;
        match slots[last] {
            CaptureSlot::Span { .. } => Some(last),
            CaptureSlot::Balance(target) => target,
        }
    }

    fn balance(&mut self, cap: usize) {
        self.balancing = true;
        let target = self.visible(cap);
        let slots = &self.groups[cap];
        // Step back from the cancelled capture to the one that becomes visible.
        let entry = match target.and_then(|t| t.checked_sub(1)) {
            Some(prev) => match slots[prev] {
                CaptureSlot::Balance(reference) => CaptureSlot::Balance(reference),
                CaptureSlot::Span { .. } => CaptureSlot::Balance(Some(prev)),
            },
            None => CaptureSlot::Balance(None),
        };
        self.groups[cap].push(entry);
    }

    fn span(&self, cap: usize) -> Option<(usize, usize)> {
        let idx = self.visible(cap)?;
        match self.groups[cap][idx] {
            CaptureSlot::Span { start, len } => Some((start, len)),
            CaptureSlot::Balance(_) => None,
        }
    }

    fn is_matched(&self, cap: usize) -> bool {
        self.span(cap).is_some()
    }

    /// Drops cancelled captures and produces the published spans.
    fn tidy(&self) -> Vec<SmallVec<[(usize, usize); 1]>> {
        self.groups
            .iter()
            .map(|slots| {
                let mut out: SmallVec<[(usize, usize); 1]> = SmallVec::new();
                for slot in slots {
                    match *slot {
                        CaptureSlot::Span { start, len } => out.push((start, len)),
                        CaptureSlot::Balance(_) if self.balancing => {
                            out.pop();
                        }
                        CaptureSlot::Balance(_) => {}
                    }
                }
                out
            })
            .collect()
    }
}

// ============================================================================
// MatchSpans: the published result of a successful scan
// ============================================================================

/// Capture history of every group for one match, as `(start, len)` byte
/// spans. The last entry of a group is the visible capture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchSpans {
    groups: Vec<SmallVec<[(usize, usize); 1]>>,
}

impl MatchSpans {
    pub fn groups_len(&self) -> usize {
        self.groups.len()
    }

    /// Visible `(start, len)` of group `i`, if it participated.
    pub fn group(&self, i: usize) -> Option<(usize, usize)> {
        self.groups.get(i).and_then(|g| g.last().copied())
    }

    pub fn history(&self, i: usize) -> &[(usize, usize)] {
        self.groups.get(i).map_or(&[], |g| g.as_slice())
    }

    /// The whole-match span.
    pub fn span(&self) -> (usize, usize) {
        self.group(0).unwrap_or_default()
    }

    /// The highest-numbered group, whether or not it participated.
    pub fn last_group(&self) -> usize {
        self.groups.len().saturating_sub(1)
    }
}

// ============================================================================
// RunnerBase
// ============================================================================

/// Mutable scan state. Reset unconditionally before every attempt, so an
/// attempt that ended in a timeout cannot leak state into the next one.
#[derive(Debug)]
pub struct RunnerBase {
    /// Where the current scan began (`\G`).
    pub text_start: usize,
    /// Current cursor.
    pub text_pos: usize,
    /// Auxiliary values: marks, loop counters, saved stack depths.
    pub stack: Vec<isize>,
    /// Group numbers in the order they were captured, for undoing.
    pub crawl: Vec<usize>,
    captures: MatchBuilder,
    cap_count: usize,
    right_to_left: bool,
    timeout: TimeoutChecker,
}

impl RunnerBase {
    pub fn new(cap_count: usize, right_to_left: bool) -> Self {
        let mut captures = MatchBuilder::default();
        captures.reset(cap_count);
        RunnerBase {
            text_start: 0,
            text_pos: 0,
            stack: Vec::with_capacity(32),
            crawl: Vec::with_capacity(16),
            captures,
            cap_count,
            right_to_left,
            timeout: TimeoutChecker::new(),
        }
    }

    #[inline]
    pub fn right_to_left(&self) -> bool {
        self.right_to_left
    }

    #[inline]
    pub fn cap_count(&self) -> usize {
        self.cap_count
    }

    /// Positions the runner for a new scan.
    pub fn prepare(&mut self, text_start: usize, text_pos: usize, timeout: Option<Duration>) {
        trace!("scan from {} (cursor {})", text_start, text_pos);
        self.text_start = text_start;
        self.text_pos = text_pos;
        self.timeout.start(timeout);
        self.reset_attempt();
    }

    /// Clears the stacks and capture history.
    pub fn reset_attempt(&mut self) {
        self.stack.clear();
        self.crawl.clear();
        self.captures.reset(self.cap_count);
    }

    #[inline]
    pub fn check_timeout(&mut self) -> Result<(), RegexError> {
        self.timeout.check()
    }

    // --- captures ---

    /// Records a capture of `[start, end)` for `cap`; the bounds may come
    /// in either order.
    pub fn capture(&mut self, cap: usize, start: usize, end: usize) {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        self.crawl.push(cap);
        self.captures.add(cap, start, end - start);
    }

    /// Balancing capture: cancels the latest capture of `uncap` and, if
    /// `cap` is given, captures the text between the two into it.
    pub fn transfer_capture(&mut self, cap: Option<usize>, uncap: usize, start: usize, end: usize) {
        let (mut start, mut end) = if end < start { (end, start) } else { (start, end) };
        let (start2, len2) = self.captures.span(uncap).unwrap_or_default();
        let end2 = start2 + len2;

        if start >= end2 {
            end = start;
            start = end2;
        } else if end <= start2 {
            start = start2;
        } else {
            end = end.min(end2);
            start = start.max(start2);
        }

        self.crawl.push(uncap);
        self.captures.balance(uncap);

        if let Some(cap) = cap {
            self.crawl.push(cap);
            self.captures.add(cap, start, end - start);
        }
    }

    /// Undoes the most recent capture transition.
    pub fn uncapture(&mut self) {
        if let Some(cap) = self.crawl.pop() {
            self.captures.remove(cap);
        } else {
            panic!("uncapture with an empty crawl stack");
        }
    }

    #[inline]
    pub fn crawl_pos(&self) -> usize {
        self.crawl.len()
    }

    /// Undoes captures until the crawl stack is back at `pos`.
    pub fn uncapture_until(&mut self, pos: usize) {
        while self.crawl.len() > pos {
            self.uncapture();
        }
    }

    #[inline]
    pub fn is_matched(&self, cap: usize) -> bool {
        self.captures.is_matched(cap)
    }

    pub fn match_index(&self, cap: usize) -> usize {
        self.captures.span(cap).map_or(0, |(s, _)| s)
    }

    pub fn match_length(&self, cap: usize) -> usize {
        self.captures.span(cap).map_or(0, |(_, l)| l)
    }

    /// Group 0 matched: the attempt found a match.
    #[inline]
    pub fn found_match(&self) -> bool {
        self.captures.is_matched(0)
    }

    /// Publishes the match, if any, tidying balancing entries.
    pub fn take_match(&mut self) -> Option<MatchSpans> {
        if !self.found_match() {
            return None;
        }
        Some(MatchSpans {
            groups: self.captures.tidy(),
        })
    }
}

// ============================================================================
// Runner traits
// ============================================================================

/// A matcher that can scan an input.
///
/// `scan` starts at `base().text_pos` (already positioned by `prepare`) and
/// returns once a match is recorded in the base, no start position is left,
/// or the deadline passes.
pub trait RegexRunner: Send {
    fn base(&mut self) -> &mut RunnerBase;

    fn scan(&mut self, input: &str) -> Result<(), RegexError>;
}

/// The two-phase shape shared by the interpreter and the specialized
/// matchers: a cheap pre-filter, then a full attempt at one position.
pub trait PhasedMatcher: RegexRunner {
    /// Moves `text_pos` to the next position a match could start at.
    /// Returns `false` (leaving `text_pos` at the stop position) if none.
    fn try_find_next_possible_starting_position(&mut self, input: &str) -> bool;

    /// Attempts a match starting exactly at `text_pos`.
    fn try_match_at_current_position(&mut self, input: &str) -> Result<bool, RegexError>;
}

/// Builds fresh runners. One runner is used by one thread at a time.
pub trait RegexRunnerFactory: Send + Sync {
    fn create(&self) -> Box<dyn RegexRunner>;
}

/// Moves one character from `pos` in the scan direction.
#[inline]
pub fn bump(input: &str, pos: usize, right_to_left: bool) -> usize {
    if right_to_left {
        input[..pos].chars().next_back().map_or(pos, |c| pos - c.len_utf8())
    } else {
        input[pos..].chars().next().map_or(pos, |c| pos + c.len_utf8())
    }
}

/// The standard scan loop over a `PhasedMatcher`.
pub fn scan_phased<M: PhasedMatcher + ?Sized>(m: &mut M, input: &str) -> Result<(), RegexError> {
    let right_to_left = m.base().right_to_left;
    let stop_pos = if right_to_left { 0 } else { input.len() };

    loop {
        if m.try_find_next_possible_starting_position(input) {
            m.base().check_timeout()?;
            let start = m.base().text_pos;
            m.base().reset_attempt();
            if m.try_match_at_current_position(input)? {
                return Ok(());
            }
            let base = m.base();
            base.text_pos = start;
            base.reset_attempt();
        }

        let base = m.base();
        if base.text_pos == stop_pos {
            return Ok(());
        }
        base.text_pos = bump(input, base.text_pos, right_to_left);
    }
}
