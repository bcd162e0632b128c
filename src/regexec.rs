// regexec.rs - The backtracking interpreter.
//
// Structure: track frames -> character helpers -> the dispatch loop
// (`go`) -> the runner/phased-matcher glue -> factory.
//
// The loop dispatches on (opcode, reentry). A forward step that leaves a
// choice behind pushes a `TrackFrame` naming its own position; backtracking
// pops the newest frame and re-enters that same opcode in its
// `Backtracking` or `BacktrackingSecond` state with the frame's saved
// integers. Nothing recurses, so pattern nesting and input length only
// grow the heap-allocated stacks.

use std::sync::Arc;

use log::trace;

use crate::error::RegexError;
use crate::regenc::{
    is_boundary_word_char, is_char_in_class, is_ecma_word_char, CaseEquivalence,
};
use crate::regint::*;
use crate::runner::{bump, scan_phased, PhasedMatcher, RegexRunner, RegexRunnerFactory, RunnerBase};

// ============================================================================
// Track frames
// ============================================================================

/// Which entry point of an opcode a backtrack resumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reentry {
    Forward,
    Backtracking,
    BacktrackingSecond,
}

/// A backtrack resumption record: the op to re-enter, how, and up to three
/// saved integers (positions, counts, stack depths).
#[derive(Clone, Copy, Debug)]
struct TrackFrame {
    code: usize,
    reentry: Reentry,
    data: [isize; 3],
}

enum Step {
    Next,
    Goto(usize),
    Backtrack,
}

// ============================================================================
// Character helpers
// ============================================================================

/// Reads one character in the scan direction: the one at `pos` going
/// forward, the one before `pos` going right-to-left.
#[inline]
pub(crate) fn forward_char(input: &str, pos: usize, right_to_left: bool) -> Option<(char, usize)> {
    if right_to_left {
        input[..pos]
            .chars()
            .next_back()
            .map(|c| (c, pos - c.len_utf8()))
    } else {
        input[pos..].chars().next().map(|c| (c, pos + c.len_utf8()))
    }
}

/// Steps back over one character just consumed in the scan direction.
#[inline]
fn back_one(input: &str, pos: usize, right_to_left: bool) -> usize {
    bump(input, pos, !right_to_left)
}

#[inline]
fn is_boundary(input: &str, pos: usize, word: fn(char) -> bool) -> bool {
    let before = input[..pos].chars().next_back().is_some_and(word);
    let after = input[pos..].chars().next().is_some_and(word);
    before != after
}

#[inline]
fn pos_data(pos: usize) -> isize {
    pos as isize
}

// ============================================================================
// RegexInterpreter
// ============================================================================

pub struct RegexInterpreter {
    base: RunnerBase,
    program: Arc<RegexProgram>,
    culture: Arc<dyn CaseEquivalence>,
    track: Vec<TrackFrame>,
}

impl RegexInterpreter {
    pub fn new(program: Arc<RegexProgram>, culture: Arc<dyn CaseEquivalence>) -> Self {
        let base = RunnerBase::new(program.cap_count, program.right_to_left());
        RegexInterpreter {
            base,
            program,
            culture,
            track: Vec::with_capacity(64),
        }
    }

    pub fn program(&self) -> &RegexProgram {
        &self.program
    }

    /// Current depths of the track, value and crawl stacks.
    pub fn stack_depths(&self) -> (usize, usize, usize) {
        (self.track.len(), self.base.stack.len(), self.base.crawl.len())
    }

    // --- stacks ---

    #[inline]
    fn track_push(&mut self, code: usize, data: [isize; 3]) {
        self.track.push(TrackFrame {
            code,
            reentry: Reentry::Backtracking,
            data,
        });
    }

    #[inline]
    fn track_push2(&mut self, code: usize, data: [isize; 3]) {
        self.track.push(TrackFrame {
            code,
            reentry: Reentry::BacktrackingSecond,
            data,
        });
    }

    #[inline]
    fn stack_pop(&mut self) -> isize {
        match self.base.stack.pop() {
            Some(v) => v,
            None => panic!("value stack underflow"),
        }
    }

    /// Pops a pair pushed as (first, second).
    #[inline]
    fn stack_pop2(&mut self) -> (isize, isize) {
        let second = self.stack_pop();
        let first = self.stack_pop();
        (first, second)
    }

    #[inline]
    fn stack_push2(&mut self, first: isize, second: isize) {
        self.base.stack.push(first);
        self.base.stack.push(second);
    }

    // --- matching primitives ---

    #[inline]
    fn atom_matches(&self, atom: CharAtom, ci: bool, c: char) -> bool {
        let c = if ci { self.culture.fold(c) } else { c };
        match atom {
            CharAtom::One(x) => c == x,
            CharAtom::Notone(x) => c != x,
            CharAtom::Set(i) => is_char_in_class(c, &self.program.classes[i]),
        }
    }

    /// Consumes `chars` (already in scan order) starting at `pos`.
    fn match_chars<I: Iterator<Item = char>>(
        &self,
        input: &str,
        mut pos: usize,
        right_to_left: bool,
        ci: bool,
        chars: I,
    ) -> Option<usize> {
        for expected in chars {
            let (c, next) = forward_char(input, pos, right_to_left)?;
            let c = if ci { self.culture.fold(c) } else { c };
            if c != expected {
                return None;
            }
            pos = next;
        }
        Some(pos)
    }

    fn match_string(&self, op: &Operation, input: &str, pos: usize) -> Option<usize> {
        let s = op.multi();
        if op.rtl {
            self.match_chars(input, pos, true, op.ci, s.chars().rev())
        } else {
            self.match_chars(input, pos, false, op.ci, s.chars())
        }
    }

    fn match_backreference(&self, op: &Operation, input: &str, pos: usize, group: usize) -> Option<usize> {
        let start = self.base_match_index(group);
        let captured = &input[start..start + self.base_match_length(group)];
        let fold = |c: char| if op.ci { self.culture.fold(c) } else { c };
        if op.rtl {
            self.match_chars(input, pos, true, op.ci, captured.chars().rev().map(fold))
        } else {
            self.match_chars(input, pos, false, op.ci, captured.chars().map(fold))
        }
    }

    #[inline]
    fn base_match_index(&self, group: usize) -> usize {
        self.base.match_index(group)
    }

    #[inline]
    fn base_match_length(&self, group: usize) -> usize {
        self.base.match_length(group)
    }

    // ========================================================================
    // Dispatch loop
    // ========================================================================

    fn go(&mut self, input: &str) -> Result<bool, RegexError> {
        let program = Arc::clone(&self.program);
        let ops = &program.ops;
        let ecma = program.options.contains(RegexOptions::ECMA_SCRIPT);
        let end = input.len();
        let bytes = input.as_bytes();

        let mut pos = self.base.text_pos;
        let mut code = 0usize;
        let mut entry = Reentry::Forward;
        let mut data = [0isize; 3];

        loop {
            self.base.check_timeout()?;
            let op = &ops[code];

            let step = match (op.opcode, entry) {
                (OpCode::Stop, _) => {
                    self.base.text_pos = pos;
                    let found = self.base.found_match();
                    if found {
                        // The captures already hold the match; leftover frames
                        // must not leak into the next attempt on this runner.
                        self.track.clear();
                        self.base.stack.clear();
                        self.base.crawl.clear();
                    }
                    debug_assert_eq!(self.stack_depths(), (0, 0, 0));
                    return Ok(found);
                }

                (OpCode::Nothing, _) => Step::Backtrack,

                (OpCode::Goto, _) => Step::Goto(op.jump()),

                (OpCode::TestBackreference, Reentry::Forward) => {
                    if self.base.is_matched(op.group()) {
                        Step::Next
                    } else {
                        Step::Backtrack
                    }
                }

                (OpCode::Lazybranch, Reentry::Forward) => {
                    self.track_push(code, [pos_data(pos), 0, 0]);
                    Step::Next
                }
                (OpCode::Lazybranch, Reentry::Backtracking) => {
                    pos = data[0] as usize;
                    Step::Goto(op.jump())
                }

                (OpCode::Setmark, Reentry::Forward) => {
                    self.base.stack.push(pos_data(pos));
                    self.track_push(code, [0; 3]);
                    Step::Next
                }
                (OpCode::Nullmark, Reentry::Forward) => {
                    self.base.stack.push(-1);
                    self.track_push(code, [0; 3]);
                    Step::Next
                }
                (OpCode::Setmark | OpCode::Nullmark, Reentry::Backtracking) => {
                    self.stack_pop();
                    Step::Backtrack
                }

                (OpCode::Getmark, Reentry::Forward) => {
                    let mark = self.stack_pop();
                    self.track_push(code, [mark, 0, 0]);
                    pos = mark as usize;
                    Step::Next
                }
                (OpCode::Getmark, Reentry::Backtracking) => {
                    self.base.stack.push(data[0]);
                    Step::Backtrack
                }

                (OpCode::Capturemark, Reentry::Forward) => {
                    let (group, uncapture) = op.capture();
                    if uncapture.is_some_and(|u| !self.base.is_matched(u)) {
                        Step::Backtrack
                    } else {
                        let mark = self.stack_pop();
                        let crawl = self.base.crawl_pos() as isize;
                        let start = mark as usize;
                        match (group, uncapture) {
                            (group, Some(u)) => self.base.transfer_capture(group, u, start, pos),
                            (Some(g), None) => self.base.capture(g, start, pos),
                            (None, None) => {}
                        }
                        self.track_push(code, [mark, crawl, 0]);
                        Step::Next
                    }
                }
                (OpCode::Capturemark, Reentry::Backtracking) => {
                    self.base.stack.push(data[0]);
                    self.base.uncapture_until(data[1] as usize);
                    Step::Backtrack
                }

                // Greedy loop closer: loop again after a non-empty iteration.
                (OpCode::Branchmark, Reentry::Forward) => {
                    let mark = self.stack_pop();
                    if pos_data(pos) != mark {
                        self.track_push(code, [mark, pos_data(pos), 0]);
                        self.base.stack.push(pos_data(pos));
                        Step::Goto(op.jump())
                    } else {
                        self.track_push2(code, [mark, 0, 0]);
                        Step::Next
                    }
                }
                (OpCode::Branchmark, Reentry::Backtracking) => {
                    self.stack_pop();
                    pos = data[1] as usize;
                    self.track_push2(code, [data[0], 0, 0]);
                    Step::Next
                }
                (OpCode::Branchmark, Reentry::BacktrackingSecond) => {
                    self.base.stack.push(data[0]);
                    Step::Backtrack
                }

                // Lazy loop closer: go on; backtracking adds an iteration.
                (OpCode::Lazybranchmark, Reentry::Forward) => {
                    let old = self.stack_pop();
                    if pos_data(pos) != old {
                        if old != -1 {
                            self.track_push(code, [old, pos_data(pos), 0]);
                        } else {
                            self.track_push(code, [pos_data(pos), pos_data(pos), 0]);
                        }
                    } else {
                        self.base.stack.push(old);
                        self.track_push2(code, [old, 0, 0]);
                    }
                    Step::Next
                }
                (OpCode::Lazybranchmark, Reentry::Backtracking) => {
                    let at = data[1];
                    self.track_push2(code, [data[0], 0, 0]);
                    self.base.stack.push(at);
                    pos = at as usize;
                    Step::Goto(op.jump())
                }
                (OpCode::Lazybranchmark, Reentry::BacktrackingSecond) => {
                    self.stack_pop();
                    self.base.stack.push(data[0]);
                    Step::Backtrack
                }

                (OpCode::Setcount, Reentry::Forward) => {
                    self.stack_push2(pos_data(pos), op.count() as isize);
                    self.track_push(code, [0; 3]);
                    Step::Next
                }
                (OpCode::Nullcount, Reentry::Forward) => {
                    self.stack_push2(-1, op.count() as isize);
                    self.track_push(code, [0; 3]);
                    Step::Next
                }
                (OpCode::Setcount | OpCode::Nullcount, Reentry::Backtracking) => {
                    self.stack_pop2();
                    Step::Backtrack
                }

                (OpCode::Branchcount, Reentry::Forward) => {
                    let (mark, count) = self.stack_pop2();
                    let matched = pos_data(pos) - mark;
                    if count >= op.limit() as isize || (matched == 0 && count >= 0) {
                        self.track_push2(code, [mark, count, 0]);
                        Step::Next
                    } else {
                        self.track_push(code, [mark, 0, 0]);
                        self.stack_push2(pos_data(pos), count + 1);
                        Step::Goto(op.jump())
                    }
                }
                (OpCode::Branchcount, Reentry::Backtracking) => {
                    let (mark, count) = self.stack_pop2();
                    if count > 0 {
                        pos = mark as usize;
                        self.track_push2(code, [data[0], count - 1, 0]);
                        Step::Next
                    } else {
                        self.stack_push2(data[0], count - 1);
                        Step::Backtrack
                    }
                }
                (OpCode::Branchcount, Reentry::BacktrackingSecond) => {
                    self.stack_push2(data[0], data[1]);
                    Step::Backtrack
                }

                (OpCode::Lazybranchcount, Reentry::Forward) => {
                    let (mark, count) = self.stack_pop2();
                    if count < 0 {
                        self.track_push2(code, [mark, 0, 0]);
                        self.stack_push2(pos_data(pos), count + 1);
                        Step::Goto(op.jump())
                    } else {
                        self.track_push(code, [mark, count, pos_data(pos)]);
                        Step::Next
                    }
                }
                (OpCode::Lazybranchcount, Reentry::Backtracking) => {
                    let [mark, count, at] = data;
                    if count < op.limit() as isize && at != mark {
                        pos = at as usize;
                        self.stack_push2(at, count + 1);
                        self.track_push2(code, [mark, 0, 0]);
                        Step::Goto(op.jump())
                    } else {
                        self.stack_push2(mark, count);
                        Step::Backtrack
                    }
                }
                (OpCode::Lazybranchcount, Reentry::BacktrackingSecond) => {
                    let (_, count) = self.stack_pop2();
                    self.stack_push2(data[0], count - 1);
                    Step::Backtrack
                }

                (OpCode::Setjump, Reentry::Forward) => {
                    let (track, crawl) = (self.track.len() as isize, self.base.crawl_pos() as isize);
                    self.stack_push2(track, crawl);
                    self.track_push(code, [0; 3]);
                    Step::Next
                }
                (OpCode::Setjump, Reentry::Backtracking) => {
                    self.stack_pop2();
                    Step::Backtrack
                }

                (OpCode::Backjump, Reentry::Forward) => {
                    let (track, crawl) = self.stack_pop2();
                    self.track.truncate(track as usize);
                    self.base.uncapture_until(crawl as usize);
                    Step::Backtrack
                }

                (OpCode::Forejump, Reentry::Forward) => {
                    let (track, crawl) = self.stack_pop2();
                    self.track.truncate(track as usize);
                    self.track_push(code, [crawl, 0, 0]);
                    Step::Next
                }
                (OpCode::Forejump, Reentry::Backtracking) => {
                    self.base.uncapture_until(data[0] as usize);
                    Step::Backtrack
                }

                // --- anchors ---
                (OpCode::Bol, Reentry::Forward) => {
                    if pos > 0 && bytes[pos - 1] != b'\n' {
                        Step::Backtrack
                    } else {
                        Step::Next
                    }
                }
                (OpCode::Eol, Reentry::Forward) => {
                    if pos < end && bytes[pos] != b'\n' {
                        Step::Backtrack
                    } else {
                        Step::Next
                    }
                }
                (OpCode::Boundary, Reentry::Forward) => {
                    if is_boundary(input, pos, is_boundary_word_char) {
                        Step::Next
                    } else {
                        Step::Backtrack
                    }
                }
                (OpCode::NonBoundary, Reentry::Forward) => {
                    if is_boundary(input, pos, is_boundary_word_char) {
                        Step::Backtrack
                    } else {
                        Step::Next
                    }
                }
                (OpCode::EcmaBoundary, Reentry::Forward) => {
                    if is_boundary(input, pos, is_ecma_word_char) {
                        Step::Next
                    } else {
                        Step::Backtrack
                    }
                }
                (OpCode::NonEcmaBoundary, Reentry::Forward) => {
                    if is_boundary(input, pos, is_ecma_word_char) {
                        Step::Backtrack
                    } else {
                        Step::Next
                    }
                }
                (OpCode::Beginning, Reentry::Forward) => {
                    if pos > 0 {
                        Step::Backtrack
                    } else {
                        Step::Next
                    }
                }
                (OpCode::Start, Reentry::Forward) => {
                    if pos != self.base.text_start {
                        Step::Backtrack
                    } else {
                        Step::Next
                    }
                }
                (OpCode::EndZ, Reentry::Forward) => {
                    if pos == end || (pos + 1 == end && bytes[pos] == b'\n') {
                        Step::Next
                    } else {
                        Step::Backtrack
                    }
                }
                (OpCode::End, Reentry::Forward) => {
                    if pos < end {
                        Step::Backtrack
                    } else {
                        Step::Next
                    }
                }

                // --- consuming ---
                (OpCode::Char, Reentry::Forward) => match forward_char(input, pos, op.rtl) {
                    Some((c, next)) if self.atom_matches(op.atom(), op.ci, c) => {
                        pos = next;
                        Step::Next
                    }
                    _ => Step::Backtrack,
                },

                (OpCode::Multi, Reentry::Forward) => match self.match_string(op, input, pos) {
                    Some(next) => {
                        pos = next;
                        Step::Next
                    }
                    None => Step::Backtrack,
                },

                (OpCode::Backreference, Reentry::Forward) => {
                    let group = op.group();
                    if self.base.is_matched(group) {
                        match self.match_backreference(op, input, pos, group) {
                            Some(next) => {
                                pos = next;
                                Step::Next
                            }
                            None => Step::Backtrack,
                        }
                    } else if ecma {
                        Step::Next
                    } else {
                        Step::Backtrack
                    }
                }

                (OpCode::CharRep, Reentry::Forward) => {
                    let atom = op.atom();
                    let mut at = pos;
                    let mut ok = true;
                    for _ in 0..op.count() {
                        match forward_char(input, at, op.rtl) {
                            Some((c, next)) if self.atom_matches(atom, op.ci, c) => at = next,
                            _ => {
                                ok = false;
                                break;
                            }
                        }
                    }
                    if ok {
                        pos = at;
                        Step::Next
                    } else {
                        Step::Backtrack
                    }
                }

                (OpCode::CharLoop | OpCode::CharLoopAtomic, Reentry::Forward) => {
                    let atom = op.atom();
                    let max = op.count();
                    let mut taken: i32 = 0;
                    while taken < max {
                        match forward_char(input, pos, op.rtl) {
                            Some((c, next)) if self.atom_matches(atom, op.ci, c) => {
                                pos = next;
                                taken += 1;
                            }
                            _ => break,
                        }
                    }
                    if taken > 0 && op.opcode == OpCode::CharLoop {
                        let give_back = back_one(input, pos, op.rtl);
                        self.track_push(code, [(taken - 1) as isize, pos_data(give_back), 0]);
                    }
                    Step::Next
                }
                (OpCode::CharLoop, Reentry::Backtracking) => {
                    let remaining = data[0];
                    pos = data[1] as usize;
                    if remaining > 0 {
                        let give_back = back_one(input, pos, op.rtl);
                        self.track_push(code, [remaining - 1, pos_data(give_back), 0]);
                    }
                    Step::Next
                }

                (OpCode::CharLazy, Reentry::Forward) => {
                    if op.count() > 0 && forward_char(input, pos, op.rtl).is_some() {
                        self.track_push(code, [(op.count() - 1) as isize, pos_data(pos), 0]);
                    }
                    Step::Next
                }
                (OpCode::CharLazy, Reentry::Backtracking) => {
                    pos = data[1] as usize;
                    match forward_char(input, pos, op.rtl) {
                        Some((c, next)) if self.atom_matches(op.atom(), op.ci, c) => {
                            pos = next;
                            if data[0] > 0 {
                                self.track_push(code, [data[0] - 1, pos_data(pos), 0]);
                            }
                            Step::Next
                        }
                        _ => Step::Backtrack,
                    }
                }

                (opcode, reentry) => {
                    panic!("malformed program: {:?} entered as {:?} at {}", opcode, reentry, code)
                }
            };

            match step {
                Step::Next => {
                    code += 1;
                    entry = Reentry::Forward;
                }
                Step::Goto(target) => {
                    code = target;
                    entry = Reentry::Forward;
                }
                Step::Backtrack => {
                    self.base.check_timeout()?;
                    match self.track.pop() {
                        Some(frame) => {
                            code = frame.code;
                            entry = frame.reentry;
                            data = frame.data;
                        }
                        None => {
                            self.base.text_pos = pos;
                            return Ok(false);
                        }
                    }
                }
            }
        }
    }
}

impl RegexRunner for RegexInterpreter {
    fn base(&mut self) -> &mut RunnerBase {
        &mut self.base
    }

    fn scan(&mut self, input: &str) -> Result<(), RegexError> {
        scan_phased(self, input)
    }
}

impl PhasedMatcher for RegexInterpreter {
    fn try_find_next_possible_starting_position(&mut self, input: &str) -> bool {
        let found = self.program.find.find(
            input,
            self.base.text_pos,
            self.base.text_start,
            &*self.culture,
        );
        match found {
            Some(pos) => {
                self.base.text_pos = pos;
                true
            }
            None => {
                self.base.text_pos = if self.base.right_to_left() { 0 } else { input.len() };
                false
            }
        }
    }

    fn try_match_at_current_position(&mut self, input: &str) -> Result<bool, RegexError> {
        trace!("attempt at {}", self.base.text_pos);
        self.track.clear();
        self.go(input)
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Creates interpreters over one shared program.
pub struct InterpreterFactory {
    program: Arc<RegexProgram>,
    culture: Arc<dyn CaseEquivalence>,
}

impl InterpreterFactory {
    pub fn new(program: Arc<RegexProgram>, culture: Arc<dyn CaseEquivalence>) -> Self {
        InterpreterFactory { program, culture }
    }
}

impl RegexRunnerFactory for InterpreterFactory {
    fn create(&self) -> Box<dyn RegexRunner> {
        Box::new(RegexInterpreter::new(
            Arc::clone(&self.program),
            Arc::clone(&self.culture),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regcomp::{compile_tree, CompileConfig};
    use crate::regenc::{CharClass, InvariantCulture};
    use crate::regtree::{RegexTree, TreeBuilder};

    fn interpreter(tree: &RegexTree) -> RegexInterpreter {
        let program = compile_tree(tree, &InvariantCulture, CompileConfig::default()).unwrap();
        RegexInterpreter::new(Arc::new(program), Arc::new(InvariantCulture))
    }

    fn run(interp: &mut RegexInterpreter, input: &str) -> Option<(usize, usize)> {
        let start = if interp.program().right_to_left() { input.len() } else { 0 };
        interp.base().prepare(start, start, None);
        interp.scan(input).unwrap();
        interp.base().take_match().map(|m| m.span())
    }

    #[test]
    fn forward_char_both_directions() {
        assert_eq!(forward_char("aé", 1, false), Some(('é', 3)));
        assert_eq!(forward_char("aé", 3, true), Some(('é', 1)));
        assert_eq!(forward_char("aé", 3, false), None);
        assert_eq!(forward_char("aé", 0, true), None);
    }

    #[test]
    fn greedy_loop_gives_back_one() {
        // a+ab over "aaab": one CharLoop frame is consumed
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let a = b.one('a');
        let a_plus = b.plus(a);
        let s = b.multi("ab");
        let body = b.concat([a_plus, s]);
        let tree = b.finish(body);
        let mut interp = interpreter(&tree);
        assert_eq!(run(&mut interp, "aaab"), Some((0, 4)));
    }

    #[test]
    fn failed_scan_leaves_stacks_empty() {
        // (a|b)*c over "abab"
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let a = b.one('a');
        let bb = b.one('b');
        let alt = b.alternate([a, bb]);
        let cap = b.capture(1, alt);
        let star = b.star(cap);
        let c = b.one('c');
        let body = b.concat([star, c]);
        let tree = b.finish(body);
        let mut interp = interpreter(&tree);

        interp.base().prepare(0, 0, None);
        interp.base().text_pos = 0;
        interp.track.clear();
        assert!(!interp.go("abab").unwrap());
        assert_eq!(interp.stack_depths(), (0, 0, 0));
        assert_eq!(run(&mut interp, "abab"), None);
    }

    #[test]
    fn lazy_char_loop_takes_minimum() {
        // <.+?>
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let lt = b.one('<');
        let dot = b.set(CharClass::not_newline());
        let lazy = b.lazy_plus(dot);
        let gt = b.one('>');
        let body = b.concat([lt, lazy, gt]);
        let tree = b.finish(body);
        let mut interp = interpreter(&tree);
        assert_eq!(run(&mut interp, "<a><b>"), Some((0, 3)));
    }

    #[test]
    fn right_to_left_scan() {
        let mut b = TreeBuilder::new(RegexOptions::RIGHT_TO_LEFT);
        let d = b.set(CharClass::digit());
        let plus = b.plus(d);
        let tree = b.finish(plus);
        let mut interp = interpreter(&tree);
        assert_eq!(run(&mut interp, "12ab345c"), Some((4, 3)));
    }

    #[test]
    fn word_boundaries() {
        let mut b = TreeBuilder::new(RegexOptions::empty());
        let l = b.anchor(crate::regtree::Anchor::Boundary);
        let s = b.multi("cat");
        let r = b.anchor(crate::regtree::Anchor::Boundary);
        let body = b.concat([l, s, r]);
        let tree = b.finish(body);
        let mut interp = interpreter(&tree);
        assert_eq!(run(&mut interp, "concat cat"), Some((7, 3)));
        assert_eq!(run(&mut interp, "cats"), None);
    }
}
