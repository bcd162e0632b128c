// regint.rs - Internal types: options, OpCode, Operation, RegexProgram.
//
// The compiled program is the contract between regcomp (writer) and
// regexec (interpreter). Jump targets are indices into the same `ops`
// vector; the writer guarantees they are valid and the interpreter trusts it.

use std::fmt;

use bitflags::bitflags;

use crate::reganalyze::AnalysisResults;
use crate::regenc::CharClass;
use crate::regfind::FindOptimizations;
use crate::regtree::CaptureNames;

// === Config Constants ===
pub const INFINITE_REPEAT: i32 = i32::MAX;
pub const DEFAULT_ANALYSIS_DEPTH_LIMIT: u32 = 1024;
pub const CHECK_TIMEOUT_INTERVAL: u32 = 512;

#[inline]
pub fn is_infinite_repeat(n: i32) -> bool {
    n == INFINITE_REPEAT
}

bitflags! {
    /// Pattern and node options.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RegexOptions: u32 {
        const IGNORE_CASE = 1 << 0;
        const RIGHT_TO_LEFT = 1 << 1;
        /// Unmatched backreferences match empty; `\b` uses ASCII word characters.
        const ECMA_SCRIPT = 1 << 2;
        /// Fold case with the invariant culture regardless of the configured one.
        const CULTURE_INVARIANT = 1 << 3;
    }
}

// === Single-character atoms ===

/// What a single-character opcode tests: a literal, its negation, or a
/// class from the program's class table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharAtom {
    One(char),
    Notone(char),
    Set(usize),
}

// === OpCode Enum ===
//
// Single-character repetition is one family parameterized by `CharAtom`
// instead of separate one/notone/set opcodes; the greedy/lazy/atomic split
// is kept because it decides which backtrack frames get pushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // consuming
    Char = 0,
    Multi = 1,
    CharRep = 2,
    CharLoop = 3,
    CharLoopAtomic = 4,
    CharLazy = 5,
    Backreference = 6,

    // zero-width
    Bol = 10,
    Eol = 11,
    Boundary = 12,
    NonBoundary = 13,
    EcmaBoundary = 14,
    NonEcmaBoundary = 15,
    Beginning = 16,
    Start = 17,
    EndZ = 18,
    End = 19,

    // control
    Nothing = 22,
    Goto = 23,
    Stop = 24,
    Lazybranch = 25,
    Setmark = 26,
    Nullmark = 27,
    Getmark = 28,
    Capturemark = 29,
    Branchmark = 30,
    Lazybranchmark = 31,
    Setcount = 32,
    Nullcount = 33,
    Branchcount = 34,
    Lazybranchcount = 35,
    Setjump = 36,
    Backjump = 37,
    Forejump = 38,
    TestBackreference = 39,
}

// === Operation (Bytecode Instruction) ===

pub struct Operation {
    pub opcode: OpCode,
    pub payload: OperationPayload,
    /// Consume right-to-left.
    pub rtl: bool,
    /// Compare case-insensitively.
    pub ci: bool,
}

pub enum OperationPayload {
    None,
    Atom {
        atom: CharAtom,
    },
    AtomCount {
        atom: CharAtom,
        count: i32,
    },
    Multi {
        s: Box<str>,
    },
    Group {
        num: usize,
    },
    Jump {
        addr: usize,
    },
    CountedJump {
        addr: usize,
        limit: i32,
    },
    Count {
        initial: i32,
    },
    Capture {
        num: Option<usize>,
        uncapture: Option<usize>,
    },
}

impl Operation {
    pub fn new(opcode: OpCode, payload: OperationPayload) -> Self {
        Operation {
            opcode,
            payload,
            rtl: false,
            ci: false,
        }
    }

    #[cold]
    #[inline(never)]
    fn malformed(&self, what: &str) -> ! {
        panic!("malformed program: {:?} has no {} operand", self.opcode, what)
    }

    #[inline]
    pub fn jump(&self) -> usize {
        match self.payload {
            OperationPayload::Jump { addr } | OperationPayload::CountedJump { addr, .. } => addr,
            _ => self.malformed("jump"),
        }
    }

    #[inline]
    pub fn limit(&self) -> i32 {
        match self.payload {
            OperationPayload::CountedJump { limit, .. } => limit,
            _ => self.malformed("limit"),
        }
    }

    #[inline]
    pub fn atom(&self) -> CharAtom {
        match self.payload {
            OperationPayload::Atom { atom } | OperationPayload::AtomCount { atom, .. } => atom,
            _ => self.malformed("atom"),
        }
    }

    #[inline]
    pub fn count(&self) -> i32 {
        match self.payload {
            OperationPayload::AtomCount { count, .. } => count,
            OperationPayload::Count { initial } => initial,
            _ => self.malformed("count"),
        }
    }

    #[inline]
    pub fn group(&self) -> usize {
        match self.payload {
            OperationPayload::Group { num } => num,
            _ => self.malformed("group"),
        }
    }

    #[inline]
    pub fn multi(&self) -> &str {
        match &self.payload {
            OperationPayload::Multi { s } => s,
            _ => self.malformed("string"),
        }
    }

    #[inline]
    pub fn capture(&self) -> (Option<usize>, Option<usize>) {
        match self.payload {
            OperationPayload::Capture { num, uncapture } => (num, uncapture),
            _ => self.malformed("capture"),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.opcode)?;
        if self.rtl {
            f.write_str("-Rtl")?;
        }
        if self.ci {
            f.write_str("-Ci")?;
        }
        match &self.payload {
            OperationPayload::None => Ok(()),
            OperationPayload::Atom { atom } => write!(f, "({:?})", atom),
            OperationPayload::AtomCount { atom, count } if is_infinite_repeat(*count) => {
                write!(f, "({:?}, inf)", atom)
            }
            OperationPayload::AtomCount { atom, count } => write!(f, "({:?}, {})", atom, count),
            OperationPayload::Multi { s } => write!(f, "({:?})", s),
            OperationPayload::Group { num } => write!(f, "({})", num),
            OperationPayload::Jump { addr } => write!(f, "(-> {})", addr),
            OperationPayload::CountedJump { addr, limit } if is_infinite_repeat(*limit) => {
                write!(f, "(-> {}, inf)", addr)
            }
            OperationPayload::CountedJump { addr, limit } => write!(f, "(-> {}, {})", addr, limit),
            OperationPayload::Count { initial } => write!(f, "({})", initial),
            OperationPayload::Capture { num, uncapture } => {
                write!(f, "({:?}, {:?})", num, uncapture)
            }
        }
    }
}

// === RegexProgram ===

/// A compiled pattern: opcode sequence plus everything a matcher needs
/// to run it. Immutable and shared read-only across threads.
pub struct RegexProgram {
    pub ops: Vec<Operation>,
    pub classes: Vec<CharClass>,
    pub cap_count: usize,
    pub cap_names: CaptureNames,
    pub options: RegexOptions,
    pub find: FindOptimizations,
    pub analysis: AnalysisResults,
}

impl RegexProgram {
    #[inline]
    pub fn right_to_left(&self) -> bool {
        self.options.contains(RegexOptions::RIGHT_TO_LEFT)
    }
}

impl fmt::Debug for RegexProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RegexProgram ({} groups, {:?})", self.cap_count, self.find)?;
        for (i, op) in self.ops.iter().enumerate() {
            writeln!(f, "{:4}: {:?}", i, op)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_accessors() {
        let op = Operation::new(
            OpCode::CharLoop,
            OperationPayload::AtomCount {
                atom: CharAtom::One('a'),
                count: INFINITE_REPEAT,
            },
        );
        assert_eq!(op.atom(), CharAtom::One('a'));
        assert!(is_infinite_repeat(op.count()));
        assert_eq!(format!("{:?}", op), "CharLoop(One('a'), inf)");
    }

    #[test]
    fn debug_flags() {
        let mut op = Operation::new(OpCode::Char, OperationPayload::Atom { atom: CharAtom::Set(0) });
        op.rtl = true;
        op.ci = true;
        assert_eq!(format!("{:?}", op), "Char-Rtl-Ci(Set(0))");
    }

    #[test]
    #[should_panic(expected = "malformed program")]
    fn missing_operand_panics() {
        let op = Operation::new(OpCode::Goto, OperationPayload::None);
        op.jump();
    }
}
