//! # rxvm
//!
//! A backtracking regular-expression virtual machine with .NET semantics:
//! balancing groups, right-to-left matching, atomic groups, conditionals,
//! capture histories and culture-aware case folding.
//!
//! Patterns arrive as already-parsed trees. A static analysis marks the
//! nodes whose backtracking can be skipped, the writer turns the tree into
//! a linear opcode program, and the interpreter runs that program with
//! explicit stacks instead of native recursion. Runners that skip the
//! interpreter (delegated scan routines, hand-specialized matchers) plug
//! into the same `Regex` surface.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxvm::prelude::*;
//!
//! // (\d{4})-(\d{2})
//! let mut b = TreeBuilder::new(RegexOptions::empty());
//! let d = b.set(CharClass::digit());
//! let year = b.repeat(d, 4, 4);
//! let year = b.capture(1, year);
//! let dash = b.one('-');
//! let d = b.set(CharClass::digit());
//! let month = b.repeat(d, 2, 2);
//! let month = b.capture(2, month);
//! let body = b.concat([year, dash, month]);
//! let re = Regex::from_tree(&b.finish(body)).unwrap();
//!
//! let m = re.find("Date: 2026-02").unwrap().unwrap();
//! assert_eq!(m.as_str(), "2026-02");
//! assert_eq!(m.group(1).unwrap().as_str(), "2026");
//! assert_eq!(re.replace("2026-02", "$2/$1").unwrap(), "02/2026");
//! ```
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`regtree`] | Pattern tree and builder |
//! | [`reganalyze`] | Atomicity / backtracking analysis |
//! | [`regint`] | Opcodes, operations, programs |
//! | [`regcomp`] | Tree-to-program writer |
//! | [`regfind`] | Starting-position pre-filter |
//! | [`runner`] | Runner state and contract, timeouts |
//! | [`regexec`] | Backtracking interpreter |
//! | [`compiled`] | Runner over a supplied scan routine |
//! | [`generated`] | Hand-specialized matchers |
//! | [`regreplace`] | Replacement templates |
//! | [`regenc`] | Character classes and case folding |
//! | [`api`] | `Regex`, `Match`, `Group` |

pub mod api;
pub mod compiled;
pub mod error;
pub mod generated;
pub mod prelude;
pub mod reganalyze;
pub mod regcomp;
pub mod regenc;
pub mod regexec;
pub mod regfind;
pub mod regint;
pub mod regreplace;
pub mod regtree;
pub mod runner;
