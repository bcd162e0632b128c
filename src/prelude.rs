// prelude.rs - Convenient re-exports.
//
//! # Prelude
//!
//! ```
//! use rxvm::prelude::*;
//!
//! let mut b = TreeBuilder::new(RegexOptions::empty());
//! let d = b.set(CharClass::digit());
//! let body = b.plus(d);
//! let re = Regex::from_tree(&b.finish(body)).unwrap();
//! let m = re.find("answer: 42").unwrap().unwrap();
//! assert_eq!(m.as_str(), "42");
//! ```

pub use crate::api::{Capture, Group, Match, Matches, Regex, RegexBuilder};
pub use crate::error::RegexError;
pub use crate::regenc::{CaseEquivalence, CharClass, InvariantCulture, TurkishCulture};
pub use crate::regint::RegexOptions;
pub use crate::regtree::{Anchor, RegexTree, TreeBuilder};
pub use crate::runner::{default_match_timeout, set_default_match_timeout};
