// compiled.rs - Runner whose scan is a supplied routine.
//
// The routine receives the runner state, a table of precomputed
// class-membership tests and the culture, and must honour the same
// contract as the interpreter: record captures through `RunnerBase`,
// leave group 0 set on success, poll the timeout.

use std::fmt;
use std::sync::Arc;

use crate::error::RegexError;
use crate::regenc::{is_char_in_class, CaseEquivalence, CharClass, InvariantCulture};
use crate::runner::{RegexRunner, RegexRunnerFactory, RunnerBase};

/// A class-membership test.
pub type SetLookup = Box<dyn Fn(char) -> bool + Send + Sync>;

/// Signature of a delegated scan routine.
pub type ScanRoutine = dyn Fn(&mut RunnerBase, &CompiledTables, &str) -> Result<(), RegexError> + Send + Sync;

/// Read-only data shared by every runner of one compiled pattern.
pub struct CompiledTables {
    set_lookups: Vec<SetLookup>,
    culture: Arc<dyn CaseEquivalence>,
}

impl CompiledTables {
    pub fn new(culture: Arc<dyn CaseEquivalence>) -> Self {
        CompiledTables {
            set_lookups: Vec::new(),
            culture,
        }
    }

    /// Tables with one lookup per class, in order.
    pub fn from_classes(classes: Vec<CharClass>, culture: Arc<dyn CaseEquivalence>) -> Self {
        let mut tables = CompiledTables::new(culture);
        for class in classes {
            tables = tables.with_set(move |c| is_char_in_class(c, &class));
        }
        tables
    }

    pub fn with_set<F>(mut self, lookup: F) -> Self
    where
        F: Fn(char) -> bool + Send + Sync + 'static,
    {
        self.set_lookups.push(Box::new(lookup));
        self
    }

    #[inline]
    pub fn is_in_set(&self, set: usize, c: char) -> bool {
        (self.set_lookups[set])(c)
    }

    pub fn set_count(&self) -> usize {
        self.set_lookups.len()
    }

    pub fn culture(&self) -> &dyn CaseEquivalence {
        &*self.culture
    }
}

impl Default for CompiledTables {
    fn default() -> Self {
        CompiledTables::new(Arc::new(InvariantCulture))
    }
}

impl fmt::Debug for CompiledTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTables")
            .field("sets", &self.set_lookups.len())
            .field("culture", &self.culture)
            .finish()
    }
}

pub struct CompiledRegexRunner {
    base: RunnerBase,
    scan: Arc<ScanRoutine>,
    tables: Arc<CompiledTables>,
}

impl CompiledRegexRunner {
    pub fn new(
        base: RunnerBase,
        scan: Arc<ScanRoutine>,
        tables: Arc<CompiledTables>,
    ) -> Self {
        CompiledRegexRunner { base, scan, tables }
    }
}

impl RegexRunner for CompiledRegexRunner {
    fn base(&mut self) -> &mut RunnerBase {
        &mut self.base
    }

    fn scan(&mut self, input: &str) -> Result<(), RegexError> {
        (self.scan)(&mut self.base, &self.tables, input)
    }
}

pub struct CompiledRegexRunnerFactory {
    scan: Arc<ScanRoutine>,
    tables: Arc<CompiledTables>,
    cap_count: usize,
    right_to_left: bool,
}

impl CompiledRegexRunnerFactory {
    pub fn new<F>(scan: F, tables: CompiledTables, cap_count: usize, right_to_left: bool) -> Self
    where
        F: Fn(&mut RunnerBase, &CompiledTables, &str) -> Result<(), RegexError> + Send + Sync + 'static,
    {
        CompiledRegexRunnerFactory {
            scan: Arc::new(scan),
            tables: Arc::new(tables),
            cap_count,
            right_to_left,
        }
    }
}

impl RegexRunnerFactory for CompiledRegexRunnerFactory {
    fn create(&self) -> Box<dyn RegexRunner> {
        Box::new(CompiledRegexRunner::new(
            RunnerBase::new(self.cap_count, self.right_to_left),
            Arc::clone(&self.scan),
            Arc::clone(&self.tables),
        ))
    }
}
