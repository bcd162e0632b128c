// api.rs - Public surface of rxvm.
//
// Wraps the runner machinery with Rust-native types: Regex, RegexBuilder,
// Match, Group, Capture, Matches. A `Regex` keeps one cached runner and
// rents it out per scan; concurrent scans fall back to fresh runners.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::RegexError;
use crate::regcomp::{compile_tree, CompileConfig};
use crate::regenc::{CaseEquivalence, InvariantCulture};
use crate::regexec::InterpreterFactory;
use crate::regint::{RegexOptions, RegexProgram};
use crate::regreplace::{replace_with_evaluator, RegexReplacement};
use crate::regtree::{CaptureNames, RegexTree};
use crate::runner::{bump, default_match_timeout, MatchSpans, RegexRunner, RegexRunnerFactory};

/// A compiled regular expression.
///
/// # Examples
///
/// ```
/// use rxvm::prelude::*;
///
/// // (\d+)
/// let mut b = TreeBuilder::new(RegexOptions::empty());
/// let digit = b.set(CharClass::digit());
/// let digits = b.plus(digit);
/// let body = b.capture(1, digits);
/// let re = Regex::from_tree(&b.finish(body)).unwrap();
///
/// let m = re.find("hello 42").unwrap().unwrap();
/// assert_eq!(m.as_str(), "42");
/// assert_eq!(m.start(), 6);
/// assert_eq!(m.end(), 8);
/// ```
pub struct Regex {
    factory: Arc<dyn RegexRunnerFactory>,
    runner: Mutex<Option<Box<dyn RegexRunner>>>,
    cap_count: usize,
    cap_names: Arc<CaptureNames>,
    options: RegexOptions,
    timeout: Option<Duration>,
    program: Option<Arc<RegexProgram>>,
    replacement: Mutex<Option<Arc<RegexReplacement>>>,
}

fn check_startat(text: &str, startat: usize) -> Result<(), RegexError> {
    if startat > text.len() {
        return Err(RegexError::invalid_argument(
            "startat",
            format!("{} is past the end of a {}-byte input", startat, text.len()),
        ));
    }
    if !text.is_char_boundary(startat) {
        return Err(RegexError::invalid_argument(
            "startat",
            format!("{} is not on a character boundary", startat),
        ));
    }
    Ok(())
}

fn check_count(count: i32) -> Result<(), RegexError> {
    if count < -1 {
        return Err(RegexError::invalid_argument(
            "count",
            format!("{} is less than -1", count),
        ));
    }
    Ok(())
}

impl Regex {
    /// Compiles a pattern tree with default settings.
    pub fn from_tree(tree: &RegexTree) -> Result<Regex, RegexError> {
        RegexBuilder::new(tree).build()
    }

    /// Create a [`RegexBuilder`] for fine-grained control over compilation.
    pub fn builder(tree: &RegexTree) -> RegexBuilder<'_> {
        RegexBuilder::new(tree)
    }

    /// Wraps a runner factory, e.g. a delegated scan routine or a
    /// specialized matcher. Uses the process-wide default timeout.
    pub fn from_factory(
        factory: Arc<dyn RegexRunnerFactory>,
        cap_count: usize,
        cap_names: CaptureNames,
        options: RegexOptions,
    ) -> Regex {
        Regex {
            factory,
            runner: Mutex::new(None),
            cap_count,
            cap_names: Arc::new(cap_names),
            options,
            timeout: default_match_timeout(),
            program: None,
            replacement: Mutex::new(None),
        }
    }

    /// Replaces the match timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Regex {
        self.timeout = timeout;
        self
    }

    // === Properties ===

    pub fn options(&self) -> RegexOptions {
        self.options
    }

    #[inline]
    pub fn right_to_left(&self) -> bool {
        self.options.contains(RegexOptions::RIGHT_TO_LEFT)
    }

    pub fn match_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Number of groups, including group 0.
    pub fn groups_len(&self) -> usize {
        self.cap_count
    }

    pub fn group_number(&self, name: &str) -> Option<usize> {
        self.cap_names.number(name).filter(|&n| n < self.cap_count)
    }

    pub fn group_name(&self, group: usize) -> Option<&str> {
        self.cap_names.name(group)
    }

    /// The interpreted program, when the regex was compiled from a tree.
    pub fn program(&self) -> Option<&RegexProgram> {
        self.program.as_deref()
    }

    // === Scanning ===

    /// Runs one scan with a rented runner.
    fn run(
        &self,
        text: &str,
        text_start: usize,
        text_pos: usize,
    ) -> Result<Option<MatchSpans>, RegexError> {
        let cached = self.runner.lock().ok().and_then(|mut slot| slot.take());
        let mut runner = cached.unwrap_or_else(|| self.factory.create());

        runner.base().prepare(text_start, text_pos, self.timeout);
        let result = runner.scan(text).map(|()| runner.base().take_match());

        if let Ok(mut slot) = self.runner.lock() {
            *slot = Some(runner);
        }
        result
    }

    fn default_start(&self, text: &str) -> usize {
        if self.right_to_left() {
            text.len()
        } else {
            0
        }
    }

    fn wrap<'t>(&self, text: &'t str, spans: MatchSpans) -> Match<'t> {
        Match {
            text,
            spans,
            names: Arc::clone(&self.cap_names),
        }
    }

    /// Check whether `text` matches the pattern anywhere.
    pub fn is_match(&self, text: &str) -> Result<bool, RegexError> {
        let start = self.default_start(text);
        Ok(self.run(text, start, start)?.is_some())
    }

    /// Return the first match in `text`, scanning from the start (or from
    /// the end for a right-to-left pattern).
    pub fn find<'t>(&self, text: &'t str) -> Result<Option<Match<'t>>, RegexError> {
        let start = self.default_start(text);
        Ok(self.run(text, start, start)?.map(|s| self.wrap(text, s)))
    }

    /// Return the first match found scanning from byte offset `startat`.
    pub fn find_at<'t>(&self, text: &'t str, startat: usize) -> Result<Option<Match<'t>>, RegexError> {
        check_startat(text, startat)?;
        Ok(self.run(text, startat, startat)?.map(|s| self.wrap(text, s)))
    }

    /// Iterate over all non-overlapping matches in `text`.
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> Matches<'r, 't> {
        Matches::new(self, text, self.default_start(text))
    }

    /// Iterate over all non-overlapping matches found from `startat`.
    pub fn find_iter_at<'r, 't>(
        &'r self,
        text: &'t str,
        startat: usize,
    ) -> Result<Matches<'r, 't>, RegexError> {
        check_startat(text, startat)?;
        Ok(Matches::new(self, text, startat))
    }

    // === Replacement ===

    /// The compiled form of `template`, reusing the last one if it matches.
    pub fn replacement(&self, template: &str) -> Arc<RegexReplacement> {
        if let Ok(cached) = self.replacement.lock() {
            if let Some(r) = cached.as_ref().filter(|r| r.pattern() == template) {
                return Arc::clone(r);
            }
        }
        let compiled = Arc::new(RegexReplacement::parse(
            template,
            self.cap_count,
            &self.cap_names,
        ));
        if let Ok(mut cached) = self.replacement.lock() {
            *cached = Some(Arc::clone(&compiled));
        }
        compiled
    }

    /// Replace every match in `text` with the expansion of `template`.
    ///
    /// ```
    /// use rxvm::prelude::*;
    ///
    /// // (foo)(bar)
    /// let mut b = TreeBuilder::new(RegexOptions::empty());
    /// let foo = b.multi("foo");
    /// let g1 = b.capture(1, foo);
    /// let bar = b.multi("bar");
    /// let g2 = b.capture(2, bar);
    /// let body = b.concat([g1, g2]);
    /// let re = Regex::from_tree(&b.finish(body)).unwrap();
    ///
    /// assert_eq!(re.replace("foobar", "$2-$1").unwrap(), "bar-foo");
    /// ```
    pub fn replace<'t>(&self, text: &'t str, template: &str) -> Result<Cow<'t, str>, RegexError> {
        let startat = self.default_start(text);
        self.replacen(text, template, -1, startat)
    }

    /// Replace up to `count` matches (`-1` for all) found from `startat`.
    pub fn replacen<'t>(
        &self,
        text: &'t str,
        template: &str,
        count: i32,
        startat: usize,
    ) -> Result<Cow<'t, str>, RegexError> {
        check_count(count)?;
        check_startat(text, startat)?;
        self.replacement(template).replace(self, text, count, startat)
    }

    /// Replace every match with the string `evaluator` computes for it.
    pub fn replace_with<'t, F>(&self, text: &'t str, evaluator: F) -> Result<Cow<'t, str>, RegexError>
    where
        F: FnMut(&Match<'t>) -> String,
    {
        let startat = self.default_start(text);
        self.replacen_with(text, -1, startat, evaluator)
    }

    pub fn replacen_with<'t, F>(
        &self,
        text: &'t str,
        count: i32,
        startat: usize,
        evaluator: F,
    ) -> Result<Cow<'t, str>, RegexError>
    where
        F: FnMut(&Match<'t>) -> String,
    {
        check_count(count)?;
        check_startat(text, startat)?;
        replace_with_evaluator(self, text, count, startat, evaluator)
    }

    // === Splitting ===

    /// Splits `text` at matches. `count` caps the number of pieces
    /// (`0` for no cap); captured groups of each match are included
    /// between the pieces.
    pub fn split<'t>(&self, text: &'t str, count: i32, startat: usize) -> Result<Vec<&'t str>, RegexError> {
        if count < 0 {
            return Err(RegexError::invalid_argument(
                "count",
                format!("{} is negative", count),
            ));
        }
        check_startat(text, startat)?;
        if count == 1 {
            return Ok(vec![text]);
        }
        let mut remaining = if count == 0 { usize::MAX } else { count as usize - 1 };

        let mut pieces = Vec::new();
        let right_to_left = self.right_to_left();
        let mut prevat = if right_to_left { text.len() } else { 0 };
        let mut matched = false;

        for m in self.find_iter_at(text, startat)? {
            let m = m?;
            matched = true;
            if right_to_left {
                pieces.push(&text[m.end()..prevat]);
                prevat = m.start();
            } else {
                pieces.push(&text[prevat..m.start()]);
                prevat = m.end();
            }
            pieces.extend((1..m.groups_len()).filter_map(|i| m.group(i)).map(|g| g.as_str()));
            remaining -= 1;
            if remaining == 0 {
                break;
            }
        }

        if !matched {
            return Ok(vec![text]);
        }
        if right_to_left {
            pieces.push(&text[..prevat]);
            pieces.reverse();
        } else {
            pieces.push(&text[prevat..]);
        }
        Ok(pieces)
    }
}

impl fmt::Debug for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Regex")
            .field("groups", &self.cap_count)
            .field("options", &self.options)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// === RegexBuilder ===

/// Builder for compiling a [`Regex`] with custom settings.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use rxvm::prelude::*;
///
/// let mut b = TreeBuilder::new(RegexOptions::IGNORE_CASE);
/// let lit = b.multi("istanbul");
/// let tree = b.finish(lit);
///
/// let re = Regex::builder(&tree)
///     .culture(Arc::new(TurkishCulture))
///     .timeout(Duration::from_secs(1))
///     .build()
///     .unwrap();
/// assert!(re.is_match("İSTANBUL").unwrap());
/// ```
pub struct RegexBuilder<'a> {
    tree: &'a RegexTree,
    timeout: Option<Duration>,
    culture: Option<Arc<dyn CaseEquivalence>>,
    config: CompileConfig,
}

impl<'a> RegexBuilder<'a> {
    /// Create a new builder for the given tree.
    pub fn new(tree: &'a RegexTree) -> Self {
        RegexBuilder {
            tree,
            timeout: default_match_timeout(),
            culture: None,
            config: CompileConfig::default(),
        }
    }

    /// Abandon matches that run longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Never time out, regardless of the process-wide default.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Case-equivalence rules for `IGNORE_CASE`. Ignored under
    /// `CULTURE_INVARIANT`.
    pub fn culture(mut self, culture: Arc<dyn CaseEquivalence>) -> Self {
        self.culture = Some(culture);
        self
    }

    pub fn analysis_depth_limit(mut self, limit: u32) -> Self {
        self.config.analysis_depth_limit = limit;
        self
    }

    /// Fail with [`RegexError::AnalysisIncomplete`] instead of falling
    /// back to unoptimized code when analysis hits its depth limit.
    pub fn strict_analysis(mut self, yes: bool) -> Self {
        self.config.strict_analysis = yes;
        self
    }

    /// Compile the tree into a [`Regex`].
    pub fn build(self) -> Result<Regex, RegexError> {
        let culture: Arc<dyn CaseEquivalence> = match self.culture {
            Some(c) if !self.tree.options().contains(RegexOptions::CULTURE_INVARIANT) => c,
            _ => Arc::new(InvariantCulture),
        };
        let program = Arc::new(compile_tree(self.tree, &*culture, self.config)?);
        let factory = Arc::new(InterpreterFactory::new(Arc::clone(&program), culture));

        Ok(Regex {
            factory,
            runner: Mutex::new(None),
            cap_count: program.cap_count,
            cap_names: Arc::new(program.cap_names.clone()),
            options: program.options,
            timeout: self.timeout,
            program: Some(program),
            replacement: Mutex::new(None),
        })
    }
}

// === Match ===

/// A single successful match.
#[derive(Clone)]
pub struct Match<'t> {
    text: &'t str,
    spans: MatchSpans,
    names: Arc<CaptureNames>,
}

impl<'t> Match<'t> {
    /// Byte offset of the start of the match.
    pub fn start(&self) -> usize {
        self.spans.span().0
    }

    /// Byte offset of the end of the match (exclusive).
    pub fn end(&self) -> usize {
        let (start, len) = self.spans.span();
        start + len
    }

    pub fn len(&self) -> usize {
        self.spans.span().1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// The matched text.
    pub fn as_str(&self) -> &'t str {
        &self.text[self.range()]
    }

    /// The whole input.
    pub fn text(&self) -> &'t str {
        self.text
    }

    /// Input before the match.
    pub fn left(&self) -> &'t str {
        &self.text[..self.start()]
    }

    /// Input after the match.
    pub fn right(&self) -> &'t str {
        &self.text[self.end()..]
    }

    /// Number of groups, including group 0.
    pub fn groups_len(&self) -> usize {
        self.spans.groups_len()
    }

    /// The highest group number.
    pub fn last_group(&self) -> usize {
        self.spans.last_group()
    }

    /// Group `i`, if it participated in the match.
    pub fn group(&self, i: usize) -> Option<Group<'_, 't>> {
        let (start, len) = self.spans.group(i)?;
        Some(Group {
            text: self.text,
            start,
            len,
            history: self.spans.history(i),
        })
    }

    /// Named group, if it exists and participated.
    pub fn name(&self, name: &str) -> Option<Group<'_, 't>> {
        self.group(self.names.number(name)?)
    }

    /// Expands a replacement template against this match.
    pub fn result(&self, template: &str) -> String {
        RegexReplacement::parse(template, self.groups_len(), &self.names).expand(self)
    }
}

impl fmt::Debug for Match<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("start", &self.start())
            .field("end", &self.end())
            .field("text", &self.as_str())
            .finish()
    }
}

// === Group ===

/// The visible capture of one group, with access to its history.
#[derive(Clone, Copy)]
pub struct Group<'m, 't> {
    text: &'t str,
    start: usize,
    len: usize,
    history: &'m [(usize, usize)],
}

impl<'m, 't: 'm> Group<'m, 't> {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn as_str(&self) -> &'t str {
        &self.text[self.range()]
    }

    /// Every capture the group made, oldest first; the last one is the
    /// group's own value.
    pub fn captures(&self) -> impl ExactSizeIterator<Item = Capture<'t>> + 'm {
        let text = self.text;
        self.history
            .iter()
            .map(move |&(start, len)| Capture { text, start, len })
    }
}

impl fmt::Debug for Group<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("start", &self.start)
            .field("end", &self.end())
            .field("captures", &self.history.len())
            .finish()
    }
}

/// One entry of a group's capture history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capture<'t> {
    text: &'t str,
    start: usize,
    len: usize,
}

impl<'t> Capture<'t> {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn as_str(&self) -> &'t str {
        &self.text[self.start..self.start + self.len]
    }
}

// === Matches ===

/// Iterator over successive matches. Yields an error and stops if a scan
/// times out.
pub struct Matches<'r, 't> {
    regex: &'r Regex,
    text: &'t str,
    /// Where the next scan begins; also the `\G` position.
    text_start: usize,
    prev_empty: bool,
    done: bool,
}

impl<'r, 't> Matches<'r, 't> {
    fn new(regex: &'r Regex, text: &'t str, startat: usize) -> Self {
        Matches {
            regex,
            text,
            text_start: startat,
            prev_empty: false,
            done: false,
        }
    }
}

impl<'r, 't> Iterator for Matches<'r, 't> {
    type Item = Result<Match<'t>, RegexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let right_to_left = self.regex.right_to_left();

        // An empty match must not be found again at the same place.
        let mut pos = self.text_start;
        if self.prev_empty {
            let stop = if right_to_left { 0 } else { self.text.len() };
            if pos == stop {
                self.done = true;
                return None;
            }
            pos = bump(self.text, pos, right_to_left);
        }

        match self.regex.run(self.text, self.text_start, pos) {
            Ok(Some(spans)) => {
                let (start, len) = spans.span();
                self.text_start = if right_to_left { start } else { start + len };
                self.prev_empty = len == 0;
                Some(Ok(self.regex.wrap(self.text, spans)))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Matches<'_, '_> {}
