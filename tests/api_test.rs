// api_test.rs - Integration tests for the public Regex API.

use std::sync::Arc;
use std::time::Duration;

use rxvm::generated;
use rxvm::prelude::*;
use rxvm::regtree::NodeId;

fn build<F>(options: RegexOptions, body: F) -> RegexTree
where
    F: FnOnce(&mut TreeBuilder) -> NodeId,
{
    let mut b = TreeBuilder::new(options);
    let node = body(&mut b);
    b.finish(node)
}

fn compile<F>(body: F) -> Regex
where
    F: FnOnce(&mut TreeBuilder) -> NodeId,
{
    Regex::from_tree(&build(RegexOptions::empty(), body)).unwrap()
}

/// `\d+`
fn digits() -> Regex {
    compile(|b| {
        let d = b.set(CharClass::digit());
        b.plus(d)
    })
}

// === Matching ===

#[test]
fn simple_find() {
    let re = digits();
    let m = re.find("abc 123 def").unwrap().unwrap();
    assert_eq!(m.as_str(), "123");
    assert_eq!((m.start(), m.end()), (4, 7));
    assert_eq!(m.range(), 4..7);
    assert_eq!(m.len(), 3);
}

#[test]
fn no_match_returns_none() {
    let re = digits();
    assert!(re.find("abc").unwrap().is_none());
    assert!(!re.is_match("abc").unwrap());
    assert!(re.is_match("a1").unwrap());
}

#[test]
fn empty_pattern() {
    let re = compile(|b| b.empty());
    let m = re.find("hello").unwrap().unwrap();
    assert_eq!(m.start(), 0);
    assert_eq!(m.end(), 0);
    assert!(m.is_empty());
    assert_eq!(re.find_iter("ab").count(), 3);
}

#[test]
fn find_at_uses_byte_offsets() {
    let re = digits();
    let text = "1 é 22";
    let m = re.find_at(text, 1).unwrap().unwrap();
    assert_eq!(m.as_str(), "22");
    assert_eq!(m.start(), 5);

    // 'é' is two bytes wide
    let err = re.find_at(text, 3).unwrap_err();
    assert!(matches!(err, RegexError::InvalidArgument { name: "startat", .. }));
    assert!(re.find_at(text, 99).is_err());
    assert!(re.find_at(text, text.len()).unwrap().is_none());
}

#[test]
fn match_context() {
    let re = digits();
    let m = re.find("abc 123 def").unwrap().unwrap();
    assert_eq!(m.left(), "abc ");
    assert_eq!(m.right(), " def");
    assert_eq!(m.text(), "abc 123 def");
}

#[test]
fn find_iter_collects_all() {
    let re = digits();
    let found: Vec<&str> = re
        .find_iter("1 22 333")
        .map(|m| m.unwrap().as_str())
        .collect();
    assert_eq!(found, vec!["1", "22", "333"]);

    let from_two: Vec<usize> = re
        .find_iter_at("1 22 333", 2)
        .unwrap()
        .map(|m| m.unwrap().start())
        .collect();
    assert_eq!(from_two, vec![2, 5]);
}

// === Groups ===

#[test]
fn groups_and_names() {
    // (?<year>\d{4})-(\d{2})?
    let re = compile(|b| {
        let d = b.set(CharClass::digit());
        let y = b.repeat(d, 4, 4);
        let year = b.named_capture(1, "year", y);
        let dash = b.one('-');
        let d2 = b.set(CharClass::digit());
        let m = b.repeat(d2, 2, 2);
        let month = b.capture(2, m);
        let month = b.optional(month);
        b.concat([year, dash, month])
    });
    assert_eq!(re.groups_len(), 3);
    assert_eq!(re.group_number("year"), Some(1));
    assert_eq!(re.group_number("month"), None);
    assert_eq!(re.group_name(1), Some("year"));
    assert_eq!(re.group_name(2), None);

    let m = re.find("in 2026-xx").unwrap().unwrap();
    assert_eq!(m.as_str(), "2026-");
    assert_eq!(m.groups_len(), 3);
    assert_eq!(m.last_group(), 2);
    assert_eq!(m.name("year").unwrap().as_str(), "2026");
    assert_eq!(m.group(1).unwrap().range(), 3..7);
    assert!(m.group(2).is_none());
    assert!(m.group(9).is_none());
    assert!(m.name("nope").is_none());

    let m = re.find("2026-02").unwrap().unwrap();
    assert_eq!(m.group(2).unwrap().as_str(), "02");
}

#[test]
fn group_capture_history() {
    // (\w)+
    let re = compile(|b| {
        let w = b.set(CharClass::word());
        let g = b.capture(1, w);
        b.plus(g)
    });
    let m = re.find("abc!").unwrap().unwrap();
    let g = m.group(1).unwrap();
    assert_eq!(g.as_str(), "c");
    let caps: Vec<&str> = g.captures().map(|c| c.as_str()).collect();
    assert_eq!(caps, vec!["a", "b", "c"]);
    assert_eq!(g.captures().len(), 3);
    let first = g.captures().next().unwrap();
    assert_eq!((first.start(), first.end()), (0, 1));
}

// === Builder ===

#[test]
fn builder_timeouts() {
    let tree = build(RegexOptions::empty(), |b| b.one('a'));
    let re = Regex::builder(&tree)
        .timeout(Duration::from_millis(250))
        .build()
        .unwrap();
    assert_eq!(re.match_timeout(), Some(Duration::from_millis(250)));

    let re = Regex::builder(&tree).no_timeout().build().unwrap();
    assert_eq!(re.match_timeout(), None);

    let re = re.with_timeout(Some(Duration::from_secs(2)));
    assert_eq!(re.match_timeout(), Some(Duration::from_secs(2)));
    assert!(re.is_match("cat").unwrap());
}

#[test]
fn process_default_timeout() {
    let tree = build(RegexOptions::empty(), |b| b.one('a'));

    set_default_match_timeout(Some(Duration::from_secs(30)));
    assert_eq!(default_match_timeout(), Some(Duration::from_secs(30)));
    let re = Regex::from_tree(&tree).unwrap();
    assert_eq!(re.match_timeout(), Some(Duration::from_secs(30)));

    set_default_match_timeout(None);
    assert_eq!(default_match_timeout(), None);
    // resolved at construction
    assert_eq!(re.match_timeout(), Some(Duration::from_secs(30)));
    let re = Regex::from_tree(&tree).unwrap();
    assert_eq!(re.match_timeout(), None);
}

#[test]
fn strict_analysis_reports_depth_limit() {
    // (?>(?>...(?>x)...))c*
    let tree = build(RegexOptions::empty(), |b| {
        let mut node = b.one('x');
        for _ in 0..8 {
            node = b.atomic(node);
        }
        let c = b.one('c');
        let star = b.star(c);
        b.concat([node, star])
    });

    let err = Regex::builder(&tree)
        .analysis_depth_limit(4)
        .strict_analysis(true)
        .build()
        .unwrap_err();
    assert_eq!(err, RegexError::AnalysisIncomplete { depth_limit: 4 });
    assert!(!err.is_timeout());

    let re = Regex::builder(&tree)
        .analysis_depth_limit(4)
        .build()
        .unwrap();
    assert!(!re.program().unwrap().analysis.complete());
    assert_eq!(re.find("-xccc-").unwrap().unwrap().as_str(), "xccc");
}

#[test]
fn cultures() {
    let tree = build(RegexOptions::IGNORE_CASE, |b| b.multi("istanbul"));

    let turkish = Regex::builder(&tree)
        .culture(Arc::new(TurkishCulture))
        .build()
        .unwrap();
    assert!(turkish.is_match("İSTANBUL").unwrap());
    assert!(!turkish.is_match("ISTANBUL").unwrap());

    let invariant = Regex::from_tree(&tree).unwrap();
    assert!(invariant.is_match("ISTANBUL").unwrap());
    assert!(!invariant.is_match("İSTANBUL").unwrap());

    // CULTURE_INVARIANT overrides the builder's culture
    let tree = build(
        RegexOptions::IGNORE_CASE | RegexOptions::CULTURE_INVARIANT,
        |b| b.multi("istanbul"),
    );
    let forced = Regex::builder(&tree)
        .culture(Arc::new(TurkishCulture))
        .build()
        .unwrap();
    assert!(forced.is_match("ISTANBUL").unwrap());
    assert!(!forced.is_match("İSTANBUL").unwrap());
}

// === Properties ===

#[test]
fn options_and_program() {
    let tree = build(RegexOptions::RIGHT_TO_LEFT, |b| b.one('a'));
    let re = Regex::from_tree(&tree).unwrap();
    assert!(re.right_to_left());
    assert!(re.options().contains(RegexOptions::RIGHT_TO_LEFT));
    assert!(re.program().is_some());

    let date = generated::iso_date();
    assert!(date.program().is_none());
    assert!(!date.right_to_left());
    assert_eq!(date.groups_len(), 4);
}

#[test]
fn regex_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Regex>();

    let re = Arc::new(digits());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let re = Arc::clone(&re);
            std::thread::spawn(move || {
                let text = format!("thread {} says {}", i, i * 11);
                re.find(&text).unwrap().map(|m| m.as_str().to_string())
            })
        })
        .collect();
    let mut results: Vec<String> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();
    results.sort();
    assert_eq!(results, vec!["0", "1", "2", "3"]);
}

#[test]
fn debug_formats() {
    let re = digits();
    let dbg = format!("{:?}", re);
    assert!(dbg.starts_with("Regex"));
    assert!(dbg.contains("groups"));

    let m = re.find("x42").unwrap().unwrap();
    let dbg = format!("{:?}", m);
    assert!(dbg.contains("start: 1"));
    assert!(dbg.contains("\"42\""));
}
