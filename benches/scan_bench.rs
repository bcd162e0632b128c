// Criterion benchmark suite: interpreter vs specialized matchers, and the
// replacement paths.
//
// Run: cargo bench
// Specific group: cargo bench -- specialized
// HTML report: target/criterion/report/index.html

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rxvm::generated;
use rxvm::prelude::*;
use rxvm::regtree::NodeId;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn tree<F>(options: RegexOptions, build: F) -> RegexTree
where
    F: FnOnce(&mut TreeBuilder) -> NodeId,
{
    let mut b = TreeBuilder::new(options);
    let body = build(&mut b);
    b.finish(body)
}

fn interpreted(tree: &RegexTree) -> Regex {
    Regex::builder(tree)
        .no_timeout()
        .build()
        .expect("compile failed")
}

fn count_matches(re: &Regex, text: &str) -> usize {
    re.find_iter(text).filter(|m| m.is_ok()).count()
}

/// `(\d{4})-(\d{2})-(\d{2})`
fn iso_date_tree() -> RegexTree {
    tree(RegexOptions::empty(), |b| {
        let mut parts = Vec::new();
        for (group, width) in [(1, 4), (2, 2), (3, 2)] {
            if group > 1 {
                parts.push(b.one('-'));
            }
            let d = b.set(CharClass::digit());
            let digits = b.repeat(d, width, width);
            parts.push(b.capture(group, digits));
        }
        b.concat(parts)
    })
}

/// `(\w+)(\d)`
fn word_then_digit_tree() -> RegexTree {
    tree(RegexOptions::empty(), |b| {
        let w = b.set(CharClass::word());
        let word = b.plus(w);
        let g1 = b.capture(1, word);
        let d = b.set(CharClass::digit());
        let g2 = b.capture(2, d);
        b.concat([g1, g2])
    })
}

/// `"([^"]*)"`
fn quoted_tree() -> RegexTree {
    tree(RegexOptions::empty(), |b| {
        let open = b.one('"');
        let body = b.notone('"');
        let body = b.star(body);
        let g1 = b.capture(1, body);
        let close = b.one('"');
        b.concat([open, g1, close])
    })
}

fn log_text() -> String {
    let mut text = String::new();
    for i in 0..500 {
        text.push_str(&format!(
            "2024-{:02}-{:02} id{} \"event {}\" status ok\n",
            i % 12 + 1,
            i % 28 + 1,
            i,
            i
        ));
    }
    text
}

// ---------------------------------------------------------------------------
// 1. compile -- analysis plus writing
// ---------------------------------------------------------------------------

fn bench_compile(c: &mut Criterion) {
    let cases = [
        ("iso_date", iso_date_tree()),
        ("word_then_digit", word_then_digit_tree()),
        ("quoted", quoted_tree()),
    ];

    let mut group = c.benchmark_group("compile");
    for (name, t) in &cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), t, |b, t| {
            b.iter(|| black_box(interpreted(black_box(t))));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 2. specialized -- hand-written matchers against the interpreter
// ---------------------------------------------------------------------------

fn bench_specialized(c: &mut Criterion) {
    let text = log_text();
    let cases = [
        ("iso_date", generated::iso_date(), interpreted(&iso_date_tree())),
        (
            "word_then_digit",
            generated::word_then_digit(),
            interpreted(&word_then_digit_tree()),
        ),
        ("quoted", generated::quoted(), interpreted(&quoted_tree())),
    ];

    let mut group = c.benchmark_group("specialized");
    for (name, fast, slow) in &cases {
        debug_assert_eq!(count_matches(fast, &text), count_matches(slow, &text));

        group.bench_with_input(BenchmarkId::new("generated", name), text.as_str(), |b, text| {
            b.iter(|| black_box(count_matches(fast, black_box(text))));
        });
        group.bench_with_input(BenchmarkId::new("interpreter", name), text.as_str(), |b, text| {
            b.iter(|| black_box(count_matches(slow, black_box(text))));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 3. backtracking -- loop flavors over the same input
// ---------------------------------------------------------------------------

fn bench_backtracking(c: &mut Criterion) {
    let text = format!("{}b", "a".repeat(200));
    let cases = [
        (
            "greedy",
            tree(RegexOptions::empty(), |b| {
                let a = b.one('a');
                let star = b.star(a);
                let tail = b.multi("ab");
                b.concat([star, tail])
            }),
        ),
        (
            "lazy",
            tree(RegexOptions::empty(), |b| {
                let a = b.one('a');
                let star = b.lazy_star(a);
                let tail = b.multi("ab");
                b.concat([star, tail])
            }),
        ),
        (
            "atomic",
            tree(RegexOptions::empty(), |b| {
                let a = b.one('a');
                let star = b.star(a);
                let tail = b.one('b');
                b.concat([star, tail])
            }),
        ),
        (
            "nested",
            tree(RegexOptions::empty(), |b| {
                let a = b.one('a');
                let plus = b.plus(a);
                let g = b.capture(1, plus);
                let outer = b.plus(g);
                let tail = b.one('b');
                b.concat([outer, tail])
            }),
        ),
    ];

    let mut group = c.benchmark_group("backtracking");
    for (name, t) in &cases {
        let re = interpreted(t);
        group.bench_with_input(BenchmarkId::from_parameter(name), text.as_str(), |b, text| {
            b.iter(|| black_box(re.find(black_box(text)).ok().flatten().map(|m| m.len())));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 4. right_to_left
// ---------------------------------------------------------------------------

fn bench_right_to_left(c: &mut Criterion) {
    let text = log_text();
    let ltr = interpreted(&iso_date_tree());
    let rtl_tree = tree(RegexOptions::RIGHT_TO_LEFT, |b| {
        let d = b.set(CharClass::digit());
        let digits = b.repeat(d, 4, 4);
        let g = b.capture(1, digits);
        let dash = b.one('-');
        b.concat([g, dash])
    });
    let rtl = interpreted(&rtl_tree);

    let mut group = c.benchmark_group("right_to_left");
    group.bench_function("ltr_all", |b| {
        b.iter(|| black_box(count_matches(&ltr, black_box(&text))));
    });
    group.bench_function("rtl_all", |b| {
        b.iter(|| black_box(count_matches(&rtl, black_box(&text))));
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// 5. replace -- literal fast path, templates and evaluators
// ---------------------------------------------------------------------------

fn bench_replace(c: &mut Criterion) {
    let text = log_text();
    let re = interpreted(&iso_date_tree());

    let mut group = c.benchmark_group("replace");
    group.bench_function("literal", |b| {
        b.iter(|| black_box(re.replace(black_box(&text), "DATE").map(|s| s.len())));
    });
    group.bench_function("template", |b| {
        b.iter(|| black_box(re.replace(black_box(&text), "$3.$2.$1").map(|s| s.len())));
    });
    group.bench_function("evaluator", |b| {
        b.iter(|| {
            black_box(
                re.replace_with(black_box(&text), |m| m.as_str().replace('-', "/"))
                    .map(|s| s.len()),
            )
        });
    });
    group.bench_function("split", |b| {
        b.iter(|| black_box(re.split(black_box(&text), 0, 0).map(|v| v.len())));
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Criterion harness
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_compile,
    bench_specialized,
    bench_backtracking,
    bench_right_to_left,
    bench_replace,
);
criterion_main!(benches);
