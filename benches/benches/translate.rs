//! Translation throughput in both directions.
//!
//! Inputs are synthetic rule sets of increasing size, mixing header,
//! URL, connection and variable rules across several sections.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use hrw4u::{Context, Options, Tables, compile_source, decompile};

/// An hrw4u document with `rules` conditional blocks.
fn source(rules: usize) -> String {
    let mut out = String::from("VARS {\n    seen: bool;\n    hits: int8;\n}\n\n");
    for i in 0..rules {
        let section = match i % 3 {
            0 => "REMAP",
            1 => "SEND_REQUEST",
            _ => "SEND_RESPONSE",
        };
        out.push_str(&format!("{section} {{\n"));
        out.push_str(&format!(
            "    if inbound.req.X-Rule-{i} == \"on\" && inbound.url.path ~ /^api\\/{i}/ {{\n"
        ));
        out.push_str(&format!("        inbound.req.X-Seen-{i} = \"{{now.HOUR}}\";\n"));
        out.push_str("        seen = true;\n");
        out.push_str("    } elif inbound.method in [\"POST\", \"PUT\"] {\n");
        out.push_str("        counter(writes);\n");
        out.push_str("    } else {\n");
        out.push_str("        no-op;\n");
        out.push_str("    }\n}\n\n");
    }
    out
}

fn bench_compile(c: &mut Criterion) {
    let tables = Tables::new();
    let options = Options::default();
    let ctx = Context::new(&tables, &options, "bench.hrw4u");
    let mut group = c.benchmark_group("compile");

    for rules in [10, 100, 1000] {
        let text = source(rules);
        group.throughput(Throughput::Elements(rules as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rules), &text, |b, text| {
            b.iter(|| compile_source(black_box(text), &ctx))
        });
    }

    group.finish();
}

fn bench_decompile(c: &mut Criterion) {
    let tables = Tables::new();
    let options = Options::default();
    let ctx = Context::new(&tables, &options, "bench.conf");
    let mut group = c.benchmark_group("decompile");

    for rules in [10, 100, 1000] {
        let lines = compile_source(&source(rules), &ctx).output;
        group.throughput(Throughput::Elements(rules as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rules), &lines, |b, lines| {
            b.iter(|| decompile(black_box(lines), &ctx))
        });
    }

    group.finish();
}

fn bench_tables(c: &mut Criterion) {
    c.bench_function("tables_new", |b| b.iter(Tables::new));
}

criterion_group!(benches, bench_compile, bench_decompile, bench_tables);
criterion_main!(benches);
