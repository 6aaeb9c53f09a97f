#![allow(clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use sqlrewrite_lib::query::ast::Renderer;
use sqlrewrite_lib::query::catalog::FunctionRegistry;
use sqlrewrite_lib::query::parse::where_clause_parse;

fn render_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("Render");
    let functions = FunctionRegistry::standard().with_function("nvl", 2);
    let renderer = Renderer::new(&functions);

    let test_cases = vec![
        ("comparison", "t.a = 1"),
        ("and_chain", "t.a = 1 AND t.b > 2 AND t.c < 3 AND t.d <> 'x'"),
        (
            "between_in",
            "t.d BETWEEN '2010-01-01' AND '2017-01-01' AND t.c IN (1, 2, 3, 4, 5)",
        ),
        (
            "subquery",
            "t.id IN (SELECT u.id FROM u WHERE u.k = t.k AND count(*) > 1 OR nvl(u.v, 0) = 2)",
        ),
    ];

    for (name, where_text) in &test_cases {
        let expr = where_clause_parse(where_text, &functions).unwrap();

        group.bench_with_input(BenchmarkId::new("expr_render", name), &expr, |b, expr| {
            b.iter(|| black_box(renderer.expr_render(black_box(expr))))
        });

        group.bench_with_input(
            BenchmarkId::new("expr_reverse_polish", name),
            &expr,
            |b, expr| b.iter(|| black_box(renderer.expr_reverse_polish(black_box(expr)))),
        );
    }

    group.finish();
}

criterion_group!(benches, render_benchmarks);
criterion_main!(benches);
