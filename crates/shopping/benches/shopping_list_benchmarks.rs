use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use larder_shopping::{IngredientRow, PageGeometry, aggregate, layout, pdf, render_shopping_list};

/// Rows as a cart of `recipes` recipes with 8 ingredients each would produce,
/// drawn from a catalog of 50 ingredients so that keys collide.
fn cart_rows(recipes: usize) -> Vec<IngredientRow> {
    (0..recipes * 8)
        .map(|i| {
            let key = (i * 7) % 50;
            IngredientRow::new(format!("Ingredient {key:02}"), "g", (i % 300) as u32 + 1)
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    for recipes in [1usize, 10, 100] {
        let rows = cart_rows(recipes);
        group.throughput(Throughput::Elements(rows.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(recipes), &rows, |b, rows| {
            b.iter(|| aggregate(black_box(rows.clone())))
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let lines = aggregate(cart_rows(100));

    group.bench_function("layout_a4", |b| {
        b.iter(|| layout(black_box(&lines), PageGeometry::A4))
    });

    group.bench_function("layout_and_encode_a4", |b| {
        b.iter(|| {
            layout(black_box(&lines), PageGeometry::A4)
                .map(|pages| pdf::encode(&pages, &PageGeometry::A4))
        })
    });

    group.bench_function("end_to_end", |b| {
        b.iter(|| render_shopping_list(black_box(cart_rows(10))))
    });
    group.finish();
}

criterion_group!(benches, bench_aggregate, bench_render);
criterion_main!(benches);
