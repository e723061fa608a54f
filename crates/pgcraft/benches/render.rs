use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgcraft::{Expr, FieldDef, Object, Recipe, sql};

/// Build a recipe with `n` read columns and `n` placeholder conditions:
/// SELECT col0,col1,... FROM t WHERE ((col0=$1) AND (col1=$2) ...)
fn build_select(n: usize) -> Recipe {
    let mut recipe = sql();
    for i in 0..n {
        recipe = recipe.read(format!("col{i}"));
    }
    for i in 0..n {
        recipe = recipe.and_where(Expr::column(format!("col{i}")).eq(Expr::placeholder()));
    }
    recipe
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("recipe/select");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let recipe = build_select(n);
                black_box(recipe.select(["t"]).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_create_instance(c: &mut Criterion) {
    let object = Object::new([
        FieldDef::int("id", false, false, 64).unwrap(),
        FieldDef::text("name", true, true).unwrap(),
        FieldDef::float("score", true, false, 64).unwrap(),
        FieldDef::boolean("active", false, true).unwrap(),
        FieldDef::int_array("tags", true, true).unwrap(),
    ])
    .unwrap();

    c.bench_function("object/create_instance", |b| {
        b.iter(|| black_box(object.create_instance()));
    });

    c.bench_function("object/create_patch", |b| {
        b.iter(|| black_box(object.create_patch()));
    });
}

criterion_group!(benches, bench_render, bench_create_instance);
criterion_main!(benches);
