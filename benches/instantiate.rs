mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;

use pydrill::instantiate::Instantiator;
use pydrill::problem::Catalog;
use pydrill::problem::catalog::CORPUS_KINDS;

fn bench_instantiate(c: &mut Criterion) {
    let corpus = common::load_corpus();
    let instantiator = Instantiator::new(&corpus);
    let catalog = Catalog::new(&corpus);

    for kind in CORPUS_KINDS {
        let category = kind.seed_categories()[0];
        c.bench_function(&format!("instantiate_{category}"), |b| {
            let mut rng = StdRng::seed_from_u64(0);
            b.iter(|| {
                let out = instantiator
                    .instantiate_category(black_box(category), &mut rng)
                    .expect("instantiate");
                black_box(out);
            })
        });
    }

    c.bench_function("catalog_random_problem", |b| {
        let mut rng = StdRng::seed_from_u64(0);
        b.iter(|| black_box(catalog.random_problem(&mut rng).expect("generate")))
    });
}

criterion_group!(benches, bench_instantiate);
criterion_main!(benches);
