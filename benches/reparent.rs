//! This bench test simulates moving a battalion between brigades in a large
//! in-memory forest, exercising the incremental closure maintenance.

#![allow(missing_docs)]

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use orbat::{Echelon, Forest, Uic, Unit};

/// Builds a forest of `brigades` brigades, each with `battalions` battalions
/// of four companies.
fn preseed_forest(brigades: u32, battalions: u32) -> Forest {
    let mut forest = Forest::with_capacity((brigades * (1 + battalions * 5)) as usize);

    for bde in 0..brigades {
        let bde_uic = Uic::new(format!("WBDE{bde:02}")).unwrap();
        forest
            .insert(Unit::new(
                bde_uic.clone(),
                format!("{bde} Brigade"),
                Echelon::Brigade,
            ))
            .unwrap();

        for bn in 0..battalions {
            let bn_uic = Uic::new(format!("WBN{bde:02}{bn:02}")).unwrap();
            forest
                .insert(
                    Unit::new(bn_uic.clone(), format!("{bn} Battalion"), Echelon::Battalion)
                        .with_parent(bde_uic.clone()),
                )
                .unwrap();

            for co in 0..4 {
                let co_uic = Uic::new(format!("WC{bde:02}{bn:02}{co}")).unwrap();
                forest
                    .insert(
                        Unit::new(co_uic, format!("{co} Company"), Echelon::Company)
                            .with_parent(bn_uic.clone()),
                    )
                    .unwrap();
            }
        }
    }

    forest
}

fn reparent(c: &mut Criterion) {
    c.bench_function("reparent battalion", |b| {
        b.iter_batched(
            || preseed_forest(20, 10),
            |mut forest| {
                // Move a mid-tree battalion to another brigade.
                forest
                    .reparent(
                        &Uic::new("WBN0505".to_string()).unwrap(),
                        Some(&Uic::new("WBDE12".to_string()).unwrap()),
                        None,
                    )
                    .unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn rebuild(c: &mut Criterion) {
    c.bench_function("rebuild closures", |b| {
        b.iter_batched(
            || preseed_forest(20, 10),
            |mut forest| {
                forest.rebuild().unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, reparent, rebuild);
criterion_main!(benches);
