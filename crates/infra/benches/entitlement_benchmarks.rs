use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use vault_access::{explain_access, resolve, ContentTier, UserProfile};
use vault_core::{ContentId, ProductId, UserId};
use vault_entitlements::{
    CatalogEntry, CheckoutCompleted, CheckoutProcessor, EntitlementConfig, EntitlementGranter,
    InMemoryVaultStore, LineItem, LinePrice, Offer, ProductRef, TracingGrantLogger,
};

/// All 16 combinations of the four profile flags.
fn all_profiles() -> Vec<UserProfile> {
    (0u8..16)
        .map(|bits| UserProfile {
            has_full_unlock: bits & 1 != 0,
            has_course_pass: bits & 2 != 0,
            is_guest: bits & 4 != 0,
            active_studio_client: bits & 8 != 0,
        })
        .collect()
}

fn product(id: &str) -> ProductId {
    ProductId::parse(id).unwrap()
}

/// Store with `catalog_size` masterclasses and chapters plus two offers.
fn seeded_store(catalog_size: usize, users: &[UserId]) -> Arc<InMemoryVaultStore> {
    let store = Arc::new(InMemoryVaultStore::new());
    for user in users {
        store.put_profile(*user, UserProfile::default());
    }
    store.put_offer(Offer {
        product_id: product("prod_bundle_all"),
        category_slug: "full_access".to_string(),
    });
    store.put_offer(Offer {
        product_id: product("prod_pass"),
        category_slug: "course_pass".to_string(),
    });
    for i in 0..catalog_size {
        store.put_masterclass(CatalogEntry {
            id: ContentId::new(),
            title: format!("Masterclass {i}"),
            product_id: product(&format!("prod_mc_{i}")),
        });
        store.put_chapter(CatalogEntry {
            id: ContentId::new(),
            title: format!("Chapter {i}"),
            product_id: product(&format!("prod_ch_{i}")),
        });
    }
    store
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

/// Benchmark: resolver and gate explanation over every flag combination.
fn bench_resolver(c: &mut Criterion) {
    let profiles = all_profiles();
    let mut group = c.benchmark_group("resolver");
    group.throughput(Throughput::Elements(profiles.len() as u64));

    group.bench_function("resolve_all_profiles", |b| {
        b.iter(|| {
            for profile in &profiles {
                black_box(resolve(Some(black_box(profile))));
            }
        });
    });

    group.bench_function("explain_masterclass_gate", |b| {
        b.iter(|| {
            for profile in &profiles {
                black_box(explain_access(Some(profile), ContentTier::Masterclass));
            }
        });
    });

    group.finish();
}

/// Benchmark: grant latency by which rule matches (later rules do more lookups).
fn bench_grant_by_rule(c: &mut Criterion) {
    let rt = runtime();
    let users: Vec<UserId> = (0..64).map(|_| UserId::new()).collect();
    let store = seeded_store(100, &users);
    let config = EntitlementConfig::with_full_access_product(product("prod_full"));
    let granter = EntitlementGranter::new(store, TracingGrantLogger, config);

    let mut group = c.benchmark_group("grant_by_rule");
    for (rule, product_id) in [
        ("configured_product", "prod_full"),
        ("offer", "prod_pass"),
        ("masterclass", "prod_mc_50"),
        ("chapter", "prod_ch_50"),
        ("no_match", "prod_unknown"),
    ] {
        let product_id = product(product_id);
        group.bench_with_input(BenchmarkId::from_parameter(rule), &product_id, |b, product_id| {
            let mut n = 0usize;
            b.iter(|| {
                let user = users[n % users.len()];
                n += 1;
                rt.block_on(granter.grant_access_for_product(user, product_id))
                    .unwrap()
            });
        });
    }
    group.finish();
}

/// Benchmark: checkout processing by number of line items.
fn bench_checkout(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("checkout_line_items");

    for items in [1usize, 5, 20] {
        let user = UserId::new();
        let store = seeded_store(items, &[user]);
        let granter =
            EntitlementGranter::new(store.clone(), TracingGrantLogger, EntitlementConfig::default());
        let processor = CheckoutProcessor::new(granter, store);

        let line_items: Vec<LineItem> = (0..items)
            .map(|i| LineItem {
                price: Some(LinePrice {
                    product: Some(ProductRef::Id(format!("prod_mc_{i}"))),
                }),
                amount_total: 4900,
                currency: "usd".to_string(),
            })
            .collect();

        group.throughput(Throughput::Elements(items as u64));
        group.bench_with_input(BenchmarkId::from_parameter(items), &line_items, |b, line_items| {
            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                let event = CheckoutCompleted {
                    event_id: format!("evt_{n}"),
                    session_id: format!("cs_{n}"),
                    client_reference_id: Some(user.to_string()),
                    metadata: Default::default(),
                    line_items: line_items.clone(),
                };
                black_box(rt.block_on(processor.process(&event)))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolver, bench_grant_by_rule, bench_checkout);
criterion_main!(benches);
