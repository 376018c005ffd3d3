use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use stylesearch_core::catalog::MemoryCatalog;
use stylesearch_core::error::Error;
use stylesearch_core::traits::{CatalogStore, Embedder, SearchEngine};
use stylesearch_core::types::{CatalogRecord, Payload, RankedResult, SearchRequest};
use stylesearch_embed::{FakeEmbedder, FAKE_DIM};
use stylesearch_hybrid::{HybridSearchEngine, IndexStatus};

fn record(id: &str, v: Value) -> CatalogRecord {
    let payload: Payload = match v { Value::Object(map) => map, _ => panic!("object expected") };
    CatalogRecord::new(id, payload)
}

fn fashion_catalog() -> Vec<CatalogRecord> {
    vec![
        record("p1", json!({"name": "Nike Air Max sneakers", "brand": "Nike", "category": "Footwear", "colors": ["black", "white"], "price": 129.99, "currency": "USD"})),
        record("p2", json!({"name": "Adidas running shoes", "brand": "Adidas", "category": "Footwear", "style_tags": ["sporty"]})),
        record("p3", json!({"name": "Gucci leather handbag", "brand": "Gucci", "category": "Bags", "colors": ["tan"]})),
        record("p4", json!({"name": "Levi's 501 jeans", "brand": "Levi's", "category": "Apparel", "description": "Straight fit denim jeans"})),
        record("p5", json!({"name": "Zara linen shirt", "brand": "Zara", "category": "Apparel", "style_tags": ["summer", "casual"]})),
        record("p6", json!({"name": "Prada nylon backpack", "brand": "Prada", "category": "Bags"})),
        record("p7", json!({"name": "Converse Chuck Taylor sneakers", "brand": "Converse", "category": "Footwear", "colors": ["red"]})),
        record("p8", json!({"name": "H&M cotton t-shirt", "brand": "H&M", "category": "Apparel", "colors": ["white"]})),
    ]
}

fn fake() -> Arc<dyn Embedder> { Arc::new(FakeEmbedder::new(FAKE_DIM)) }

fn engine_over(records: Vec<CatalogRecord>) -> (Arc<MemoryCatalog>, HybridSearchEngine) {
    let catalog = Arc::new(MemoryCatalog::with_records(records));
    let engine = HybridSearchEngine::new(catalog.clone(), fake());
    (catalog, engine)
}

fn ids(results: &[RankedResult]) -> Vec<&str> { results.iter().map(|r| r.product_id.as_str()).collect() }

const QUERIES: [&str; 6] = ["Nike sneakers", "leather bag", "white cotton shirt", "jeans", "red", "summer casual linen"];

/// Catalog whose reads can be switched off to simulate an unreachable store.
struct FlakyCatalog {
    inner: MemoryCatalog,
    down: AtomicBool,
}

impl CatalogStore for FlakyCatalog {
    fn scroll(&self, limit: usize) -> anyhow::Result<Vec<CatalogRecord>> {
        if self.down.load(Ordering::SeqCst) { anyhow::bail!("connection refused"); }
        self.inner.scroll(limit)
    }
    fn count(&self) -> anyhow::Result<usize> { self.inner.count() }
}

/// Hashing embedder that refuses any text containing `poison`.
struct PickyEmbedder {
    inner: FakeEmbedder,
    poison: &'static str,
}

impl Embedder for PickyEmbedder {
    fn dim(&self) -> usize { self.inner.dim() }
    fn max_len(&self) -> usize { self.inner.max_len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains(self.poison)) { anyhow::bail!("refusing to embed"); }
        self.inner.embed_batch(texts)
    }
}

fn picky(poison: &'static str) -> Arc<dyn Embedder> { Arc::new(PickyEmbedder { inner: FakeEmbedder::new(FAKE_DIM), poison }) }

#[test]
fn repeated_searches_are_identical() {
    let (_, engine) = engine_over(fashion_catalog());
    for q in QUERIES {
        let req = SearchRequest::new(q).with_min_score(0.0);
        assert_eq!(engine.search(&req).expect("search"), engine.search(&req).expect("search"), "query {q}");
    }
}

#[test]
fn results_respect_bounds_threshold_limit_and_order() {
    let (_, engine) = engine_over(fashion_catalog());
    for q in QUERIES {
        for (limit, min_score) in [(1, 0.0), (3, 0.3), (10, 0.5), (100, 0.0)] {
            let req = SearchRequest::new(q).with_limit(limit).with_min_score(min_score);
            let results = engine.search(&req).expect("search");
            assert!(results.len() <= limit);
            for r in &results {
                assert!((0.0..=1.0).contains(&r.similarity_score), "{q}: {}", r.similarity_score);
                assert!(r.similarity_score >= min_score);
            }
            assert!(results.windows(2).all(|w| w[0].similarity_score >= w[1].similarity_score), "{q} not sorted");
        }
    }
}

#[test]
fn category_filter_is_exact() {
    let (catalog, engine) = engine_over(fashion_catalog());
    let records = catalog.scroll(100).expect("scroll");
    let category_of = |id: &str| {
        records.iter().find(|r| r.id == id).and_then(|r| r.payload.get("category")).cloned()
    };

    let results = engine.search(&SearchRequest::new("sneakers shoes").with_category("Footwear").with_min_score(0.0)).expect("search");
    assert!(!results.is_empty());
    for r in &results {
        assert_eq!(category_of(&r.product_id), Some(json!("Footwear")));
    }

    let lower = engine.search(&SearchRequest::new("sneakers shoes").with_category("footwear").with_min_score(0.0)).expect("search");
    assert!(lower.is_empty(), "category comparison is case-sensitive");
}

#[test]
fn blank_queries_return_nothing() {
    let (_, engine) = engine_over(fashion_catalog());
    assert!(engine.search(&SearchRequest::new("")).expect("search").is_empty());
    assert!(engine.search(&SearchRequest::new("   ")).expect("search").is_empty());
    assert_eq!(engine.status(), IndexStatus::default(), "blank queries do not trigger a build");
}

#[test]
fn weights_are_scale_invariant() {
    let (_, engine) = engine_over(fashion_catalog());
    for q in QUERIES {
        let a = engine.search(&SearchRequest::new(q).with_weights(2.0, 3.0).with_min_score(0.0)).expect("search");
        let b = engine.search(&SearchRequest::new(q).with_weights(0.4, 0.6).with_min_score(0.0)).expect("search");
        assert_eq!(ids(&a), ids(&b), "query {q}");
    }
}

#[test]
fn zero_weights_mix_evenly() {
    let (_, engine) = engine_over(fashion_catalog());
    let a = engine.search(&SearchRequest::new("Nike sneakers").with_weights(0.0, 0.0).with_min_score(0.0)).expect("search");
    let b = engine.search(&SearchRequest::new("Nike sneakers").with_weights(1.0, 1.0).with_min_score(0.0)).expect("search");
    assert_eq!(a, b);
}

#[test]
fn nike_query_ranks_nike_first() {
    let (_, engine) = engine_over(vec![
        record("nike", json!({"name": "Nike Air Max sneakers", "brand": "Nike"})),
        record("adidas", json!({"name": "Adidas running shoes", "brand": "Adidas"})),
        record("gucci", json!({"name": "Gucci leather handbag", "brand": "Gucci"})),
    ]);
    let results = engine.search(&SearchRequest::new("Nike sneakers")).expect("search");
    assert_eq!(results[0].product_id, "nike");
    let reasoning = &results[0].match_reasoning;
    assert!(reasoning.contains("product name match") || reasoning.contains("brand match"), "{reasoning}");
    assert!(results[0].key_similarities.contains(&"Name: Nike Air Max sneakers".to_string()));
}

#[test]
fn category_without_products_returns_nothing() {
    let (_, engine) = engine_over(vec![
        record("p1", json!({"name": "Leather wallet", "category": "Accessories"})),
        record("p2", json!({"name": "Canvas tote", "category": "Totes"})),
    ]);
    let results = engine.search(&SearchRequest::new("wallet").with_category("bags")).expect("search");
    assert!(results.is_empty());
}

#[test]
fn refresh_picks_up_new_products() {
    let (catalog, engine) = engine_over(fashion_catalog());
    let before = engine.search(&SearchRequest::new("Yeezy")).expect("search");
    assert!(!ids(&before).contains(&"yeezy"));

    catalog.upsert(record("yeezy", json!({"name": "Yeezy Boost 350", "brand": "Adidas", "category": "Footwear"})));
    let stale = engine.search(&SearchRequest::new("Yeezy")).expect("search");
    assert!(!ids(&stale).contains(&"yeezy"), "published snapshot is immutable until refresh");

    let report = engine.refresh().expect("refresh");
    assert_eq!(report.indexed, 9);
    let after = engine.search(&SearchRequest::new("Yeezy")).expect("search");
    assert_eq!(after.first().map(|r| r.product_id.as_str()), Some("yeezy"));
}

#[test]
fn empty_catalog_searches_cleanly() {
    let (catalog, engine) = engine_over(Vec::new());
    assert_eq!(catalog.count().expect("count"), 0);
    assert!(engine.search(&SearchRequest::new("anything")).expect("search").is_empty());
    assert_eq!(engine.status(), IndexStatus { built: true, documents: 0, skipped: 0 });
}

#[test]
fn product_info_is_shaped_from_payload() {
    let (_, engine) = engine_over(vec![
        record("rec-1", json!({"product_id": "SKU-9", "name": "Nike Air Max sneakers", "brand": "Nike", "price": 129.99, "currency": "USD", "image_url": "https://img/1.jpg"})),
        record("rec-2", json!({"brand": "Nike sneakers"})),
    ]);
    let results = engine.search(&SearchRequest::new("nike sneakers").with_min_score(0.0)).expect("search");
    let first = results.iter().find(|r| r.product_id == "SKU-9").expect("SKU-9 present");
    assert_eq!(first.product_info.currency, "USD");
    assert_eq!(first.product_info.image_url.as_deref(), Some("https://img/1.jpg"));

    let bare = results.iter().find(|r| r.product_id == "rec-2").expect("rec-2 present");
    assert_eq!(bare.product_info.name, "Unknown");
    assert_eq!(bare.product_info.currency, "INR");
    assert!(bare.product_info.in_stock);
}

#[test]
fn out_of_range_limit_uses_default() {
    let records: Vec<CatalogRecord> = (0..30).map(|i| record(&format!("p{i}"), json!({"name": format!("black dress {i}")}))).collect();
    let (_, engine) = engine_over(records);
    let zero = engine.search(&SearchRequest::new("black dress").with_limit(0).with_min_score(0.0)).expect("search");
    assert_eq!(zero.len(), 10);
    let huge = engine.search(&SearchRequest::new("black dress").with_limit(1000).with_min_score(0.0)).expect("search");
    assert_eq!(huge.len(), 10);
    let exact = engine.search(&SearchRequest::new("black dress").with_limit(25).with_min_score(0.0)).expect("search");
    assert_eq!(exact.len(), 25);
}

#[test]
fn equal_scores_keep_corpus_order() {
    let records: Vec<CatalogRecord> = ["a", "b", "c", "d"].iter().map(|id| record(id, json!({"name": "plain white tee"}))).collect();
    let (_, engine) = engine_over(records);
    let results = engine.search(&SearchRequest::new("white tee").with_min_score(0.0)).expect("search");
    assert_eq!(ids(&results), vec!["a", "b", "c", "d"]);
}

#[test]
fn failed_rebuild_keeps_previous_snapshot() {
    let catalog = Arc::new(FlakyCatalog { inner: MemoryCatalog::with_records(fashion_catalog()), down: AtomicBool::new(false) });
    let engine = HybridSearchEngine::new(catalog.clone(), fake());
    engine.refresh().expect("first build");
    let before = engine.search(&SearchRequest::new("jeans")).expect("search");

    catalog.down.store(true, Ordering::SeqCst);
    let err = engine.refresh().unwrap_err();
    assert!(matches!(err, Error::Catalog(_)), "{err}");
    assert_eq!(engine.status().documents, 8);
    assert_eq!(engine.search(&SearchRequest::new("jeans")).expect("search"), before);
}

#[test]
fn first_build_failure_is_reported() {
    let catalog = Arc::new(FlakyCatalog { inner: MemoryCatalog::with_records(fashion_catalog()), down: AtomicBool::new(true) });
    let engine = HybridSearchEngine::new(catalog.clone(), fake());
    assert!(matches!(engine.search(&SearchRequest::new("jeans")), Err(Error::Catalog(_))));
    assert!(!engine.status().built);

    catalog.down.store(false, Ordering::SeqCst);
    assert!(!engine.search(&SearchRequest::new("jeans")).expect("search").is_empty());
    assert!(engine.status().built);
}

#[test]
fn bad_document_is_skipped_not_fatal() {
    let mut records = fashion_catalog();
    records.push(record("cursed", json!({"name": "Cursed amulet"})));
    let catalog = Arc::new(MemoryCatalog::with_records(records));
    let engine = HybridSearchEngine::new(catalog, picky("cursed"));

    let report = engine.refresh().expect("refresh");
    assert_eq!(report.scanned, 9);
    assert_eq!(report.indexed, 8);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].product_id, "cursed");
    assert_eq!(engine.status(), IndexStatus { built: true, documents: 8, skipped: 1 });
}

#[test]
fn embedder_down_fails_the_build() {
    let catalog = Arc::new(MemoryCatalog::with_records(fashion_catalog()));
    // Every searchable text contains a space.
    let engine = HybridSearchEngine::new(catalog, picky(" "));
    assert!(matches!(engine.refresh(), Err(Error::Embedding(_))));
    assert!(!engine.status().built);
}

#[test]
fn semantic_failure_falls_back_to_lexical() {
    let catalog = Arc::new(MemoryCatalog::with_records(fashion_catalog()));
    let engine = HybridSearchEngine::new(catalog, picky("cursed"));
    let results = engine.search(&SearchRequest::new("cursed jeans")).expect("search");
    assert_eq!(ids(&results), vec!["p4"]);
    assert!((results[0].similarity_score - 0.4).abs() < 1e-9);
}

#[test]
fn both_scorers_empty_returns_nothing() {
    let catalog = Arc::new(MemoryCatalog::with_records(fashion_catalog()));
    let engine = HybridSearchEngine::new(catalog, picky("§"));
    // Tokenizes to nothing and cannot be embedded.
    assert!(engine.search(&SearchRequest::new("§ ? !").with_min_score(0.0)).expect("search").is_empty());
}

#[test]
fn searches_run_while_refreshing() {
    let (catalog, engine) = engine_over(fashion_catalog());
    engine.refresh().expect("first build");

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..25 {
                    for q in QUERIES {
                        let results = engine.search(&SearchRequest::new(q).with_limit(5)).expect("search");
                        assert!(results.len() <= 5);
                        assert!(results.windows(2).all(|w| w[0].similarity_score >= w[1].similarity_score));
                    }
                }
            });
        }
        s.spawn(|| {
            for i in 0..10 {
                catalog.upsert(record(&format!("new-{i}"), json!({"name": format!("Limited sneakers drop {i}"), "category": "Footwear"})));
                engine.refresh().expect("refresh");
            }
        });
    });

    assert_eq!(engine.status().documents, 18);
}

#[test]
fn engine_is_usable_through_the_trait() {
    let (_, engine) = engine_over(fashion_catalog());
    let engine: &dyn SearchEngine = &engine;
    assert_eq!(engine.refresh().expect("refresh").indexed, 8);
    assert!(!engine.search(&SearchRequest::new("handbag")).expect("search").is_empty());
}
