use std::path::Path;
use std::sync::Arc;

use auroramart::config::{Config, CLASSIFIER_ARTIFACT, RULES_ARTIFACT};
use auroramart::db::Database;
use auroramart::models::*;
use auroramart::recommend::heuristics::{self, HEURISTIC_CATEGORIES};
use auroramart::recommend::*;
use serde_json::json;
use speculate2::speculate;

fn classifier_json() -> String {
    let codes = |labels: &[&str], missing: Option<f64>| {
        let map: serde_json::Map<String, serde_json::Value> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.to_string(), json!(i)))
            .collect();
        match missing {
            Some(code) => json!({ "codes": map, "missing": code }),
            None => json!({ "codes": map }),
        }
    };

    json!({
        "format_version": 1,
        "encoding": {
            "version": 1,
            "categorical": {
                "age": codes(&["18-24", "25-34", "35-44", "45-54", "55-64", "65+"], None),
                "gender": codes(&["f", "m"], None),
                "employment": codes(&["employed", "unemployed", "student", "retired"], None),
                "occupation": codes(&["tech", "sales", "service"], Some(-1.0)),
                "education": codes(&["secondary", "diploma", "bachelor", "master"], Some(-1.0)),
                "income": codes(&["low", "medium", "high"], None),
            }
        },
        "classes": ["Beauty & Personal Care", "Electronics", "Home & Kitchen"],
        "nodes": [
            { "split": { "feature": "gender", "threshold": 0.5, "left": 1, "right": 2 } },
            { "leaf": { "distribution": [8, 1, 1] } },
            { "split": { "feature": "income", "threshold": 1.5, "left": 3, "right": 4 } },
            { "leaf": { "distribution": [0, 2, 8] } },
            { "leaf": { "distribution": [0, 9, 1] } }
        ]
    })
    .to_string()
}

fn rules_json() -> String {
    json!({
        "rules": [
            { "antecedents": ["P"], "consequents": ["Q"], "confidence": 0.9, "support": 50, "lift": 2.5 },
            { "antecedents": ["P"], "consequents": ["R"], "confidence": 0.7, "support": 40, "lift": 1.8 },
            { "antecedents": ["P"], "consequents": ["S"], "confidence": 0.5, "support": 30, "lift": 1.2 },
            { "antecedents": ["R"], "consequents": ["S", "T"], "confidence": 0.6, "support": 20, "lift": 1.4 },
            { "antecedents": ["X"], "consequents": ["GONE"], "confidence": 0.8, "support": 10, "lift": 3.0 }
        ]
    })
    .to_string()
}

fn write_artifacts(dir: &Path, classifier: bool, rules: bool) {
    if classifier {
        std::fs::write(dir.join("category_classifier.json"), classifier_json())
            .expect("Failed to write classifier");
    }
    if rules {
        std::fs::write(dir.join("association_rules.json"), rules_json())
            .expect("Failed to write rules");
    }
}

fn add(db: &Database, sku: &str, category: &str, rating: Option<f64>, reviews: u32, stock: u32) {
    db.upsert_product(UpsertProductInput {
        sku: sku.to_string(),
        name: format!("Product {}", sku),
        category: category.to_string(),
        unit_price: 12.5,
        rating,
        review_count: reviews,
        quantity_on_hand: stock,
        is_active: true,
    })
    .expect("Failed to add product");
}

fn seed_catalogue() -> Database {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");

    add(&db, "P", "Home & Kitchen", Some(4.0), 12, 5);
    add(&db, "Q", "Home & Kitchen", Some(4.9), 80, 0);
    add(&db, "R", "Home & Kitchen", Some(4.2), 30, 7);
    add(&db, "S", "Home & Kitchen", Some(3.1), 8, 2);
    add(&db, "T", "Home & Kitchen", Some(4.2), 55, 9);
    add(&db, "U", "Home & Kitchen", None, 0, 4);
    add(&db, "E1", "Electronics", Some(4.8), 100, 3);
    add(&db, "E2", "Electronics", Some(4.5), 20, 3);
    db
}

fn facade(models_dir: &Path, db: &Database) -> RecommendationFacade {
    let config = Config::default()
        .with_models_dir(models_dir)
        .with_database_path(models_dir.join("unused.db"));
    RecommendationFacade::from_config(&config, Arc::new(db.clone()))
}

fn facade_with(models_dir: &Path, db: &Database, options: FacadeOptions) -> RecommendationFacade {
    let store = Arc::new(ArtifactStore::new(
        models_dir,
        Config::default().with_models_dir(models_dir).artifact_specs(),
    ));
    RecommendationFacade::new(store, Arc::new(db.clone()), options)
}

fn survey() -> RawAttributes {
    let mut raw = RawAttributes::new();
    raw.insert("age".to_string(), "25-34".into());
    raw.insert("gender".to_string(), "F".into());
    raw.insert("employment".to_string(), "employed".into());
    raw.insert("income".to_string(), "medium".into());
    raw.insert("household_size".to_string(), 2i64.into());
    raw.insert("has_children".to_string(), false.into());
    raw
}

speculate! {
    before {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = seed_catalogue();
    }

    describe "category prediction" {
        it "uses the classifier when it is loaded" {
            write_artifacts(dir.path(), true, true);
            let prediction = facade(dir.path(), &db).predict_category(&survey());

            assert_eq!(prediction.source, Source::Model);
            assert_eq!(prediction.category, "Beauty & Personal Care");
            assert!((prediction.confidence - 0.8).abs() < 1e-9);
        }

        it "follows the tree for male shoppers" {
            write_artifacts(dir.path(), true, false);
            let facade = facade(dir.path(), &db);

            let mut raw = survey();
            raw.insert("gender".to_string(), "male".into());
            assert_eq!(facade.predict_category(&raw).category, "Home & Kitchen");

            raw.insert("income".to_string(), 9500i64.into());
            let prediction = facade.predict_category(&raw);
            assert_eq!(prediction.category, "Electronics");
            assert_eq!(prediction.source, Source::Model);
        }

        it "falls back to the heuristic table when the classifier is missing" {
            write_artifacts(dir.path(), false, true);
            let prediction = facade(dir.path(), &db).predict_category(&survey());

            assert_eq!(prediction.source, Source::Heuristic);
            assert_eq!(prediction.category, "Home & Kitchen");
            assert_eq!(prediction.confidence, 0.0);
        }

        it "falls back when the answers cannot be encoded" {
            write_artifacts(dir.path(), true, true);
            let mut raw = survey();
            raw.insert("employment".to_string(), "astronaut".into());

            let prediction = facade(dir.path(), &db).predict_category(&raw);
            assert_eq!(prediction.source, Source::Heuristic);
            assert!(HEURISTIC_CATEGORIES.contains(&prediction.category.as_str()));
        }

        it "answers an empty survey with the default category" {
            let prediction = facade(dir.path(), &db).predict_category(&RawAttributes::new());

            assert_eq!(prediction.source, Source::Heuristic);
            assert_eq!(prediction.category, heuristics::DEFAULT_CATEGORY);
        }

        it "is deterministic" {
            write_artifacts(dir.path(), true, true);
            let facade = facade(dir.path(), &db);

            let first = facade.predict_category(&survey());
            for _ in 0..10 {
                assert_eq!(facade.predict_category(&survey()), first);
            }
        }
    }

    describe "product recommendations" {
        it "ranks rules and skips out-of-stock products" {
            write_artifacts(dir.path(), true, true);
            let result = facade(dir.path(), &db).recommend_for_product("P", 2);

            assert_eq!(result.source, Source::Model);
            assert_eq!(result.product_ids(), vec!["R", "S"]);
            assert_eq!(result.items[0].score, 0.7);
        }

        it "keeps out-of-stock products when the stock filter is off" {
            write_artifacts(dir.path(), true, true);
            let options = FacadeOptions { exclude_out_of_stock: false, ..FacadeOptions::default() };
            let result = facade_with(dir.path(), &db, options).recommend_for_product("P", 2);

            assert_eq!(result.source, Source::Model);
            assert_eq!(result.product_ids(), vec!["Q", "R"]);
            assert_eq!(result.items[0].score, 0.9);
        }

        it "keeps inactive rule targets when the stock filter is off" {
            write_artifacts(dir.path(), true, true);
            db.set_active("R", false).expect("Update failed");
            let options = FacadeOptions { exclude_out_of_stock: false, ..FacadeOptions::default() };
            let result = facade_with(dir.path(), &db, options).recommend_for_product("P", 3);

            assert_eq!(result.product_ids(), vec!["Q", "R", "S"]);
        }

        it "falls back to top-rated products in the same category when there are no rules" {
            write_artifacts(dir.path(), true, true);
            let result = facade(dir.path(), &db).recommend_for_product("T", 3);

            assert_eq!(result.source, Source::Heuristic);
            // Q is out of stock; R and T tie on rating and T is the query
            assert_eq!(result.product_ids(), vec!["R", "P", "S"]);
            assert_eq!(result.items[0].score, 4.2);
        }

        it "falls back when the rule table is missing" {
            write_artifacts(dir.path(), true, false);
            let result = facade(dir.path(), &db).recommend_for_product("P", 3);

            assert_eq!(result.source, Source::Heuristic);
            assert_eq!(result.product_ids(), vec!["T", "R", "S"]);
        }

        it "falls back when every rule target is unavailable" {
            write_artifacts(dir.path(), true, true);
            let result = facade(dir.path(), &db).recommend_for_product("X", 2);

            assert_eq!(result.source, Source::Heuristic);
            assert_eq!(result.product_ids(), vec!["E1", "E2"]);
        }

        it "never recommends the queried product" {
            write_artifacts(dir.path(), true, true);
            let facade = facade(dir.path(), &db);

            for sku in ["P", "Q", "R", "S", "T", "U", "E1"] {
                let result = facade.recommend_for_product(sku, 10);
                assert!(!result.product_ids().contains(&sku));
                assert!(result.items.len() <= 10);
            }
        }

        it "clamps the limit" {
            write_artifacts(dir.path(), true, true);
            let result = facade(dir.path(), &db).recommend_for_product("E1", 500);

            assert_eq!(result.limit, 20);
            assert!(result.items.len() <= 20);
        }

        it "returns an empty model-backed list for a zero limit" {
            write_artifacts(dir.path(), true, true);
            let result = facade(dir.path(), &db).recommend_for_product("P", 0);

            assert_eq!(result.source, Source::Model);
            assert!(result.items.is_empty());
        }

        it "returns an empty heuristic list for a zero limit without rules" {
            let result = facade(dir.path(), &db).recommend_for_product("P", 0);

            assert_eq!(result.source, Source::Heuristic);
            assert!(result.items.is_empty());
        }

        it "is deterministic" {
            write_artifacts(dir.path(), true, true);
            let facade = facade(dir.path(), &db);

            let first = facade.recommend_for_product("P", 3);
            for _ in 0..10 {
                assert_eq!(facade.recommend_for_product("P", 3), first);
            }
        }

        it "reflects stock changes without reloading" {
            write_artifacts(dir.path(), true, true);
            let facade = facade(dir.path(), &db);

            db.set_stock("Q", 10).expect("Update failed");
            assert_eq!(facade.recommend_for_product("P", 2).product_ids(), vec!["Q", "R"]);
        }
    }

    describe "basket recommendations" {
        it "merges rules from every basket item" {
            write_artifacts(dir.path(), true, true);
            let result = facade(dir.path(), &db)
                .recommend_for_basket(&["P".to_string(), "R".to_string()], 4);

            assert_eq!(result.source, Source::Model);
            // S keeps its strongest rule (R -> S at 0.6)
            assert_eq!(result.product_ids(), vec!["S", "T"]);
            assert_eq!(result.items[0].score, 0.6);
        }

        it "ignores blank and repeated ids" {
            write_artifacts(dir.path(), true, true);
            let result = facade(dir.path(), &db).recommend_for_basket(
                &["P".to_string(), " ".to_string(), "P".to_string()],
                4,
            );

            assert_eq!(result.query, vec!["P".to_string()]);
            assert_eq!(result.product_ids(), vec!["R", "S"]);
        }

        it "falls back to the whole catalogue for mixed categories" {
            let result = facade(dir.path(), &db)
                .recommend_for_basket(&["P".to_string(), "E1".to_string()], 3);

            assert_eq!(result.source, Source::Heuristic);
            assert_eq!(result.product_ids(), vec!["E2", "T", "R"]);
        }
    }

    describe "artifacts" {
        it "reports load state without loading" {
            write_artifacts(dir.path(), true, false);
            let facade = facade(dir.path(), &db);

            let before: Vec<LoadState> = facade.artifacts().into_iter().map(|d| d.state).collect();
            assert_eq!(before, vec![LoadState::NotLoaded, LoadState::NotLoaded]);

            facade.predict_category(&survey());
            facade.recommend_for_product("P", 2);

            let after: Vec<(String, LoadState)> = facade
                .artifacts()
                .into_iter()
                .map(|d| (d.name, d.state))
                .collect();
            assert_eq!(
                after,
                vec![
                    (RULES_ARTIFACT.to_string(), LoadState::Failed),
                    (CLASSIFIER_ARTIFACT.to_string(), LoadState::Loaded),
                ]
            );
        }
    }
}
