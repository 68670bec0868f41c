use auroramart::db::Database;
use auroramart::models::*;
use auroramart::recommend::Catalogue;
use speculate2::speculate;

fn add_product(db: &Database, sku: &str, category: &str, quantity_on_hand: u32) -> Product {
    db.upsert_product(UpsertProductInput {
        sku: sku.to_string(),
        name: format!("Product {}", sku),
        category: category.to_string(),
        unit_price: 19.9,
        rating: Some(4.0),
        review_count: 10,
        quantity_on_hand,
        is_active: true,
    })
    .expect("Failed to upsert product")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "categories" {
        it "creates a category with a slug" {
            let category = db.ensure_category("Beauty & Personal Care").expect("Failed to create category");
            assert_eq!(category.slug, "beauty-personal-care");
        }

        it "does not duplicate an existing category" {
            db.ensure_category("Electronics").expect("Failed to create");
            db.ensure_category("Electronics").expect("Failed to create");

            let categories = db.get_categories().expect("Query failed");
            assert_eq!(categories.len(), 1);
        }

        it "rejects a blank name" {
            assert!(db.ensure_category("   ").is_err());
        }

        it "is created by upserting a product" {
            add_product(&db, "SKU-1", "Toys & Games", 1);

            let names: Vec<String> = db.get_categories().expect("Query failed")
                .into_iter()
                .map(|c| c.name)
                .collect();
            assert_eq!(names, vec!["Toys & Games".to_string()]);
        }
    }

    describe "products" {
        describe "upsert_product" {
            it "inserts a new product" {
                let product = add_product(&db, "SKU-1", "Electronics", 3);

                assert_eq!(product.sku, "SKU-1");
                assert_eq!(product.rating, Some(4.0));
                assert!(product.in_stock());
                assert!(product.is_active);
            }

            it "replaces an existing product but keeps created_at" {
                let first = add_product(&db, "SKU-1", "Electronics", 3);
                let second = db.upsert_product(UpsertProductInput {
                    sku: "SKU-1".to_string(),
                    name: "Renamed".to_string(),
                    category: "Electronics".to_string(),
                    unit_price: 5.0,
                    rating: None,
                    review_count: 0,
                    quantity_on_hand: 0,
                    is_active: false,
                }).expect("Failed to upsert");

                assert_eq!(second.created_at, first.created_at);

                let stored = db.get_product("SKU-1").expect("Query failed").expect("Product missing");
                assert_eq!(stored.name, "Renamed");
                assert_eq!(stored.rating, None);
                assert!(!stored.in_stock());
                assert!(!stored.is_active);
            }

            it "rejects a blank SKU" {
                let result = db.upsert_product(UpsertProductInput {
                    sku: " ".to_string(),
                    name: "Nameless".to_string(),
                    category: "Electronics".to_string(),
                    unit_price: 1.0,
                    rating: None,
                    review_count: 0,
                    quantity_on_hand: 1,
                    is_active: true,
                });
                assert!(result.is_err());
            }

            it "rejects a rating above five" {
                let result = db.upsert_product(UpsertProductInput {
                    sku: "SKU-9".to_string(),
                    name: "Overrated".to_string(),
                    category: "Electronics".to_string(),
                    unit_price: 1.0,
                    rating: Some(5.5),
                    review_count: 0,
                    quantity_on_hand: 1,
                    is_active: true,
                });
                assert!(result.is_err());
            }
        }

        describe "get_product" {
            it "returns None for an unknown SKU" {
                assert!(db.get_product("NOPE").expect("Query failed").is_none());
            }
        }

        describe "list_products" {
            it "returns products ordered by SKU" {
                add_product(&db, "SKU-3", "Electronics", 1);
                add_product(&db, "SKU-1", "Electronics", 1);
                add_product(&db, "SKU-2", "Toys & Games", 1);

                let skus: Vec<String> = db.list_products(None, false).expect("Query failed")
                    .into_iter()
                    .map(|p| p.sku)
                    .collect();
                assert_eq!(skus, vec!["SKU-1", "SKU-2", "SKU-3"]);
            }

            it "filters by category and activity" {
                add_product(&db, "SKU-1", "Electronics", 1);
                add_product(&db, "SKU-2", "Electronics", 1);
                add_product(&db, "SKU-3", "Toys & Games", 1);
                db.set_active("SKU-2", false).expect("Update failed");

                let skus: Vec<String> = db.list_products(Some("Electronics"), true).expect("Query failed")
                    .into_iter()
                    .map(|p| p.sku)
                    .collect();
                assert_eq!(skus, vec!["SKU-1"]);

                assert_eq!(db.list_products(Some("Electronics"), false).expect("Query failed").len(), 2);
            }
        }

        describe "stock and activity" {
            it "updates stock levels" {
                add_product(&db, "SKU-1", "Electronics", 4);

                assert!(db.set_stock("SKU-1", 0).expect("Update failed"));
                let product = db.get_product("SKU-1").expect("Query failed").expect("Product missing");
                assert_eq!(product.quantity_on_hand, 0);
            }

            it "reports unknown SKUs" {
                assert!(!db.set_stock("NOPE", 3).expect("Update failed"));
                assert!(!db.set_active("NOPE", false).expect("Update failed"));
            }
        }
    }

    describe "catalogue" {
        describe "availability" {
            it "reports flags for known products only" {
                add_product(&db, "SKU-1", "Electronics", 2);
                add_product(&db, "SKU-2", "Electronics", 0);
                add_product(&db, "SKU-3", "Electronics", 5);
                db.set_active("SKU-3", false).expect("Update failed");

                let availability = db.availability(&["SKU-1", "SKU-2", "SKU-3", "GHOST"]).expect("Query failed");

                assert_eq!(availability.len(), 3);
                assert!(availability["SKU-1"].is_purchasable());
                assert!(!availability["SKU-2"].in_stock);
                assert!(availability["SKU-2"].is_active);
                assert!(!availability["SKU-3"].is_active);
                assert!(!availability.contains_key("GHOST"));
            }

            it "returns an empty map for no ids" {
                assert!(db.availability(&[]).expect("Query failed").is_empty());
            }

            it "sees stock changes immediately" {
                add_product(&db, "SKU-1", "Electronics", 2);
                db.set_stock("SKU-1", 0).expect("Update failed");

                let availability = db.availability(&["SKU-1"]).expect("Query failed");
                assert!(!availability["SKU-1"].is_purchasable());
            }
        }

        describe "category_of" {
            it "returns the product's category" {
                add_product(&db, "SKU-1", "Sports & Outdoors", 1);

                assert_eq!(db.category_of("SKU-1").expect("Query failed"), Some("Sports & Outdoors".to_string()));
                assert_eq!(db.category_of("NOPE").expect("Query failed"), None);
            }
        }

        describe "active_products" {
            it "excludes inactive products" {
                add_product(&db, "SKU-1", "Electronics", 1);
                add_product(&db, "SKU-2", "Electronics", 1);
                db.set_active("SKU-1", false).expect("Update failed");

                let products = db.active_products(None).expect("Query failed");
                assert_eq!(products.len(), 1);
                assert_eq!(products[0].sku, "SKU-2");
            }
        }
    }
}
