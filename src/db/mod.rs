//! SQLite-backed catalogue: the collaborator that tells the recommender which
//! products exist, which are in stock, and how well they are rated.

mod schema;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};

use crate::models::*;
use crate::recommend::Catalogue;

const PRODUCT_COLUMNS: &str = "sku, name, category, unit_price, rating, review_count, \
     quantity_on_hand, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Category operations
    // ============================================================

    pub fn get_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare("SELECT name, slug FROM categories ORDER BY name")?;

        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    name: row.get(0)?,
                    slug: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Create the category if it does not exist yet.
    pub fn ensure_category(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Category name must not be empty");
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let category = Category {
            name: name.to_string(),
            slug: slugify(name),
        };
        conn.execute(
            "INSERT OR IGNORE INTO categories (name, slug) VALUES (?, ?)",
            (&category.name, &category.slug),
        )?;

        Ok(category)
    }

    // ============================================================
    // Product operations
    // ============================================================

    /// Insert a product, or replace everything but `created_at` if the SKU exists.
    pub fn upsert_product(&self, input: UpsertProductInput) -> Result<Product> {
        if input.sku.trim().is_empty() {
            anyhow::bail!("Product SKU must not be empty");
        }
        if let Some(rating) = input.rating {
            if !(0.0..=5.0).contains(&rating) {
                anyhow::bail!("Product rating must be between 0 and 5");
            }
        }

        let category = self.ensure_category(&input.category)?;
        let existing = self.get_product(&input.sku)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let created_at = existing.map(|p| p.created_at).unwrap_or(now);

        conn.execute(
            "INSERT INTO products (sku, name, category, unit_price, rating, review_count, quantity_on_hand, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(sku) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                unit_price = excluded.unit_price,
                rating = excluded.rating,
                review_count = excluded.review_count,
                quantity_on_hand = excluded.quantity_on_hand,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at",
            (
                &input.sku,
                &input.name,
                &category.name,
                input.unit_price,
                input.rating,
                input.review_count,
                input.quantity_on_hand,
                input.is_active,
                created_at.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Product {
            sku: input.sku,
            name: input.name,
            category: category.name,
            unit_price: input.unit_price,
            rating: input.rating,
            review_count: input.review_count,
            quantity_on_hand: input.quantity_on_hand,
            is_active: input.is_active,
            created_at,
            updated_at: now,
        })
    }

    pub fn get_product(&self, sku: &str) -> Result<Option<Product>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let product = conn
            .query_row(
                &format!("SELECT {} FROM products WHERE sku = ?", PRODUCT_COLUMNS),
                [sku],
                product_from_row,
            )
            .optional()?;

        Ok(product)
    }

    /// Products ordered by SKU, optionally restricted to one category and/or to
    /// active products.
    pub fn list_products(&self, category: Option<&str>, active_only: bool) -> Result<Vec<Product>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        select_products(&conn, category, active_only)
    }

    /// Lock for the `Catalogue` paths, which report a poisoned connection
    /// instead of panicking.
    fn catalogue_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Catalogue connection lock poisoned"))
    }

    /// Returns `false` if the SKU does not exist.
    pub fn set_stock(&self, sku: &str, quantity_on_hand: u32) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let changed = conn.execute(
            "UPDATE products SET quantity_on_hand = ?, updated_at = ? WHERE sku = ?",
            (quantity_on_hand, Utc::now().to_rfc3339(), sku),
        )?;
        Ok(changed > 0)
    }

    /// Returns `false` if the SKU does not exist.
    pub fn set_active(&self, sku: &str, is_active: bool) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let changed = conn.execute(
            "UPDATE products SET is_active = ?, updated_at = ? WHERE sku = ?",
            (is_active, Utc::now().to_rfc3339(), sku),
        )?;
        Ok(changed > 0)
    }
}

impl Catalogue for Database {
    fn availability(&self, product_ids: &[&str]) -> Result<HashMap<String, Availability>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.catalogue_conn()?;
        let placeholders = vec!["?"; product_ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT sku, is_active, quantity_on_hand FROM products WHERE sku IN ({})",
            placeholders
        ))?;

        let availability = stmt
            .query_map(params_from_iter(product_ids.iter()), |row| {
                let quantity: u32 = row.get(2)?;
                Ok((
                    row.get::<_, String>(0)?,
                    Availability {
                        is_active: row.get(1)?,
                        in_stock: quantity > 0,
                    },
                ))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(availability)
    }

    fn category_of(&self, product_id: &str) -> Result<Option<String>> {
        let conn = self.catalogue_conn()?;
        let category = conn
            .query_row(
                "SELECT category FROM products WHERE sku = ?",
                [product_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(category)
    }

    fn active_products(&self, category: Option<&str>) -> Result<Vec<Product>> {
        let conn = self.catalogue_conn()?;
        select_products(&conn, category, true)
    }
}

fn select_products(
    conn: &Connection,
    category: Option<&str>,
    active_only: bool,
) -> Result<Vec<Product>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM products
         WHERE (?1 IS NULL OR category = ?1) AND (?2 = 0 OR is_active = 1)
         ORDER BY sku",
        PRODUCT_COLUMNS
    ))?;

    let products = stmt
        .query_map((category, active_only), product_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(products)
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        sku: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        unit_price: row.get(3)?,
        rating: row.get(4)?,
        review_count: row.get(5)?,
        quantity_on_hand: row.get(6)?,
        is_active: row.get(7)?,
        created_at: parse_datetime(row.get::<_, String>(8)?),
        updated_at: parse_datetime(row.get::<_, String>(9)?),
    })
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
