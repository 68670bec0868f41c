use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::Connection;

struct Migration {
    version: &'static str,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001",
        name: "initial",
        sql: include_str!("migrations/001_initial.sql"),
    },
    Migration {
        version: "002",
        name: "review_count",
        sql: include_str!("migrations/002_review_count.sql"),
    },
];

/// Bring the catalogue schema up to date. Safe to call on every start.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .context("Failed to create schema_migrations table")?;

    let mut applied: HashSet<String> = get_applied_migrations(conn)?.into_iter().collect();

    // Catalogues created before version tracking already carry the initial tables
    if applied.is_empty() && table_exists(conn, "products")? {
        let initial = &MIGRATIONS[0];
        record(conn, initial)?;
        applied.insert(initial.version.to_string());
        tracing::info!(
            "Existing catalogue detected, baselined at migration {}",
            initial.version
        );
    }

    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(m.version)) {
        apply_migration(conn, migration)?;
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(versions)
}

fn record(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
        (
            migration.version,
            migration.name,
            chrono::Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(())
}

fn apply_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    let label = format!("{}_{}", migration.version, migration.name);
    tracing::info!("Applying catalogue migration {}", label);

    let tx = conn
        .unchecked_transaction()
        .with_context(|| format!("Failed to start migration {}", label))?;
    tx.execute_batch(migration.sql)
        .with_context(|| format!("Failed to apply migration {}", label))?;
    record(&tx, migration)?;
    tx.commit()?;

    Ok(())
}
