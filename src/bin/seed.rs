//! One-shot database seeding.
//!
//! Populates `products` and `sales` with the fixture dataset. Append-only:
//! running it twice duplicates every row.

use sqlpilot::db::Database;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let db_path = std::env::var("SQLPILOT_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.sqlpilot/sqlpilot.db")
    });

    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path, "Seeding database");
    let db = Database::open(&db_path)?;
    db.seed()?;

    let products = db.run_readonly_query("SELECT COUNT(*) FROM products")?;
    let sales = db.run_readonly_query("SELECT COUNT(*) FROM sales")?;
    tracing::info!(
        products = %products.rows[0][0],
        sales = %sales.rows[0][0],
        "Database seeded"
    );

    Ok(())
}
