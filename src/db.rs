//! Relational store for the assistant's sample dataset.
//!
//! Two tables, `products` and `sales`, queried by the `db` tool. The guard
//! here enforces the read-only contract the system prompt promises: only
//! statements whose leading keyword is SELECT ever reach the driver.

use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Forbidden statement: only SELECT queries are permitted")]
    ForbiddenStatement,
}

pub type DbResult<T> = Result<T, DbError>;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    price REAL NOT NULL,
    stock INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS sales (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL REFERENCES products(id),
    quantity INTEGER NOT NULL,
    total_amount REAL NOT NULL,
    sale_date TEXT DEFAULT CURRENT_TIMESTAMP,
    customer_name TEXT NOT NULL,
    region TEXT NOT NULL
);
";

/// Result of a query: column names plus rows of JSON values.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Execute an arbitrary SQL query and collect its result rows.
    ///
    /// No statement-kind check happens here; callers that expose this to the
    /// model must go through [`ensure_select_only`] first.
    pub fn execute_query(&self, sql: &str) -> DbResult<QueryOutput> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;

        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(ToString::to_string)
            .collect();
        let column_count = columns.len();

        let mut rows = Vec::new();
        let mut raw_rows = stmt.query([])?;
        while let Some(row) = raw_rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(value_ref_to_json(row.get_ref(i)?));
            }
            rows.push(values);
        }

        Ok(QueryOutput { columns, rows })
    }

    /// Enforce the read-only contract, then execute.
    pub fn run_readonly_query(&self, sql: &str) -> DbResult<QueryOutput> {
        ensure_select_only(sql)?;
        self.execute_query(sql)
    }

    /// Populate both tables with the fixture dataset. Append-only: running
    /// twice duplicates every row (no uniqueness guard beyond the primary key).
    pub fn seed(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();

        let products: &[(&str, &str, f64, i64)] = &[
            ("Laptop", "Electronics", 999.99, 50),
            ("Mouse", "Electronics", 25.99, 200),
            ("Keyboard", "Electronics", 75.0, 150),
            ("Monitor", "Electronics", 299.99, 75),
            ("Desk Chair", "Furniture", 199.99, 40),
            ("Desk", "Furniture", 399.99, 30),
            ("Notebook", "Stationery", 5.99, 500),
            ("Pen Set", "Stationery", 12.99, 300),
            ("Smartphone", "Electronics", 799.99, 60),
            ("Headphones", "Electronics", 149.99, 120),
            ("Office Lamp", "Furniture", 89.99, 45),
            ("Bookshelf", "Furniture", 249.99, 25),
            ("Backpack", "Accessories", 59.99, 180),
            ("Water Bottle", "Accessories", 19.99, 350),
            ("Sticky Notes", "Stationery", 3.49, 600),
            ("Printer", "Electronics", 199.99, 35),
            ("Smartwatch", "Electronics", 299.99, 80),
            ("Desk Organizer", "Accessories", 24.99, 150),
        ];

        let sales: &[(i64, i64, f64, &str, &str)] = &[
            (1, 5, 4999.95, "John Doe", "North"),
            (2, 10, 259.9, "Jane Smith", "East"),
            (3, 3, 225.0, "Mark Wilson", "South"),
            (4, 2, 599.98, "Emily Johnson", "West"),
            (5, 1, 199.99, "Michael Brown", "North"),
            (6, 4, 1599.96, "Sarah Davis", "East"),
            (7, 20, 119.8, "David Lee", "South"),
            (8, 15, 194.85, "Emma White", "West"),
            (1, 1, 999.99, "Chris Green", "North"),
            (3, 6, 450.0, "Sophia Taylor", "East"),
            (2, 8, 207.92, "James Hall", "South"),
            (9, 2, 1599.98, "Olivia Martin", "West"),
            (10, 5, 749.95, "William King", "North"),
            (11, 3, 269.97, "Ava Scott", "East"),
            (12, 1, 249.99, "Daniel Harris", "South"),
            (13, 7, 419.93, "Lily Brown", "North"),
            (14, 10, 199.9, "Ethan Walker", "East"),
            (15, 25, 87.25, "Charlotte Adams", "West"),
            (16, 2, 399.98, "Lucas Clark", "South"),
            (17, 4, 1199.96, "Amelia Lewis", "North"),
            (18, 6, 149.94, "Benjamin Young", "East"),
        ];

        let mut product_stmt = conn.prepare(
            "INSERT INTO products (name, category, price, stock) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (name, category, price, stock) in products {
            product_stmt.execute(rusqlite::params![name, category, price, stock])?;
        }

        let mut sale_stmt = conn.prepare(
            "INSERT INTO sales (product_id, quantity, total_amount, customer_name, region)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (product_id, quantity, total, customer, region) in sales {
            sale_stmt.execute(rusqlite::params![product_id, quantity, total, customer, region])?;
        }

        Ok(())
    }
}

/// Reject any statement whose leading keyword is not SELECT.
///
/// Leading whitespace and `--` / `/* */` comments are stripped first, then the
/// first word must be `select`, case-insensitively. CTE-style `WITH` is also
/// rejected: fail closed rather than parse SQL.
pub fn ensure_select_only(sql: &str) -> DbResult<()> {
    static SELECT_RE: OnceLock<Regex> = OnceLock::new();
    let re = SELECT_RE.get_or_init(|| Regex::new(r"(?i)^select\b").unwrap());

    if re.is_match(strip_leading_trivia(sql)) {
        Ok(())
    } else {
        Err(DbError::ForbiddenStatement)
    }
}

fn strip_leading_trivia(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map_or("", |(_, tail)| tail);
        } else {
            return rest;
        }
        rest = rest.trim_start();
    }
}

fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::from(
            b.iter()
                .map(|byte| format!("{byte:02x}"))
                .collect::<String>(),
        ),
    }
}
