//! # Database Schema Module
//!
//! Creates the normalized cause-list schema:
//!
//! 1. `courts` - reference rows seeded from court profiles, unique on `code`
//! 2. `benches` - unique on `(court_id, bench_number)`
//! 3. `cause_lists` - unique on `(court_id, bench_id, list_date, list_type)`
//! 4. `cases` - unique on `(cause_list_id, case_number)`
//! 5. `tags` / `case_tags` - tag names and the many-to-many pairing
//!
//! Dates are stored as ISO `YYYY-MM-DD` text so they sort lexically.

use crate::store::error::DbError;
use libsql::{Connection, params};

const TABLES: [(&str, &str); 6] = [
    (
        "courts",
        "CREATE TABLE IF NOT EXISTS courts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            code TEXT NOT NULL UNIQUE,
            website TEXT
        )",
    ),
    (
        "benches",
        "CREATE TABLE IF NOT EXISTS benches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            court_id INTEGER NOT NULL,
            bench_number TEXT NOT NULL,
            judges TEXT,
            UNIQUE (court_id, bench_number),
            FOREIGN KEY (court_id) REFERENCES courts(id) ON DELETE CASCADE
        )",
    ),
    (
        "cause_lists",
        "CREATE TABLE IF NOT EXISTS cause_lists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            court_id INTEGER NOT NULL,
            bench_id INTEGER NOT NULL,
            list_date TEXT NOT NULL,
            list_type TEXT NOT NULL DEFAULT 'Daily List',
            pdf_url TEXT,
            pdf_path TEXT,
            created_at INTEGER NOT NULL,
            UNIQUE (court_id, bench_id, list_date, list_type),
            FOREIGN KEY (court_id) REFERENCES courts(id) ON DELETE CASCADE,
            FOREIGN KEY (bench_id) REFERENCES benches(id) ON DELETE CASCADE
        )",
    ),
    (
        "cases",
        "CREATE TABLE IF NOT EXISTS cases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cause_list_id INTEGER NOT NULL,
            case_number TEXT NOT NULL,
            title TEXT,
            item_number TEXT,
            file_number TEXT,
            petitioner_adv TEXT,
            respondent_adv TEXT,
            created_at INTEGER NOT NULL,
            UNIQUE (cause_list_id, case_number),
            FOREIGN KEY (cause_list_id) REFERENCES cause_lists(id) ON DELETE CASCADE
        )",
    ),
    (
        "tags",
        "CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
    ),
    (
        "case_tags",
        "CREATE TABLE IF NOT EXISTS case_tags (
            case_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (case_id, tag_id),
            FOREIGN KEY (case_id) REFERENCES cases(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        )",
    ),
];

const INDEXES: [&str; 3] = [
    "CREATE INDEX IF NOT EXISTS idx_cause_lists_date ON cause_lists(court_id, list_date)",
    "CREATE INDEX IF NOT EXISTS idx_cases_cause_list ON cases(cause_list_id)",
    "CREATE INDEX IF NOT EXISTS idx_case_tags_tag ON case_tags(tag_id)",
];

/// Table names in creation order
pub fn table_names() -> impl Iterator<Item = &'static str> {
    TABLES.iter().map(|(name, _)| *name)
}

/// Initialize the database schema
pub async fn initialize_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute("PRAGMA foreign_keys = ON", params![])
        .await
        .map_err(|e| DbError::Schema(format!("Failed to enable foreign keys: {}", e)))?;

    for (name, ddl) in TABLES {
        conn.execute(ddl, params![])
            .await
            .map_err(|e| DbError::Schema(format!("Failed to create {} table: {}", name, e)))?;
    }

    for ddl in INDEXES {
        conn.execute(ddl, params![])
            .await
            .map_err(|e| DbError::Schema(format!("Failed to create index: {}", e)))?;
    }

    Ok(())
}
