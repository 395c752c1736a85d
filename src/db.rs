//! Read-only SQLite access to the launch datastore
//!
//! Single-shot read at process start: open read-only, verify the launch
//! table and its required columns, pull every row as loosely typed values.
//! Type coercion is preprocessing's job; this layer only guarantees the
//! schema shape.

use crate::error::PipelineError;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

pub const LAUNCH_TABLE: &str = "analysisLiquidityPool";

/// Columns the rest of the pipeline depends on; any one missing from the
/// loaded table is a fatal schema mismatch.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "TokenMint",
    "TokenName",
    "DetectedAt",
    "Amount",
    "MarketCap",
    "TotalLiquidity",
    "TotalLPProviders",
    "RugScore",
    "TokenAge",
    "IsPump",
    "PriceHistory",
];

/// One raw launch row, values still in SQLite's dynamic typing
#[derive(Debug, Clone)]
pub struct RawLaunch {
    pub token_mint: Value,
    pub token_name: Value,
    pub detected_at: Value,
    pub amount: Value,
    pub market_cap: Value,
    pub total_liquidity: Value,
    pub total_lp_providers: Value,
    pub rug_score: Value,
    pub token_age: Value,
    pub is_pump: Value,
    pub price_history: Value,
}

/// Open the datastore read-only with write locks ruled out
pub fn open_read_only(path: &Path) -> Result<Connection, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::DataUnavailable(format!(
            "datastore not found at {}",
            path.display()
        )));
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| {
            PipelineError::DataUnavailable(format!(
                "failed to open datastore {}: {}",
                path.display(),
                e
            ))
        })?;
    conn.execute("PRAGMA query_only = ON", [])?;
    log::info!("opened datastore read-only: {}", path.display());
    Ok(conn)
}

/// Load every launch row from the launch table
pub fn load_launches(conn: &Connection) -> Result<Vec<RawLaunch>, PipelineError> {
    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [LAUNCH_TABLE],
        |row| row.get(0),
    )?;
    if table_count == 0 {
        return Err(PipelineError::DataUnavailable(format!(
            "table {:?} not found in datastore",
            LAUNCH_TABLE
        )));
    }

    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", LAUNCH_TABLE))?;
    let names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for col in REQUIRED_COLUMNS {
        if !names.iter().any(|n| n == col) {
            return Err(PipelineError::SchemaMismatch(format!(
                "column {:?} missing from table {:?}",
                col, LAUNCH_TABLE
            )));
        }
    }

    let mint = stmt.column_index("TokenMint")?;
    let name = stmt.column_index("TokenName")?;
    let detected_at = stmt.column_index("DetectedAt")?;
    let amount = stmt.column_index("Amount")?;
    let market_cap = stmt.column_index("MarketCap")?;
    let total_liquidity = stmt.column_index("TotalLiquidity")?;
    let total_lp_providers = stmt.column_index("TotalLPProviders")?;
    let rug_score = stmt.column_index("RugScore")?;
    let token_age = stmt.column_index("TokenAge")?;
    let is_pump = stmt.column_index("IsPump")?;
    let price_history = stmt.column_index("PriceHistory")?;

    let rows = stmt.query_map([], |row| {
        Ok(RawLaunch {
            token_mint: row.get(mint)?,
            token_name: row.get(name)?,
            detected_at: row.get(detected_at)?,
            amount: row.get(amount)?,
            market_cap: row.get(market_cap)?,
            total_liquidity: row.get(total_liquidity)?,
            total_lp_providers: row.get(total_lp_providers)?,
            rug_score: row.get(rug_score)?,
            token_age: row.get(token_age)?,
            is_pump: row.get(is_pump)?,
            price_history: row.get(price_history)?,
        })
    })?;

    let mut launches = Vec::new();
    for row in rows {
        launches.push(row?);
    }
    log::info!("loaded {} launch rows from {:?}", launches.len(), LAUNCH_TABLE);
    Ok(launches)
}

/// Most recently modified `.db` file in a directory
///
/// Fallback used when the parameters file does not pin `db_path`.
pub fn latest_db_in(dir: &Path) -> Result<PathBuf, PipelineError> {
    let scan_err = |e: std::io::Error| {
        PipelineError::DataUnavailable(format!(
            "cannot scan datastore directory {}: {}",
            dir.display(),
            e
        ))
    };
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    let entries = std::fs::read_dir(dir).map_err(scan_err)?;
    for entry in entries {
        let entry = entry.map_err(scan_err)?;
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("db") {
            continue;
        }
        let modified = entry.metadata().and_then(|m| m.modified()).map_err(scan_err)?;
        match &newest {
            Some((best, _)) if *best >= modified => {}
            _ => newest = Some((modified, path)),
        }
    }
    newest.map(|(_, path)| path).ok_or_else(|| {
        PipelineError::DataUnavailable(format!(
            "no .db files found under {}",
            dir.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_launch_table(conn: &Connection) {
        conn.execute_batch(
            "CREATE TABLE analysisLiquidityPool (
                id INTEGER PRIMARY KEY,
                TokenMint TEXT, TokenName TEXT, DetectedAt TEXT,
                Amount INTEGER, MarketCap INTEGER, TotalLiquidity INTEGER,
                TotalLPProviders INTEGER, RugScore INTEGER, TokenAge INTEGER,
                IsPump INTEGER, PriceHistory TEXT
            )",
        )
        .unwrap();
    }

    #[test]
    fn test_missing_file_is_data_unavailable() {
        let err = open_read_only(Path::new("/nonexistent/launches.db")).unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable(_)));
    }

    #[test]
    fn test_missing_table_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        Connection::open(&path).unwrap(); // creates an empty database
        let conn = open_read_only(&path).unwrap();
        let err = load_launches(&conn).unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable(_)));
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE analysisLiquidityPool (TokenMint TEXT, TokenName TEXT)",
            )
            .unwrap();
        }
        let conn = open_read_only(&path).unwrap();
        match load_launches(&conn) {
            Err(PipelineError::SchemaMismatch(msg)) => {
                assert!(msg.contains("DetectedAt"), "unexpected message: {}", msg)
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_loads_rows_with_mixed_value_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launches.db");
        {
            let conn = Connection::open(&path).unwrap();
            create_launch_table(&conn);
            conn.execute(
                "INSERT INTO analysisLiquidityPool
                 (TokenMint, TokenName, DetectedAt, Amount, MarketCap, TotalLiquidity,
                  TotalLPProviders, RugScore, TokenAge, IsPump, PriceHistory)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    "mint1",
                    "Token One",
                    "2025-06-01T12:00:00Z",
                    500,
                    600_000,
                    40_000,
                    4,
                    12,
                    9_000_000,
                    0,
                    "[]"
                ],
            )
            .unwrap();
        }
        let conn = open_read_only(&path).unwrap();
        let rows = load_launches(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].token_mint, Value::Text("mint1".to_string()));
        assert_eq!(rows[0].amount, Value::Integer(500));
        assert_eq!(rows[0].market_cap, Value::Integer(600_000));
    }

    #[test]
    fn test_read_only_connection_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.db");
        {
            let conn = Connection::open(&path).unwrap();
            create_launch_table(&conn);
        }
        let conn = open_read_only(&path).unwrap();
        assert!(conn
            .execute("INSERT INTO analysisLiquidityPool (TokenMint) VALUES ('x')", [])
            .is_err());
    }

    #[test]
    fn test_latest_db_in_picks_newest() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.db");
        let new = dir.path().join("new.db");
        std::fs::write(&old, b"x").unwrap();
        std::fs::write(&new, b"x").unwrap();
        let past = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
        let file = std::fs::File::options().write(true).open(&old).unwrap();
        file.set_modified(past).unwrap();

        assert_eq!(latest_db_in(dir.path()).unwrap(), new);

        // Scan failures identify the stage and the directory
        match latest_db_in(&dir.path().join("missing")) {
            Err(PipelineError::DataUnavailable(msg)) => {
                assert!(msg.contains("missing"), "unexpected message: {}", msg)
            }
            other => panic!("expected DataUnavailable, got {:?}", other),
        }
    }
}
