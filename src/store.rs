use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::predictor::PredictedMatchRow;

pub fn default_db_path() -> PathBuf {
    std::env::var("PREDICTIONS_DB")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/processed/predictions.sqlite"))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        // A bare file name yields an empty parent; nothing to create then.
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create db directory {}", parent.display()))?;
        }
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch TEXT NOT NULL,
            team_color TEXT NOT NULL,
            game_mode TEXT NOT NULL,
            goal_difference INTEGER NOT NULL,
            match_duration INTEGER NOT NULL,
            overtime INTEGER NOT NULL,
            is_competitive INTEGER NOT NULL,
            predicted_winner TEXT NOT NULL,
            prediction_confidence REAL NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_predictions_mode ON predictions(game_mode);
        CREATE INDEX IF NOT EXISTS idx_predictions_winner ON predictions(predicted_winner);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Appends one batch of flat prediction rows. `batch` tags where the rows
/// came from (`synthetic`, `batch`, ...), so stats can stay batch-agnostic
/// while debugging stays possible.
pub fn save_rows(conn: &mut Connection, batch: &str, rows: &[PredictedMatchRow]) -> Result<usize> {
    let created_at = Utc::now().to_rfc3339();
    let tx = conn.transaction().context("begin prediction insert")?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO predictions(
                    batch, team_color, game_mode, goal_difference, match_duration,
                    overtime, is_competitive, predicted_winner, prediction_confidence, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )
            .context("prepare prediction insert")?;
        for row in rows {
            stmt.execute(params![
                batch,
                row.team_color,
                row.game_mode,
                row.goal_difference,
                row.match_duration,
                row.overtime as i64,
                row.is_competitive,
                row.predicted_winner,
                row.prediction_confidence,
                created_at,
            ])
            .context("insert prediction row")?;
        }
    }
    tx.commit().context("commit prediction rows")?;
    Ok(rows.len())
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct GoalDiffStats {
    pub mean: f64,
    pub std: f64,
    pub min: i64,
    pub max: i64,
}

/// Aggregate view over everything persisted so far; the serving and
/// dashboard collaborators render this as-is.
#[derive(Debug, Clone, Serialize, Default)]
pub struct StatsReport {
    pub total_matches: usize,
    pub game_modes: BTreeMap<String, usize>,
    pub predicted_winner_distribution: BTreeMap<String, usize>,
    pub avg_match_duration: f64,
    pub overtime_percentage: f64,
    pub goal_difference_stats: GoalDiffStats,
}

/// An empty table yields a zeroed report, not an error.
pub fn load_stats(conn: &Connection) -> Result<StatsReport> {
    let mut stmt = conn
        .prepare(
            "SELECT game_mode, predicted_winner, match_duration, overtime, goal_difference
             FROM predictions",
        )
        .context("prepare stats query")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })
        .context("run stats query")?;

    let mut report = StatsReport::default();
    let mut duration_sum = 0i64;
    let mut overtime_count = 0usize;
    let mut diffs: Vec<i64> = Vec::new();

    for row in rows {
        let (mode, winner, duration, overtime, diff) = row.context("read stats row")?;
        report.total_matches += 1;
        *report.game_modes.entry(mode).or_insert(0) += 1;
        *report.predicted_winner_distribution.entry(winner).or_insert(0) += 1;
        duration_sum += duration;
        if overtime != 0 {
            overtime_count += 1;
        }
        diffs.push(diff);
    }

    if report.total_matches == 0 {
        return Ok(report);
    }

    let n = report.total_matches as f64;
    report.avg_match_duration = duration_sum as f64 / n;
    report.overtime_percentage = overtime_count as f64 / n * 100.0;

    let mean = diffs.iter().sum::<i64>() as f64 / n;
    // Sample stddev (n-1 denominator), matching the reference dashboard.
    let std = if diffs.len() > 1 {
        let ss: f64 = diffs.iter().map(|d| (*d as f64 - mean).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    report.goal_difference_stats = GoalDiffStats {
        mean,
        std,
        min: diffs.iter().copied().min().unwrap_or(0),
        max: diffs.iter().copied().max().unwrap_or(0),
    };

    Ok(report)
}
