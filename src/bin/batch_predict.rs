use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rayon::prelude::*;

use rl_winner::artifacts;
use rl_winner::features::{MatchRecord, duration_bucket, goal_diff_category};
use rl_winner::predictor::{PredictedMatchRow, Predictor};
use rl_winner::store;

/// One-shot batch predictor: loads a JSON array of match records, scores
/// every record, stores the flat rows and prints the winner distribution.
/// Rows keep their input order; predictions are independent per record so
/// the scoring loop runs on the rayon pool.
fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/processed/matches.json"));

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read dataset {}", path.display()))?;
    let records: Vec<MatchRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("parse dataset {}", path.display()))?;
    if records.is_empty() {
        println!("No match records in {}", path.display());
        return Ok(());
    }

    let dir = artifacts::default_models_dir();
    let bundle = artifacts::load(&dir)
        .with_context(|| format!("load model artifacts from {}", dir.display()))?;
    let predictor = Predictor::new(bundle)?;

    let rows: Vec<PredictedMatchRow> = records
        .par_iter()
        .map(|record| {
            predictor
                .predict_one(record)
                .map(|p| PredictedMatchRow::from_parts(record, &p))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let db_path = store::default_db_path();
    let mut conn = store::open_db(&db_path)?;
    let saved = store::save_rows(&mut conn, "batch", &rows)?;

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut margins: BTreeMap<&str, usize> = BTreeMap::new();
    let mut durations: BTreeMap<&str, usize> = BTreeMap::new();
    let mut confidence_sum = 0.0;
    for row in &rows {
        *counts.entry(row.predicted_winner.as_str()).or_insert(0) += 1;
        *margins.entry(goal_diff_category(row.goal_difference)).or_insert(0) += 1;
        *durations.entry(duration_bucket(row.match_duration)).or_insert(0) += 1;
        confidence_sum += row.prediction_confidence;
    }

    println!("Predicted {saved} matches from {}", path.display());
    for (winner, count) in counts {
        println!("  {winner}: {count}");
    }
    println!("Margin profile:");
    for (category, count) in margins {
        println!("  {category}: {count}");
    }
    println!("Duration profile:");
    for (bucket, count) in durations {
        println!("  {bucket}: {count}");
    }
    println!(
        "Average confidence: {:.4}",
        confidence_sum / rows.len() as f64
    );
    println!("Rows stored in {}", db_path.display());
    Ok(())
}
