use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};

use rl_winner::artifacts;
use rl_winner::export;
use rl_winner::features::MatchRecord;
use rl_winner::predictor::Predictor;
use rl_winner::store;
use rl_winner::synthetic::{self, GenerateRequest};

fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "predict" => {
            let path = args
                .next()
                .map(PathBuf::from)
                .context("usage: rl_winner predict <match.json>")?;
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("read match file {}", path.display()))?;
            let record: MatchRecord = serde_json::from_str(&raw)
                .with_context(|| format!("parse match file {}", path.display()))?;

            let predictor = load_predictor()?;
            let prediction = predictor.predict_one(&record)?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        "generate" => {
            let count = args
                .next()
                .context("usage: rl_winner generate <count> [mode]")?
                .parse::<usize>()
                .context("count must be a positive integer")?;
            let mode_filter = args.next();
            let seed = std::env::var("SYNTHETIC_SEED")
                .ok()
                .and_then(|v| v.parse::<u64>().ok());

            let predictor = load_predictor()?;
            let population = synthetic::generate(
                &predictor,
                &GenerateRequest {
                    count,
                    mode_filter,
                    seed,
                },
            )?;

            let db_path = store::default_db_path();
            let mut conn = store::open_db(&db_path)?;
            let saved = store::save_rows(&mut conn, "synthetic", &population.rows)?;
            eprintln!("[INFO] Saved {saved} rows to {}", db_path.display());

            if let Ok(xlsx) = std::env::var("EXPORT_XLSX") {
                if !xlsx.trim().is_empty() {
                    let report = export::export_population(Path::new(&xlsx), &population)?;
                    eprintln!("[INFO] Exported {} rows to {xlsx}", report.rows);
                }
            }

            println!("{}", serde_json::to_string_pretty(&population.summary)?);
        }
        "stats" => {
            let conn = store::open_db(&store::default_db_path())?;
            let report = store::load_stats(&conn)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        other => {
            print_usage();
            bail!("unknown command {other:?}");
        }
    }

    Ok(())
}

fn load_predictor() -> Result<Predictor> {
    let dir = artifacts::default_models_dir();
    let bundle = artifacts::load(&dir)
        .with_context(|| format!("load model artifacts from {}", dir.display()))?;
    Predictor::new(bundle)
}

fn print_usage() {
    eprintln!("usage: rl_winner <command>");
    eprintln!("  predict <match.json>     predict one match, print JSON");
    eprintln!("  generate <count> [mode]  synthesize matches, store + summarize");
    eprintln!("  stats                    aggregate stored predictions");
    eprintln!();
    eprintln!("env: MODELS_DIR, PREDICTIONS_DB, SYNTHETIC_SEED, EXPORT_XLSX");
}
