use std::collections::BTreeMap;

use anyhow::{Result, bail};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::features::{GAME_MODES, MatchRecord, canonical_mode};
use crate::predictor::{PredictedMatchRow, Predictor};

const GOAL_DIFF_STDDEV: f64 = 3.0;
const GOAL_DIFF_RANGE: i64 = 10;
const DURATION_MEAN: f64 = 300.0;
const DURATION_STDDEV: f64 = 60.0;
const DURATION_MIN: i64 = 180;
const DURATION_MAX: i64 = 600;
const OVERTIME_RATE: f64 = 0.2;
const INTENSITY_RATE: f64 = 0.7;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub count: usize,
    /// Pins every sample to one canonical mode when it names one
    /// (case-insensitive); anything else falls back to uniform selection.
    pub mode_filter: Option<String>,
    /// Explicit seed for reproducible batches; wall clock otherwise.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyntheticSummary {
    pub total_matches: usize,
    pub predictions: BTreeMap<String, usize>,
    pub avg_confidence: f64,
    pub game_mode_filter: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyntheticPopulation {
    pub rows: Vec<PredictedMatchRow>,
    pub summary: SyntheticSummary,
}

/// Fabricates `count` statistically bounded matches and drives every one
/// through the predictor. Fail-fast: the first prediction error aborts the
/// whole batch and is surfaced unchanged; no partial population escapes.
pub fn generate(predictor: &Predictor, request: &GenerateRequest) -> Result<SyntheticPopulation> {
    if request.count == 0 {
        bail!("synthetic batch size must be at least 1");
    }

    let seed = request
        .seed
        .unwrap_or_else(|| Utc::now().timestamp() as u64);
    let mut rng = StdRng::seed_from_u64(seed);

    let pinned = request.mode_filter.as_deref().and_then(canonical_mode);

    let mut rows = Vec::with_capacity(request.count);
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut confidence_sum = 0.0_f64;

    for _ in 0..request.count {
        let game_mode = pinned.unwrap_or_else(|| GAME_MODES[rng.gen_range(0..GAME_MODES.len())]);

        let goal_difference = (sample_normal(&mut rng, 0.0, GOAL_DIFF_STDDEV).round() as i64)
            .clamp(-GOAL_DIFF_RANGE, GOAL_DIFF_RANGE);

        let mut match_duration = (sample_normal(&mut rng, DURATION_MEAN, DURATION_STDDEV).round()
            as i64)
            .clamp(DURATION_MIN, DURATION_MAX);
        let overtime = rng.gen_bool(OVERTIME_RATE);
        if overtime {
            // Extension sits on top of the clamped regulation length.
            match_duration += rng.gen_range(30..=120);
        }

        // Random demo "intensity" label; unrelated to the derived
        // competitiveness feature computed from goal difference.
        let intensity = rng.gen_bool(INTENSITY_RATE) as i64;
        let team_color = if rng.gen_bool(0.5) { "Blue" } else { "Orange" };

        let record = MatchRecord {
            team_color: team_color.to_string(),
            game_mode: game_mode.to_string(),
            goal_difference,
            match_duration,
            overtime,
            is_competitive: Some(intensity),
        };

        let prediction = predictor.predict_one(&record)?;
        let row = PredictedMatchRow::from_parts(&record, &prediction);
        *counts.entry(row.predicted_winner.clone()).or_insert(0) += 1;
        confidence_sum += row.prediction_confidence;
        rows.push(row);
    }

    let summary = SyntheticSummary {
        total_matches: rows.len(),
        predictions: counts,
        avg_confidence: confidence_sum / rows.len() as f64,
        game_mode_filter: pinned.map(|m| m.to_string()),
    };

    Ok(SyntheticPopulation { rows, summary })
}

// Box-Muller; one draw per call is plenty at these batch sizes.
fn sample_normal(rng: &mut impl Rng, mean: f64, stddev: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    mean + stddev * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_samples_have_sane_moments() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let x = sample_normal(&mut rng, 300.0, 60.0);
            sum += x;
            sum_sq += x * x;
        }
        let mean = sum / n as f64;
        let var = sum_sq / n as f64 - mean * mean;
        assert!((mean - 300.0).abs() < 2.0, "mean {mean}");
        assert!((var.sqrt() - 60.0).abs() < 2.0, "stddev {}", var.sqrt());
    }

    #[test]
    fn zero_count_is_rejected() {
        // No predictor needed: the count check fires first, so reaching a
        // prediction would already be the bug.
        let request = GenerateRequest {
            count: 0,
            mode_filter: None,
            seed: Some(1),
        };
        // Build the smallest possible bundle inline.
        let predictor = crate::predictor::Predictor::new(test_bundle()).unwrap();
        assert!(generate(&predictor, &request).is_err());
    }

    #[test]
    fn bounds_and_bookkeeping_hold() {
        let predictor = crate::predictor::Predictor::new(test_bundle()).unwrap();
        let population = generate(
            &predictor,
            &GenerateRequest {
                count: 100,
                mode_filter: None,
                seed: Some(42),
            },
        )
        .unwrap();

        assert_eq!(population.rows.len(), 100);
        assert_eq!(population.summary.total_matches, 100);
        assert_eq!(population.summary.predictions.values().sum::<usize>(), 100);
        assert!(population.summary.avg_confidence > 0.0);
        assert!(population.summary.avg_confidence <= 1.0);

        for row in &population.rows {
            assert!((-10..=10).contains(&row.goal_difference));
            assert!((180..=720).contains(&row.match_duration));
            if !row.overtime {
                assert!(row.match_duration <= 600);
            }
            assert!(["blue", "orange", "draw"].contains(&row.predicted_winner.as_str()));
        }
    }

    #[test]
    fn mode_filter_pins_every_sample() {
        let predictor = crate::predictor::Predictor::new(test_bundle()).unwrap();
        let population = generate(
            &predictor,
            &GenerateRequest {
                count: 50,
                mode_filter: Some("duel".to_string()),
                seed: Some(9),
            },
        )
        .unwrap();

        assert_eq!(population.rows.len(), 50);
        assert_eq!(population.summary.game_mode_filter.as_deref(), Some("Duel"));
        assert!(population.rows.iter().all(|r| r.game_mode == "Duel"));
    }

    #[test]
    fn unrecognized_filter_falls_back_to_uniform_modes() {
        let predictor = crate::predictor::Predictor::new(test_bundle()).unwrap();
        let population = generate(
            &predictor,
            &GenerateRequest {
                count: 60,
                mode_filter: Some("Hoops".to_string()),
                seed: Some(3),
            },
        )
        .unwrap();

        assert!(population.summary.game_mode_filter.is_none());
        let distinct: std::collections::HashSet<&str> = population
            .rows
            .iter()
            .map(|r| r.game_mode.as_str())
            .collect();
        assert!(distinct.len() > 1, "expected a mix of modes, got {distinct:?}");
    }

    #[test]
    fn same_seed_reproduces_the_population() {
        let predictor = crate::predictor::Predictor::new(test_bundle()).unwrap();
        let request = GenerateRequest {
            count: 25,
            mode_filter: None,
            seed: Some(1234),
        };
        let a = generate(&predictor, &request).unwrap();
        let b = generate(&predictor, &request).unwrap();
        for (x, y) in a.rows.iter().zip(&b.rows) {
            assert_eq!(x.team_color, y.team_color);
            assert_eq!(x.game_mode, y.game_mode);
            assert_eq!(x.goal_difference, y.goal_difference);
            assert_eq!(x.match_duration, y.match_duration);
            assert_eq!(x.predicted_winner, y.predicted_winner);
        }
        assert_eq!(a.summary.predictions, b.summary.predictions);
    }

    fn test_bundle() -> crate::artifacts::ModelBundle {
        use crate::encoders::{CategoricalEncoder, normalize_team_color, normalize_winner};
        use crate::model::{FOREST_ARTIFACT_VERSION, ForestModel, Tree};

        crate::artifacts::ModelBundle {
            forest: ForestModel {
                version: FOREST_ARTIFACT_VERSION,
                n_features: 8,
                feature_names: None,
                class_labels: vec![
                    "Blue".to_string(),
                    "Draw".to_string(),
                    "Orange".to_string(),
                ],
                trees: vec![Tree {
                    feature: vec![1, -1, 1, -1, -1],
                    threshold: vec![-0.5, 0.0, 0.5, 0.0, 0.0],
                    left: vec![1, -1, 3, -1, -1],
                    right: vec![2, -1, 4, -1, -1],
                    value: vec![
                        vec![0.0, 0.0, 0.0],
                        vec![1.0, 2.0, 12.0],
                        vec![0.0, 0.0, 0.0],
                        vec![2.0, 11.0, 2.0],
                        vec![12.0, 2.0, 1.0],
                    ],
                }],
            },
            team_encoder: CategoricalEncoder::from_classes(
                vec!["Blue".to_string(), "Orange".to_string()],
                normalize_team_color,
            )
            .unwrap(),
            winner_encoder: CategoricalEncoder::from_classes(
                vec!["Blue".to_string(), "Draw".to_string(), "Orange".to_string()],
                normalize_winner,
            )
            .unwrap(),
        }
    }
}
