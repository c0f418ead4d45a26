use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::artifacts::ModelBundle;
use crate::encoders::normalize_winner;
use crate::error::PredictError;
use crate::features::{MatchRecord, assemble_features};
use crate::model::argmax;

/// Output of one inference call. Probabilities cover every outcome class
/// and sum to 1 within floating tolerance; confidence is the maximum.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub predicted_winner: String,
    pub confidence: f64,
    pub probabilities: BTreeMap<String, f64>,
}

/// Flat row shape shared by the synthetic generator, the batch bin, the
/// sqlite store and the spreadsheet export (one match merged with its
/// prediction, winner label rendered lower-case for downstream display).
#[derive(Debug, Clone, Serialize)]
pub struct PredictedMatchRow {
    pub team_color: String,
    pub game_mode: String,
    pub goal_difference: i64,
    pub match_duration: i64,
    pub overtime: bool,
    pub is_competitive: i64,
    pub predicted_winner: String,
    pub prediction_confidence: f64,
}

impl PredictedMatchRow {
    pub fn from_parts(record: &MatchRecord, prediction: &Prediction) -> Self {
        Self {
            team_color: record.team_color.clone(),
            game_mode: record.game_mode.clone(),
            goal_difference: record.goal_difference,
            match_duration: record.match_duration,
            overtime: record.overtime,
            is_competitive: record.is_competitive.unwrap_or(0),
            predicted_winner: prediction.predicted_winner.to_lowercase(),
            prediction_confidence: prediction.confidence,
        }
    }
}

/// Synchronous inference service: assemble, classify, decode. Holds the
/// read-only artifact bundle for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Predictor {
    bundle: ModelBundle,
    /// Probability slot `i` of the forest belongs to winner-encoder class
    /// `proba_to_class[i]`. Identity when the two orders already agree.
    proba_to_class: Vec<usize>,
}

impl Predictor {
    /// Aligns the forest's class order with the winner encoder's up front,
    /// so per-call code never relies on positional coincidence.
    pub fn new(bundle: ModelBundle) -> Result<Self> {
        let encoder_classes: Vec<String> = bundle
            .winner_encoder
            .classes()
            .iter()
            .map(|c| normalize_winner(c))
            .collect();

        let mut proba_to_class = Vec::with_capacity(bundle.forest.class_labels.len());
        let mut seen = vec![false; encoder_classes.len()];
        for label in &bundle.forest.class_labels {
            let canonical = normalize_winner(label);
            let Some(idx) = encoder_classes.iter().position(|c| *c == canonical) else {
                bail!(
                    "classifier class {label:?} is missing from the winner encoder {encoder_classes:?}"
                );
            };
            if seen[idx] {
                bail!("classifier class {label:?} maps to an already-claimed encoder class");
            }
            seen[idx] = true;
            proba_to_class.push(idx);
        }

        Ok(Self {
            bundle,
            proba_to_class,
        })
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Predicts one match. Deterministic: identical input yields identical
    /// output. All failures arrive as the tagged [`PredictError`].
    pub fn predict_one(&self, record: &MatchRecord) -> Result<Prediction, PredictError> {
        let order = self.bundle.forest.feature_names.as_deref();
        let features = assemble_features(record, &self.bundle.team_encoder, order)?;

        let raw_probs = self.bundle.forest.predict_proba(&features)?;

        // Realign into the winner encoder's class order.
        let classes = self.bundle.winner_encoder.classes();
        let mut aligned = vec![0.0_f64; classes.len()];
        for (slot, p) in raw_probs.iter().enumerate() {
            aligned[self.proba_to_class[slot]] = *p;
        }

        let code = argmax(&aligned);
        let decoded = self.bundle.winner_encoder.decode(code)?;
        let predicted_winner = normalize_winner(decoded);
        let confidence = aligned[code];

        let probabilities = classes
            .iter()
            .zip(&aligned)
            .map(|(class, p)| (normalize_winner(class), *p))
            .collect();

        Ok(Prediction {
            predicted_winner,
            confidence,
            probabilities,
        })
    }
}
