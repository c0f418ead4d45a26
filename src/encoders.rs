use std::collections::HashMap;

use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::PredictError;

static TEAM_SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("blue", "Blue"),
        ("azul", "Blue"),
        ("b", "Blue"),
        ("orange", "Orange"),
        ("naranja", "Orange"),
        ("o", "Orange"),
    ])
});

static WINNER_SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("blue", "Blue"),
        ("azul", "Blue"),
        ("b", "Blue"),
        ("orange", "Orange"),
        ("naranja", "Orange"),
        ("o", "Orange"),
        ("draw", "Draw"),
        ("empate", "Draw"),
        ("tie", "Draw"),
    ])
});

/// Maps a team-color token (English/Spanish synonyms, any casing) to its
/// canonical form. Unrecognized strings are title-cased and passed through
/// so that user echoes stay readable. Idempotent.
pub fn normalize_team_color(raw: &str) -> String {
    let key = raw.trim().to_lowercase();
    match TEAM_SYNONYMS.get(key.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => capitalize(raw.trim()),
    }
}

/// Same rule as [`normalize_team_color`] but over the outcome vocabulary,
/// which additionally recognizes the draw synonyms. Runs on every ingress
/// and egress path so encoder lookups and displayed labels stay consistent.
pub fn normalize_winner(raw: &str) -> String {
    let key = raw.trim().to_lowercase();
    match WINNER_SYNONYMS.get(key.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => capitalize(raw.trim()),
    }
}

// First char to uppercase, remainder lowered ("bLuE" -> "Blue").
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// On-disk shape of a fitted encoder (see `artifacts`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderArtifact {
    pub version: u32,
    pub classes: Vec<String>,
}

/// A fitted bijection between label strings and small integer codes.
/// Built once from a training-time artifact; no mutation path exists
/// afterwards, so concurrent reads need no locking.
#[derive(Debug, Clone)]
pub struct CategoricalEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
    normalizer: fn(&str) -> String,
}

impl CategoricalEncoder {
    pub fn from_classes(classes: Vec<String>, normalizer: fn(&str) -> String) -> Result<Self> {
        if classes.is_empty() {
            bail!("encoder artifact has no classes");
        }
        let mut index = HashMap::with_capacity(classes.len());
        for (code, label) in classes.iter().enumerate() {
            if index.insert(label.clone(), code).is_some() {
                bail!("duplicate encoder class {label:?}");
            }
        }
        Ok(Self {
            classes,
            index,
            normalizer,
        })
    }

    /// Normalizes the label, then looks it up in the fitted vocabulary.
    pub fn encode(&self, label: &str) -> Result<usize, PredictError> {
        let canonical = (self.normalizer)(label);
        self.index
            .get(&canonical)
            .copied()
            .ok_or_else(|| PredictError::UnknownCategory {
                label: canonical,
                classes: self.classes.clone(),
            })
    }

    pub fn decode(&self, code: usize) -> Result<&str, PredictError> {
        self.classes
            .get(code)
            .map(|s| s.as_str())
            .ok_or(PredictError::InvalidCode {
                code,
                len: self.classes.len(),
            })
    }

    /// The fitted label order; code `i` decodes to `classes()[i]`.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn normalize_label(&self, raw: &str) -> String {
        (self.normalizer)(raw)
    }
}
