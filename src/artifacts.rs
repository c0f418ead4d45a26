use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::encoders::{
    CategoricalEncoder, EncoderArtifact, normalize_team_color, normalize_winner,
};
use crate::model::{FOREST_ARTIFACT_VERSION, ForestModel};

pub const FOREST_FILE: &str = "random_forest.json";
pub const TEAM_ENCODER_FILE: &str = "team_encoder.json";
pub const WINNER_ENCODER_FILE: &str = "winner_encoder.json";
pub const ENCODER_ARTIFACT_VERSION: u32 = 1;

/// The three load-once artifacts every inference call reads from. Built at
/// process start and passed in explicitly so the predictor stays
/// constructible with mock artifacts in tests.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub forest: ForestModel,
    pub team_encoder: CategoricalEncoder,
    pub winner_encoder: CategoricalEncoder,
}

pub fn default_models_dir() -> PathBuf {
    std::env::var("MODELS_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/models"))
}

/// Loads and cross-validates the artifact trio. Any absence or schema
/// mismatch here is a fatal startup condition, never a per-request error.
pub fn load(dir: &Path) -> Result<ModelBundle> {
    let forest: ForestModel = read_json(&dir.join(FOREST_FILE))?;
    let team: EncoderArtifact = read_json(&dir.join(TEAM_ENCODER_FILE))?;
    let winner: EncoderArtifact = read_json(&dir.join(WINNER_ENCODER_FILE))?;

    if forest.version != FOREST_ARTIFACT_VERSION {
        bail!(
            "unsupported forest artifact version {} (expected {FOREST_ARTIFACT_VERSION})",
            forest.version
        );
    }
    for artifact in [&team, &winner] {
        if artifact.version != ENCODER_ARTIFACT_VERSION {
            bail!(
                "unsupported encoder artifact version {} (expected {ENCODER_ARTIFACT_VERSION})",
                artifact.version
            );
        }
    }

    if forest.trees.is_empty() {
        bail!("forest artifact has no trees");
    }
    if let Some(names) = &forest.feature_names {
        if names.len() != forest.n_features {
            bail!(
                "forest declares {} feature names but {} columns",
                names.len(),
                forest.n_features
            );
        }
    }
    if forest.class_labels.len() != winner.classes.len() {
        bail!(
            "forest has {} classes but the winner encoder has {}",
            forest.class_labels.len(),
            winner.classes.len()
        );
    }
    for (idx, tree) in forest.trees.iter().enumerate() {
        tree.validate(forest.n_features, forest.class_labels.len())
            .with_context(|| format!("forest tree {idx} failed validation"))?;
    }

    let team_encoder = CategoricalEncoder::from_classes(team.classes, normalize_team_color)
        .context("build team-color encoder")?;
    let winner_encoder = CategoricalEncoder::from_classes(winner.classes, normalize_winner)
        .context("build winner encoder")?;

    Ok(ModelBundle {
        forest,
        team_encoder,
        winner_encoder,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read artifact {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse artifact {}", path.display()))
}
