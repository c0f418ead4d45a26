use serde::{Deserialize, Serialize};

use crate::encoders::CategoricalEncoder;
use crate::error::PredictError;

/// Canonical game modes; the one-hot indicator columns follow this order.
pub const GAME_MODES: [&str; 3] = ["Duel", "Doubles", "Standard"];

/// Column order the training script used. Serving falls back to this when
/// the classifier artifact carries no explicit `feature_names` list.
pub const DEFAULT_FEATURE_ORDER: [&str; 8] = [
    "team_color_encoded",
    "goal_difference",
    "match_duration",
    "mode_Duel",
    "mode_Doubles",
    "mode_Standard",
    "is_competitive",
    "overtime",
];

/// One match as described by the caller. Constructed per request or per
/// synthetic sample, immutable, discarded after use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub team_color: String,
    pub game_mode: String,
    pub goal_difference: i64,
    /// Seconds.
    pub match_duration: i64,
    pub overtime: bool,
    /// Intensity label supplied by the caller; absent/null means 0.
    #[serde(default)]
    pub is_competitive: Option<i64>,
}

/// Case-insensitive match against the canonical mode set.
pub fn canonical_mode(raw: &str) -> Option<&'static str> {
    let raw = raw.trim();
    GAME_MODES.iter().copied().find(|m| m.eq_ignore_ascii_case(raw))
}

/// Builds the numeric feature vector for one match.
///
/// Unknown team color is an error; unknown game mode silently zeros all
/// three indicators (observed training-time behavior, kept on purpose).
/// When `expected_order` is supplied by the classifier artifact the columns
/// are selected into that order, which is what keeps training-time and
/// serving-time layout from silently drifting.
pub fn assemble_features(
    record: &MatchRecord,
    team_encoder: &CategoricalEncoder,
    expected_order: Option<&[String]>,
) -> Result<Vec<f64>, PredictError> {
    let team_code = team_encoder.encode(&record.team_color)? as f64;
    let mode = canonical_mode(&record.game_mode);

    // Single name-to-value mapping; both the fallback layout and artifact
    // selection go through it, so the two can never drift apart.
    let column = |name: &str| -> Result<f64, PredictError> {
        Ok(match name {
            "team_color_encoded" => team_code,
            "goal_difference" => record.goal_difference as f64,
            "match_duration" => record.match_duration as f64,
            "mode_Duel" => (mode == Some("Duel")) as u8 as f64,
            "mode_Doubles" => (mode == Some("Doubles")) as u8 as f64,
            "mode_Standard" => (mode == Some("Standard")) as u8 as f64,
            "is_competitive" => record.is_competitive.unwrap_or(0) as f64,
            "overtime" => record.overtime as u8 as f64,
            other => {
                return Err(PredictError::FeatureShape(format!(
                    "artifact expects column {other:?} which the assembler does not produce"
                )));
            }
        })
    };

    match expected_order {
        Some(order) => order.iter().map(|name| column(name)).collect(),
        None => DEFAULT_FEATURE_ORDER.iter().map(|name| column(name)).collect(),
    }
}

/// Historical competitiveness feature: goal margin within two either way.
/// Distinct concept from the synthetic generator's random intensity flag.
pub fn derived_competitive_flag(goal_difference: i64) -> i64 {
    (goal_difference.abs() <= 2) as i64
}

/// Margin category from the historical feature construction
/// (right-closed bins at -3, -1, 1, 3).
pub fn goal_diff_category(goal_difference: i64) -> &'static str {
    if goal_difference <= -3 {
        "large_loss"
    } else if goal_difference <= -1 {
        "small_loss"
    } else if goal_difference <= 1 {
        "close"
    } else if goal_difference <= 3 {
        "small_win"
    } else {
        "large_win"
    }
}

/// Duration bucket from the historical feature construction
/// (right-closed bins at 300, 360, 420 seconds).
pub fn duration_bucket(match_duration: i64) -> &'static str {
    if match_duration <= 300 {
        "short"
    } else if match_duration <= 360 {
        "normal"
    } else if match_duration <= 420 {
        "long"
    } else {
        "very_long"
    }
}
