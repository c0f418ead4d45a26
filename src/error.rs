use thiserror::Error;

/// Tagged failure contract of the inference core. Everything below the
/// predictor boundary converges into one of these variants; the serving
/// layer maps each tag to a distinct client-facing response.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The normalized label is not among the classes the encoder was
    /// fitted on. Never silently defaulted.
    #[error("unknown category {label:?}: not among fitted classes {classes:?}")]
    UnknownCategory { label: String, classes: Vec<String> },

    /// A class code outside `[0, classes.len())` reached a decode call.
    #[error("invalid class code {code}: encoder has {len} classes")]
    InvalidCode { code: usize, len: usize },

    /// Assembled vector layout disagrees with the classifier artifact.
    /// Indicates artifact drift between training and serving, not bad input.
    #[error("feature shape mismatch: {0}")]
    FeatureShape(String),

    /// Any other classifier failure. Inference is deterministic, so these
    /// are never retried.
    #[error("internal classifier error: {0}")]
    Internal(String),
}
