pub mod artifacts;
pub mod encoders;
pub mod error;
pub mod export;
pub mod features;
pub mod model;
pub mod predictor;
pub mod store;
pub mod synthetic;
