pub mod core;
pub mod error;
pub mod models;
pub mod prelude;
pub mod utils;

// Re-export types
pub use crate::core::{Activation, ActivationFunction, Dense, Identity, LayerTrait, Scalar};
pub use error::{NNError, Result};
pub use models::{Network, NetworkConfig, WeightInit};
