pub use serde::{Serialize, Deserialize};

pub use ndarray::*;
pub use ndarray_rand::RandomExt;
pub use ndarray_rand::rand_distr::Uniform;
pub use num_traits::Float;

pub use crate::models::{Network, NetworkConfig, WeightInit};
pub use crate::error::*;

// Internal re-exports
pub use crate::core::{
    Activation,
    ActivationFunction,
    Derivative,
    Identity,
    Dense,
    LayerTrait,
    Scalar,
    bipolar_target,
    criteria,
};
