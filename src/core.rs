// src/core.rs
pub mod activations;
pub mod layers;
pub mod losses;

// Re-export commonly used items
pub use activations::{Activation, ActivationFunction, Derivative, Identity};
pub use layers::{Dense, LayerTrait};
pub use losses::{bipolar_target, criteria};

use ndarray::{LinalgScalar, ScalarOperand};
use num_traits::Float;
use rand::distributions::uniform::SampleUniform;
use std::fmt;

/// Element type of every vector and matrix the network owns.
///
/// Inputs, pre-activations, weights and sensitivities all share it: the
/// forward pass feeds an input straight into the buffer the gradient pass
/// later reads, so the two roles cannot diverge.
pub trait Scalar:
    Float + LinalgScalar + ScalarOperand + SampleUniform + fmt::Debug + fmt::Display
{
}

impl<T> Scalar for T where
    T: Float + LinalgScalar + ScalarOperand + SampleUniform + fmt::Debug + fmt::Display
{
}
