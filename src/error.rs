use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum NNError {
    // Topology related errors
    InvalidLayerConfiguration(String),
    InvalidWeightInit(String),

    // Shape related errors
    ShapeMismatch(String),
    ShapeError(ndarray::ShapeError),

    // Target related errors
    InvalidLabel { label: usize, classes: usize },
}

impl fmt::Display for NNError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NNError::InvalidLayerConfiguration(msg) => write!(f, "Invalid layer configuration: {}", msg),
            NNError::InvalidWeightInit(msg) => write!(f, "Invalid weight initialisation: {}", msg),
            NNError::ShapeMismatch(msg) => write!(f, "Shape mismatch: {}", msg),
            NNError::ShapeError(err) => write!(f, "Shape error: {}", err),
            NNError::InvalidLabel { label, classes } => write!(
                f,
                "Invalid label {}: expected a class index below {}",
                label, classes
            ),
        }
    }
}

impl From<ndarray::ShapeError> for NNError {
    fn from(err: ndarray::ShapeError) -> NNError {
        NNError::ShapeError(err)
    }
}

impl Error for NNError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NNError::ShapeError(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, NNError>;
