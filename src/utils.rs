use crate::prelude::*;

#[macro_export]
macro_rules! rand_array {
    ($rng:expr, $low:expr, $high:expr; $($x:expr),*) => {
        {
            Array2::random_using(($($x,)*), Uniform::new($low, $high), $rng)
        }
    };
}

/// Builds a [`Network`] whose hidden layers use `$a` and its derivative.
///
/// `network!(input_shape 2, dense 3, dense 2; Activation::Tanh)`
#[macro_export]
macro_rules! network {
    (input_shape $i:expr, $(dense $x:expr),+ ; $a:expr) => {
        {
            let activation: $crate::core::Activation = $a;
            $crate::models::Network::new($i, &[$($x),+], activation, activation.derivative())
        }
    };
}

/// Converts a list of equally long rows into a matrix.
pub fn matrix_from_rows<A: Scalar>(rows: &[Vec<A>]) -> Result<Array2<A>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some((r, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != ncols) {
        return Err(NNError::ShapeMismatch(format!(
            "row {} has {} columns, expected {}",
            r, row.len(), ncols
        )));
    }
    let flat: Vec<A> = rows.iter().flatten().copied().collect();
    Ok(Array2::from_shape_vec((rows.len(), ncols), flat)?)
}

/// Converts nested per-layer rows (`weights[l][j][i]`) into the matrices
/// [`Network::set_weights`] expects.
pub fn layer_weights_from_rows<A: Scalar>(weights: &[Vec<Vec<A>>]) -> Result<Vec<Array2<A>>> {
    weights.iter().map(|rows| matrix_from_rows(rows)).collect()
}
