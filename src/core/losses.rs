use crate::prelude::*;

fn check_label(label: usize, classes: usize) -> Result<()> {
    if label >= classes {
        return Err(NNError::InvalidLabel { label, classes });
    }
    Ok(())
}

/// Component `i` of the bipolar encoding of `label`.
fn bipolar<A: Scalar>(i: usize, label: usize) -> A {
    if i == label {A::one()} else {-A::one()}
}

/// Bipolar one-hot encoding: `+1` at `label`, `-1` everywhere else.
pub fn bipolar_target<A: Scalar>(label: usize, classes: usize) -> Result<Array1<A>> {
    check_label(label, classes)?;
    Ok(Array1::from_shape_fn(classes, |i| bipolar(i, label)))
}

/// Squared error of `y_hat` against the bipolar target of `label`:
/// `sum((y_hat - t)^2)`.
pub fn criteria<A: Scalar>(y_hat: ArrayView1<A>, label: usize) -> Result<A> {
    check_label(label, y_hat.len())?;
    Ok(y_hat
        .indexed_iter()
        .fold(A::zero(), |acc, (i, &y)| {
            let d = y - bipolar(i, label);
            acc + d * d
        }))
}

/// Writes `2 * (y_hat - t)`, the derivative of [`criteria`] with respect to
/// `y_hat`, into `da`.
pub(crate) fn criteria_gradient<A: Scalar>(y_hat: ArrayView1<A>, label: usize, mut da: ArrayViewMut1<A>) {
    let two = A::one() + A::one();
    Zip::indexed(&mut da)
        .and(&y_hat)
        .for_each(|i, d, &y| *d = two * (y - bipolar(i, label)));
}
