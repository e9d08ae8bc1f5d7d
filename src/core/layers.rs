use crate::prelude::*;
use crate::rand_array;
use rand::Rng;

/// Object-safe view of a layer, so the hidden stack and the identity head
/// can be walked as one sequence.
pub trait LayerTrait<A: Scalar> {
    fn inputs(&self) -> usize;

    fn outputs(&self) -> usize;

    /// Returns `(z, a)`: the pre-activation vector and the activated output.
    fn forward(&self, a: ArrayView1<A>) -> Result<(Array1<A>, Array1<A>)>;

    fn weights(&self) -> &Array2<A>;

    fn set_weights(&mut self, w: ArrayView2<A>) -> Result<()>;

    fn typ(&self) -> String;
}

/// Fully connected layer. `w[j][i]` connects input `i` to output `j`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Dense<A, F> {
    pub w: Array2<A>,
    pub activation: F,
}

impl<A: Scalar, F: ActivationFunction<A>> Dense<A, F> {
    pub fn new<R: Rng + ?Sized>(
        inputs: usize,
        outputs: usize,
        activation: F,
        init: &WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        if inputs == 0 || outputs == 0 {
            return Err(NNError::InvalidLayerConfiguration(
                "Layer dimensions must be greater than 0".to_string()
            ));
        }
        let (low, high) = init.range::<A>()?;
        Ok(Self {
            w: rand_array!(rng, low, high; outputs, inputs),
            activation,
        })
    }
}

impl<A: Scalar, F: ActivationFunction<A>> LayerTrait<A> for Dense<A, F> {
    fn inputs(&self) -> usize {
        self.w.ncols()
    }

    fn outputs(&self) -> usize {
        self.w.nrows()
    }

    fn forward(&self, a: ArrayView1<A>) -> Result<(Array1<A>, Array1<A>)> {
        if a.len() != self.inputs() {
            return Err(NNError::ShapeMismatch(format!(
                "layer expects {} inputs, got {}",
                self.inputs(), a.len()
            )));
        }
        let z = self.w.dot(&a);
        let a = z.mapv(|z| self.activation.invoke(z));
        Ok((z, a))
    }

    fn weights(&self) -> &Array2<A> {
        &self.w
    }

    fn set_weights(&mut self, w: ArrayView2<A>) -> Result<()> {
        if w.dim() != self.w.dim() {
            return Err(NNError::ShapeMismatch(format!(
                "weight matrix {:?} doesn't match layer shape {:?}",
                w.dim(), self.w.dim()
            )));
        }
        self.w.assign(&w);
        Ok(())
    }

    fn typ(&self) -> String {
        format!("Dense<{}>", self.activation.name())
    }
}
