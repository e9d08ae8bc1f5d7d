use crate::prelude::*;
use crate::core::losses::criteria_gradient;
use ndarray::linalg::general_mat_vec_mul;
use num_traits::NumCast;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::iter;

/// Uniform range the initial weights are drawn from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct WeightInit {
    pub low: f64,
    pub high: f64,
}

impl Default for WeightInit {
    fn default() -> Self {
        Self { low: -1.0, high: 1.0 }
    }
}

impl WeightInit {
    pub fn range<A: Scalar>(&self) -> Result<(A, A)> {
        let cast = |x: f64| {
            <A as NumCast>::from(x)
                .filter(|v| v.is_finite())
                .ok_or_else(|| NNError::InvalidWeightInit(format!("bound {} is not a finite value", x)))
        };
        let (low, high) = (cast(self.low)?, cast(self.high)?);
        if !(low < high) {
            return Err(NNError::InvalidWeightInit(format!(
                "empty range {}..{}",
                self.low, self.high
            )));
        }
        if !(high - low).is_finite() {
            return Err(NNError::InvalidWeightInit(format!(
                "range {}..{} is too wide to sample",
                self.low, self.high
            )));
        }
        Ok((low, high))
    }
}

/// Topology and initialisation settings of a [`Network`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NetworkConfig {
    pub num_inputs: usize,
    pub nodes_per_layer: Vec<usize>,
    #[serde(default)]
    pub weight_init: WeightInit,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl NetworkConfig {
    pub fn new(num_inputs: usize) -> Self {
        Self {
            num_inputs,
            ..Self::default()
        }
    }

    pub fn layer(mut self, width: usize) -> Self {
        self.nodes_per_layer.push(width);
        self
    }

    pub fn weight_init(mut self, low: f64, high: f64) -> Self {
        self.weight_init = WeightInit { low, high };
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes_per_layer.len() < 2 {
            return Err(NNError::InvalidLayerConfiguration(format!(
                "a network needs at least 2 layers, got {}",
                self.nodes_per_layer.len()
            )));
        }
        if self.num_inputs == 0 || self.nodes_per_layer.contains(&0) {
            return Err(NNError::InvalidLayerConfiguration(
                "Layer dimensions must be greater than 0".to_string()
            ));
        }
        self.weight_init.range::<f64>()?;
        Ok(())
    }
}

/// Dense feed-forward network trained one example at a time.
///
/// Every layer but the last applies `transfer`; the last one is always an
/// [`Identity`] head, whatever `transfer` is. `derivative` must be the
/// derivative of `transfer`, it is evaluated at cached pre-activations
/// during back-propagation.
#[derive(Debug, Clone)]
pub struct Network<A, F, D> {
    num_inputs: usize,
    nodes_per_layer: Vec<usize>,
    transfer: F,
    derivative: D,
    hidden: Vec<Dense<A, F>>,
    head: Dense<A, Identity>,
    // pre-activations of the last training input, per layer
    activations: Vec<Array1<A>>,
    // sensitivities, rewritten by every training step
    delta: Vec<Array1<A>>,
    // working copy of each layer's weights
    temp_weights: Vec<Array2<A>>,
    // transfer(activations[l]) for every layer but the head
    outputs: Vec<Array1<A>>,
}

impl<A, F, D> Network<A, F, D>
where
    A: Scalar,
    F: ActivationFunction<A> + Clone,
    D: ActivationFunction<A>,
{
    pub fn new(num_inputs: usize, nodes_per_layer: &[usize], transfer: F, derivative: D) -> Result<Self> {
        let config = NetworkConfig {
            num_inputs,
            nodes_per_layer: nodes_per_layer.to_vec(),
            ..NetworkConfig::default()
        };
        Self::from_config(&config, transfer, derivative)
    }

    pub fn from_config(config: &NetworkConfig, transfer: F, derivative: D) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let widths = &config.nodes_per_layer;
        let last = widths.len() - 1;
        let mut hidden = Vec::with_capacity(last);
        let mut prev = config.num_inputs;
        for &width in &widths[..last] {
            hidden.push(Dense::new(prev, width, transfer.clone(), &config.weight_init, &mut rng)?);
            prev = width;
        }
        // `transfer` is ignored here: the last layer is a linear score head.
        let head = Dense::new(prev, widths[last], Identity, &config.weight_init, &mut rng)?;

        let activations = widths.iter().map(|&n| Array1::zeros(n)).collect();
        let delta = widths.iter().map(|&n| Array1::zeros(n)).collect();
        let temp_weights = layer_stack(&hidden, &head)
            .map(|layer| layer.weights().clone())
            .collect();
        let outputs = widths[..last].iter().map(|&n| Array1::zeros(n)).collect();

        let network = Self {
            num_inputs: config.num_inputs,
            nodes_per_layer: widths.clone(),
            transfer,
            derivative,
            hidden,
            head,
            activations,
            delta,
            temp_weights,
            outputs,
        };
        log::debug!(
            "built network: {} inputs, widths {:?}, {} parameters",
            network.num_inputs,
            network.nodes_per_layer,
            network.count_parameters()
        );
        Ok(network)
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_layers(&self) -> usize {
        self.nodes_per_layer.len()
    }

    pub fn nodes_per_layer(&self) -> &[usize] {
        &self.nodes_per_layer
    }

    /// Number of classes, i.e. the width of the identity head.
    pub fn output_width(&self) -> usize {
        self.head.outputs()
    }

    /// Total number of weights across all layers.
    pub fn count_parameters(&self) -> usize {
        layer_stack(&self.hidden, &self.head)
            .map(|layer| layer.weights().len())
            .sum()
    }

    /// One description per layer, e.g. `Dense<Tanh>`, head last.
    pub fn layer_types(&self) -> Vec<String> {
        layer_stack(&self.hidden, &self.head)
            .map(|layer| layer.typ())
            .collect()
    }

    /// Current weight matrices, one `[outputs][inputs]` matrix per layer.
    pub fn weights(&self) -> Vec<Array2<A>> {
        layer_stack(&self.hidden, &self.head)
            .map(|layer| layer.weights().clone())
            .collect()
    }

    /// Installs one weight matrix per layer and mirrors them into the
    /// working copy. Nothing is installed unless every shape matches.
    pub fn set_weights(&mut self, weights: &[Array2<A>]) -> Result<()> {
        if weights.len() != self.num_layers() {
            return Err(NNError::ShapeMismatch(format!(
                "expected {} weight matrices, got {}",
                self.num_layers(), weights.len()
            )));
        }
        for (l, (w, current)) in weights.iter().zip(&self.temp_weights).enumerate() {
            if w.dim() != current.dim() {
                return Err(NNError::ShapeMismatch(format!(
                    "layer {} expects weights {:?}, got {:?}",
                    l, current.dim(), w.dim()
                )));
            }
        }

        for (layer, w) in layer_stack_mut(&mut self.hidden, &mut self.head).zip(weights) {
            layer.set_weights(w.view())?;
        }
        for (temp, w) in self.temp_weights.iter_mut().zip(weights) {
            temp.assign(w);
        }
        log::debug!("installed weights for {} layers", weights.len());
        Ok(())
    }

    /// Runs `inputs` through every layer and returns the head's output.
    /// Leaves the training buffers untouched.
    pub fn feed_forward<S: Data<Elem = A>>(&self, inputs: &ArrayBase<S, Ix1>) -> Result<Array1<A>> {
        self.check_inputs(inputs.view())?;
        forward_pass(layer_stack(&self.hidden, &self.head), inputs.view(), None)
    }

    /// Squared error of the network output against the bipolar target of `label`.
    pub fn compute_mse<S: Data<Elem = A>>(&self, inputs: &ArrayBase<S, Ix1>, label: usize) -> Result<A> {
        let y_hat = self.feed_forward(inputs)?;
        criteria(y_hat.view(), label)
    }

    /// One stochastic gradient descent step on a single `(inputs, label)` pair.
    pub fn back_propagation<S: Data<Elem = A>>(
        &mut self,
        inputs: &ArrayBase<S, Ix1>,
        label: usize,
        epsilon: A,
    ) -> Result<()> {
        self.check_inputs(inputs.view())?;
        let classes = self.output_width();
        if label >= classes {
            return Err(NNError::InvalidLabel { label, classes });
        }

        self.compute_activations(inputs.view())?;
        self.compute_sensitivity(label);
        self.update_weights(inputs.view(), epsilon)
    }

    fn check_inputs(&self, inputs: ArrayView1<A>) -> Result<()> {
        if inputs.len() != self.num_inputs {
            return Err(NNError::ShapeMismatch(format!(
                "network expects {} inputs, got {}",
                self.num_inputs, inputs.len()
            )));
        }
        Ok(())
    }

    // Same traversal as `feed_forward`, recording every layer's pre-activations.
    fn compute_activations(&mut self, inputs: ArrayView1<A>) -> Result<()> {
        forward_pass(
            layer_stack(&self.hidden, &self.head),
            inputs,
            Some(self.activations.as_mut_slice()),
        )?;
        Ok(())
    }

    // `label` must already be checked against the head width.
    fn compute_sensitivity(&mut self, label: usize) {
        let last = self.delta.len() - 1;

        if log::log_enabled!(log::Level::Trace) {
            if let Ok(loss) = criteria(self.activations[last].view(), label) {
                log::trace!("training step: label {}, loss {}", label, loss);
            }
        }
        // The head is an identity, so dJ/dz is just the loss gradient.
        criteria_gradient(self.activations[last].view(), label, self.delta[last].view_mut());

        for l in (0..last).rev() {
            let (lower, upper) = self.delta.split_at_mut(l + 1);
            general_mat_vec_mul(A::one(), &self.temp_weights[l + 1].t(), &upper[0], A::zero(), &mut lower[l]);
            let derivative = &self.derivative;
            Zip::from(&mut lower[l])
                .and(&self.activations[l])
                .for_each(|d, &z| *d = *d * derivative.invoke(z));
        }
    }

    fn update_weights(&mut self, inputs: ArrayView1<A>, epsilon: A) -> Result<()> {
        let transfer = &self.transfer;
        for (out, z) in self.outputs.iter_mut().zip(&self.activations) {
            Zip::from(out).and(z).for_each(|a, &z| *a = transfer.invoke(z));
        }

        for (l, w) in self.temp_weights.iter_mut().enumerate() {
            let upstream = if l == 0 {inputs.view()} else {self.outputs[l - 1].view()};
            // w[j][i] -= epsilon * delta[j] * upstream[i]
            Zip::from(w.rows_mut())
                .and(&self.delta[l])
                .for_each(|mut row, &d| row.scaled_add(-epsilon * d, &upstream));
        }

        for (layer, w) in layer_stack_mut(&mut self.hidden, &mut self.head).zip(&self.temp_weights) {
            layer.set_weights(w.view())?;
        }
        Ok(())
    }
}

fn layer_stack<'a, A, F>(
    hidden: &'a [Dense<A, F>],
    head: &'a Dense<A, Identity>,
) -> impl Iterator<Item = &'a dyn LayerTrait<A>> + 'a
where
    A: Scalar,
    F: ActivationFunction<A> + 'a,
{
    hidden
        .iter()
        .map(|layer| layer as &dyn LayerTrait<A>)
        .chain(iter::once(head as &dyn LayerTrait<A>))
}

fn layer_stack_mut<'a, A, F>(
    hidden: &'a mut [Dense<A, F>],
    head: &'a mut Dense<A, Identity>,
) -> impl Iterator<Item = &'a mut dyn LayerTrait<A>> + 'a
where
    A: Scalar,
    F: ActivationFunction<A> + 'a,
{
    hidden
        .iter_mut()
        .map(|layer| layer as &mut dyn LayerTrait<A>)
        .chain(iter::once(head as &mut dyn LayerTrait<A>))
}

fn forward_pass<'a, A: Scalar>(
    layers: impl Iterator<Item = &'a dyn LayerTrait<A>>,
    inputs: ArrayView1<A>,
    mut record: Option<&mut [Array1<A>]>,
) -> Result<Array1<A>> {
    let mut a: Option<Array1<A>> = None;
    for (l, layer) in layers.enumerate() {
        let input = match &a {
            Some(prev) => prev.view(),
            None => inputs.view(),
        };
        let (z, out) = layer.forward(input)?;
        if let Some(record) = record.as_deref_mut() {
            record[l].assign(&z);
        }
        a = Some(out);
    }
    Ok(a.unwrap_or_else(|| inputs.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builds_fluently() {
        let config = NetworkConfig::new(4).layer(8).layer(3).weight_init(-0.5, 0.5).seed(11);
        assert_eq!(config.num_inputs, 4);
        assert_eq!(config.nodes_per_layer, vec![8, 3]);
        assert_eq!(config.weight_init, WeightInit { low: -0.5, high: 0.5 });
        assert_eq!(config.seed, Some(11));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn single_layer_config_is_rejected() {
        let err = NetworkConfig::new(2).layer(2).validate().unwrap_err();
        assert!(matches!(err, NNError::InvalidLayerConfiguration(_)));
    }

    #[test]
    fn zero_width_config_is_rejected() {
        let err = NetworkConfig::new(2).layer(0).layer(2).validate().unwrap_err();
        assert!(matches!(err, NNError::InvalidLayerConfiguration(_)));
        let err = NetworkConfig::new(0).layer(2).layer(2).validate().unwrap_err();
        assert!(matches!(err, NNError::InvalidLayerConfiguration(_)));
    }

    #[test]
    fn empty_or_non_finite_init_range_is_rejected() {
        for (low, high) in [(1.0, 1.0), (0.5, -0.5), (f64::NAN, 1.0), (0.0, f64::INFINITY), (-1e308, 1e308)] {
            let err = WeightInit { low, high }.range::<f64>().unwrap_err();
            assert!(matches!(err, NNError::InvalidWeightInit(_)));
        }
    }

    #[test]
    fn init_range_that_collapses_in_f32_is_rejected() {
        let init = WeightInit { low: 1.0, high: 1.0 + 1e-12 };
        assert!(init.range::<f64>().is_ok());
        assert!(matches!(init.range::<f32>(), Err(NNError::InvalidWeightInit(_))));
    }

    #[test]
    fn overflowing_init_range_fails_construction() {
        let config = NetworkConfig::new(2).layer(2).layer(2).weight_init(-1e308, 1e308).seed(1);
        assert!(matches!(config.validate(), Err(NNError::InvalidWeightInit(_))));
        let res = Network::<f64, _, _>::from_config(&config, Activation::Tanh, Activation::Tanh.derivative());
        assert!(matches!(res, Err(NNError::InvalidWeightInit(_))));
    }

    #[test]
    fn buffers_are_sized_to_topology() {
        let config = NetworkConfig::new(3).layer(4).layer(5).layer(2).seed(1);
        let net = Network::<f64, _, _>::from_config(&config, Activation::Tanh, Activation::Tanh.derivative()).unwrap();

        let sizes: Vec<usize> = net.activations.iter().map(|a| a.len()).collect();
        assert_eq!(sizes, vec![4, 5, 2]);
        let sizes: Vec<usize> = net.delta.iter().map(|d| d.len()).collect();
        assert_eq!(sizes, vec![4, 5, 2]);
        let shapes: Vec<(usize, usize)> = net.temp_weights.iter().map(|w| w.dim()).collect();
        assert_eq!(shapes, vec![(4, 3), (5, 4), (2, 5)]);
        assert_eq!(net.temp_weights, net.weights());
        let sizes: Vec<usize> = net.outputs.iter().map(|a| a.len()).collect();
        assert_eq!(sizes, vec![4, 5]);
    }

    #[test]
    fn training_reuses_its_buffers() {
        let config = NetworkConfig::new(3).layer(4).layer(5).layer(2).seed(2);
        let mut net = Network::<f64, _, _>::from_config(&config, Activation::Tanh, Activation::Tanh.derivative()).unwrap();
        fn storage(bufs: &[Array1<f64>]) -> Vec<*const f64> {
            bufs.iter().map(|b| b.as_ptr()).collect()
        }
        let activations = storage(&net.activations);
        let delta = storage(&net.delta);
        let outputs = storage(&net.outputs);
        let weights: Vec<*const f64> = net.temp_weights.iter().map(|w| w.as_ptr()).collect();

        for label in [0, 1, 0] {
            net.back_propagation(&array![0.3, -0.1, 0.8], label, 0.1).unwrap();
        }

        assert_eq!(storage(&net.activations), activations);
        assert_eq!(storage(&net.delta), delta);
        assert_eq!(storage(&net.outputs), outputs);
        let after: Vec<*const f64> = net.temp_weights.iter().map(|w| w.as_ptr()).collect();
        assert_eq!(after, weights);
    }

    #[test]
    fn rejected_labels_leave_buffers_untouched() {
        let mut net = Network::<f64, _, _>::from_config(
            &NetworkConfig::new(2).layer(3).layer(2).seed(5),
            Activation::Sigmoid,
            Activation::Sigmoid.derivative(),
        )
        .unwrap();
        let before = net.weights();
        let err = net.back_propagation(&array![0.1, 0.2], 2, 0.1).unwrap_err();
        assert!(matches!(err, NNError::InvalidLabel { label: 2, classes: 2 }));
        assert!(net.activations.iter().all(|a| a.iter().all(|v| *v == 0.0)));
        assert_eq!(net.weights(), before);
    }

    #[test]
    fn training_caches_pre_activations() {
        let mut net = Network::<f64, _, _>::new(2, &[2, 1], Activation::Relu, Activation::Relu.derivative()).unwrap();
        net.set_weights(&[array![[1.0, -1.0], [-1.0, 1.0]], array![[1.0, 1.0]]]).unwrap();
        net.back_propagation(&array![1.0, 3.0], 0, 0.0).unwrap();

        // Pre-activations, not the rectified outputs.
        assert_eq!(net.activations[0], array![-2.0, 2.0]);
        assert_eq!(net.activations[1], array![2.0]);
    }

    #[test]
    fn sensitivities_and_update_by_hand() {
        let mut net = Network::<f64, _, _>::new(2, &[2, 1], Activation::Relu, Activation::Relu.derivative()).unwrap();
        net.set_weights(&[array![[1.0, -1.0], [-1.0, 1.0]], array![[1.0, 1.0]]]).unwrap();
        let x = array![1.0, 3.0];

        net.compute_activations(x.view()).unwrap();
        net.compute_sensitivity(0);
        // head: 2 * (2 - 1); hidden: [1 * 2 * relu'(-2), 1 * 2 * relu'(2)]
        assert_eq!(net.delta[1], array![2.0]);
        assert_eq!(net.delta[0], array![0.0, 2.0]);

        net.update_weights(x.view(), 0.5).unwrap();
        let weights = net.weights();
        assert_eq!(weights[0], array![[1.0, -1.0], [-2.0, -2.0]]);
        assert_eq!(weights[1], array![[1.0, -1.0]]);
    }
}
