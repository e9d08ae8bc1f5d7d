use crate::prelude::*;

/// Scalar transfer function applied elementwise after a layer's linear map.
///
/// A derivative is not a separate concept: it is just another
/// `ActivationFunction`, handed to the network next to the function itself.
pub trait ActivationFunction<A> {
    fn invoke(&self, x: A) -> A;

    fn name(&self) -> String {
        "Custom".into()
    }
}

/// Pass-through used by the output layer, which acts as a linear score head.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl<A> ActivationFunction<A> for Identity {
    fn invoke(&self, x: A) -> A {
        x
    }

    fn name(&self) -> String {
        "Identity".into()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    pub fn derivative(&self) -> Derivative {
        Derivative(*self)
    }
}

impl<A: Scalar> ActivationFunction<A> for Activation {
    fn invoke(&self, x: A) -> A {
        match self {
            Self::Linear => x,
            Self::Relu => relu_forward(x),
            Self::Sigmoid => sigmoid_forward(x),
            Self::Tanh => x.tanh(),
        }
    }

    fn name(&self) -> String {
        format!("{:?}", self)
    }
}

/// Derivative of an [`Activation`], evaluated at a pre-activation value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Derivative(pub Activation);

impl<A: Scalar> ActivationFunction<A> for Derivative {
    fn invoke(&self, x: A) -> A {
        match self.0 {
            Activation::Linear => A::one(),
            Activation::Relu => relu_backward(x),
            Activation::Sigmoid => sigmoid_backward(x),
            Activation::Tanh => tanh_backward(x),
        }
    }

    fn name(&self) -> String {
        format!("d{:?}", self.0)
    }
}

// Plain function pointers let callers plug in their own transfer/derivative pair.
impl<A> ActivationFunction<A> for fn(A) -> A {
    fn invoke(&self, x: A) -> A {
        self(x)
    }
}

fn sigmoid_forward<A: Scalar>(z: A) -> A {
    A::one() / (A::one() + (-z).exp())
}

fn sigmoid_backward<A: Scalar>(z: A) -> A {
    let s = sigmoid_forward(z);
    s * (A::one() - s)
}

fn relu_forward<A: Scalar>(z: A) -> A {
    if z >= A::zero() {z} else {A::zero()}
}

fn relu_backward<A: Scalar>(z: A) -> A {
    if z >= A::zero() {A::one()} else {A::zero()}
}

fn tanh_backward<A: Scalar>(z: A) -> A {
    let t = z.tanh();
    A::one() - t * t
}
