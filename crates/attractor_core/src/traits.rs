use crate::solvers::adaptive::Tolerances;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in our dynamical systems.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {
    /// Converts an `f64` literal or parameter into this scalar type.
    /// Values that cannot be represented become NaN rather than panicking.
    fn lit(value: f64) -> Self {
        Self::from_f64(value).unwrap_or_else(Self::nan)
    }
}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Represents a dynamical system (Flow or Map).
///
/// For a flow, `apply` writes the time derivative of the state. For a map,
/// it writes the next iterate. Implementations must be pure: the same
/// `(t, x)` always yields the same `out`.
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field (flow) or map function.
    /// x: current state
    /// t: current time
    /// out: buffer to write the result (dx/dt or x_{n+1})
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

impl<T: Scalar, S: DynamicalSystem<T> + ?Sized> DynamicalSystem<T> for &S {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn apply(&self, t: T, x: &[T], out: &mut [T]) {
        (**self).apply(t, x, out)
    }
}

/// Analytic Jacobian of a system, written row-major into `out` (`n * n`).
///
/// For a flow this is `∂f/∂x`; for a map it is the derivative of the map.
pub trait Jacobian {
    fn jacobian(&self, t: f64, x: &[f64], out: &mut [f64]);
}

impl<S: Jacobian + ?Sized> Jacobian for &S {
    fn jacobian(&self, t: f64, x: &[f64], out: &mut [f64]) {
        (**self).jacobian(t, x, out)
    }
}

/// A trait for solvers that can step a system forward.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// state: current state (updated after step)
    /// dt: step size
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T);
}

/// Result of one trial step of an embedded Runge-Kutta pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialStep<T> {
    /// Scaled error norm; the step is acceptable when this is `<= 1`.
    pub error: T,
    /// Whether every stage derivative was finite.
    pub finite: bool,
}

/// A solver that can attempt an error-controlled step.
///
/// `try_step` never mutates the caller's state: the candidate solution is
/// written into `proposal` and the caller decides whether to accept it.
pub trait AdaptiveSteppable<T: Scalar> {
    /// Controller exponent `1 / (q + 1)` for an embedded estimate of order `q`.
    fn error_exponent(&self) -> T;

    fn try_step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: T,
        state: &[T],
        dt: T,
        tolerances: &Tolerances,
        proposal: &mut [T],
    ) -> TrialStep<T>;
}
