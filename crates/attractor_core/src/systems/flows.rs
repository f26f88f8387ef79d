//! Continuous-time vector fields.
//!
//! Each field is a plain parameter struct. `apply` writes `dx/dt` and never
//! touches anything but `out`, so one instance can be shared across runs.

use crate::error::Result;
use crate::parameters::Parameters;
use crate::traits::{DynamicalSystem, Jacobian, Scalar};
use crate::trajectory::Trajectory;
use serde::{Deserialize, Serialize};

/// Exponential relaxation toward the origin: `ds/dt = -rate * s`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DampedDecay {
    pub rate: f64,
}

impl DampedDecay {
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Ok(Self {
            rate: params.require("damped_decay", "rate")?,
        })
    }
}

impl<T: Scalar> DynamicalSystem<T> for DampedDecay {
    fn dimension(&self) -> usize {
        1
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        out[0] = -T::lit(self.rate) * x[0];
    }
}

impl Jacobian for DampedDecay {
    fn jacobian(&self, _t: f64, _x: &[f64], out: &mut [f64]) {
        out[0] = -self.rate;
    }
}

/// Van der Pol oscillator, `x'' - mu (1 - x^2) x' + x = 0`, as a first-order system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VanDerPol {
    pub mu: f64,
}

impl VanDerPol {
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Ok(Self {
            mu: params.require("van_der_pol", "mu")?,
        })
    }
}

impl<T: Scalar> DynamicalSystem<T> for VanDerPol {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let mu = T::lit(self.mu);
        out[0] = x[1];
        out[1] = -x[0] + mu * (T::one() - x[0] * x[0]) * x[1];
    }
}

impl Jacobian for VanDerPol {
    fn jacobian(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out[0] = 0.0;
        out[1] = 1.0;
        out[2] = -1.0 - 2.0 * self.mu * x[0] * x[1];
        out[3] = self.mu * (1.0 - x[0] * x[0]);
    }
}

/// Two uncoupled phase angles rotating at constant rates.
///
/// The phase-space trajectory is a straight line; the torus only appears in
/// the trigonometric projection returned by [`Torus::project`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Torus {
    pub omega1: f64,
    pub omega2: f64,
}

impl Torus {
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Ok(Self {
            omega1: params.require("torus", "omega1")?,
            omega2: params.require("torus", "omega2")?,
        })
    }

    /// Maps each `(θ1, θ2)` sample to `[cos θ1, sin θ1, cos θ2, sin θ2]`.
    pub fn project(trajectory: &Trajectory) -> Vec<[f64; 4]> {
        trajectory
            .states()
            .map(|s| [s[0].cos(), s[0].sin(), s[1].cos(), s[1].sin()])
            .collect()
    }
}

impl<T: Scalar> DynamicalSystem<T> for Torus {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: T, _x: &[T], out: &mut [T]) {
        out[0] = T::lit(self.omega1);
        out[1] = T::lit(self.omega2);
    }
}

impl Jacobian for Torus {
    fn jacobian(&self, _t: f64, _x: &[f64], out: &mut [f64]) {
        out.fill(0.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lorenz {
    pub sigma: f64,
    pub rho: f64,
    pub beta: f64,
}

impl Lorenz {
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Ok(Self {
            sigma: params.require("lorenz", "sigma")?,
            rho: params.require("lorenz", "rho")?,
            beta: params.require("lorenz", "beta")?,
        })
    }
}

impl<T: Scalar> DynamicalSystem<T> for Lorenz {
    fn dimension(&self) -> usize {
        3
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (sigma, rho, beta) = (T::lit(self.sigma), T::lit(self.rho), T::lit(self.beta));
        out[0] = sigma * (x[1] - x[0]);
        out[1] = x[0] * (rho - x[2]) - x[1];
        out[2] = x[0] * x[1] - beta * x[2];
    }
}

impl Jacobian for Lorenz {
    fn jacobian(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out.copy_from_slice(&[
            -self.sigma,
            self.sigma,
            0.0,
            self.rho - x[2],
            -1.0,
            -x[0],
            x[1],
            x[0],
            -self.beta,
        ]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rossler {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Rossler {
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Ok(Self {
            a: params.require("rossler", "a")?,
            b: params.require("rossler", "b")?,
            c: params.require("rossler", "c")?,
        })
    }
}

impl<T: Scalar> DynamicalSystem<T> for Rossler {
    fn dimension(&self) -> usize {
        3
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (a, b, c) = (T::lit(self.a), T::lit(self.b), T::lit(self.c));
        out[0] = -x[1] - x[2];
        out[1] = x[0] + a * x[1];
        out[2] = b + x[2] * (x[0] - c);
    }
}

impl Jacobian for Rossler {
    fn jacobian(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out.copy_from_slice(&[0.0, -1.0, -1.0, 1.0, self.a, 0.0, x[2], 0.0, x[0] - self.c]);
    }
}

/// Periodically forced Duffing oscillator. The only time-dependent field here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Duffing {
    pub alpha: f64,
    pub beta: f64,
    pub delta: f64,
    pub gamma: f64,
    pub omega: f64,
}

impl Duffing {
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Ok(Self {
            alpha: params.require("duffing", "alpha")?,
            beta: params.require("duffing", "beta")?,
            delta: params.require("duffing", "delta")?,
            gamma: params.require("duffing", "gamma")?,
            omega: params.require("duffing", "omega")?,
        })
    }
}

impl<T: Scalar> DynamicalSystem<T> for Duffing {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, t: T, x: &[T], out: &mut [T]) {
        let alpha = T::lit(self.alpha);
        let beta = T::lit(self.beta);
        let delta = T::lit(self.delta);
        let gamma = T::lit(self.gamma);
        let omega = T::lit(self.omega);
        out[0] = x[1];
        out[1] = -delta * x[1] - alpha * x[0] - beta * x[0] * x[0] * x[0]
            + gamma * (omega * t).cos();
    }
}

impl Jacobian for Duffing {
    fn jacobian(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out[0] = 0.0;
        out[1] = 1.0;
        out[2] = -self.alpha - 3.0 * self.beta * x[0] * x[0];
        out[3] = -self.delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eval<S: DynamicalSystem<f64>>(system: &S, t: f64, x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; system.dimension()];
        system.apply(t, x, &mut out);
        out
    }

    /// Central differences of `apply`, compared against the analytic Jacobian.
    fn assert_jacobian_matches<S: DynamicalSystem<f64> + Jacobian>(system: &S, t: f64, x: &[f64]) {
        let n = system.dimension();
        let mut analytic = vec![0.0; n * n];
        system.jacobian(t, x, &mut analytic);
        let h = 1e-6;
        for j in 0..n {
            let mut plus = x.to_vec();
            let mut minus = x.to_vec();
            plus[j] += h;
            minus[j] -= h;
            let fp = eval(system, t, &plus);
            let fm = eval(system, t, &minus);
            for i in 0..n {
                let numeric = (fp[i] - fm[i]) / (2.0 * h);
                assert!(
                    (numeric - analytic[i * n + j]).abs() < 1e-5,
                    "entry ({i},{j}): numeric {numeric}, analytic {}",
                    analytic[i * n + j]
                );
            }
        }
    }

    #[test]
    fn lorenz_matches_textbook_derivative() {
        let lorenz = Lorenz {
            sigma: 10.0,
            rho: 28.0,
            beta: 8.0 / 3.0,
        };
        let d = eval(&lorenz, 0.0, &[0.0, 1.0, 1.05]);
        assert_relative_eq!(d[0], 10.0);
        assert_relative_eq!(d[1], -1.0);
        assert_relative_eq!(d[2], -8.0 / 3.0 * 1.05);
    }

    #[test]
    fn van_der_pol_with_unit_mu_matches_limit_cycle_law() {
        let vdp = VanDerPol { mu: 1.0 };
        let d = eval(&vdp, 0.0, &[2.0, 0.5]);
        assert_relative_eq!(d[0], 0.5);
        assert_relative_eq!(d[1], -2.0 + (1.0 - 4.0) * 0.5);
    }

    #[test]
    fn torus_rates_ignore_state() {
        let torus = Torus {
            omega1: 0.2,
            omega2: 0.5,
        };
        assert_eq!(eval(&torus, 3.0, &[100.0, -7.0]), vec![0.2, 0.5]);
    }

    #[test]
    fn duffing_depends_on_time_through_forcing() {
        let duffing = Duffing {
            alpha: 1.0,
            beta: -1.0,
            delta: 0.2,
            gamma: 0.3,
            omega: 1.2,
        };
        let at_zero = eval(&duffing, 0.0, &[0.1, 0.0]);
        let later = eval(&duffing, 1.0, &[0.1, 0.0]);
        assert_relative_eq!(at_zero[1], -0.1 + 0.001 + 0.3);
        assert_relative_eq!(later[1], -0.1 + 0.001 + 0.3 * 1.2_f64.cos());
    }

    #[test]
    fn fields_evaluate_in_single_precision() {
        let rossler = Rossler {
            a: 0.2,
            b: 0.2,
            c: 5.7,
        };
        let mut out = [0.0_f32; 3];
        rossler.apply(0.0_f32, &[1.0, 1.0, 1.0], &mut out);
        assert_relative_eq!(out[0], -2.0_f32);
        assert_relative_eq!(out[1], 1.2_f32, epsilon = 1e-6);
        assert_relative_eq!(out[2], 0.2_f32 - 4.7, epsilon = 1e-5);
    }

    #[test]
    fn analytic_jacobians_agree_with_finite_differences() {
        assert_jacobian_matches(&DampedDecay { rate: 0.5 }, 0.0, &[3.0]);
        assert_jacobian_matches(&VanDerPol { mu: 1.5 }, 0.0, &[0.7, -1.2]);
        assert_jacobian_matches(
            &Lorenz {
                sigma: 10.0,
                rho: 28.0,
                beta: 8.0 / 3.0,
            },
            0.0,
            &[1.0, -2.0, 20.0],
        );
        assert_jacobian_matches(
            &Rossler {
                a: 0.2,
                b: 0.2,
                c: 5.7,
            },
            0.0,
            &[1.0, 2.0, 3.0],
        );
        assert_jacobian_matches(
            &Duffing {
                alpha: 1.0,
                beta: -1.0,
                delta: 0.2,
                gamma: 0.3,
                omega: 1.2,
            },
            2.5,
            &[0.4, -0.3],
        );
    }

    #[test]
    fn torus_projection_follows_both_angles() {
        use crate::integration::AdaptiveIntegrator;
        use crate::simulate::{simulate, SimulationRequest, StepConfig};
        use std::f64::consts::PI;

        let half_turn = PI / 0.2;
        let grid = AdaptiveIntegrator {
            t_eval: vec![0.0, 2.5, half_turn, 20.0, 50.0],
            ..AdaptiveIntegrator::default()
        };
        let request = SimulationRequest::default().with_step(StepConfig::Adaptive(grid));
        let trajectory = simulate("torus", &request).expect("torus should run");
        let projected = Torus::project(&trajectory);
        assert_eq!(projected.len(), 5);

        for (p, &t) in projected.iter().zip(trajectory.times()) {
            let (theta1, theta2) = (0.2 * t, 0.5 * t);
            let expected = [theta1.cos(), theta1.sin(), theta2.cos(), theta2.sin()];
            for (actual, expected) in p.iter().zip(expected) {
                assert_relative_eq!(*actual, expected, epsilon = 1e-9);
            }
        }
        assert_relative_eq!(projected[2][0], -1.0, epsilon = 1e-9);
        assert_relative_eq!(projected[2][1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn torus_projection_stays_on_unit_circles() {
        let trajectory = crate::simulate::simulate("torus", &Default::default())
            .expect("torus should run");
        let projected = Torus::project(&trajectory);
        assert_eq!(projected.len(), trajectory.len());
        for p in &projected {
            assert_relative_eq!(p[0] * p[0] + p[1] * p[1], 1.0, epsilon = 1e-12);
            assert_relative_eq!(p[2] * p[2] + p[3] * p[3], 1.0, epsilon = 1e-12);
        }
    }
}
