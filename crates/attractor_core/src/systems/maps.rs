//! Discrete-time maps. `apply` writes the next iterate; `t` is the iteration index.

use crate::error::Result;
use crate::parameters::Parameters;
use crate::traits::{DynamicalSystem, Jacobian, Scalar};
use serde::{Deserialize, Serialize};

/// `x' = 1 - a x^2 + y`, `y' = b x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Henon {
    pub a: f64,
    pub b: f64,
}

impl Henon {
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Ok(Self {
            a: params.require("henon", "a")?,
            b: params.require("henon", "b")?,
        })
    }
}

impl<T: Scalar> DynamicalSystem<T> for Henon {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (a, b) = (T::lit(self.a), T::lit(self.b));
        out[0] = T::one() - a * x[0] * x[0] + x[1];
        out[1] = b * x[0];
    }
}

impl Jacobian for Henon {
    fn jacobian(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out.copy_from_slice(&[-2.0 * self.a * x[0], 1.0, self.b, 0.0]);
    }
}

/// `x' = r x (1 - x)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Logistic {
    pub r: f64,
}

impl Logistic {
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Ok(Self {
            r: params.require("logistic", "r")?,
        })
    }
}

impl<T: Scalar> DynamicalSystem<T> for Logistic {
    fn dimension(&self) -> usize {
        1
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        out[0] = T::lit(self.r) * x[0] * (T::one() - x[0]);
    }
}

impl Jacobian for Logistic {
    fn jacobian(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out[0] = self.r * (1.0 - 2.0 * x[0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn henon_single_iterate() {
        let henon = Henon { a: 1.4, b: 0.3 };
        let mut next = [0.0; 2];
        henon.apply(0.0, &[0.1, 0.3], &mut next);
        assert_relative_eq!(next[0], 1.286, epsilon = 1e-12);
        assert_relative_eq!(next[1], 0.03, epsilon = 1e-12);
    }

    #[test]
    fn logistic_single_iterate() {
        let logistic = Logistic { r: 3.8 };
        let mut next = [0.0];
        logistic.apply(0.0, &[0.1], &mut next);
        assert_relative_eq!(next[0], 0.342, epsilon = 1e-12);
    }

    #[test]
    fn logistic_fixed_point_is_stationary() {
        let r = 2.5;
        let logistic = Logistic { r };
        let fixed = 1.0 - 1.0 / r;
        let mut next = [0.0];
        logistic.apply(0.0, &[fixed], &mut next);
        assert_relative_eq!(next[0], fixed, epsilon = 1e-15);

        let mut slope = [0.0];
        logistic.jacobian(0.0, &[fixed], &mut slope);
        assert_relative_eq!(slope[0], 2.0 - r, epsilon = 1e-12);
    }

    #[test]
    fn henon_jacobian_determinant_is_minus_b() {
        let henon = Henon { a: 1.4, b: 0.3 };
        let mut j = [0.0; 4];
        henon.jacobian(0.0, &[0.37, -0.2], &mut j);
        assert_relative_eq!(j[0] * j[3] - j[1] * j[2], -0.3, epsilon = 1e-15);
    }
}
