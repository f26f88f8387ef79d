//! Lyapunov spectra and the attractor taxonomy derived from them.

use crate::{
    catalog::SystemDefinition,
    solvers::{DiscreteMap, RK4},
    systems::SystemKind,
    traits::{DynamicalSystem, Jacobian, Steppable},
};
use anyhow::{anyhow, bail, Result};
use nalgebra::linalg::QR;
use nalgebra::DMatrix;
use serde::Serialize;

/// A system augmented with its tangent matrix `Phi` (row-major, `n * n`).
///
/// For a flow the extra components evolve as `Phi' = J(x) Phi`; for a map
/// they are replaced by `J(x) Phi`, so the same wrapper serves both kinds.
pub struct TangentSystem<S> {
    pub inner: S,
    pub dimension: usize,
}

impl<S> TangentSystem<S> {
    pub fn new(inner: S, dim: usize) -> Self {
        Self {
            inner,
            dimension: dim,
        }
    }
}

impl<S> DynamicalSystem<f64> for TangentSystem<S>
where
    S: DynamicalSystem<f64> + Jacobian,
{
    fn dimension(&self) -> usize {
        let n = self.dimension;
        n + n * n
    }

    fn apply(&self, t: f64, x: &[f64], out: &mut [f64]) {
        let n = self.dimension;
        let (state, phi) = x.split_at(n);
        let (head, tail) = out.split_at_mut(n);
        self.inner.apply(t, state, head);

        let mut jacobian = vec![0.0; n * n];
        self.inner.jacobian(t, state, &mut jacobian);
        for i in 0..n {
            for j in 0..n {
                let mut sum = 0.0;
                for k in 0..n {
                    sum += jacobian[i * n + k] * phi[k * n + j];
                }
                tail[i * n + j] = sum;
            }
        }
    }
}

enum TangentStepper {
    Rk4(RK4<f64>),
    Discrete(DiscreteMap<f64>),
}

impl TangentStepper {
    fn build(kind: SystemKind, dim: usize) -> Self {
        match kind {
            SystemKind::Flow => TangentStepper::Rk4(RK4::new(dim)),
            SystemKind::Map => TangentStepper::Discrete(DiscreteMap::new(dim)),
        }
    }

    fn step(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t: &mut f64,
        state: &mut [f64],
        dt: f64,
    ) {
        match self {
            TangentStepper::Rk4(s) => s.step(system, t, state, dt),
            TangentStepper::Discrete(s) => s.step(system, t, state, dt),
        }
    }
}

/// Full Lyapunov spectrum by repeated QR re-orthonormalisation.
///
/// Flows are stepped with RK4 at `dt` and the exponents are per unit time.
/// Maps are iterated `steps` times; `dt` must still be positive but the
/// exponents are per iteration. The returned values are in the order the QR
/// factorisation produces them, which for a converged run is descending.
pub fn lyapunov_exponents<S>(
    system: S,
    kind: SystemKind,
    initial_state: &[f64],
    dt: f64,
    steps: usize,
    qr_stride: usize,
) -> Result<Vec<f64>>
where
    S: DynamicalSystem<f64> + Jacobian,
{
    if initial_state.is_empty() {
        bail!("Initial state must have positive dimension.");
    }
    if initial_state.len() != system.dimension() {
        bail!(
            "Initial state has {} components but the system has dimension {}.",
            initial_state.len(),
            system.dimension()
        );
    }
    if steps == 0 {
        bail!("Lyapunov computation requires at least one integration step.");
    }
    if !(dt.is_finite() && dt > 0.0) {
        bail!("Step size dt must be positive.");
    }
    if qr_stride == 0 {
        bail!("qr_stride must be at least 1.");
    }

    let dim = initial_state.len();
    let aug_dim = dim + dim * dim;
    let mut augmented_state = vec![0.0; aug_dim];
    augmented_state[..dim].copy_from_slice(initial_state);
    for i in 0..dim {
        augmented_state[dim + i * dim + i] = 1.0;
    }

    let step = match kind {
        SystemKind::Flow => dt,
        SystemKind::Map => 1.0,
    };
    let tangent_system = TangentSystem::new(system, dim);
    let mut stepper = TangentStepper::build(kind, aug_dim);
    let mut accum = vec![0.0; dim];
    let mut t = 0.0;
    let mut since_last_qr = 0usize;

    for steps_done in 1..=steps {
        stepper.step(&tangent_system, &mut t, &mut augmented_state, step);
        since_last_qr += 1;

        if since_last_qr == qr_stride || steps_done == steps {
            if augmented_state.iter().any(|value| !value.is_finite()) {
                bail!("State became non-finite after {steps_done} steps.");
            }
            apply_qr(&mut augmented_state[dim..], dim, &mut accum)?;
            since_last_qr = 0;
        }
    }

    let total_time = steps as f64 * step;
    for value in &mut accum {
        *value /= total_time;
    }
    log::debug!("lyapunov spectrum over {steps} steps ({kind:?}): {accum:?}");

    Ok(accum)
}

/// Spectrum of a catalog system from its default parameters and initial state.
pub fn definition_spectrum(
    definition: &SystemDefinition,
    dt: f64,
    steps: usize,
    qr_stride: usize,
) -> Result<Vec<f64>> {
    let model = definition.model()?;
    lyapunov_exponents(
        model,
        definition.kind,
        &definition.initial_state,
        dt,
        steps,
        qr_stride,
    )
}

fn apply_qr(phi_slice: &mut [f64], dim: usize, accum: &mut [f64]) -> Result<()> {
    if phi_slice.len() != dim * dim {
        bail!("Tangent matrix slice has incorrect size.");
    }
    let matrix = DMatrix::from_row_slice(dim, dim, phi_slice);
    let (q, r) = QR::new(matrix).unpack();
    for i in 0..dim {
        let diag = r[(i, i)].abs();
        if diag <= f64::EPSILON {
            return Err(anyhow!(
                "Encountered near-singular R matrix during orthonormalization."
            ));
        }
        accum[i] += diag.ln();
    }
    // nalgebra is column-major; write Q back in our row-major layout.
    for i in 0..dim {
        for j in 0..dim {
            phi_slice[i * dim + j] = q[(i, j)];
        }
    }
    Ok(())
}

/// Kaplan-Yorke (Lyapunov) dimension of a spectrum.
pub fn kaplan_yorke(exponents: &[f64]) -> f64 {
    if exponents.is_empty() {
        return 0.0;
    }
    let sorted = sorted_descending(exponents);

    let mut partial = 0.0;
    let mut k = 0usize;
    for (idx, &lambda) in sorted.iter().enumerate() {
        let new_sum = partial + lambda;
        if new_sum >= 0.0 {
            partial = new_sum;
            k = idx + 1;
        } else {
            if lambda.abs() <= f64::EPSILON {
                return k as f64;
            }
            return k as f64 + partial / lambda.abs();
        }
    }

    k as f64
}

/// Attractor type read off the signs of a Lyapunov spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttractorClass {
    /// All exponents negative. For a map this also covers stable cycles.
    FixedPoint,
    /// One neutral exponent, the rest negative.
    LimitCycle,
    /// Two or more neutral exponents and no positive one.
    Torus,
    /// Exactly one positive exponent.
    Chaotic,
    /// More than one positive exponent.
    Hyperchaotic,
}

/// Classifies a spectrum; exponents within `tolerance` of zero count as neutral.
pub fn classify(exponents: &[f64], tolerance: f64) -> AttractorClass {
    let tolerance = tolerance.abs();
    let positive = exponents.iter().filter(|&&l| l > tolerance).count();
    let neutral = exponents.iter().filter(|&&l| l.abs() <= tolerance).count();
    match (positive, neutral) {
        (0, 0) => AttractorClass::FixedPoint,
        (0, 1) => AttractorClass::LimitCycle,
        (0, _) => AttractorClass::Torus,
        (1, _) => AttractorClass::Chaotic,
        _ => AttractorClass::Hyperchaotic,
    }
}

fn sorted_descending(exponents: &[f64]) -> Vec<f64> {
    let mut sorted = exponents.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog;
    use crate::systems::flows::{DampedDecay, Lorenz, Torus};
    use crate::systems::maps::{Henon, Logistic};
    use approx::assert_relative_eq;

    struct LinearSystem {
        rate: f64,
    }

    impl DynamicalSystem<f64> for LinearSystem {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = self.rate * x[0];
        }
    }

    impl Jacobian for LinearSystem {
        fn jacobian(&self, _t: f64, _x: &[f64], out: &mut [f64]) {
            out[0] = self.rate;
        }
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn lyapunov_exponents_rejects_invalid_inputs() {
        let flow = SystemKind::Flow;
        assert_err_contains(
            lyapunov_exponents(LinearSystem { rate: 1.0 }, flow, &[], 0.1, 10, 1),
            "Initial state",
        );
        assert_err_contains(
            lyapunov_exponents(LinearSystem { rate: 1.0 }, flow, &[1.0, 2.0], 0.1, 10, 1),
            "dimension 1",
        );
        assert_err_contains(
            lyapunov_exponents(LinearSystem { rate: 1.0 }, flow, &[1.0], 0.1, 0, 1),
            "at least one integration step",
        );
        assert_err_contains(
            lyapunov_exponents(LinearSystem { rate: 1.0 }, flow, &[1.0], 0.0, 10, 1),
            "dt must be positive",
        );
        assert_err_contains(
            lyapunov_exponents(LinearSystem { rate: 1.0 }, flow, &[1.0], 0.1, 10, 0),
            "qr_stride",
        );
    }

    #[test]
    fn discrete_map_matches_log_growth() {
        let exponents =
            lyapunov_exponents(LinearSystem { rate: 2.0 }, SystemKind::Map, &[1.0], 1.0, 8, 1)
                .expect("lyapunov exponents should compute");
        assert_relative_eq!(exponents[0], 2.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn flow_tracks_linear_rate() {
        let exponents = lyapunov_exponents(
            DampedDecay { rate: 0.5 },
            SystemKind::Flow,
            &[10.0],
            0.05,
            200,
            1,
        )
        .expect("lyapunov exponents should compute");
        assert_relative_eq!(exponents[0], -0.5, epsilon = 1e-6);
        assert_eq!(classify(&exponents, 1e-3), AttractorClass::FixedPoint);
    }

    #[test]
    fn torus_rotation_is_neutral_in_both_directions() {
        let torus = Torus {
            omega1: 0.2,
            omega2: 0.5,
        };
        let exponents = lyapunov_exponents(torus, SystemKind::Flow, &[0.0, 0.0], 0.1, 100, 5)
            .expect("lyapunov exponents should compute");
        assert_eq!(exponents.len(), 2);
        for value in &exponents {
            assert!(value.abs() < 1e-12, "{value}");
        }
        assert_eq!(classify(&exponents, 1e-3), AttractorClass::Torus);
    }

    #[test]
    fn logistic_at_full_chaos_approaches_ln_two() {
        let exponents =
            lyapunov_exponents(Logistic { r: 4.0 }, SystemKind::Map, &[0.1], 1.0, 20_000, 1)
                .expect("lyapunov exponents should compute");
        assert!((exponents[0] - 2.0_f64.ln()).abs() < 0.05, "{exponents:?}");
    }

    #[test]
    fn henon_spectrum_sums_to_log_determinant() {
        let henon = Henon { a: 1.4, b: 0.3 };
        let exponents = lyapunov_exponents(henon, SystemKind::Map, &[0.1, 0.3], 1.0, 5_000, 1)
            .expect("lyapunov exponents should compute");
        assert_relative_eq!(exponents[0] + exponents[1], 0.3_f64.ln(), epsilon = 1e-9);
        assert!(exponents[0] > 0.3 && exponents[0] < 0.55, "{exponents:?}");
        assert_eq!(classify(&exponents, 1e-2), AttractorClass::Chaotic);
    }

    #[test]
    fn lorenz_has_one_positive_exponent() {
        let lorenz = Lorenz {
            sigma: 10.0,
            rho: 28.0,
            beta: 8.0 / 3.0,
        };
        let exponents =
            lyapunov_exponents(lorenz, SystemKind::Flow, &[0.0, 1.0, 1.05], 0.01, 20_000, 10)
                .expect("lyapunov exponents should compute");
        assert!(exponents[0] > 0.5 && exponents[0] < 1.3, "{exponents:?}");
        // Phase-space volume contracts at the constant rate -(sigma + 1 + beta).
        let sum: f64 = exponents.iter().sum();
        assert_relative_eq!(sum, -(10.0 + 1.0 + 8.0 / 3.0), max_relative = 1e-3);
    }

    #[test]
    fn catalog_definitions_feed_the_spectrum() {
        let logistic = catalog().lookup("logistic").expect("registered");
        let exponents =
            definition_spectrum(logistic, 1.0, 5_000, 1).expect("spectrum should compute");
        assert_eq!(exponents.len(), 1);
        assert!(exponents[0] > 0.0);
    }

    #[test]
    fn apply_qr_writes_q_row_major_and_accumulates_logs() {
        let dim = 2;
        let mut phi = vec![1.0, 2.0, 3.0, 4.0];
        let original = phi.clone();
        let mut accum = vec![0.0; dim];

        apply_qr(&mut phi, dim, &mut accum).expect("QR should succeed");

        let (q, r) = QR::new(DMatrix::from_row_slice(dim, dim, &original)).unpack();
        for i in 0..dim {
            for j in 0..dim {
                assert_relative_eq!(phi[i * dim + j], q[(i, j)], epsilon = 1e-12);
            }
            assert_relative_eq!(accum[i], r[(i, i)].abs().ln(), epsilon = 1e-12);
        }
    }

    #[test]
    fn apply_qr_rejects_near_singular_matrix() {
        let dim = 2;
        let mut phi = vec![0.0; dim * dim];
        let mut accum = vec![0.0; dim];
        assert_err_contains(apply_qr(&mut phi, dim, &mut accum), "near-singular R matrix");
    }

    #[test]
    fn kaplan_yorke_handles_empty_and_partial_sum() {
        assert_eq!(kaplan_yorke(&[]), 0.0);
        assert_relative_eq!(kaplan_yorke(&[0.1, 0.0, -1.0]), 2.1, epsilon = 1e-12);
        assert_relative_eq!(kaplan_yorke(&[-1.0, 0.1, 0.0]), 2.1, epsilon = 1e-12);
        assert_eq!(kaplan_yorke(&[-0.5]), 0.0);
    }

    #[test]
    fn classification_follows_exponent_signs() {
        assert_eq!(classify(&[-0.1, -1.0], 1e-3), AttractorClass::FixedPoint);
        assert_eq!(classify(&[1e-4, -1.0], 1e-3), AttractorClass::LimitCycle);
        assert_eq!(classify(&[0.0, -1e-4, -2.0], 1e-3), AttractorClass::Torus);
        assert_eq!(classify(&[0.9, 0.0, -14.5], 1e-3), AttractorClass::Chaotic);
        assert_eq!(classify(&[0.1, 0.02, 0.0, -25.0], 1e-3), AttractorClass::Hyperchaotic);
    }
}
