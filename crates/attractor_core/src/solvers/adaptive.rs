//! Embedded Runge-Kutta pairs for error-controlled stepping.
//!
//! Both pairs here have seven stages with the last stage evaluated at the
//! propagated solution (first-same-as-last), so one trial step costs seven
//! field evaluations. The error estimate is the difference between the
//! fifth-order solution and the embedded fourth-order one, scaled per
//! component by `atol + rtol * max(|y|, |y_new|)` and reduced with the
//! infinity norm.

use crate::traits::{AdaptiveSteppable, DynamicalSystem, Scalar, TrialStep};
use serde::{Deserialize, Serialize};

const STAGES: usize = 7;

/// Relative and absolute error tolerances for one trial step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rtol: 1e-3,
            atol: 1e-6,
        }
    }
}

/// Step-size controller using an I-controller:
/// `h_new = h * clamp(safety * error^(-exponent), min_factor, max_factor)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepController {
    pub safety: f64,
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 10.0,
        }
    }
}

impl StepController {
    pub fn factor(&self, error: f64, exponent: f64) -> f64 {
        if error == 0.0 {
            return self.max_factor;
        }
        let factor = self.safety * error.powf(-exponent);
        if factor.is_nan() {
            return self.min_factor;
        }
        factor.clamp(self.min_factor, self.max_factor)
    }
}

struct Tableau {
    c: [f64; STAGES],
    a: [[f64; STAGES - 1]; STAGES - 1],
    b: [f64; STAGES - 1],
    /// `b - b_hat`, including the weight of the FSAL stage.
    e: [f64; STAGES],
}

const DORMAND_PRINCE: Tableau = Tableau {
    c: [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0],
    a: [
        [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
        [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
        [
            19372.0 / 6561.0,
            -25360.0 / 2187.0,
            64448.0 / 6561.0,
            -212.0 / 729.0,
            0.0,
            0.0,
        ],
        [
            9017.0 / 3168.0,
            -355.0 / 33.0,
            46732.0 / 5247.0,
            49.0 / 176.0,
            -5103.0 / 18656.0,
            0.0,
        ],
    ],
    b: [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
    e: [
        71.0 / 57600.0,
        0.0,
        -71.0 / 16695.0,
        71.0 / 1920.0,
        -17253.0 / 339200.0,
        22.0 / 525.0,
        -1.0 / 40.0,
    ],
};

const TSITOURAS: Tableau = Tableau {
    c: [0.0, 0.161, 0.327, 0.9, 0.9800255409045097, 1.0, 1.0],
    a: [
        [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [0.161, 0.0, 0.0, 0.0, 0.0, 0.0],
        [-0.008480655492356989, 0.335480655492357, 0.0, 0.0, 0.0, 0.0],
        [2.897153057105493, -6.359448489975075, 4.3622954328695815, 0.0, 0.0, 0.0],
        [
            5.325864828439257,
            -11.748883564062828,
            7.4955393428898365,
            -0.09249506636175525,
            0.0,
            0.0,
        ],
        [
            5.86145544294642,
            -12.92096931784711,
            8.159367898576159,
            -0.071584973281401,
            -0.028269050394068383,
            0.0,
        ],
    ],
    b: [
        0.09646076681806523,
        0.01,
        0.4798896504144996,
        1.379008574103742,
        -3.290069515436081,
        2.324710524099774,
    ],
    e: [
        -0.00178001105222577714,
        -0.0008164344596567469,
        0.007880878010261995,
        -0.1447110071732629,
        0.5823571654525552,
        -0.45808210592918697,
        0.015151515151515152,
    ],
};

/// Stage storage shared by the embedded pairs.
struct Stages<T: Scalar> {
    k: Vec<Vec<T>>,
    tmp: Vec<T>,
}

impl<T: Scalar> Stages<T> {
    fn new(dim: usize) -> Self {
        Self {
            k: vec![vec![T::zero(); dim]; STAGES],
            tmp: vec![T::zero(); dim],
        }
    }

    #[allow(clippy::needless_range_loop, clippy::too_many_arguments)]
    fn trial(
        &mut self,
        tableau: &Tableau,
        system: &impl DynamicalSystem<T>,
        t: T,
        state: &[T],
        dt: T,
        tolerances: &Tolerances,
        proposal: &mut [T],
    ) -> TrialStep<T> {
        let dim = state.len();

        system.apply(t, state, &mut self.k[0]);
        for stage in 1..STAGES - 1 {
            for n in 0..dim {
                let mut sum = T::zero();
                for j in 0..stage {
                    sum = sum + T::lit(tableau.a[stage][j]) * self.k[j][n];
                }
                self.tmp[n] = state[n] + dt * sum;
            }
            system.apply(t + T::lit(tableau.c[stage]) * dt, &self.tmp, &mut self.k[stage]);
        }

        for n in 0..dim {
            let mut sum = T::zero();
            for j in 0..STAGES - 1 {
                sum = sum + T::lit(tableau.b[j]) * self.k[j][n];
            }
            proposal[n] = state[n] + dt * sum;
        }
        system.apply(t + dt, proposal, &mut self.k[STAGES - 1]);

        let finite = self
            .k
            .iter()
            .flatten()
            .chain(proposal.iter())
            .all(|value| value.is_finite());

        let rtol = T::lit(tolerances.rtol);
        let atol = T::lit(tolerances.atol);
        let mut error = T::zero();
        for n in 0..dim {
            let mut estimate = T::zero();
            for j in 0..STAGES {
                estimate = estimate + T::lit(tableau.e[j]) * self.k[j][n];
            }
            let scale = atol + rtol * state[n].abs().max(proposal[n].abs());
            error = error.max((dt * estimate).abs() / scale);
        }

        TrialStep { error, finite }
    }
}

/// Dormand-Prince 5(4), the pair behind the usual "RK45" adaptive solvers.
pub struct DormandPrince45<T: Scalar> {
    stages: Stages<T>,
}

impl<T: Scalar> DormandPrince45<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            stages: Stages::new(dim),
        }
    }
}

impl<T: Scalar> AdaptiveSteppable<T> for DormandPrince45<T> {
    fn error_exponent(&self) -> T {
        T::lit(1.0 / 5.0)
    }

    fn try_step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: T,
        state: &[T],
        dt: T,
        tolerances: &Tolerances,
        proposal: &mut [T],
    ) -> TrialStep<T> {
        self.stages
            .trial(&DORMAND_PRINCE, system, t, state, dt, tolerances, proposal)
    }
}

/// Tsitouras 5/4 Solver
pub struct Tsit5<T: Scalar> {
    stages: Stages<T>,
}

impl<T: Scalar> Tsit5<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            stages: Stages::new(dim),
        }
    }
}

impl<T: Scalar> AdaptiveSteppable<T> for Tsit5<T> {
    fn error_exponent(&self) -> T {
        T::lit(1.0 / 5.0)
    }

    fn try_step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: T,
        state: &[T],
        dt: T,
        tolerances: &Tolerances,
        proposal: &mut [T],
    ) -> TrialStep<T> {
        self.stages
            .trial(&TSITOURAS, system, t, state, dt, tolerances, proposal)
    }
}
