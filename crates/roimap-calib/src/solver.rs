//! Levenberg-Marquardt driver for the calibration problems.
//!
//! Problems only supply stacked residuals. The Jacobian is taken by central
//! differences and the damped iteration runs in `levenberg_marquardt`.

use crate::CalibError;
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use log::debug;
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};
use serde::{Deserialize, Serialize};

/// Stacked residuals `r(x)` of a least-squares objective `‖r(x)‖²`.
pub trait ResidualProblem {
    fn num_residuals(&self) -> usize;
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;
}

/// Stopping rules handed to the Levenberg-Marquardt solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Relative cost reduction below which the solve has converged.
    pub ftol: f64,
    /// Relative step length below which the solve has converged.
    pub xtol: f64,
    /// Cosine between residuals and every Jacobian column below which the solve stops.
    pub gtol: f64,
    /// Residual evaluations allowed per parameter.
    pub patience: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-12,
            patience: 100,
        }
    }
}

/// Outcome of a solve. Costs are sums of squared residuals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    pub initial_cost: f64,
    pub final_cost: f64,
    pub evaluations: usize,
    pub converged: bool,
}

impl SolveOptions {
    pub fn with_tolerance(patience: usize, tol: f64) -> Self {
        Self {
            ftol: tol,
            xtol: tol,
            patience,
            ..Self::default()
        }
    }

    /// Minimise `problem` from `x0`; returns the final parameters and a report.
    pub fn minimize<P: ResidualProblem>(
        &self,
        problem: &P,
        x0: DVector<f64>,
    ) -> Result<(DVector<f64>, SolveReport), CalibError> {
        if x0.is_empty() || problem.num_residuals() == 0 {
            return Err(CalibError::SingularSystem);
        }
        let initial_cost = problem.residuals(&x0).norm_squared();
        if !initial_cost.is_finite() {
            return Err(CalibError::NonFinite);
        }

        let lm = LevenbergMarquardt::new()
            .with_ftol(self.ftol)
            .with_xtol(self.xtol)
            .with_gtol(self.gtol)
            .with_patience(self.patience.max(1));
        let (solved, report) = lm.minimize(NumericProblem {
            problem,
            params: x0,
        });
        debug!(
            "levenberg-marquardt stopped after {} evaluations: {:?}",
            report.number_of_evaluations, report.termination
        );

        let x = solved.params;
        let final_cost = problem.residuals(&x).norm_squared();
        if !final_cost.is_finite() || x.iter().any(|v| !v.is_finite()) {
            return Err(CalibError::NonFinite);
        }
        Ok((
            x,
            SolveReport {
                initial_cost,
                final_cost,
                evaluations: report.number_of_evaluations,
                converged: report.termination.was_successful(),
            },
        ))
    }
}

struct NumericProblem<'a, P> {
    problem: &'a P,
    params: DVector<f64>,
}

impl<P: ResidualProblem> LeastSquaresProblem<f64, Dyn, Dyn> for NumericProblem<'_, P> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let r = self.problem.residuals(&self.params);
        r.iter().all(|v| v.is_finite()).then_some(r)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let x = &self.params;
        let mut jac = DMatrix::zeros(self.problem.num_residuals(), x.len());
        let mut xp = x.clone();
        for k in 0..x.len() {
            let h = 1e-6 * x[k].abs().max(1.0);
            xp[k] = x[k] + h;
            let rp = self.problem.residuals(&xp);
            xp[k] = x[k] - h;
            let rm = self.problem.residuals(&xp);
            xp[k] = x[k];
            let col = (rp - rm) / (2.0 * h);
            if col.iter().any(|v| !v.is_finite()) {
                return None;
            }
            jac.set_column(k, &col);
        }
        Some(jac)
    }
}

/// Root-mean-square point error from stacked `(dx, dy)` residual pairs.
pub fn rms_from_cost(cost: f64, num_points: usize) -> f64 {
    if num_points == 0 {
        return 0.0;
    }
    (cost / num_points as f64).sqrt()
}
