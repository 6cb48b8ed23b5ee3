use nalgebra::{DMatrix, DVector, Vector3};

use crate::chain::KinematicChain;
use crate::errors::Error;

/// Outcome of one bounded solve.
#[derive(Clone, Copy, Debug)]
pub struct SolveStatus {
    pub iterations: usize,
    /// Remaining grasp-point distance to the target.
    pub error: f64,
    pub converged: bool,
}

/// Damped least squares over the chain's position jacobian.
///
/// One call runs to completion inside the tick that requested it. A target
/// outside the reachable workspace never raises an error; the iteration
/// budget simply runs out at the chain's closest reachable approximation.
#[derive(Clone, Copy, Debug)]
pub struct DlsSolver {
    pub max_iter: usize,
    pub tolerance: f64,
    pub damping: f64,
    /// Per-iteration clamp on the pull toward the target.
    pub max_step: f64,
}

impl Default for DlsSolver {
    fn default() -> DlsSolver {
        DlsSolver {
            max_iter: 100,
            tolerance: 1e-4,
            damping: 0.1,
            max_step: 0.1,
        }
    }
}

impl DlsSolver {
    /// Iterates `x` in place toward the target. Joint count must match the
    /// chain; a mismatch is a setup error, not a runtime condition.
    pub fn solve(
        &self,
        chain: &KinematicChain,
        x: &mut [f64],
        target: &Vector3<f64>,
    ) -> Result<SolveStatus, Error> {
        if x.len() != chain.num_dof() {
            return Err(Error::ChainMismatch(format!(
                "solver was given {} angles for a {} joint chain",
                x.len(),
                chain.num_dof()
            )));
        }
        let lambda_sq = self.damping * self.damping;
        for iteration in 0..self.max_iter {
            let mut pull = *target - chain.ee_position(x);
            let error = pull.norm();
            if !error.is_finite() {
                return Err(Error::NotFiniteComputation);
            }
            if error < self.tolerance {
                return Ok(SolveStatus {
                    iterations: iteration,
                    error,
                    converged: true,
                });
            }
            if error > self.max_step {
                pull *= self.max_step / error;
            }
            let jacobian = chain.jacobian(x);
            let jacobian_t = jacobian.transpose();
            let gram = &jacobian * &jacobian_t + DMatrix::identity(3, 3) * lambda_sq;
            let inverse = gram.try_inverse().ok_or(Error::NotFiniteComputation)?;
            let step = &jacobian_t * (inverse * DVector::from_column_slice(pull.as_slice()));
            for (angle, delta) in x.iter_mut().zip(step.iter()) {
                *angle += delta;
                if !angle.is_finite() {
                    return Err(Error::NotFiniteComputation);
                }
            }
        }
        let error = (*target - chain.ee_position(x)).norm();
        Ok(SolveStatus {
            iterations: self.max_iter,
            error,
            converged: error < self.tolerance,
        })
    }
}
