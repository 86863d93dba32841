//! Least-squares fitting of DH parameters to measured (joint values, position) samples.
//!
//! The solver is the Levenberg-Marquardt implementation of the `levenberg-marquardt` crate; this
//! module only stacks the per-sample residual blocks into one problem for it. Samples are
//! evaluated in parallel, all of them reading the same parameter snapshot.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};
use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::kinematic_traits::Kinematics;
use crate::parameter_error::ParameterError;
use crate::parameters::{ParameterGroup, Parameters};
use crate::residual::{CalibrationSample, ResidualBlock};

/// Solver settings. Tolerances are passed to the solver as they are.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationOptions {
    /// Upper bound on solver iterations. Each iteration costs about one problem evaluation; the
    /// solver counts its budget in steps of (free parameters + 1) evaluations, so the limit is
    /// rounded up to the next such step.
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,

    /// Parameter groups held constant at their initial values.
    pub fixed: Vec<ParameterGroup>,

    /// Wrap fitted alpha and theta into (-PI, PI].
    pub wrap_angles: bool,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        CalibrationOptions {
            max_iterations: 100,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
            fixed: Vec::new(),
            wrap_angles: true,
        }
    }
}

impl CalibrationOptions {
    /// Groups that are optimized, in Jacobian column order.
    pub fn free_groups(&self) -> Vec<ParameterGroup> {
        ParameterGroup::ALL
            .into_iter()
            .filter(|g| !self.fixed.contains(g))
            .collect()
    }
}

/// Outcome of [`calibrate`].
#[derive(Debug, Clone)]
pub struct CalibrationReport {
    pub parameters: Parameters,
    pub initial_cost: f64,

    /// Half the sum of squared residuals at the fitted parameters.
    pub final_cost: f64,
    pub evaluations: usize,
    pub converged: bool,
    pub termination: String,
}

/// All samples stacked into one least-squares problem: 3 residual rows per sample, one column
/// per free parameter. The free parameters are laid out group by group (`a` of every joint, then
/// `alpha` of every joint and so on), skipping the fixed groups.
pub struct CalibrationProblem<'a, K: Kinematics + ?Sized> {
    kinematics: &'a K,
    samples: &'a [CalibrationSample],
    parameters: Parameters,
    free: Vec<ParameterGroup>,
}

impl<'a, K: Kinematics + ?Sized> CalibrationProblem<'a, K> {
    pub fn new(kinematics: &'a K, samples: &'a [CalibrationSample], initial: Parameters,
               free: Vec<ParameterGroup>) -> Self {
        CalibrationProblem { kinematics, samples, parameters: initial, free }
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn into_parameters(self) -> Parameters {
        self.parameters
    }

    pub fn free_groups(&self) -> &[ParameterGroup] {
        &self.free
    }

    /// Free parameters as one vector.
    pub fn pack(&self) -> DVector<f64> {
        let dof = self.parameters.dof();
        let mut x = DVector::zeros(self.free.len() * dof);
        for (slot, &group) in self.free.iter().enumerate() {
            x.rows_mut(slot * dof, dof).copy_from(self.parameters.group(group));
        }
        x
    }

    /// Writes the free parameters back, fixed groups are untouched.
    pub fn unpack(&mut self, x: &DVector<f64>) {
        let dof = self.parameters.dof();
        assert_eq!(x.len(), self.free.len() * dof, "parameter vector of wrong length");
        for (slot, &group) in self.free.iter().enumerate() {
            self.parameters.group_mut(group).copy_from(&x.rows(slot * dof, dof));
        }
    }

    /// Stacked residuals, 3 per sample in sample order.
    pub fn residual_vector(&self) -> DVector<f64> {
        let parameters = &self.parameters;
        let residuals: Vec<f64> = self.samples
            .par_iter()
            .flat_map_iter(|sample| {
                let residual = ResidualBlock::new(self.kinematics, sample).residual(parameters);
                [residual.x, residual.y, residual.z]
            })
            .collect();
        DVector::from_vec(residuals)
    }

    /// Stacked Jacobian of the residuals with respect to the free parameters.
    pub fn jacobian_matrix(&self) -> DMatrix<f64> {
        let dof = self.parameters.dof();
        let parameters = &self.parameters;
        let evaluations: Vec<_> = self.samples
            .par_iter()
            .map(|sample| ResidualBlock::new(self.kinematics, sample).evaluate(parameters, &self.free))
            .collect();

        let mut jacobian = DMatrix::zeros(3 * self.samples.len(), self.free.len() * dof);
        for (i, evaluation) in evaluations.iter().enumerate() {
            for (slot, &group) in self.free.iter().enumerate() {
                let block = evaluation.jacobians.get(group).unwrap_or_else(|| {
                    panic!("kinematics returned no {} block although it was requested", group)
                });
                jacobian.view_mut((3 * i, slot * dof), (3, dof)).copy_from(block);
            }
        }
        jacobian
    }

    /// Half the sum of squared residuals.
    pub fn cost(&self) -> f64 {
        0.5 * self.residual_vector().norm_squared()
    }
}

impl<'a, K: Kinematics + ?Sized> LeastSquaresProblem<f64, Dyn, Dyn> for CalibrationProblem<'a, K> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.unpack(x);
    }

    fn params(&self) -> DVector<f64> {
        self.pack()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let residuals = self.residual_vector();
        trace!(cost = 0.5 * residuals.norm_squared(), "residuals evaluated");
        Some(residuals)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        Some(self.jacobian_matrix())
    }
}

/// Fits the free DH parameters to the samples, starting from `initial`.
pub fn calibrate<K: Kinematics + ?Sized>(kinematics: &K, samples: &[CalibrationSample], initial: Parameters,
                                         options: &CalibrationOptions) -> Result<CalibrationReport, ParameterError> {
    let dof = kinematics.dof();
    if samples.is_empty() {
        return Err(ParameterError::CalibrationSetupError("no calibration samples".to_string()));
    }
    if initial.dof() != dof {
        return Err(ParameterError::InvalidLength { expected: dof, found: initial.dof() });
    }
    if let Some(bad) = samples.iter().find(|s| s.joints.len() != dof) {
        return Err(ParameterError::InvalidLength { expected: dof, found: bad.joints.len() });
    }
    if !initial.is_valid() {
        return Err(ParameterError::CalibrationSetupError(
            "initial parameters must be finite".to_string()));
    }
    for (name, value) in [("ftol", options.ftol), ("xtol", options.xtol), ("gtol", options.gtol)] {
        if !(value >= 0.0 && value.is_finite()) {
            return Err(ParameterError::CalibrationSetupError(format!(
                "{} must be a finite non-negative number (got {})", name, value)));
        }
    }
    let free = options.free_groups();
    if free.is_empty() {
        return Err(ParameterError::CalibrationSetupError(
            "all parameter groups are fixed, nothing to optimize".to_string()));
    }
    let patience = patience(options.max_iterations, free.len() * dof);

    let problem = CalibrationProblem::new(kinematics, samples, initial, free);
    let initial_cost = problem.cost();
    info!(samples = samples.len(), joints = dof, free = problem.free_groups().len() * dof,
          initial_cost, "starting calibration");
    debug!(fixed = ?options.fixed, max_iterations = options.max_iterations, patience, "solver settings");

    let solver = LevenbergMarquardt::new()
        .with_ftol(options.ftol)
        .with_xtol(options.xtol)
        .with_gtol(options.gtol)
        .with_patience(patience);
    let (problem, report) = solver.minimize(problem);

    let mut parameters = problem.into_parameters();
    if options.wrap_angles {
        parameters.normalize_angles();
    }
    let converged = report.termination.was_successful();
    let termination = format!("{:?}", report.termination);
    info!(final_cost = report.objective_function, evaluations = report.number_of_evaluations,
          converged, termination = %termination, "calibration finished");

    Ok(CalibrationReport {
        parameters,
        initial_cost,
        final_cost: report.objective_function,
        evaluations: report.number_of_evaluations,
        converged,
        termination,
    })
}

/// Solver patience for an evaluation budget of `max_iterations`. The solver stops after
/// `patience * (free + 1)` evaluations.
pub(crate) fn patience(max_iterations: usize, free: usize) -> usize {
    max_iterations.div_ceil(free + 1).max(1)
}

/// Root mean square of the position error over the samples, `None` if there are none.
pub fn rmse<K: Kinematics + ?Sized>(kinematics: &K, parameters: &Parameters,
                                    samples: &[CalibrationSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let squared: f64 = samples
        .par_iter()
        .map(|sample| ResidualBlock::new(kinematics, sample).residual(parameters).norm_squared())
        .sum();
    Some((squared / samples.len() as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::KinematicChain;

    fn planar_samples(chain: &KinematicChain, truth: &Parameters) -> Vec<CalibrationSample> {
        (0..12)
            .map(|i| {
                let t = i as f64;
                let joints = DVector::from_vec(vec![0.3 * t, (0.7 * t).sin(), (1.3 * t).cos()]);
                let position = chain.forward(truth, &joints);
                CalibrationSample { joints, position }
            })
            .collect()
    }

    #[test]
    fn test_pack_unpack_skips_fixed_groups() {
        let chain = KinematicChain::revolute(2);
        let samples = vec![CalibrationSample::new(vec![0.0, 0.0], [0.0; 3])];
        let initial = Parameters::new(vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0], vec![7.0, 8.0]).unwrap();
        let mut problem = CalibrationProblem::new(
            &chain, &samples, initial, vec![ParameterGroup::A, ParameterGroup::Theta]);

        assert_eq!(problem.pack(), DVector::from_vec(vec![1.0, 2.0, 7.0, 8.0]));
        problem.unpack(&DVector::from_vec(vec![-1.0, -2.0, -7.0, -8.0]));
        let p = problem.parameters();
        assert_eq!(p.a, DVector::from_vec(vec![-1.0, -2.0]));
        assert_eq!(p.alpha, DVector::from_vec(vec![3.0, 4.0]));
        assert_eq!(p.d, DVector::from_vec(vec![5.0, 6.0]));
        assert_eq!(p.theta, DVector::from_vec(vec![-7.0, -8.0]));
    }

    #[test]
    fn test_stacked_jacobian_layout() {
        let chain: KinematicChain = "RP".parse().unwrap();
        let parameters = Parameters::new(vec![0.3, 0.1], vec![0.5, 0.0], vec![0.2, 0.4], vec![0.1, -0.3]).unwrap();
        let samples = vec![
            CalibrationSample::new(vec![0.2, 0.1], [0.0; 3]),
            CalibrationSample::new(vec![-0.7, 0.5], [1.0, 1.0, 1.0]),
        ];
        let free = vec![ParameterGroup::Alpha, ParameterGroup::D];
        let problem = CalibrationProblem::new(&chain, &samples, parameters.clone(), free.clone());
        let stacked = problem.jacobian_matrix();
        assert_eq!(stacked.shape(), (6, 4));

        for (i, sample) in samples.iter().enumerate() {
            let full = chain.jacobian(&parameters, &sample.joints);
            for (slot, group) in free.iter().enumerate() {
                for k in 0..2 {
                    for row in 0..3 {
                        assert_eq!(stacked[(3 * i + row, slot * 2 + k)], full[(row, 4 * k + group.index())]);
                    }
                }
            }
        }

        let residuals = problem.residual_vector();
        assert_eq!(residuals.len(), 6);
        let second = chain.forward(&parameters, &samples[1].joints) - samples[1].position;
        assert!((residuals.rows(3, 3) - second).norm() < 1e-12);
    }

    #[test]
    fn test_recovers_planar_arm() {
        let chain = KinematicChain::revolute(3);
        let truth = Parameters::new(vec![1.0, 0.5, 2.0], vec![0.0; 3], vec![0.0; 3], vec![0.1, -0.2, 0.05]).unwrap();
        let samples = planar_samples(&chain, &truth);
        let initial = Parameters::new(vec![0.9, 0.4, 1.9], vec![0.0; 3], vec![0.0; 3], vec![0.0; 3]).unwrap();
        let options = CalibrationOptions {
            fixed: vec![ParameterGroup::Alpha, ParameterGroup::D],
            ..CalibrationOptions::default()
        };

        let report = calibrate(&chain, &samples, initial, &options).expect("calibration failed");
        assert!(report.final_cost < 1e-14, "final cost {}", report.final_cost);
        assert!(report.final_cost < report.initial_cost);
        assert!(report.parameters.max_difference(&truth) < 1e-6, "{:?}", report.parameters);
        assert_eq!(report.parameters.alpha, truth.alpha);
        assert!(rmse(&chain, &report.parameters, &samples).unwrap() < 1e-8);
    }

    #[test]
    fn test_rejects_bad_setup() {
        let chain = KinematicChain::revolute(2);
        let initial = Parameters::zeros(2);
        let samples = vec![CalibrationSample::new(vec![0.0, 0.0], [0.0; 3])];

        let err = calibrate(&chain, &[], initial.clone(), &CalibrationOptions::default()).unwrap_err();
        assert!(err.to_string().contains("no calibration samples"));

        let all_fixed = CalibrationOptions { fixed: ParameterGroup::ALL.to_vec(), ..Default::default() };
        let err = calibrate(&chain, &samples, initial.clone(), &all_fixed).unwrap_err();
        assert!(err.to_string().contains("nothing to optimize"));

        let short = vec![CalibrationSample::new(vec![0.0], [0.0; 3])];
        let err = calibrate(&chain, &short, initial.clone(), &CalibrationOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid Length: expected 2, found 1");

        let mut broken = initial;
        broken.d[0] = f64::NAN;
        assert!(calibrate(&chain, &samples, broken, &CalibrationOptions::default()).is_err());
    }

    #[test]
    fn test_max_iterations_bounds_evaluations() {
        let chain = KinematicChain::revolute(3);
        let truth = Parameters::new(vec![1.0, 0.5, 2.0], vec![0.1, -0.1, 0.2], vec![0.3, 0.0, -0.2],
                                    vec![0.1, -0.2, 0.05]).unwrap();
        let samples: Vec<_> = (0..30)
            .map(|i| {
                let t = i as f64;
                let joints = DVector::from_vec(vec![0.2 * t, (0.9 * t).sin(), (1.7 * t).cos()]);
                let position = chain.forward(&truth, &joints);
                CalibrationSample { joints, position }
            })
            .collect();
        let initial = Parameters::new(vec![0.5, 0.5, 0.5], vec![0.0; 3], vec![0.0; 3], vec![0.0; 3]).unwrap();

        // All 12 parameters free: the budget is counted in steps of 13 evaluations.
        for (max_iterations, budget) in [(1, 13), (13, 13), (14, 26), (30, 39)] {
            let options = CalibrationOptions { max_iterations, ..CalibrationOptions::default() };
            let report = calibrate(&chain, &samples, initial.clone(), &options).expect("calibration failed");
            assert!(report.evaluations <= budget,
                    "max_iterations {} gave {} evaluations ({})", max_iterations, report.evaluations,
                    report.termination);
        }
    }

    #[test]
    fn test_patience() {
        assert_eq!(patience(0, 12), 1);
        assert_eq!(patience(1, 12), 1);
        assert_eq!(patience(13, 12), 1);
        assert_eq!(patience(14, 12), 2);
        assert_eq!(patience(100, 27), 4);
    }

    #[test]
    fn test_rejects_bad_tolerances() {
        let chain = KinematicChain::revolute(2);
        let samples = vec![CalibrationSample::new(vec![0.0, 0.0], [1.0, 0.0, 0.0])];
        for options in [
            CalibrationOptions { ftol: -1e-12, ..Default::default() },
            CalibrationOptions { xtol: -1.0, ..Default::default() },
            CalibrationOptions { gtol: f64::NAN, ..Default::default() },
        ] {
            let err = calibrate(&chain, &samples, Parameters::zeros(2), &options).unwrap_err();
            assert!(matches!(err, ParameterError::CalibrationSetupError(_)), "{}", err);
            assert!(err.to_string().contains("non-negative"), "{}", err);
        }
    }

    #[test]
    fn test_rmse() {
        let chain = KinematicChain::revolute(1);
        let parameters = Parameters::new(vec![1.0], vec![0.0], vec![0.0], vec![0.0]).unwrap();
        let samples = vec![
            CalibrationSample::new(vec![0.0], [1.0, 3.0, 0.0]),
            CalibrationSample::new(vec![0.0], [1.0, 0.0, -1.0]),
        ];
        assert!((rmse(&chain, &parameters, &samples).unwrap() - 5.0_f64.sqrt()).abs() < 1e-12);
        assert!(rmse(&chain, &parameters, &[]).is_none());
    }
}
