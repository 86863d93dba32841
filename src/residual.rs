//! Residual adapter between the kinematics and a nonlinear least-squares solver.
//!
//! One [`ResidualBlock`] is bound to one measured sample for its whole lifetime and is evaluated
//! repeatedly with changing parameter estimates. The residual is the predicted minus the
//! observed position, so its derivatives are exactly the position derivatives of the chain.

use nalgebra::{DVector, Vector3};

use crate::kinematic_traits::{JacobianBlock, JacobianBlocks, JointValues, Kinematics, Position};
use crate::parameters::{ParameterGroup, Parameters};

/// Measured joint values and the end-effector position observed for them.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSample {
    pub joints: JointValues,
    pub position: Position,
}

impl CalibrationSample {
    pub fn new(joints: Vec<f64>, position: [f64; 3]) -> Self {
        CalibrationSample {
            joints: DVector::from_vec(joints),
            position: Vector3::from(position),
        }
    }
}

/// Residual and the requested Jacobian blocks at one parameter estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub residual: Vector3<f64>,
    pub jacobians: JacobianBlocks,
}

pub struct ResidualBlock<'a, K: Kinematics + ?Sized> {
    kinematics: &'a K,
    sample: &'a CalibrationSample,
}

impl<'a, K: Kinematics + ?Sized> ResidualBlock<'a, K> {
    /// Binds the sample. Panics if the sample has a wrong number of joint values.
    pub fn new(kinematics: &'a K, sample: &'a CalibrationSample) -> Self {
        assert_eq!(sample.joints.len(), kinematics.dof(),
                   "sample has {} joint values, the robot has {} joints",
                   sample.joints.len(), kinematics.dof());
        ResidualBlock { kinematics, sample }
    }

    pub fn sample(&self) -> &CalibrationSample {
        self.sample
    }

    /// Predicted minus observed position.
    pub fn residual(&self, parameters: &Parameters) -> Vector3<f64> {
        self.kinematics.forward(parameters, &self.sample.joints) - self.sample.position
    }

    /// Derivative of the residual with respect to one parameter group, 3 x N.
    pub fn jacobian_block(&self, parameters: &Parameters, group: ParameterGroup) -> JacobianBlock {
        self.kinematics
            .jacobian_blocks(parameters, &self.sample.joints, &[group])
            .get(group)
            .cloned()
            .unwrap_or_else(|| panic!("kinematics returned no {} block although it was requested", group))
    }

    /// Residual plus the Jacobian blocks of the requested groups. Groups held fixed by the
    /// optimizer are simply left out of `requested` and are not computed.
    pub fn evaluate(&self, parameters: &Parameters, requested: &[ParameterGroup]) -> Evaluation {
        let residual = self.residual(parameters);
        let jacobians = if requested.is_empty() {
            JacobianBlocks::default()
        } else {
            self.kinematics.jacobian_blocks(parameters, &self.sample.joints, requested)
        };
        Evaluation { residual, jacobians }
    }

    /// Flat-buffer variant of [`ResidualBlock::evaluate`] for solvers that hand out raw memory.
    ///
    /// `parameters` holds the `a, alpha, d, theta` vectors in this order, `residuals` receives
    /// 3 values. Each present entry of `jacobians` receives its group's 3 x N block in row-major
    /// order, entry `row * N + k` for joint `k`. Absent entries are skipped.
    pub fn evaluate_into(&self, parameters: [&[f64]; 4], residuals: &mut [f64],
                         jacobians: &mut [Option<&mut [f64]>; 4]) {
        let dof = self.kinematics.dof();
        for values in &parameters {
            assert_eq!(values.len(), dof, "parameter block of length {} for {} joints", values.len(), dof);
        }
        assert!(residuals.len() >= 3, "residual buffer must hold 3 values");

        let [a, alpha, d, theta] = parameters;
        let parameters = Parameters {
            a: DVector::from_column_slice(a),
            alpha: DVector::from_column_slice(alpha),
            d: DVector::from_column_slice(d),
            theta: DVector::from_column_slice(theta),
        };

        let requested: Vec<ParameterGroup> = ParameterGroup::ALL
            .into_iter()
            .filter(|g| jacobians[g.index()].is_some())
            .collect();
        let evaluation = self.evaluate(&parameters, &requested);
        residuals[..3].copy_from_slice(evaluation.residual.as_slice());

        for group in requested {
            if let (Some(buffer), Some(block)) =
                (jacobians[group.index()].as_deref_mut(), evaluation.jacobians.get(group)) {
                assert!(buffer.len() >= 3 * dof, "jacobian buffer too small for group {}", group);
                for row in 0..3 {
                    for k in 0..dof {
                        buffer[row * dof + k] = block[(row, k)];
                    }
                }
            }
        }
    }
}
