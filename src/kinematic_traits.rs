//! Shared types and the kinematics trait consumed by the residual adapter

extern crate nalgebra as na;

use na::{DVector, Matrix3xX, Matrix4, Vector3};
use crate::parameters::{ParameterGroup, Parameters};

/// Homogeneous 4x4 rigid transform of a single joint or of a sub-chain.
pub type Transform = Matrix4<f64>;

/// End-effector position, the translation column of the composed chain transform.
pub type Position = Vector3<f64>;

/// Live joint variables (angles for revolute, displacements for prismatic joints), one per joint.
pub type JointValues = DVector<f64>;

/// 3 x 4N matrix of position derivatives. Column `4k + g` is the derivative with respect to
/// the parameter group `g` (a, alpha, d, theta in this order) of joint `k`.
pub type ChainJacobian = Matrix3xX<f64>;

/// 3 x N slice of the [`ChainJacobian`] for a single parameter group, column `k` for joint `k`.
pub type JacobianBlock = Matrix3xX<f64>;

/// Jacobian blocks addressed by parameter group. Blocks that were not requested are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JacobianBlocks {
    blocks: [Option<JacobianBlock>; 4],
}

impl JacobianBlocks {
    pub fn get(&self, group: ParameterGroup) -> Option<&JacobianBlock> {
        self.blocks[group.index()].as_ref()
    }

    pub fn set(&mut self, group: ParameterGroup, block: JacobianBlock) {
        self.blocks[group.index()] = Some(block);
    }

    /// Slice the requested groups out of the full chain Jacobian.
    pub fn from_chain_jacobian(jacobian: &ChainJacobian, groups: &[ParameterGroup]) -> Self {
        let dof = jacobian.ncols() / 4;
        let mut blocks = JacobianBlocks::default();
        for &group in groups {
            let block = JacobianBlock::from_fn(dof, |row, joint| {
                jacobian[(row, 4 * joint + group.index())]
            });
            blocks.set(group, block);
        }
        blocks
    }
}

pub trait Kinematics: Sync {
    /// Number of joints in the chain.
    fn dof(&self) -> usize;

    /// End-effector position for the given DH parameters and joint values.
    fn forward(&self, parameters: &Parameters, joints: &JointValues) -> Position;

    /// Full 3 x 4N derivative of the end-effector position with respect to all DH parameters.
    fn jacobian(&self, parameters: &Parameters, joints: &JointValues) -> ChainJacobian;

    /// Derivatives for the requested parameter groups only. The default computes the full
    /// Jacobian and slices it; implementations may skip the groups not asked for.
    fn jacobian_blocks(&self, parameters: &Parameters, joints: &JointValues,
                       groups: &[ParameterGroup]) -> JacobianBlocks {
        JacobianBlocks::from_chain_jacobian(&self.jacobian(parameters, joints), groups)
    }
}
