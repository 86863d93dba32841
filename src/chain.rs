//! Serial chain of DH joints: forward kinematics and the analytic parameter Jacobian.
//!
//! The end-effector transform is the ordered product `T_0 * T_1 * ... * T_{N-1}`. A DH parameter
//! of joint `k` only appears in `T_k`, so by the product rule its derivative is
//!
//! ```text
//! (T_0 * ... * T_{k-1}) * dT_k * (T_{k+1} * ... * T_{N-1})
//! ```
//!
//! where the leading product ("pre") is the identity for the first joint and the trailing one
//! ("post") is the identity for the last. The translation column of that matrix is the
//! contribution of the parameter to the end-effector position.

use std::fmt;
use std::str::FromStr;

use crate::joint::JointKind;
use crate::kinematic_traits::{ChainJacobian, JacobianBlock, JacobianBlocks, JointValues,
                              Kinematics, Position, Transform};
use crate::parameter_error::ParameterError;
use crate::parameters::{ParameterGroup, Parameters};

/// Topology of a serial manipulator: the ordered joint kinds. The order defines the
/// multiplication order of the joint transforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KinematicChain {
    kinds: Vec<JointKind>,
}

impl KinematicChain {
    pub fn new(kinds: Vec<JointKind>) -> Self {
        KinematicChain { kinds }
    }

    /// Chain of `dof` revolute joints.
    pub fn revolute(dof: usize) -> Self {
        KinematicChain { kinds: vec![JointKind::Revolute; dof] }
    }

    pub fn kinds(&self) -> &[JointKind] {
        &self.kinds
    }

    pub fn dof(&self) -> usize {
        self.kinds.len()
    }

    fn check_inputs(&self, parameters: &Parameters, joints: &JointValues) {
        assert_eq!(parameters.dof(), self.dof(),
                   "parameters describe {} joints but the chain has {}", parameters.dof(), self.dof());
        assert_eq!(joints.len(), self.dof(),
                   "{} joint values given for a chain of {} joints", joints.len(), self.dof());
    }

    /// Transform of every joint, in chain order.
    pub fn link_transforms(&self, parameters: &Parameters, joints: &JointValues) -> Vec<Transform> {
        self.check_inputs(parameters, joints);
        self.kinds
            .iter()
            .enumerate()
            .map(|(k, kind)| kind.transform(&parameters.link(k), joints[k]))
            .collect()
    }

    /// Full end-effector pose.
    pub fn forward_transform(&self, parameters: &Parameters, joints: &JointValues) -> Transform {
        self.link_transforms(parameters, joints)
            .iter()
            .fold(Transform::identity(), |pose, t| pose * t)
    }

    /// Pose of the frame after each joint; the last one is the end-effector pose.
    pub fn forward_with_joint_poses(&self, parameters: &Parameters, joints: &JointValues) -> Vec<Transform> {
        let mut pose = Transform::identity();
        self.link_transforms(parameters, joints)
            .iter()
            .map(|t| {
                pose *= t;
                pose
            })
            .collect()
    }

    /// End-effector position.
    pub fn forward(&self, parameters: &Parameters, joints: &JointValues) -> Position {
        translation(&self.forward_transform(parameters, joints))
    }

    /// Position derivatives with respect to every DH parameter, 3 x 4N.
    pub fn jacobian(&self, parameters: &Parameters, joints: &JointValues) -> ChainJacobian {
        let mut jacobian = ChainJacobian::zeros(4 * self.dof());
        self.for_each_delta(parameters, joints, &ParameterGroup::ALL, |k, group, column| {
            jacobian.set_column(4 * k + group.index(), &column);
        });
        jacobian
    }

    /// Position derivatives for the requested parameter groups only, 3 x N each.
    /// Deltas of groups not asked for are never built.
    pub fn jacobian_blocks(&self, parameters: &Parameters, joints: &JointValues,
                           groups: &[ParameterGroup]) -> JacobianBlocks {
        let dof = self.dof();
        let mut blocks: Vec<(ParameterGroup, JacobianBlock)> = groups
            .iter()
            .map(|&group| (group, JacobianBlock::zeros(dof)))
            .collect();
        self.for_each_delta(parameters, joints, groups, |k, group, column| {
            if let Some((_, block)) = blocks.iter_mut().find(|(g, _)| *g == group) {
                block.set_column(k, &column);
            }
        });

        let mut result = JacobianBlocks::default();
        for (group, block) in blocks {
            result.set(group, block);
        }
        result
    }

    /// Runs the pre * delta * post composition for every joint and every requested group,
    /// handing over the translation column of each product.
    ///
    /// Prefix and suffix products are computed once per call: `pre[k] = T_0 ... T_{k-1}` and
    /// `post[k] = T_{k+1} ... T_{N-1}`, both identity at their empty ends.
    fn for_each_delta(&self, parameters: &Parameters, joints: &JointValues, groups: &[ParameterGroup],
                      mut sink: impl FnMut(usize, ParameterGroup, Position)) {
        let transforms = self.link_transforms(parameters, joints);
        let n = transforms.len();

        let mut pre = Vec::with_capacity(n);
        let mut accumulated = Transform::identity();
        for t in &transforms {
            pre.push(accumulated);
            accumulated *= t;
        }

        let mut post = vec![Transform::identity(); n];
        for k in (0..n.saturating_sub(1)).rev() {
            post[k] = transforms[k + 1] * post[k + 1];
        }

        for (k, kind) in self.kinds.iter().enumerate() {
            let link = parameters.link(k);
            for &group in groups {
                let delta = kind.delta(group, &link, joints[k]);
                sink(k, group, translation(&(pre[k] * delta * post[k])));
            }
        }
    }
}

impl Kinematics for KinematicChain {
    fn dof(&self) -> usize {
        KinematicChain::dof(self)
    }

    fn forward(&self, parameters: &Parameters, joints: &JointValues) -> Position {
        KinematicChain::forward(self, parameters, joints)
    }

    fn jacobian(&self, parameters: &Parameters, joints: &JointValues) -> ChainJacobian {
        KinematicChain::jacobian(self, parameters, joints)
    }

    fn jacobian_blocks(&self, parameters: &Parameters, joints: &JointValues,
                       groups: &[ParameterGroup]) -> JacobianBlocks {
        KinematicChain::jacobian_blocks(self, parameters, joints, groups)
    }
}

/// Rows 0..3 of column 3.
fn translation(t: &Transform) -> Position {
    t.fixed_view::<3, 1>(0, 3).into_owned()
}

impl fmt::Display for KinematicChain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for kind in &self.kinds {
            write!(f, "{}", kind)?;
        }
        Ok(())
    }
}

impl FromStr for KinematicChain {
    type Err = ParameterError;

    /// Parses a compact kind string like `RRPRRR`. Whitespace and commas are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kinds = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(|c| c.to_string().parse::<JointKind>())
            .collect::<Result<Vec<_>, _>>()?;
        if kinds.is_empty() {
            return Err(ParameterError::KinematicsConfigurationError(
                "kinematic chain must have at least one joint".to_string()));
        }
        Ok(KinematicChain::new(kinds))
    }
}
