//! A chain topology together with its DH parameters

use crate::chain::KinematicChain;
use crate::kinematic_traits::{ChainJacobian, JointValues, Position, Transform};
use crate::parameter_error::ParameterError;
use crate::parameters::Parameters;

/// Robot model: the joint kinds and the (nominal or fitted) DH parameters. See
/// [parameters_robots.rs](parameters_robots.rs) for concrete robot models.
#[derive(Debug, Clone, PartialEq)]
pub struct Robot {
    pub chain: KinematicChain,
    pub parameters: Parameters,
}

impl Robot {
    /// Fails if the parameters do not have one entry per joint.
    pub fn new(chain: KinematicChain, parameters: Parameters) -> Result<Self, ParameterError> {
        if chain.dof() != parameters.dof() {
            return Err(ParameterError::InvalidLength { expected: chain.dof(), found: parameters.dof() });
        }
        Ok(Robot { chain, parameters })
    }

    pub fn dof(&self) -> usize {
        self.chain.dof()
    }

    pub fn forward(&self, joints: &JointValues) -> Position {
        self.chain.forward(&self.parameters, joints)
    }

    pub fn forward_transform(&self, joints: &JointValues) -> Transform {
        self.chain.forward_transform(&self.parameters, joints)
    }

    pub fn jacobian(&self, joints: &JointValues) -> ChainJacobian {
        self.chain.jacobian(&self.parameters, joints)
    }

    pub fn to_yaml(&self) -> String {
        self.parameters.to_yaml(&self.chain)
    }
}
