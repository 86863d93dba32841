//! Per-joint DH transform and its partial derivatives with respect to the four DH parameters.
//!
//! The transform follows the classic (distal) Denavit-Hartenberg convention,
//! `Rot_z(theta) * Trans_z(d) * Trans_x(a) * Rot_x(alpha)`:
//!
//! ```text
//! | cos t  -sin t cos al   sin t sin al   a cos t |
//! | sin t   cos t cos al  -cos t sin al   a sin t |
//! |   0        sin al         cos al         d    |
//! |   0          0              0            1    |
//! ```
//!
//! The live joint variable `q` is added to `theta` for revolute joints and to `d` for prismatic
//! ones. The derivatives ("deltas") are taken with respect to the static parameters; `d` never
//! enters them, so for prismatic joints they are evaluated at the static `theta`.

use std::fmt;
use std::str::FromStr;

use crate::kinematic_traits::Transform;
use crate::parameter_error::ParameterError;
use crate::parameters::{DhLink, ParameterGroup};

/// Kind of joint, fixed when the chain is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointKind {
    /// Joint variable rotates about z, offsets `theta`.
    Revolute,
    /// Joint variable translates along z, offsets `d`.
    Prismatic,
}

impl JointKind {
    /// The `theta` used for both the transform and the deltas.
    fn effective_theta(self, link: &DhLink, q: f64) -> f64 {
        match self {
            JointKind::Revolute => link.theta + q,
            JointKind::Prismatic => link.theta,
        }
    }

    /// The `d` used for the transform. The deltas do not depend on `d`.
    fn effective_d(self, link: &DhLink, q: f64) -> f64 {
        match self {
            JointKind::Revolute => link.d,
            JointKind::Prismatic => link.d + q,
        }
    }

    /// Rigid transform of this joint for the joint variable `q`.
    pub fn transform(self, link: &DhLink, q: f64) -> Transform {
        dh_transform(link.a, link.alpha, self.effective_d(link, q), self.effective_theta(link, q))
    }

    /// Partial derivative of [`JointKind::transform`] with respect to one DH parameter,
    /// at the same operating point.
    pub fn delta(self, group: ParameterGroup, link: &DhLink, q: f64) -> Transform {
        let theta = self.effective_theta(link, q);
        match group {
            ParameterGroup::A => delta_a(theta),
            ParameterGroup::Alpha => delta_alpha(link.alpha, theta),
            ParameterGroup::D => delta_d(),
            ParameterGroup::Theta => delta_theta(link.a, link.alpha, theta),
        }
    }

    /// All four deltas, in `a, alpha, d, theta` order.
    pub fn deltas(self, link: &DhLink, q: f64) -> [Transform; 4] {
        ParameterGroup::ALL.map(|group| self.delta(group, link, q))
    }

    /// Single letter code, `R` or `P`.
    pub fn code(self) -> char {
        match self {
            JointKind::Revolute => 'R',
            JointKind::Prismatic => 'P',
        }
    }
}

impl fmt::Display for JointKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for JointKind {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r" | "revolute" => Ok(JointKind::Revolute),
            "p" | "prismatic" => Ok(JointKind::Prismatic),
            other => Err(ParameterError::ParseError(format!(
                "unknown joint kind '{}' (expected R or P)", other
            ))),
        }
    }
}

/// Standard DH transform, no joint variable applied.
#[rustfmt::skip]
pub fn dh_transform(a: f64, alpha: f64, d: f64, theta: f64) -> Transform {
    let (sin_alpha, cos_alpha) = alpha.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Transform::new(
        cos_theta, -sin_theta * cos_alpha,  sin_theta * sin_alpha, a * cos_theta,
        sin_theta,  cos_theta * cos_alpha, -cos_theta * sin_alpha, a * sin_theta,
              0.0,              sin_alpha,              cos_alpha,             d,
              0.0,                    0.0,                    0.0,           1.0,
    )
}

/// Derivative with respect to `a`: only the x, y translation moves.
#[rustfmt::skip]
pub fn delta_a(theta: f64) -> Transform {
    let (sin_theta, cos_theta) = theta.sin_cos();
    Transform::new(
        0.0, 0.0, 0.0, cos_theta,
        0.0, 0.0, 0.0, sin_theta,
        0.0, 0.0, 0.0,       0.0,
        0.0, 0.0, 0.0,       0.0,
    )
}

/// Derivative with respect to `alpha`: rotation block only.
#[rustfmt::skip]
pub fn delta_alpha(alpha: f64, theta: f64) -> Transform {
    let (sin_alpha, cos_alpha) = alpha.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Transform::new(
        0.0,  sin_theta * sin_alpha,  sin_theta * cos_alpha, 0.0,
        0.0, -cos_theta * sin_alpha, -cos_theta * cos_alpha, 0.0,
        0.0,              cos_alpha,             -sin_alpha, 0.0,
        0.0,                    0.0,                    0.0, 0.0,
    )
}

/// Derivative with respect to `d`, a unit translation along the local z axis.
/// The same for every joint.
#[rustfmt::skip]
pub fn delta_d() -> Transform {
    Transform::new(
        0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
        0.0, 0.0, 0.0, 0.0,
    )
}

/// Derivative with respect to `theta`, rotation and translation.
#[rustfmt::skip]
pub fn delta_theta(a: f64, alpha: f64, theta: f64) -> Transform {
    let (sin_alpha, cos_alpha) = alpha.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Transform::new(
        -sin_theta, -cos_theta * cos_alpha, cos_theta * sin_alpha, -a * sin_theta,
         cos_theta, -sin_theta * cos_alpha, sin_theta * sin_alpha,  a * cos_theta,
               0.0,                    0.0,                   0.0,            0.0,
               0.0,                    0.0,                   0.0,            0.0,
    )
}
