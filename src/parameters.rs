//! Defines the DH parameter data structures

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use nalgebra::DVector;

use crate::chain::KinematicChain;
use crate::parameter_error::ParameterError;
use crate::utils::{deg, normalize_angle};

/// Denavit-Hartenberg parameters of a single joint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DhLink {
    /// Link length, along the common normal.
    pub a: f64,

    /// Link twist, rotation about the common normal.
    pub alpha: f64,

    /// Link offset along the previous z axis.
    pub d: f64,

    /// Joint angle offset about the previous z axis.
    pub theta: f64,
}

impl DhLink {
    pub fn new(a: f64, alpha: f64, d: f64, theta: f64) -> Self {
        DhLink { a, alpha, d, theta }
    }
}

/// One of the four calibratable parameter groups. The order defines the column
/// layout of the chain Jacobian: `a`, `alpha`, `d`, `theta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "allow_filesystem", derive(clap::ValueEnum))]
pub enum ParameterGroup {
    A,
    Alpha,
    D,
    Theta,
}

impl ParameterGroup {
    pub const ALL: [ParameterGroup; 4] = [
        ParameterGroup::A, ParameterGroup::Alpha, ParameterGroup::D, ParameterGroup::Theta
    ];

    /// Column offset of this group inside the per-joint block of four.
    pub fn index(self) -> usize {
        match self {
            ParameterGroup::A => 0,
            ParameterGroup::Alpha => 1,
            ParameterGroup::D => 2,
            ParameterGroup::Theta => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ParameterGroup::A => "a",
            ParameterGroup::Alpha => "alpha",
            ParameterGroup::D => "d",
            ParameterGroup::Theta => "theta",
        }
    }

    /// Alpha and theta are angles; a and d are lengths.
    pub fn is_angular(self) -> bool {
        matches!(self, ParameterGroup::Alpha | ParameterGroup::Theta)
    }
}

impl fmt::Display for ParameterGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParameterGroup {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParameterGroup::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParameterError::ParseError(format!(
                "unknown parameter group '{}' (expected a, alpha, d or theta)", s
            )))
    }
}

/// DH parameters of a whole chain, stored per group as one vector of length N
/// (one entry per joint). This is the layout the optimizer works with.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub a: DVector<f64>,
    pub alpha: DVector<f64>,
    pub d: DVector<f64>,
    pub theta: DVector<f64>,
}

impl Parameters {
    /// Build parameters from per-group values. All four groups must have the same length.
    pub fn new(a: Vec<f64>, alpha: Vec<f64>, d: Vec<f64>, theta: Vec<f64>) -> Result<Self, ParameterError> {
        let dof = a.len();
        for group in [&alpha, &d, &theta] {
            if group.len() != dof {
                return Err(ParameterError::InvalidLength { expected: dof, found: group.len() });
            }
        }
        Ok(Parameters {
            a: DVector::from_vec(a),
            alpha: DVector::from_vec(alpha),
            d: DVector::from_vec(d),
            theta: DVector::from_vec(theta),
        })
    }

    /// All parameters zero, for a chain of `dof` joints.
    pub fn zeros(dof: usize) -> Self {
        Parameters {
            a: DVector::zeros(dof),
            alpha: DVector::zeros(dof),
            d: DVector::zeros(dof),
            theta: DVector::zeros(dof),
        }
    }

    pub fn from_links(links: &[DhLink]) -> Self {
        Parameters {
            a: DVector::from_iterator(links.len(), links.iter().map(|l| l.a)),
            alpha: DVector::from_iterator(links.len(), links.iter().map(|l| l.alpha)),
            d: DVector::from_iterator(links.len(), links.iter().map(|l| l.d)),
            theta: DVector::from_iterator(links.len(), links.iter().map(|l| l.theta)),
        }
    }

    pub fn dof(&self) -> usize {
        self.a.len()
    }

    /// Parameters of joint `k`. Panics if `k` is out of range.
    pub fn link(&self, k: usize) -> DhLink {
        assert!(k < self.dof(), "joint index {} out of range for {} joints", k, self.dof());
        DhLink {
            a: self.a[k],
            alpha: self.alpha[k],
            d: self.d[k],
            theta: self.theta[k],
        }
    }

    pub fn links(&self) -> Vec<DhLink> {
        (0..self.dof()).map(|k| self.link(k)).collect()
    }

    pub fn group(&self, group: ParameterGroup) -> &DVector<f64> {
        match group {
            ParameterGroup::A => &self.a,
            ParameterGroup::Alpha => &self.alpha,
            ParameterGroup::D => &self.d,
            ParameterGroup::Theta => &self.theta,
        }
    }

    pub fn group_mut(&mut self, group: ParameterGroup) -> &mut DVector<f64> {
        match group {
            ParameterGroup::A => &mut self.a,
            ParameterGroup::Alpha => &mut self.alpha,
            ParameterGroup::D => &mut self.d,
            ParameterGroup::Theta => &mut self.theta,
        }
    }

    /// True if every parameter is finite. Non-finite values are not rejected by the
    /// kinematics, they just propagate into the outputs.
    pub fn is_valid(&self) -> bool {
        ParameterGroup::ALL.iter().all(|&g| self.group(g).iter().all(|v| v.is_finite()))
    }

    /// Wrap alpha and theta into (-PI, PI]. Lengths are left alone.
    pub fn normalize_angles(&mut self) {
        for group in [ParameterGroup::Alpha, ParameterGroup::Theta] {
            self.group_mut(group).apply(|v| *v = normalize_angle(*v));
        }
    }

    /// Largest absolute difference to `other` across all parameters. Angles are compared
    /// modulo 2*PI.
    pub fn max_difference(&self, other: &Parameters) -> f64 {
        assert_eq!(self.dof(), other.dof(), "parameter sets of different length");
        let mut max = 0.0_f64;
        for group in ParameterGroup::ALL {
            for (x, y) in self.group(group).iter().zip(other.group(group).iter()) {
                let diff = if group.is_angular() {
                    normalize_angle(x - y).abs()
                } else {
                    (x - y).abs()
                };
                max = max.max(diff);
            }
        }
        max
    }

    /// Convert to string yaml representation that [`crate::robot::Robot::from_yaml_str`]
    /// reads back (angles are written in degrees, 4 decimals).
    pub fn to_yaml(&self, chain: &KinematicChain) -> String {
        fn row(v: &DVector<f64>, f: impl Fn(&f64) -> String) -> String {
            v.iter().map(f).collect::<Vec<_>>().join(", ")
        }
        format!(
            "dh_chain:\n  \
              joints: [{}]\n  \
              a: [{}]\n  \
              alpha: [{}]\n  \
              d: [{}]\n  \
              theta: [{}]\n",
            chain.kinds().iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", "),
            row(&self.a, |x| x.to_string()),
            row(&self.alpha, deg),
            row(&self.d, |x| x.to_string()),
            row(&self.theta, deg),
        )
    }
}
