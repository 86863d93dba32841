//! Hardcoded DH models for a few robots, usable as nominal values / initial guesses

use std::f64::consts::{FRAC_PI_2, PI};

use crate::chain::KinematicChain;
use crate::joint::JointKind::{Prismatic, Revolute};
use crate::parameters::Parameters;
use crate::robot::Robot;

impl Robot {
    fn from_parts(chain: KinematicChain, a: [f64; 6], alpha: [f64; 6], d: [f64; 6], theta: [f64; 6]) -> Self {
        Self::from_vectors(chain, a.to_vec(), alpha.to_vec(), d.to_vec(), theta.to_vec())
    }

    fn from_vectors(chain: KinematicChain, a: Vec<f64>, alpha: Vec<f64>, d: Vec<f64>, theta: Vec<f64>) -> Self {
        let parameters = Parameters::new(a, alpha, d, theta)
            .unwrap_or_else(|e| panic!("inconsistent built-in robot model: {}", e));
        Robot { chain, parameters }
    }

    /// Planar arm with three revolute joints and links of 0.9, 0.4 and 1.9 m.
    pub fn three_r() -> Self {
        Self::from_vectors(
            KinematicChain::revolute(3),
            vec![0.9, 0.4, 1.9],
            vec![0.0; 3],
            vec![0.0; 3],
            vec![0.0; 3],
        )
    }

    /// Stanford arm, RRPRRR: the third joint is the prismatic boom.
    pub fn stanford() -> Self {
        Self::from_parts(
            KinematicChain::new(vec![Revolute, Revolute, Prismatic, Revolute, Revolute, Revolute]),
            [0.1, 0.05, 0.0, 0.05, 0.7, 0.0],
            [3.0 * FRAC_PI_2, 3.0 * FRAC_PI_2, 0.0, FRAC_PI_2, 3.0 * FRAC_PI_2, 0.0],
            [0.9, 1.35, 0.0, 0.3, 0.0, 0.05],
            [3.0 * FRAC_PI_2, PI, 0.0, 3.0 * FRAC_PI_2, 3.0 * FRAC_PI_2, 0.0],
        )
    }

    /// KUKA LBR iiwa 7 R800, seven revolute joints with alternating twist.
    pub fn kuka_iiwa() -> Self {
        Self::from_vectors(
            KinematicChain::revolute(7),
            vec![0.0; 7],
            vec![FRAC_PI_2, FRAC_PI_2, FRAC_PI_2, FRAC_PI_2, FRAC_PI_2, FRAC_PI_2, 0.0],
            vec![0.34, 0.0, 0.4, 0.0, 0.4, 0.0, 0.126],
            vec![PI, PI, 0.0, PI, 0.0, PI, 0.0],
        )
    }
}
