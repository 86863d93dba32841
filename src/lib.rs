//! Rust implementation of Denavit-Hartenberg kinematics for the calibration of serial robots
//! with revolute and prismatic joints.
//!
//! The kinematic core is the forward kinematics of a DH chain and the analytic Jacobian of the
//! end-effector position with respect to all four DH parameters of every joint (`a`, `alpha`,
//! `d` and `theta`). It is meant to feed a nonlinear least-squares solver that fits the
//! parameters to measured positions.
//!
//! # Features
//!
//! - Forward kinematics for any mix of revolute and prismatic joints.
//! - Analytic 3 x 4N parameter Jacobian, built with the product rule from cached prefix and
//!   suffix products of the joint transforms.
//! - A residual adapter (`predicted - observed`) binding one measured sample and handing out
//!   residuals and Jacobian blocks per parameter group, either as nalgebra matrices or as flat
//!   row-major buffers.
//! - A Levenberg-Marquardt calibration driver with parameter groups that can be held constant,
//!   samples evaluated in parallel.
//! - Nominal models of a planar 3R arm, the Stanford arm and the KUKA LBR iiwa.
//! - Robot descriptions and calibration settings in YAML, datasets as plain text and the
//!   `dh-calibrate` command line tool (feature `allow_filesystem`, on by default).
//!
//! # Conventions
//!
//! The transform of joint `k` is the standard DH matrix of `(a, alpha, d, theta)`. A revolute
//! joint adds its joint value to `theta`, a prismatic joint adds it to `d`. The chain transform
//! is `T_0 * T_1 * ... * T_{N-1}` and column `4k + g` of the Jacobian is the derivative with
//! respect to group `g` (in the order `a`, `alpha`, `d`, `theta`) of joint `k`.
//!
//! ```
//! use nalgebra::DVector;
//! use rs_dh_calibration::chain::KinematicChain;
//! use rs_dh_calibration::parameters::Parameters;
//!
//! let chain: KinematicChain = "RR".parse().unwrap();
//! let parameters = Parameters::new(vec![1.0, 1.0], vec![0.0; 2], vec![0.0; 2], vec![0.0; 2]).unwrap();
//! let joints = DVector::from_vec(vec![std::f64::consts::FRAC_PI_2, 0.0]);
//!
//! let tcp = chain.forward(&parameters, &joints);
//! assert!((tcp.y - 2.0).abs() < 1e-12);
//! let jacobian = chain.jacobian(&parameters, &joints);
//! assert_eq!(jacobian.shape(), (3, 8));
//! ```

pub mod kinematic_traits;
pub mod parameters;
pub mod parameter_error;

pub mod joint;
pub mod chain;

pub mod robot;
pub mod parameters_robots;

pub mod residual;
pub mod calibration;

#[path = "utils/utils.rs"]
pub mod utils;

#[cfg(feature = "allow_filesystem")]
pub mod parameters_from_file;

#[cfg(feature = "allow_filesystem")]
pub mod dataset;

#[cfg(feature = "allow_filesystem")]
pub mod logger;

#[cfg(test)]
#[cfg(feature = "allow_filesystem")]
mod tests;
