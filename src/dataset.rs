//! Reading calibration samples from plain text files (optional)
//!
//! Positions and joint values live in two separate files, matched by index. Both are streams
//! of whitespace separated numbers: 3 per sample in the position file, one per joint in the joint
//! file. Line breaks carry no meaning, a sample may span lines.

use std::path::Path;

use anyhow::{bail, Context, Result};
use nalgebra::{DVector, Vector3};

use crate::residual::CalibrationSample;

/// Measured end-effector positions, 3 numbers each.
pub fn read_positions<P: AsRef<Path>>(path: P) -> Result<Vec<Vector3<f64>>> {
    let rows = read_rows(path.as_ref(), 3)?;
    Ok(rows.iter().map(|r| Vector3::new(r[0], r[1], r[2])).collect())
}

/// Measured joint values, `dof` numbers each.
pub fn read_joint_values<P: AsRef<Path>>(path: P, dof: usize) -> Result<Vec<DVector<f64>>> {
    let rows = read_rows(path.as_ref(), dof)?;
    Ok(rows.into_iter().map(DVector::from_vec).collect())
}

/// Reads both files and pairs them up by index.
pub fn load_samples<P: AsRef<Path>, Q: AsRef<Path>>(positions: P, joints: Q, dof: usize)
    -> Result<Vec<CalibrationSample>> {
    let positions_path = positions.as_ref();
    let joints_path = joints.as_ref();
    let positions = read_positions(positions_path)?;
    let joints = read_joint_values(joints_path, dof)?;
    if positions.len() != joints.len() {
        bail!(
            "{} has {} positions but {} has {} joint value rows",
            positions_path.display(), positions.len(), joints_path.display(), joints.len()
        );
    }
    tracing::debug!(samples = positions.len(), dof, "calibration samples loaded");
    Ok(joints
        .into_iter()
        .zip(positions)
        .map(|(joints, position)| CalibrationSample { joints, position })
        .collect())
}

/// Leading `floor(len * training_fraction)` samples for fitting, the rest for validation.
pub fn split_samples(samples: &[CalibrationSample], training_fraction: f64)
    -> (&[CalibrationSample], &[CalibrationSample]) {
    let fraction = training_fraction.clamp(0.0, 1.0);
    let training = ((samples.len() as f64) * fraction).floor() as usize;
    samples.split_at(training.min(samples.len()))
}

fn read_rows(path: &Path, width: usize) -> Result<Vec<Vec<f64>>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_rows(&contents, width).with_context(|| format!("failed to parse {}", path.display()))
}

/// Splits a whitespace separated number stream into rows of `width`.
pub fn parse_rows(contents: &str, width: usize) -> Result<Vec<Vec<f64>>> {
    if width == 0 {
        bail!("row width must be positive");
    }
    let numbers = contents
        .split_whitespace()
        .enumerate()
        .map(|(i, token)| token
            .parse::<f64>()
            .with_context(|| format!("token {} ({:?}) is not a number", i + 1, token)))
        .collect::<Result<Vec<_>>>()?;
    if numbers.len() % width != 0 {
        bail!("{} numbers do not form rows of {}", numbers.len(), width);
    }
    Ok(numbers.chunks(width).map(|c| c.to_vec()).collect())
}
