//! Supports reading robot descriptions and calibration settings from YAML files (optional)

use std::path::Path;

use regex::{Captures, Regex};
use yaml_rust2::{Yaml, YamlLoader};

use crate::calibration::CalibrationOptions;
use crate::chain::KinematicChain;
use crate::joint::JointKind;
use crate::parameter_error::ParameterError;
use crate::parameters::{ParameterGroup, Parameters};
use crate::robot::Robot;

/// Used when the YAML file does not say how many samples to keep for validation.
pub const DEFAULT_TRAINING_FRACTION: f64 = 0.8;

/// Solver settings and the training / validation split, from the optional `calibration` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSettings {
    pub options: CalibrationOptions,

    /// Leading share of the samples used for fitting, the rest is used for validation.
    pub training_fraction: f64,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        CalibrationSettings {
            options: CalibrationOptions::default(),
            training_fraction: DEFAULT_TRAINING_FRACTION,
        }
    }
}

impl Robot {
    /// Read the robot description from YAML file. YAML file like this is supported:
    /// ```yaml
    /// # Stanford arm
    /// dh_chain:
    ///   joints: [R, R, P, R, R, R]
    ///   a: [0.1, 0.05, 0, 0.05, 0.7, 0]
    ///   alpha: [deg(270), deg(270), 0, deg(90), deg(270), 0]
    ///   d: [0.9, 1.35, 0, 0.3, 0, 0.05]
    ///   theta: [deg(270), deg(180), 0, deg(270), deg(270), 0]
    /// ```
    /// `joints` may also be given as a compact string like `RRPRRR`. Angles are in radians
    /// unless written with the deg(angle) function.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let doc = load_document(contents)?;
        let section = &doc["dh_chain"];
        if section.is_badvalue() {
            return Err(ParameterError::MissingField("dh_chain".to_string()));
        }

        let chain = read_chain(&section["joints"])?;
        let mut groups = Vec::with_capacity(4);
        for group in ParameterGroup::ALL {
            let values = read_numbers(&section[group.name()], group.name())?;
            if values.len() != chain.dof() {
                return Err(ParameterError::InvalidLength { expected: chain.dof(), found: values.len() });
            }
            for (k, v) in values.iter().enumerate() {
                if !v.is_finite() {
                    return Err(ParameterError::ParseError(format!(
                        "{}[{}] must be finite (got {})", group.name(), k, v
                    )));
                }
            }
            groups.push(values);
        }

        let theta = groups.pop().unwrap_or_default();
        let d = groups.pop().unwrap_or_default();
        let alpha = groups.pop().unwrap_or_default();
        let a = groups.pop().unwrap_or_default();
        Robot::new(chain, Parameters::new(a, alpha, d, theta)?)
    }
}

impl CalibrationSettings {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Reads the optional `calibration` section. Every key is optional:
    /// ```yaml
    /// calibration:
    ///   fixed: [alpha, d]
    ///   max_iterations: 100
    ///   training_fraction: 0.8
    ///   wrap_angles: true
    ///   ftol: 1.0e-12
    ///   xtol: 1.0e-12
    ///   gtol: 1.0e-12
    /// ```
    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let doc = load_document(contents)?;
        let mut settings = CalibrationSettings::default();
        let section = &doc["calibration"];
        if section.is_badvalue() || section.is_null() {
            return Ok(settings);
        }

        let fixed = &section["fixed"];
        if !fixed.is_badvalue() {
            let entries = fixed.as_vec().ok_or_else(|| ParameterError::ParseError(
                "calibration.fixed must be a list of parameter groups".to_string()))?;
            settings.options.fixed = entries
                .iter()
                .map(|e| e.as_str()
                    .ok_or_else(|| ParameterError::ParseError(format!("bad parameter group {:?}", e)))
                    .and_then(|s| s.parse::<ParameterGroup>()))
                .collect::<Result<Vec<_>, _>>()?;
        }

        let iterations = &section["max_iterations"];
        if !iterations.is_badvalue() {
            settings.options.max_iterations = iterations
                .as_i64()
                .filter(|n| *n > 0)
                .map(|n| n as usize)
                .ok_or_else(|| ParameterError::ParseError(
                    "calibration.max_iterations must be a positive integer".to_string()))?;
        }

        let wrap = &section["wrap_angles"];
        if !wrap.is_badvalue() {
            settings.options.wrap_angles = wrap.as_bool().ok_or_else(|| ParameterError::ParseError(
                "calibration.wrap_angles must be true or false".to_string()))?;
        }

        for (key, target) in [
            ("ftol", &mut settings.options.ftol),
            ("xtol", &mut settings.options.xtol),
            ("gtol", &mut settings.options.gtol),
        ] {
            if let Some(value) = read_optional_number(&section[key], key)? {
                if !(value >= 0.0 && value.is_finite()) {
                    return Err(ParameterError::ParseError(format!(
                        "calibration.{} must be a finite non-negative number (got {})", key, value)));
                }
                *target = value;
            }
        }

        if let Some(fraction) = read_optional_number(&section["training_fraction"], "training_fraction")? {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(ParameterError::ParseError(format!(
                    "calibration.training_fraction must be within (0, 1] (got {})", fraction)));
            }
            settings.training_fraction = fraction;
        }

        Ok(settings)
    }
}

/// Expands deg(angle) into radians and parses the first YAML document.
fn load_document(contents: &str) -> Result<Yaml, ParameterError> {
    let deg = Regex::new(r"deg\(\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*\)")
        .map_err(|e| ParameterError::ParseError(e.to_string()))?;
    let expanded = deg.replace_all(contents, |caps: &Captures| {
        let degrees = caps[1].parse::<f64>().unwrap_or(f64::NAN);
        format!("{}", degrees.to_radians())
    });

    let mut docs = YamlLoader::load_from_str(&expanded)
        .map_err(|e| ParameterError::ParseError(e.to_string()))?;
    if docs.is_empty() {
        return Err(ParameterError::ParseError("empty YAML document".to_string()));
    }
    Ok(docs.swap_remove(0))
}

fn read_chain(node: &Yaml) -> Result<KinematicChain, ParameterError> {
    if node.is_badvalue() {
        return Err(ParameterError::MissingField("dh_chain.joints".to_string()));
    }
    if let Some(compact) = node.as_str() {
        return compact.parse::<KinematicChain>();
    }
    let entries = node.as_vec().ok_or_else(|| ParameterError::ParseError(
        "dh_chain.joints must be a list of joint kinds or a string like RRPRRR".to_string()))?;
    let kinds = entries
        .iter()
        .map(|e| e.as_str()
            .ok_or_else(|| ParameterError::ParseError(format!("bad joint kind {:?}", e)))
            .and_then(|s| s.parse::<JointKind>()))
        .collect::<Result<Vec<_>, _>>()?;
    if kinds.is_empty() {
        return Err(ParameterError::KinematicsConfigurationError(
            "kinematic chain must have at least one joint".to_string()));
    }
    Ok(KinematicChain::new(kinds))
}

fn read_numbers(node: &Yaml, name: &str) -> Result<Vec<f64>, ParameterError> {
    if node.is_badvalue() {
        return Err(ParameterError::MissingField(format!("dh_chain.{}", name)));
    }
    let entries = node.as_vec().ok_or_else(|| ParameterError::ParseError(
        format!("{} must be a list of numbers", name)))?;
    entries
        .iter()
        .map(|e| number(e).ok_or_else(|| ParameterError::ParseError(
            format!("{} contains a non-numeric value {:?}", name, e))))
        .collect()
}

fn read_optional_number(node: &Yaml, name: &str) -> Result<Option<f64>, ParameterError> {
    if node.is_badvalue() {
        return Ok(None);
    }
    number(node)
        .map(Some)
        .ok_or_else(|| ParameterError::ParseError(format!("{} must be a number", name)))
}

/// Integers are accepted where reals are expected.
fn number(node: &Yaml) -> Option<f64> {
    match node {
        Yaml::Integer(i) => Some(*i as f64),
        Yaml::Real(_) => node.as_f64(),
        _ => None,
    }
}
