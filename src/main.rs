//! Fits DH parameters of a serial robot to measured positions.
//!
//! # Usage
//! ```bash
//! dh-calibrate --preset kuka-iiwa --positions P_KUKA.txt --joints Q_KUKA.txt
//!
//! # Nominal model and solver settings from YAML, alpha and d held constant:
//! dh-calibrate --robot stanford.yaml --positions P.txt --joints Q.txt --fix alpha --fix d
//!
//! # Keep everything for fitting and write the result:
//! dh-calibrate --preset three-r --positions P.txt --joints Q.txt --training-fraction 1.0 --output fitted.yaml
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use rs_dh_calibration::calibration::{calibrate, rmse};
use rs_dh_calibration::dataset::{load_samples, split_samples};
use rs_dh_calibration::logger::init_logger;
use rs_dh_calibration::parameters::ParameterGroup;
use rs_dh_calibration::parameters_from_file::CalibrationSettings;
use rs_dh_calibration::robot::Robot;
use rs_dh_calibration::utils::dump_parameters;

/// Built-in nominal robot models
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// Planar arm with three revolute joints
    ThreeR,
    /// Stanford arm, RRPRRR
    Stanford,
    /// KUKA LBR iiwa, seven revolute joints
    KukaIiwa,
}

impl Preset {
    fn robot(self) -> Robot {
        match self {
            Preset::ThreeR => Robot::three_r(),
            Preset::Stanford => Robot::stanford(),
            Preset::KukaIiwa => Robot::kuka_iiwa(),
        }
    }
}

/// DH parameter calibration from measured end-effector positions
#[derive(Parser)]
#[command(name = "dh-calibrate")]
#[command(about = "Fits DH parameters of a serial robot to measured end-effector positions")]
struct Args {
    /// YAML robot description, also read for the optional calibration section
    #[arg(long, value_name = "YAML", conflicts_with = "preset", required_unless_present = "preset")]
    robot: Option<PathBuf>,

    /// Built-in robot model used as the initial guess
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Measured positions, 3 numbers per sample
    #[arg(long, value_name = "FILE")]
    positions: PathBuf,

    /// Measured joint values, one number per joint and sample
    #[arg(long, value_name = "FILE")]
    joints: PathBuf,

    /// Leading share of the samples used for fitting, the rest is used for validation
    #[arg(long)]
    training_fraction: Option<f64>,

    /// Solver iteration limit
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Parameter group to hold constant (repeatable)
    #[arg(long, value_enum)]
    fix: Vec<ParameterGroup>,

    /// Write the fitted robot description here
    #[arg(short, long, value_name = "YAML")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger();

    let (robot, mut settings) = match (&args.robot, args.preset) {
        (Some(path), _) => {
            let robot = Robot::from_yaml_file(path)
                .with_context(|| format!("failed to load robot from {}", path.display()))?;
            let settings = CalibrationSettings::from_yaml_file(path)
                .with_context(|| format!("failed to load calibration settings from {}", path.display()))?;
            (robot, settings)
        }
        (None, Some(preset)) => (preset.robot(), CalibrationSettings::default()),
        (None, None) => bail!("either --robot or --preset is required"),
    };

    if let Some(fraction) = args.training_fraction {
        if !(fraction > 0.0 && fraction <= 1.0) {
            bail!("--training-fraction must be within (0, 1], got {}", fraction);
        }
        settings.training_fraction = fraction;
    }
    if let Some(iterations) = args.max_iterations {
        settings.options.max_iterations = iterations;
    }
    if !args.fix.is_empty() {
        settings.options.fixed = args.fix.clone();
    }

    info!(chain = %robot.chain, joints = robot.dof(), "robot model ready");
    let samples = load_samples(&args.positions, &args.joints, robot.dof())?;
    let (training, validation) = split_samples(&samples, settings.training_fraction);
    info!(training = training.len(), validation = validation.len(), "samples split");
    if training.is_empty() {
        bail!("no samples left for fitting ({} loaded)", samples.len());
    }

    let report = calibrate(&robot.chain, training, robot.parameters.clone(), &settings.options)?;
    if !report.converged {
        warn!(termination = %report.termination, "solver did not report convergence");
    }

    dump_parameters(&report.parameters);
    println!("Final cost: {:e} after {} evaluations ({})",
             report.final_cost, report.evaluations, report.termination);
    match rmse(&robot.chain, &report.parameters, validation) {
        Some(value) => println!("Validation RMSE: {:.6} over {} samples", value, validation.len()),
        None => println!("Validation RMSE: no validation samples"),
    }

    if let Some(path) = &args.output {
        let fitted = Robot::new(robot.chain.clone(), report.parameters)?;
        std::fs::write(path, fitted.to_yaml())
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "fitted parameters written");
    }
    Ok(())
}
