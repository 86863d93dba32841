use crate::calibration::{calibrate, rmse, CalibrationOptions, CalibrationProblem};
use crate::dataset::{load_samples, split_samples};
use crate::kinematic_traits::Kinematics;
use crate::parameters::{ParameterGroup, Parameters};
use crate::parameters_from_file::CalibrationSettings;
use crate::robot::Robot;
use crate::tests::test_utils::{seeded, synthetic_samples};

#[test]
fn test_three_r_from_files() {
    let yaml = "src/tests/data/three_r.yaml";
    let robot = Robot::from_yaml_file(yaml).expect("failed to load robot");
    let settings = CalibrationSettings::from_yaml_file(yaml).expect("failed to load settings");
    let samples = load_samples("src/tests/data/three_r/P_3R.txt", "src/tests/data/three_r/Q_3R.txt", robot.dof())
        .expect("failed to load samples");
    let (training, validation) = split_samples(&samples, settings.training_fraction);

    let before = rmse(&robot.chain, &robot.parameters, validation).unwrap();
    let report = calibrate(&robot.chain, training, robot.parameters.clone(), &settings.options)
        .expect("calibration failed");
    let after = rmse(&robot.chain, &report.parameters, validation).unwrap();

    let truth = Parameters::new(
        vec![1.0, 0.5, 2.0], vec![0.0; 3], vec![0.0; 3], vec![0.02, -0.03, 0.01]).unwrap();
    assert!(report.parameters.max_difference(&truth) < 1e-6, "{:?}", report.parameters);
    assert!(before > 0.01, "nominal model should be visibly off, rmse {}", before);
    assert!(after < 1e-8, "validation rmse {}", after);
    assert_eq!(report.parameters.alpha, robot.parameters.alpha);
    assert_eq!(report.parameters.d, robot.parameters.d);
}

#[test]
fn test_kuka_lengths_from_synthetic_measurements() {
    let nominal = Robot::kuka_iiwa();
    let mut truth = nominal.parameters.clone();
    let mut rng = seeded(21);
    for k in 0..7 {
        truth.a[k] += 0.004 * ((k as f64) - 3.0) / 3.0;
        truth.d[k] += 0.003 * (1.0 - (k % 2) as f64 * 2.0);
    }
    let samples = synthetic_samples(&nominal.chain, &truth, 60, &mut rng);
    let (training, validation) = split_samples(&samples, 0.75);

    let options = CalibrationOptions {
        fixed: vec![ParameterGroup::Alpha, ParameterGroup::Theta],
        ..CalibrationOptions::default()
    };
    let report = calibrate(&nominal.chain, training, nominal.parameters.clone(), &options)
        .expect("calibration failed");

    assert!(report.final_cost < 1e-3 * report.initial_cost,
            "cost {} -> {}", report.initial_cost, report.final_cost);
    let after = rmse(&nominal.chain, &report.parameters, validation).unwrap();
    assert!(after < 1e-6, "validation rmse {}", after);
}

#[test]
fn test_calibrate_through_trait_object() {
    let robot = Robot::three_r();
    let mut truth = robot.parameters.clone();
    truth.a[1] += 0.05;
    let mut rng = seeded(22);
    let samples = synthetic_samples(&robot.chain, &truth, 10, &mut rng);

    let kinematics: &dyn Kinematics = &robot.chain;
    let options = CalibrationOptions {
        fixed: vec![ParameterGroup::Alpha, ParameterGroup::D, ParameterGroup::Theta],
        ..CalibrationOptions::default()
    };
    let report = calibrate(kinematics, &samples, robot.parameters.clone(), &options)
        .expect("calibration failed");
    assert!((&report.parameters.a - &truth.a).amax() < 1e-8, "{:?}", report.parameters.a);
}

#[test]
fn test_problem_residuals_vanish_at_truth() {
    let robot = Robot::stanford();
    let mut rng = seeded(23);
    let samples = synthetic_samples(&robot.chain, &robot.parameters, 8, &mut rng);
    let problem = CalibrationProblem::new(
        &robot.chain, &samples, robot.parameters.clone(), ParameterGroup::ALL.to_vec());
    assert_eq!(problem.residual_vector().len(), 24);
    assert!(problem.residual_vector().amax() < 1e-12);
    assert_eq!(problem.jacobian_matrix().shape(), (24, 24));
    assert_eq!(problem.pack().len(), 24);
    assert!(problem.cost() < 1e-24);
}
