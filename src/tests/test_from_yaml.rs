use crate::calibration::CalibrationOptions;
use crate::chain::KinematicChain;
use crate::parameter_error::ParameterError;
use crate::parameters::ParameterGroup;
use crate::parameters_from_file::{CalibrationSettings, DEFAULT_TRAINING_FRACTION};
use crate::robot::Robot;

const READ_ERROR: &'static str = "Failed to load robot from file";

#[test]
fn test_robot_from_yaml() {
    let filename = "src/tests/data/stanford.yaml";
    let loaded = Robot::from_yaml_file(filename).expect(READ_ERROR);
    let expected = Robot::stanford();

    assert_eq!(loaded.chain, expected.chain);
    assert_eq!(loaded.chain.to_string(), "RRPRRR");
    assert!(loaded.parameters.max_difference(&expected.parameters) < 1e-12,
            "{:?}", loaded.parameters);
    assert_eq!(loaded.parameters.d[1], 1.35);
}

#[test]
fn test_compact_joint_string_and_settings() {
    let filename = "src/tests/data/three_r.yaml";
    let loaded = Robot::from_yaml_file(filename).expect(READ_ERROR);
    assert_eq!(loaded, Robot::three_r());

    let settings = CalibrationSettings::from_yaml_file(filename).expect(READ_ERROR);
    assert_eq!(settings.options.fixed, vec![ParameterGroup::Alpha, ParameterGroup::D]);
    assert_eq!(settings.options.max_iterations, 200);
    assert_eq!(settings.options.ftol, 1.0e-14);
    assert_eq!(settings.options.gtol, 0.0);
    assert_eq!(settings.options.xtol, CalibrationOptions::default().xtol);
    assert!(settings.options.wrap_angles);
    assert_eq!(settings.training_fraction, 0.8);
}

#[test]
fn test_settings_default_without_section() {
    let settings = CalibrationSettings::from_yaml_file("src/tests/data/stanford.yaml").expect(READ_ERROR);
    assert_eq!(settings, CalibrationSettings::default());
    assert_eq!(settings.training_fraction, DEFAULT_TRAINING_FRACTION);
}

#[test]
fn test_to_yaml_reads_back() {
    for robot in [Robot::three_r(), Robot::stanford(), Robot::kuka_iiwa()] {
        let yaml = robot.to_yaml();
        let reloaded = Robot::from_yaml_str(&yaml).expect("failed to read back generated YAML");
        assert_eq!(reloaded.chain, robot.chain);
        // Angles are written with four decimals in degrees.
        assert!(reloaded.parameters.max_difference(&robot.parameters) < 1e-5, "{}", yaml);
    }
}

#[test]
fn test_deg_notation_variants() {
    let yaml = "dh_chain:\n  joints: [p, revolute]\n  a: [0, 1]\n  alpha: [deg( -90 ), deg(1.5e2)]\n  \
                d: [0.5, 0]\n  theta: [deg(.5), 2]\n";
    let robot = Robot::from_yaml_str(yaml).expect(READ_ERROR);
    assert_eq!(robot.chain, "PR".parse::<KinematicChain>().unwrap());
    assert!((robot.parameters.alpha[0] + 90.0_f64.to_radians()).abs() < 1e-15);
    assert!((robot.parameters.alpha[1] - 150.0_f64.to_radians()).abs() < 1e-15);
    assert!((robot.parameters.theta[0] - 0.5_f64.to_radians()).abs() < 1e-15);
    assert_eq!(robot.parameters.theta[1], 2.0);
}

#[test]
fn test_invalid_length() {
    let result = Robot::from_yaml_file("src/tests/data/test/invalid_length.yaml");
    assert!(matches!(result, Err(ParameterError::InvalidLength { expected: 2, found: 3 })), "{:?}", result);
}

#[test]
fn test_missing_group() {
    let result = Robot::from_yaml_file("src/tests/data/test/missing_theta.yaml");
    match result {
        Err(ParameterError::MissingField(field)) => assert_eq!(field, "dh_chain.theta"),
        other => panic!("expected missing field, got {:?}", other),
    }
}

#[test]
fn test_invalid_nan() {
    let result = Robot::from_yaml_file("src/tests/data/test/invalid_nan.yaml");
    let err = result.expect_err("NaN must be rejected");
    assert!(err.to_string().contains("must be finite"), "{}", err);
}

#[test]
fn test_invalid_joint_kind() {
    assert!(matches!(Robot::from_yaml_file("src/tests/data/test/invalid_joint_kind.yaml"),
                     Err(ParameterError::ParseError(_))));
}

#[test]
fn test_invalid_calibration_section() {
    let robot = Robot::from_yaml_file("src/tests/data/test/invalid_training_fraction.yaml");
    assert!(robot.is_ok(), "the robot part is fine: {:?}", robot);
    let err = CalibrationSettings::from_yaml_file("src/tests/data/test/invalid_training_fraction.yaml")
        .expect_err("fraction above 1 must be rejected");
    assert!(err.to_string().contains("training_fraction"), "{}", err);

    assert!(CalibrationSettings::from_yaml_file("src/tests/data/test/invalid_fixed_group.yaml").is_err());
}

#[test]
fn test_missing_file() {
    assert!(matches!(Robot::from_yaml_file("src/tests/data/test/no_such_robot.yaml"),
                     Err(ParameterError::IoError(_))));
}

#[test]
fn test_not_a_robot() {
    assert!(matches!(Robot::from_yaml_str("something_else: 1\n"),
                     Err(ParameterError::MissingField(_))));
    assert!(Robot::from_yaml_str("").is_err());
}
