//! Helper functions

use std::f64::consts::PI;

use crate::parameters::Parameters;

/// Map an angle into (-PI, PI].
pub fn normalize_angle(angle: f64) -> f64 {
    let two_pi = 2.0 * PI;
    let x = angle.rem_euclid(two_pi);
    if x > PI { x - two_pi } else { x }
}

/// Fitted parameter table, one row per link, lengths in meters and angles in radians.
pub fn format_report(parameters: &Parameters) -> String {
    let mut report = format!(
        "{:>4}{:>14}{:>19}{:>13}{:>19}\n",
        "Link", "a [m]", "alpha [rad]", "d [m]", "theta [rad]"
    );
    for (k, link) in parameters.links().iter().enumerate() {
        report.push_str(&format!(
            "{:>4}  {:>13.6}   {:>13.6}   {:>13.6}   {:>13.6}\n",
            k + 1, link.a, link.alpha, link.d, link.theta
        ));
    }
    report
}

/// Print the parameter table.
pub fn dump_parameters(parameters: &Parameters) {
    println!("{}", format_report(parameters));
}

/// formatting for YAML output
pub(crate) fn deg(x: &f64) -> String {
    if *x == 0.0 {
        return "0".to_string();
    }
    format!("deg({:.4})", x.to_degrees())
}
