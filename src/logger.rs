//! Logging setup for the calibration binary (optional)

use tracing::Level;

/// Installs the global tracing subscriber at INFO level. `RUST_LOG` overrides the level:
/// ```bash
/// RUST_LOG=debug dh-calibrate --preset kuka-iiwa --positions P.txt --joints Q.txt
/// RUST_LOG=rs_dh_calibration::calibration=trace dh-calibrate ...
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO)
}

/// Same as [`init_logger`] with another default level. Does nothing if a subscriber is
/// already installed.
pub fn init_logger_with_level(default_level: Level) {
    use tracing_subscriber::fmt::time::SystemTime;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_timer(SystemTime)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .try_init();
}
