use tracing::Level;

/// Install the global fmt subscriber. A second call is a no-op.
pub fn init(max_level: Level) {
    let installed = tracing_subscriber::fmt().with_max_level(max_level).with_target(false).try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
