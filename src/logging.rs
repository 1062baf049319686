use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Directive applied on top of `RUST_LOG`.
///
/// Progress lines (info) only show when the console is kept visible;
/// otherwise only warnings and errors are emitted.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "spotify_taskbar_fix=info"
    } else {
        "spotify_taskbar_fix=warn"
    }
}

pub fn init_logging(verbose: bool) {
    let filter = match default_directive(verbose).parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false),
        )
        .with(filter)
        .try_init();
}
