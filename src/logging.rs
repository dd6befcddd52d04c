/// Install the stderr `tracing` subscriber. `RUST_LOG` overrides the `info` default.
///
/// Reports go to stdout, so logs stay on stderr.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
