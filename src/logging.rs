//! Human-readable logging setup for binaries/tests (SPEC_FULL.md §A.2).
//! Library code never calls `init()` implicitly — only a binary's `main`
//! or a test harness should decide how (and whether) to subscribe.

/// Install a `tracing_subscriber::fmt` subscriber honoring `RUST_LOG`,
/// defaulting to `info` for this crate when the variable is unset.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("attestor_core=info".parse().unwrap()),
        )
        .init();
}
