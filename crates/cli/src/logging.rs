use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the stderr logger. `RUST_LOG` wins over the verbosity flag.
pub fn init_logger(verbose: bool) {
    let default_directives = if verbose {
        "staffdesk=debug,staffdesk_core=debug,sqlite_adapter=debug"
    } else {
        "staffdesk=info,staffdesk_core=warn,sqlite_adapter=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
