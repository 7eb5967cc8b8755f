use std::env;

use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    prelude::*,
    EnvFilter,
};

/// Installs the global subscriber for a binary embedding the driver.
///
/// - `rust_log`: default directive used when `RUST_LOG` is not set, e.g.
///   `info,ansible_driver=debug`. Enabling debug for `ansible_driver` also
///   raises the runner's own verbosity.
///
/// Logs are plain text unless `JSON_LOGS` is set.
pub fn init_tracing(rust_log: &str) {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", rust_log);
    }

    let json_logs = env::var_os("JSON_LOGS").is_some();

    build_subscriber(EnvFilter::from_default_env(), json_logs, std::io::stdout).init();
}

/// Builds the subscriber used by [`init_tracing`] around an arbitrary writer.
pub fn build_subscriber<W>(
    filter: EnvFilter,
    json_logs: bool,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_target(true);

    if json_logs {
        let layer = layer
            .json()
            .flatten_event(true)
            .with_span_list(false)
            .with_filter(filter);
        Box::new(tracing_subscriber::registry().with(layer))
    } else {
        Box::new(tracing_subscriber::registry().with(layer.with_filter(filter)))
    }
}
