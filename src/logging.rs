//! Diagnostic logging.
//!
//! Console reports go through [`crate::output`]; this is the `tracing`
//! stream underneath, written to stderr. `ICONSORT_LOG` takes an `EnvFilter`
//! directive and wins over `--verbose`.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_ENV: &str = "ICONSORT_LOG";
const DEFAULT_LOG_FILTER: &str = "iconsort=warn";
const VERBOSE_LOG_FILTER: &str = "iconsort=debug";

pub fn init_logging(verbose: bool) {
    let default_filter = if verbose { VERBOSE_LOG_FILTER } else { DEFAULT_LOG_FILTER };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .try_init();
}
