//! CRPT submission configuration
use std::time::Duration;

use clap::Parser;
use url::Url;

/// CRPT "create document" endpoint.
pub const DEFAULT_API_URL: &str = "https://ismp.crpt.ru/api/v3/lk/documents/create";

/// Endpoint configuration options
#[derive(Debug, Clone, Parser)]
pub struct EndpointOpts {
    /// Document creation endpoint
    #[clap(long = "api-url", env = "CRPT_API_URL", default_value = DEFAULT_API_URL)]
    pub url: Url,
    /// Timeout for a single submission in seconds
    #[clap(long, env = "CRPT_REQUEST_TIMEOUT_SECS", default_value = "10")]
    pub request_timeout_secs: u64,
}

impl EndpointOpts {
    /// Timeout for a single submission.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Rate gate configuration options
#[derive(Debug, Clone, Parser)]
pub struct GateOpts {
    /// Requests admitted per window
    #[clap(
        long,
        env = "CRPT_REQUEST_LIMIT",
        default_value = "1",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub request_limit: u32,
    /// Window length in milliseconds
    #[clap(
        long,
        env = "CRPT_PERIOD_MS",
        default_value = "1000",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub period_ms: u64,
}

impl GateOpts {
    /// Window length.
    pub const fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

/// CLI options for crpt-submit
#[derive(Debug, Clone, Parser)]
#[clap(name = "crpt-submit", about = "Submit CRPT documents through a fixed window rate gate")]
pub struct Opts {
    /// Endpoint configuration
    #[clap(flatten)]
    pub endpoint: EndpointOpts,

    /// Rate gate configuration
    #[clap(flatten)]
    pub gate: GateOpts,

    /// Number of concurrent submissions to fire
    #[clap(long, env = "CRPT_REQUESTS", default_value = "100")]
    pub requests: usize,
}
