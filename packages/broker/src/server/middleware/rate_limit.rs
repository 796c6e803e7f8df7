//! Per-IP rate limiting via `tower_governor`.
//!
//! Disabled entirely when `rate_limit_per_second` is 0, which is the
//! default for the integration test harness where every request shares
//! the loopback address.

use governor::middleware::NoOpMiddleware;
use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};

use crate::config::Config;

pub fn governor_config(config: &Config) -> Option<GovernorConfig<tower_governor::key_extractor::PeerIpKeyExtractor, NoOpMiddleware>> {
    if config.rate_limit_per_second == 0 {
        return None;
    }

    let governor_config = GovernorConfigBuilder::default()
        .per_second(config.rate_limit_per_second)
        .burst_size(config.rate_limit_burst)
        .finish()
        .expect("rate limit configuration is valid");

    Some(governor_config)
}
