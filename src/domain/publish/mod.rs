pub mod publisher;

pub use publisher::Publisher;

use std::time::Duration;

/// Storage endpoint values are pushed to when nothing else is configured.
pub const DEFAULT_PUBLISH_ENDPOINT: &str = "http://localhost:50051";
/// Quota bought for each pushed value.
pub const DEFAULT_PUBLISH_QUOTA: u128 = 10_000_000;
/// Lifetime requested for published values.
pub const DEFAULT_VALUE_TTL: Duration = Duration::from_secs(86_400);

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub endpoint: String,
    pub quota: u128,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PUBLISH_ENDPOINT.to_string(),
            quota: DEFAULT_PUBLISH_QUOTA,
        }
    }
}
