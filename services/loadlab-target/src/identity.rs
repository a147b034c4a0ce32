//! Private network identity reported by `/`.
//!
//! Resolution cascades through the configured sources (instance metadata
//! service, then local hostname resolution) and ends in a fixed sentinel.
//! The first successful lookup is cached for the life of the process.
//!
//! The local fallback reports whatever address the machine's own hostname
//! resolves to. Outside a cloud VPC that is not necessarily a private address.

use crate::config::IdentityConfig;
use async_trait::async_trait;
use loadlab_core::metrics::IDENTITY_LOOKUPS;
use once_cell::sync::OnceCell;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// Hostname and address pair identifying this instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateIdentity {
    pub dns: String,
    pub ip: String,
}

impl PrivateIdentity {
    pub fn new(dns: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            dns: dns.into(),
            ip: ip.into(),
        }
    }

    /// Returned when every source failed.
    pub fn sentinel() -> Self {
        Self::new("unknown.local", "127.0.0.1")
    }

    /// Plain-text body served by `/`.
    pub fn greeting(&self) -> String {
        format!("Hello from {} ({})\n", self.dns, self.ip)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("metadata request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("hostname resolution failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Unavailable(String),
}

/// One way of discovering the instance identity.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Label used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn lookup(&self) -> Result<PrivateIdentity, IdentityError>;
}

/// IMDSv2: session token exchange followed by two metadata reads.
pub struct MetadataServiceSource {
    client: reqwest::Client,
    base_url: String,
    token_ttl_secs: u64,
}

impl MetadataServiceSource {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .timeout(config.timeout())
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            base_url: config.metadata_endpoint.trim_end_matches('/').to_string(),
            token_ttl_secs: config.token_ttl_secs,
        })
    }

    async fn token(&self) -> Result<String, IdentityError> {
        let token = self
            .client
            .put(format!("{}/api/token", self.base_url))
            .header(TOKEN_TTL_HEADER, self.token_ttl_secs.to_string())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(token)
    }

    async fn meta_data(&self, path: &str, token: &str) -> Result<String, IdentityError> {
        let value = self
            .client
            .get(format!("{}/meta-data/{}", self.base_url, path))
            .header(TOKEN_HEADER, token)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(value.trim().to_string())
    }
}

#[async_trait]
impl IdentitySource for MetadataServiceSource {
    fn name(&self) -> &'static str {
        "metadata"
    }

    async fn lookup(&self) -> Result<PrivateIdentity, IdentityError> {
        let token = self.token().await?;
        let ip = self.meta_data("local-ipv4", &token).await?;
        let dns = self.meta_data("local-hostname", &token).await?;
        Ok(PrivateIdentity::new(dns, ip))
    }
}

/// Local hostname plus the first IPv4 address it resolves to.
#[derive(Debug, Default)]
pub struct LocalHostnameSource;

#[async_trait]
impl IdentitySource for LocalHostnameSource {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn lookup(&self) -> Result<PrivateIdentity, IdentityError> {
        let hostname = gethostname::gethostname()
            .into_string()
            .map_err(|_| IdentityError::Unavailable("hostname is not valid UTF-8".to_string()))?;

        if hostname.is_empty() {
            return Err(IdentityError::Unavailable("hostname is empty".to_string()));
        }

        let ip = tokio::net::lookup_host((hostname.as_str(), 0))
            .await?
            .map(|addr| addr.ip())
            .find(IpAddr::is_ipv4)
            .ok_or_else(|| {
                IdentityError::Unavailable(format!("no IPv4 address for {}", hostname))
            })?;

        Ok(PrivateIdentity::new(hostname, ip.to_string()))
    }
}

/// Default source chain: metadata service, then local resolution.
pub fn default_sources(
    config: &IdentityConfig,
) -> Result<Vec<Arc<dyn IdentitySource>>, IdentityError> {
    Ok(vec![
        Arc::new(MetadataServiceSource::new(config)?),
        Arc::new(LocalHostnameSource),
    ])
}

/// Process-wide, write-once identity cell.
///
/// Concurrent first requests may each run the lookup; the first value stored
/// wins and nobody waits on anybody else. The sentinel is never stored.
#[derive(Debug, Default)]
pub struct IdentityCache {
    cell: OnceCell<PrivateIdentity>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self) -> Option<&PrivateIdentity> {
        self.cell.get()
    }

    pub async fn get_or_resolve(&self, sources: &[Arc<dyn IdentitySource>]) -> PrivateIdentity {
        if let Some(identity) = self.cell.get() {
            IDENTITY_LOOKUPS.with_label_values(&["cached"]).inc();
            return identity.clone();
        }

        for source in sources {
            match source.lookup().await {
                Ok(identity) => {
                    IDENTITY_LOOKUPS.with_label_values(&[source.name()]).inc();
                    let stored = self.cell.get_or_init(|| identity);
                    info!(
                        source = source.name(),
                        dns = %stored.dns,
                        ip = %stored.ip,
                        "Resolved private identity"
                    );
                    return stored.clone();
                }
                Err(err) => {
                    debug!(source = source.name(), error = %err, "Identity source failed");
                }
            }
        }

        IDENTITY_LOOKUPS.with_label_values(&["sentinel"]).inc();
        PrivateIdentity::sentinel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        result: Option<PrivateIdentity>,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn ok(dns: &str, ip: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Some(PrivateIdentity::new(dns, ip)),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                result: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl IdentitySource for StubSource {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn lookup(&self) -> Result<PrivateIdentity, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .ok_or_else(|| IdentityError::Unavailable("stub failure".to_string()))
        }
    }

    #[tokio::test]
    async fn test_first_success_is_cached() {
        let source = StubSource::ok("ip-10-0-0-1.internal", "10.0.0.1");
        let sources: Vec<Arc<dyn IdentitySource>> = vec![source.clone()];
        let cache = IdentityCache::new();

        let first = cache.get_or_resolve(&sources).await;
        let second = cache.get_or_resolve(&sources).await;

        assert_eq!(first, PrivateIdentity::new("ip-10-0-0-1.internal", "10.0.0.1"));
        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_falls_through_to_next_source() {
        let metadata = StubSource::failing();
        let local = StubSource::ok("devbox", "192.168.1.5");
        let sources: Vec<Arc<dyn IdentitySource>> = vec![metadata.clone(), local.clone()];
        let cache = IdentityCache::new();

        let identity = cache.get_or_resolve(&sources).await;

        assert_eq!(identity.dns, "devbox");
        assert_eq!(metadata.calls.load(Ordering::SeqCst), 1);
        assert_eq!(local.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sentinel_is_not_cached() {
        let source = StubSource::failing();
        let sources: Vec<Arc<dyn IdentitySource>> = vec![source.clone()];
        let cache = IdentityCache::new();

        assert_eq!(cache.get_or_resolve(&sources).await, PrivateIdentity::sentinel());
        assert!(cache.cached().is_none());

        cache.get_or_resolve(&sources).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_stores_one_value() {
        let source = StubSource::ok("host", "10.1.1.1");
        let sources: Vec<Arc<dyn IdentitySource>> = vec![source];
        let cache = Arc::new(IdentityCache::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let sources = sources.clone();
                tokio::spawn(async move { cache.get_or_resolve(&sources).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), PrivateIdentity::new("host", "10.1.1.1"));
        }
        assert_eq!(cache.cached(), Some(&PrivateIdentity::new("host", "10.1.1.1")));
    }

    #[test]
    fn test_greeting_format() {
        assert_eq!(
            PrivateIdentity::sentinel().greeting(),
            "Hello from unknown.local (127.0.0.1)\n"
        );
    }
}
