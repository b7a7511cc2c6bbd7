//! Instance identity discovery via the instance metadata service.
//!
//! Running on a managed instance is a hard precondition for every volume
//! operation, so identity is resolved once at startup and unavailability is
//! treated as "wrong execution environment" rather than a transient fault.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_ENDPOINT: &str = "http://169.254.169.254";
const METADATA_ROOT: &str = "latest/meta-data";
const INSTANCE_ID_KEY: &str = "instance-id";
const AVAILABILITY_ZONE_KEY: &str = "placement/availability-zone";
const REGION_KEY: &str = "placement/region";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors raised while talking to the metadata service.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum MetadataError {
    /// Raised when the process is not running on a managed instance.
    #[error("not running on an EC2 instance")]
    NotAnInstance,
    /// Raised when a metadata path cannot be fetched.
    #[error("failed to fetch metadata {path}: {message}")]
    Fetch {
        /// Metadata path that was requested.
        path: String,
        /// Transport error message.
        message: String,
    },
    /// Raised when the metadata service answers with a non-success status.
    #[error("metadata {path} returned status {status}")]
    Status {
        /// Metadata path that was requested.
        path: String,
        /// HTTP status code returned.
        status: u16,
    },
}

/// Future returned by metadata lookups.
pub type MetadataFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, MetadataError>> + Send + 'a>>;

/// Future returned by the availability probe.
pub type AvailabilityFuture<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

/// Instance metadata collaborator.
pub trait MetadataSource {
    /// Probes whether the metadata service is reachable at all.
    fn available(&self) -> AvailabilityFuture<'_>;

    /// Fetches a single metadata value by path relative to the metadata root.
    fn get_metadata<'a>(&'a self, key: &'a str) -> MetadataFuture<'a, String>;

    /// Returns the region the instance runs in.
    fn region(&self) -> MetadataFuture<'_, String>;
}

/// Identity of the instance this process runs on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceIdentity {
    /// Provider identifier of the instance.
    pub instance_id: String,
    /// Region the instance runs in.
    pub region: String,
    /// Availability zone the instance runs in; volumes must be created here.
    pub availability_zone: String,
}

impl InstanceIdentity {
    /// Resolves the identity of the running instance.
    ///
    /// Fails fast without fetching anything when the availability probe
    /// reports the metadata service unreachable.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::NotAnInstance`] when the probe fails, or the
    /// underlying fetch error when a metadata value cannot be retrieved.
    pub async fn resolve<M: MetadataSource>(source: &M) -> Result<Self, MetadataError> {
        if !source.available().await {
            return Err(MetadataError::NotAnInstance);
        }
        let instance_id = source.get_metadata(INSTANCE_ID_KEY).await?;
        let region = source.region().await?;
        let availability_zone = source.get_metadata(AVAILABILITY_ZONE_KEY).await?;
        Ok(Self {
            instance_id,
            region,
            availability_zone,
        })
    }
}

/// HTTP client for the plain-text instance metadata service.
#[derive(Clone, Debug)]
pub struct ImdsClient {
    endpoint: String,
    client: reqwest::Client,
}

impl ImdsClient {
    /// Builds a client against the given endpoint.
    ///
    /// The endpoint is configurable so tests can point the client at a local
    /// listener instead of the link-local metadata address.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_owned(),
            client,
        }
    }

    async fn fetch(&self, path: &str) -> Result<String, MetadataError> {
        let url = format!("{}/{METADATA_ROOT}/{path}", self.endpoint);
        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|err| MetadataError::Fetch {
                    path: path.to_owned(),
                    message: err.to_string(),
                })?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status {
                path: path.to_owned(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(|err| MetadataError::Fetch {
            path: path.to_owned(),
            message: err.to_string(),
        })?;
        Ok(body.trim().to_owned())
    }
}

impl Default for ImdsClient {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl MetadataSource for ImdsClient {
    fn available(&self) -> AvailabilityFuture<'_> {
        Box::pin(async move { self.fetch(INSTANCE_ID_KEY).await.is_ok() })
    }

    fn get_metadata<'a>(&'a self, key: &'a str) -> MetadataFuture<'a, String> {
        Box::pin(async move { self.fetch(key).await })
    }

    fn region(&self) -> MetadataFuture<'_, String> {
        Box::pin(async move { self.fetch(REGION_KEY).await })
    }
}
