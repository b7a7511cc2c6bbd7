//! Error types for the volume manager.

use thiserror::Error;

use crate::api::{InvalidVolumeType, ProviderError};
use crate::device::DeviceError;
use crate::metadata::MetadataError;

/// Errors raised by volume lifecycle operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Raised when instance identity cannot be resolved from metadata.
    #[error("instance identity unavailable: {source}")]
    Identity {
        /// Underlying metadata failure.
        #[from]
        source: MetadataError,
    },
    /// Raised when the requested volume type is rejected before any API call.
    #[error("invalid volume type for EBS: {requested}")]
    InvalidVolumeType {
        /// The rejected volume type string.
        requested: String,
    },
    /// Raised when the requested size cannot be expressed in provider units.
    #[error("volume size {size_bytes} bytes exceeds the provider limit")]
    SizeTooLarge {
        /// Requested size in bytes.
        size_bytes: u64,
    },
    /// Wrapper for normalized provider failures.
    #[error("provider call failed: {source}")]
    Provider {
        /// Normalized provider error, surfaced verbatim.
        #[from]
        source: ProviderError,
    },
    /// Raised when polling settles in a state other than the expected one.
    #[error("unexpected terminal state {state} for {entity}")]
    UnexpectedState {
        /// Identifier of the entity being polled.
        entity: String,
        /// State observed when the poll loop settled.
        state: String,
    },
    /// Raised when a volume reports no attachment while one is expected.
    #[error("attaching failed for {volume_id}: no attachment present")]
    AttachmentMissing {
        /// Volume whose attachment never appeared.
        volume_id: String,
    },
    /// Raised when a volume lookup does not return exactly one record.
    #[error("cannot find volume {volume_id}")]
    VolumeLookup {
        /// Volume identifier used in the lookup.
        volume_id: String,
    },
    /// Raised when volume creation did not reach the available state.
    #[error("failed creating volume with size {size_bytes} and snapshot {snapshot_id}")]
    CreateFailed {
        /// Requested size in bytes.
        size_bytes: u64,
        /// Snapshot the volume was to be created from; empty when none.
        snapshot_id: String,
    },
    /// Raised when the device pool has no free slot left on this instance.
    #[error("cannot find an available device for instance {instance_id}")]
    NoFreeSlot {
        /// Instance whose attachment set saturated the pool.
        instance_id: String,
    },
    /// Raised when the local device view cannot identify the new device.
    #[error("device matching failed: {source}")]
    Device {
        /// Underlying enumeration or matching failure.
        #[from]
        source: DeviceError,
    },
    /// Raised when a bounded wait exceeds its configured deadline.
    #[error("timeout waiting for {action} on {entity}")]
    Timeout {
        /// Action being waited on.
        action: String,
        /// Entity identifier.
        entity: String,
    },
}

impl From<InvalidVolumeType> for ManagerError {
    fn from(value: InvalidVolumeType) -> Self {
        Self::InvalidVolumeType {
            requested: value.requested,
        }
    }
}
