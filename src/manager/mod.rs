//! Volume lifecycle orchestration for the managing instance.
//!
//! The manager owns the identity of the instance it runs on and composes the
//! remote API, the reconciliation loop, and the local device view into the
//! public operations: create, delete, describe, attach, detach, and
//! snapshot create/delete.

mod attach;
mod create;
mod error;
mod snapshot;
mod wait;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::time::Duration;

use crate::api::{Volume, VolumeApi};
use crate::device::DeviceEnumerator;
use crate::metadata::InstanceIdentity;

pub use error::ManagerError;
use wait::PollPolicy;

/// Device-letter suffixes recommended by the provider for additional
/// volume attachments.
const DEVICE_LETTERS: &str = "fghijklmnop";
const DEVICE_PREFIX: &str = "/dev/sd";

/// Default pause between reconciliation polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Manages the lifecycle of volumes attached to a single instance.
///
/// Operations are sequential: each one blocks until the provider-side state
/// machine settles. The manager provides no internal coordination, so
/// concurrent attach calls against the same instance must be serialized by
/// the caller.
pub struct VolumeManager<A, D> {
    api: A,
    devices: D,
    identity: InstanceIdentity,
    policy: PollPolicy,
}

impl<A: VolumeApi, D: DeviceEnumerator> VolumeManager<A, D> {
    /// Builds a manager for the given instance identity.
    pub fn new(api: A, devices: D, identity: InstanceIdentity) -> Self {
        Self {
            api,
            devices,
            identity,
            policy: PollPolicy {
                interval: DEFAULT_POLL_INTERVAL,
                deadline: None,
            },
        }
    }

    /// Overrides the poll pacing and, optionally, bounds each wait.
    ///
    /// Without a deadline every wait is unbounded and a stalled provider
    /// operation stalls the caller indefinitely.
    #[must_use]
    pub const fn with_poll_policy(mut self, interval: Duration, deadline: Option<Duration>) -> Self {
        self.policy = PollPolicy { interval, deadline };
        self
    }

    /// Returns the identity of the managed instance.
    #[must_use]
    pub const fn identity(&self) -> &InstanceIdentity {
        &self.identity
    }

    /// Fetches exactly one volume record by id.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::VolumeLookup`] when the lookup does not yield
    /// exactly one record, or the normalized provider error.
    pub async fn describe_volume(&self, volume_id: &str) -> Result<Volume, ManagerError> {
        let mut volumes = self.api.volumes_by_id(volume_id).await?;
        if volumes.len() != 1 {
            return Err(ManagerError::VolumeLookup {
                volume_id: volume_id.to_owned(),
            });
        }
        volumes.pop().ok_or_else(|| ManagerError::VolumeLookup {
            volume_id: volume_id.to_owned(),
        })
    }

    /// Deletes a volume.
    ///
    /// The provider rejects deletion of an in-use volume; that error is
    /// surfaced verbatim rather than handled here.
    ///
    /// # Errors
    ///
    /// Returns the normalized provider error when the call fails.
    pub async fn delete_volume(&self, volume_id: &str) -> Result<(), ManagerError> {
        self.api.delete_volume(volume_id).await?;
        Ok(())
    }

    /// Deletes a snapshot.
    ///
    /// # Errors
    ///
    /// Returns the normalized provider error when the call fails.
    pub async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), ManagerError> {
        self.api.delete_snapshot(snapshot_id).await?;
        Ok(())
    }

    /// Picks a device slot not currently used by any attachment on this
    /// instance. Which free slot is returned is unspecified.
    async fn free_device_slot(&self) -> Result<String, ManagerError> {
        let volumes = self.api.volumes_attached_to(&self.identity.instance_id).await?;
        let mut candidates: HashSet<String> = DEVICE_LETTERS
            .chars()
            .map(|letter| format!("{DEVICE_PREFIX}{letter}"))
            .collect();
        for volume in &volumes {
            if let Some(attachment) = volume.attachments.first() {
                candidates.remove(&attachment.device);
            }
        }
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| ManagerError::NoFreeSlot {
                instance_id: self.identity.instance_id.clone(),
            })
    }
}
