//! Attachment and detachment of volumes to the managed instance.

use tracing::debug;

use crate::api::{AttachmentState, Volume, VolumeApi};
use crate::device::{DeviceEnumerator, find_attached_device};

use super::VolumeManager;
use super::error::ManagerError;
use super::wait::{Observed, await_settled};

fn observed_attachment(volume: &Volume) -> Observed<AttachmentState> {
    volume
        .attachments
        .first()
        .map_or(Observed::Absent, |attachment| {
            Observed::Present(attachment.state.clone())
        })
}

impl<A: VolumeApi, D: DeviceEnumerator> VolumeManager<A, D> {
    /// Attaches a volume to this instance and returns the block-device name
    /// the operating system assigned it.
    ///
    /// `expected_size_bytes` must be the raw size the volume exposes; it is
    /// the only signal available for picking the new device out of the local
    /// view, since the OS name can differ from the requested slot. The local
    /// view is captured before the attach request so the new device cannot
    /// be missed. Two devices of identical size appearing in the same window
    /// make the match ambiguous and fail the call; concurrent attach calls
    /// against the same instance must be serialized by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NoFreeSlot`] when the device pool is
    /// exhausted, [`ManagerError::AttachmentMissing`] or
    /// [`ManagerError::UnexpectedState`] when the attachment never
    /// establishes, [`ManagerError::Device`] when the new device cannot be
    /// identified, or the normalized provider error.
    pub async fn attach_volume(
        &self,
        volume_id: &str,
        expected_size_bytes: u64,
    ) -> Result<String, ManagerError> {
        let slot = self.free_device_slot().await?;
        debug!(
            %volume_id,
            instance_id = %self.identity().instance_id,
            %slot,
            "attaching volume"
        );

        let before = self.devices.list()?;
        self.api
            .attach_volume(volume_id, &self.identity().instance_id, &slot)
            .await?;
        self.await_volume_attached(volume_id).await?;

        let device = find_attached_device(&self.devices, &before, expected_size_bytes)?;
        Ok(device)
    }

    /// Detaches a volume from this instance and waits for the detachment to
    /// finish. A volume whose attachment record has already disappeared
    /// counts as detached, which makes the wait idempotent against a volume
    /// that finished detaching between polls.
    ///
    /// # Errors
    ///
    /// Returns the normalized provider error when the detach call or a poll
    /// fails.
    pub async fn detach_volume(&self, volume_id: &str) -> Result<(), ManagerError> {
        self.api
            .detach_volume(volume_id, &self.identity().instance_id)
            .await?;

        await_settled(
            self.policy,
            "volume-detach",
            volume_id,
            &[AttachmentState::Detaching],
            || async move {
                let current = self.describe_volume(volume_id).await?;
                Ok(observed_attachment(&current))
            },
        )
        .await?;
        Ok(())
    }

    async fn await_volume_attached(&self, volume_id: &str) -> Result<(), ManagerError> {
        let settled = await_settled(
            self.policy,
            "volume-attach",
            volume_id,
            &[AttachmentState::Attaching],
            || async move {
                let current = self.describe_volume(volume_id).await?;
                Ok(observed_attachment(&current))
            },
        )
        .await?;

        match settled {
            Observed::Present(AttachmentState::Attached) => Ok(()),
            Observed::Present(state) => Err(ManagerError::UnexpectedState {
                entity: volume_id.to_owned(),
                state: state.as_str().to_owned(),
            }),
            Observed::Absent => Err(ManagerError::AttachmentMissing {
                volume_id: volume_id.to_owned(),
            }),
        }
    }
}
