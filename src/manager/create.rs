//! Volume creation with GiB rounding and compensating cleanup.

use tracing::{debug, warn};

use crate::api::{CreateVolumeRequest, GIB, VolumeApi, VolumeState, VolumeType};
use crate::device::DeviceEnumerator;

use super::VolumeManager;
use super::error::ManagerError;
use super::wait::{Observed, await_settled};

impl<A: VolumeApi, D: DeviceEnumerator> VolumeManager<A, D> {
    /// Creates a volume of at least `size_bytes` bytes in this instance's
    /// availability zone and returns its id once it is available.
    ///
    /// The provider allocates in whole GiB, so the size is rounded up. An
    /// empty `snapshot_id` creates a blank volume; an empty `volume_type`
    /// selects the provider default, and unrecognised types are rejected
    /// before any network call. When the volume settles in a state other
    /// than available the half-created volume is deleted on a best-effort
    /// basis and the create fails.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidVolumeType`] for unrecognised types,
    /// [`ManagerError::SizeTooLarge`] when the size does not fit the
    /// provider's unit, [`ManagerError::CreateFailed`] when the volume never
    /// became available, or the normalized provider error.
    pub async fn create_volume(
        &self,
        size_bytes: u64,
        snapshot_id: &str,
        volume_type: &str,
    ) -> Result<String, ManagerError> {
        let parsed_type = parse_volume_type(volume_type)?;
        let size_gib = gib_for_bytes(size_bytes)?;
        let request = CreateVolumeRequest {
            availability_zone: self.identity().availability_zone.clone(),
            size_gib,
            snapshot_id: (!snapshot_id.is_empty()).then(|| snapshot_id.to_owned()),
            volume_type: parsed_type,
        };

        let created = self.api.create_volume(&request).await?;
        let volume_id = created.id;

        if let Err(err) = self.await_volume_available(&volume_id).await {
            debug!(%volume_id, error = %err, "volume did not become available");
            if let Err(delete_err) = self.api.delete_volume(&volume_id).await {
                warn!(%volume_id, error = %delete_err, "failed deleting volume after unsuccessful create");
            }
            return Err(ManagerError::CreateFailed {
                size_bytes,
                snapshot_id: snapshot_id.to_owned(),
            });
        }

        Ok(volume_id)
    }

    async fn await_volume_available(&self, volume_id: &str) -> Result<(), ManagerError> {
        let settled = await_settled(
            self.policy,
            "volume-create",
            volume_id,
            &[VolumeState::Creating],
            || async move {
                let current = self.describe_volume(volume_id).await?;
                Ok(Observed::Present(current.state))
            },
        )
        .await?;

        match settled {
            Observed::Present(VolumeState::Available) => Ok(()),
            Observed::Present(state) => Err(ManagerError::UnexpectedState {
                entity: volume_id.to_owned(),
                state: state.as_str().to_owned(),
            }),
            Observed::Absent => Err(ManagerError::VolumeLookup {
                volume_id: volume_id.to_owned(),
            }),
        }
    }
}

fn parse_volume_type(raw: &str) -> Result<Option<VolumeType>, ManagerError> {
    if raw.is_empty() {
        return Ok(None);
    }
    let parsed = raw.parse::<VolumeType>()?;
    Ok(Some(parsed))
}

fn gib_for_bytes(size_bytes: u64) -> Result<i32, ManagerError> {
    let gib = size_bytes.div_ceil(GIB);
    i32::try_from(gib).map_err(|_| ManagerError::SizeTooLarge { size_bytes })
}
