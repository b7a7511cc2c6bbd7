//! Point-in-time snapshot creation.

use tracing::debug;

use crate::api::{SnapshotState, VolumeApi};
use crate::device::DeviceEnumerator;

use super::VolumeManager;
use super::error::ManagerError;
use super::wait::{Observed, await_settled};

impl<A: VolumeApi, D: DeviceEnumerator> VolumeManager<A, D> {
    /// Creates a snapshot of a volume and returns its id once the copy has
    /// completed.
    ///
    /// When the provider reports the snapshot completed in the create
    /// response no polling happens at all. While the snapshot is pending,
    /// the re-query is scoped to the owner returned by the create call and
    /// the reported copy progress is logged each iteration.
    ///
    /// # Errors
    ///
    /// Returns the normalized provider error when the create call or a poll
    /// fails.
    pub async fn create_snapshot(
        &self,
        volume_id: &str,
        description: &str,
    ) -> Result<String, ManagerError> {
        let created = self.api.create_snapshot(volume_id, description).await?;
        if created.state == SnapshotState::Completed {
            return Ok(created.id);
        }

        let snapshot_id = created.id;
        let owner_id = created.owner_id;
        await_settled(
            self.policy,
            "snapshot-create",
            &snapshot_id,
            &[SnapshotState::Pending],
            || {
                let id = snapshot_id.clone();
                let owner = owner_id.clone();
                async move {
                    let mut snapshots = self.api.snapshots_by_id(&id, owner.as_deref()).await?;
                    let Some(current) = snapshots.pop() else {
                        return Ok(Observed::Absent);
                    };
                    if let Some(progress) = &current.progress {
                        debug!(snapshot_id = %current.id, %progress, "snapshot progress");
                    }
                    Ok(Observed::Present(current.state))
                }
            },
        )
        .await?;

        Ok(snapshot_id)
    }
}
