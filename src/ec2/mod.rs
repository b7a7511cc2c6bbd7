//! EC2 implementation of the remote volume/snapshot API.
//!
//! Every method is a straight marshalling call: build the request from the
//! domain record, send it, convert the response back, and normalize any
//! failure. State interpretation and waiting happen in the manager.

mod error;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::operation::attach_volume::AttachVolumeOutput;
use aws_sdk_ec2::operation::create_snapshot::CreateSnapshotOutput;
use aws_sdk_ec2::operation::create_volume::CreateVolumeOutput;
use aws_sdk_ec2::types::{
    Filter, Snapshot as SdkSnapshot, SnapshotState as SdkSnapshotState,
    Volume as SdkVolume, VolumeAttachment as SdkVolumeAttachment,
    VolumeAttachmentState as SdkAttachmentState, VolumeState as SdkVolumeState,
    VolumeType as SdkVolumeType,
};

use crate::api::{
    ApiFuture, Attachment, AttachmentState, CreateVolumeRequest, Snapshot, SnapshotState, Volume,
    VolumeApi, VolumeState, VolumeType,
};

const ATTACHMENT_INSTANCE_FILTER: &str = "attachment.instance-id";

/// [`VolumeApi`] implementation backed by the AWS EC2 client.
#[derive(Clone, Debug)]
pub struct Ec2VolumeApi {
    client: Client,
}

impl Ec2VolumeApi {
    /// Builds a client for the given region using the default credential
    /// chain (instance profile, environment, shared config).
    pub async fn connect(region: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.into()))
            .load()
            .await;
        Self {
            client: Client::new(&config),
        }
    }

    /// Wraps an already-configured EC2 client.
    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn volume_state(state: Option<&SdkVolumeState>) -> VolumeState {
    match state {
        Some(SdkVolumeState::Creating) => VolumeState::Creating,
        Some(SdkVolumeState::Available) => VolumeState::Available,
        Some(SdkVolumeState::InUse) => VolumeState::InUse,
        Some(SdkVolumeState::Deleting) => VolumeState::Deleting,
        Some(SdkVolumeState::Deleted) => VolumeState::Deleted,
        Some(SdkVolumeState::Error) => VolumeState::Error,
        Some(other) => VolumeState::Other(other.as_str().to_owned()),
        None => VolumeState::Other(String::from("unknown")),
    }
}

fn attachment_state(state: Option<&SdkAttachmentState>) -> AttachmentState {
    match state {
        Some(SdkAttachmentState::Attaching) => AttachmentState::Attaching,
        Some(SdkAttachmentState::Attached) => AttachmentState::Attached,
        Some(SdkAttachmentState::Detaching) => AttachmentState::Detaching,
        Some(SdkAttachmentState::Detached) => AttachmentState::Detached,
        Some(other) => AttachmentState::Other(other.as_str().to_owned()),
        None => AttachmentState::Other(String::from("unknown")),
    }
}

fn snapshot_state(state: Option<&SdkSnapshotState>) -> SnapshotState {
    match state {
        Some(SdkSnapshotState::Pending) => SnapshotState::Pending,
        Some(SdkSnapshotState::Completed) => SnapshotState::Completed,
        Some(other) => SnapshotState::Other(other.as_str().to_owned()),
        None => SnapshotState::Other(String::from("unknown")),
    }
}

fn attachment(value: &SdkVolumeAttachment) -> Attachment {
    Attachment {
        volume_id: value.volume_id().unwrap_or_default().to_owned(),
        instance_id: value.instance_id().unwrap_or_default().to_owned(),
        device: value.device().unwrap_or_default().to_owned(),
        state: attachment_state(value.state()),
    }
}

fn volume(value: &SdkVolume) -> Volume {
    Volume {
        id: value.volume_id().unwrap_or_default().to_owned(),
        size_gib: value.size(),
        availability_zone: value.availability_zone().unwrap_or_default().to_owned(),
        state: volume_state(value.state()),
        attachments: value.attachments().iter().map(attachment).collect(),
    }
}

fn created_volume(output: &CreateVolumeOutput) -> Volume {
    Volume {
        id: output.volume_id().unwrap_or_default().to_owned(),
        size_gib: output.size(),
        availability_zone: output.availability_zone().unwrap_or_default().to_owned(),
        state: volume_state(output.state()),
        attachments: output.attachments().iter().map(attachment).collect(),
    }
}

fn issued_attachment(output: &AttachVolumeOutput) -> Attachment {
    Attachment {
        volume_id: output.volume_id().unwrap_or_default().to_owned(),
        instance_id: output.instance_id().unwrap_or_default().to_owned(),
        device: output.device().unwrap_or_default().to_owned(),
        state: attachment_state(output.state()),
    }
}

fn snapshot(value: &SdkSnapshot) -> Snapshot {
    Snapshot {
        id: value.snapshot_id().unwrap_or_default().to_owned(),
        volume_id: value.volume_id().unwrap_or_default().to_owned(),
        owner_id: value.owner_id().map(str::to_owned),
        progress: value.progress().map(str::to_owned),
        state: snapshot_state(value.state()),
    }
}

fn created_snapshot(output: &CreateSnapshotOutput) -> Snapshot {
    Snapshot {
        id: output.snapshot_id().unwrap_or_default().to_owned(),
        volume_id: output.volume_id().unwrap_or_default().to_owned(),
        owner_id: output.owner_id().map(str::to_owned),
        progress: output.progress().map(str::to_owned),
        state: snapshot_state(output.state()),
    }
}

const fn sdk_volume_type(value: VolumeType) -> SdkVolumeType {
    match value {
        VolumeType::Gp2 => SdkVolumeType::Gp2,
        VolumeType::Io1 => SdkVolumeType::Io1,
        VolumeType::Standard => SdkVolumeType::Standard,
    }
}

impl VolumeApi for Ec2VolumeApi {
    fn create_volume<'a>(&'a self, request: &'a CreateVolumeRequest) -> ApiFuture<'a, Volume> {
        Box::pin(async move {
            let output = self
                .client
                .create_volume()
                .availability_zone(&request.availability_zone)
                .size(request.size_gib)
                .set_snapshot_id(request.snapshot_id.clone())
                .set_volume_type(request.volume_type.map(sdk_volume_type))
                .send()
                .await
                .map_err(error::normalize)?;
            Ok(created_volume(&output))
        })
    }

    fn delete_volume<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .delete_volume()
                .volume_id(volume_id)
                .send()
                .await
                .map_err(error::normalize)?;
            Ok(())
        })
    }

    fn volumes_by_id<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, Vec<Volume>> {
        Box::pin(async move {
            let output = self
                .client
                .describe_volumes()
                .volume_ids(volume_id)
                .send()
                .await
                .map_err(error::normalize)?;
            Ok(output.volumes().iter().map(volume).collect())
        })
    }

    fn volumes_attached_to<'a>(&'a self, instance_id: &'a str) -> ApiFuture<'a, Vec<Volume>> {
        Box::pin(async move {
            let output = self
                .client
                .describe_volumes()
                .filters(
                    Filter::builder()
                        .name(ATTACHMENT_INSTANCE_FILTER)
                        .values(instance_id)
                        .build(),
                )
                .send()
                .await
                .map_err(error::normalize)?;
            Ok(output.volumes().iter().map(volume).collect())
        })
    }

    fn attach_volume<'a>(
        &'a self,
        volume_id: &'a str,
        instance_id: &'a str,
        device: &'a str,
    ) -> ApiFuture<'a, Attachment> {
        Box::pin(async move {
            let output = self
                .client
                .attach_volume()
                .volume_id(volume_id)
                .instance_id(instance_id)
                .device(device)
                .send()
                .await
                .map_err(error::normalize)?;
            Ok(issued_attachment(&output))
        })
    }

    fn detach_volume<'a>(&'a self, volume_id: &'a str, instance_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .detach_volume()
                .volume_id(volume_id)
                .instance_id(instance_id)
                .send()
                .await
                .map_err(error::normalize)?;
            Ok(())
        })
    }

    fn create_snapshot<'a>(
        &'a self,
        volume_id: &'a str,
        description: &'a str,
    ) -> ApiFuture<'a, Snapshot> {
        Box::pin(async move {
            let output = self
                .client
                .create_snapshot()
                .volume_id(volume_id)
                .description(description)
                .send()
                .await
                .map_err(error::normalize)?;
            Ok(created_snapshot(&output))
        })
    }

    fn delete_snapshot<'a>(&'a self, snapshot_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .delete_snapshot()
                .snapshot_id(snapshot_id)
                .send()
                .await
                .map_err(error::normalize)?;
            Ok(())
        })
    }

    fn snapshots_by_id<'a>(
        &'a self,
        snapshot_id: &'a str,
        owner_id: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<Snapshot>> {
        Box::pin(async move {
            let output = self
                .client
                .describe_snapshots()
                .snapshot_ids(snapshot_id)
                .set_owner_ids(owner_id.map(|owner| vec![owner.to_owned()]))
                .send()
                .await
                .map_err(error::normalize)?;
            Ok(output.snapshots().iter().map(snapshot).collect())
        })
    }
}
