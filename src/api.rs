//! Domain records and the remote volume/snapshot API seam.
//!
//! The manager talks to the provider exclusively through [`VolumeApi`], so
//! tests can script provider behaviour without network access and the EC2
//! client stays a thin marshalling layer.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use thiserror::Error;

/// Number of bytes in the provider's allocation unit (one GiB).
pub const GIB: u64 = 1_073_741_824;

/// Normalized provider failure carrying a single descriptive message.
///
/// The EC2 layer folds error code, message, HTTP status, and request id into
/// `message` before the error ever reaches a caller.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct ProviderError {
    /// Human-readable description of the provider failure.
    pub message: String,
}

impl ProviderError {
    /// Wraps a rendered provider failure message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Lifecycle states a volume moves through on the provider side.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VolumeState {
    /// The volume is being provisioned.
    Creating,
    /// The volume is provisioned and unattached.
    Available,
    /// The volume is attached to an instance.
    InUse,
    /// The volume is being deleted.
    Deleting,
    /// The volume no longer exists.
    Deleted,
    /// The provider reports the volume as failed.
    Error,
    /// A state this crate does not model explicitly.
    Other(String),
}

impl VolumeState {
    /// Returns the provider's wire spelling of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "creating",
            Self::Available => "available",
            Self::InUse => "in-use",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::Error => "error",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for VolumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// States of the binding between a volume and an instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttachmentState {
    /// The attachment is being established.
    Attaching,
    /// The volume is attached and visible to the instance.
    Attached,
    /// The attachment is being torn down.
    Detaching,
    /// The attachment has been removed.
    Detached,
    /// A state this crate does not model explicitly.
    Other(String),
}

impl AttachmentState {
    /// Returns the provider's wire spelling of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Attaching => "attaching",
            Self::Attached => "attached",
            Self::Detaching => "detaching",
            Self::Detached => "detached",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for AttachmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// States a snapshot moves through while the provider copies blocks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SnapshotState {
    /// The snapshot copy is still in progress.
    Pending,
    /// The snapshot is durable and usable as a volume source.
    Completed,
    /// A state this crate does not model explicitly.
    Other(String),
}

impl SnapshotState {
    /// Returns the provider's wire spelling of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Volume types accepted by the provider for new volumes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VolumeType {
    /// General purpose SSD.
    Gp2,
    /// Provisioned-IOPS SSD.
    Io1,
    /// Magnetic (previous generation).
    Standard,
}

impl VolumeType {
    /// Returns the provider's wire spelling of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gp2 => "gp2",
            Self::Io1 => "io1",
            Self::Standard => "standard",
        }
    }
}

impl fmt::Display for VolumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a volume type string is not one of the accepted values.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("invalid volume type for EBS: {requested}")]
pub struct InvalidVolumeType {
    /// The rejected volume type string.
    pub requested: String,
}

impl FromStr for VolumeType {
    type Err = InvalidVolumeType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "gp2" => Ok(Self::Gp2),
            "io1" => Ok(Self::Io1),
            "standard" => Ok(Self::Standard),
            other => Err(InvalidVolumeType {
                requested: other.to_owned(),
            }),
        }
    }
}

/// A provisioned block-storage volume as reported by the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Volume {
    /// Provider identifier for the volume.
    pub id: String,
    /// Provisioned size in GiB, when reported.
    pub size_gib: Option<i32>,
    /// Zone the volume was created in.
    pub availability_zone: String,
    /// Current lifecycle state.
    pub state: VolumeState,
    /// Live attachments; a volume has at most one.
    pub attachments: Vec<Attachment>,
}

/// The live binding of a volume to an instance at a device path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attachment {
    /// Volume side of the binding.
    pub volume_id: String,
    /// Instance side of the binding.
    pub instance_id: String,
    /// Device path the attachment was requested at.
    pub device: String,
    /// Current attachment state.
    pub state: AttachmentState,
}

/// A point-in-time copy of a volume.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    /// Provider identifier for the snapshot.
    pub id: String,
    /// Volume the snapshot was taken from.
    pub volume_id: String,
    /// Account owning the snapshot; used to scope re-queries while polling.
    pub owner_id: Option<String>,
    /// Copy progress as reported by the provider (for example `"73%"`).
    pub progress: Option<String>,
    /// Current snapshot state.
    pub state: SnapshotState,
}

/// Parameters for a volume creation call.
///
/// `size_gib` is the wire unit; byte sizes are rounded up before this record
/// is built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateVolumeRequest {
    /// Zone the volume must be created in; fixed to the managing instance's.
    pub availability_zone: String,
    /// Requested size in whole GiB.
    pub size_gib: i32,
    /// Snapshot to populate the volume from.
    pub snapshot_id: Option<String>,
    /// Volume type; `None` selects the provider default.
    pub volume_type: Option<VolumeType>,
}

/// Future returned by remote API operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Remote volume/snapshot API collaborator.
///
/// Every mutating call returns immediately with a transient-state record;
/// the manager's reconciliation loop polls the describe operations until the
/// provider-side state machine settles.
pub trait VolumeApi {
    /// Creates a volume and returns its initial (typically `creating`) record.
    fn create_volume<'a>(&'a self, request: &'a CreateVolumeRequest) -> ApiFuture<'a, Volume>;

    /// Deletes a volume.
    fn delete_volume<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, ()>;

    /// Describes volumes filtered by id.
    fn volumes_by_id<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, Vec<Volume>>;

    /// Describes volumes filtered by attachment to the given instance.
    fn volumes_attached_to<'a>(&'a self, instance_id: &'a str) -> ApiFuture<'a, Vec<Volume>>;

    /// Requests attachment of a volume at the given device path.
    fn attach_volume<'a>(
        &'a self,
        volume_id: &'a str,
        instance_id: &'a str,
        device: &'a str,
    ) -> ApiFuture<'a, Attachment>;

    /// Requests detachment of a volume from the given instance.
    fn detach_volume<'a>(&'a self, volume_id: &'a str, instance_id: &'a str) -> ApiFuture<'a, ()>;

    /// Creates a snapshot of a volume.
    fn create_snapshot<'a>(
        &'a self,
        volume_id: &'a str,
        description: &'a str,
    ) -> ApiFuture<'a, Snapshot>;

    /// Deletes a snapshot.
    fn delete_snapshot<'a>(&'a self, snapshot_id: &'a str) -> ApiFuture<'a, ()>;

    /// Describes snapshots filtered by id, optionally scoped to an owner.
    fn snapshots_by_id<'a>(
        &'a self,
        snapshot_id: &'a str,
        owner_id: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<Snapshot>>;
}
