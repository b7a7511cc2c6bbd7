//! Lifecycle management for EBS volumes attached to a single EC2 instance.
//!
//! The crate discovers the identity of the instance it runs on from the
//! metadata service, issues volume and snapshot operations through the EC2
//! API, and reconciles each asynchronous provider transition by polling
//! until the remote state machine settles. Attachments are resolved to the
//! concrete block device the operating system assigned by diffing the local
//! device view around the attach call.

pub mod api;
pub mod config;
pub mod device;
pub mod ec2;
pub mod manager;
pub mod metadata;

pub use api::{
    ApiFuture, Attachment, AttachmentState, CreateVolumeRequest, GIB, InvalidVolumeType,
    ProviderError, Snapshot, SnapshotState, Volume, VolumeApi, VolumeState, VolumeType,
};
pub use config::{ConfigError, EbsConfig};
pub use device::{DeviceEnumerator, DeviceError, SECTOR_SIZE, SysBlock, find_attached_device};
pub use ec2::Ec2VolumeApi;
pub use manager::{DEFAULT_POLL_INTERVAL, ManagerError, VolumeManager};
pub use metadata::{ImdsClient, InstanceIdentity, MetadataError, MetadataSource};
