//! Command-line interface definitions for the `ebsctl` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser, Subcommand};

/// Top-level CLI for the `ebsctl` binary.
#[derive(Debug, Parser)]
#[command(
    name = "ebsctl",
    about = "Manage EBS volumes attached to this EC2 instance",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create a volume from a size or snapshot.
    #[command(name = "create", about = "Create a volume and wait until it is available")]
    Create(CreateCommand),
    /// Delete a volume.
    #[command(name = "delete", about = "Delete a volume")]
    Delete(DeleteCommand),
    /// Show a single volume record.
    #[command(name = "describe", about = "Show a single volume record")]
    Describe(DescribeCommand),
    /// Attach a volume to this instance.
    #[command(
        name = "attach",
        about = "Attach a volume to this instance and print its device name"
    )]
    Attach(AttachCommand),
    /// Detach a volume from this instance.
    #[command(name = "detach", about = "Detach a volume from this instance")]
    Detach(DetachCommand),
    /// Manage point-in-time snapshots.
    #[command(subcommand, name = "snapshot", about = "Manage point-in-time snapshots")]
    Snapshot(SnapshotCommand),
}

/// Arguments for the `ebsctl create` subcommand.
#[derive(Debug, Args)]
pub(crate) struct CreateCommand {
    /// Volume size in bytes; rounded up to whole GiB for the provider.
    #[arg(long, value_name = "BYTES")]
    pub(crate) size: u64,
    /// Snapshot to populate the volume from.
    #[arg(long, value_name = "SNAPSHOT_ID", default_value = "")]
    pub(crate) snapshot: String,
    /// Volume type (gp2, io1, or standard); empty selects the provider
    /// default.
    #[arg(long = "type", value_name = "TYPE", default_value = "")]
    pub(crate) volume_type: String,
}

/// Arguments for the `ebsctl delete` subcommand.
#[derive(Debug, Args)]
pub(crate) struct DeleteCommand {
    /// Volume to delete; must not be in use.
    #[arg(value_name = "VOLUME_ID")]
    pub(crate) volume_id: String,
}

/// Arguments for the `ebsctl describe` subcommand.
#[derive(Debug, Args)]
pub(crate) struct DescribeCommand {
    /// Volume to describe.
    #[arg(value_name = "VOLUME_ID")]
    pub(crate) volume_id: String,
}

/// Arguments for the `ebsctl attach` subcommand.
#[derive(Debug, Args)]
pub(crate) struct AttachCommand {
    /// Volume to attach.
    #[arg(value_name = "VOLUME_ID")]
    pub(crate) volume_id: String,
    /// Raw size of the volume in bytes, used to identify the new local
    /// block device.
    #[arg(long, value_name = "BYTES")]
    pub(crate) size: u64,
}

/// Arguments for the `ebsctl detach` subcommand.
#[derive(Debug, Args)]
pub(crate) struct DetachCommand {
    /// Volume to detach.
    #[arg(value_name = "VOLUME_ID")]
    pub(crate) volume_id: String,
}

/// Subcommands for `ebsctl snapshot`.
#[derive(Debug, Subcommand)]
pub(crate) enum SnapshotCommand {
    /// Create a snapshot of a volume and wait for it to complete.
    #[command(name = "create", about = "Create a snapshot and wait for completion")]
    Create(SnapshotCreateCommand),
    /// Delete a snapshot.
    #[command(name = "delete", about = "Delete a snapshot")]
    Delete(SnapshotDeleteCommand),
}

/// Arguments for the `ebsctl snapshot create` subcommand.
#[derive(Debug, Args)]
pub(crate) struct SnapshotCreateCommand {
    /// Volume to snapshot.
    #[arg(value_name = "VOLUME_ID")]
    pub(crate) volume_id: String,
    /// Description stored with the snapshot.
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub(crate) description: String,
}

/// Arguments for the `ebsctl snapshot delete` subcommand.
#[derive(Debug, Args)]
pub(crate) struct SnapshotDeleteCommand {
    /// Snapshot to delete.
    #[arg(value_name = "SNAPSHOT_ID")]
    pub(crate) snapshot_id: String,
}
