//! Unit tests for the volume manager.

mod wait;

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::api::{
    ApiFuture, Attachment, AttachmentState, CreateVolumeRequest, ProviderError, Snapshot,
    SnapshotState, Volume, VolumeApi, VolumeState,
};
use crate::device::{DeviceEnumerator, DeviceError};
use crate::metadata::InstanceIdentity;

use super::VolumeManager;

/// Remote API double driven by per-operation scripts.
#[derive(Default)]
struct FakeApi {
    calls: Mutex<Vec<String>>,
    create_volume_requests: Mutex<Vec<CreateVolumeRequest>>,
    create_volume_results: Mutex<VecDeque<Result<Volume, ProviderError>>>,
    delete_volume_results: Mutex<VecDeque<Result<(), ProviderError>>>,
    volumes_by_id_results: Mutex<VecDeque<Result<Vec<Volume>, ProviderError>>>,
    volumes_attached_results: Mutex<VecDeque<Result<Vec<Volume>, ProviderError>>>,
    attach_results: Mutex<VecDeque<Result<Attachment, ProviderError>>>,
    detach_results: Mutex<VecDeque<Result<(), ProviderError>>>,
    create_snapshot_results: Mutex<VecDeque<Result<Snapshot, ProviderError>>>,
    delete_snapshot_results: Mutex<VecDeque<Result<(), ProviderError>>>,
    snapshots_by_id_results: Mutex<VecDeque<Result<Vec<Snapshot>, ProviderError>>>,
}

impl FakeApi {
    fn record(&self, call: impl Into<String>) {
        self.calls
            .lock()
            .unwrap_or_else(|err| panic!("call log poisoned: {err}"))
            .push(call.into());
    }

    fn recorded_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|err| panic!("call log poisoned: {err}"))
            .clone()
    }
}

fn push<T>(queue: &Mutex<VecDeque<T>>, value: T) {
    queue
        .lock()
        .unwrap_or_else(|err| panic!("script lock poisoned: {err}"))
        .push_back(value);
}

fn next<T>(queue: &Mutex<VecDeque<T>>, operation: &str) -> T {
    queue
        .lock()
        .unwrap_or_else(|err| panic!("script lock poisoned: {err}"))
        .pop_front()
        .unwrap_or_else(|| panic!("unscripted {operation} call"))
}

impl VolumeApi for FakeApi {
    fn create_volume<'a>(&'a self, request: &'a CreateVolumeRequest) -> ApiFuture<'a, Volume> {
        self.record("create-volume");
        self.create_volume_requests
            .lock()
            .unwrap_or_else(|err| panic!("request log poisoned: {err}"))
            .push(request.clone());
        let result = next(&self.create_volume_results, "create-volume");
        Box::pin(async move { result })
    }

    fn delete_volume<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, ()> {
        self.record(format!("delete-volume:{volume_id}"));
        let result = next(&self.delete_volume_results, "delete-volume");
        Box::pin(async move { result })
    }

    fn volumes_by_id<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, Vec<Volume>> {
        self.record(format!("describe-volumes:{volume_id}"));
        let result = next(&self.volumes_by_id_results, "describe-volumes");
        Box::pin(async move { result })
    }

    fn volumes_attached_to<'a>(&'a self, instance_id: &'a str) -> ApiFuture<'a, Vec<Volume>> {
        self.record(format!("describe-attached:{instance_id}"));
        let result = next(&self.volumes_attached_results, "describe-attached");
        Box::pin(async move { result })
    }

    fn attach_volume<'a>(
        &'a self,
        volume_id: &'a str,
        instance_id: &'a str,
        device: &'a str,
    ) -> ApiFuture<'a, Attachment> {
        self.record(format!("attach-volume:{volume_id}:{instance_id}:{device}"));
        let result = next(&self.attach_results, "attach-volume");
        Box::pin(async move { result })
    }

    fn detach_volume<'a>(&'a self, volume_id: &'a str, instance_id: &'a str) -> ApiFuture<'a, ()> {
        self.record(format!("detach-volume:{volume_id}:{instance_id}"));
        let result = next(&self.detach_results, "detach-volume");
        Box::pin(async move { result })
    }

    fn create_snapshot<'a>(
        &'a self,
        volume_id: &'a str,
        description: &'a str,
    ) -> ApiFuture<'a, Snapshot> {
        self.record(format!("create-snapshot:{volume_id}:{description}"));
        let result = next(&self.create_snapshot_results, "create-snapshot");
        Box::pin(async move { result })
    }

    fn delete_snapshot<'a>(&'a self, snapshot_id: &'a str) -> ApiFuture<'a, ()> {
        self.record(format!("delete-snapshot:{snapshot_id}"));
        let result = next(&self.delete_snapshot_results, "delete-snapshot");
        Box::pin(async move { result })
    }

    fn snapshots_by_id<'a>(
        &'a self,
        snapshot_id: &'a str,
        owner_id: Option<&'a str>,
    ) -> ApiFuture<'a, Vec<Snapshot>> {
        self.record(format!(
            "describe-snapshots:{snapshot_id}:owner={}",
            owner_id.unwrap_or("-")
        ));
        let result = next(&self.snapshots_by_id_results, "describe-snapshots");
        Box::pin(async move { result })
    }
}

/// Local device view double replaying scripted listings.
#[derive(Default)]
struct FakeDevices {
    views: Mutex<VecDeque<BTreeSet<String>>>,
    sectors: HashMap<String, u64>,
}

impl FakeDevices {
    fn scripted(views: Vec<BTreeSet<String>>, sectors: &[(&str, u64)]) -> Self {
        Self {
            views: Mutex::new(views.into()),
            sectors: sectors
                .iter()
                .map(|(name, size)| ((*name).to_owned(), *size))
                .collect(),
        }
    }
}

impl DeviceEnumerator for FakeDevices {
    fn list(&self) -> Result<BTreeSet<String>, DeviceError> {
        Ok(next(&self.views, "device listing"))
    }

    fn size_in_sectors(&self, name: &str) -> Result<u64, DeviceError> {
        let Some(sectors) = self.sectors.get(name).copied() else {
            panic!("unscripted device size for {name}");
        };
        Ok(sectors)
    }
}

fn device_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| (*name).to_owned()).collect()
}

fn identity() -> InstanceIdentity {
    InstanceIdentity {
        instance_id: String::from("i-0abc"),
        region: String::from("us-east-1"),
        availability_zone: String::from("us-east-1a"),
    }
}

fn volume(id: &str, state: VolumeState) -> Volume {
    Volume {
        id: id.to_owned(),
        size_gib: Some(4),
        availability_zone: String::from("us-east-1a"),
        state,
        attachments: Vec::new(),
    }
}

fn attached_volume(id: &str, device: &str, state: AttachmentState) -> Volume {
    Volume {
        attachments: vec![Attachment {
            volume_id: id.to_owned(),
            instance_id: String::from("i-0abc"),
            device: device.to_owned(),
            state,
        }],
        state: VolumeState::InUse,
        ..volume(id, VolumeState::InUse)
    }
}

fn pending_snapshot(id: &str, progress: &str) -> Snapshot {
    Snapshot {
        id: id.to_owned(),
        volume_id: String::from("vol-1"),
        owner_id: Some(String::from("123456789012")),
        progress: Some(progress.to_owned()),
        state: SnapshotState::Pending,
    }
}

fn completed_snapshot(id: &str) -> Snapshot {
    Snapshot {
        state: SnapshotState::Completed,
        progress: Some(String::from("100%")),
        ..pending_snapshot(id, "100%")
    }
}

fn manager(api: FakeApi, devices: FakeDevices) -> VolumeManager<FakeApi, FakeDevices> {
    VolumeManager::new(api, devices, identity())
        .with_poll_policy(Duration::from_millis(1), None)
}
