//! Binary entry point for the ebsctl CLI.
//!
//! The binary is wiring only: load configuration, resolve the instance
//! identity, construct the EC2 client for the discovered region, and
//! dispatch to the volume manager. Results that callers script against
//! (volume ids, snapshot ids, device names) go to stdout; diagnostics go to
//! stderr via tracing.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use ebsctl::{
    EbsConfig, Ec2VolumeApi, ImdsClient, InstanceIdentity, ManagerError, SysBlock, Volume,
    VolumeManager,
};

mod cli;

use cli::{Cli, SnapshotCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("device enumeration error: {0}")]
    Device(String),
    #[error("{0}")]
    Manager(#[from] ManagerError),
    #[error("failed writing output: {0}")]
    Output(String),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config =
        EbsConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    config
        .validate()
        .map_err(|err| CliError::Config(err.to_string()))?;
    let manager = connect(&config).await?;

    match cli {
        Cli::Create(args) => {
            let volume_id = manager
                .create_volume(args.size, &args.snapshot, &args.volume_type)
                .await?;
            emit(&volume_id)
        }
        Cli::Delete(args) => {
            manager.delete_volume(&args.volume_id).await?;
            Ok(())
        }
        Cli::Describe(args) => {
            let volume = manager.describe_volume(&args.volume_id).await?;
            emit(&render_volume(&volume))
        }
        Cli::Attach(args) => {
            let device = manager.attach_volume(&args.volume_id, args.size).await?;
            emit(&device)
        }
        Cli::Detach(args) => {
            manager.detach_volume(&args.volume_id).await?;
            Ok(())
        }
        Cli::Snapshot(SnapshotCommand::Create(args)) => {
            let snapshot_id = manager
                .create_snapshot(&args.volume_id, &args.description)
                .await?;
            emit(&snapshot_id)
        }
        Cli::Snapshot(SnapshotCommand::Delete(args)) => {
            manager.delete_snapshot(&args.snapshot_id).await?;
            Ok(())
        }
    }
}

async fn connect(config: &EbsConfig) -> Result<VolumeManager<Ec2VolumeApi, SysBlock>, CliError> {
    let imds = ImdsClient::new(&config.metadata_endpoint);
    let identity = InstanceIdentity::resolve(&imds)
        .await
        .map_err(ManagerError::from)?;
    let region = config
        .region
        .clone()
        .unwrap_or_else(|| identity.region.clone());
    let api = Ec2VolumeApi::connect(region).await;
    let devices = SysBlock::open().map_err(|err| CliError::Device(err.to_string()))?;
    Ok(VolumeManager::new(api, devices, identity)
        .with_poll_policy(config.poll_interval(), config.wait_timeout()))
}

fn render_volume(volume: &Volume) -> String {
    let size = volume
        .size_gib
        .map_or_else(|| String::from("-"), |gib| format!("{gib}GiB"));
    let device = volume
        .attachments
        .first()
        .map_or("-", |attachment| attachment.device.as_str());
    format!(
        "{} {} {} {} {}",
        volume.id, volume.state, size, volume.availability_zone, device
    )
}

fn emit(line: &str) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    writeln!(stdout, "{line}").map_err(|err| CliError::Output(err.to_string()))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "ebsctl: {err}").ok();
}
