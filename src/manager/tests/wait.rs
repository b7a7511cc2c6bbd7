//! Tests for the generic reconciliation loop.

use std::collections::VecDeque;
use std::time::Duration;

use crate::api::{ProviderError, VolumeState};

use super::super::error::ManagerError;
use super::super::wait::{Observed, PollPolicy, await_settled};

const FAST: PollPolicy = PollPolicy {
    interval: Duration::from_millis(1),
    deadline: None,
};

fn scripted(
    observations: Vec<Result<Observed<VolumeState>, ManagerError>>,
) -> VecDeque<Result<Observed<VolumeState>, ManagerError>> {
    observations.into()
}

#[tokio::test]
async fn settles_on_first_state_outside_the_transient_set() {
    let mut script = scripted(vec![Ok(Observed::Present(VolumeState::Available))]);
    let mut polls = 0_u32;

    let settled = await_settled(FAST, "volume-create", "vol-1", &[VolumeState::Creating], || {
        polls += 1;
        let observation = script.pop_front().unwrap_or_else(|| panic!("unscripted poll"));
        async move { observation }
    })
    .await
    .unwrap_or_else(|err| panic!("wait: {err}"));

    assert_eq!(settled, Observed::Present(VolumeState::Available));
    assert_eq!(polls, 1, "a settled first fetch must not sleep");
}

#[tokio::test]
async fn transient_states_are_polled_through() {
    let mut script = scripted(vec![
        Ok(Observed::Present(VolumeState::Creating)),
        Ok(Observed::Present(VolumeState::Creating)),
        Ok(Observed::Present(VolumeState::Available)),
    ]);
    let mut polls = 0_u32;

    let settled = await_settled(FAST, "volume-create", "vol-1", &[VolumeState::Creating], || {
        polls += 1;
        let observation = script.pop_front().unwrap_or_else(|| panic!("unscripted poll"));
        async move { observation }
    })
    .await
    .unwrap_or_else(|err| panic!("wait: {err}"));

    assert_eq!(settled, Observed::Present(VolumeState::Available));
    assert_eq!(polls, 3, "two transient fetches mean exactly two sleeps");
}

#[tokio::test]
async fn absence_settles_immediately() {
    let mut script = scripted(vec![Ok(Observed::Absent)]);
    let mut polls = 0_u32;

    let settled = await_settled(FAST, "volume-detach", "vol-1", &[VolumeState::Deleting], || {
        polls += 1;
        let observation = script.pop_front().unwrap_or_else(|| panic!("unscripted poll"));
        async move { observation }
    })
    .await
    .unwrap_or_else(|err| panic!("wait: {err}"));

    assert_eq!(settled, Observed::Absent);
    assert_eq!(polls, 1);
}

#[tokio::test]
async fn fetch_errors_propagate_without_further_polls() {
    let mut script = scripted(vec![Err(ManagerError::from(ProviderError::new(
        "EC2 error: RequestLimitExceeded",
    )))]);

    let result = await_settled(FAST, "volume-create", "vol-1", &[VolumeState::Creating], || {
        let observation = script.pop_front().unwrap_or_else(|| panic!("unscripted poll"));
        async move { observation }
    })
    .await;

    assert!(
        matches!(result, Err(ManagerError::Provider { .. })),
        "unexpected wait outcome: {result:?}"
    );
}

#[tokio::test]
async fn configured_deadline_turns_a_stall_into_a_timeout() {
    let bounded = PollPolicy {
        interval: Duration::from_millis(1),
        deadline: Some(Duration::ZERO),
    };

    let result = await_settled(
        bounded,
        "volume-create",
        "vol-1",
        &[VolumeState::Creating],
        || async move { Ok(Observed::Present(VolumeState::Creating)) },
    )
    .await;

    assert!(
        matches!(
            result,
            Err(ManagerError::Timeout { ref action, ref entity })
                if action == "volume-create" && entity == "vol-1"
        ),
        "unexpected wait outcome: {result:?}"
    );
}
