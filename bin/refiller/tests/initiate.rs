//! Integration tests for refill initiation.
//!
//! Run with:
//! ```bash
//! cargo test --package refiller --test initiate
//! ```


use monitor::{InitiateOutcome, Level, RefillError};
use setup::{
    FailingAfter, Harness, ScriptedTrigger, TriggerScript, OUTBOUND_ID, RESPONSE_ID, TX_HASH,
};
use std::sync::Arc;
use store::{Phase, PhaseStore, RefillRequest, RefillUpdate, Status};

#[tokio::test(start_paused = true)]
async fn test_initiate_submits_and_starts_polling() {
    let harness = Harness::new();
    let trigger = ScriptedTrigger::new(TriggerScript::Submits(TX_HASH));
    let initiator = harness.initiator(trigger.clone());

    let outcome = initiator.initiate().await.unwrap();
    assert_eq!(outcome, InitiateOutcome::Submitted(TX_HASH));
    assert_eq!(trigger.executions(), 1);

    let request = harness.monitor.snapshot();
    assert_eq!(request.status, Status::Running);
    assert_eq!(request.current_phase, Phase::RequestClicked);
    assert_eq!(request.initial_tx_hash, Some(TX_HASH));
    assert!(harness.monitor.is_polling());

    assert_eq!(
        harness.notifier.completed_phases(),
        vec![Phase::RequestClicked]
    );

    harness.monitor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_initiate_while_running_is_ignored() {
    let harness = Harness::new();
    let trigger = ScriptedTrigger::new(TriggerScript::Submits(TX_HASH));
    let initiator = harness.initiator(trigger.clone());

    let (first, second) = tokio::join!(initiator.initiate(), initiator.initiate());
    let mut outcomes = vec![first.unwrap(), second.unwrap()];
    outcomes.sort_by_key(|outcome| matches!(outcome, InitiateOutcome::AlreadyRunning));

    assert_eq!(
        outcomes,
        vec![
            InitiateOutcome::Submitted(TX_HASH),
            InitiateOutcome::AlreadyRunning
        ]
    );
    assert_eq!(trigger.executions(), 1);

    let before = harness.monitor.snapshot();
    assert_eq!(
        initiator.initiate().await.unwrap(),
        InitiateOutcome::AlreadyRunning
    );
    assert_eq!(harness.monitor.snapshot(), before);
    assert_eq!(trigger.executions(), 1);

    harness.monitor.stop();
}

#[tokio::test]
async fn test_user_rejection_fails_request() {
    let harness = Harness::new();
    let initiator = harness.initiator(ScriptedTrigger::new(TriggerScript::RejectedByUser));

    let error = initiator.initiate().await.unwrap_err();
    assert!(matches!(error, RefillError::UserDeclined));

    let request = harness.monitor.snapshot();
    assert_eq!(request.status, Status::Failed);
    assert!(request.error_message.unwrap().contains("canceled"));
    assert!(!harness.monitor.is_polling());

    let notification = harness.notifier.notifications().pop().unwrap();
    assert_eq!(notification.level, Level::Error);
}

#[tokio::test]
async fn test_submission_error_fails_request() {
    let harness = Harness::new();
    let initiator = harness.initiator(ScriptedTrigger::new(TriggerScript::Fails(
        "insufficient funds for gas".to_string(),
    )));

    let error = initiator.initiate().await.unwrap_err();
    assert!(matches!(error, RefillError::Submission(_)));

    let request = harness.monitor.snapshot();
    assert_eq!(request.status, Status::Failed);
    let message = request.error_message.unwrap();
    assert!(message.starts_with("Failed to submit refill request"));
    assert!(message.contains("insufficient funds"));
}

#[tokio::test]
async fn test_refill_already_in_progress_on_chain_fails_request() {
    let harness = Harness::new();
    let trigger = ScriptedTrigger::new(TriggerScript::NotReady);
    let initiator = harness.initiator(trigger.clone());

    assert!(initiator.initiate().await.is_err());
    assert_eq!(trigger.executions(), 0);
    assert_eq!(harness.monitor.snapshot().status, Status::Failed);
}

#[tokio::test]
async fn test_terminal_request_awaits_dismissal() {
    let harness = Harness::new();
    harness.store.set(RefillUpdate::failed("boom")).unwrap();

    let trigger = ScriptedTrigger::new(TriggerScript::Submits(TX_HASH));
    let initiator = harness.initiator(trigger.clone());

    assert_eq!(
        initiator.initiate().await.unwrap(),
        InitiateOutcome::AwaitingDismissal(Status::Failed)
    );
    assert_eq!(trigger.executions(), 0);
    assert_eq!(harness.monitor.snapshot().error_message.as_deref(), Some("boom"));

    harness.monitor.reset_to_idle().unwrap();
    assert_eq!(harness.monitor.snapshot(), RefillRequest::idle());
}

#[tokio::test(start_paused = true)]
async fn test_dismiss_stops_polling() {
    let harness = Harness::new();
    let initiator = harness.initiator(ScriptedTrigger::new(TriggerScript::Submits(TX_HASH)));

    initiator.initiate().await.unwrap();
    assert!(harness.monitor.is_polling());

    harness.monitor.reset_to_idle().unwrap();
    assert_eq!(harness.monitor.snapshot(), RefillRequest::idle());
    assert!(!harness.monitor.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_initiate_follows_refill_to_success() {
    let harness = Harness::new();
    let trigger = ScriptedTrigger::new(TriggerScript::Submits(TX_HASH))
        .mining_on(&harness.active, OUTBOUND_ID);
    let initiator = harness.initiator(trigger);

    assert_eq!(
        initiator.initiate().await.unwrap(),
        InitiateOutcome::Submitted(TX_HASH)
    );

    // each leg only shows up on chain once the previous one was observed
    let active = harness.active.clone();
    let helper = harness.helper.clone();
    let mut progress = Vec::new();
    let settled = refiller::wait_for_settlement(&harness.monitor, |request| {
        progress.push(request.progress);
        match request.current_phase {
            Phase::OutboundSent => helper.respond(RESPONSE_ID, OUTBOUND_ID),
            Phase::InboundSent => active.refill_reservoir(),
            _ => {}
        }
    })
    .await;

    assert_eq!(progress, vec![0, 10, 45, 70, 100]);
    assert_eq!(
        settled,
        RefillRequest {
            status: Status::Success,
            current_phase: Phase::InboundReceived,
            progress: 100,
            initial_tx_hash: Some(TX_HASH),
            outbound_message_id: Some(OUTBOUND_ID),
            response_message_id: Some(RESPONSE_ID),
            error_message: None,
        }
    );
    assert_eq!(harness.monitor.snapshot(), settled);

    assert_eq!(
        harness.notifier.completed_phases(),
        vec![
            Phase::RequestClicked,
            Phase::RequestConfirmed,
            Phase::OutboundSent,
            Phase::OutboundReceived,
            Phase::InboundSent,
            Phase::InboundReceived,
        ]
    );
    assert_eq!(
        harness.notifier.notifications().last().map(|n| n.level),
        Some(Level::Success)
    );
}

#[tokio::test]
async fn test_reverted_trigger_fails_request() {
    let harness = Harness::new();
    let trigger =
        ScriptedTrigger::new(TriggerScript::Reverts(TX_HASH)).mining_on(&harness.active, OUTBOUND_ID);
    let initiator = harness.initiator(trigger);

    let error = initiator.initiate().await.unwrap_err();
    assert!(matches!(error, RefillError::Submission(_)));

    let request = harness.monitor.snapshot();
    assert_eq!(request.status, Status::Failed);
    assert!(request.error_message.unwrap().contains("reverted"));
    assert!(!harness.monitor.is_polling());
}

#[tokio::test]
async fn test_unstored_tx_hash_is_reported() {
    // only the initial `running` write succeeds
    let store = Arc::new(PhaseStore::open(FailingAfter::new(1)).unwrap());
    let harness = Harness::with_store(store);
    let trigger = ScriptedTrigger::new(TriggerScript::Submits(TX_HASH));
    let initiator = harness.initiator(trigger.clone());

    let error = initiator.initiate().await.unwrap_err();
    assert!(matches!(error, RefillError::Store(_)));
    assert_eq!(trigger.executions(), 1);

    let request = harness.monitor.snapshot();
    assert_eq!(request.status, Status::Running);
    assert_eq!(request.initial_tx_hash, None);
    assert!(!harness.monitor.is_polling());
}
