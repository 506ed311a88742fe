//! Integration tests for the convergence controller.
//!
//! All scenarios run against the scripted target. Tests that exercise real
//! backoff delays or timeouts use paused tokio time so that sleeps complete
//! instantly while durations stay observable.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::{controller, immediate_controller, kinds, CallLog, FailingRecorder};
use migrate_converge::adapters::audit::InMemoryAuditRecorder;
use migrate_converge::adapters::target::{ScriptStep, ScriptedTargetAdapter};
use migrate_converge::domain::errors::{AdapterError, AdapterResult};
use migrate_converge::domain::models::{
    BackoffConfig, ControllerConfig, ObservedState, OutcomeKind, PendingItem, RawSignal,
    StopReason,
};
use migrate_converge::domain::ports::TargetAdapter;

use OutcomeKind::{Indeterminate, RateLimited, Success, TerminalFailure, TransientFailure};

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_already_converged_target_is_untouched() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(0));
    let recorder = InMemoryAuditRecorder::new();

    let result = immediate_controller(adapter.clone(), &recorder)
        .run(CancellationToken::new())
        .await;

    assert!(result.converged);
    assert_eq!(result.stop_reason, StopReason::Converged);
    assert_eq!(result.attempts_used, 0);
    assert_eq!(result.total_applied, 0);
    assert_eq!(result.final_pending_count, Some(0));
    assert_eq!(adapter.apply_calls(), 0);
    assert!(recorder.records().await.is_empty());
}

#[tokio::test]
async fn test_budget_is_consumed_once_per_attempt() {
    let adapter = Arc::new(
        ScriptedTargetAdapter::new(1).with_outcomes([TransientFailure; 10]),
    );
    let recorder = InMemoryAuditRecorder::new();
    let config = ControllerConfig {
        max_attempts: 4,
        ..ControllerConfig::default()
    };

    let result = controller(
        adapter.clone(),
        Arc::new(recorder.clone()),
        config,
        BackoffConfig::immediate(),
    )
    .run(CancellationToken::new())
    .await;

    assert!(!result.converged);
    assert_eq!(result.stop_reason, StopReason::AttemptBudgetExhausted);
    assert_eq!(result.attempts_used, 4);
    assert_eq!(result.final_pending_count, Some(1));
    assert_eq!(adapter.apply_calls(), 4);
    assert_eq!(recorder.records().await.len(), 4);
}

#[tokio::test]
async fn test_rate_limits_do_not_consume_budget() {
    let adapter = Arc::new(
        ScriptedTargetAdapter::new(1).with_outcomes([RateLimited, RateLimited, RateLimited, Success]),
    );
    let recorder = InMemoryAuditRecorder::new();

    let result = immediate_controller(adapter, &recorder)
        .run(CancellationToken::new())
        .await;

    assert!(result.converged);
    assert_eq!(result.attempts_used, 1);
    assert_eq!(result.total_applied, 1);
    assert_eq!(
        kinds(&recorder.records().await),
        vec![RateLimited, RateLimited, RateLimited, Success]
    );
}

#[tokio::test]
async fn test_rate_limits_at_cap_still_converge() {
    let config = ControllerConfig {
        max_consecutive_rate_limits: 3,
        max_attempts: 1,
        ..ControllerConfig::default()
    };
    let adapter = Arc::new(
        ScriptedTargetAdapter::new(1).with_outcomes([RateLimited, RateLimited, RateLimited, Success]),
    );
    let recorder = InMemoryAuditRecorder::new();

    let result = controller(
        adapter,
        Arc::new(recorder.clone()),
        config,
        BackoffConfig::immediate(),
    )
    .run(CancellationToken::new())
    .await;

    assert!(result.converged);
    assert_eq!(result.attempts_used, 1);
}

#[tokio::test]
async fn test_terminal_failure_short_circuits() {
    let adapter = Arc::new(
        ScriptedTargetAdapter::new(3).with_outcomes([Success, TerminalFailure, Success]),
    );
    let recorder = InMemoryAuditRecorder::new();

    let result = immediate_controller(adapter.clone(), &recorder)
        .run(CancellationToken::new())
        .await;

    assert!(!result.converged);
    assert_eq!(result.stop_reason, StopReason::TerminalFailure);
    assert_eq!(result.attempts_used, 2);
    assert_eq!(result.total_applied, 1);
    assert_eq!(result.final_pending_count, Some(2));
    assert_eq!(adapter.apply_calls(), 2);
    assert!(result
        .detail
        .as_deref()
        .is_some_and(|d| d.contains("does not exist")));

    let records = recorder.records().await;
    assert_eq!(kinds(&records), vec![Success, TerminalFailure]);
    // Best-effort observation after the terminal outcome.
    assert_eq!(records[1].pending_after, Some(2));
}

#[tokio::test]
async fn test_rate_limit_cap_exceeded_is_terminal() {
    let config = ControllerConfig {
        max_consecutive_rate_limits: 2,
        ..ControllerConfig::default()
    };
    let adapter = Arc::new(ScriptedTargetAdapter::new(1).with_outcomes([RateLimited; 5]));
    let recorder = InMemoryAuditRecorder::new();

    let result = controller(
        adapter.clone(),
        Arc::new(recorder.clone()),
        config,
        BackoffConfig::immediate(),
    )
    .run(CancellationToken::new())
    .await;

    assert_eq!(result.stop_reason, StopReason::TerminalFailure);
    assert_eq!(result.attempts_used, 0);
    assert_eq!(adapter.apply_calls(), 3);
    assert_eq!(recorder.records().await.len(), 3);
    assert!(result
        .detail
        .as_deref()
        .is_some_and(|d| d.contains("rate limited 3 consecutive times")));
}

#[tokio::test]
async fn test_other_outcome_resets_rate_limit_streak() {
    let config = ControllerConfig {
        max_consecutive_rate_limits: 2,
        ..ControllerConfig::default()
    };
    let adapter = Arc::new(ScriptedTargetAdapter::new(1).with_outcomes([
        RateLimited,
        RateLimited,
        TransientFailure,
        RateLimited,
        RateLimited,
        Success,
    ]));
    let recorder = InMemoryAuditRecorder::new();

    let result = controller(
        adapter,
        Arc::new(recorder.clone()),
        config,
        BackoffConfig::immediate(),
    )
    .run(CancellationToken::new())
    .await;

    assert!(result.converged);
    assert_eq!(result.attempts_used, 2);
    assert_eq!(recorder.records().await.len(), 6);
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_three_pending_three_successes() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(3).with_outcomes([Success; 3]));
    let recorder = InMemoryAuditRecorder::new();

    let result = immediate_controller(adapter.clone(), &recorder)
        .run(CancellationToken::new())
        .await;

    assert!(result.converged);
    assert_eq!(result.total_applied, 3);
    assert_eq!(result.attempts_used, 3);
    assert_eq!(
        adapter.applied_labels().await,
        vec!["0001_migration", "0002_migration", "0003_migration"]
    );
}

#[tokio::test]
async fn test_transient_failures_then_successes() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(2).with_outcomes([
        TransientFailure,
        TransientFailure,
        Success,
        Success,
    ]));
    let recorder = InMemoryAuditRecorder::new();

    let result = immediate_controller(adapter, &recorder)
        .run(CancellationToken::new())
        .await;

    assert!(result.converged);
    assert_eq!(result.attempts_used, 4);
    assert_eq!(result.total_applied, 2);

    let records = recorder.records().await;
    let pending: Vec<(u64, Option<u64>)> = records
        .iter()
        .map(|r| (r.pending_before, r.pending_after))
        .collect();
    assert_eq!(
        pending,
        vec![(2, Some(2)), (2, Some(2)), (2, Some(1)), (1, Some(0))]
    );
}

#[tokio::test]
async fn test_success_without_progress_is_not_counted_as_applied() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(1).with_script([ScriptStep::respond(
        RawSignal::text("Migration applied successfully"),
        false,
    )]));
    let recorder = InMemoryAuditRecorder::new();

    let result = immediate_controller(adapter, &recorder)
        .run(CancellationToken::new())
        .await;

    assert!(result.converged);
    assert_eq!(result.attempts_used, 2);
    assert_eq!(result.total_applied, 1);
    assert_eq!(result.unconfirmed_applies, 1);

    let records = recorder.records().await;
    assert_eq!(kinds(&records), vec![Success, Success]);
    assert_eq!(records[0].pending_after, Some(1));
}

#[tokio::test]
async fn test_indeterminate_is_retried() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(1).with_script([
        ScriptStep::outcome(Indeterminate),
        ScriptStep::fail("connection closed before message completed"),
    ]));
    let recorder = InMemoryAuditRecorder::new();

    let result = immediate_controller(adapter, &recorder)
        .run(CancellationToken::new())
        .await;

    assert!(result.converged);
    assert_eq!(result.attempts_used, 3);
    let records = recorder.records().await;
    assert_eq!(kinds(&records), vec![Indeterminate, Indeterminate, Success]);
    assert!(records[1].outcome.message.contains("connection closed"));
}

// ---------------------------------------------------------------------------
// Adapter faults
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_initial_observe_failure_is_adapter_unavailable() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(2).with_observe_failure_at(0));
    let recorder = InMemoryAuditRecorder::new();

    let result = immediate_controller(adapter.clone(), &recorder)
        .run(CancellationToken::new())
        .await;

    assert_eq!(result.stop_reason, StopReason::AdapterUnavailable);
    assert_eq!(result.attempts_used, 0);
    assert_eq!(result.final_pending_count, None);
    assert!(!result.converged);
    assert_eq!(adapter.apply_calls(), 0);
}

#[tokio::test]
async fn test_post_attempt_observe_failure_keeps_record() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(2).with_observe_failure_at(1));
    let recorder = InMemoryAuditRecorder::new();

    let result = immediate_controller(adapter, &recorder)
        .run(CancellationToken::new())
        .await;

    assert_eq!(result.stop_reason, StopReason::AdapterUnavailable);
    assert_eq!(result.attempts_used, 1);
    assert_eq!(result.final_pending_count, Some(2));

    let records = recorder.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind(), Success);
    assert_eq!(records[0].pending_after, None);
}

#[tokio::test]
async fn test_unselectable_pending_items_are_terminal() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(4).without_selectable_items());
    let recorder = InMemoryAuditRecorder::new();

    let result = immediate_controller(adapter.clone(), &recorder)
        .run(CancellationToken::new())
        .await;

    assert_eq!(result.stop_reason, StopReason::TerminalFailure);
    assert_eq!(result.final_pending_count, Some(4));
    assert_eq!(adapter.apply_calls(), 0);
    assert!(recorder.records().await.is_empty());
}

#[tokio::test]
async fn test_skipped_initial_check_still_converges_on_empty_target() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(0));
    let recorder = InMemoryAuditRecorder::new();
    let config = ControllerConfig {
        initial_pending_check: false,
        ..ControllerConfig::default()
    };

    let result = controller(
        adapter.clone(),
        Arc::new(recorder.clone()),
        config,
        BackoffConfig::immediate(),
    )
    .run(CancellationToken::new())
    .await;

    assert!(result.converged);
    assert_eq!(result.stop_reason, StopReason::Converged);
    assert_eq!(adapter.apply_calls(), 0);
}

#[tokio::test]
async fn test_unselectable_empty_target_converges() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(0).without_selectable_items());
    let recorder = InMemoryAuditRecorder::new();
    let config = ControllerConfig {
        initial_pending_check: false,
        ..ControllerConfig::default()
    };

    let result = controller(
        adapter.clone(),
        Arc::new(recorder.clone()),
        config,
        BackoffConfig::immediate(),
    )
    .run(CancellationToken::new())
    .await;

    assert_eq!(result.stop_reason, StopReason::Converged);
    assert_eq!(result.final_pending_count, Some(0));
    assert_eq!(result.detail, None);
    assert_eq!(adapter.select_calls(), 1);
    assert_eq!(adapter.apply_calls(), 0);
    assert!(recorder.records().await.is_empty());
}

#[tokio::test]
async fn test_select_failure_is_indeterminate() {
    let adapter = Arc::new(
        ScriptedTargetAdapter::new(1).with_select_script([ScriptStep::fail("dns lookup failed")]),
    );
    let recorder = InMemoryAuditRecorder::new();

    let result = immediate_controller(adapter.clone(), &recorder)
        .run(CancellationToken::new())
        .await;

    assert!(result.converged);
    assert_eq!(result.attempts_used, 2);
    assert_eq!(result.total_applied, 1);
    assert_eq!(adapter.select_calls(), 2);
    assert_eq!(adapter.apply_calls(), 1);

    let records = recorder.records().await;
    assert_eq!(kinds(&records), vec![Indeterminate, Success]);
    assert_eq!(records[0].item_label, "");
    assert_eq!(records[0].pending_after, Some(1));
    assert!(records[0].outcome.message.contains("dns lookup failed"));
    assert_eq!(records[1].item_label, "0001_migration");
}

#[tokio::test]
async fn test_select_failures_consume_budget() {
    let adapter = Arc::new(
        ScriptedTargetAdapter::new(1)
            .with_select_script([ScriptStep::fail("reset"), ScriptStep::fail("reset")]),
    );
    let recorder = InMemoryAuditRecorder::new();
    let config = ControllerConfig {
        max_attempts: 2,
        ..ControllerConfig::default()
    };

    let result = controller(
        adapter.clone(),
        Arc::new(recorder.clone()),
        config,
        BackoffConfig::immediate(),
    )
    .run(CancellationToken::new())
    .await;

    assert_eq!(result.stop_reason, StopReason::AttemptBudgetExhausted);
    assert_eq!(result.attempts_used, 2);
    assert_eq!(result.final_pending_count, Some(1));
    assert_eq!(adapter.apply_calls(), 0);
    assert_eq!(
        kinds(&recorder.records().await),
        vec![Indeterminate, Indeterminate]
    );
}

/// Target whose status endpoint never answers.
struct SilentTarget;

#[async_trait]
impl TargetAdapter for SilentTarget {
    fn name(&self) -> &'static str {
        "silent"
    }

    async fn observe(&self) -> AdapterResult<ObservedState> {
        std::future::pending().await
    }

    async fn select_next(&self) -> AdapterResult<PendingItem> {
        Err(AdapterError::NoSelectableItem("silent".to_string()))
    }

    async fn apply_next(&self, _item: &PendingItem) -> AdapterResult<RawSignal> {
        Ok(RawSignal::None)
    }
}

#[tokio::test(start_paused = true)]
async fn test_observe_timeout_is_adapter_unavailable() {
    let config = ControllerConfig {
        per_attempt_timeout_ms: 2_000,
        ..ControllerConfig::default()
    };
    let recorder = InMemoryAuditRecorder::new();

    let result = controller(
        Arc::new(SilentTarget),
        Arc::new(recorder.clone()),
        config,
        BackoffConfig::default(),
    )
    .run(CancellationToken::new())
    .await;

    assert_eq!(result.stop_reason, StopReason::AdapterUnavailable);
    assert!(result
        .detail
        .as_deref()
        .is_some_and(|d| d.contains("observe timed out after 2000ms")));
}

#[tokio::test(start_paused = true)]
async fn test_apply_timeout_is_indeterminate() {
    let config = ControllerConfig {
        per_attempt_timeout_ms: 1_000,
        ..ControllerConfig::default()
    };
    let adapter = Arc::new(ScriptedTargetAdapter::new(1).with_script([ScriptStep::Hang]));
    let recorder = InMemoryAuditRecorder::new();

    let result = controller(
        adapter,
        Arc::new(recorder.clone()),
        config,
        BackoffConfig::default(),
    )
    .run(CancellationToken::new())
    .await;

    assert!(result.converged);
    let records = recorder.records().await;
    assert_eq!(kinds(&records), vec![Indeterminate, Success]);
    assert!(records[0].outcome.message.contains("apply timed out after 1000ms"));
}

#[tokio::test(start_paused = true)]
async fn test_select_timeout_is_indeterminate() {
    let config = ControllerConfig {
        per_attempt_timeout_ms: 1_000,
        ..ControllerConfig::default()
    };
    let adapter =
        Arc::new(ScriptedTargetAdapter::new(1).with_select_script([ScriptStep::Hang]));
    let recorder = InMemoryAuditRecorder::new();

    let result = controller(
        adapter.clone(),
        Arc::new(recorder.clone()),
        config,
        BackoffConfig::default(),
    )
    .run(CancellationToken::new())
    .await;

    assert!(result.converged);
    assert_eq!(result.attempts_used, 2);
    assert_eq!(adapter.apply_calls(), 1);

    let records = recorder.records().await;
    assert_eq!(kinds(&records), vec![Indeterminate, Success]);
    assert_eq!(records[0].item_label, "");
    assert!(records[0].outcome.message.contains("select timed out after 1000ms"));
}

// ---------------------------------------------------------------------------
// Backoff and cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_waits_follow_backoff_policy() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(1).with_outcomes([
        TransientFailure,
        RateLimited,
        TransientFailure,
        Success,
    ]));
    let recorder = InMemoryAuditRecorder::new();

    let result = controller(
        adapter,
        Arc::new(recorder.clone()),
        ControllerConfig::default(),
        BackoffConfig::default(),
    )
    .run(CancellationToken::new())
    .await;

    assert!(result.converged);
    let waited: Vec<u64> = recorder
        .records()
        .await
        .iter()
        .map(|r| r.waited_ms)
        .collect();
    // Linear: 5s after attempt 1, fixed 180s for the rate limit, 10s after attempt 2,
    // then the success pause. Timer granularity is 1ms.
    let expected = [5_000, 180_000, 10_000, 2_000];
    assert_eq!(waited.len(), expected.len());
    for (actual, expected) in waited.iter().zip(expected) {
        assert!(
            (expected..=expected + 2).contains(actual),
            "waited {actual}ms, expected about {expected}ms"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_stops_promptly() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(2).with_outcomes([RateLimited; 5]));
    let recorder = InMemoryAuditRecorder::new();
    let cancel = CancellationToken::new();

    let controller = controller(
        adapter.clone(),
        Arc::new(recorder.clone()),
        ControllerConfig::default(),
        BackoffConfig::default(),
    );

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        trigger.cancel();
    });

    let result = controller.run(cancel).await;

    assert_eq!(result.stop_reason, StopReason::Cancelled);
    assert_eq!(adapter.apply_calls(), 1);
    assert_eq!(result.final_pending_count, Some(2));

    let records = recorder.records().await;
    assert_eq!(records.len(), 1);
    assert!(records[0].waited_ms < 180_000);
    assert_eq!(records[0].pending_after, Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_success_pause_reports_post_apply_count() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(2));
    let recorder = InMemoryAuditRecorder::new();
    let cancel = CancellationToken::new();
    let backoff = BackoffConfig {
        success_pause_ms: 60_000,
        ..BackoffConfig::default()
    };

    let controller = controller(
        adapter.clone(),
        Arc::new(recorder.clone()),
        ControllerConfig::default(),
        backoff,
    );

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let result = controller.run(cancel).await;

    assert_eq!(result.stop_reason, StopReason::Cancelled);
    assert_eq!(adapter.apply_calls(), 1);
    assert_eq!(result.final_pending_count, Some(1));
    assert_eq!(result.total_applied, 1);

    let records = recorder.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].pending_after, Some(1));
    assert!(records[0].waited_ms < 60_000);
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_records_precede_single_finalize() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(2).with_outcomes([TransientFailure]));
    let log = Arc::new(CallLog::default());

    let result = controller(
        adapter,
        log.clone(),
        ControllerConfig::default(),
        BackoffConfig::immediate(),
    )
    .run(CancellationToken::new())
    .await;

    assert!(result.converged);
    assert_eq!(
        *log.calls.lock().await,
        vec!["append:1", "append:2", "append:3", "finalize:converged"]
    );
}

#[tokio::test]
async fn test_recorder_failures_do_not_abort_run() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(2));

    let result = controller(
        adapter,
        Arc::new(FailingRecorder),
        ControllerConfig::default(),
        BackoffConfig::immediate(),
    )
    .run(CancellationToken::new())
    .await;

    assert!(result.converged);
    assert_eq!(result.total_applied, 2);
}

#[tokio::test]
async fn test_result_carries_run_id() {
    let adapter = Arc::new(ScriptedTargetAdapter::new(1));
    let recorder = InMemoryAuditRecorder::new();
    let run_id = uuid::Uuid::new_v4();

    let result = immediate_controller(adapter, &recorder)
        .run_with_id(run_id, CancellationToken::new())
        .await;

    assert_eq!(result.run_id, run_id);
    assert_eq!(recorder.result().await.map(|r| r.run_id), Some(run_id));
    assert!(result.finished_at >= result.started_at);
}
