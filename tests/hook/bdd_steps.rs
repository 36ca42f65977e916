//! BDD step definitions for the `pre` hook.

use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;
use volhook::config::HookConfig;
use volhook::test_support::ApiCall;
use volhook::{HookDispatcher, NodeId, VolumeId};

use super::test_helpers::{HookContext, HookResult};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("failed to start runtime: {0}")]
    Runtime(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("an account where vol-1 is attached to node-b")]
fn account(hook_context: HookContext) -> HookContext {
    hook_context
}

#[given("the hook is configured for volumes \"{volumes}\"")]
fn configured_volumes(mut hook_context: HookContext, volumes: String) -> HookContext {
    hook_context.config.volumes = volumes
        .split(',')
        .map(|volume| volume.trim().to_owned())
        .collect();
    hook_context
}

#[given("detach requests are rejected")]
fn detach_rejected(mut hook_context: HookContext) -> HookContext {
    hook_context.api = hook_context.api.failing_detach();
    hook_context
}

#[given("the run has been cancelled")]
fn run_cancelled(hook_context: HookContext) -> HookContext {
    hook_context.cancel.cancel();
    hook_context
}

#[when("the pre hook runs on \"{host}\"")]
fn run_pre_hook(hook_context: HookContext, host: String) -> Result<HookContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Runtime(err.to_string()))?;
    let HookContext {
        api, config, cancel, ..
    } = hook_context;
    let config = HookConfig { host, ..config };
    let dispatcher = HookDispatcher::from_config(api.clone(), &config);

    let result = runtime.block_on(dispatcher.run(&config, &cancel));
    let outcome = match result {
        Ok(summary) => HookResult::Success(summary),
        Err(err) => HookResult::Failure {
            volume: err.volume.clone(),
            message: err.to_string(),
        },
    };

    Ok(HookContext {
        api,
        config,
        cancel,
        outcome: Some(outcome),
    })
}

#[then("the hook succeeds")]
fn hook_succeeds(hook_context: &HookContext) -> Result<(), StepError> {
    match &hook_context.outcome {
        Some(HookResult::Success(summary))
            if summary.attached.len() == hook_context.config.volumes.len() =>
        {
            Ok(())
        }
        other => Err(StepError::Assertion(format!(
            "expected every volume attached, got {other:?}"
        ))),
    }
}

#[then("the hook fails for volume \"{volume}\"")]
fn hook_fails_for(hook_context: &HookContext, volume: String) -> Result<(), StepError> {
    match &hook_context.outcome {
        Some(HookResult::Failure { volume: failed, .. }) if *failed == volume => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected failure for '{volume}', got {other:?}"
        ))),
    }
}

#[then("the failure mentions \"{text}\"")]
fn failure_mentions(hook_context: &HookContext, text: String) -> Result<(), StepError> {
    match &hook_context.outcome {
        Some(HookResult::Failure { message, .. }) if message.contains(&text) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a failure mentioning '{text}', got {other:?}"
        ))),
    }
}

#[then("volume \"{volume_id}\" is attached to node \"{node_id}\"")]
fn volume_attached(
    hook_context: &HookContext,
    volume_id: u64,
    node_id: u64,
) -> Result<(), StepError> {
    let attached = hook_context
        .api
        .attach_calls()
        .iter()
        .any(|(volume, request)| {
            *volume == VolumeId::new(volume_id) && request.linode_id == NodeId::new(node_id)
        });
    if attached {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "no attach of volume {volume_id} to node {node_id} in {:?}",
            hook_context.api.calls()
        )))
    }
}

fn expect_count(actual: usize, expected: usize, what: &str) -> Result<(), StepError> {
    if actual == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {expected} {what}, got {actual}"
        )))
    }
}

#[then("the number of attach requests is \"{count}\"")]
fn attach_count(hook_context: &HookContext, count: usize) -> Result<(), StepError> {
    expect_count(hook_context.api.attach_calls().len(), count, "attach requests")
}

#[then("the number of volume state checks is \"{count}\"")]
fn state_check_count(hook_context: &HookContext, count: usize) -> Result<(), StepError> {
    let checks = hook_context
        .api
        .count(|call| matches!(call, ApiCall::GetVolume(_)));
    expect_count(checks, count, "volume state checks")
}

#[then("no detach request was sent")]
fn no_detach(hook_context: &HookContext) -> Result<(), StepError> {
    let detaches = hook_context
        .api
        .count(|call| matches!(call, ApiCall::Detach(_)));
    expect_count(detaches, 0, "detach requests")
}
