//! BDD scenarios for the `pre` hook.

use rstest_bdd_macros::scenario;

use super::test_helpers::{HookContext, hook_context};

#[scenario(
    path = "tests/features/hook.feature",
    name = "Move a volume that is free on the first check"
)]
fn scenario_move_free_volume(hook_context: HookContext) {
    let _ = hook_context;
}

#[scenario(
    path = "tests/features/hook.feature",
    name = "Stop at the first volume that cannot be resolved"
)]
fn scenario_stop_at_first_failure(hook_context: HookContext) {
    let _ = hook_context;
}

#[scenario(
    path = "tests/features/hook.feature",
    name = "Attach even when the detach request is rejected"
)]
fn scenario_tolerate_rejected_detach(hook_context: HookContext) {
    let _ = hook_context;
}

#[scenario(
    path = "tests/features/hook.feature",
    name = "A cancelled run leaves volumes where they are"
)]
fn scenario_cancelled_run(hook_context: HookContext) {
    let _ = hook_context;
}
