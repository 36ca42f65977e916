//! Shared fixtures for hook BDD scenarios.

use std::time::Duration;

use rstest::fixture;
use tokio_util::sync::CancellationToken;
use volhook::config::HookConfig;
use volhook::test_support::{FakeLinodeApi, node, volume};
use volhook::{ExhaustionPolicy, HookMode, HookSummary, PollPolicy};

#[derive(Clone, Debug)]
pub struct HookContext {
    pub api: FakeLinodeApi,
    pub config: HookConfig,
    pub cancel: CancellationToken,
    pub outcome: Option<HookResult>,
}

#[derive(Clone, Debug)]
pub enum HookResult {
    Success(HookSummary),
    Failure { volume: String, message: String },
}

/// Two nodes (`node-a` = 10, `node-b` = 11) and two volumes on `node-b`
/// (`vol-1` = 20, `vol-2` = 21). Volumes report detached on first check.
#[fixture]
pub fn hook_context() -> HookContext {
    let api = FakeLinodeApi::new()
        .with_node_pages(vec![vec![node(10, "node-a")], vec![node(11, "node-b")]])
        .with_volume_pages(vec![vec![volume(20, "vol-1", 11), volume(21, "vol-2", 11)]]);

    HookContext {
        api,
        config: config(),
        cancel: CancellationToken::new(),
        outcome: None,
    }
}

fn config() -> HookConfig {
    HookConfig {
        token: String::from("scenario-token"),
        container_name: Some(String::from("web-1")),
        host: String::from("node-a"),
        mode: HookMode::Pre,
        volumes: Vec::new(),
        api_url: String::from("http://127.0.0.1:9"),
        poll: PollPolicy {
            max_attempts: 3,
            interval: Duration::from_millis(1),
        },
        on_poll_exhausted: ExhaustionPolicy::Proceed,
        config_id: None,
    }
}
