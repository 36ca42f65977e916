//! Pre/post hook dispatch over the configured volumes.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::VolumeApi;
use crate::config::HookConfig;
use crate::orchestrator::{AttachError, AttachOrchestrator, AttachReport};

/// Lifecycle point the hook was invoked for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HookMode {
    /// Before the workload starts: move every configured volume here.
    Pre,
    /// After the workload stops. Currently a no-op.
    Post,
}

impl fmt::Display for HookMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pre => "pre",
            Self::Post => "post",
        })
    }
}

/// Raised when parsing an unknown [`HookMode`] name.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown hook type '{0}' (expected pre or post)")]
pub struct UnknownHookMode(pub String);

impl FromStr for HookMode {
    type Err = UnknownHookMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "pre" => Ok(Self::Pre),
            "post" => Ok(Self::Post),
            _ => Err(UnknownHookMode(value.to_owned())),
        }
    }
}

/// Error raised when a volume in a `pre` run fails.
#[derive(Debug, Error)]
#[error("volume '{volume}' failed ({skipped} remaining volume(s) skipped): {source}")]
pub struct HookError<E>
where
    E: std::error::Error + 'static,
{
    /// Label of the volume that failed.
    pub volume: String,
    /// Number of configured volumes left unprocessed.
    pub skipped: usize,
    /// Orchestration error for the failing volume.
    #[source]
    pub source: AttachError<E>,
}

/// Outcome of a hook run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HookSummary {
    /// Mode that ran.
    pub mode: HookMode,
    /// Reports for every volume attached, in configuration order.
    pub attached: Vec<AttachReport>,
}

/// Selects hook behaviour from [`HookConfig::mode`] and drives the
/// orchestrator.
#[derive(Debug)]
pub struct HookDispatcher<A> {
    orchestrator: AttachOrchestrator<A>,
}

impl<A: VolumeApi> HookDispatcher<A> {
    /// Creates a dispatcher around `orchestrator`.
    #[must_use]
    pub const fn new(orchestrator: AttachOrchestrator<A>) -> Self {
        Self { orchestrator }
    }

    /// Builds a dispatcher whose orchestrator follows the policies in
    /// `config`.
    #[must_use]
    pub fn from_config(api: A, config: &HookConfig) -> Self {
        Self::new(
            AttachOrchestrator::new(api)
                .with_poll_policy(config.poll)
                .with_exhaustion_policy(config.on_poll_exhausted)
                .with_config_id(config.config_id),
        )
    }

    /// Runs the hook described by `config`.
    ///
    /// In `pre` mode volumes are processed one at a time in configuration
    /// order against `config.host`; the first failure stops the run. `post`
    /// mode does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] for the first volume whose orchestration fails.
    pub async fn run(
        &self,
        config: &HookConfig,
        cancel: &CancellationToken,
    ) -> Result<HookSummary, HookError<A::Error>> {
        info!(
            mode = %config.mode,
            host = %config.host,
            container = config.container_name.as_deref().unwrap_or("-"),
            volumes = config.volumes.len(),
            "running hook"
        );
        let attached = match config.mode {
            HookMode::Pre => self.pre(config, cancel).await?,
            HookMode::Post => {
                info!("post hook has nothing to do");
                Vec::new()
            }
        };
        Ok(HookSummary {
            mode: config.mode,
            attached,
        })
    }

    async fn pre(
        &self,
        config: &HookConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<AttachReport>, HookError<A::Error>> {
        if config.volumes.is_empty() {
            warn!("pre hook invoked without any volumes");
        }

        let mut reports = Vec::with_capacity(config.volumes.len());
        for (index, volume) in config.volumes.iter().enumerate() {
            let outcome = if cancel.is_cancelled() {
                Err(AttachError::Cancelled {
                    volume: volume.clone(),
                })
            } else {
                self.orchestrator
                    .execute(&config.host, volume, cancel)
                    .await
            };
            match outcome {
                Ok(report) => reports.push(report),
                Err(source) => {
                    let skipped = config.volumes.len() - index - 1;
                    error!(volume = %volume, host = %config.host, skipped, error = %source, "pre hook failed");
                    return Err(HookError {
                        volume: volume.clone(),
                        skipped,
                        source,
                    });
                }
            }
        }
        Ok(reports)
    }
}
