//! Moves a named volume onto a named node.
//!
//! The sequence resolves both labels, requests a best-effort detach, waits
//! for the API to report the volume unattached, and then attaches it to the
//! target node:
//!
//! ```text
//! Start -> NodeResolved -> VolumeResolved -> DetachRequested
//!       -> WaitingDetach -> AttachRequested -> Done
//! ```
//!
//! Lookup and attach failures abort the run. A rejected detach is logged and
//! ignored. What happens when the detach wait ends without observing an
//! unattached volume is governed by [`ExhaustionPolicy`].

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::VolumeApi;
use crate::directory::{DirectoryError, ResourceDirectory};
use crate::poller::{PollOutcome, PollPolicy, VolumeStatePoller};
use crate::resource::{AttachRequest, NodeId, VolumeId};

/// Progress markers logged as the sequence advances.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttachStage {
    /// Nothing has been resolved yet.
    Start,
    /// The target node label resolved to an identifier.
    NodeResolved,
    /// The volume label resolved to an identifier.
    VolumeResolved,
    /// A detach request has been sent.
    DetachRequested,
    /// Polling for the volume to report unattached.
    WaitingDetach,
    /// An attach request has been sent.
    AttachRequested,
    /// The attach request was accepted.
    Done,
}

impl fmt::Display for AttachStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::NodeResolved => "node_resolved",
            Self::VolumeResolved => "volume_resolved",
            Self::DetachRequested => "detach_requested",
            Self::WaitingDetach => "waiting_detach",
            Self::AttachRequested => "attach_requested",
            Self::Done => "done",
        })
    }
}

/// What to do when the detach wait ends without seeing the volume detached.
///
/// Cancellation is always fatal regardless of this policy.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExhaustionPolicy {
    /// Attach anyway and let the API decide. This is the default.
    #[default]
    Proceed,
    /// Fail the run with [`AttachError::DetachTimeout`].
    Abort,
}

impl fmt::Display for ExhaustionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Proceed => "proceed",
            Self::Abort => "abort",
        })
    }
}

/// Raised when parsing an unknown [`ExhaustionPolicy`] name.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown poll exhaustion policy '{0}' (expected proceed or abort)")]
pub struct UnknownExhaustionPolicy(pub String);

impl FromStr for ExhaustionPolicy {
    type Err = UnknownExhaustionPolicy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "proceed" => Ok(Self::Proceed),
            "abort" => Ok(Self::Abort),
            _ => Err(UnknownExhaustionPolicy(value.to_owned())),
        }
    }
}

/// Errors that end an attach run.
#[derive(Debug, Error)]
pub enum AttachError<E>
where
    E: std::error::Error + 'static,
{
    /// Raised when the target node cannot be resolved.
    #[error("unable to resolve node '{node}': {source}")]
    NodeLookup {
        /// Node label that was looked up.
        node: String,
        /// Underlying lookup error.
        #[source]
        source: DirectoryError<E>,
    },
    /// Raised when the volume cannot be resolved.
    #[error("unable to resolve volume '{volume}': {source}")]
    VolumeLookup {
        /// Volume label that was looked up.
        volume: String,
        /// Underlying lookup error.
        #[source]
        source: DirectoryError<E>,
    },
    /// Raised under [`ExhaustionPolicy::Abort`] when the volume never
    /// reported unattached.
    #[error("volume '{volume}' did not detach after {} attempt(s)", .outcome.attempts())]
    DetachTimeout {
        /// Volume label.
        volume: String,
        /// Poller outcome that ended the wait.
        outcome: PollOutcome,
    },
    /// Raised when the run was cancelled before the attach was sent.
    ///
    /// A run cancelled before the detach leaves the volume untouched.
    #[error("attach of volume '{volume}' cancelled")]
    Cancelled {
        /// Volume label.
        volume: String,
    },
    /// Raised when the API rejects the attach request.
    #[error("unable to attach volume '{volume}' to node '{node}': {source}")]
    Attach {
        /// Volume label.
        volume: String,
        /// Node label.
        node: String,
        /// Underlying API error.
        #[source]
        source: E,
    },
}

/// Summary of a completed attach run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttachReport {
    /// Node the volume is now attached to.
    pub node_id: NodeId,
    /// Volume that was moved.
    pub volume_id: VolumeId,
    /// Whether the API accepted the detach request.
    pub detach_accepted: bool,
    /// How the detach wait ended.
    pub poll: PollOutcome,
}

/// Runs the detach, wait, attach sequence for one volume at a time.
#[derive(Debug)]
pub struct AttachOrchestrator<A> {
    api: A,
    poll: PollPolicy,
    exhaustion: ExhaustionPolicy,
    config_id: Option<u64>,
}

impl<A: VolumeApi> AttachOrchestrator<A> {
    /// Creates an orchestrator with the default poll and exhaustion policies.
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            api,
            poll: PollPolicy::default(),
            exhaustion: ExhaustionPolicy::default(),
            config_id: None,
        }
    }

    /// Overrides the detach poll policy.
    #[must_use]
    pub const fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Overrides the exhaustion policy.
    #[must_use]
    pub const fn with_exhaustion_policy(mut self, exhaustion: ExhaustionPolicy) -> Self {
        self.exhaustion = exhaustion;
        self
    }

    /// Sets the configuration profile passed with attach requests.
    #[must_use]
    pub const fn with_config_id(mut self, config_id: Option<u64>) -> Self {
        self.config_id = config_id;
        self
    }

    /// Attaches `volume_name` to `node_name`, detaching it from any previous
    /// owner first.
    ///
    /// Re-running against a volume already on the target node is safe: the
    /// detach and attach calls are both tolerated by the API.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError`] when a lookup fails, when the attach request
    /// is rejected, when `cancel` fires before the attach is sent, or when
    /// the wait is exhausted under [`ExhaustionPolicy::Abort`].
    pub async fn execute(
        &self,
        node_name: &str,
        volume_name: &str,
        cancel: &CancellationToken,
    ) -> Result<AttachReport, AttachError<A::Error>> {
        let directory = ResourceDirectory::new(&self.api);
        log_stage(AttachStage::Start, node_name, volume_name);

        let node_id = directory.resolve_node(node_name).await.map_err(|source| {
            error!(node = node_name, error = %source, "node lookup failed");
            AttachError::NodeLookup {
                node: node_name.to_owned(),
                source,
            }
        })?;
        log_stage(AttachStage::NodeResolved, node_name, volume_name);

        let volume_id = directory
            .resolve_volume(volume_name)
            .await
            .map_err(|source| {
                error!(volume = volume_name, error = %source, "volume lookup failed");
                AttachError::VolumeLookup {
                    volume: volume_name.to_owned(),
                    source,
                }
            })?;
        log_stage(AttachStage::VolumeResolved, node_name, volume_name);

        if cancel.is_cancelled() {
            warn!(%volume_id, "cancelled before detach; volume left in place");
            return Err(AttachError::Cancelled {
                volume: volume_name.to_owned(),
            });
        }

        info!(%volume_id, "requesting detach");
        let detach_accepted = match self.api.detach_volume(volume_id).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%volume_id, error = %err, "detach request returned error; continuing");
                false
            }
        };
        log_stage(AttachStage::DetachRequested, node_name, volume_name);

        log_stage(AttachStage::WaitingDetach, node_name, volume_name);
        let poll = VolumeStatePoller::new(&self.api, self.poll)
            .wait_until_detached(volume_id, cancel)
            .await;
        self.check_poll_outcome(volume_name, &poll)?;

        info!(%volume_id, %node_id, "requesting attach");
        let request = AttachRequest::new(node_id).config_id(self.config_id);
        log_stage(AttachStage::AttachRequested, node_name, volume_name);
        self.api
            .attach_volume(volume_id, &request)
            .await
            .map_err(|source| {
                error!(%volume_id, %node_id, error = %source, "attach request failed");
                AttachError::Attach {
                    volume: volume_name.to_owned(),
                    node: node_name.to_owned(),
                    source,
                }
            })?;
        log_stage(AttachStage::Done, node_name, volume_name);

        Ok(AttachReport {
            node_id,
            volume_id,
            detach_accepted,
            poll,
        })
    }

    fn check_poll_outcome(
        &self,
        volume_name: &str,
        poll: &PollOutcome,
    ) -> Result<(), AttachError<A::Error>> {
        match poll {
            PollOutcome::Detached { .. } => Ok(()),
            PollOutcome::Cancelled { .. } => Err(AttachError::Cancelled {
                volume: volume_name.to_owned(),
            }),
            PollOutcome::AttemptsExhausted { .. } | PollOutcome::FetchFailed { .. } => {
                match self.exhaustion {
                    ExhaustionPolicy::Proceed => {
                        warn!(
                            volume = volume_name,
                            attempts = poll.attempts(),
                            "volume not observed detached; attaching anyway"
                        );
                        Ok(())
                    }
                    ExhaustionPolicy::Abort => {
                        error!(
                            volume = volume_name,
                            attempts = poll.attempts(),
                            "volume not observed detached; aborting"
                        );
                        Err(AttachError::DetachTimeout {
                            volume: volume_name.to_owned(),
                            outcome: poll.clone(),
                        })
                    }
                }
            }
        }
    }
}

fn log_stage(stage: AttachStage, node: &str, volume: &str) {
    info!(%stage, node, volume, "attach sequence advanced");
}
