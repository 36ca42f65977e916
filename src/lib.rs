//! Core library for the `volhook` container lifecycle hook.
//!
//! Before a workload starts, the hook makes sure each named Linode block
//! storage volume is attached to the node about to run it: the volume is
//! detached from its previous owner, the API is polled until it reports the
//! volume free, and the volume is attached to the target node.

pub mod api;
pub mod config;
pub mod directory;
pub mod hook;
pub mod linode;
pub mod logging;
pub mod orchestrator;
pub mod poller;
pub mod resource;
pub mod test_support;

pub use api::{ApiFuture, VolumeApi};
pub use config::{CliOverrides, ConfigError, HookConfig, HookSettings};
pub use directory::{DirectoryError, ResourceDirectory};
pub use hook::{HookDispatcher, HookError, HookMode, HookSummary};
pub use linode::{ApiError, LinodeClient};
pub use orchestrator::{AttachError, AttachOrchestrator, AttachReport, AttachStage, ExhaustionPolicy};
pub use poller::{PollOutcome, PollPolicy, VolumeStatePoller};
pub use resource::{AttachRequest, ComputeNode, NodeId, Page, ResourceKind, Volume, VolumeId};
