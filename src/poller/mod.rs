//! Bounded polling for a volume to report that it is no longer attached.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::VolumeApi;
use crate::resource::VolumeId;

/// Default number of state fetches before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Default delay before each state fetch.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Attempt budget and fixed delay for detach polling.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    /// Maximum number of state fetches.
    pub max_attempts: u32,
    /// Delay before every fetch, including the first.
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Terminal result of a detach wait.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PollOutcome {
    /// The volume reported no owner.
    Detached {
        /// Fetches performed, including the successful one.
        attempts: u32,
    },
    /// Every fetch succeeded but the volume stayed attached.
    AttemptsExhausted {
        /// Fetches performed.
        attempts: u32,
    },
    /// The attempt budget ran out and the final fetch failed.
    FetchFailed {
        /// Fetches performed.
        attempts: u32,
        /// Error reported by the final fetch.
        message: String,
    },
    /// The wait was cancelled before the volume detached.
    Cancelled {
        /// Fetches completed before cancellation.
        attempts: u32,
    },
}

impl PollOutcome {
    /// Returns `true` when the volume was observed unattached.
    #[must_use]
    pub const fn is_detached(&self) -> bool {
        matches!(self, Self::Detached { .. })
    }

    /// Returns the number of state fetches performed.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Detached { attempts }
            | Self::AttemptsExhausted { attempts }
            | Self::FetchFailed { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }
}

/// Repeatedly fetches a volume until it reports no owning node.
#[derive(Debug)]
pub struct VolumeStatePoller<'a, A> {
    api: &'a A,
    policy: PollPolicy,
}

impl<'a, A: VolumeApi> VolumeStatePoller<'a, A> {
    /// Creates a poller using `policy`.
    #[must_use]
    pub const fn new(api: &'a A, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    /// Waits for `volume` to report the unattached sentinel.
    ///
    /// Each attempt sleeps for the policy interval and then fetches the
    /// volume. A failed fetch is logged and consumes one attempt without
    /// ending the wait. The first unattached observation returns immediately.
    /// Cancelling `cancel` interrupts the current sleep.
    pub async fn wait_until_detached(
        &self,
        volume: VolumeId,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let mut last_error = None;

        for attempt in 1..=self.policy.max_attempts {
            debug!(%volume, attempt, interval = ?self.policy.interval, "waiting for detach");
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(%volume, "detach wait cancelled");
                    return PollOutcome::Cancelled { attempts: attempt - 1 };
                }
                () = sleep(self.policy.interval) => {}
            }

            match self.api.get_volume(volume).await {
                Ok(state) => match state.owner() {
                    None => {
                        info!(%volume, attempt, "volume detached");
                        return PollOutcome::Detached { attempts: attempt };
                    }
                    Some(owner) => {
                        debug!(%volume, %owner, attempt, "volume still attached");
                        last_error = None;
                    }
                },
                Err(err) => {
                    warn!(%volume, attempt, error = %err, "detach wait request failed");
                    last_error = Some(err.to_string());
                }
            }
        }

        let attempts = self.policy.max_attempts;
        match last_error {
            Some(message) => PollOutcome::FetchFailed { attempts, message },
            None => PollOutcome::AttemptsExhausted { attempts },
        }
    }
}
