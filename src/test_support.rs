//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::api::{ApiFuture, VolumeApi};
use crate::resource::{
    AttachRequest, ComputeNode, NodeId, Page, ResourceKind, Volume, VolumeId,
};

/// Builds a compute node in a fixed region.
#[must_use]
pub fn node(id: u64, label: &str) -> ComputeNode {
    ComputeNode {
        id: NodeId::new(id),
        label: label.to_owned(),
        region: String::from("us-east"),
    }
}

/// Builds a volume owned by `owner` (`0` meaning unattached).
#[must_use]
pub fn volume(id: u64, label: &str, owner: u64) -> Volume {
    Volume {
        id: VolumeId::new(id),
        label: label.to_owned(),
        filesystem_path: format!("/dev/disk/by-id/scsi-0Linode_Volume_{label}"),
        linode_id: Some(NodeId::new(owner)),
        region: String::from("us-east"),
    }
}

/// State reported by scripted `get_volume` calls.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VolumeState {
    /// The volume is still owned by the given node.
    Attached(u64),
    /// The volume reports the unattached sentinel.
    Detached,
    /// The fetch fails.
    Unavailable,
}

/// Records a single call made through [`FakeLinodeApi`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApiCall {
    /// `GET /linode/instances?page=N`.
    ListNodes(u32),
    /// `GET /volumes?page=N`.
    ListVolumes(u32),
    /// `GET /volumes/{id}`.
    GetVolume(VolumeId),
    /// `POST /volumes/{id}/detach`.
    Detach(VolumeId),
    /// `POST /volumes/{id}/attach`.
    Attach(VolumeId, AttachRequest),
}

/// Error returned by scripted failures.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FakeApiError {
    /// A failure injected by the test.
    #[error("scripted {0} failure")]
    Scripted(String),
}

#[derive(Debug, Default)]
struct State {
    node_pages: Vec<Vec<ComputeNode>>,
    volume_pages: Vec<Vec<Volume>>,
    volume_states: VecDeque<VolumeState>,
    failing_page: Option<(ResourceKind, u32)>,
    fail_detach: bool,
    fail_attach: bool,
    calls: Vec<ApiCall>,
}

/// In-memory [`VolumeApi`] that serves scripted listings and volume states
/// and records every call in order.
///
/// Volume states are consumed in FIFO order; the last queued state repeats
/// once the queue is down to one entry. With nothing queued, volumes report
/// [`VolumeState::Detached`].
#[derive(Clone, Debug, Default)]
pub struct FakeLinodeApi {
    state: Arc<Mutex<State>>,
}

impl FakeLinodeApi {
    /// Creates an API with empty listings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serves `pages` from the node listing, one inner vector per page.
    #[must_use]
    pub fn with_node_pages(self, pages: Vec<Vec<ComputeNode>>) -> Self {
        self.lock().node_pages = pages;
        self
    }

    /// Serves `pages` from the volume listing, one inner vector per page.
    #[must_use]
    pub fn with_volume_pages(self, pages: Vec<Vec<Volume>>) -> Self {
        self.lock().volume_pages = pages;
        self
    }

    /// Queues states returned by successive `get_volume` calls.
    #[must_use]
    pub fn with_volume_states(self, states: impl IntoIterator<Item = VolumeState>) -> Self {
        self.lock().volume_states.extend(states);
        self
    }

    /// Makes the listing request for `kind` page `page` fail.
    #[must_use]
    pub fn failing_page(self, kind: ResourceKind, page: u32) -> Self {
        self.lock().failing_page = Some((kind, page));
        self
    }

    /// Makes every detach request fail.
    #[must_use]
    pub fn failing_detach(self) -> Self {
        self.lock().fail_detach = true;
        self
    }

    /// Makes every attach request fail.
    #[must_use]
    pub fn failing_attach(self) -> Self {
        self.lock().fail_attach = true;
        self
    }

    /// Returns a snapshot of all calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Counts recorded calls matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Returns the attach calls recorded so far.
    #[must_use]
    pub fn attach_calls(&self) -> Vec<(VolumeId, AttachRequest)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ApiCall::Attach(volume, request) => Some((*volume, request.clone())),
                _ => None,
            })
            .collect()
    }

    fn listing<T: Clone>(
        &self,
        kind: ResourceKind,
        page: u32,
        select: impl FnOnce(&State) -> &Vec<Vec<T>>,
    ) -> Result<Page<T>, FakeApiError> {
        let mut state = self.lock();
        state.calls.push(match kind {
            ResourceKind::Node => ApiCall::ListNodes(page),
            ResourceKind::Volume => ApiCall::ListVolumes(page),
        });
        if state.failing_page == Some((kind, page)) {
            return Err(FakeApiError::Scripted(format!("list {kind} page {page}")));
        }

        let pages = select(&*state);
        let data = usize::try_from(page)
            .ok()
            .and_then(|number| number.checked_sub(1))
            .and_then(|index| pages.get(index))
            .cloned()
            .unwrap_or_default();
        let results = pages.iter().map(Vec::len).sum::<usize>();
        Ok(Page {
            data,
            page,
            pages: u32::try_from(pages.len()).unwrap_or(u32::MAX),
            results: u32::try_from(results).unwrap_or(u32::MAX),
        })
    }

    fn next_volume_state(state: &mut State) -> VolumeState {
        if state.volume_states.len() > 1 {
            state
                .volume_states
                .pop_front()
                .unwrap_or(VolumeState::Detached)
        } else {
            state
                .volume_states
                .front()
                .copied()
                .unwrap_or(VolumeState::Detached)
        }
    }
}

impl VolumeApi for FakeLinodeApi {
    type Error = FakeApiError;

    fn list_nodes(&self, page: u32) -> ApiFuture<'_, Page<ComputeNode>, Self::Error> {
        Box::pin(async move { self.listing(ResourceKind::Node, page, |state| &state.node_pages) })
    }

    fn list_volumes(&self, page: u32) -> ApiFuture<'_, Page<Volume>, Self::Error> {
        Box::pin(async move {
            self.listing(ResourceKind::Volume, page, |state| &state.volume_pages)
        })
    }

    fn get_volume(&self, volume_id: VolumeId) -> ApiFuture<'_, Volume, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(ApiCall::GetVolume(volume_id));
            let owner = match Self::next_volume_state(&mut state) {
                VolumeState::Attached(owner) => owner,
                VolumeState::Detached => 0,
                VolumeState::Unavailable => {
                    return Err(FakeApiError::Scripted(format!("get volume {volume_id}")));
                }
            };
            Ok(volume(volume_id.get(), "fake", owner))
        })
    }

    fn detach_volume(&self, volume_id: VolumeId) -> ApiFuture<'_, (), Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(ApiCall::Detach(volume_id));
            if state.fail_detach {
                return Err(FakeApiError::Scripted(format!("detach volume {volume_id}")));
            }
            Ok(())
        })
    }

    fn attach_volume<'a>(
        &'a self,
        volume_id: VolumeId,
        request: &'a AttachRequest,
    ) -> ApiFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state
                .calls
                .push(ApiCall::Attach(volume_id, request.clone()));
            if state.fail_attach {
                return Err(FakeApiError::Scripted(format!("attach volume {volume_id}")));
            }
            Ok(())
        })
    }
}
