//! Seam between the orchestration logic and the remote volume API.
//!
//! [`crate::linode::LinodeClient`] implements [`VolumeApi`] over HTTP; tests
//! drive the same orchestration through
//! [`crate::test_support::FakeLinodeApi`].

use std::future::Future;
use std::pin::Pin;

use crate::resource::{AttachRequest, ComputeNode, Page, Volume, VolumeId};

/// Future returned by API operations.
pub type ApiFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Remote operations the hook relies on.
///
/// Every call either yields its typed payload or a typed error; callers never
/// inspect raw response bodies.
pub trait VolumeApi {
    /// Provider specific error type returned by the API.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches one page of the compute node listing.
    fn list_nodes(&self, page: u32) -> ApiFuture<'_, Page<ComputeNode>, Self::Error>;

    /// Fetches one page of the volume listing.
    fn list_volumes(&self, page: u32) -> ApiFuture<'_, Page<Volume>, Self::Error>;

    /// Fetches the current state of a single volume.
    fn get_volume(&self, volume: VolumeId) -> ApiFuture<'_, Volume, Self::Error>;

    /// Requests that the volume be detached from whichever node owns it.
    ///
    /// Completion is asynchronous on the remote side; observe it with
    /// [`VolumeApi::get_volume`].
    fn detach_volume(&self, volume: VolumeId) -> ApiFuture<'_, (), Self::Error>;

    /// Requests that the volume be attached to the node named in `request`.
    fn attach_volume<'a>(
        &'a self,
        volume: VolumeId,
        request: &'a AttachRequest,
    ) -> ApiFuture<'a, (), Self::Error>;
}
