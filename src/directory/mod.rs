//! Name to identifier resolution over paginated listings.

use thiserror::Error;
use tracing::debug;

use crate::api::VolumeApi;
use crate::resource::{ComputeNode, NodeId, Page, ResourceKind, Volume, VolumeId};

/// Errors raised while resolving a label to an identifier.
#[derive(Debug, Error)]
pub enum DirectoryError<E>
where
    E: std::error::Error + 'static,
{
    /// Raised when every declared page was scanned without a match.
    #[error("{kind} '{name}' not found after scanning {pages_scanned} page(s)")]
    NotFound {
        /// Kind of resource being resolved.
        kind: ResourceKind,
        /// Label that was looked up.
        name: String,
        /// Number of pages fetched before giving up.
        pages_scanned: u32,
    },
    /// Raised when a page request fails. Resolution stops at the first failure.
    #[error("failed to list {kind} page {page} while resolving '{name}': {source}")]
    Lookup {
        /// Kind of resource being resolved.
        kind: ResourceKind,
        /// Label that was looked up.
        name: String,
        /// Page that could not be fetched.
        page: u32,
        /// Underlying API error.
        #[source]
        source: E,
    },
}

/// A fetched listing page for one resource kind.
enum Listing {
    Nodes(Page<ComputeNode>),
    Volumes(Page<Volume>),
}

impl Listing {
    const fn pages(&self) -> u32 {
        match self {
            Self::Nodes(page) => page.pages,
            Self::Volumes(page) => page.pages,
        }
    }

    fn find(&self, name: &str) -> Option<u64> {
        match self {
            Self::Nodes(page) => page.find(name),
            Self::Volumes(page) => page.find(name),
        }
    }
}

/// Resolves human-readable labels to remote identifiers.
#[derive(Debug)]
pub struct ResourceDirectory<'a, A> {
    api: &'a A,
}

impl<'a, A: VolumeApi> ResourceDirectory<'a, A> {
    /// Creates a directory backed by `api`.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Returns the identifier of the first `kind` resource labelled `name`.
    ///
    /// Pages are fetched in ascending order starting at 1. Each response
    /// declares the total page count, and the scan stops at the first match
    /// or once the declared count is reached. Duplicate labels resolve to
    /// whichever entry the API lists first.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Lookup`] as soon as any page request fails,
    /// and [`DirectoryError::NotFound`] when no page contains `name`.
    pub async fn resolve_id(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<u64, DirectoryError<A::Error>> {
        let mut pages = 1;
        let mut page = 1;

        while page <= pages {
            let listing =
                self.fetch(kind, page)
                    .await
                    .map_err(|source| DirectoryError::Lookup {
                        kind,
                        name: name.to_owned(),
                        page,
                        source,
                    })?;
            pages = listing.pages();

            if let Some(id) = listing.find(name) {
                debug!(%kind, name, id, page, "resolved label");
                return Ok(id);
            }
            page += 1;
        }

        Err(DirectoryError::NotFound {
            kind,
            name: name.to_owned(),
            pages_scanned: page - 1,
        })
    }

    /// Resolves a compute node label.
    ///
    /// # Errors
    ///
    /// See [`ResourceDirectory::resolve_id`].
    pub async fn resolve_node(&self, name: &str) -> Result<NodeId, DirectoryError<A::Error>> {
        self.resolve_id(ResourceKind::Node, name)
            .await
            .map(NodeId::new)
    }

    /// Resolves a volume label.
    ///
    /// # Errors
    ///
    /// See [`ResourceDirectory::resolve_id`].
    pub async fn resolve_volume(&self, name: &str) -> Result<VolumeId, DirectoryError<A::Error>> {
        self.resolve_id(ResourceKind::Volume, name)
            .await
            .map(VolumeId::new)
    }

    async fn fetch(&self, kind: ResourceKind, page: u32) -> Result<Listing, A::Error> {
        match kind {
            ResourceKind::Node => self.api.list_nodes(page).await.map(Listing::Nodes),
            ResourceKind::Volume => self.api.list_volumes(page).await.map(Listing::Volumes),
        }
    }
}
