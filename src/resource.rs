//! Resource shapes returned by the Linode v4 API.
//!
//! Only the fields the hook reads are modelled; unknown fields in responses
//! are ignored by serde.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw identifier.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

resource_id!(
    /// Identifier of a compute node (a Linode instance).
    NodeId
);
resource_id!(
    /// Identifier of a block storage volume.
    VolumeId
);

/// Kind of resource the directory can resolve by label.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResourceKind {
    /// Compute node, listed under `/linode/instances`.
    Node,
    /// Block storage volume, listed under `/volumes`.
    Volume,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Node => "node",
            Self::Volume => "volume",
        })
    }
}

/// A compute node as reported by the instance listing.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ComputeNode {
    /// Remote-assigned identifier.
    pub id: NodeId,
    /// Display name used for lookup.
    pub label: String,
    /// Region the node runs in.
    #[serde(default)]
    pub region: String,
}

/// A block storage volume.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Volume {
    /// Remote-assigned identifier.
    pub id: VolumeId,
    /// Display name used for lookup.
    pub label: String,
    /// Device path on the owning node.
    #[serde(default)]
    pub filesystem_path: String,
    /// Owning node. The API reports `null` or `0` when unattached.
    #[serde(default)]
    pub linode_id: Option<NodeId>,
    /// Region the volume lives in.
    #[serde(default)]
    pub region: String,
}

impl Volume {
    /// Returns the owning node, treating the `0` sentinel as unattached.
    #[must_use]
    pub fn owner(&self) -> Option<NodeId> {
        self.linode_id.filter(|id| id.get() != 0)
    }

    /// Returns `true` when the volume is attached to any node.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.owner().is_some()
    }
}

/// Body of `POST /volumes/{id}/attach`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AttachRequest {
    /// Node the volume should be attached to.
    pub linode_id: NodeId,
    /// Optional boot configuration to add the volume to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<u64>,
}

impl AttachRequest {
    /// Builds a request targeting `node`.
    #[must_use]
    pub const fn new(node: NodeId) -> Self {
        Self {
            linode_id: node,
            config_id: None,
        }
    }

    /// Sets the optional configuration profile.
    #[must_use]
    pub const fn config_id(mut self, value: Option<u64>) -> Self {
        self.config_id = value;
        self
    }
}

/// One page of a paginated listing.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Page<T> {
    /// Entities on this page, in the order the API returned them.
    pub data: Vec<T>,
    /// One-based page number.
    #[serde(default)]
    pub page: u32,
    /// Total number of pages the listing spans.
    #[serde(default)]
    pub pages: u32,
    /// Total number of entities across all pages.
    #[serde(default)]
    pub results: u32,
}

/// Entities that carry a display label and a numeric identifier.
pub trait Labelled {
    /// Display name compared during lookup.
    fn label(&self) -> &str;
    /// Raw identifier returned on a match.
    fn raw_id(&self) -> u64;
}

impl Labelled for ComputeNode {
    fn label(&self) -> &str {
        &self.label
    }

    fn raw_id(&self) -> u64 {
        self.id.get()
    }
}

impl Labelled for Volume {
    fn label(&self) -> &str {
        &self.label
    }

    fn raw_id(&self) -> u64 {
        self.id.get()
    }
}

impl<T: Labelled> Page<T> {
    /// Returns the identifier of the first entity labelled `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<u64> {
        self.data
            .iter()
            .find(|item| item.label() == name)
            .map(Labelled::raw_id)
    }
}
