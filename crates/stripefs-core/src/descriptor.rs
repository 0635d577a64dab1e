//! Fragment and descriptor model.
//!
//! A descriptor is the complete recipe for reassembling one logical
//! stream: an ordered list of `(location, length)` pairs. Order is the
//! replay order. The serde derives are the interchange representation:
//! a descriptor serializes to exactly that list of pairs.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One contiguous chunk of a logical stream: where it went and how many
/// bytes landed there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Opaque reference resolved by the catalog.
    pub location: String,
    /// Exact byte count written to that location by this fragment.
    pub length: u64,
}

/// Ordered fragment list describing one logical stream.
///
/// Invariant: the sum of fragment lengths equals the bytes successfully
/// written through the descriptor's writer session. A descriptor with
/// zero fragments is the canonical broken/unreadable sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub fragments: Vec<Fragment>,
}

impl FileDescriptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total logical stream length in bytes.
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.fragments.iter().map(|f| f.length).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Wrap into the shared form used by writer sessions and the
    /// registry.
    #[must_use]
    pub fn into_shared(self) -> SharedDescriptor {
        Arc::new(Mutex::new(self))
    }
}

/// A descriptor shared between its writer session and the registry.
/// Appends happen under the lock; the descriptor is treated as immutable
/// once the writer session ends.
pub type SharedDescriptor = Arc<Mutex<FileDescriptor>>;

/// Appends fragments to a shared descriptor. Clone-cheap: every sink of
/// one writer session holds a recorder for the same descriptor.
#[derive(Clone)]
pub struct DescriptorRecorder {
    descriptor: SharedDescriptor,
}

impl DescriptorRecorder {
    #[must_use]
    pub fn new(descriptor: SharedDescriptor) -> Self {
        Self { descriptor }
    }

    /// Append one fragment. Zero-length fragments are dropped: a write
    /// that accepted nothing recorded nothing.
    pub fn record(&self, fragment: Fragment) {
        if fragment.length == 0 {
            return;
        }
        self.descriptor.lock().fragments.push(fragment);
    }
}
