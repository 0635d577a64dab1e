//! Named descriptor registry.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use stripefs_error::{Result, StripeError};
use tracing::debug;

use crate::descriptor::{FileDescriptor, SharedDescriptor};

/// Registry mapping names to descriptors. Once registered, the pool owns
/// the descriptor; callers hold shared references.
#[derive(Default)]
pub struct DescriptorPool {
    entries: RwLock<HashMap<String, SharedDescriptor>>,
}

impl DescriptorPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create: an unknown name is registered with an empty
    /// descriptor as a side effect.
    pub fn get(&self, name: &str) -> SharedDescriptor {
        if let Some(descriptor) = self.entries.read().get(name) {
            return Arc::clone(descriptor);
        }
        let mut entries = self.entries.write();
        let descriptor = entries
            .entry(name.to_owned())
            .or_insert_with(|| FileDescriptor::new().into_shared());
        Arc::clone(descriptor)
    }

    /// Lookup without the create side effect.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<SharedDescriptor> {
        self.entries.read().get(name).map(Arc::clone)
    }

    /// Delete silently; removing an absent name is a no-op.
    pub fn remove(&self, name: &str) {
        if self.entries.write().remove(name).is_some() {
            debug!(name, "descriptor removed from registry");
        }
    }

    /// Move the entry from `old` to `new`. Fails with
    /// [`StripeError::UnknownDescriptor`] if `old` is absent and with
    /// [`StripeError::AlreadyExists`] if `new` is taken; both failures
    /// leave the registry unchanged.
    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        let mut entries = self.entries.write();
        if !entries.contains_key(old) {
            return Err(StripeError::UnknownDescriptor {
                name: old.to_owned(),
            });
        }
        if entries.contains_key(new) {
            return Err(StripeError::already_exists(new));
        }
        let descriptor = entries.remove(old).unwrap_or_default();
        entries.insert(new.to_owned(), descriptor);
        Ok(())
    }

    /// Point-in-time name enumeration.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Deep-copied snapshot; mutations after the call do not affect the
    /// returned descriptors.
    #[must_use]
    pub fn dump(&self) -> Vec<(String, FileDescriptor)> {
        self.entries
            .read()
            .iter()
            .map(|(name, descriptor)| (name.clone(), descriptor.lock().clone()))
            .collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
