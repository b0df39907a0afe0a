use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifier of the host's own library: the `Request` type and helper functions.
///
/// It is always made available to scripts, whether or not a reference set names it.
pub const HOST_REFERENCE: &str = "host";

/// Library identifiers every compilation is performed against.
///
/// Backed by an ordered set so duplicates are idempotent and iteration is stable.
/// Built before the server starts; once the owning cache is shared behind an `Arc`
/// nothing can reach it mutably any more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceSet(BTreeSet<String>);

impl ReferenceSet {
    /// An empty set. Scripts compiled against it still see the host library.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Adds a reference; returns false if it was already present.
    pub fn insert(&mut self, reference: impl Into<String>) -> bool {
        self.0.insert(reference.into())
    }

    pub fn remove(&mut self, reference: &str) -> bool {
        self.0.remove(reference)
    }

    #[must_use]
    pub fn contains(&self, reference: &str) -> bool {
        self.0.contains(reference)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ReferenceSet {
    /// Core runtime libraries plus the host library.
    fn default() -> Self {
        ["core", "std", "string", "math", HOST_REFERENCE]
            .into_iter()
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ReferenceSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for ReferenceSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}
