//! Opaque record id generation
//!
//! Collections never pick an id algorithm themselves; they call an
//! [`IdGenerator`] handed to them at construction.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Produces fresh, collision-free record ids
///
/// Cloning is cheap and clones share state, so a sequential generator keeps
/// counting across a collection and its sub-collections.
#[derive(Clone)]
pub struct IdGenerator {
    generate: Arc<dyn Fn() -> String + Send + Sync>,
}

impl IdGenerator {
    /// Wrap an arbitrary id function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self { generate: Arc::new(f) }
    }

    /// Random UUID v4 ids (hyphenated)
    pub fn uuid_v4() -> Self {
        Self::new(|| uuid::Uuid::new_v4().to_string())
    }

    /// Deterministic ids `<prefix>000001`, `<prefix>000002`, ... for tests
    pub fn sequential(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let counter = AtomicU64::new(0);
        Self::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            format!("{}{:06}", prefix, n)
        })
    }

    /// Generate the next id
    pub fn next_id(&self) -> String {
        (self.generate)()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::uuid_v4()
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}
