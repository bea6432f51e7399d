// ── Home-directory cache ──────────────────────────────────────────────────────
//
// Computed at most once per backend lifetime and handed out by value, so no
// caller can reach the shared copy.

use std::sync::OnceLock;

use crate::error::Result;

/// Lazily computed, memoized string.
#[derive(Debug, Default)]
pub struct HomeDirCache {
    value: OnceLock<String>,
}

impl HomeDirCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of the cached value, computing it with `compute` on the
    /// first successful call.  A failed computation is not cached.
    pub fn get_or_compute<F>(&self, compute: F) -> Result<String>
    where
        F: FnOnce() -> Result<String>,
    {
        if let Some(v) = self.value.get() {
            return Ok(v.clone());
        }
        let computed = compute()?;
        Ok(self.value.get_or_init(|| computed).clone())
    }

    /// Whether a value has been computed.
    pub fn is_populated(&self) -> bool {
        self.value.get().is_some()
    }

    /// Drop the cached value (backend teardown).
    pub fn clear(&mut self) {
        self.value.take();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
