//! Bounded cache of rendered page previews.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use image::GrayImage;

use crate::error::Result;

/// Default number of cached pages.
pub const DEFAULT_CAPACITY: usize = 50;

/// Cache key: source file, zero-based page and resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewKey {
    /// Source PDF
    pub path: PathBuf,
    /// Page index
    pub page: usize,
    /// Rendering DPI
    pub dpi: u32,
}

impl PreviewKey {
    /// Create a key.
    pub fn new(path: impl Into<PathBuf>, page: usize, dpi: u32) -> Self {
        Self {
            path: path.into(),
            page,
            dpi,
        }
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Cached pages
    pub entries: usize,
    /// Capacity
    pub capacity: usize,
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that had to render
    pub misses: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<PreviewKey, Arc<GrayImage>>,
    // Least recently used at the front
    order: VecDeque<PreviewKey>,
    hits: u64,
    misses: u64,
}

impl CacheState {
    fn touch(&mut self, key: &PreviewKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.clone());
    }
}

/// LRU cache of rendered pages, safe to share between threads.
///
/// The cache is an ordinary value: create one where the application is put
/// together and hand out references (or an `Arc`) to whatever renders
/// previews.
#[derive(Debug)]
pub struct PreviewCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PreviewCache {
    /// Create a cache holding at most `capacity` pages (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A panic while holding the lock leaves the maps consistent
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a page, marking it most recently used.
    pub fn get(&self, key: &PreviewKey) -> Option<Arc<GrayImage>> {
        let mut state = self.lock();
        let found = state.entries.get(key).cloned();
        match found {
            Some(image) => {
                state.hits += 1;
                state.touch(key);
                log::trace!("Preview cache hit: {:?}", key);
                Some(image)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Store a page, evicting the least recently used ones over capacity.
    pub fn insert(&self, key: PreviewKey, image: GrayImage) -> Arc<GrayImage> {
        let image = Arc::new(image);
        let mut state = self.lock();
        state.entries.insert(key.clone(), Arc::clone(&image));
        state.touch(&key);
        while state.entries.len() > self.capacity {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                    log::trace!("Preview cache evicted: {:?}", oldest);
                }
                None => break,
            }
        }
        image
    }

    /// Return the cached page or render and cache it.
    ///
    /// The lock is not held while rendering, so two threads asking for the
    /// same missing page may both render it.
    pub fn get_or_render<F>(&self, key: PreviewKey, render: F) -> Result<Arc<GrayImage>>
    where
        F: FnOnce() -> Result<GrayImage>,
    {
        if let Some(image) = self.get(&key) {
            return Ok(image);
        }
        let image = render()?;
        Ok(self.insert(key, image))
    }

    /// Drop every page of one file.
    pub fn invalidate(&self, path: &Path) {
        let mut state = self.lock();
        state.entries.retain(|k, _| k.path != path);
        state.order.retain(|k| k.path != path);
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.entries.len(),
            capacity: self.capacity,
            hits: state.hits,
            misses: state.misses,
        }
    }
}
