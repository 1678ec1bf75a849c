// SPDX-License-Identifier: LGPL-3.0-only
//! The two key→entry maps and miss rendering.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use crate::icon::entry::CacheEntry;
use crate::icon::key::{CacheKey, NameKey, StreamKey};
use crate::icon::resolver::{StreamDecoder, ThemeResolver};

/// Cached renders, partitioned by descriptor kind. Both maps are created on
/// first insertion.
#[derive(Default)]
pub struct Store {
    stream: Option<HashMap<StreamKey, Rc<CacheEntry>>>,
    named: Option<HashMap<NameKey, Rc<CacheEntry>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry cached under `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<Rc<CacheEntry>> {
        match key {
            CacheKey::Stream(key) => self.stream.as_ref()?.get(key).cloned(),
            CacheKey::Name(key) => self.named.as_ref()?.get(key).cloned(),
        }
    }

    /// Insert `entry` unless `key` is already taken, returning whichever
    /// entry ends up cached.
    pub fn insert(&mut self, key: CacheKey, entry: Rc<CacheEntry>) -> Rc<CacheEntry> {
        match key {
            CacheKey::Stream(key) => self
                .stream
                .get_or_insert_with(HashMap::new)
                .entry(key)
                .or_insert(entry)
                .clone(),
            CacheKey::Name(key) => self
                .named
                .get_or_insert_with(HashMap::new)
                .entry(key)
                .or_insert(entry)
                .clone(),
        }
    }

    /// Keep only the entries for which `keep` returns true, evicting the
    /// rest. Returns how many were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&CacheEntry) -> bool) -> usize {
        let before = self.len();
        let mut keep_or_evict = |entry: &Rc<CacheEntry>| {
            let kept = keep(&**entry);
            if !kept {
                entry.evict();
            }
            kept
        };
        if let Some(map) = &mut self.stream {
            map.retain(|_, entry| keep_or_evict(entry));
        }
        if let Some(map) = &mut self.named {
            map.retain(|_, entry| keep_or_evict(entry));
        }
        before - self.len()
    }

    /// Drop every entry regardless of ownership. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.len();
        let stream = self.stream.take().into_iter().flat_map(HashMap::into_values);
        let named = self.named.take().into_iter().flat_map(HashMap::into_values);
        for entry in stream.chain(named) {
            entry.evict();
        }
        removed
    }

    /// Number of stream-decoded entries.
    pub fn stream_len(&self) -> usize {
        self.stream.as_ref().map_or(0, HashMap::len)
    }

    /// Number of theme-resolved entries.
    pub fn named_len(&self) -> usize {
        self.named.as_ref().map_or(0, HashMap::len)
    }

    pub fn len(&self) -> usize {
        self.stream_len() + self.named_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The collaborators used to render a missing entry.
pub(crate) struct Renderers<'a> {
    pub theme: &'a dyn ThemeResolver,
    pub decoder: &'a dyn StreamDecoder,
    pub fallback_name: &'a str,
}

impl Renderers<'_> {
    /// Render the entry for `key`. Failures are substituted, never returned.
    pub(crate) fn render(&self, key: &CacheKey, now: Instant) -> CacheEntry {
        match key {
            CacheKey::Stream(key) => {
                let px = key.physical_size;
                match self.decoder.decode(&key.resource, px, px) {
                    Ok(image) => CacheEntry::new(Some(image), 1, false, now),
                    Err(e) => {
                        log::debug!("IconCache: Failed to decode {:?}: {}", key.resource, e);
                        CacheEntry::new(None, 1, true, now)
                    },
                }
            },
            CacheKey::Name(key) => match self.theme.resolve(&key.name, key.size, key.scale) {
                Ok(image) => CacheEntry::new(Some(image), key.scale, false, now),
                Err(e) => {
                    log::debug!(
                        "IconCache: Icon '{}' unavailable ({}), using '{}'",
                        key.name,
                        e,
                        self.fallback_name
                    );
                    let image = self
                        .theme
                        .resolve(self.fallback_name, key.size, key.scale)
                        .map_err(|e| {
                            log::warn!(
                                "IconCache: Fallback icon '{}' unavailable: {}",
                                self.fallback_name,
                                e
                            )
                        })
                        .ok();
                    CacheEntry::new(image, key.scale, true, now)
                },
            },
        }
    }
}
