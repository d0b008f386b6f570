// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference-counted cache of stencil-configured materials.
//!
//! Every consumer that asks for the same `(base, config)` pair shares one
//! material instance. The instance is created on the first [`add`] and dropped
//! when the last holder calls [`remove`].
//!
//! [`add`]: StencilMaterialCache::add
//! [`remove`]: StencilMaterialCache::remove

use alloc::vec::Vec;
use core::ops::Index;

use crate::stencil::StencilConfig;

/// A material that can carry stencil state.
///
/// The cache clones the base material and calls [`apply_stencil`](Self::apply_stencil)
/// on the clone. Equality of base materials decides whether two requests share
/// an instance, so it should compare identity (for example a handle or id), not
/// the full GPU state.
pub trait Material: Clone + PartialEq {
    /// Overwrite this material's stencil and color-write state with `stencil`.
    fn apply_stencil(&mut self, stencil: &StencilConfig);
}

/// Handle to a configured material owned by a [`StencilMaterialCache`].
///
/// A slot index plus a generation counter: once an entry is evicted its slot may
/// be reused, but the stale handle never aliases the new entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct StencilMaterialId(u32, u32);

impl StencilMaterialId {
    const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct Entry<M> {
    generation: u32,
    base: M,
    config: StencilConfig,
    material: M,
    count: u32,
}

/// Shared, reference-counted configured materials keyed by `(base, StencilConfig)`.
///
/// ```
/// use understory_inverse_mask::{Material, StencilConfig, StencilMaterialCache};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Mat { shader: u32, stencil: Option<StencilConfig> }
///
/// impl Material for Mat {
///     fn apply_stencil(&mut self, stencil: &StencilConfig) {
///         self.stencil = Some(*stencil);
///     }
/// }
///
/// let mut cache = StencilMaterialCache::new();
/// let base = Mat { shader: 7, stencil: None };
/// let config = StencilConfig { reference: 1, ..Default::default() };
///
/// let a = cache.add(&base, config);
/// let b = cache.add(&base, config);
/// assert_eq!(a, b);
/// assert_eq!(cache.ref_count(a), 2);
/// assert_eq!(cache[a].stencil, Some(config));
///
/// cache.remove(Some(a));
/// cache.remove(Some(b));
/// assert!(cache.is_empty());
/// ```
pub struct StencilMaterialCache<M> {
    slots: Vec<Option<Entry<M>>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl<M> core::fmt::Debug for StencilMaterialCache<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let live = self.slots.iter().filter(|e| e.is_some()).count();
        let refs: u64 = self
            .slots
            .iter()
            .flatten()
            .map(|e| u64::from(e.count))
            .sum();
        f.debug_struct("StencilMaterialCache")
            .field("slots_total", &self.slots.len())
            .field("entries", &live)
            .field("references", &refs)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl<M> Default for StencilMaterialCache<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> StencilMaterialCache<M> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Number of live configured materials.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Returns true if no configured material is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured material behind `id`, if it is still alive.
    pub fn get(&self, id: StencilMaterialId) -> Option<&M> {
        self.entry(id).map(|e| &e.material)
    }

    /// Returns true if `id` refers to a live entry.
    pub fn contains(&self, id: StencilMaterialId) -> bool {
        self.entry(id).is_some()
    }

    /// Number of outstanding [`add`](Self::add)s for `id`; `0` for stale ids.
    pub fn ref_count(&self, id: StencilMaterialId) -> u32 {
        self.entry(id).map(|e| e.count).unwrap_or(0)
    }

    /// Release one reference to `id`.
    ///
    /// `None` is a no-op, which lets holders write `cache.remove(slot.take())`
    /// whether or not they ever acquired anything. When the count reaches zero the
    /// material is dropped and its slot recycled.
    ///
    /// Every `Some` must pair with an earlier [`add`](Self::add). Removing an id the
    /// cache does not know is a caller bug: debug builds panic, release builds ignore it.
    pub fn remove(&mut self, id: Option<StencilMaterialId>) {
        let Some(id) = id else {
            return;
        };
        let Some(entry) = self.entry_mut(id) else {
            if cfg!(debug_assertions) {
                panic!("removing unknown stencil material {id:?}");
            }
            log::warn!("ignoring release of unknown stencil material {id:?}");
            return;
        };
        entry.count -= 1;
        if entry.count == 0 {
            log::trace!("destroying stencil material {id:?}");
            self.slots[id.idx()] = None;
            self.free_list.push(id.idx());
        }
    }

    /// Drop every entry regardless of outstanding references.
    ///
    /// Ids handed out earlier become stale. Intended for teardown, for example
    /// after the rendering device was lost.
    pub fn clear(&mut self) {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.take().is_some() {
                self.free_list.push(idx);
            }
        }
    }

    /// Iterate live entries as `(id, configuration, reference count)`.
    pub fn iter(&self) -> impl Iterator<Item = (StencilMaterialId, &StencilConfig, u32)> + '_ {
        self.iter_entries().map(|(id, e)| (id, &e.config, e.count))
    }

    fn iter_entries(&self) -> impl Iterator<Item = (StencilMaterialId, &Entry<M>)> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            let e = slot.as_ref()?;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "StencilMaterialId uses 32-bit indices by design."
            )]
            let idx = idx as u32;
            Some((StencilMaterialId::new(idx, e.generation), e))
        })
    }

    fn entry(&self, id: StencilMaterialId) -> Option<&Entry<M>> {
        let e = self.slots.get(id.idx())?.as_ref()?;
        (e.generation == id.1).then_some(e)
    }

    fn entry_mut(&mut self, id: StencilMaterialId) -> Option<&mut Entry<M>> {
        let e = self.slots.get_mut(id.idx())?.as_mut()?;
        (e.generation == id.1).then_some(e)
    }
}

impl<M: Material> StencilMaterialCache<M> {
    /// Acquire the material for `base` configured with `config`.
    ///
    /// Returns the existing entry with its count bumped if one matches, otherwise
    /// materializes a clone of `base` with `config` applied.
    pub fn add(&mut self, base: &M, config: StencilConfig) -> StencilMaterialId {
        if let Some(id) = self.find(base, &config) {
            if let Some(entry) = self.entry_mut(id) {
                entry.count += 1;
            }
            return id;
        }

        let mut material = base.clone();
        material.apply_stencil(&config);
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            (idx, generation)
        } else {
            self.slots.push(None);
            self.generations.push(1);
            (self.slots.len() - 1, 1)
        };
        self.slots[idx] = Some(Entry {
            generation,
            base: base.clone(),
            config,
            material,
            count: 1,
        });
        #[allow(
            clippy::cast_possible_truncation,
            reason = "StencilMaterialId uses 32-bit indices by design."
        )]
        let id = StencilMaterialId::new(idx as u32, generation);
        log::trace!("materialized stencil material {id:?}: {config:?}");
        id
    }

    /// Look up the live entry for `(base, config)` without touching its count.
    pub fn find(&self, base: &M, config: &StencilConfig) -> Option<StencilMaterialId> {
        self.iter_entries()
            .find(|(_, e)| e.config == *config && e.base == *base)
            .map(|(id, _)| id)
    }
}

impl<M> Index<StencilMaterialId> for StencilMaterialCache<M> {
    type Output = M;

    /// Panics if `id` is stale.
    fn index(&self, id: StencilMaterialId) -> &M {
        self.get(id).expect("dangling StencilMaterialId")
    }
}
