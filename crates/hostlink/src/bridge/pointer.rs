// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generational pointer table.
//!
//! Maps opaque integer handles to live host objects without keeping them alive. A handle
//! packs a slot index (low 32 bits) and the slot's generation (high bits); the generation
//! is bumped whenever a slot is reclaimed, so a handle to a dead object can never resolve
//! to whatever later occupies the same slot.
//!
//! Handles stay below `i64::MAX` so they survive any JSON number round trip, and `0` is
//! never issued.

use super::host::{object_identity, HostObject};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

const INDEX_BITS: u32 = 32;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;
const MAX_GENERATION: u32 = i32::MAX as u32;

/// Opaque object handle as seen by the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u64);

impl Handle {
    /// Never issued by any table.
    pub const INVALID: Handle = Handle(0);

    fn new(index: u32, generation: u32) -> Self {
        Self((u64::from(generation) << INDEX_BITS) | u64::from(index))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn index(self) -> u32 {
        (self.0 & INDEX_MASK) as u32
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn generation(self) -> u32 {
        (self.0 >> INDEX_BITS) as u32
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Entry {
    object: Weak<dyn HostObject>,
    identity: usize,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Handle <-> object registry with weak retention.
pub struct PointerTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_identity: HashMap<usize, Handle>,
    sweep_threshold: usize,
    next_sweep_at: usize,
}

impl Default for PointerTable {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl fmt::Debug for PointerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerTable")
            .field("slots", &self.slots.len())
            .field("entries", &self.len())
            .field("free", &self.free.len())
            .finish()
    }
}

impl PointerTable {
    /// Table that sweeps dead entries once `sweep_threshold` entries are held.
    pub fn new(sweep_threshold: usize) -> Self {
        let sweep_threshold = sweep_threshold.max(1);
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_identity: HashMap::new(),
            sweep_threshold,
            next_sweep_at: sweep_threshold,
        }
    }

    /// Handle for `object`, registering it on first sight.
    ///
    /// The same live object always yields the same handle. The table keeps only a `Weak`.
    pub fn encode(&mut self, object: &Arc<dyn HostObject>) -> Handle {
        let identity = object_identity(object);
        if let Some(&handle) = self.by_identity.get(&identity) {
            if self.entry(handle).is_some_and(|e| e.object.strong_count() > 0) {
                return handle;
            }
            // Stale entry under this identity.
            self.release(handle);
        }

        if self.len() >= self.next_sweep_at {
            self.sweep();
            self.next_sweep_at = (self.len() * 2).max(self.sweep_threshold);
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
                self.slots.push(Slot {
                    generation: 1,
                    entry: None,
                });
                index
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.entry = Some(Entry {
            object: Arc::downgrade(object),
            identity,
        });
        let handle = Handle::new(index, slot.generation);
        self.by_identity.insert(identity, handle);
        trace!(%handle, type_name = object.type_identifier(), "handle registered");
        handle
    }

    /// Object behind `handle`, or `None` if it was never issued or its object is gone.
    pub fn decode(&self, handle: Handle) -> Option<Arc<dyn HostObject>> {
        self.entry(handle)?.object.upgrade()
    }

    /// Reclaim slots whose objects have been dropped. Returns how many were freed.
    pub fn sweep(&mut self) -> usize {
        let mut dead = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(entry) = &slot.entry {
                if entry.object.strong_count() == 0 {
                    dead.push(Handle::new(
                        u32::try_from(index).unwrap_or(u32::MAX),
                        slot.generation,
                    ));
                }
            }
        }
        for handle in &dead {
            self.release(*handle);
        }
        if !dead.is_empty() {
            debug!(freed = dead.len(), remaining = self.len(), "pointer table swept");
        }
        dead.len()
    }

    /// Registered entries, dead or alive.
    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    /// Entries whose objects are still alive.
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|s| s.entry.as_ref())
            .filter(|e| e.object.strong_count() > 0)
            .count()
    }

    fn entry(&self, handle: Handle) -> Option<&Entry> {
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.entry.as_ref()
    }

    fn release(&mut self, handle: Handle) {
        let index = handle.index();
        let Some(slot) = self.slots.get_mut(index as usize) else {
            return;
        };
        if slot.generation != handle.generation() {
            return;
        }
        if let Some(entry) = slot.entry.take() {
            if self.by_identity.get(&entry.identity) == Some(&handle) {
                self.by_identity.remove(&entry.identity);
            }
            slot.generation = if slot.generation >= MAX_GENERATION {
                1
            } else {
                slot.generation + 1
            };
            self.free.push(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::memory::MemoryObject;

    fn object(ty: &str) -> Arc<dyn HostObject> {
        Arc::new(MemoryObject::new(ty))
    }

    #[test]
    fn test_encode_is_idempotent() {
        let mut table = PointerTable::default();
        let a = object("Object");
        let b = object("Object");
        let ha = table.encode(&a);
        assert_eq!(table.encode(&a), ha);
        assert_ne!(table.encode(&b), ha);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_handle_never_zero() {
        let mut table = PointerTable::default();
        let a = object("Object");
        let h = table.encode(&a);
        assert_ne!(h, Handle::INVALID);
        assert!(h.raw() < i64::MAX as u64);
        assert!(table.decode(Handle::INVALID).is_none());
    }

    #[test]
    fn test_weak_retention() {
        let mut table = PointerTable::default();
        let a = object("Mesh");
        let weak = Arc::downgrade(&a);
        let h = table.encode(&a);
        drop(a);
        assert!(weak.upgrade().is_none());
        assert!(table.decode(h).is_none());
    }

    #[test]
    fn test_sweep_bumps_generation() {
        let mut table = PointerTable::default();
        let a = object("Mesh");
        let old = table.encode(&a);
        drop(a);
        assert_eq!(table.sweep(), 1);
        assert!(table.is_empty());

        let b = object("Curve");
        let new = table.encode(&b);
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert!(table.decode(old).is_none());
        assert_eq!(table.decode(new).unwrap().type_identifier(), "Curve");
    }

    #[test]
    fn test_threshold_triggers_sweep() {
        let mut table = PointerTable::new(4);
        for _ in 0..4 {
            let temp = object("Temp");
            table.encode(&temp);
        }
        assert_eq!(table.live_count(), 0);
        let keep = object("Keep");
        let h = table.encode(&keep);
        assert_eq!(table.len(), 1);
        assert!(table.decode(h).is_some());
    }

    #[test]
    fn test_forged_handles_rejected() {
        let mut table = PointerTable::default();
        let a = object("Scene");
        let h = table.encode(&a);
        assert!(table.decode(Handle::from_raw(h.raw() + 1)).is_none());
        assert!(table.decode(Handle::from_raw(h.raw() + (1 << 32))).is_none());
        assert!(table.decode(Handle::from_raw(7)).is_none());
    }
}
