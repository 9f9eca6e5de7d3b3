/*!
 * Generational Slot Map
 * Index + generation table backing arena and object identities
 */

use crate::core::types::{RawId, SlotKey};

/// Why a key did not resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotMiss {
    /// The slot existed under this generation and has since been released
    Released,
    /// The key never named a live slot in this table
    Unknown,
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot table mapping generational keys to owned values
///
/// Released slots are recycled through a free list with a bumped
/// generation, so a key held past its release resolves to
/// [`SlotMiss::Released`] instead of the slot's next tenant. A slot whose
/// generation would wrap is retired for good.
pub struct SlotMap<K: SlotKey, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    _key: std::marker::PhantomData<fn() -> K>,
}

impl<K: SlotKey, T> SlotMap<K, T> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _key: std::marker::PhantomData,
        }
    }

    /// Insert a value built from its own key
    pub fn insert_with(&mut self, build: impl FnOnce(K) -> T) -> K {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        let key = K::from_raw_id(RawId::new(index, slot.generation));
        slot.value = Some(build(key));
        self.len += 1;
        key
    }

    pub fn insert(&mut self, value: T) -> K {
        self.insert_with(|_| value)
    }

    pub fn get(&self, key: K) -> Result<&T, SlotMiss> {
        let id = key.raw_id();
        let slot = self
            .slots
            .get(id.index() as usize)
            .ok_or(SlotMiss::Unknown)?;
        match (&slot.value, slot.generation.cmp(&id.generation())) {
            (Some(value), std::cmp::Ordering::Equal) => Ok(value),
            (None, std::cmp::Ordering::Equal) => Err(SlotMiss::Unknown),
            (_, std::cmp::Ordering::Greater) => Err(SlotMiss::Released),
            (_, std::cmp::Ordering::Less) => Err(SlotMiss::Unknown),
        }
    }

    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_ok()
    }

    /// Release the value behind a key
    ///
    /// The generation is bumped so the key goes stale. Removing an already
    /// removed key returns [`SlotMiss::Released`] and changes nothing.
    pub fn remove(&mut self, key: K) -> Result<T, SlotMiss> {
        self.get(key)?;
        let index = key.raw_id().index();
        let slot = &mut self.slots[index as usize];
        let value = slot.value.take().ok_or(SlotMiss::Unknown)?;
        slot.generation = slot.generation.wrapping_add(1);
        // A wrapped generation would make epoch-0 keys live again
        if slot.generation != 0 {
            self.free.push(index);
        }
        self.len -= 1;
        Ok(value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live values in slot order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| slot.value.as_ref())
    }
}

impl<K: SlotKey, T> Default for SlotMap<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
