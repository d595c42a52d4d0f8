//! A dense bitmap over solvable ids, the representation behind package sets.

use crate::id::SolvableId;

const BITS: usize = u64::BITS as usize;

/// A fixed-capacity bit set indexed by [`SolvableId`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Map {
    blocks: Vec<u64>,
    len: usize,
}

impl Map {
    /// Creates an empty map able to hold ids below `len`.
    pub fn new(len: usize) -> Self {
        Self {
            blocks: vec![0; len.div_ceil(BITS)],
            len,
        }
    }

    /// The number of representable ids.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no bit is set.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|&b| b == 0)
    }

    /// Grows the capacity; existing bits are preserved.
    pub fn grow(&mut self, len: usize) {
        if len > self.len {
            self.blocks.resize(len.div_ceil(BITS), 0);
            self.len = len;
        }
    }

    /// Sets the bit for `id`.
    pub fn set(&mut self, id: SolvableId) {
        debug_assert!(id.index() < self.len);
        self.blocks[id.index() / BITS] |= 1 << (id.index() % BITS);
    }

    /// Clears the bit for `id`.
    pub fn clear(&mut self, id: SolvableId) {
        if id.index() < self.len {
            self.blocks[id.index() / BITS] &= !(1 << (id.index() % BITS));
        }
    }

    /// Whether the bit for `id` is set.
    pub fn contains(&self, id: SolvableId) -> bool {
        id.index() < self.len && self.blocks[id.index() / BITS] & (1 << (id.index() % BITS)) != 0
    }

    /// Sets every representable bit.
    pub fn set_all(&mut self) {
        for block in &mut self.blocks {
            *block = u64::MAX;
        }
        self.mask_tail();
    }

    /// Clears every bit.
    pub fn clear_all(&mut self) {
        for block in &mut self.blocks {
            *block = 0;
        }
    }

    /// `self ∪ other`.
    pub fn union_with(&mut self, other: &Map) {
        for (a, b) in self.blocks.iter_mut().zip(&other.blocks) {
            *a |= b;
        }
        self.mask_tail();
    }

    /// `self ∩ other`.
    pub fn intersect_with(&mut self, other: &Map) {
        for (i, a) in self.blocks.iter_mut().enumerate() {
            *a &= other.blocks.get(i).copied().unwrap_or(0);
        }
    }

    /// `self ∖ other`.
    pub fn subtract(&mut self, other: &Map) {
        for (a, b) in self.blocks.iter_mut().zip(&other.blocks) {
            *a &= !b;
        }
    }

    /// The number of set bits.
    pub fn count(&self) -> usize {
        self.blocks.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Iterates over the set ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.blocks.iter().enumerate().flat_map(|(i, &block)| {
            let mut bits = block;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(SolvableId::new(i * BITS + bit))
            })
        })
    }

    fn mask_tail(&mut self) {
        let tail = self.len % BITS;
        if tail != 0 {
            if let Some(last) = self.blocks.last_mut() {
                *last &= (1 << tail) - 1;
            }
        }
    }
}

impl FromIterator<SolvableId> for Map {
    fn from_iter<I: IntoIterator<Item = SolvableId>>(iter: I) -> Self {
        let ids: Vec<_> = iter.into_iter().collect();
        let len = ids.iter().map(|id| id.index() + 1).max().unwrap_or(0);
        let mut map = Map::new(len);
        for id in ids {
            map.set(id);
        }
        map
    }
}
