//! Core identifiers, capacities, and the component-set fingerprint.
//!
//! This module defines the numeric identifier types shared by every part of
//! the store, the compile-time capacity constants, and [`Fingerprint`], the
//! fixed-width bitmask that names a set of component types.
//!
//! ## Design
//!
//! The store is built around:
//!
//! - **Dense columnar storage** addressed by small numeric ids,
//! - **Bitset fingerprints** for archetype identity and query matching,
//! - **Stable, copyable identifiers** for entities, components, and
//!   archetypes.
//!
//! A fingerprint is an array of `u64` words sized from [`MAX_COMPONENTS`],
//! so widening the component id space is a one-constant change. Bit *i* is
//! set exactly when component id *i* is a member of the set. The empty
//! fingerprint is a valid value and names the archetype of entities that
//! carry no components.

/// Identifier for a registered component type.
///
/// Assigned densely from zero, in first-registration order, and never
/// retired for the lifetime of the process.
pub type ComponentId = u16;

/// Index of an archetype inside a world.
///
/// Stable for the lifetime of the world; archetypes are never deleted.
pub type ArchetypeId = u16;

/// Row index inside an archetype's parallel columns.
pub type RowId = u32;

/// Maximum number of distinct component types a process may register.
pub const MAX_COMPONENTS: usize = 128;

/// Number of `u64` words required to hold one bit per component id.
pub const FINGERPRINT_WORDS: usize = (MAX_COMPONENTS + 63) / 64;

const _: [(); 1] = [(); (MAX_COMPONENTS > 0) as usize];
const _: [(); 1] = [(); (MAX_COMPONENTS <= FINGERPRINT_WORDS * 64) as usize];
const _: [(); 1] = [(); (MAX_COMPONENTS <= ComponentId::MAX as usize + 1) as usize];

/// Bitmask over [`ComponentId`]s identifying a set of component types.
///
/// ## Purpose
/// A fingerprint is the identity of an archetype: two entities live in the
/// same archetype exactly when their component sets produce equal
/// fingerprints. Queries are matched with [`Fingerprint::is_superset_of`].
///
/// ## Invariants
/// - Bits at or above [`MAX_COMPONENTS`] are never set.
/// - Equality and hashing are plain word-wise comparisons, so the type is
///   usable as a map key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    words: [u64; FINGERPRINT_WORDS],
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::empty()
    }
}

impl Fingerprint {
    /// The fingerprint of the empty component set.
    #[inline]
    pub const fn empty() -> Self {
        Self { words: [0u64; FINGERPRINT_WORDS] }
    }

    /// Builds a fingerprint from a list of component ids.
    pub fn from_ids(component_ids: &[ComponentId]) -> Self {
        let mut fingerprint = Self::empty();
        for &component_id in component_ids {
            fingerprint.set(component_id);
        }
        fingerprint
    }

    /// Sets the bit for `component_id`.
    #[inline]
    pub fn set(&mut self, component_id: ComponentId) {
        debug_assert!((component_id as usize) < MAX_COMPONENTS);
        let word = (component_id as usize) / 64;
        let bit = (component_id as usize) % 64;
        self.words[word] |= 1u64 << bit;
    }

    /// Clears the bit for `component_id`.
    #[inline]
    pub fn clear(&mut self, component_id: ComponentId) {
        debug_assert!((component_id as usize) < MAX_COMPONENTS);
        let word = (component_id as usize) / 64;
        let bit = (component_id as usize) % 64;
        self.words[word] &= !(1u64 << bit);
    }

    /// Returns `true` if `component_id` is a member of this set.
    #[inline]
    pub fn contains(&self, component_id: ComponentId) -> bool {
        let word = (component_id as usize) / 64;
        let bit = (component_id as usize) % 64;
        (self.words[word] >> bit) & 1 == 1
    }

    /// Returns a copy of this fingerprint with `component_id` added.
    #[inline]
    #[must_use]
    pub fn with(mut self, component_id: ComponentId) -> Self {
        self.set(component_id);
        self
    }

    /// Returns a copy of this fingerprint with `component_id` removed.
    #[inline]
    #[must_use]
    pub fn without(mut self, component_id: ComponentId) -> Self {
        self.clear(component_id);
        self
    }

    /// Returns `true` if no bits are set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Number of component ids in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Returns `true` if every member of `other` is also a member of `self`.
    ///
    /// This is the archetype-matching test: an archetype satisfies a query
    /// when its fingerprint is a superset of the query's.
    #[inline]
    pub fn is_superset_of(&self, other: &Fingerprint) -> bool {
        for (mine, theirs) in self.words.iter().zip(other.words.iter()) {
            if (mine & theirs) != *theirs {
                return false;
            }
        }
        true
    }

    /// Returns `true` if the two sets share at least one member.
    #[inline]
    pub fn intersects(&self, other: &Fingerprint) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(mine, theirs)| (mine & theirs) != 0)
    }

    /// Word-wise intersection of the two sets.
    #[inline]
    #[must_use]
    pub fn intersection(&self, other: &Fingerprint) -> Self {
        let mut words = [0u64; FINGERPRINT_WORDS];
        for index in 0..FINGERPRINT_WORDS {
            words[index] = self.words[index] & other.words[index];
        }
        Self { words }
    }

    /// Members of `self` that are not members of `other`.
    #[inline]
    #[must_use]
    pub fn difference(&self, other: &Fingerprint) -> Self {
        let mut words = [0u64; FINGERPRINT_WORDS];
        for index in 0..FINGERPRINT_WORDS {
            words[index] = self.words[index] & !other.words[index];
        }
        Self { words }
    }

    /// Iterates over the component ids in the set, ascending.
    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.words.iter().enumerate().flat_map(|(word_index, &word)| {
            let base = word_index * 64;
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some((base + tz) as ComponentId)
            })
        })
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Fingerprint")?;
        f.debug_set().entries(self.iter()).finish()
    }
}
