//! Category sets for categorical split nodes.
//!
//! A categorical split sends a sample to the distant child when its category
//! is a member of the node's set. All sets of one forest share one encoding:
//!
//! - [`InlineCategories`]: a 32-bit [`InlineCategorySet`] stored directly in
//!   the node value. No indirection, at most 32 categories.
//! - [`ExternalCategories`]: the node value holds an index into the forest's
//!   [`CategoriesStorage`], which packs variable-length bitsets.

use std::fmt::Debug;

// =============================================================================
// CategorySet
// =============================================================================

/// Membership test for a set of category ids.
pub trait CategorySet {
    /// Returns true if `category` is in the set.
    fn contains(&self, category: u32) -> bool;
}

/// Fixed-capacity bitset held inline in a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InlineCategorySet(u32);

impl InlineCategorySet {
    /// Number of category ids representable (`0..CAPACITY`).
    pub const CAPACITY: usize = u32::BITS as usize;

    /// Create a set from its raw bit mask.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Build a set from category ids.
    ///
    /// Returns `None` if any id does not fit in [`Self::CAPACITY`].
    pub fn from_categories(categories: &[u32]) -> Option<Self> {
        let mut bits = 0u32;
        for &category in categories {
            bits |= 1u32.checked_shl(category)?;
        }
        Some(Self(bits))
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl CategorySet for InlineCategorySet {
    #[inline]
    fn contains(&self, category: u32) -> bool {
        category < u32::BITS && (self.0 >> category) & 1 != 0
    }
}

// =============================================================================
// CategoriesStorage
// =============================================================================

/// Packed bitsets for every external category set of a forest.
///
/// - `bitsets`: flat array of u32 words, 32 categories per word
/// - `segments`: per-set `(start_word, n_words)` into `bitsets`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoriesStorage {
    bitsets: Box<[u32]>,
    segments: Box<[(u32, u32)]>,
}

impl CategoriesStorage {
    /// Create empty storage.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create storage from raw words and per-set segments.
    pub fn new(bitsets: Vec<u32>, segments: Vec<(u32, u32)>) -> Self {
        debug_assert!(segments
            .iter()
            .all(|&(start, len)| (start as usize + len as usize) <= bitsets.len()));
        Self {
            bitsets: bitsets.into_boxed_slice(),
            segments: segments.into_boxed_slice(),
        }
    }

    /// Number of stored sets.
    #[inline]
    pub fn n_sets(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Raw bitset words of all sets.
    #[inline]
    pub fn bitsets(&self) -> &[u32] {
        &self.bitsets
    }

    /// Borrow one set, or `None` if `set` is out of range.
    #[inline]
    pub fn get(&self, set: u32) -> Option<CategorySetRef<'_>> {
        let &(start, len) = self.segments.get(set as usize)?;
        let start = start as usize;
        let words = self.bitsets.get(start..start + len as usize)?;
        Some(CategorySetRef { words })
    }
}

/// `(start, n_words)` segment of a set, if both ends are addressable by u32.
fn segment(start: usize, n_words: usize) -> Option<(u32, u32)> {
    let end = start.checked_add(n_words)?;
    u32::try_from(end).ok()?;
    Some((u32::try_from(start).ok()?, u32::try_from(n_words).ok()?))
}

/// Borrowed bitset of one external category set.
#[derive(Debug, Clone, Copy)]
pub struct CategorySetRef<'a> {
    words: &'a [u32],
}

impl CategorySet for CategorySetRef<'_> {
    #[inline]
    fn contains(&self, category: u32) -> bool {
        // word = category / 32, bit = category % 32
        let word = (category >> 5) as usize;
        let bit = category & 31;
        match self.words.get(word) {
            Some(w) => (w >> bit) & 1 != 0,
            // Beyond the stored words: not in the set
            None => false,
        }
    }
}

/// Accumulates external category sets while a forest is being filled.
#[derive(Debug, Default)]
pub struct CategoriesStorageBuilder {
    bitsets: Vec<u32>,
    segments: Vec<(u32, u32)>,
}

impl CategoriesStorageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a set and return its index.
    ///
    /// Returns `None`, leaving the builder unchanged, if the set index or its
    /// word segment no longer fits in u32.
    pub fn push(&mut self, categories: &[u32]) -> Option<u32> {
        let n_words = categories
            .iter()
            .map(|&c| (c >> 5) as usize + 1)
            .max()
            .unwrap_or(0);
        let start = self.bitsets.len();
        let set = u32::try_from(self.segments.len()).ok()?;
        let segment = segment(start, n_words)?;

        self.bitsets.resize(start + n_words, 0);
        for &category in categories {
            self.bitsets[start + (category >> 5) as usize] |= 1 << (category & 31);
        }
        self.segments.push(segment);
        Some(set)
    }

    pub fn build(self) -> CategoriesStorage {
        CategoriesStorage::new(self.bitsets, self.segments)
    }
}

// =============================================================================
// CategoryEncoding
// =============================================================================

/// How a forest stores the category set of each categorical node.
pub trait CategoryEncoding: Copy + Debug + Default + Send + Sync + 'static {
    /// Per-node handle stored in the node value.
    type Handle: Copy + Debug + PartialEq + Send + Sync;

    /// Largest category cardinality this encoding supports.
    const MAX_CATEGORIES: usize;

    /// True if sets live in [`CategoriesStorage`].
    const EXTERNAL: bool;

    /// Encode a set, appending to `storage` if the encoding is external.
    ///
    /// Returns `None` if a category id exceeds the encoding's capacity or
    /// external storage is no longer addressable by u32.
    fn encode(categories: &[u32], storage: &mut CategoriesStorageBuilder) -> Option<Self::Handle>;

    /// Membership test for the set behind `handle`.
    fn contains(handle: Self::Handle, storage: &CategoriesStorage, category: u32) -> bool;

    /// Check that `handle` resolves against `storage`.
    fn resolves(handle: Self::Handle, storage: &CategoriesStorage) -> bool;
}

/// Category sets stored inline as [`InlineCategorySet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineCategories;

impl CategoryEncoding for InlineCategories {
    type Handle = InlineCategorySet;

    const MAX_CATEGORIES: usize = InlineCategorySet::CAPACITY;
    const EXTERNAL: bool = false;

    #[inline]
    fn encode(categories: &[u32], _: &mut CategoriesStorageBuilder) -> Option<Self::Handle> {
        InlineCategorySet::from_categories(categories)
    }

    #[inline]
    fn contains(handle: Self::Handle, _: &CategoriesStorage, category: u32) -> bool {
        handle.contains(category)
    }

    #[inline]
    fn resolves(_: Self::Handle, _: &CategoriesStorage) -> bool {
        true
    }
}

/// Category sets stored in [`CategoriesStorage`], addressed by a u32 index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExternalCategories;

impl CategoryEncoding for ExternalCategories {
    type Handle = u32;

    const MAX_CATEGORIES: usize = u32::MAX as usize;
    const EXTERNAL: bool = true;

    #[inline]
    fn encode(categories: &[u32], storage: &mut CategoriesStorageBuilder) -> Option<Self::Handle> {
        storage.push(categories)
    }

    #[inline]
    fn contains(handle: Self::Handle, storage: &CategoriesStorage, category: u32) -> bool {
        storage.get(handle).is_some_and(|set| set.contains(category))
    }

    #[inline]
    fn resolves(handle: Self::Handle, storage: &CategoriesStorage) -> bool {
        storage.get(handle).is_some()
    }
}

/// Convert a feature value to a category id.
///
/// Negative, fractional or too-large values have no category and never
/// match a set. NaN must be handled as missing before calling this.
#[inline]
pub fn float_to_category(value: f64) -> Option<u32> {
    debug_assert!(
        !value.is_nan(),
        "NaN should be handled as missing value before category conversion"
    );
    if value >= 0.0 && value <= u32::MAX as f64 && value == value.trunc() {
        Some(value as u32)
    } else {
        None
    }
}
