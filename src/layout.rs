//! Physical node orderings and the single-step tree navigator.
//!
//! Every node stores one offset. Zero marks a leaf; any other value locates
//! the node's children:
//!
//! - [`TreeLayout::DepthFirst`]: the near child is the next slot and the
//!   offset is the forward distance to the distant child.
//! - [`TreeLayout::BreadthFirst`]: the offset is the tree-local index of the
//!   near child, and the distant child sits right after it.
//!
//! ```text
//!   depth-first            breadth-first
//!   [0] off=4 ──┐          [0] off=1 ──┬─► [1] near
//!   [1] near    │                      └─► [2] distant
//!   [2] ...     │
//!   [3] ...     │
//!   [4] ◄───────┘ distant
//! ```

use crate::repr::IndexWidth;

/// Physical ordering of the nodes of one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TreeLayout {
    /// Near child adjacent, distant child at a forward offset.
    #[default]
    DepthFirst,
    /// Sibling children adjacent at a stored tree-local position.
    BreadthFirst,
}

impl TreeLayout {
    /// Compute the index of the next node after deciding a branch.
    ///
    /// `branch_taken` selects the distant child. Indices are tree-local for
    /// breadth-first trees; depth-first offsets are relative, so any base
    /// works.
    ///
    /// The caller must stop at leaves (`stored_offset == 0`). Debug builds
    /// panic on a leaf; release builds return `index` unchanged so a missed
    /// leaf check stalls in place instead of leaving the tree.
    #[inline]
    pub fn next_index(self, index: usize, stored_offset: usize, branch_taken: bool) -> usize {
        debug_assert!(
            stored_offset != 0,
            "next_index called on leaf node {index}"
        );
        match self {
            TreeLayout::DepthFirst => {
                // index + 1 + (offset - 1) * branch, without underflow at offset 0
                let branch = (branch_taken || stored_offset == 0) as usize;
                (index + 1 + stored_offset * branch) - branch
            }
            TreeLayout::BreadthFirst => {
                if stored_offset == 0 {
                    index
                } else {
                    stored_offset + branch_taken as usize
                }
            }
        }
    }
}

/// Read-only view of the offsets of a single tree.
///
/// Indices passed to and returned from the view are local to the tree
/// (root = 0). The view never exposes nodes of neighbouring trees.
#[derive(Debug, Clone, Copy)]
pub struct TreeView<'a, O: IndexWidth> {
    offsets: &'a [O],
    layout: TreeLayout,
}

impl<'a, O: IndexWidth> TreeView<'a, O> {
    /// Wrap one tree's offsets.
    #[inline]
    pub fn new(offsets: &'a [O], layout: TreeLayout) -> Self {
        Self { offsets, layout }
    }

    /// Number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns true if the tree has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    #[inline]
    pub fn layout(&self) -> TreeLayout {
        self.layout
    }

    /// Stored offset of a node.
    #[inline]
    pub fn offset(&self, index: usize) -> usize {
        self.offsets[index].to_usize()
    }

    /// Check if a node is a leaf.
    #[inline]
    pub fn is_leaf(&self, index: usize) -> bool {
        self.offset(index) == 0
    }

    /// Next node index, with bounds-checked access to the offsets.
    #[inline]
    pub fn next_index(&self, index: usize, branch_taken: bool) -> usize {
        let next = self
            .layout
            .next_index(index, self.offset(index), branch_taken);
        debug_assert!(
            next < self.offsets.len(),
            "child {next} of node {index} outside tree of {} nodes",
            self.offsets.len()
        );
        next
    }

    /// Next node index without bounds checks.
    ///
    /// # Safety
    ///
    /// `index` must be less than [`len`](Self::len) and must not be a leaf.
    #[inline]
    pub unsafe fn next_index_unchecked(&self, index: usize, branch_taken: bool) -> usize {
        // SAFETY: the caller guarantees `index` is in bounds.
        let offset = unsafe { self.offsets.get_unchecked(index) }.to_usize();
        self.layout.next_index(index, offset, branch_taken)
    }

    /// Near and distant child of a split node, or `None` for a leaf.
    #[inline]
    pub fn children(&self, index: usize) -> Option<(usize, usize)> {
        if self.is_leaf(index) {
            None
        } else {
            Some((self.next_index(index, false), self.next_index(index, true)))
        }
    }

    /// Follow branch decisions from the root until a leaf is reached.
    ///
    /// `decide` is called once per split node with that node's local index
    /// and returns whether the distant child is taken.
    #[inline]
    pub fn descend(&self, mut decide: impl FnMut(usize) -> bool) -> usize {
        let mut index = 0;
        while !self.is_leaf(index) {
            index = self.next_index(index, decide(index));
        }
        index
    }
}
