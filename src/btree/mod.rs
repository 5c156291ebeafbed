//! # B+Tree Index
//!
//! A copy-on-write B+tree over fixed-size binary pages. All values live in
//! leaves; internal pages hold separator keys and child identifiers. Keys
//! are ordered by unsigned lexicographic byte comparison.
//!
//! The layers, bottom up:
//!
//! - [`node`]: the page codec, i.e. the binary layout of one page and the
//!   accessors over it.
//! - [`ops`]: node operations that build new pages from old ones (insert,
//!   update, remove, split, merge, slot replacement).
//! - [`tree`]: the engine: recursive descent, root management, and the
//!   interaction with a [`crate::storage::PageStore`].
//!
//! ## Page Shape
//!
//! ```text
//!                 [internal: "" | "k40" | "k80"]
//!                  /            |          \
//!   [leaf: "" .. "k39"]  [leaf: "k40"..]  [leaf: "k80"..]
//! ```
//!
//! The zero-length key at the far left is the anchor record seeded by the
//! first insert; it makes predecessor search total for every probe and is
//! invisible to traversal.

pub mod node;
pub mod ops;
pub mod tree;

pub use node::{Node, PageTag, MAX_KEY_SIZE, MAX_VALUE_SIZE};
pub use tree::BTree;

use node::{CHILD_SIZE, NODE_HEADER_SIZE, OFFSET_SIZE, RECORD_LEN_SIZE};

use crate::storage::PAGE_SIZE;

/// Size parameters of a tree. The defaults match the on-disk format; they
/// are only loosened in tests.
#[derive(Debug, Clone, Copy)]
pub struct TreeConfig {
    pub page_size: usize,
    pub max_key_size: usize,
    pub max_value_size: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            max_key_size: MAX_KEY_SIZE,
            max_value_size: MAX_VALUE_SIZE,
        }
    }
}

impl TreeConfig {
    /// Aborts unless the largest legal record fits a single page together
    /// with its fixed per-entry overhead.
    pub(crate) fn check(&self) {
        let worst = NODE_HEADER_SIZE
            + CHILD_SIZE
            + OFFSET_SIZE
            + RECORD_LEN_SIZE
            + self.max_key_size
            + self.max_value_size;
        assert!(
            worst <= self.page_size,
            "a maximum-size record ({} bytes) does not fit the page size {}",
            worst,
            self.page_size
        );
    }
}
