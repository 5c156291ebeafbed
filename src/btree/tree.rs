//! # Copy-on-Write B+Tree Engine
//!
//! The recursive search / insert / delete / traverse algorithms over pages
//! held in a [`PageStore`]. The tree owns one root identifier; everything
//! else is reachable through internal-node child slots.
//!
//! ## Mutation Shape
//!
//! No page is ever modified in place. An insert descends to the target leaf,
//! rebuilds it (possibly past one page), and on the way back up splits the
//! result into one to three page-sized nodes, rebuilding each parent with
//! fresh child slots. Replacement pages are allocated before the originals
//! are freed, and the root identifier is swapped last:
//!
//! ```text
//! insert(k, v):
//!   1. descend to the leaf whose range covers k
//!   2. rebuild the leaf with k inserted or updated (may overflow)
//!   3. split into 1..=3 page-sized nodes
//!   4. rebuild each ancestor, pointing at freshly allocated children
//!   5. free the replaced pages; swap the root identifier
//! ```
//!
//! Deletes mirror that shape with merging instead of splitting: a child that
//! shrinks to a quarter page is concatenated with a sibling when the result
//! fits one page, preferring the left sibling.
//!
//! ## The Anchor Record
//!
//! The first insert seeds the root leaf with a zero-length key at slot 0.
//! That key is the minimum of the key space, so predecessor lookup from the
//! root always lands on some slot and descent never falls off the left edge.
//! Splits keep the anchor in the leftmost leaf and delete refuses to remove
//! it, so the property is permanent. Traversal knows to skip it.
//!
//! ## Concurrency
//!
//! The engine assumes one operation at a time; `&mut self` on the mutating
//! operations enforces it within a process, and the database facade adds a
//! reader-writer lock across threads.

use eyre::Result;
use tracing::trace;

use super::node::{Node, PageTag, NODE_HEADER_SIZE};
use super::{ops, TreeConfig};
use crate::storage::{PageId, PageStore};

pub struct BTree<S> {
    store: S,
    root: PageId,
    cfg: TreeConfig,
}

enum MergeDir {
    Left,
    Right,
}

impl<S: PageStore> BTree<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, TreeConfig::default())
    }

    pub fn with_config(store: S, cfg: TreeConfig) -> Self {
        cfg.check();
        Self {
            store,
            root: PageId::NONE,
            cfg,
        }
    }

    pub fn root(&self) -> PageId {
        self.root
    }

    pub fn config(&self) -> TreeConfig {
        self.cfg
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn load(&self, id: PageId) -> Result<Node> {
        Ok(Node::from_bytes(self.store.read(id)?))
    }

    /// Point lookup. Returns the stored value, or `None` when the key is
    /// absent.
    pub fn search(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if self.root.is_none() {
            return Ok(None);
        }

        let mut node = self.load(self.root)?;
        loop {
            let Some(idx) = node.lookup_le(key) else {
                return Ok(None);
            };
            match node.tag() {
                PageTag::Leaf => {
                    return Ok((node.key(idx) == key).then(|| node.value(idx).to_vec()));
                }
                PageTag::Internal => {
                    node = self.load(node.child(idx))?;
                }
            }
        }
    }

    /// Inserts `key` or updates its value when already present.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if self.root.is_none() {
            let mut root = Node::new(self.cfg.page_size);
            // Slot 0 is the zero-length anchor covering the whole key space.
            // A zero-length key IS the anchor slot, so it must not be
            // duplicated next to it.
            if key.is_empty() {
                root.set_header(PageTag::Leaf, 1);
                ops::append_kv(&mut root, 0, PageId::NONE, b"", value);
            } else {
                root.set_header(PageTag::Leaf, 2);
                ops::append_kv(&mut root, 0, PageId::NONE, b"", b"");
                ops::append_kv(&mut root, 1, PageId::NONE, key, value);
            }
            self.root = self.store.allocate(root.as_bytes())?;
            trace!(root = %self.root, "btree.root_seeded");
            return Ok(());
        }

        let old_root = self.root;
        let root = self.load(old_root)?;
        let grown = self.insert_rec(&root, key, value)?;
        let parts = ops::split3(grown, self.cfg);

        let new_root = if parts.len() == 1 {
            self.store.allocate(parts[0].as_bytes())?
        } else {
            // The root itself split; grow the tree by one level.
            trace!(parts = parts.len(), "btree.root_split");
            let mut root = Node::new(self.cfg.page_size);
            root.set_header(PageTag::Internal, parts.len() as u16);
            for (i, part) in parts.iter().enumerate() {
                let id = self.store.allocate(part.as_bytes())?;
                ops::append_kv(&mut root, i as u16, id, part.key(0), &[]);
            }
            self.store.allocate(root.as_bytes())?
        };

        self.store.free(old_root)?;
        self.root = new_root;
        Ok(())
    }

    /// Rebuilds the subtree under `node` with (`key`, `value`) applied. The
    /// returned node may exceed one page; the caller splits it.
    fn insert_rec(&mut self, node: &Node, key: &[u8], value: &[u8]) -> Result<Node> {
        match node.tag() {
            PageTag::Leaf => Ok(match node.lookup_le(key) {
                Some(idx) if node.key(idx) == key => {
                    ops::leaf_update(node, idx, key, value, self.cfg)
                }
                Some(idx) => ops::leaf_insert(node, idx + 1, key, value, self.cfg),
                None => ops::leaf_insert(node, 0, key, value, self.cfg),
            }),
            PageTag::Internal => {
                let idx = node
                    .lookup_le(key)
                    .expect("descent reached an internal page with no slot <= key");
                let child_id = node.child(idx);
                let child = self.load(child_id)?;

                let grown = self.insert_rec(&child, key, value)?;
                let parts = ops::split3(grown, self.cfg);
                let replaced =
                    self.replace_kid_n(node, idx, &parts, 2 * self.cfg.page_size)?;

                self.store.free(child_id)?;
                Ok(replaced)
            }
        }
    }

    /// Internal page with slot `idx` replaced by one slot per entry of
    /// `kids`, each freshly allocated and keyed by its first key.
    fn replace_kid_n(
        &mut self,
        parent: &Node,
        idx: u16,
        kids: &[Node],
        buf_size: usize,
    ) -> Result<Node> {
        let n = parent.entry_count();
        let inc = kids.len() as u16;

        let mut dst = Node::new(buf_size);
        dst.set_header(PageTag::Internal, n + inc - 1);
        ops::append_range(&mut dst, parent, 0, 0, idx);
        for (i, kid) in kids.iter().enumerate() {
            let id = self.store.allocate(kid.as_bytes())?;
            ops::append_kv(&mut dst, idx + i as u16, id, kid.key(0), &[]);
        }
        ops::append_range(&mut dst, parent, idx + inc, idx + 1, n - idx - 1);
        Ok(dst)
    }

    /// Removes `key`. Returns whether it was present.
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        if self.root.is_none() {
            return Ok(false);
        }

        let old_root = self.root;
        let root = self.load(old_root)?;
        match self.delete_rec(&root, key)? {
            None => Ok(false),
            Some(updated) => {
                self.root = self.store.allocate(updated.as_bytes())?;
                self.store.free(old_root)?;
                Ok(true)
            }
        }
    }

    /// Rebuilds the subtree under `node` with `key` removed, or reports the
    /// key absent with `None`.
    fn delete_rec(&mut self, node: &Node, key: &[u8]) -> Result<Option<Node>> {
        match node.tag() {
            PageTag::Leaf => {
                let Some(idx) = node.lookup_le(key) else {
                    return Ok(None);
                };
                // The zero-length anchor stays for the lifetime of the tree.
                if key.is_empty() || node.key(idx) != key {
                    return Ok(None);
                }
                Ok(Some(ops::leaf_remove(node, idx, self.cfg)))
            }
            PageTag::Internal => {
                let idx = node
                    .lookup_le(key)
                    .expect("descent reached an internal page with no slot <= key");
                let child_id = node.child(idx);
                let child = self.load(child_id)?;

                let Some(updated) = self.delete_rec(&child, key)? else {
                    return Ok(None);
                };

                let rebuilt = match self.merge_candidate(node, idx, &updated)? {
                    Some((MergeDir::Left, sibling)) => {
                        trace!(slot = idx, "btree.merge_left");
                        let merged = ops::merge(&sibling, &updated, self.cfg);
                        let merged_id = self.store.allocate(merged.as_bytes())?;
                        let out = ops::replace_two_kids(
                            node,
                            idx - 1,
                            merged_id,
                            merged.key(0),
                            self.cfg,
                        );
                        self.store.free(node.child(idx - 1))?;
                        out
                    }
                    Some((MergeDir::Right, sibling)) => {
                        trace!(slot = idx, "btree.merge_right");
                        let merged = ops::merge(&updated, &sibling, self.cfg);
                        let merged_id = self.store.allocate(merged.as_bytes())?;
                        let out =
                            ops::replace_two_kids(node, idx, merged_id, merged.key(0), self.cfg);
                        self.store.free(node.child(idx + 1))?;
                        out
                    }
                    None if updated.entry_count() == 0 => {
                        // An empty child with no mergeable sibling can only be
                        // an only child; emptiness bubbles up one level.
                        assert!(
                            node.entry_count() == 1 && idx == 0,
                            "empty child with siblings escaped merging"
                        );
                        let mut empty = Node::new(self.cfg.page_size);
                        empty.set_header(PageTag::Internal, 0);
                        empty
                    }
                    None => self.replace_kid_n(
                        node,
                        idx,
                        std::slice::from_ref(&updated),
                        self.cfg.page_size,
                    )?,
                };

                self.store.free(child_id)?;
                Ok(Some(rebuilt))
            }
        }
    }

    /// Decides whether the shrunken child at `idx` should be concatenated
    /// with a sibling: it must be down to a quarter page and the combined
    /// page must fit.
    fn merge_candidate(
        &self,
        parent: &Node,
        idx: u16,
        updated: &Node,
    ) -> Result<Option<(MergeDir, Node)>> {
        if updated.used_bytes() > self.cfg.page_size / 4 {
            return Ok(None);
        }

        if idx > 0 {
            let sibling = self.load(parent.child(idx - 1))?;
            let merged = sibling.used_bytes() + updated.used_bytes() - NODE_HEADER_SIZE;
            if merged <= self.cfg.page_size {
                return Ok(Some((MergeDir::Left, sibling)));
            }
        }

        if idx + 1 < parent.entry_count() {
            let sibling = self.load(parent.child(idx + 1))?;
            let merged = sibling.used_bytes() + updated.used_bytes() - NODE_HEADER_SIZE;
            if merged <= self.cfg.page_size {
                return Ok(Some((MergeDir::Right, sibling)));
            }
        }

        Ok(None)
    }

    /// Visits every stored pair in ascending key order. The anchor record is
    /// not yielded.
    pub fn traverse<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]),
    {
        if self.root.is_none() {
            return Ok(());
        }
        let root = self.load(self.root)?;
        self.traverse_rec(&root, true, &mut visit)
    }

    fn traverse_rec<F>(&self, node: &Node, leftmost: bool, visit: &mut F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]),
    {
        match node.tag() {
            PageTag::Leaf => {
                // The leftmost leaf carries the anchor in slot 0.
                let start = if leftmost { 1 } else { 0 };
                for i in start..node.entry_count() {
                    visit(node.key(i), node.value(i));
                }
            }
            PageTag::Internal => {
                for i in 0..node.entry_count() {
                    let child = self.load(node.child(i))?;
                    self.traverse_rec(&child, leftmost && i == 0, visit)?;
                }
            }
        }
        Ok(())
    }
}
