//! In-memory page store backed by a hash map.
//!
//! Identifiers come from a monotonically increasing counter starting at 1,
//! so they are never zero and never reused. Unlike the file-backed store,
//! `free` really removes the binding; a read or double free of a released
//! page surfaces as an error instead of silently returning stale bytes.

use std::collections::HashMap;

use eyre::{ensure, eyre, Result};

use super::{PageId, PageStore};

#[derive(Debug)]
pub struct MemStore {
    pages: HashMap<u64, Vec<u8>>,
    next_id: u64,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            next_id: 1,
        }
    }

    /// Number of live (allocated and not yet freed) pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.pages.contains_key(&id.as_raw())
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStore for MemStore {
    fn read(&self, id: PageId) -> Result<Vec<u8>> {
        self.pages
            .get(&id.as_raw())
            .cloned()
            .ok_or_else(|| eyre!("page {} is not allocated", id))
    }

    fn allocate(&mut self, page: &[u8]) -> Result<PageId> {
        let id = self.next_id;
        self.next_id += 1;
        self.pages.insert(id, page.to_vec());
        Ok(PageId::from_raw(id))
    }

    fn free(&mut self, id: PageId) -> Result<()> {
        ensure!(
            self.pages.remove(&id.as_raw()).is_some(),
            "freeing unallocated page {}",
            id
        );
        Ok(())
    }
}
