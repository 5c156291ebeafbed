//! # MossDB: Embedded Ordered Key-Value Store
//!
//! MossDB persists an ordered key-value map to a single file. The core is a
//! copy-on-write B+tree whose nodes are fixed-size pages in a compact
//! self-describing binary format; every mutation writes fresh pages and
//! frees the replaced ones, so an allocated page is never modified.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mossdb::Database;
//!
//! # fn main() -> eyre::Result<()> {
//! let db = Database::open("data/moss.db")?;
//!
//! db.put(b"apple", b"red")?;
//! assert_eq!(db.get(b"apple")?, Some(b"red".to_vec()));
//!
//! db.traverse(|key, value| {
//!     println!("{:?} -> {:?}", key, value);
//! })?;
//!
//! db.delete(b"apple")?;
//! db.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Database (lifecycle,         │
//! │     RwLock, size-cap validation)    │
//! ├─────────────────────────────────────┤
//! │      BTree engine (search /         │
//! │   insert / delete / traverse)       │
//! ├─────────────────────────────────────┤
//! │   Node operations (split / merge /  │
//! │        copy-on-write rebuild)       │
//! ├─────────────────────────────────────┤
//! │     Page codec (binary layout)      │
//! ├─────────────────────────────────────┤
//! │  PageStore (file-backed / memory)   │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Guarantees and Limits
//!
//! - Keys up to 1000 bytes, values up to 3000 bytes, pages of 4096 bytes.
//! - Iteration order is ascending unsigned lexicographic byte order.
//! - Reads share a lock; writes are serialized. The tree itself assumes a
//!   single writer.
//! - The backing file is append-only and keeps no superblock: re-opening a
//!   file starts an empty tree, and freed pages are not reclaimed.
//!
//! ## Module Overview
//!
//! - [`btree`]: page codec, node operations, and the tree engine
//! - [`storage`]: the page-store contract plus file-backed and in-memory
//!   implementations
//! - [`db`]: the public [`Database`] facade

pub mod btree;
pub mod db;
pub mod storage;

pub use db::Database;
pub use storage::{PageId, PageStore};
