//! # burrowkv
//!
//! An embedded, single-node key-value storage engine built on the classic
//! log-structured merge design:
//! - Binary search tree index with tombstones for recent writes
//! - Write-Ahead Log (WAL) with watermark-bounded replay for durability
//! - Immutable, checksummed SSTables written on flush
//! - Pairwise compaction that merges SSTables two at a time
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Caller (shell / service)                  │
//! │                 get / set / delete (+ flush)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         Engine                               │
//! │              (one coarse RwLock over the index)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTable   │
//!   │  (Append +  │          │   (BST +    │
//!   │  watermark) │          │ tombstones) │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ flush
//!                                   ▼
//!                           ┌─────────────┐
//!                           │   Storage   │
//!                           │ (SSTables + │
//!                           │ compaction) │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod codec;

pub mod wal;
pub mod memtable;
pub mod storage;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BurrowError, Result};
pub use config::Config;
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of burrowkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
