//! Write-Ahead Log (WAL) Module
//!
//! Provides durability for everything still held in the in-memory index.
//!
//! ## Responsibilities
//! - Append a log entry for every Set/Delete applied to the index
//! - Append a watermark after every successful flush
//! - Replay only the entries after the last watermark on startup
//! - Fail loudly on a truncated or malformed tail
//!
//! ## File Format
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │ Entry                                                     │
//! │ ┌─────────┬───────────┬─────┬─────────────┬───────┐       │
//! │ │ Cmd (4) │ KeyLen (4)│ Key │ ValueLen (4)│ Value │       │
//! │ └─────────┴───────────┴─────┴─────────────┴───────┘       │
//! ├───────────────────────────────────────────────────────────┤
//! │ ... more entries ...                                      │
//! ├───────────────────────────────────────────────────────────┤
//! │ "WATERMARK" (9 bytes, after each flush)                   │
//! ├───────────────────────────────────────────────────────────┤
//! │ ... entries not yet flushed ...                           │
//! └───────────────────────────────────────────────────────────┘
//! ```
//! Integers are big-endian; Cmd is 0 for Set and 1 for Delete. There is no
//! per-entry or running checksum: the data the watermark vouches for is
//! already protected by the SSTable checksum.

mod entry;
mod log;
mod reader;
mod recovery;
mod writer;

pub use entry::{Command, WalEntry, HEADER_SIZE, WATERMARK};
pub use log::Wal;
pub use reader::{find_last_watermark, WalIterator, WalReader, WalRecord};
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::WalWriter;
