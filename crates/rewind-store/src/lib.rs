// ABOUTME: Persistence layer for rewind: the SQLite change log and the time-travel operations over it.
// ABOUTME: EventStore records changes, reconstructs, replays, diffs, restores, and serves the activity feed.

pub mod audit;
pub mod diff;
pub mod error;
pub mod feed;
pub mod live;
pub mod log;
pub mod migrations;
pub mod reconstruct;
pub mod recorder;
pub mod replay;
pub mod restore;
pub mod store;

pub use audit::{AuditFilter, AuditStats};
pub use error::StoreError;
pub use feed::FeedEntry;
pub use live::LiveTable;
pub use log::ChangeLog;
pub use restore::RestoreOutcome;
pub use store::EventStore;
