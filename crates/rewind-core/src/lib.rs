// ABOUTME: Core library for rewind, containing change records, actions, and pure history folding.
// ABOUTME: Reconstruction, replay, diff, and feed summaries live here so storage stays a thin query layer.

pub mod action;
pub mod clock;
pub mod diff;
pub mod error;
pub mod record;
pub mod replay;
pub mod state;
pub mod summary;
pub mod timestamp;

pub use action::Action;
pub use clock::{Clock, ManualClock, SystemClock};
pub use diff::{FieldChange, FieldChanges, StateDiff, diff_states};
pub use error::CoreError;
pub use record::{ChangeRecord, EntityState, NewChange};
pub use replay::{Replay, ReplayPolicy, ReplayState, ReplayStep, ReplaySteps};
pub use state::{DELETED_AT_MARKER, DELETED_MARKER, StateAt, strip_markers};
pub use summary::{action_verb, display_name, summarize};
pub use timestamp::{format_timestamp, parse_timestamp};
