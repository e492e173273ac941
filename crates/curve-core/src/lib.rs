//! Active-time accounting core for per-file focus tracking.
//!
//! This crate contains the state machine that decides when a focus session
//! on a file starts and ends, and how elapsed time is committed:
//! - Clock: epoch-millisecond timestamps
//! - Focus tracking: a single transition function over [`TrackerEvent`]s
//! - Accumulation: per-file totals that only ever grow
//! - Flushing: converting the open session into a delta and persisting it
//! - Report delivery: handing a finalized snapshot to a renderer

mod accumulator;
pub mod clock;
mod flush;
pub mod report;
mod session;
pub mod store;
mod tracker;
pub mod types;

pub use accumulator::{AccumulatedTime, Accumulator};
pub use clock::{Clock, SystemClock, Timestamp};
pub use flush::{ClosedSession, FlushController, FlushOutcome};
pub use report::{CommitData, DEFAULT_RESEND_DELAY, DeliveryMode, RendererMessage, ReportDelivery};
pub use session::FocusSession;
pub use store::{DurableStore, MemoryStore, RECORD_KEY, StoreError};
pub use tracker::{Tracker, TrackerEvent};
pub use types::{FileId, ValidationError};
