//! Tile selection and the session's event loop.
//!
//! # Architecture
//!
//! ```text
//! viewport source ─┐
//! media callbacks ─┼─► EventSender ─► queue ─► TileScheduler ─► TilePipeline commands
//! UI commands ─────┘                              │
//!                                                 ├─► TrajectoryPredictor
//!                                                 ├─► SyncCoordinator (base ready)
//!                                                 └─► SharedSchedulerStatus
//! ```
//!
//! On each viewport sample the scheduler computes the squared distance from
//! the viewport point (and, when enabled, the forecast point) to every tile
//! center and applies the [`AdmissionPolicy`]. Activation is fire-and-forget;
//! readiness comes back through the same queue.

mod event;
mod policy;
mod status;
mod tile_scheduler;

pub use event::{event_channel, EventSender, SessionEvent};
pub use policy::{AdmissionPolicy, Proximity, SchedulerConfig, DEFAULT_THRESHOLD};
pub use status::{SchedulerStats, SchedulerStatusSnapshot, SharedSchedulerStatus};
pub use tile_scheduler::TileScheduler;
