//! Orchestration layer: stateful services coordinating storage, admission
//! arithmetic, and the payment gateway.

pub mod admission;
pub mod materialize;
pub mod merge;
pub mod sweeper;

pub use admission::{ReservationService, ReserveOutcome};
pub use materialize::OrderMaterializer;
pub use merge::{MergeRejection, MergeReport, MergeService};
pub use sweeper::Sweeper;
