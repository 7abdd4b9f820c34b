//! Placement-drive round progression: drives, their rounds, and each student's path through
//! them from enrollment to placement or rejection.

pub mod domain;
pub mod drives;
mod error;
pub mod processor;
pub mod progress;
pub mod query;
pub mod report;
pub mod rounds;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    CompanyId, DriveId, DriveStatus, EntryStatus, FinalResult, NewDrive, NewRound,
    OverallStatus, PlacementDrive, PlacementRound, ProgressId, RoundId, RoundProgressEntry,
    RoundStatus, RoundType, StudentId, StudentRoundProgress,
};
pub use drives::DriveDetail;
pub use error::PlacementError;
pub use processor::{Enrollment, RoundCompletion, SelectionUpdate};
pub use progress::{InvariantViolation, ProgressError};
pub use query::StudentRoundSummary;
pub use report::{DriveReport, DriveStatusCounts, RoundCounts};
pub use router::{
    placement_router, CompleteRoundRequest, DriveStatusRequest, MarksRequest, StudentSelection,
};
pub use service::PlacementService;
pub use store::{
    CascadeRemoval, InMemoryPlacementRepository, PlacementRepository, PlacementTables,
    RepositoryError,
};
