pub mod artifacts;
pub mod best_effort;
pub mod events;
pub mod media;
pub mod status;

pub use artifacts::{ArtifactKind, ArtifactSet};
pub use best_effort::BestEffort;
pub use events::{
    LogEntry, LogLevel, LogStream, ProcessExit, ScanCompletion, ScanEvent,
    classify,
};
pub use media::{MediaKey, MediaType};
pub use status::{ScanState, ScanStatus};
