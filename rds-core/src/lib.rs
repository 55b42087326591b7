//! rds-core: Pure RDS/RBDS group decode + station state library.
//!
//! No async, no I/O — just algorithms. This crate is the shared core used
//! by `rds-cli` and anything else that wants to turn a stream of 4-block
//! radio-data groups into coherent station metadata: PS/RT/PTYN/Long PS
//! assembly, AF Method-A/B lists, TMC messages, EON records, RT+ tags,
//! clock time, BER, and stability-gated histories.

pub mod af;
pub mod ber;
pub mod charset;
pub mod decode;
pub mod decoder;
pub mod eon;
pub mod frame;
pub mod rtplus;
pub mod snapshot;
pub mod station;
pub mod tmc;
pub mod types;

// Re-export commonly used types at crate root
pub use decoder::{RawGroupRecord, RdsDecoder};
pub use frame::{FrameEvent, FrameIngester};
pub use snapshot::{Snapshot, SnapshotPublisher};
pub use station::StationState;
pub use types::*;
