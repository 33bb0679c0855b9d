// Job lifecycle
//
// - Model: job record, status machine and partial updates
// - Store: concurrency-safe in-memory registry
// - Orchestrator: drives a job through download, transcription and translation
// - Result: playback bundle of a finished job

pub mod model;
pub mod orchestrator;
pub mod result;
pub mod store;

pub use model::{Job, JobStatus, JobUpdate, VideoInfo};
pub use orchestrator::{Pipeline, ProcessRequest, SubmittedJob};
pub use result::{ResultAssembler, VideoBundle};
pub use store::{JobStats, JobStore};
