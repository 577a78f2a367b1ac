pub mod client;
pub mod messages;

pub use client::UploadPipeline;
pub use messages::{TriggerOutcome, UploadReceipt};
