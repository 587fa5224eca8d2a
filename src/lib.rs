pub mod config;
pub mod custom_field;
pub mod error;
pub mod fetcher;
pub mod importer;
pub mod json_store;
pub mod logging;
pub mod matcher;
pub mod memory_store;
pub mod models;
pub mod orchestrator;
pub mod reset;
pub mod store;

pub use config::ImportConfig;
pub use error::Error;
pub use models::*;

// Store re-exports
pub use json_store::JsonStore;
pub use memory_store::{InMemoryStore, StoreSnapshot};
pub use store::DestinationStore;

// Reconciliation re-exports
pub use custom_field::CustomFieldIndex;
pub use matcher::IssueMatcher;
pub use reset::{ChildRecordReset, ResetSummary};

// Attachment import re-exports
pub use fetcher::{AttachmentFetcher, FetchOutcome};
pub use importer::{AttachmentImport, AttachmentImporter, SkipReason};

// Orchestrator re-exports
pub use orchestrator::{
    ImportOrchestrator, ImportReport, LegacyAttachment, LegacyCustomValue, LegacyRecord,
    SkippedAttachment,
};

pub use logging::init_logging;
