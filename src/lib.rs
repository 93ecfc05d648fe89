// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod deliver;
pub mod enrich;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod workdir;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::config::{MailConfig, SearchConfig};
pub use crate::deliver::{Mailer, OutgoingMessage};
pub use crate::enrich::{EnrichedItem, Enricher};
pub use crate::source::{RawItem, SourceAdapter};
pub use crate::workdir::RunWorkdir;
