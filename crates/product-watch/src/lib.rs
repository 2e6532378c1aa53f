//! ProductWatch: detects the active catalog item in a mutating element tree,
//! extracts and normalizes its title, and reports each distinct change once.

pub mod config;
pub mod debounce;
pub mod diff;
pub mod dispatch;
pub mod dom;
pub mod extractor;
pub mod gate;
pub mod locator;
pub mod normalizer;
pub mod pipeline;
pub mod profile;
pub mod relevance;
pub mod storage;
pub mod types;
pub mod watcher;

pub use config::WatchConfig;
pub use debounce::Debouncer;
pub use diff::diff_documents;
pub use dispatch::{CoordinatorBus, CoordinatorMessage, Dispatcher};
pub use dom::{CompiledSelector, Document, MutationRecord, NodePath};
pub use extractor::{TitleExtractor, TitleStrategy};
pub use gate::ChangeGate;
pub use locator::ActiveItemLocator;
pub use normalizer::TitleNormalizer;
pub use pipeline::{PipelineOutcome, TitlePipeline};
pub use profile::{ProfileOverride, ProfileSet, SelectorProfile};
pub use relevance::MutationWatcher;
pub use storage::{FileTitleStore, MemoryTitleStore, TitleStore, LAST_TITLE_KEY};
pub use types::*;
pub use watcher::{ProductWatcher, WatchCommand, WatchStatus};
