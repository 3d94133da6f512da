//! Detection, loading and crash-safe saving of rocket design files.
//!
//! Three payload formats are understood (native OpenRocket, RockSim and
//! RASAero XML), optionally wrapped in gzip or zip containers.

pub mod attachment;
mod context;
pub mod diagnostics;
pub mod document;
mod error;
mod file;
pub mod format;
pub mod motor;
mod options;

pub use context::LoadingContext;
pub use diagnostics::{ErrorSet, Fault, Warning, WarningSet};
pub use document::Document;
pub use error::{FormatError, LoadError, ParseError, SaveError};
pub use file::{
    estimate_file_size, save, save_using, Container, Detection, DocumentLoader, LoadedDocument,
    ProgressWriter, SaveReport, SavingProgress, DOCUMENT_ENTRY, MAX_NESTING, MIN_PEEK, PEEK_LEN,
};
pub use format::{FormatDescriptor, RocketLoader, RocketSaver};
pub use options::{FileType, ParseFileTypeError, StorageOptions};
