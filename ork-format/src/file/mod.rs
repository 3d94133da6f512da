//! Reading design files from disk or streams, and writing them back atomically.

mod loader;
mod progress;
mod replace;
mod saver;

pub use self::loader::{
    Container, Detection, DocumentLoader, LoadedDocument, MAX_NESTING, MIN_PEEK, PEEK_LEN,
};
pub use self::progress::{ProgressWriter, SavingProgress};
pub use self::saver::{estimate_file_size, save, save_using, SaveReport, DOCUMENT_ENTRY};
