//! Per-format loaders and savers behind a uniform contract, and the ordered
//! signature table the load dispatcher consults.

use std::io::{self, Read, Write};

use crate::context::LoadingContext;
use crate::diagnostics::{ErrorSet, WarningSet};
use crate::document::Document;
use crate::error::ParseError;
use crate::options::{FileType, StorageOptions};

mod native;
mod rasaero;
mod rocksim;
pub(crate) mod xml;

pub use self::native::{NativeLoader, NativeSaver};
pub use self::rasaero::{RasAeroLoader, RasAeroSaver};
pub use self::rocksim::{RockSimLoader, RockSimSaver};

/// Parses one payload format into the context's document.
///
/// Loaders hold no state between calls; a fresh one is built for every load.
pub trait RocketLoader {
    fn load(
        &self,
        context: &mut LoadingContext<'_>,
        source: &mut dyn Read,
        file_name: Option<&str>,
        warnings: &mut WarningSet,
    ) -> Result<(), ParseError>;
}

/// Serializes a document into one export format.
pub trait RocketSaver {
    fn save(
        &self,
        output: &mut dyn Write,
        document: &Document,
        options: &StorageOptions,
        warnings: &mut WarningSet,
        errors: &mut ErrorSet,
    ) -> io::Result<()>;

    /// Rough number of bytes `save` will produce, used for progress reporting.
    fn estimate_file_size(&self, document: &Document, options: &StorageOptions) -> u64;

    /// Whether output is packaged as a zip together with referenced attachments.
    fn packages_attachments(&self) -> bool {
        false
    }
}

/// A registered payload format.
pub struct FormatDescriptor {
    pub file_type: FileType,
    /// Searched for anywhere in the first bytes of the payload.
    pub signature: &'static [u8],
    pub loader: fn() -> Box<dyn RocketLoader>,
    pub saver: fn() -> Box<dyn RocketSaver>,
}

impl FormatDescriptor {
    pub fn matches(&self, head: &[u8]) -> bool {
        contains(head, self.signature)
    }
}

impl std::fmt::Debug for FormatDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatDescriptor")
            .field("file_type", &self.file_type)
            .field("signature", &String::from_utf8_lossy(self.signature))
            .finish()
    }
}

fn native_loader() -> Box<dyn RocketLoader> {
    Box::new(NativeLoader)
}

fn native_saver() -> Box<dyn RocketSaver> {
    Box::new(NativeSaver)
}

fn rocksim_loader() -> Box<dyn RocketLoader> {
    Box::new(RockSimLoader)
}

fn rocksim_saver() -> Box<dyn RocketSaver> {
    Box::new(RockSimSaver)
}

fn rasaero_loader() -> Box<dyn RocketLoader> {
    Box::new(RasAeroLoader)
}

fn rasaero_saver() -> Box<dyn RocketSaver> {
    Box::new(RasAeroSaver)
}

pub static NATIVE: FormatDescriptor = FormatDescriptor {
    file_type: FileType::OpenRocket,
    signature: b"<openrocket",
    loader: native_loader,
    saver: native_saver,
};

pub static ROCKSIM: FormatDescriptor = FormatDescriptor {
    file_type: FileType::RockSim,
    signature: b"<RockSimDoc",
    loader: rocksim_loader,
    saver: rocksim_saver,
};

pub static RASAERO: FormatDescriptor = FormatDescriptor {
    file_type: FileType::RasAero,
    signature: b"<RASAeroDoc",
    loader: rasaero_loader,
    saver: rasaero_saver,
};

/// Registered formats in detection priority order.
pub static FORMATS: [&FormatDescriptor; 3] = [&NATIVE, &ROCKSIM, &RASAERO];

/// The first registered format whose signature occurs in `head`.
pub fn detect(head: &[u8]) -> Option<&'static FormatDescriptor> {
    FORMATS.iter().copied().find(|f| f.matches(head))
}

pub fn descriptor(file_type: FileType) -> &'static FormatDescriptor {
    match file_type {
        FileType::OpenRocket => &NATIVE,
        FileType::RockSim => &ROCKSIM,
        FileType::RasAero => &RASAERO,
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}
