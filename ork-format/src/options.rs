use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The export formats a document can be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    OpenRocket,
    RockSim,
    RasAero,
}

impl Default for FileType {
    fn default() -> Self {
        FileType::OpenRocket
    }
}

impl FileType {
    pub const fn available_variants() -> &'static [&'static str] {
        &["ork", "rocksim", "rasaero"]
    }

    pub const fn extension(self) -> &'static str {
        match self {
            FileType::OpenRocket => "ork",
            FileType::RockSim => "rkt",
            FileType::RasAero => "CDX1",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileType::OpenRocket => "OpenRocket",
            FileType::RockSim => "RockSim",
            FileType::RasAero => "RASAero",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFileTypeError(String);

impl std::error::Error for ParseFileTypeError {}

impl fmt::Display for ParseFileTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown file type: {}", self.0)
    }
}

impl FromStr for FileType {
    type Err = ParseFileTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ork" | "openrocket" => Ok(FileType::OpenRocket),
            "rkt" | "rocksim" => Ok(FileType::RockSim),
            "cdx1" | "rasaero" => Ok(FileType::RasAero),
            _ => Err(ParseFileTypeError(s.to_string())),
        }
    }
}

/// How a document should be written. Savers only ever read these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageOptions {
    pub file_type: FileType,
    /// Deflate level for zip-packaged output, 0 to 9.
    pub compression_level: u8,
    pub save_simulation_data: bool,
    /// Names of referenced images left out of the package for this save.
    pub excluded_images: BTreeSet<String>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        StorageOptions {
            file_type: FileType::OpenRocket,
            compression_level: 9,
            save_simulation_data: true,
            excluded_images: BTreeSet::new(),
        }
    }
}

impl StorageOptions {
    pub fn new(file_type: FileType) -> StorageOptions {
        StorageOptions {
            file_type,
            ..StorageOptions::default()
        }
    }
}
