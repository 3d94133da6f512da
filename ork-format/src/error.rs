use std::path::PathBuf;

use crate::options::FileType;

/// The input is not a design file this crate understands.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Unsupported or corrupt file (only {0} bytes could be read).")]
    TooShort(usize),

    #[error("Unsupported or corrupt file (no design document found in zip container).")]
    NoDocumentEntry,

    #[error("Unsupported or corrupt file (unreadable zip container).")]
    CorruptContainer(#[source] zip::result::ZipError),

    #[error("Unsupported or corrupt file (unreadable gzip container).")]
    CorruptGzip(#[source] std::io::Error),

    #[error("Unsupported or corrupt file (unrecognized document signature).")]
    UnknownSignature,

    #[error("Unsupported or corrupt file (containers nested more than {0} levels deep).")]
    NestingTooDeep(usize),
}

/// A format loader rejected the payload.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Malformed XML in input.")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed XML attribute in input.")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Expected a <{expected}> document, found <{found}>.")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("{0}")]
    Malformed(String),

    #[error("Failed to read document.")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Failed to open design file. Path: '{}'", .1.display())]
    Open(#[source] std::io::Error, PathBuf),

    #[error("Failed to read design.")]
    Io(#[source] std::io::Error),

    #[error("Failed to load {format} document.")]
    Parse {
        format: FileType,
        #[source]
        source: ParseError,
    },
}

impl LoadError {
    pub(crate) fn from_parse(format: FileType, error: ParseError) -> LoadError {
        match error {
            ParseError::Io(e) => e.into(),
            source => LoadError::Parse { format, source },
        }
    }

    /// The input itself is bad; retrying will not help.
    pub fn is_format_error(&self) -> bool {
        matches!(self, LoadError::Format(_) | LoadError::Parse { .. })
    }

    /// Reading failed underneath the parser; the file may load on retry.
    pub fn is_io_error(&self) -> bool {
        matches!(self, LoadError::Open(..) | LoadError::Io(_))
    }
}

impl From<std::io::Error> for LoadError {
    fn from(error: std::io::Error) -> Self {
        if GzipCorruption::tags(&error) {
            FormatError::CorruptGzip(error).into()
        } else {
            LoadError::Io(error)
        }
    }
}

/// Wraps a decode failure raised inside a gzip layer, so the bytes are
/// blamed rather than the underlying reader.
#[derive(Debug)]
pub(crate) struct GzipCorruption(pub(crate) std::io::Error);

impl GzipCorruption {
    pub(crate) fn tags(error: &std::io::Error) -> bool {
        error.get_ref().map_or(false, |inner| inner.is::<GzipCorruption>())
    }
}

impl std::fmt::Display for GzipCorruption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for GzipCorruption {}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("Failed to create temporary file. Path: '{}'", .1.display())]
    CreateTemp(#[source] std::io::Error, PathBuf),

    #[error("Failed to write document.")]
    Write(#[from] std::io::Error),

    #[error("Failed to package document as zip.")]
    Package(#[source] zip::result::ZipError),

    #[error("Referenced attachment could not be found. Name: '{name}'")]
    AttachmentNotFound {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move existing file aside. Path: '{}'", .1.display())]
    Backup(#[source] std::io::Error, PathBuf),

    #[error("Unable to move temporary file to destination. Path: '{}'", .1.display())]
    Replace(#[source] std::io::Error, PathBuf),
}

impl SaveError {
    /// The document refers to content that does not exist; the destination was not touched.
    pub fn is_content_error(&self) -> bool {
        matches!(self, SaveError::AttachmentNotFound { .. })
    }
}

impl From<zip::result::ZipError> for SaveError {
    fn from(error: zip::result::ZipError) -> Self {
        match error {
            zip::result::ZipError::Io(e) => SaveError::Write(e),
            other => SaveError::Package(other),
        }
    }
}
