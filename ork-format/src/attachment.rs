//! Resolution of externally referenced files, such as decal images, to byte sources.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zip::ZipArchive;

/// Where the bytes of an attachment live.
#[derive(Clone, PartialEq)]
pub enum AttachmentSource {
    /// A plain file on disk.
    File(PathBuf),
    /// An entry of a zip archive stored on disk. The archive is reopened on every read.
    ZipFile { archive: PathBuf, entry: String },
    /// An entry of a zip archive held in memory.
    ZipMemory { archive: Arc<[u8]>, entry: String },
    /// Bytes held in memory.
    Memory(Arc<[u8]>),
    /// Nothing could be resolved for this name.
    Unresolved,
}

impl fmt::Debug for AttachmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentSource::File(path) => f.debug_tuple("File").field(path).finish(),
            AttachmentSource::ZipFile { archive, entry } => f
                .debug_struct("ZipFile")
                .field("archive", archive)
                .field("entry", entry)
                .finish(),
            AttachmentSource::ZipMemory { archive, entry } => f
                .debug_struct("ZipMemory")
                .field("archive_len", &archive.len())
                .field("entry", entry)
                .finish(),
            AttachmentSource::Memory(bytes) => f.debug_tuple("Memory").field(&bytes.len()).finish(),
            AttachmentSource::Unresolved => f.write_str("Unresolved"),
        }
    }
}

/// A named external resource referenced by a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    name: String,
    source: AttachmentSource,
}

impl Attachment {
    pub fn new<S: Into<String>>(name: S, source: AttachmentSource) -> Attachment {
        Attachment {
            name: name.into(),
            source,
        }
    }

    pub fn in_memory<S: Into<String>>(name: S, bytes: impl Into<Arc<[u8]>>) -> Attachment {
        Attachment::new(name, AttachmentSource::Memory(bytes.into()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &AttachmentSource {
        &self.source
    }

    /// Opens the attachment for reading. Fails with [`io::ErrorKind::NotFound`]
    /// when the resource cannot be located.
    pub fn open(&self) -> io::Result<Box<dyn Read>> {
        match &self.source {
            AttachmentSource::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            AttachmentSource::ZipFile { archive, entry } => {
                let file = BufReader::new(File::open(archive)?);
                read_zip_entry(file, entry).map(|bytes| Box::new(Cursor::new(bytes)) as Box<dyn Read>)
            }
            AttachmentSource::ZipMemory { archive, entry } => {
                read_zip_entry(Cursor::new(archive.clone()), entry)
                    .map(|bytes| Box::new(Cursor::new(bytes)) as Box<dyn Read>)
            }
            AttachmentSource::Memory(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            AttachmentSource::Unresolved => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("attachment '{}' could not be resolved", self.name),
            )),
        }
    }
}

fn read_zip_entry<R: Read + io::Seek>(reader: R, entry: &str) -> io::Result<Vec<u8>> {
    let mut archive = ZipArchive::new(reader).map_err(zip_to_io)?;
    let mut file = archive.by_name(entry).map_err(zip_to_io)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn zip_to_io(error: zip::result::ZipError) -> io::Error {
    match error {
        zip::result::ZipError::Io(e) => e,
        zip::result::ZipError::FileNotFound => {
            io::Error::new(io::ErrorKind::NotFound, "entry not found in archive")
        }
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

/// Turns a referenced name into an [`Attachment`].
pub trait AttachmentResolver: fmt::Debug {
    fn attachment(&self, name: &str) -> Attachment;
}

/// Resolves names relative to a fixed directory.
#[derive(Debug, Clone)]
pub struct FileSystemAttachmentResolver {
    base: PathBuf,
}

impl FileSystemAttachmentResolver {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        FileSystemAttachmentResolver { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl AttachmentResolver for FileSystemAttachmentResolver {
    fn attachment(&self, name: &str) -> Attachment {
        Attachment::new(name, AttachmentSource::File(self.base.join(name)))
    }
}

/// Resolves names as entries of a zip archive.
#[derive(Clone)]
pub struct ZipAttachmentResolver {
    archive: ZipLocation,
}

#[derive(Clone)]
enum ZipLocation {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

impl ZipAttachmentResolver {
    /// Entries are read from the archive at `path`, reopened per request.
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        ZipAttachmentResolver {
            archive: ZipLocation::File(path.into()),
        }
    }

    pub fn in_memory(archive: Arc<[u8]>) -> Self {
        ZipAttachmentResolver {
            archive: ZipLocation::Memory(archive),
        }
    }
}

impl fmt::Debug for ZipAttachmentResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.archive {
            ZipLocation::File(path) => f.debug_tuple("ZipAttachmentResolver").field(path).finish(),
            ZipLocation::Memory(bytes) => f
                .debug_tuple("ZipAttachmentResolver")
                .field(&format_args!("<{} bytes in memory>", bytes.len()))
                .finish(),
        }
    }
}

impl AttachmentResolver for ZipAttachmentResolver {
    fn attachment(&self, name: &str) -> Attachment {
        let source = match &self.archive {
            ZipLocation::File(path) => AttachmentSource::ZipFile {
                archive: path.clone(),
                entry: name.to_string(),
            },
            ZipLocation::Memory(bytes) => AttachmentSource::ZipMemory {
                archive: bytes.clone(),
                entry: name.to_string(),
            },
        };
        Attachment::new(name, source)
    }
}

/// Used when the document has no known location to resolve against.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAttachmentResolver;

impl AttachmentResolver for NoopAttachmentResolver {
    fn attachment(&self, name: &str) -> Attachment {
        Attachment::new(name, AttachmentSource::Unresolved)
    }
}
