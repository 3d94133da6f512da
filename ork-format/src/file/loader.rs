use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use flate2::read::GzDecoder;
use regex::Regex;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::attachment::{
    AttachmentResolver, FileSystemAttachmentResolver, NoopAttachmentResolver, ZipAttachmentResolver,
};
use crate::context::LoadingContext;
use crate::diagnostics::WarningSet;
use crate::document::Document;
use crate::error::{FormatError, GzipCorruption, LoadError};
use crate::format::{self, FormatDescriptor};
use crate::motor::{DatabaseMotorFinder, MotorFinder, MotorSetDatabase};
use crate::options::{FileType, StorageOptions};

/// Bytes inspected when sniffing a stream.
pub const PEEK_LEN: usize = 300;

/// Streams shorter than this are rejected outright.
pub const MIN_PEEK: usize = 10;

/// Maximum number of gzip/zip layers unwrapped before the payload.
pub const MAX_NESTING: usize = 4;

const GZIP_MAGIC: &[u8] = &[0x1F, 0x8B];
const ZIP_MAGIC: &[u8] = b"PK";

static ENTRY_PATTERN: OnceLock<Regex> = OnceLock::new();

fn entry_pattern() -> &'static Regex {
    ENTRY_PATTERN.get_or_init(|| Regex::new(r"(?i)^.*\.(ork|rkt|cdx1)$").expect("Invalid entry pattern"))
}

/// A container layer found around the payload, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    Gzip,
    Zip { entry: String },
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Gzip => f.write_str("gzip"),
            Container::Zip { entry } => write!(f, "zip ({})", entry),
        }
    }
}

/// What a stream turned out to contain, without parsing the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub containers: Vec<Container>,
    pub file_type: FileType,
}

/// The result of a successful load.
#[derive(Debug)]
pub struct LoadedDocument {
    pub document: Document,
    pub warnings: WarningSet,
    pub detection: Detection,
}

/// Detects the container and payload format of a design file and hands the
/// payload to the matching format loader.
///
/// Loaders are built fresh for every call, so one `DocumentLoader` may be
/// shared between threads.
#[derive(Clone)]
pub struct DocumentLoader {
    motor_finder: Arc<dyn MotorFinder + Send + Sync>,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        DocumentLoader::new(DatabaseMotorFinder::new(MotorSetDatabase::default()))
    }
}

impl fmt::Debug for DocumentLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentLoader").finish_non_exhaustive()
    }
}

/// Where the zip layer came from, for resolving attachments against it.
struct ZipOrigin {
    archive: Arc<[u8]>,
    outermost: bool,
}

struct Payload<'r> {
    format: &'static FormatDescriptor,
    stream: Box<dyn Read + 'r>,
    containers: Vec<Container>,
    zip: Option<ZipOrigin>,
}

impl DocumentLoader {
    pub fn new<F: MotorFinder + Send + Sync + 'static>(motor_finder: F) -> Self {
        DocumentLoader {
            motor_finder: Arc::new(motor_finder),
        }
    }

    pub fn with_shared_finder(motor_finder: Arc<dyn MotorFinder + Send + Sync>) -> Self {
        DocumentLoader { motor_finder }
    }

    /// Loads a design from disk. Attachments resolve against the file's zip
    /// container, or its directory when it has none.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<LoadedDocument, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| LoadError::Open(e, path.to_path_buf()))?;
        let file_name = path.file_name().and_then(|n| n.to_str());
        tracing::debug!(path = %path.display(), "loading design file");
        self.load_inner(Box::new(BufReader::new(file)), file_name, Some(path))
    }

    /// Loads a design from an arbitrary stream. Without a known location,
    /// attachments only resolve when the stream is a zip container.
    pub fn load<R: Read>(&self, reader: R, file_name: Option<&str>) -> Result<LoadedDocument, LoadError> {
        self.load_inner(Box::new(reader), file_name, None)
    }

    /// Identifies containers and payload format without parsing the payload.
    pub fn detect<R: Read>(&self, reader: R) -> Result<Detection, LoadError> {
        let payload = unwrap_payload(Box::new(reader))?;
        Ok(Detection {
            containers: payload.containers,
            file_type: payload.format.file_type,
        })
    }

    fn load_inner<'r>(
        &self,
        stream: Box<dyn Read + 'r>,
        file_name: Option<&str>,
        path: Option<&Path>,
    ) -> Result<LoadedDocument, LoadError> {
        let mut payload = unwrap_payload(stream)?;
        let file_type = payload.format.file_type;

        let resolver = attachment_resolver(payload.zip.as_ref(), path);
        tracing::debug!(format = %file_type, resolver = ?resolver, "selected loader");

        let mut context = LoadingContext::new(&*self.motor_finder, resolver);
        let mut loader_warnings = WarningSet::new();
        let loader = (payload.format.loader)();
        loader
            .load(&mut context, &mut payload.stream, file_name, &mut loader_warnings)
            .map_err(|e| LoadError::from_parse(file_type, e))?;

        let mut warnings = WarningSet::new();
        warnings.merge(loader_warnings);

        let mut document = context.into_document();
        document.storage_options = StorageOptions::new(file_type);

        tracing::info!(
            format = %file_type,
            components = document.rocket.components().count(),
            warnings = warnings.len(),
            "loaded design"
        );
        Ok(LoadedDocument {
            document,
            warnings,
            detection: Detection {
                containers: payload.containers,
                file_type,
            },
        })
    }
}

fn attachment_resolver(zip: Option<&ZipOrigin>, path: Option<&Path>) -> Box<dyn AttachmentResolver> {
    match (zip, path) {
        (Some(origin), Some(path)) if origin.outermost => Box::new(ZipAttachmentResolver::open(path)),
        (Some(origin), _) => Box::new(ZipAttachmentResolver::in_memory(origin.archive.clone())),
        (None, Some(path)) => {
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            Box::new(FileSystemAttachmentResolver::new(dir))
        }
        (None, None) => Box::new(NoopAttachmentResolver),
    }
}

/// Reads up to [`PEEK_LEN`] bytes and returns them together with a stream
/// that still yields every byte of the original.
fn peek<'r>(mut stream: Box<dyn Read + 'r>) -> io::Result<(Vec<u8>, Box<dyn Read + 'r>)> {
    let mut head = Vec::with_capacity(PEEK_LEN);
    stream.by_ref().take(PEEK_LEN as u64).read_to_end(&mut head)?;
    let rejoined = Cursor::new(head.clone()).chain(stream);
    Ok((head, Box::new(rejoined)))
}

/// A gzip decoder whose data errors are tagged as corruption of the file.
struct GzipLayer<'r>(GzDecoder<Box<dyn Read + 'r>>);

impl Read for GzipLayer<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
                if !GzipCorruption::tags(&e) =>
            {
                io::Error::new(e.kind(), GzipCorruption(e))
            }
            _ => e,
        })
    }
}

fn unwrap_payload<'r>(mut stream: Box<dyn Read + 'r>) -> Result<Payload<'r>, LoadError> {
    let mut containers = Vec::new();
    let mut zip = None;

    loop {
        let (head, rejoined) = peek(stream)?;
        if head.len() < MIN_PEEK {
            return Err(FormatError::TooShort(head.len()).into());
        }

        let is_container = head.starts_with(GZIP_MAGIC) || head.starts_with(ZIP_MAGIC);
        if is_container && containers.len() >= MAX_NESTING {
            return Err(FormatError::NestingTooDeep(MAX_NESTING).into());
        }

        if head.starts_with(GZIP_MAGIC) {
            tracing::debug!(depth = containers.len(), "unwrapping gzip layer");
            containers.push(Container::Gzip);
            stream = Box::new(GzipLayer(GzDecoder::new(rejoined)));
            continue;
        }

        if head.starts_with(ZIP_MAGIC) {
            let outermost = containers.is_empty();
            let archive = read_all(rejoined)?;
            let (entry, bytes) = find_entry(&archive)?;
            tracing::debug!(depth = containers.len(), %entry, "unwrapping zip layer");
            containers.push(Container::Zip { entry });
            zip = Some(ZipOrigin { archive, outermost });
            stream = Box::new(Cursor::new(bytes));
            continue;
        }

        let format = format::detect(&head).ok_or(FormatError::UnknownSignature)?;
        tracing::debug!(format = %format.file_type, "payload signature matched");
        return Ok(Payload {
            format,
            stream: rejoined,
            containers,
            zip,
        });
    }
}

fn read_all(mut stream: Box<dyn Read + '_>) -> io::Result<Arc<[u8]>> {
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes)?;
    Ok(bytes.into())
}

/// The first entry, in archive order, whose name looks like a design file.
fn find_entry(archive: &Arc<[u8]>) -> Result<(String, Vec<u8>), LoadError> {
    let mut zip = ZipArchive::new(Cursor::new(archive.clone())).map_err(zip_error)?;
    let pattern = entry_pattern();

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(zip_error)?;
        if entry.is_dir() || !pattern.is_match(entry.name()) {
            tracing::trace!(name = entry.name(), "skipping zip entry");
            continue;
        }
        let name = entry.name().to_string();
        let mut bytes = Vec::with_capacity(entry.size().min(1 << 20) as usize);
        entry.read_to_end(&mut bytes)?;
        return Ok((name, bytes));
    }

    Err(FormatError::NoDocumentEntry.into())
}

fn zip_error(error: ZipError) -> LoadError {
    match error {
        ZipError::Io(e) => e.into(),
        other => FormatError::CorruptContainer(other).into(),
    }
}
