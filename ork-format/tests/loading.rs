//! Tests for container unwrapping, payload detection and loader routing.

use std::io::{Cursor, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use ork_format::attachment::AttachmentSource;
use ork_format::motor::{DatabaseMotorFinder, Manufacturer, Motor, MotorSetDatabase, MotorType};
use ork_format::{Container, DocumentLoader, FileType, FormatError, LoadError, Warning};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const NATIVE: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<openrocket version="1.9" creator="test">
  <rocket>
    <name>Native</name>
    <subcomponents>
      <stage>
        <name>Sustainer</name>
        <subcomponents>
          <nosecone>
            <name>Nose</name>
            <appearance><decal name="decals/nose.png"/></appearance>
          </nosecone>
        </subcomponents>
      </stage>
    </subcomponents>
  </rocket>
</openrocket>
"#;

const ROCKSIM: &str = r#"<RockSimDocument>
  <FileVersion>4</FileVersion>
  <DesignInformation>
    <RocketDesign>
      <Name>RockSim</Name>
      <StageCount>1</StageCount>
      <Stage3Parts><NoseCone><Name>Nose</Name></NoseCone></Stage3Parts>
    </RocketDesign>
  </DesignInformation>
</RockSimDocument>"#;

const RASAERO: &str = r#"<RASAeroDocument>
  <FileVersion>2</FileVersion>
  <RocketDesign>
    <NoseCone><PartType>NoseCone</PartType></NoseCone>
    <BodyTube><PartType>BodyTube</PartType></BodyTube>
  </RocketDesign>
</RASAeroDocument>"#;

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

fn zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn payloads() -> Vec<(FileType, &'static str, &'static str)> {
    vec![
        (FileType::OpenRocket, NATIVE, "design.ork"),
        (FileType::RockSim, ROCKSIM, "design.rkt"),
        (FileType::RasAero, RASAERO, "design.CDX1"),
    ]
}

/// Every (container, payload) combination routes to the expected loader
#[test]
fn test_routing_for_every_container_and_payload() {
    let loader = DocumentLoader::default();

    for (file_type, payload, entry) in payloads() {
        let plain = payload.as_bytes().to_vec();
        let gzipped = gzip(payload.as_bytes());
        let zipped = zip(&[(entry, payload.as_bytes())]);

        for (bytes, containers) in vec![
            (plain, vec![]),
            (gzipped, vec![Container::Gzip]),
            (zipped, vec![Container::Zip { entry: entry.to_string() }]),
        ] {
            let loaded = loader.load(&bytes[..], None).unwrap();
            assert_eq!(loaded.detection.file_type, file_type);
            assert_eq!(loaded.detection.containers, containers);
            assert_eq!(loaded.document.storage_options.file_type, file_type);
            assert!(loaded.document.rocket.components().count() >= 2);
        }
    }
}

/// A gzip-wrapped native payload is only recognizable after decompression
#[test]
fn test_gzip_native_payload() {
    let bytes = gzip(NATIVE.as_bytes());
    assert!(!bytes.windows(11).any(|w| w == b"<openrocket"));

    let loaded = DocumentLoader::default().load(&bytes[..], Some("design.ork.gz")).unwrap();
    assert_eq!(loaded.document.rocket.name, "Native");
}

/// Too-short and unrecognized streams are format errors, not I/O errors
#[test]
fn test_short_and_unknown_streams() {
    let loader = DocumentLoader::default();

    let err = loader.load(&b"<openrock"[..], None).unwrap_err();
    assert!(matches!(err, LoadError::Format(FormatError::TooShort(9))));
    assert!(err.is_format_error());
    assert!(!err.is_io_error());

    let err = loader.load(&b"0123456789"[..], None).unwrap_err();
    assert!(matches!(err, LoadError::Format(FormatError::UnknownSignature)));
    assert!(!err.is_io_error());

    let err = loader.load(&b""[..], None).unwrap_err();
    assert!(matches!(err, LoadError::Format(FormatError::TooShort(0))));
}

/// Broken gzip data is the file's fault; a failing reader is not
#[test]
fn test_corrupt_gzip_is_a_format_error() {
    let loader = DocumentLoader::default();

    let bare_header = [0x1F, 0x8B, 8, 0, 0, 0, 0, 0, 0, 0xFF];
    let err = loader.load(&bare_header[..], None).unwrap_err();
    assert!(matches!(err, LoadError::Format(FormatError::CorruptGzip(_))), "{:?}", err);
    assert!(err.is_format_error());
    assert!(!err.is_io_error());

    let err = loader.load(&b"\x1f\x8bgarbage!!!"[..], None).unwrap_err();
    assert!(matches!(err, LoadError::Format(FormatError::CorruptGzip(_))), "{:?}", err);
    assert!(!err.is_io_error());

    let packed = gzip(NATIVE.as_bytes());
    let truncated = &packed[..packed.len() / 2];
    let err = loader.load(truncated, None).unwrap_err();
    assert!(matches!(err, LoadError::Format(FormatError::CorruptGzip(_))), "{:?}", err);

    let err = loader.detect(&packed[..16]).unwrap_err();
    assert!(err.is_format_error());
}

struct FailingReader;

impl std::io::Read for FailingReader {
    fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "device gone"))
    }
}

#[test]
fn test_reader_failure_under_gzip_stays_io() {
    let loader = DocumentLoader::default();

    let err = loader.load(FailingReader, None).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));

    let packed = gzip(NATIVE.as_bytes());
    let stream = std::io::Read::chain(&packed[..20], FailingReader);
    let err = loader.load(stream, None).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)), "{:?}", err);
    assert!(err.is_io_error());
}

/// The first entry with a design extension is loaded, in archive order
#[test]
fn test_zip_entry_scan() {
    let loader = DocumentLoader::default();

    let bytes = zip(&[
        ("readme.txt", b"This is not a design, but it is long enough."),
        ("design.ork", NATIVE.as_bytes()),
    ]);
    let loaded = loader.load(&bytes[..], None).unwrap();
    assert_eq!(loaded.detection.file_type, FileType::OpenRocket);
    assert_eq!(
        loaded.detection.containers,
        vec![Container::Zip { entry: "design.ork".into() }]
    );

    let bytes = zip(&[("b.RKT", ROCKSIM.as_bytes()), ("a.ork", NATIVE.as_bytes())]);
    let detection = loader.detect(&bytes[..]).unwrap();
    assert_eq!(detection.file_type, FileType::RockSim);

    let bytes = zip(&[("readme.txt", b"Nothing to see in this archive.")]);
    let err = loader.load(&bytes[..], None).unwrap_err();
    assert!(matches!(err, LoadError::Format(FormatError::NoDocumentEntry)));
}

/// A matching entry whose content is not a known format is rejected
#[test]
fn test_zip_entry_with_unknown_payload() {
    let bytes = zip(&[("design.ork", b"<svg xmlns='http://www.w3.org/2000/svg'/>")]);
    let err = DocumentLoader::default().load(&bytes[..], None).unwrap_err();
    assert!(matches!(err, LoadError::Format(FormatError::UnknownSignature)));
}

/// Nested containers unwrap up to the nesting limit
#[test]
fn test_nested_containers() {
    let loader = DocumentLoader::default();

    let inner = zip(&[("design.ork", NATIVE.as_bytes())]);
    let bytes = gzip(&inner);
    let loaded = loader.load(&bytes[..], None).unwrap();
    assert_eq!(
        loaded.detection.containers,
        vec![Container::Gzip, Container::Zip { entry: "design.ork".into() }]
    );

    // attachments of a nested zip come from the in-memory archive
    let decal = loaded.document.attachments().next().unwrap();
    assert!(matches!(decal.source(), AttachmentSource::ZipMemory { .. }));

    let mut bytes = NATIVE.as_bytes().to_vec();
    for _ in 0..5 {
        bytes = gzip(&bytes);
    }
    let err = loader.load(&bytes[..], None).unwrap_err();
    assert!(matches!(err, LoadError::Format(FormatError::NestingTooDeep(4))));
}

/// A loader's own failure is a parse error carrying the format
#[test]
fn test_parse_errors_name_the_format() {
    let err = DocumentLoader::default()
        .load(&b"<RockSimDocument><FileVersion>4</FileVersion>"[..], None)
        .unwrap_err();
    match err {
        LoadError::Parse { format, .. } => assert_eq!(format, FileType::RockSim),
        other => panic!("unexpected error: {:?}", other),
    }
}

/// Files on disk resolve attachments against their directory or their zip
#[test]
fn test_load_file_attachment_resolvers() {
    let dir = TempDir::new().unwrap();
    let loader = DocumentLoader::default();

    let plain = dir.path().join("plain.ork");
    std::fs::write(&plain, NATIVE).unwrap();
    let loaded = loader.load_file(&plain).unwrap();
    let decal = loaded.document.attachments().next().unwrap();
    assert_eq!(
        decal.source(),
        &AttachmentSource::File(dir.path().join("decals/nose.png"))
    );

    let packaged = dir.path().join("packaged.ork");
    std::fs::write(
        &packaged,
        zip(&[("rocket.ork", NATIVE.as_bytes()), ("decals/nose.png", b"png")]),
    )
    .unwrap();
    let loaded = loader.load_file(&packaged).unwrap();
    let decal = loaded.document.attachments().next().unwrap();
    let mut content = Vec::new();
    std::io::Read::read_to_end(&mut decal.open().unwrap(), &mut content).unwrap();
    assert_eq!(content, b"png");

    // no location, no resolution
    let loaded = loader.load(NATIVE.as_bytes(), None).unwrap();
    let decal = loaded.document.attachments().next().unwrap();
    assert_eq!(decal.source(), &AttachmentSource::Unresolved);

    let err = loader.load_file(dir.path().join("missing.ork")).unwrap_err();
    assert!(matches!(err, LoadError::Open(..)));
    assert!(err.is_io_error());
}

/// Motors referenced by a document are resolved through the loader's finder
#[test]
fn test_motor_digest_disambiguation() {
    let candidate = |digest: &str| Motor {
        manufacturer: Manufacturer::new("Estes"),
        designation: "C6".into(),
        common_name: None,
        motor_type: MotorType::Single,
        diameter: 0.018,
        length: 0.070,
        digest: digest.into(),
    };
    let loader = DocumentLoader::new(DatabaseMotorFinder::new(MotorSetDatabase::new(vec![
        candidate("A"),
        candidate("B"),
    ])));

    let design = |digest: &str| {
        NATIVE.replace(
            "<name>Nose</name>",
            &format!(
                "<name>Nose</name><motormount><motor><designation>C6</designation><digest>{}</digest></motor></motormount>",
                digest
            ),
        )
    };
    let placement = |loaded: &ork_format::LoadedDocument| {
        loaded
            .document
            .rocket
            .components()
            .flat_map(|c| c.motors.iter())
            .next()
            .unwrap()
            .clone()
    };

    let loaded = loader.load(design("B").as_bytes(), None).unwrap();
    assert!(loaded.warnings.is_empty());
    assert_eq!(placement(&loaded).motor.unwrap().digest, "B");

    let loaded = loader.load(design("C").as_bytes(), None).unwrap();
    let differing: Vec<&Warning> = loaded
        .warnings
        .iter()
        .filter(|w| matches!(w, Warning::DifferingThrustCurve { .. }))
        .collect();
    assert_eq!(differing.len(), 1);
    assert_eq!(loaded.warnings.len(), 1);
    assert!(placement(&loaded).motor.is_some());
}
