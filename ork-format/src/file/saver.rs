use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::progress::{ProgressWriter, SavingProgress};
use super::replace::replace_file_with;
use crate::diagnostics::{ErrorSet, WarningSet};
use crate::document::Document;
use crate::error::SaveError;
use crate::format::{self, RocketSaver};
use crate::options::StorageOptions;

/// Name of the document entry in a zip-packaged native file.
pub const DOCUMENT_ENTRY: &str = "rocket.ork";

/// Diagnostics of a save that completed.
///
/// Faults in `errors` mean part of the document could not be expressed in the
/// target format; the file was still written.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SaveReport {
    pub warnings: WarningSet,
    pub errors: ErrorSet,
}

/// Saves `document` to `dest` in the format named by `options`.
///
/// The destination is only ever changed by a rename of a fully written temp
/// file from the same directory; on any error it keeps its previous content.
pub fn save<P: AsRef<Path>>(
    dest: P,
    document: &Document,
    options: &StorageOptions,
    progress: Option<&mut dyn SavingProgress>,
) -> Result<SaveReport, SaveError> {
    let saver = (format::descriptor(options.file_type).saver)();
    save_using(&*saver, dest.as_ref(), document, options, progress)
}

/// Like [`save`], with an explicit format saver.
pub fn save_using(
    saver: &dyn RocketSaver,
    dest: &Path,
    document: &Document,
    options: &StorageOptions,
    progress: Option<&mut dyn SavingProgress>,
) -> Result<SaveReport, SaveError> {
    save_using_with_rename(saver, dest, document, options, progress, |from, to| {
        std::fs::rename(from, to)
    })
}

pub(crate) fn save_using_with_rename<F>(
    saver: &dyn RocketSaver,
    dest: &Path,
    document: &Document,
    options: &StorageOptions,
    progress: Option<&mut dyn SavingProgress>,
    rename: F,
) -> Result<SaveReport, SaveError>
where
    F: FnMut(&Path, &Path) -> io::Result<()>,
{
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let (file, temp) = tempfile::Builder::new()
        .prefix("ork-save-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| SaveError::CreateTemp(e, dir.to_path_buf()))?
        .into_parts();
    tracing::debug!(temp = %temp.display(), dest = %dest.display(), format = %options.file_type, "saving");

    let mut report = SaveReport::default();
    // On error `temp` is dropped here and the partial file removed.
    let file = match progress {
        Some(progress) => {
            let estimate = saver.estimate_file_size(document, options);
            tracing::trace!(estimate, "estimated output size");
            let mut out = ProgressWriter::new(BufWriter::new(file), estimate, progress);
            write_document(saver, &mut out, document, options, &mut report)?;
            into_file(out.into_inner())?
        }
        None => {
            let mut out = BufWriter::new(file);
            write_document(saver, &mut out, document, options, &mut report)?;
            into_file(out)?
        }
    };
    file.sync_all()?;
    drop(file);

    replace_file_with(temp, dest, rename)?;
    tracing::info!(
        path = %dest.display(),
        warnings = report.warnings.len(),
        errors = report.errors.len(),
        "saved design"
    );
    Ok(report)
}

fn into_file(out: BufWriter<File>) -> io::Result<File> {
    out.into_inner().map_err(|e| e.into_error())
}

fn write_document<W: Write + Seek>(
    saver: &dyn RocketSaver,
    out: &mut W,
    document: &Document,
    options: &StorageOptions,
    report: &mut SaveReport,
) -> Result<(), SaveError> {
    let mut warnings = WarningSet::new();
    let mut errors = ErrorSet::new();

    if saver.packages_attachments() {
        write_package(saver, out, document, options, &mut warnings, &mut errors)?;
    } else {
        saver.save(out, document, options, &mut warnings, &mut errors)?;
    }
    out.flush()?;

    report.warnings.merge(warnings);
    report.errors.merge(errors);
    Ok(())
}

/// Writes the document as [`DOCUMENT_ENTRY`] followed by one entry per
/// distinct attachment, in tree order.
fn write_package<W: Write + Seek>(
    saver: &dyn RocketSaver,
    out: &mut W,
    document: &Document,
    options: &StorageOptions,
    warnings: &mut WarningSet,
    errors: &mut ErrorSet,
) -> Result<(), SaveError> {
    let entry_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(i64::from(options.compression_level.min(9))));

    let mut zip = ZipWriter::new(out);
    zip.start_file(DOCUMENT_ENTRY, entry_options)?;
    saver.save(&mut zip, document, options, warnings, errors)?;

    let mut written = HashSet::new();
    for attachment in document.attachments() {
        let name = attachment.name();
        if options.excluded_images.contains(name) {
            tracing::debug!(name, "skipping excluded attachment");
            continue;
        }
        if !written.insert(name) {
            continue;
        }
        let mut source = attachment
            .open()
            .map_err(|source| SaveError::AttachmentNotFound {
                name: name.to_string(),
                source,
            })?;
        zip.start_file(name, entry_options)?;
        io::copy(&mut source, &mut zip)?;
        tracing::trace!(name, "packaged attachment");
    }

    zip.finish()?;
    Ok(())
}

/// Estimated size in bytes of `document` saved with `options`.
pub fn estimate_file_size(document: &Document, options: &StorageOptions) -> u64 {
    (format::descriptor(options.file_type).saver)().estimate_file_size(document, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::Attachment;
    use crate::document::{Component, ComponentKind};
    use crate::options::FileType;
    use std::fs;
    use std::io::Read;

    fn decorated() -> Document {
        let shared = Attachment::in_memory("decals/shared.png", b"shared".to_vec());
        let mut document = Document::new();
        document.rocket.children.push(
            Component::new(ComponentKind::Stage, "Sustainer")
                .with_child(Component::new(ComponentKind::NoseCone, "Nose").with_decal(shared.clone()))
                .with_child(Component::new(ComponentKind::BodyTube, "Body").with_decal(shared))
                .with_child(
                    Component::new(ComponentKind::FinSet, "Fins")
                        .with_decal(Attachment::in_memory("decals/fins.png", b"fins".to_vec())),
                ),
        );
        document
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn native_package_writes_each_attachment_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("design.ork");

        let report = save(&dest, &decorated(), &StorageOptions::default(), None).unwrap();
        assert!(report.warnings.is_empty());
        assert_eq!(
            entry_names(&dest),
            vec!["rocket.ork", "decals/shared.png", "decals/fins.png"]
        );

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut text = String::new();
        archive.by_name("decals/fins.png").unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "fins");
    }

    #[test]
    fn excluded_images_are_left_out() {
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("design.ork");
        let mut options = StorageOptions::default();
        options.excluded_images.insert("decals/shared.png".to_string());

        save(&dest, &decorated(), &options, None).unwrap();
        assert_eq!(entry_names(&dest), vec!["rocket.ork", "decals/fins.png"]);
    }

    #[test]
    fn missing_attachment_leaves_destination_untouched() {
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("design.ork");
        fs::write(&dest, b"previous").unwrap();

        let mut document = decorated();
        document.rocket.children[0].children[2] = Component::new(ComponentKind::FinSet, "Fins")
            .with_decal(Attachment::new(
                "gone.png",
                crate::attachment::AttachmentSource::File(dir.path().join("gone.png")),
            ));

        let err = save(&dest, &document, &StorageOptions::default(), None).unwrap_err();
        assert!(err.is_content_error());
        assert_eq!(fs::read(&dest).unwrap(), b"previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn legacy_formats_are_plain_xml() {
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("design.rkt");

        save(&dest, &decorated(), &StorageOptions::new(FileType::RockSim), None).unwrap();
        let text = fs::read_to_string(&dest).unwrap();
        assert!(text.contains("<RockSimDocument>"));
    }

    #[test]
    fn rename_failure_is_reported_and_cleaned_up() {
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("design.ork");
        fs::write(&dest, b"previous").unwrap();

        let saver = format::NativeSaver;
        let err = save_using_with_rename(
            &saver,
            &dest,
            &decorated(),
            &StorageOptions::default(),
            None,
            |from, to| {
                if to == dest.as_path() && from.extension().map(|e| e == "tmp").unwrap_or(false) {
                    Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
                } else {
                    fs::rename(from, to)
                }
            },
        )
        .unwrap_err();

        assert!(matches!(err, SaveError::Replace(..)));
        assert_eq!(fs::read(&dest).unwrap(), b"previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
