use ork_format::{FileType, SavingProgress, StorageOptions};

use crate::cli::ConvertArgs;
use crate::error::{Error, Result};

/// Picks the output format from the file extension.
fn format_for(path: &std::path::Path) -> Option<FileType> {
    path.extension()?.to_str()?.parse().ok()
}

struct PrintProgress {
    last: Option<u8>,
}

impl SavingProgress for PrintProgress {
    fn set_progress(&mut self, percent: u8) {
        if self.last == Some(percent) {
            return;
        }
        self.last = Some(percent);
        eprint!("\rSaving... {:>3}%", percent);
    }
}

pub fn run(args: ConvertArgs) -> Result<()> {
    let file_type = match args.format.or_else(|| format_for(&args.output)) {
        Some(file_type) => file_type,
        None => {
            return Err(Error::UnknownOutputFormat {
                path: args.output.clone(),
            })
        }
    };

    let loader = super::loader(args.motors.as_deref())?;
    let loaded = loader.load_file(&args.input).map_err(|source| Error::Load {
        path: args.input.clone(),
        source,
    })?;
    super::print_warnings(&loaded.warnings);

    let options = StorageOptions {
        file_type,
        compression_level: args.compression_level,
        save_simulation_data: !args.no_sim_data,
        excluded_images: args.excluded_images.into_iter().collect(),
    };

    let mut printer = PrintProgress { last: None };
    let progress: Option<&mut dyn SavingProgress> = if args.progress {
        Some(&mut printer)
    } else {
        None
    };

    let report = ork_format::save(&args.output, &loaded.document, &options, progress).map_err(|source| {
        Error::Save {
            path: args.output.clone(),
            source,
        }
    })?;
    if args.progress {
        eprintln!();
    }

    super::print_warnings(&report.warnings);
    for fault in &report.errors {
        eprintln!("error: {}", fault);
    }

    println!(
        "{} -> {} ({})",
        args.input.display(),
        args.output.display(),
        file_type
    );
    Ok(())
}
