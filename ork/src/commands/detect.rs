use std::fs::File;
use std::io::BufReader;

use crate::cli::DetectArgs;
use crate::error::{Error, Result};

pub fn run(args: DetectArgs) -> Result<()> {
    let load_error = |source: ork_format::LoadError| Error::Load {
        path: args.path.clone(),
        source,
    };

    let file = File::open(&args.path)
        .map_err(|e| load_error(ork_format::LoadError::Open(e, args.path.clone())))?;
    let detection = ork_format::DocumentLoader::default()
        .detect(BufReader::new(file))
        .map_err(load_error)?;

    let containers: Vec<String> = detection.containers.iter().map(|c| c.to_string()).collect();
    if containers.is_empty() {
        println!("{}: {}", args.path.display(), detection.file_type);
    } else {
        println!(
            "{}: {} in {}",
            args.path.display(),
            detection.file_type,
            containers.join(" > ")
        );
    }
    Ok(())
}
