pub mod convert;
pub mod detect;
pub mod info;

pub use convert::run as convert;
pub use detect::run as detect;
pub use info::run as info;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ork_format::motor::{DatabaseMotorFinder, MotorSetDatabase};
use ork_format::{DocumentLoader, WarningSet};

use crate::error::{Error, Result};

/// A loader backed by the motors in `motors`, or by an empty database.
pub(crate) fn loader(motors: Option<&Path>) -> Result<DocumentLoader> {
    let database = match motors {
        Some(path) => {
            let file = File::open(path).map_err(|source| Error::OpenMotors {
                path: path.to_path_buf(),
                source,
            })?;
            let database =
                MotorSetDatabase::from_json(BufReader::new(file)).map_err(|source| Error::ParseMotors {
                    path: path.to_path_buf(),
                    source,
                })?;
            tracing::debug!(motors = database.len(), path = %path.display(), "loaded motor database");
            database
        }
        None => MotorSetDatabase::default(),
    };
    Ok(DocumentLoader::new(DatabaseMotorFinder::new(database)))
}

pub(crate) fn print_warnings(warnings: &WarningSet) {
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
}
