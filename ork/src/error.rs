use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot open motor database `{}`", .path.display())]
    OpenMotors {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read motor database `{}`", .path.display())]
    ParseMotors {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot load design `{}`", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: ork_format::LoadError,
    },

    #[error("Cannot save design `{}`", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: ork_format::SaveError,
    },

    #[error("Cannot tell output format from `{}`; pass -F/--format", .path.display())]
    UnknownOutputFormat { path: PathBuf },
}
