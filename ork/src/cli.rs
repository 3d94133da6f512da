use std::path::PathBuf;

use ork_format::FileType;
use structopt::clap::AppSettings::*;
use structopt::StructOpt;

#[derive(Debug)]
pub struct ParseLevelError(String);

impl std::error::Error for ParseLevelError {}

impl std::fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Compression level must be between 0 and 9, got: {}", self.0)
    }
}

fn parse_level(src: &str) -> Result<u8, ParseLevelError> {
    match src.parse::<u8>() {
        Ok(level) if level <= 9 => Ok(level),
        _ => Err(ParseLevelError(src.to_string())),
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "ork",
    about = "Inspect and convert rocket design files (OpenRocket, RockSim, RASAero).",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands]
)]
pub struct Cli {
    #[structopt(short, long, help = "Show debug output", global = true)]
    pub verbose: bool,

    #[structopt(subcommand)]
    pub command: Commands,
}

#[derive(Debug, StructOpt)]
pub enum Commands {
    #[structopt(name = "info", visible_alias = "i", about = "Load a design and show its structure")]
    Info(InfoArgs),

    #[structopt(
        name = "detect",
        visible_alias = "d",
        about = "Show container and payload format of a file"
    )]
    Detect(DetectArgs),

    #[structopt(
        name = "convert",
        visible_alias = "c",
        about = "Load a design and save it in another format"
    )]
    Convert(ConvertArgs),
}

#[derive(Debug, StructOpt)]
pub struct InfoArgs {
    #[structopt(parse(from_os_str), help = "Path to the design file")]
    pub path: PathBuf,

    #[structopt(long, parse(from_os_str), help = "JSON motor database used to resolve motors")]
    pub motors: Option<PathBuf>,
}

#[derive(Debug, StructOpt)]
pub struct DetectArgs {
    #[structopt(parse(from_os_str), help = "Path to the design file")]
    pub path: PathBuf,
}

#[derive(Debug, StructOpt)]
pub struct ConvertArgs {
    #[structopt(parse(from_os_str), help = "Design file to read")]
    pub input: PathBuf,

    #[structopt(parse(from_os_str), help = "Design file to write")]
    pub output: PathBuf,

    #[structopt(
        short = "F",
        long,
        possible_values = FileType::available_variants(),
        help = "Output format [default: from the output extension]"
    )]
    pub format: Option<FileType>,

    #[structopt(
        short = "C",
        long,
        parse(try_from_str = parse_level),
        default_value = "9",
        help = "Deflate level for packaged output"
    )]
    pub compression_level: u8,

    #[structopt(long, help = "Leave simulation flight data out")]
    pub no_sim_data: bool,

    #[structopt(long = "exclude-image", help = "Referenced image to leave out of the package")]
    pub excluded_images: Vec<String>,

    #[structopt(long, parse(from_os_str), help = "JSON motor database used to resolve motors")]
    pub motors: Option<PathBuf>,

    #[structopt(short, long, help = "Print save progress")]
    pub progress: bool,
}
