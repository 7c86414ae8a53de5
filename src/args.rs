use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Produce one video and exit.
    Create,
    /// Produce a video now, then keep producing on the configured schedule.
    Automated,
    /// Report existing videos and the next scheduled run.
    Status,
}

impl Mode {
    /// Whether the mode creates working directories and appends to the log file.
    pub fn writes_files(self) -> bool {
        !matches!(self, Mode::Status)
    }
}

#[derive(Parser, Debug)]
#[clap(name = "clipsmith", about = "Turns trending tech topics into narrated short videos")]
pub struct Args {
    #[clap(long, value_enum, default_value_t = Mode::Create)]
    pub mode: Mode,

    /// Topic to cover instead of picking a trending one.
    #[clap(long)]
    pub topic: Option<String>,

    /// Target length in seconds; defaults to VIDEO_LENGTH.
    #[clap(long)]
    pub length: Option<u32>,
}
