use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "zipload")]
#[command(version)]
#[command(about = "Load the files of a zip archive into memory and list them", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipload site.zip               list retained files with their sizes\n  \
  zipload -p notes.zip | less    send the contents of every file to stdout\n  \
  RUST_LOG=trace zipload a.zip   show which entries were skipped")]
pub struct Cli {
    /// ZIP file path
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Write file contents to stdout instead of listing them
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode, no summary line
    #[arg(short = 'q')]
    pub quiet: bool,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet || self.pipe
    }

    /// Default log filter when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}
