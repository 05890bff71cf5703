use std::fmt::Display;
use std::path::PathBuf;

use clap::{error::ErrorKind, value_parser, CommandFactory, Parser};

use pnbert::MeasurementLength;

/// Standard input filename
const STDIN_FILE: &str = "-";

const USAGE_SHORT: &str = r#"
This program reads a logic-analyzer capture of a clock line and a data line, one byte per sample, and measures the bit error rate of the PN9 sequence carried on them.

See --help for more details.
"#;

const USAGE_LONG: &str = r#"
This program reads a logic-analyzer capture of a clock line and a data line, one byte per sample, and measures the bit error rate of the PN9 sequence carried on them.

Each input byte is one sample of both lines:

  bit 0: clock line
  bit 1: data line

Other bits are ignored. Sample fast enough to see every clock level at least once. Data is sampled when the clock goes high (or low, with --clock-invert).

The tester first searches for lock: a run of --threshold consecutive bits which match the expected sequence. It then counts errors in the next --length bits and prints

  BER=0.010000% E=    1 C=10000

Settings may be kept in a four-byte --settings file. Options given on the command line override the stored settings; use --save to store them.

    bertmeter --settings bert.cfg --length 1000 --threshold 16 --save
    sigrok-cli -d fx2lafw -c samplerate=1M -O binary \
        | bertmeter --settings bert.cfg
"#;

const ADVANCED: &str = "Advanced Options";

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_help = USAGE_SHORT, after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
pub struct Args {
    /// Verbosity level (-vvv for more)
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print NOTHING, not even results
    #[arg(short, long)]
    pub quiet: bool,

    /// Input file (or "-" for stdin)
    ///
    /// One byte per sample: bit 0 is the clock line, and bit 1 is
    /// the data line.
    #[arg(long, default_value_t = STDIN_FILE.to_string())]
    pub file: String,

    /// Settings file (four bytes)
    ///
    /// Stored settings are loaded from this file, if it exists.
    /// Invalid settings are an error.
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Save settings to the --settings file and exit
    #[arg(long, requires = "settings")]
    pub save: bool,

    /// Toggle the clock polarity (sample on the other edge)
    #[arg(long)]
    pub clock_invert: bool,

    /// Toggle the data polarity
    #[arg(long)]
    pub data_invert: bool,

    /// Bits to count after lock
    #[arg(short, long, value_parser = parse_length)]
    pub length: Option<MeasurementLength>,

    /// Select the next longer --length (wraps around)
    #[arg(long, conflicts_with = "length")]
    pub next_length: bool,

    /// Consecutive matching bits required for lock (1 ≤ N ≤ 255)
    #[arg(short, long)]
    #[arg(value_parser = value_parser!(u32).range(1..256))]
    pub threshold: Option<u32>,

    /// Measurements to run back-to-back (0 for all input)
    #[arg(short, long, default_value_t = 1)]
    pub repeat: u32,

    /// Measure a simulated stream instead of the input
    ///
    /// Synthesizes the expected sequence, with one bit error every
    /// --demo-error-interval bits, and measures it.
    #[arg(long)]
    pub demo: bool,

    /// Bits between injected errors in --demo mode (0 for none)
    #[arg(long, default_value_t = 1000)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub demo_error_interval: usize,

    /// Samples per clock level in --demo mode
    #[arg(long, default_value_t = 2)]
    #[arg(value_parser = value_parser!(u16).range(1..))]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub demo_hold: u16,
}

impl Args {
    /// Return true if the user requests input from stdin
    pub fn input_is_stdin(&self) -> bool {
        self.file == STDIN_FILE
    }
}

// Accept only lengths from the table
fn parse_length(s: &str) -> Result<MeasurementLength, String> {
    let bits: u32 = s.parse().map_err(|e| format!("{}", e))?;
    MeasurementLength::from_bits(bits)
        .ok_or_else(|| "must be one of 1000, 5000, 10000, 30000, 50000, 65535".to_owned())
}

/// A program-level error with exit code
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Create new error with a custom exit code
    pub fn new(error: anyhow::Error, code: i32) -> CliError {
        CliError {
            error,
            exit_code: code,
        }
    }

    /// Print this error to the terminal
    ///
    /// Errors from clap are printed verbatim. Other types of errors
    /// are printed indirectly via clap's fancy formatter.
    pub fn print(&self) -> std::io::Result<()> {
        if let Some(e) = self.error.downcast_ref::<clap::Error>() {
            e.print()
        } else {
            Args::command()
                .error(ErrorKind::Format, self.to_string())
                .print()
        }
    }

    /// Print this error to the terminal and exit
    pub fn exit(&self) -> ! {
        drop(self.print());
        std::process::exit(self.exit_code);
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.error)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        let code = if err.use_stderr() { 1 } else { 0 };
        CliError::new(err.into(), code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clap() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_length() {
        let args = Args::try_parse_from(["bertmeter", "--length", "30000"]).expect("valid");
        assert_eq!(args.length, Some(MeasurementLength::Bits30000));

        assert!(Args::try_parse_from(["bertmeter", "--length", "1234"]).is_err());
        assert!(Args::try_parse_from(["bertmeter", "--length", "lots"]).is_err());
    }

    #[test]
    fn test_threshold_range() {
        let args = Args::try_parse_from(["bertmeter", "-t", "255"]).expect("valid");
        assert_eq!(args.threshold, Some(255));

        assert!(Args::try_parse_from(["bertmeter", "-t", "0"]).is_err());
        assert!(Args::try_parse_from(["bertmeter", "-t", "256"]).is_err());
    }

    #[test]
    fn test_save_requires_settings() {
        assert!(Args::try_parse_from(["bertmeter", "--save"]).is_err());
        let args =
            Args::try_parse_from(["bertmeter", "--save", "-s", "bert.cfg"]).expect("valid");
        assert!(args.save);
        assert!(args.input_is_stdin());
    }
}
