//! Measurement loop and stored settings
//!
//! Each pass of the loop is one complete measurement: the
//! tester is reseeded, searches for lock, and counts. The
//! loop ends after `--repeat` measurements or when the input
//! runs out.
//!
//! ```txt
//!   start
//!    ||
//!    \/
//! +-----------+               +------------+
//! |  Locking  | == locked ==> |  Counting  | == done ==> print
//! +-----------+               +------------+               ||
//!    /\   ||                       ||                      ||
//!    ||   ||=== EOF ==> stop <=====||                      ||
//!    ||                                                    ||
//!    ||================ another measurement ===============||
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context};
use log::{debug, info, warn};
use pnbert::{waveform, Bert, BertBuilder, Lines, MeasureError, Polarity};

use crate::cli::Args;

/// Run the application
///
/// Runs measurements with a fully-initialized `bert` over the
/// `input` line samples until `--repeat` measurements have
/// completed or the input is exhausted. Each report is
/// written to `out` as one line, unless `--quiet`.
///
/// Returns the number of completed measurements. It is an
/// error if the input ends before the first measurement
/// completes.
pub fn run<I, W>(args: &Args, bert: &mut Bert, mut input: I, out: &mut W) -> anyhow::Result<u32>
where
    I: Iterator<Item = Lines>,
    W: Write,
{
    let mut completed = 0u32;
    while args.repeat == 0 || completed < args.repeat {
        info!("counting...");
        let result = bert.measure_with(&mut input, |locked| {
            debug!("sync indicator {}", if locked { "on" } else { "off" });
        });

        match result {
            Ok(report) => {
                completed += 1;
                if !args.quiet {
                    writeln!(out, "{}", report).context("unable to write report")?;
                }
            }
            Err(err @ MeasureError::Aborted { .. }) => {
                if completed == 0 {
                    return Err(anyhow!(err)).context("input ended before any measurement completed");
                } else if args.repeat != 0 {
                    warn!(
                        "input ended after {} of {} measurements: {}",
                        completed, args.repeat, err
                    );
                } else {
                    debug!("input exhausted: {}", err);
                }
                break;
            }
        }
    }

    Ok(completed)
}

/// Load settings and apply command-line overrides
///
/// Stored settings come from the `--settings` file if it
/// exists. Otherwise, the defaults are used. Polarity
/// options *toggle* the stored flags.
pub fn load_settings(args: &Args) -> anyhow::Result<BertBuilder> {
    let mut builder = match &args.settings {
        Some(path) if path.exists() => {
            let image = fs::read(path)
                .with_context(|| format!("Unable to read --settings \"{}\"", path.display()))?;
            let builder = BertBuilder::from_image(&image)
                .with_context(|| format!("Unable to load --settings \"{}\"", path.display()))?;
            info!("loaded settings from \"{}\"", path.display());
            builder
        }
        Some(path) => {
            info!(
                "settings file \"{}\" does not exist; using defaults",
                path.display()
            );
            BertBuilder::default()
        }
        None => BertBuilder::default(),
    };

    if args.clock_invert {
        builder.toggle_clock_invert();
    }
    if args.data_invert {
        builder.toggle_data_invert();
    }
    if let Some(length) = args.length {
        builder.with_length(length);
    }
    if args.next_length {
        builder.next_length();
    }
    if let Some(threshold) = args.threshold {
        builder.with_threshold(threshold);
    }

    Ok(builder)
}

/// Store settings
pub fn save_settings(path: &Path, builder: &BertBuilder) -> anyhow::Result<()> {
    fs::write(path, builder.to_image())
        .with_context(|| format!("Unable to write --settings \"{}\"", path.display()))?;
    info!("saved settings to \"{}\": {}", path.display(), builder);
    Ok(())
}

/// Simulated input for `--demo` mode
///
/// Enough of the expected sequence for `--repeat` measurements
/// (one, if unlimited), drawn with the configured polarity. Each
/// measurement's window has one bit error every
/// `--demo-error-interval` bits.
pub fn demo_lines(args: &Args, builder: &BertBuilder) -> impl Iterator<Item = Lines> {
    let threshold = builder.threshold() as usize;
    let window = builder.length().bits() as usize;
    let interval = args.demo_error_interval;
    let flips: Vec<usize> = (0..window)
        .filter(|i| interval > 0 && i % interval == interval / 2)
        .map(|i| i + threshold)
        .collect();

    let polarity: Polarity = builder.polarity();
    let hold = args.demo_hold as usize;
    let measurements = u32::max(args.repeat, 1);
    (0..measurements)
        .flat_map(move |_| waveform::pn_lines(threshold + window, &flips, polarity, hold))
}
