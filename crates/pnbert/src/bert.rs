//! Measurement controller

#[cfg(not(test))]
use log::{debug, info, warn};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as warn;

use std::fmt;

use thiserror::Error;

use crate::builder::BertBuilder;
use crate::lfsr::SequenceGenerator;
use crate::report::BerReport;
use crate::sampler::{BitSampler, Lines, Polarity};
use crate::sync::SyncEngine;

/// Bit error rate tester
///
/// Owns the local [`SequenceGenerator`] and the
/// [`SyncEngine`]. Each measurement has two phases:
///
/// 1. **Sync**: the generator is reseeded and the received
///    stream is compared against it until the lock threshold
///    is reached. See [`SyncEngine`].
/// 2. **Count**: exactly [`total_bits()`](#method.total_bits)
///    more bits are sampled and compared. Every mismatch is an
///    error. There is no correction in this phase.
///
/// To create the tester, first create its builder:
///
/// ```
/// use pnbert::{BertBuilder, MeasurementLength, Polarity, waveform};
///
/// let mut bert = BertBuilder::default()
///     .with_length(MeasurementLength::Bits1000)
///     .with_threshold(10)
///     .build();
///
/// // a perfect copy of the expected sequence, with one bad bit
/// let lines = waveform::pn_lines(1010, &[500], Polarity::default(), 2);
/// let report = bert.measure(lines).expect("stream ended early");
/// assert_eq!(report.error_bits(), 1);
/// assert_eq!(report.counted_bits(), 1000);
/// ```
#[derive(Clone, Debug)]
pub struct Bert {
    polarity: Polarity,
    total_bits: u32,
    generator: SequenceGenerator,
    sync: SyncEngine,
    last_report: Option<BerReport>,
}

impl Bert {
    /// Run one measurement
    ///
    /// Samples the raw `lines` until the sync phase locks and
    /// the count phase completes. The sync phase has no time
    /// limit: it runs for as long as `lines` supplies levels.
    ///
    /// If `lines` ends before the measurement completes, the
    /// measurement is abandoned and
    /// [`MeasureError::Aborted`] is returned. Pass `&mut lines`
    /// to keep the remainder of the source for another
    /// measurement.
    pub fn measure<I>(&mut self, lines: I) -> Result<BerReport, MeasureError>
    where
        I: IntoIterator<Item = Lines>,
    {
        self.measure_with(lines, |_locked| {})
    }

    /// Run one measurement, reporting lock status
    ///
    /// As [`measure()`](#method.measure). The `sync_indicator`
    /// is called with `false` when the measurement starts and
    /// with `true` at the moment lock is acquired.
    pub fn measure_with<I, F>(
        &mut self,
        lines: I,
        mut sync_indicator: F,
    ) -> Result<BerReport, MeasureError>
    where
        I: IntoIterator<Item = Lines>,
        F: FnMut(bool),
    {
        let mut sampler = BitSampler::new(lines, self.polarity);

        self.generator.reset();
        self.sync.reset();
        sync_indicator(false);
        debug!(
            "measurement: searching for lock: threshold {} bits",
            self.sync.threshold()
        );

        if self.sync.run(&mut self.generator, &mut sampler).is_none() {
            warn!(
                "measurement: aborted: no lock after {} bits",
                self.sync.bit_count()
            );
            return Err(MeasureError::Aborted {
                phase: Phase::Sync,
                bits: self.sync.bit_count(),
            });
        }
        sync_indicator(true);

        debug!("measurement: counting {} bits", self.total_bits);
        let report = self.count(&mut sampler)?;
        info!(
            "measurement: complete: {} errors in {} bits",
            report.error_bits(),
            report.counted_bits()
        );

        self.last_report = Some(report);
        Ok(report)
    }

    /// Lock status
    ///
    /// True once the current or most recent measurement has
    /// acquired lock.
    pub fn is_locked(&self) -> bool {
        self.sync.is_locked()
    }

    /// Result of the most recent completed measurement
    pub fn last_report(&self) -> Option<BerReport> {
        self.last_report
    }

    /// Line polarity
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Bits counted per measurement
    pub fn total_bits(&self) -> u32 {
        self.total_bits
    }

    /// Lock threshold (bits)
    pub fn threshold(&self) -> u32 {
        self.sync.threshold()
    }

    // count phase
    fn count<I>(&mut self, sampler: &mut BitSampler<I>) -> Result<BerReport, MeasureError>
    where
        I: Iterator<Item = Lines>,
    {
        let mut error_bits = 0u32;
        let mut counted_bits = 0u32;
        while counted_bits < self.total_bits {
            let bit = match sampler.next_bit() {
                Some(bit) => bit,
                None => {
                    warn!(
                        "measurement: aborted: input ended after {} of {} bits",
                        counted_bits, self.total_bits
                    );
                    return Err(MeasureError::Aborted {
                        phase: Phase::Count,
                        bits: counted_bits as u64,
                    });
                }
            };

            error_bits += (bit != self.generator.peek()) as u32;
            self.generator.advance();
            counted_bits += 1;
        }

        Ok(BerReport::new(error_bits, counted_bits))
    }

    // tester with an arbitrary window
    fn with_window(polarity: Polarity, threshold: u32, total_bits: u32) -> Self {
        Self {
            polarity,
            total_bits,
            generator: SequenceGenerator::new(),
            sync: SyncEngine::new(threshold),
            last_report: None,
        }
    }
}

impl From<&BertBuilder> for Bert {
    fn from(builder: &BertBuilder) -> Self {
        Self::with_window(
            builder.polarity(),
            builder.threshold(),
            builder.length().bits(),
        )
    }
}

/// Measure `total_bits` bits after locking
///
/// A one-shot measurement with an arbitrary window. Samples
/// `lines` with the given `polarity`, locks after `threshold`
/// consecutive matching bits, and then counts errors in exactly
/// `total_bits` bits.
///
/// A `total_bits` of zero counts nothing; the
/// [`ratio()`](BerReport::ratio) of the report is then an error.
pub fn measure<I>(
    polarity: Polarity,
    threshold: u32,
    total_bits: u32,
    lines: I,
) -> Result<BerReport, MeasureError>
where
    I: IntoIterator<Item = Lines>,
{
    Bert::with_window(polarity, threshold, total_bits).measure(lines)
}

/// Measurement phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Searching for lock
    Sync,

    /// Counting errors
    Count,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Sync => write!(f, "sync"),
            Phase::Count => write!(f, "count"),
        }
    }
}

/// Measurement did not complete
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeasureError {
    /// The line source ended before the measurement completed
    ///
    /// `bits` is the number of bits sampled in `phase` before
    /// the source ended.
    #[error("measurement aborted in {phase} phase after {bits} bits")]
    Aborted {
        /// Phase in progress
        phase: Phase,

        /// Bits sampled in that phase
        bits: u64,
    },
}
