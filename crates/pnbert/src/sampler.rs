//! Clock-edge bit sampling
//!
//! The [`BitSampler`] polls a source of instantaneous [`Lines`]
//! levels. It spins until the (polarity-corrected) clock reads
//! high, latches the data line at that moment, and then spins
//! until the clock reads low again. One bit is produced per
//! full clock cycle.
//!
//! ```txt
//!            +-----+     +-----+     +-----+
//!   clock    |     |     |     |     |     |
//!         ---+     +-----+     +-----+     +---
//!            ^     ^
//!            |     + falling: end of bit period
//!            + rising: data is sampled here
//! ```
//!
//! On hardware the source is the input port, and a read always
//! succeeds. On a host, the source is an iterator over captured
//! or simulated levels. When the iterator ends, the sampler
//! reports `None` and the measurement is abandoned.

/// Instantaneous levels of the clock and data lines
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Lines {
    /// Clock line level
    pub clock: bool,

    /// Data line level
    pub data: bool,
}

impl Lines {
    /// Bit position of the clock line in a capture byte
    pub const CLOCK_BIT: u8 = 0x01;

    /// Bit position of the data line in a capture byte
    pub const DATA_BIT: u8 = 0x02;

    /// New line levels
    pub fn new(clock: bool, data: bool) -> Self {
        Self { clock, data }
    }

    /// Decode one logic-analyzer capture byte
    ///
    /// Bit 0 is the clock line and bit 1 is the data line. All
    /// other bits are ignored.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            clock: byte & Self::CLOCK_BIT != 0,
            data: byte & Self::DATA_BIT != 0,
        }
    }

    /// Encode as a logic-analyzer capture byte
    pub fn to_byte(&self) -> u8 {
        (self.clock as u8 * Self::CLOCK_BIT) | (self.data as u8 * Self::DATA_BIT)
    }
}

/// Line polarity inversion flags
///
/// Each flag is XORed with its raw line level at the point
/// of sampling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Polarity {
    /// Invert the clock line: sample on the falling raw edge
    pub clock_invert: bool,

    /// Invert the data line
    pub data_invert: bool,
}

impl Polarity {
    /// New polarity flags
    pub fn new(clock_invert: bool, data_invert: bool) -> Self {
        Self {
            clock_invert,
            data_invert,
        }
    }

    /// Logical clock level for the given raw `lines`
    #[inline]
    pub fn clock(&self, lines: Lines) -> bool {
        lines.clock ^ self.clock_invert
    }

    /// Logical data level for the given raw `lines`
    #[inline]
    pub fn data(&self, lines: Lines) -> bool {
        lines.data ^ self.data_invert
    }
}

/// Clock-synchronous data sampler
///
/// Wraps any source of raw [`Lines`] levels. Each call to
/// [`next_bit()`](#method.next_bit) performs exactly one
/// rising edge wait, data sample, and falling edge wait.
#[derive(Clone, Debug)]
pub struct BitSampler<I> {
    // raw line source
    lines: I,

    // polarity correction
    polarity: Polarity,

    // line levels as of the most recent poll
    latest: Lines,

    // lifetime count of polls
    polls: u64,
}

impl<I> BitSampler<I>
where
    I: Iterator<Item = Lines>,
{
    /// Create sampler
    ///
    /// Samples the `lines` source with the given `polarity`
    /// correction.
    pub fn new<T>(lines: T, polarity: Polarity) -> Self
    where
        T: IntoIterator<Item = Lines, IntoIter = I>,
    {
        Self {
            lines: lines.into_iter(),
            polarity,
            latest: Lines::default(),
            polls: 0,
        }
    }

    /// Sample one bit
    ///
    /// Waits for a rising edge, samples data, and waits for the
    /// falling edge which ends the bit period. Returns `None` if
    /// the line source is exhausted before the bit period ends.
    pub fn next_bit(&mut self) -> Option<bool> {
        self.wait_rising_edge()?;
        let bit = self.sample_data();
        self.wait_falling_edge()?;
        Some(bit)
    }

    /// Spin until the logical clock reads high
    ///
    /// If the clock is already high, returns after a single poll.
    pub fn wait_rising_edge(&mut self) -> Option<()> {
        loop {
            let lines = self.poll()?;
            if self.polarity.clock(lines) {
                return Some(());
            }
        }
    }

    /// Logical data level
    ///
    /// Returns the polarity-corrected data line as of the poll
    /// which ended the last [`wait_rising_edge()`](#method.wait_rising_edge).
    pub fn sample_data(&self) -> bool {
        self.polarity.data(self.latest)
    }

    /// Spin until the logical clock reads low
    pub fn wait_falling_edge(&mut self) -> Option<()> {
        loop {
            let lines = self.poll()?;
            if !self.polarity.clock(lines) {
                return Some(());
            }
        }
    }

    /// Polarity correction in use
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Lifetime count of line polls
    pub fn poll_count(&self) -> u64 {
        self.polls
    }

    /// Recover the line source
    pub fn into_inner(self) -> I {
        self.lines
    }

    // read the lines once
    #[inline]
    fn poll(&mut self) -> Option<Lines> {
        let lines = self.lines.next()?;
        self.latest = lines;
        self.polls += 1;
        Some(lines)
    }
}
