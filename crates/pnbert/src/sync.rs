//! Bit-lock acquisition
//!
//! The [`SyncEngine`] compares each received bit against the
//! local [`SequenceGenerator`] and counts consecutive matches.
//! A mismatch resets the count and overrides the expected
//! output bit. Lock is declared once the count reaches the
//! configured threshold.
//!
//! ```txt
//!          start
//!            ||
//!            \/
//!   +-----------------+                      +----------+
//!   |     Locking     | == threshold run ==> |  Locked  |
//!   +-----------------+                      +----------+
//!     ||          /\
//!     ||=mismatch=||  (count = 0)
//! ```
//!
//! There is no timeout. A stream which never matches keeps the
//! engine `Locking` for as long as bits are supplied.

#[cfg(not(test))]
use log::{info, trace};

#[cfg(test)]
use std::println as trace;
#[cfg(test)]
use std::println as info;

use crate::lfsr::SequenceGenerator;
use crate::sampler::{BitSampler, Lines};

/// Lock acquisition state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    /// Searching for a run of matching bits
    #[default]
    Locking,

    /// Run of matching bits found
    ///
    /// The local sequence is aligned with the received
    /// stream. Error counting may begin.
    Locked,
}

/// Consecutive-match lock detector
#[derive(Clone, Debug)]
pub struct SyncEngine {
    // consecutive matches required for lock
    threshold: u32,

    // current run of consecutive matches
    matches: u32,

    // bits examined since reset
    bit_count: u64,

    state: SyncState,
}

impl SyncEngine {
    /// Create lock detector
    ///
    /// Lock is declared after `threshold` consecutive matching
    /// bits. The threshold is at least one.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: u32::max(threshold, 1),
            matches: 0,
            bit_count: 0,
            state: SyncState::Locking,
        }
    }

    /// Return to `Locking` with a zero match count
    pub fn reset(&mut self) {
        self.matches = 0;
        self.bit_count = 0;
        self.state = SyncState::Locking;
    }

    /// Process one received bit
    ///
    /// Compares `bit` with the `generator` output, updates the
    /// match count, and advances the `generator` exactly once.
    /// Returns the resulting state.
    ///
    /// Once `Locked`, further input is ignored and the
    /// `generator` is left alone.
    pub fn input(&mut self, generator: &mut SequenceGenerator, bit: bool) -> SyncState {
        if self.state == SyncState::Locked {
            return self.state;
        }

        let expect = generator.peek();
        if bit == expect {
            self.matches += 1;
        } else {
            if self.matches > 0 {
                trace!(
                    "sync: mismatch after {} matches at bit {}",
                    self.matches,
                    self.bit_count
                );
            }
            self.matches = 0;
            generator.force_override(!expect);
        }
        generator.advance();
        self.bit_count += 1;

        if self.matches >= self.threshold {
            info!(
                "sync: locked: {} consecutive matches after {} bits",
                self.matches, self.bit_count
            );
            self.state = SyncState::Locked;
        }

        self.state
    }

    /// Sample bits until locked
    ///
    /// Draws bits from the `sampler` and feeds them to
    /// [`input()`](#method.input) until the engine locks.
    /// Returns the number of bits examined since the last
    /// reset, or `None` if the `sampler` ran out of lines
    /// first.
    pub fn run<I>(
        &mut self,
        generator: &mut SequenceGenerator,
        sampler: &mut BitSampler<I>,
    ) -> Option<u64>
    where
        I: Iterator<Item = Lines>,
    {
        while self.state == SyncState::Locking {
            let bit = sampler.next_bit()?;
            self.input(generator, bit);
        }
        Some(self.bit_count)
    }

    /// Current state
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Is the engine locked?
    pub fn is_locked(&self) -> bool {
        self.state == SyncState::Locked
    }

    /// Current run of consecutive matches
    pub fn matches(&self) -> u32 {
        self.matches
    }

    /// Consecutive matches required for lock
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Bits examined since the last reset
    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::sampler::Polarity;
    use crate::waveform::{clock_bits, pn_lines};

    // bits needed to lock, or None
    fn bits_to_lock<I>(threshold: u32, stream: I) -> Option<u64>
    where
        I: IntoIterator<Item = bool>,
    {
        let mut generator = SequenceGenerator::new();
        let mut uut = SyncEngine::new(threshold);
        for bit in stream {
            if uut.input(&mut generator, bit) == SyncState::Locked {
                return Some(uut.bit_count());
            }
        }
        None
    }

    // the same lock detector without the output override
    fn bits_to_lock_plain<I>(threshold: u32, stream: I) -> Option<u64>
    where
        I: IntoIterator<Item = bool>,
    {
        let mut generator = SequenceGenerator::new();
        let mut matches = 0;
        for (n, bit) in stream.into_iter().enumerate() {
            if bit == generator.peek() {
                matches += 1;
            } else {
                matches = 0;
            }
            generator.advance();
            if matches >= threshold {
                return Some(n as u64 + 1);
            }
        }
        None
    }

    // the generator's own output, with some bits inverted
    fn noisy_stream(len: usize, every: usize) -> Vec<bool> {
        SequenceGenerator::new()
            .take(len)
            .enumerate()
            .map(|(i, b)| if i % every == every / 2 { !b } else { b })
            .collect()
    }

    #[test]
    fn test_lock_on_own_output() {
        for threshold in 1..40 {
            assert_eq!(
                bits_to_lock(threshold, SequenceGenerator::new().take(1000)),
                Some(threshold as u64)
            );
        }
    }

    #[test]
    fn test_threshold_clamped() {
        let uut = SyncEngine::new(0);
        assert_eq!(uut.threshold(), 1);
    }

    #[test]
    fn test_never_matching_stream() {
        let inverted = SequenceGenerator::new().take(10_000).map(|b| !b);
        assert_eq!(bits_to_lock(1, inverted), None);

        let mut generator = SequenceGenerator::new();
        let mut uut = SyncEngine::new(10);
        let mut reference = SequenceGenerator::new();
        for _i in 0..10_000 {
            let bit = !reference.next().unwrap();
            assert_eq!(uut.input(&mut generator, bit), SyncState::Locking);
            assert_eq!(uut.matches(), 0);
        }
        assert_eq!(uut.bit_count(), 10_000);
    }

    #[test]
    fn test_mismatch_restarts_count() {
        let threshold = 10;
        let mut stream: Vec<bool> = SequenceGenerator::new().take(100).collect();
        stream[threshold - 1] = !stream[threshold - 1];

        // one short, a mismatch, then a full run
        assert_eq!(
            bits_to_lock(threshold as u32, stream.iter().copied()),
            Some(2 * threshold as u64)
        );
    }

    #[test]
    fn test_locked_ignores_input() {
        let mut generator = SequenceGenerator::new();
        let mut uut = SyncEngine::new(1);
        assert_eq!(uut.input(&mut generator, true), SyncState::Locked);
        let cells = generator.cells();
        assert_eq!(uut.input(&mut generator, false), SyncState::Locked);
        assert_eq!(generator.cells(), cells);
        assert_eq!(uut.bit_count(), 1);

        uut.reset();
        assert_eq!(uut.state(), SyncState::Locking);
        assert_eq!(uut.bit_count(), 0);
    }

    #[test]
    fn test_override_does_not_change_lock_time() {
        for every in [3, 5, 7, 11, 13, 29] {
            for threshold in [1, 2, 4, 8] {
                let stream = noisy_stream(2000, every);
                assert_eq!(
                    bits_to_lock(threshold, stream.iter().copied()),
                    bits_to_lock_plain(threshold, stream.iter().copied()),
                    "every {} threshold {}",
                    every,
                    threshold
                );
            }
        }
    }

    #[test]
    fn test_lock_one_period_late() {
        // past the first four seed bits, the default sequence
        // repeats every 28 bits
        let late = SequenceGenerator::new().skip(28).take(200);
        assert_eq!(bits_to_lock(12, late), Some(16));
    }

    #[test]
    fn test_run() {
        let mut generator = SequenceGenerator::new();
        let mut sampler = BitSampler::new(
            pn_lines(100, &[4], Polarity::default(), 2),
            Polarity::default(),
        );
        let mut uut = SyncEngine::new(8);
        assert_eq!(uut.run(&mut generator, &mut sampler), Some(13));
        assert!(uut.is_locked());

        // already locked: no further sampling
        let polls = sampler.poll_count();
        assert_eq!(uut.run(&mut generator, &mut sampler), Some(13));
        assert_eq!(sampler.poll_count(), polls);
    }

    #[test]
    fn test_run_exhausted() {
        let mut generator = SequenceGenerator::new();
        let inverted = SequenceGenerator::new().take(50).map(|b| !b);
        let mut sampler = BitSampler::new(
            clock_bits(inverted, Polarity::default(), 1),
            Polarity::default(),
        );
        let mut uut = SyncEngine::new(4);
        assert_eq!(uut.run(&mut generator, &mut sampler), None);
        assert_eq!(uut.bit_count(), 50);
        assert!(!uut.is_locked());
    }
}
