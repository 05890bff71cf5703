//! # pnbert: PN-sequence Bit Error Rate Tester
//!
//! This crate measures the bit error rate of a digital link which
//! carries a known pseudo-noise (PN) sequence. Given an external
//! clock line and data line, it regenerates the expected sequence
//! locally, locks onto the incoming stream, and counts the bits
//! which do not match.
//!
//! ## Example
//!
//! You will need a source of clock and data *line levels*. On an
//! instrument, these are read from input pins. On a PC, they
//! usually come from a logic analyzer capture. Anything which
//! iterates over [`Lines`] will do.
//!
//! ```
//! use pnbert::{BertBuilder, MeasurementLength, Polarity};
//!
//! # let some_line_source = || pnbert::waveform::pn_lines(5010, &[], Polarity::default(), 4);
//! // create a tester with your line polarity
//! let mut bert = BertBuilder::default()
//!     .with_clock_invert(false)               // sample on the rising edge
//!     .with_data_invert(false)                // data is not inverted
//!     .with_length(MeasurementLength::Bits5000)
//!     .with_threshold(10)                     // consecutive matches for lock
//!     .build();
//!
//! let lines = some_line_source();
//! match bert.measure(lines) {
//!     Ok(report) => println!("{}", report),
//!     Err(err) => println!("{}", err),
//! }
//! ```
//!
//! The tester is created via a [builder](BertBuilder). The builder
//! doubles as the instrument's persistent settings and converts to
//! and from a compact four-byte settings image.
//!
//! Each [`measure()`](Bert::measure) has two phases:
//!
//! 1. **Sync.** The local sequence generator is reseeded. Received
//!    bits are compared against it until a run of consecutive
//!    matches reaches the lock threshold. There is no time limit.
//! 2. **Count.** A fixed number of bits, selected by the
//!    [`MeasurementLength`], is compared. Each mismatch is an
//!    error. The result is a [`BerReport`].
//!
//! If the line source ends early, the measurement is abandoned
//! with [`MeasureError::Aborted`].
//!
//! ## Sampling
//!
//! The [`BitSampler`] is level-triggered. It waits for the clock to
//! read high, samples data, and waits for the clock to read low.
//! Both lines may be inverted with [`Polarity`] flags.
//!
//! ## Sequence
//!
//! The expected sequence comes from a sixteen-cell shift register
//! with feedback from cells 7 and 11, seeded with all ones. See
//! [`SequenceGenerator`]. The taps are fixed at compile time.

mod bert;
mod builder;
mod lfsr;
mod report;
mod sampler;
mod sync;

pub mod waveform;

pub use bert::{measure, Bert, MeasureError, Phase};
pub use builder::{BertBuilder, InvalidConfiguration, MeasurementLength};
pub use lfsr::{Lfsr, SequenceGenerator};
pub use report::{BerError, BerReport};
pub use sampler::{BitSampler, Lines, Polarity};
pub use sync::{SyncEngine, SyncState};
