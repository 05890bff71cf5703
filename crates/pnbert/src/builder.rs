use std::convert::TryFrom;
use std::fmt;

use strum::IntoEnumIterator;
use thiserror::Error;

use crate::bert::Bert;
use crate::sampler::Polarity;

/// Builds a bit error rate tester
///
/// The builder comes with the same defaults as a freshly
/// programmed instrument: neither line inverted, a
/// [10000-bit](MeasurementLength::Bits10000) window, and a
/// lock threshold of ten consecutive matching bits.
///
/// The builder is also the instrument's persistent settings.
/// It converts to and from a four-byte settings image with
/// [`to_image()`](#method.to_image) and
/// [`from_image()`](#method.from_image).
///
/// ```
/// use pnbert::{BertBuilder, MeasurementLength};
///
/// let mut builder = BertBuilder::default();
/// builder
///     .with_data_invert(true)
///     .with_length(MeasurementLength::Bits1000)
///     .with_threshold(16);
/// assert_eq!(builder.to_image(), [0, 1, 0, 16]);
/// assert_eq!(builder.to_string(), "BERT PN9 D1-C0 T:1000 S:16");
///
/// let bert = builder.build();
/// assert_eq!(bert.total_bits(), 1000);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BertBuilder {
    polarity: Polarity,
    length: MeasurementLength,
    threshold: u32,
}

impl BertBuilder {
    /// Size of the settings image, in bytes
    pub const IMAGE_LEN: usize = 4;

    /// Settings image of a freshly programmed instrument
    pub const DEFAULT_IMAGE: [u8; 4] = [0, 0, 2, 10];

    /// Largest lock threshold
    ///
    /// The threshold must fit in one byte of the settings image.
    pub const MAX_THRESHOLD: u32 = u8::MAX as u32;

    /// New tester configuration with default settings
    pub fn new() -> Self {
        Self {
            polarity: Polarity::default(),
            length: MeasurementLength::Bits10000,
            threshold: 10,
        }
    }

    /// Load settings from a settings image
    ///
    /// The image is four bytes:
    ///
    /// | Byte | Meaning                              |
    /// |------|--------------------------------------|
    /// | 0    | clock invert flag, `0` or `1`        |
    /// | 1    | data invert flag, `0` or `1`         |
    /// | 2    | measurement length index, `0..=5`    |
    /// | 3    | lock threshold, `1..=255`            |
    ///
    /// Any out-of-range value is rejected here, before the
    /// settings can be used.
    pub fn from_image(image: &[u8]) -> Result<Self, InvalidConfiguration> {
        let image: [u8; 4] = image
            .try_into()
            .map_err(|_| InvalidConfiguration::ImageLength(image.len()))?;

        let clock_invert = flag_from_byte("clock invert", image[0])?;
        let data_invert = flag_from_byte("data invert", image[1])?;
        let length = MeasurementLength::try_from(image[2])?;
        let threshold = match image[3] {
            0 => return Err(InvalidConfiguration::ZeroThreshold),
            thresh => thresh as u32,
        };

        Ok(Self {
            polarity: Polarity::new(clock_invert, data_invert),
            length,
            threshold,
        })
    }

    /// Save settings to a settings image
    ///
    /// See [`from_image()`](#method.from_image) for the format.
    pub fn to_image(&self) -> [u8; 4] {
        [
            self.polarity.clock_invert as u8,
            self.polarity.data_invert as u8,
            self.length.index(),
            self.threshold as u8,
        ]
    }

    /// Build a tester
    ///
    /// Once built, the tester is ready to measure.
    pub fn build(&self) -> Bert {
        Bert::from(self)
    }

    /// Line polarity
    ///
    /// Sets both inversion flags at once.
    pub fn with_polarity(&mut self, polarity: Polarity) -> &mut Self {
        self.polarity = polarity;
        self
    }

    /// Invert the clock line
    ///
    /// When `true`, data is sampled on the falling edge of the
    /// raw clock line.
    pub fn with_clock_invert(&mut self, invert: bool) -> &mut Self {
        self.polarity.clock_invert = invert;
        self
    }

    /// Invert the data line
    pub fn with_data_invert(&mut self, invert: bool) -> &mut Self {
        self.polarity.data_invert = invert;
        self
    }

    /// Flip the clock invert flag
    pub fn toggle_clock_invert(&mut self) -> &mut Self {
        self.polarity.clock_invert = !self.polarity.clock_invert;
        self
    }

    /// Flip the data invert flag
    pub fn toggle_data_invert(&mut self) -> &mut Self {
        self.polarity.data_invert = !self.polarity.data_invert;
        self
    }

    /// Measurement length
    ///
    /// The number of bits to count once locked.
    pub fn with_length(&mut self, length: MeasurementLength) -> &mut Self {
        self.length = length;
        self
    }

    /// Select the next measurement length
    ///
    /// Wraps around from the longest to the shortest.
    pub fn next_length(&mut self) -> &mut Self {
        self.length = self.length.next();
        self
    }

    /// Lock threshold (bits)
    ///
    /// The tester declares lock after `threshold` consecutive
    /// bits match the expected sequence. Low values lock
    /// quickly but may lock falsely on a noisy line. The value
    /// is clamped to `1..=255`.
    pub fn with_threshold(&mut self, threshold: u32) -> &mut Self {
        self.threshold = u32::clamp(threshold, 1, Self::MAX_THRESHOLD);
        self
    }

    /// Line polarity
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Measurement length
    pub fn length(&self) -> MeasurementLength {
        self.length
    }

    /// Lock threshold (bits)
    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

impl Default for BertBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BertBuilder {
    /// Status banner
    ///
    /// `BERT PN9 D<data invert>-C<clock invert> T:<bits> S:<threshold>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BERT PN9 D{}-C{} T:{} S:{}",
            self.polarity.data_invert as u8,
            self.polarity.clock_invert as u8,
            self.length.bits(),
            self.threshold
        )
    }
}

/// Number of bits to count
///
/// The tester supports a fixed table of measurement lengths.
/// Each is identified by its index in the table, which is how
/// it is stored in the settings image.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum_macros::EnumIter,
)]
#[repr(u8)]
pub enum MeasurementLength {
    /// 1000 bits
    Bits1000 = 0,

    /// 5000 bits
    Bits5000 = 1,

    /// 10000 bits
    Bits10000 = 2,

    /// 30000 bits
    Bits30000 = 3,

    /// 50000 bits
    Bits50000 = 4,

    /// 65535 bits
    Bits65535 = 5,
}

impl MeasurementLength {
    /// Number of bits counted
    pub const fn bits(&self) -> u32 {
        match self {
            Self::Bits1000 => 1000,
            Self::Bits5000 => 5000,
            Self::Bits10000 => 10000,
            Self::Bits30000 => 30000,
            Self::Bits50000 => 50000,
            Self::Bits65535 => 65535,
        }
    }

    /// Index in the table of lengths
    pub const fn index(&self) -> u8 {
        *self as u8
    }

    /// Next longer length
    ///
    /// The longest length wraps around to the shortest.
    pub fn next(&self) -> Self {
        Self::iter()
            .find(|len| len.index() == self.index() + 1)
            .unwrap_or(Self::Bits1000)
    }

    /// Find the table entry for exactly `bits` bits
    pub fn from_bits(bits: u32) -> Option<Self> {
        Self::iter().find(|len| len.bits() == bits)
    }
}

impl Default for MeasurementLength {
    fn default() -> Self {
        Self::Bits10000
    }
}

impl TryFrom<u8> for MeasurementLength {
    type Error = InvalidConfiguration;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::iter()
            .find(|len| len.index() == index)
            .ok_or(InvalidConfiguration::LengthIndex(index))
    }
}

impl fmt::Display for MeasurementLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Invalid tester configuration
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvalidConfiguration {
    /// The measurement length index is not in the table
    #[error("invalid configuration: measurement length index {0} is not in 0..=5")]
    LengthIndex(u8),

    /// The lock threshold is zero
    #[error("invalid configuration: lock threshold must be at least one")]
    ZeroThreshold,

    /// A polarity flag is neither zero nor one
    #[error("invalid configuration: {name} flag must be 0 or 1, not {value}")]
    Flag {
        /// Which flag
        name: &'static str,

        /// Stored value
        value: u8,
    },

    /// The settings image is the wrong size
    #[error("invalid configuration: settings image must be 4 bytes, not {0}")]
    ImageLength(usize),
}

// Decode a stored flag byte
fn flag_from_byte(name: &'static str, value: u8) -> Result<bool, InvalidConfiguration> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(InvalidConfiguration::Flag { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let builder = BertBuilder::default();
        assert_eq!(builder.to_image(), BertBuilder::DEFAULT_IMAGE);
        assert_eq!(
            BertBuilder::from_image(&BertBuilder::DEFAULT_IMAGE),
            Ok(builder)
        );
        assert_eq!(builder.to_string(), "BERT PN9 D0-C0 T:10000 S:10");
    }

    #[test]
    fn test_length_table() {
        let bits: Vec<u32> = MeasurementLength::iter().map(|len| len.bits()).collect();
        assert_eq!(bits, vec![1000, 5000, 10000, 30000, 50000, 65535]);

        for (i, len) in MeasurementLength::iter().enumerate() {
            assert_eq!(len.index() as usize, i);
            assert_eq!(MeasurementLength::try_from(i as u8), Ok(len));
            assert_eq!(MeasurementLength::from_bits(len.bits()), Some(len));
        }
        assert_eq!(MeasurementLength::from_bits(1234), None);
        assert_eq!(MeasurementLength::Bits30000.to_string(), "30000");
    }

    #[test]
    fn test_length_wraps() {
        let mut builder = BertBuilder::new();
        let mut seen = vec![];
        for _i in 0..7 {
            builder.next_length();
            seen.push(builder.length().bits());
        }
        assert_eq!(seen, vec![30000, 50000, 65535, 1000, 5000, 10000, 30000]);
        assert_eq!(
            MeasurementLength::Bits65535.next(),
            MeasurementLength::Bits1000
        );
    }

    #[test]
    fn test_invalid_index() {
        assert_eq!(
            MeasurementLength::try_from(6),
            Err(InvalidConfiguration::LengthIndex(6))
        );
        assert_eq!(
            BertBuilder::from_image(&[0, 0, 0xff, 10]),
            Err(InvalidConfiguration::LengthIndex(0xff))
        );
    }

    #[test]
    fn test_invalid_image() {
        assert_eq!(
            BertBuilder::from_image(&[0, 0, 2]),
            Err(InvalidConfiguration::ImageLength(3))
        );
        assert_eq!(
            BertBuilder::from_image(&[0, 0, 2, 0]),
            Err(InvalidConfiguration::ZeroThreshold)
        );
        assert_eq!(
            BertBuilder::from_image(&[2, 0, 2, 10]),
            Err(InvalidConfiguration::Flag {
                name: "clock invert",
                value: 2
            })
        );
        assert_eq!(
            BertBuilder::from_image(&[0, 0xff, 2, 10]),
            Err(InvalidConfiguration::Flag {
                name: "data invert",
                value: 0xff
            })
        );
        assert_eq!(
            BertBuilder::from_image(&[0, 0, 9, 10])
                .unwrap_err()
                .to_string(),
            "invalid configuration: measurement length index 9 is not in 0..=5"
        );
    }

    #[test]
    fn test_image() {
        let builder = BertBuilder::from_image(&[1, 0, 5, 200]).expect("valid image");
        assert!(builder.polarity().clock_invert);
        assert!(!builder.polarity().data_invert);
        assert_eq!(builder.length(), MeasurementLength::Bits65535);
        assert_eq!(builder.threshold(), 200);
        assert_eq!(builder.to_image(), [1, 0, 5, 200]);
        assert_eq!(builder.to_string(), "BERT PN9 D0-C1 T:65535 S:200");
    }

    #[test]
    fn test_toggle_and_clamp() {
        let mut builder = BertBuilder::new();
        builder.toggle_data_invert().toggle_clock_invert();
        assert_eq!(builder.polarity(), Polarity::new(true, true));
        builder.toggle_clock_invert();
        assert_eq!(builder.polarity(), Polarity::new(false, true));

        builder.with_threshold(0);
        assert_eq!(builder.threshold(), 1);
        builder.with_threshold(1000);
        assert_eq!(builder.threshold(), 255);
        assert_eq!(builder.to_image()[3], 255);
    }
}
