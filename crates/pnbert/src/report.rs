//! Measurement results

use std::fmt;

use thiserror::Error;

/// Result of a completed measurement
///
/// Counts the bit errors found in a measurement window. The bit
/// error rate is the ratio of the two counters.
///
/// ```
/// use pnbert::BerReport;
///
/// let report = BerReport::new(5, 1000);
/// assert_eq!(report.ratio(), Ok(0.005));
/// assert_eq!(report.to_string(), "BER=0.500000% E=    5 C= 1000");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BerReport {
    error_bits: u32,
    counted_bits: u32,
}

impl BerReport {
    /// Report `error_bits` errors in `counted_bits` bits
    pub fn new(error_bits: u32, counted_bits: u32) -> Self {
        Self {
            error_bits,
            counted_bits,
        }
    }

    /// Number of received bits which did not match
    pub fn error_bits(&self) -> u32 {
        self.error_bits
    }

    /// Number of received bits compared
    pub fn counted_bits(&self) -> u32 {
        self.counted_bits
    }

    /// Bit error rate, as a fraction
    ///
    /// Fails if no bits were counted.
    pub fn ratio(&self) -> Result<f64, BerError> {
        if self.counted_bits == 0 {
            Err(BerError::NotYetMeasured)
        } else {
            Ok(self.error_bits as f64 / self.counted_bits as f64)
        }
    }

    /// Bit error rate, in percent
    ///
    /// Fails if no bits were counted.
    pub fn percent(&self) -> Result<f64, BerError> {
        Ok(self.ratio()? * 100.0)
    }

    /// True if no errors were counted in a non-empty window
    pub fn is_error_free(&self) -> bool {
        self.counted_bits > 0 && self.error_bits == 0
    }
}

impl From<BerReport> for (u32, u32) {
    fn from(report: BerReport) -> Self {
        (report.error_bits, report.counted_bits)
    }
}

impl fmt::Display for BerReport {
    /// Result display
    ///
    /// `BER=<percent>% E=<errors> C=<counted>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percent() {
            Ok(pct) => write!(f, "BER={:.6}% ", pct)?,
            Err(_) => write!(f, "BER=---% ")?,
        }
        write!(f, "E={:5} C={:5}", self.error_bits, self.counted_bits)
    }
}

/// Error computing a bit error rate
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BerError {
    /// No bits have been counted
    #[error("bit error rate undefined: no bits have been measured")]
    NotYetMeasured,
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_ratio() {
        let report = BerReport::new(1, 1000);
        assert_approx_eq!(report.ratio().unwrap(), 0.001f64);
        assert_approx_eq!(report.percent().unwrap(), 0.1f64);
        assert!(!report.is_error_free());

        let report = BerReport::new(0, 65535);
        assert_eq!(report.ratio(), Ok(0.0));
        assert!(report.is_error_free());

        let report = BerReport::new(65535, 65535);
        assert_approx_eq!(report.percent().unwrap(), 100.0f64);
    }

    #[test]
    fn test_not_yet_measured() {
        let report = BerReport::default();
        assert_eq!(report.ratio(), Err(BerError::NotYetMeasured));
        assert_eq!(report.percent(), Err(BerError::NotYetMeasured));
        assert!(!report.is_error_free());
        assert_eq!(report.to_string(), "BER=---% E=    0 C=    0");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            BerReport::new(12, 30000).to_string(),
            "BER=0.040000% E=   12 C=30000"
        );
        let pair: (u32, u32) = BerReport::new(3, 50000).into();
        assert_eq!(pair, (3, 50000));
    }
}
