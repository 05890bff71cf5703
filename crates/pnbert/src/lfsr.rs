//! Pseudo-noise sequence generator
//!
//! The [`Lfsr`] is a sixteen-cell Fibonacci shift register with two
//! feedback taps. The cells are stored in a `u16`, where bit `i`
//! is cell `i`:
//!
//! ```txt
//!   cell:  15 14 13 12 11 10  9  8  7  6  5  4  3  2  1  0
//!          |           |           |                    |
//!          + output    + tap B     + tap A              + newest
//! ```
//!
//! Each [`advance()`](Lfsr::advance) computes `cell[A] ^ cell[B]`,
//! shifts every cell one position toward cell 15 (discarding the
//! old cell 15), and inserts the feedback bit at cell 0.
//!
//! The taps are compile-time parameters. The BER tester uses
//! [`SequenceGenerator`], which has taps 7 and 11.

/// The sequence generator used by the tester
///
/// Feedback is `cell[7] ^ cell[11]`. To measure a different PN
/// sequence, change the taps here and rebuild.
pub type SequenceGenerator = Lfsr<7, 11>;

/// Sixteen-cell linear feedback shift register
///
/// `TAP_A` and `TAP_B` are the cell indices which feed back into
/// cell 0. They must be distinct and less than sixteen; other
/// values fail to compile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Lfsr<const TAP_A: usize, const TAP_B: usize> {
    cells: u16,
}

impl<const TAP_A: usize, const TAP_B: usize> Lfsr<TAP_A, TAP_B> {
    /// Number of cells in the register
    pub const NUM_CELLS: usize = 16;

    /// Index of the output cell
    pub const OUTPUT_CELL: usize = Self::NUM_CELLS - 1;

    /// Seed value: every cell set
    ///
    /// The all-zeros state never leaves itself, so the register
    /// must start from a non-zero seed.
    pub const SEED: u16 = u16::MAX;

    const VALID_TAPS: () = assert!(
        TAP_A < Self::NUM_CELLS && TAP_B < Self::NUM_CELLS && TAP_A != TAP_B,
        "feedback taps must be distinct cells in 0..16"
    );

    /// New register, seeded with all ones
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_TAPS;
        Self { cells: Self::SEED }
    }

    /// Reseed all sixteen cells to logical `1`
    pub fn reset(&mut self) {
        self.cells = Self::SEED;
    }

    /// Expected output bit
    ///
    /// Returns cell 15 without changing the register.
    #[inline]
    pub fn peek(&self) -> bool {
        self.cell(Self::OUTPUT_CELL)
    }

    /// Overwrite the output cell with `bit`
    ///
    /// The output cell is never a feedback tap for the default
    /// topology, and it is the cell which the next
    /// [`advance()`](#method.advance) discards.
    #[inline]
    pub fn force_override(&mut self, bit: bool) {
        let mask = 1u16 << Self::OUTPUT_CELL;
        if bit {
            self.cells |= mask;
        } else {
            self.cells &= !mask;
        }
    }

    /// Shift the register by one cell
    ///
    /// Computes the feedback bit from the current cells, shifts
    /// toward cell 15, and inserts the feedback at cell 0.
    /// Returns the new feedback bit.
    #[inline]
    pub fn advance(&mut self) -> bool {
        let feedback = self.cell(TAP_A) ^ self.cell(TAP_B);
        self.cells = (self.cells << 1) | feedback as u16;
        feedback
    }

    /// Read cell `index`
    ///
    /// Panics if `index` is sixteen or greater.
    #[inline]
    pub fn cell(&self, index: usize) -> bool {
        assert!(index < Self::NUM_CELLS);
        (self.cells >> index) & 1 == 1
    }

    /// All sixteen cells, cell `i` in bit `i`
    pub fn cells(&self) -> u16 {
        self.cells
    }

    /// Feedback taps `(A, B)`
    pub fn taps(&self) -> (usize, usize) {
        (TAP_A, TAP_B)
    }
}

impl<const TAP_A: usize, const TAP_B: usize> Default for Lfsr<TAP_A, TAP_B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const TAP_A: usize, const TAP_B: usize> Iterator for Lfsr<TAP_A, TAP_B> {
    type Item = bool;

    /// Emit the expected bit and advance
    ///
    /// The sequence never ends.
    fn next(&mut self) -> Option<bool> {
        let out = self.peek();
        self.advance();
        Some(out)
    }
}
