//! Simulated clock and data lines
//!
//! Turns a bit sequence into the raw [`Lines`] levels which a
//! transmitter would drive. Useful for testing and for
//! demonstrating the tester without hardware.

use std::iter::Fuse;

use crate::lfsr::SequenceGenerator;
use crate::sampler::{Lines, Polarity};

/// Clock a sequence of bits onto the lines
///
/// Each bit occupies `hold` polls with the logical clock low,
/// then `hold` polls with the logical clock high. The data line
/// holds the bit for the whole period. A single idle poll, with
/// the clock low, follows the last bit.
///
/// Raw levels are produced for the given `polarity`: a
/// [`BitSampler`](crate::BitSampler) configured with the same
/// `polarity` will read `bits` back exactly.
///
/// `hold` is clamped to at least one poll.
pub fn clock_bits<I>(bits: I, polarity: Polarity, hold: usize) -> ClockedLines<I::IntoIter>
where
    I: IntoIterator<Item = bool>,
{
    ClockedLines {
        bits: bits.into_iter().fuse(),
        polarity,
        hold: usize::max(hold, 1),
        current: None,
        phase: 0,
        idle_sent: false,
    }
}

/// Clock the tester's own PN sequence onto the lines
///
/// Emits `len` bits of the [`SequenceGenerator`] output, from
/// its seed, with every bit index in `flip` inverted. `flip`
/// must be sorted in ascending order.
pub fn pn_lines(
    len: usize,
    flip: &[usize],
    polarity: Polarity,
    hold: usize,
) -> ClockedLines<std::vec::IntoIter<bool>> {
    let mut flip = flip.iter().peekable();
    let bits: Vec<bool> = SequenceGenerator::new()
        .take(len)
        .enumerate()
        .map(|(i, bit)| {
            if flip.peek() == Some(&&i) {
                flip.next();
                !bit
            } else {
                bit
            }
        })
        .collect();
    clock_bits(bits, polarity, hold)
}

/// Iterator over clocked line levels
///
/// Created by [`clock_bits()`].
#[derive(Clone, Debug)]
pub struct ClockedLines<I> {
    bits: Fuse<I>,
    polarity: Polarity,
    hold: usize,
    current: Option<bool>,
    phase: usize,
    idle_sent: bool,
}

impl<I> Iterator for ClockedLines<I>
where
    I: Iterator<Item = bool>,
{
    type Item = Lines;

    fn next(&mut self) -> Option<Lines> {
        if self.current.is_none() || self.phase == 2 * self.hold {
            self.phase = 0;
            self.current = self.bits.next();
        }

        let (clock, data) = match self.current {
            Some(bit) => {
                let clock = self.phase >= self.hold;
                self.phase += 1;
                (clock, bit)
            }
            None if !self.idle_sent => {
                self.idle_sent = true;
                (false, false)
            }
            None => return None,
        };

        Some(Lines::new(
            clock ^ self.polarity.clock_invert,
            data ^ self.polarity.data_invert,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_bits() {
        let out: Vec<Lines> = clock_bits([true, false], Polarity::default(), 2).collect();
        assert_eq!(
            out,
            vec![
                Lines::new(false, true),
                Lines::new(false, true),
                Lines::new(true, true),
                Lines::new(true, true),
                Lines::new(false, false),
                Lines::new(false, false),
                Lines::new(true, false),
                Lines::new(true, false),
                Lines::new(false, false),
            ]
        );
    }

    #[test]
    fn test_clock_bits_inverted() {
        let out: Vec<Lines> = clock_bits([true], Polarity::new(true, true), 1).collect();
        assert_eq!(
            out,
            vec![
                Lines::new(true, false),
                Lines::new(false, false),
                Lines::new(true, true),
            ]
        );
    }

    #[test]
    fn test_clock_bits_empty() {
        let out: Vec<Lines> = clock_bits(std::iter::empty(), Polarity::default(), 4).collect();
        assert_eq!(out, vec![Lines::new(false, false)]);
    }

    #[test]
    fn test_pn_lines_flip() {
        let clean: Vec<Lines> = pn_lines(20, &[], Polarity::default(), 1).collect();
        let flipped: Vec<Lines> = pn_lines(20, &[3, 17], Polarity::default(), 1).collect();
        assert_eq!(clean.len(), 41);

        let differ: Vec<usize> = clean
            .iter()
            .zip(flipped.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i / 2)
            .collect();
        assert_eq!(differ, vec![3, 3, 17, 17]);
    }
}
