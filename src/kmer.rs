//! Fixed-width 2-bit k-mer encoding.
//!
//! Bases pack most-significant-first into a `u128`, two bits each, with
//! A=00, G=01, C=10, T=11 so that complementing a base is a bitwise NOT.
//! Anything other than ACGT (case insensitive) is ambiguous and cannot be
//! encoded.

use crate::{FilterError, Result};

/// Longest representable k-mer (64 bases fill all 128 bits).
pub const MAX_K: usize = 64;

/// 256-entry LUT: ASCII base -> 2-bit code, 0xFF for ambiguous symbols.
static BASE_LUT: [u8; 256] = {
    const X: u8 = 0xFF;
    let mut t = [X; 256];
    t[b'A' as usize] = 0b00;
    t[b'a' as usize] = 0b00;
    t[b'G' as usize] = 0b01;
    t[b'g' as usize] = 0b01;
    t[b'C' as usize] = 0b10;
    t[b'c' as usize] = 0b10;
    t[b'T' as usize] = 0b11;
    t[b't' as usize] = 0b11;
    t
};

/// 2-bit code for a base, or `None` if the symbol is ambiguous.
#[inline]
pub fn base_bits(base: u8) -> Option<u8> {
    let v = BASE_LUT[base as usize];
    if v <= 3 { Some(v) } else { None }
}

#[inline]
fn bits_to_base(bits: u8) -> u8 {
    [b'A', b'G', b'C', b'T'][(bits & 3) as usize]
}

/// Mask selecting the low `2k` significant bits.
#[inline]
pub(crate) fn significant_mask(k: usize) -> u128 {
    if k == MAX_K {
        u128::MAX
    } else {
        (1u128 << (2 * k)) - 1
    }
}

const ODD_BITS: u128 = 0xAAAA_AAAA_AAAA_AAAA_AAAA_AAAA_AAAA_AAAA;
const EVEN_BITS: u128 = 0x5555_5555_5555_5555_5555_5555_5555_5555;

/// An immutable k-mer of 1..=64 bases packed into a `u128`.
///
/// Only the low `2k` bits of `data` are ever set; two k-mers compare equal
/// iff both length and packed data agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kmer {
    k: usize,
    data: u128,
}

impl Kmer {
    /// Encode an unambiguous sequence of 1 to 64 bases.
    pub fn encode(seq: &[u8]) -> Result<Self> {
        if seq.is_empty() || seq.len() > MAX_K {
            return Err(FilterError::InvalidInput(format!(
                "k-mer length must be between 1 and {MAX_K}, got {}",
                seq.len()
            )));
        }
        let mut data = 0u128;
        for &base in seq {
            let bits = base_bits(base).ok_or_else(|| {
                FilterError::InvalidInput(format!(
                    "ambiguous symbol '{}' in k-mer",
                    base as char
                ))
            })?;
            data = (data << 2) | bits as u128;
        }
        Ok(Self {
            k: seq.len(),
            data,
        })
    }

    /// Number of bases.
    pub fn k(&self) -> usize {
        self.k
    }

    /// The packed 2-bit representation (low `2k` bits).
    pub fn data(&self) -> u128 {
        self.data
    }

    /// Drop the oldest base and append `base`, preserving length.
    pub fn extend(self, base: u8) -> Result<Self> {
        let bits = base_bits(base).ok_or_else(|| {
            FilterError::InvalidInput(format!(
                "ambiguous symbol '{}' in k-mer extension",
                base as char
            ))
        })?;
        Ok(Self {
            k: self.k,
            data: ((self.data << 2) | bits as u128) & significant_mask(self.k),
        })
    }

    /// Reverse complement, same length.
    ///
    /// `reverse_bits` both left-aligns the significant bits and reverses the
    /// order of the 2-bit groups, flipping each group internally; swapping
    /// adjacent bits restores group-internal order, complementing is a
    /// bitwise NOT under this coding, and the final shift re-aligns to the
    /// low `2k` bits. Involution: applying this twice gives back `self`.
    pub fn reverse_complement(self) -> Self {
        let mut v = self.data.reverse_bits();
        v = ((v & ODD_BITS) >> 1) | ((v & EVEN_BITS) << 1);
        v = !v;
        v >>= 128 - 2 * self.k;
        Self {
            k: self.k,
            data: v & significant_mask(self.k),
        }
    }

    /// Decode back to ASCII bases. Inverse of [`Kmer::encode`]; not used on
    /// the scanning hot path.
    pub fn to_sequence(&self) -> Vec<u8> {
        (0..self.k)
            .rev()
            .map(|i| bits_to_base((self.data >> (2 * i)) as u8))
            .collect()
    }
}
