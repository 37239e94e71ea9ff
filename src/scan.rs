//! Ambiguity-aware single-pass k-mer scanning.

use crate::kmer::{base_bits, significant_mask, MAX_K};
use crate::kmer_set::KmerSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowState {
    Empty,
    Partial { data: u128, have: usize },
    Full { data: u128 },
}

/// Rolling k-mer window over a symbol stream.
///
/// Any ambiguous symbol drops the window back to `Empty`, so a completed
/// k-mer never spans an ambiguous base; runs shorter than k never reach
/// the `Full` state and produce nothing.
pub struct KmerWindow {
    k: usize,
    mask: u128,
    state: WindowState,
}

impl KmerWindow {
    /// `k` must already be validated to lie in 1..=64.
    pub fn new(k: usize) -> Self {
        debug_assert!((1..=MAX_K).contains(&k));
        Self {
            k,
            mask: significant_mask(k),
            state: WindowState::Empty,
        }
    }

    /// Feed one symbol; returns the packed k-mer code whenever the window
    /// is complete after this symbol.
    #[inline]
    pub fn push(&mut self, symbol: u8) -> Option<u128> {
        let Some(bits) = base_bits(symbol) else {
            self.state = WindowState::Empty;
            return None;
        };
        let bits = bits as u128;
        self.state = match self.state {
            WindowState::Empty if self.k == 1 => WindowState::Full { data: bits },
            WindowState::Empty => WindowState::Partial {
                data: bits,
                have: 1,
            },
            WindowState::Partial { data, have } => {
                let data = (data << 2) | bits;
                if have + 1 == self.k {
                    WindowState::Full { data }
                } else {
                    WindowState::Partial {
                        data,
                        have: have + 1,
                    }
                }
            }
            WindowState::Full { data } => WindowState::Full {
                data: ((data << 2) | bits) & self.mask,
            },
        };
        match self.state {
            WindowState::Full { data } => Some(data),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = WindowState::Empty;
    }
}

/// True if any unambiguous length-k window of `seq` is a member of `set`,
/// short-circuiting on the first hit.
pub fn sequence_has_match(seq: &[u8], set: &KmerSet, k: usize) -> bool {
    if seq.len() < k {
        return false;
    }
    let mut window = KmerWindow::new(k);
    for &symbol in seq {
        if let Some(code) = window.push(symbol) {
            if set.contains(code) {
                return true;
            }
        }
    }
    false
}
