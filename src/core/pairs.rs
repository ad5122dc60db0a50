//! Pair generation over any slice
//!
//! Pairs are produced lazily in row-major input order and borrow from the
//! slice, so a generator can be cloned or rebuilt and iterated again with
//! no side effects.

use std::fmt;
use std::str::FromStr;

use crate::core::error::{Error, Result};

/// How pairs of distinct positions are formed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pairing {
    /// Every `(i, j)` with `i != j`: `n * (n - 1)` pairs
    #[default]
    Ordered,
    /// Every `(i, j)` with `i < j`: `n * (n - 1) / 2` pairs
    Unordered,
}

impl Pairing {
    /// Number of pairs produced for `n` items
    pub fn count(&self, n: usize) -> usize {
        let ordered = n.saturating_mul(n.saturating_sub(1));
        match self {
            Pairing::Ordered => ordered,
            Pairing::Unordered => ordered / 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Pairing::Ordered => "ordered",
            Pairing::Unordered => "unordered",
        }
    }
}

impl fmt::Display for Pairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pairing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ordered" | "permutations" => Ok(Pairing::Ordered),
            "unordered" | "combinations" => Ok(Pairing::Unordered),
            other => Err(Error::InvalidInput(format!(
                "unknown pairing '{other}', expected 'ordered' or 'unordered'"
            ))),
        }
    }
}

/// Iterator over position pairs `(i, j)` of a sequence of length `len`
#[derive(Debug, Clone)]
pub struct PairIndices {
    len: usize,
    pairing: Pairing,
    i: usize,
    j: usize,
    remaining: usize,
}

impl PairIndices {
    pub fn new(len: usize, pairing: Pairing) -> Self {
        let mut indices = Self {
            len,
            pairing,
            i: 0,
            j: 0,
            remaining: pairing.count(len),
        };
        indices.j = indices.first_partner(0);
        indices
    }

    fn first_partner(&self, i: usize) -> usize {
        match self.pairing {
            Pairing::Ordered => {
                if i == 0 {
                    1
                } else {
                    0
                }
            }
            Pairing::Unordered => i + 1,
        }
    }
}

impl Iterator for PairIndices {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        // remaining > 0 guarantees (i, j) is a valid pair here
        let pair = (self.i, self.j);
        self.remaining -= 1;

        self.j += 1;
        if self.pairing == Pairing::Ordered && self.j == self.i {
            self.j += 1;
        }
        if self.j >= self.len {
            self.i += 1;
            self.j = self.first_partner(self.i);
        }

        Some(pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for PairIndices {
    fn len(&self) -> usize {
        self.remaining
    }
}

/// Lazy pairs of references into a slice
#[derive(Debug)]
pub struct Pairs<'a, T> {
    items: &'a [T],
    indices: PairIndices,
}

// Manual impl: cloning only copies the borrow, `T` need not be `Clone`.
impl<'a, T> Clone for Pairs<'a, T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items,
            indices: self.indices.clone(),
        }
    }
}

impl<'a, T> Pairs<'a, T> {
    /// Position pairs in the same order as the item pairs
    pub fn indices(&self) -> PairIndices {
        self.indices.clone()
    }
}

impl<'a, T> Iterator for Pairs<'a, T> {
    type Item = (&'a T, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.indices
            .next()
            .map(|(i, j)| (&self.items[i], &self.items[j]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl<'a, T> ExactSizeIterator for Pairs<'a, T> {}

/// Pairs of `items` under the given convention
pub fn pairs<T>(items: &[T], pairing: Pairing) -> Pairs<'_, T> {
    Pairs {
        items,
        indices: PairIndices::new(items.len(), pairing),
    }
}

/// All `(a, b)` with `a` and `b` at distinct positions
pub fn ordered_pairs<T>(items: &[T]) -> Pairs<'_, T> {
    pairs(items, Pairing::Ordered)
}

/// All `(a, b)` with `a` before `b` in input order
pub fn unordered_pairs<T>(items: &[T]) -> Pairs<'_, T> {
    pairs(items, Pairing::Unordered)
}
