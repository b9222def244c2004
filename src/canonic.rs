//! Canonical node signatures.
//!
//! A [`Canonic`] packs a sequence of [`Kleene`] values into 2-bit slots of `u64` words,
//! 32 slots per word, most significant slot first. It is the key Blur partitions nodes by:
//! two nodes with equal signatures are indistinguishable for the abstraction.
//!
//! `Canonic` never reorders what it is given. A node's signature is only comparable with
//! another one when both were built by adding the same predicates in the same order, which
//! [`Structure::canonic_name`] guarantees by always walking the vocabulary's abstraction
//! predicates in declaration order.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::kleene::Kleene;
use crate::predicate::Vocabulary;
use crate::structure::Structure;
use crate::types::{Node, NodeTuple};

/// Low bit of every slot.
const LOW_BITS: u64 = 0x5555_5555_5555_5555;
/// High bit of every slot.
const HIGH_BITS: u64 = 0xAAAA_AAAA_AAAA_AAAA;

/// A growable vector of 2-bit Kleene slots.
#[derive(Debug, Clone)]
pub struct Canonic {
    /// Packed slots; words past `len` slots are always zero.
    words: Vec<u64>,
    /// Number of appended values.
    len: usize,
    three_way: bool,
}

impl Canonic {
    /// Number of slots per word.
    const SLOTS_PER_WORD: usize = 32;

    pub fn new(three_way: bool) -> Self {
        Canonic {
            words: Vec::new(),
            len: 0,
            three_way,
        }
    }

    /// Creates an empty signature with room for `slots` values.
    pub fn with_capacity(slots: usize, three_way: bool) -> Self {
        let num_words = (slots + Self::SLOTS_PER_WORD - 1) / Self::SLOTS_PER_WORD;
        Canonic {
            words: vec![0; num_words],
            len: 0,
            three_way,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn three_way(&self) -> bool {
        self.three_way
    }

    /// Capacity in slots.
    pub fn capacity(&self) -> usize {
        self.words.len() * Self::SLOTS_PER_WORD
    }

    #[inline]
    fn word_and_shift(index: usize) -> (usize, usize) {
        let word = index / Self::SLOTS_PER_WORD;
        let shift = 62 - 2 * (index % Self::SLOTS_PER_WORD);
        (word, shift)
    }

    fn code(&self, value: Kleene) -> u64 {
        match value {
            Kleene::Unknown if !self.three_way => Kleene::False.code() as u64,
            _ => value.code() as u64,
        }
    }

    /// Appends a value.
    pub fn add(&mut self, value: Kleene) {
        if self.len == self.capacity() {
            let grown = (self.words.len() * 2).max(1);
            self.words.resize(grown, 0);
        }
        let (word, shift) = Self::word_and_shift(self.len);
        self.words[word] |= self.code(value) << shift;
        self.len += 1;
    }

    /// Returns the value stored in slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn get(&self, index: usize) -> Kleene {
        assert!(index < self.len, "Slot {} out of bounds (len = {})", index, self.len);
        let (word, shift) = Self::word_and_shift(index);
        Kleene::from_code(((self.words[word] >> shift) & 0b11) as u8)
    }

    pub fn iter(&self) -> impl Iterator<Item = Kleene> + '_ {
        (0..self.len).map(|i| self.get(i))
    }

    /// The words holding appended slots.
    fn used(&self) -> &[u64] {
        let num_words = (self.len + Self::SLOTS_PER_WORD - 1) / Self::SLOTS_PER_WORD;
        &self.words[..num_words]
    }

    /// Returns true if no slot pair is a `0`/`1` contradiction.
    pub fn agrees_with(&self, other: &Canonic) -> bool {
        if self.len != other.len {
            return false;
        }
        // 00 ^ 10 is the only xor with the high bit set and the low bit clear
        self.used().iter().zip(other.used()).all(|(&a, &b)| {
            let x = a ^ b;
            (x & HIGH_BITS) & !((x & LOW_BITS) << 1) == 0
        })
    }

    /// Returns true if every slot of `self` is at least as precise as the matching slot of
    /// `other`.
    pub fn less_or_equal(&self, other: &Canonic) -> bool {
        if self.len != other.len {
            return false;
        }
        self.used().iter().zip(other.used()).all(|(&a, &b)| {
            let unknown = b & LOW_BITS;
            let known = !(unknown | (unknown << 1));
            (a & known) == (b & known)
        })
    }
}

impl PartialEq for Canonic {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.three_way == other.three_way && self.used() == other.used()
    }
}

impl Eq for Canonic {}

impl std::hash::Hash for Canonic {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.used().hash(state);
        self.len.hash(state);
        self.three_way.hash(state);
    }
}

impl Ord for Canonic {
    fn cmp(&self, other: &Self) -> Ordering {
        self.used()
            .cmp(other.used())
            .then(self.len.cmp(&other.len))
            .then(self.three_way.cmp(&other.three_way))
    }
}

impl PartialOrd for Canonic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Canonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}

impl Structure {
    /// Computes the canonical name of `node`: the value of every abstraction predicate on
    /// `node` (its self-loop for arity 2 and above), in vocabulary order.
    pub fn canonic_name(&self, vocab: &Vocabulary, node: Node, three_way: bool) -> Canonic {
        let mut name = Canonic::with_capacity(vocab.abstraction().count(), three_way);
        for p in vocab.abstraction() {
            let tuple = NodeTuple::self_loop(node, p.arity());
            name.add(self.eval(p.id(), tuple.nodes()));
        }
        name
    }

    /// Canonical names of all nodes.
    pub fn canonic_names(&self, vocab: &Vocabulary, three_way: bool) -> BTreeMap<Node, Canonic> {
        self.nodes()
            .map(|n| (n, self.canonic_name(vocab, n, three_way)))
            .collect()
    }
}
