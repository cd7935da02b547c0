//! Checkpoint streams of 64-bit words.
//!
//! Every checkpointable type appends its words to a shared stream and reads
//! them back from the front, handing the unconsumed tail to the next object.
//! Floating point values are stored with [`f64::to_bits`], so a round trip
//! restores them bit for bit (including NaN payloads and signed zeros).
//! Counts and lengths are stored as plain words.

use crate::{Error, StateVector};

/// A type whose run-time state can be packed into, and restored from, words.
pub trait Checkpoint {
    /// Appends the packed state to `out`.
    fn write_words(&self, out: &mut Vec<u64>);

    /// Restores the state from the front of `data`.
    ///
    /// Returns the words that were not consumed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `data` is too short or describes a
    /// state of a different shape. On error `self` is left unchanged.
    fn deserialize<'a>(&mut self, data: &'a [u64]) -> Result<&'a [u64], Error>;

    /// Packs the state into a fresh word stream.
    fn serialize(&self) -> Vec<u64> {
        let mut out = Vec::new();
        self.write_words(&mut out);
        out
    }
}

pub fn push_f64(out: &mut Vec<u64>, value: f64) {
    out.push(value.to_bits());
}

pub fn push_f64s(out: &mut Vec<u64>, values: &[f64]) {
    out.extend(values.iter().map(|v| v.to_bits()));
}

/// Appends `values` prefixed by their count.
pub fn push_block(out: &mut Vec<u64>, values: &[f64]) {
    out.push(values.len() as u64);
    push_f64s(out, values);
}

/// Sequential reader over a word stream.
#[derive(Debug, Clone, Copy)]
pub struct WordReader<'a> {
    data: &'a [u64],
}

impl<'a> WordReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u64]) -> Self {
        Self { data }
    }

    /// The words not consumed yet.
    #[must_use]
    pub fn rest(&self) -> &'a [u64] {
        self.data
    }

    /// Reads one raw word.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the stream is exhausted.
    pub fn word(&mut self) -> Result<u64, Error> {
        let (first, rest) = self
            .data
            .split_first()
            .ok_or_else(|| Error::invalid_input("checkpoint stream ended early"))?;
        self.data = rest;
        Ok(*first)
    }

    /// Reads one word as a count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the stream is exhausted or the
    /// count does not fit in `usize`.
    pub fn count(&mut self) -> Result<usize, Error> {
        let word = self.word()?;
        usize::try_from(word)
            .map_err(|_| Error::invalid_input(format!("checkpoint count {word} is too large")))
    }

    /// Reads one float.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the stream is exhausted.
    pub fn f64(&mut self) -> Result<f64, Error> {
        self.word().map(f64::from_bits)
    }

    /// Fills `out` with floats.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if fewer than `out.len()` words remain.
    pub fn f64s(&mut self, out: &mut [f64]) -> Result<(), Error> {
        if self.data.len() < out.len() {
            return Err(Error::invalid_input(format!(
                "checkpoint stream holds {} words, {} needed",
                self.data.len(),
                out.len()
            )));
        }
        let (head, rest) = self.data.split_at(out.len());
        for (value, word) in out.iter_mut().zip(head) {
            *value = f64::from_bits(*word);
        }
        self.data = rest;
        Ok(())
    }

    /// Reads a block written by [`push_block`] whose length must be `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on a length mismatch or a short stream.
    pub fn block(&mut self, expected: usize) -> Result<Vec<f64>, Error> {
        let len = self.count()?;
        if len != expected {
            return Err(Error::invalid_input(format!(
                "checkpoint block holds {len} values, expected {expected}"
            )));
        }
        let mut values = vec![0.0; len];
        self.f64s(&mut values)?;
        Ok(values)
    }
}

impl Checkpoint for StateVector {
    fn write_words(&self, out: &mut Vec<u64>) {
        push_block(out, self.as_slice());
    }

    fn deserialize<'a>(&mut self, data: &'a [u64]) -> Result<&'a [u64], Error> {
        let mut reader = WordReader::new(data);
        let values = reader.block(self.len())?;
        self.as_mut_slice().copy_from_slice(&values);
        Ok(reader.rest())
    }
}
