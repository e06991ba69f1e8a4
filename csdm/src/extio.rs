//! Extend Write with a convenience method for binary output of component data, and the little
//! endian element codec it shares with the decoders
//!
use std::io::{self, Write};

use crate::numeric::Element;

pub(crate) trait ExtendedWrite: Write {
    /// Write elements to a stream, little endian encoded
    fn write_elements<'a, T: Element>(
        &mut self,
        values: impl IntoIterator<Item = &'a T>,
    ) -> io::Result<()>;
}

impl<W: Write> ExtendedWrite for W {
    fn write_elements<'a, T: Element>(
        &mut self,
        values: impl IntoIterator<Item = &'a T>,
    ) -> io::Result<()> {
        self.write_all(&encode_elements(values))
    }
}

/// Decode little endian elements from a byte slice. Trailing bytes that don't make up a whole
/// element are ignored.
///
pub(crate) fn decode_elements<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(T::NUMERIC_TYPE.size())
        .map(T::read_le)
        .collect()
}

pub(crate) fn encode_elements<'a, T: Element>(values: impl IntoIterator<Item = &'a T>) -> Vec<u8> {
    let mut buffer = vec![];
    for value in values {
        value.write_le(&mut buffer);
    }

    buffer
}
