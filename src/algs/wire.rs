//! Fixed little-endian wire types for the collective paths.
//!
//! Size headers travel as [`WireCount`] (a `Pod` struct cast with `bytemuck`).
//! Payload columns travel as packed sequences of [`WireValue`]s.

use bytemuck::{Pod, Zeroable};
use static_assertions::assert_eq_size;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Byte count of the message that follows in the data stage.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u64,
}

// size headers are exactly eight bytes on every platform
assert_eq_size!(WireCount, u64);

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u64).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u64::from_le(self.n_le) as usize
    }
}

/// A value with a fixed little-endian encoding.
///
/// `read_le` is only ever handed exactly `WIRE_SIZE` bytes.
pub trait WireValue: Copy + Send + Sync + 'static {
    const WIRE_SIZE: usize;

    fn write_le(&self, out: &mut Vec<u8>);
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_wire_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl WireValue for $t {
                const WIRE_SIZE: usize = std::mem::size_of::<$t>();

                #[inline]
                fn write_le(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::WIRE_SIZE]);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_wire_scalar!(u8, u32, u64, i32, i64, f32, f64);

impl<A: WireValue, B: WireValue> WireValue for (A, B) {
    const WIRE_SIZE: usize = A::WIRE_SIZE + B::WIRE_SIZE;

    fn write_le(&self, out: &mut Vec<u8>) {
        self.0.write_le(out);
        self.1.write_le(out);
    }

    fn read_le(bytes: &[u8]) -> Self {
        let (a, b) = bytes.split_at(A::WIRE_SIZE);
        (A::read_le(a), B::read_le(b))
    }
}

/// Pack a column of values.
pub fn encode_values<T: WireValue>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * T::WIRE_SIZE);
    for v in values {
        v.write_le(&mut out);
    }
    out
}

/// Unpack a column of values; the byte length must be a whole number of records.
pub fn decode_values<T: WireValue>(bytes: &[u8]) -> Result<Vec<T>, String> {
    if T::WIRE_SIZE == 0 {
        return if bytes.is_empty() {
            Ok(Vec::new())
        } else {
            Err(format!("{} stray bytes for a zero-sized record", bytes.len()))
        };
    }
    if bytes.len() % T::WIRE_SIZE != 0 {
        return Err(format!(
            "{} bytes is not a multiple of the {}-byte record size",
            bytes.len(),
            T::WIRE_SIZE
        ));
    }
    Ok(bytes.chunks_exact(T::WIRE_SIZE).map(T::read_le).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_little_endian() {
        let c = WireCount::new(0x0102);
        let bytes = cast_slice(std::slice::from_ref(&c));
        assert_eq!(&bytes[..2], &[0x02, 0x01]);
        assert_eq!(c.get(), 0x0102);
    }

    #[test]
    fn tuple_column_decodes() {
        let vals = vec![(1i32, 2.5f32), (-7, 0.0)];
        let bytes = encode_values(&vals);
        assert_eq!(bytes.len(), 16);
        assert_eq!(decode_values::<(i32, f32)>(&bytes).unwrap(), vals);
    }

    #[test]
    fn ragged_column_is_rejected() {
        let bytes = encode_values(&[1u64, 2]);
        assert!(decode_values::<u64>(&bytes[..15]).is_err());
        assert!(decode_values::<(u8, u32)>(&[0u8; 6]).is_err());
    }
}
