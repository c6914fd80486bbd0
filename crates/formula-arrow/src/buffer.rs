#![forbid(unsafe_code)]

use crate::bitmap::BitVec;
use bytes::Bytes;
use std::fmt;

/// Every physical region is padded to this many bytes.
pub const ALIGNMENT: usize = 64;

/// Round `len` bytes up to the next multiple of [`ALIGNMENT`].
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(ALIGNMENT) * ALIGNMENT
}

/// An immutable, zero-padded byte region.
///
/// Cloning is cheap; adopted buffers share the same allocation.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Buffer {
    bytes: Bytes,
}

impl Buffer {
    /// Take ownership of `bytes`, zero-extending to the alignment boundary.
    pub fn from_vec(mut bytes: Vec<u8>) -> Self {
        bytes.resize(padded_len(bytes.len()), 0);
        Self {
            bytes: Bytes::from(bytes),
        }
    }

    /// Wrap shared bytes, copying only when the length is not already aligned.
    pub fn from_bytes(bytes: Bytes) -> Self {
        if bytes.len() % ALIGNMENT == 0 {
            return Self { bytes };
        }
        Self::from_vec(bytes.to_vec())
    }

    /// Copy a native slice into a padded little-endian region.
    pub fn from_slice<T: NativeType>(values: &[T]) -> Self {
        let mut bytes = vec![0u8; padded_len(values.len() * T::WIDTH)];
        for (chunk, v) in bytes.chunks_exact_mut(T::WIDTH).zip(values) {
            v.write_le(chunk);
        }
        Self {
            bytes: Bytes::from(bytes),
        }
    }

    /// Like [`Buffer::from_slice`], but slots whose `validity` bit is unset
    /// are written as zero.
    pub fn from_slice_masked<T: NativeType>(values: &[T], validity: &BitVec) -> Self {
        let mut bytes = vec![0u8; padded_len(values.len() * T::WIDTH)];
        for (i, (chunk, v)) in bytes.chunks_exact_mut(T::WIDTH).zip(values).enumerate() {
            if validity.get(i) {
                v.write_le(chunk);
            }
        }
        Self {
            bytes: Bytes::from(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Read the first `len` native values (diagnostics and tests).
    pub fn typed_values<T: NativeType>(&self, len: usize) -> Vec<T> {
        self.bytes
            .chunks_exact(T::WIDTH)
            .take(len)
            .map(T::read_le)
            .collect()
    }

    /// Whether `other` shares this buffer's allocation.
    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        self.bytes.as_ptr() == other.bytes.as_ptr() && self.len() == other.len()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer").field("len", &self.len()).finish()
    }
}

/// Fixed-width little-endian scalar storable in a [`Buffer`].
pub trait NativeType: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const WIDTH: usize;

    fn write_le(self, out: &mut [u8]);

    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_native {
    ($($t:ty),*) => {
        $(impl NativeType for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();

            fn write_le(self, out: &mut [u8]) {
                out[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(&bytes[..Self::WIDTH]);
                <$t>::from_le_bytes(raw)
            }
        })*
    };
}

impl_native!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_rounds_to_alignment() {
        assert_eq!(padded_len(0), 0);
        assert_eq!(padded_len(1), 64);
        assert_eq!(padded_len(64), 64);
        assert_eq!(padded_len(65), 128);
    }

    #[test]
    fn slices_are_little_endian() {
        let buf = Buffer::from_slice(&[1i32, -2, 258]);
        assert_eq!(buf.len(), 64);
        assert_eq!(&buf.as_slice()[..4], &[1, 0, 0, 0]);
        assert_eq!(buf.typed_values::<i32>(3), vec![1, -2, 258]);
    }

    #[test]
    fn aligned_bytes_are_shared() {
        let bytes = Bytes::from(vec![7u8; 128]);
        let buf = Buffer::from_bytes(bytes.clone());
        assert_eq!(buf.as_slice().as_ptr(), bytes.as_ptr());

        let unaligned = Buffer::from_bytes(Bytes::from(vec![7u8; 3]));
        assert_eq!(unaligned.len(), 64);
    }
}
