//! Decoding traits over [`bytes::Buf`].

use bytes::Buf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("not enough data to decode")]
    NeedMore,
    #[error("data is malformed")]
    Malformed,
}

pub type Result<T> = std::result::Result<T, DecodeError>;

pub trait DecodeBuf: Buf + Sized {
    fn skip(&mut self, num_bytes: usize) -> Result<()> {
        if num_bytes > self.remaining() {
            Err(DecodeError::NeedMore)
        } else {
            self.advance(num_bytes);
            Ok(())
        }
    }

    fn decode<D>(&mut self) -> Result<D>
    where
        D: Decode + Sized + Default,
    {
        let mut item = D::default();
        item.decode(self)?;
        Ok(item)
    }

    fn decode_be<D>(&mut self) -> Result<D>
    where
        D: DecodeBe + Sized + Default,
    {
        let mut item = D::default();
        item.decode_be(self)?;
        Ok(item)
    }

    fn decode_le<D>(&mut self) -> Result<D>
    where
        D: DecodeLe + Sized + Default,
    {
        let mut item = D::default();
        item.decode_le(self)?;
        Ok(item)
    }
}

impl<B: Buf + Sized> DecodeBuf for B {}

pub trait Decode {
    fn decode<B: DecodeBuf>(&mut self, buf: &mut B) -> Result<()>;
}

pub trait DecodeBe {
    fn decode_be<B: DecodeBuf>(&mut self, buf: &mut B) -> Result<()>;
}

pub trait DecodeLe {
    fn decode_le<B: DecodeBuf>(&mut self, buf: &mut B) -> Result<()>;
}

impl Decode for u8 {
    fn decode<B: DecodeBuf>(&mut self, buf: &mut B) -> Result<()> {
        if !buf.has_remaining() {
            Err(DecodeError::NeedMore)
        } else {
            *self = buf.get_u8();
            Ok(())
        }
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode<B: DecodeBuf>(&mut self, buf: &mut B) -> Result<()> {
        if buf.remaining() < N {
            Err(DecodeError::NeedMore)
        } else {
            buf.copy_to_slice(&mut self[..]);
            Ok(())
        }
    }
}

macro_rules! impl_int {
    ($ty:ty, $size:expr, $get_be:ident, $get_le:ident) => {
        impl DecodeBe for $ty {
            fn decode_be<B: DecodeBuf>(&mut self, buf: &mut B) -> Result<()> {
                if buf.remaining() < $size {
                    Err(DecodeError::NeedMore)
                } else {
                    *self = buf.$get_be();
                    Ok(())
                }
            }
        }

        impl DecodeLe for $ty {
            fn decode_le<B: DecodeBuf>(&mut self, buf: &mut B) -> Result<()> {
                if buf.remaining() < $size {
                    Err(DecodeError::NeedMore)
                } else {
                    *self = buf.$get_le();
                    Ok(())
                }
            }
        }
    };
}

impl_int!(u16, 2, get_u16, get_u16_le);
impl_int!(u32, 4, get_u32, get_u32_le);
impl_int!(u64, 8, get_u64, get_u64_le);
impl_int!(i16, 2, get_i16, get_i16_le);
impl_int!(i32, 4, get_i32, get_i32_le);

/// Reads `n` bytes as an owned `Vec<u8>`, without requiring `Default`.
pub fn take_bytes<B: DecodeBuf>(buf: &mut B, n: usize) -> Result<Vec<u8>> {
    if buf.remaining() < n {
        Err(DecodeError::NeedMore)
    } else {
        let mut v = vec![0u8; n];
        buf.copy_to_slice(&mut v[..]);
        Ok(v)
    }
}
