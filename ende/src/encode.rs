//! Encoding traits over [`bytes::BufMut`].

use bytes::BufMut;

pub trait EncodeBuf: BufMut + Sized {
    fn pad(&mut self, pad_value: u8, num_bytes: usize) {
        self.put_bytes(pad_value, num_bytes);
    }

    fn encode<E: Encode + ?Sized>(&mut self, item: &E) -> &mut Self {
        item.encode(self);
        self
    }

    fn encode_be<E: EncodeBe + ?Sized>(&mut self, item: &E) -> &mut Self {
        item.encode_be(self);
        self
    }

    fn encode_le<E: EncodeLe + ?Sized>(&mut self, item: &E) -> &mut Self {
        item.encode_le(self);
        self
    }
}

impl<B: BufMut + Sized> EncodeBuf for B {}

/// Something with a fixed, computable on-wire size.
pub trait Encodable {
    fn encoded_size(&self) -> usize;
}

/// Native-endian (or endianness-agnostic, e.g. byte arrays) encoding.
pub trait Encode: Encodable {
    fn encode<B: EncodeBuf>(&self, buf: &mut B);
}

/// Big-endian (network order) encoding.
pub trait EncodeBe: Encodable {
    fn encode_be<B: EncodeBuf>(&self, buf: &mut B);
}

/// Little-endian encoding.
pub trait EncodeLe: Encodable {
    fn encode_le<B: EncodeBuf>(&self, buf: &mut B);
}

impl Encodable for u8 {
    fn encoded_size(&self) -> usize {
        1
    }
}

impl Encode for u8 {
    fn encode<B: EncodeBuf>(&self, buf: &mut B) {
        buf.put_u8(*self);
    }
}

impl Encodable for [u8] {
    fn encoded_size(&self) -> usize {
        self.len()
    }
}

impl Encode for [u8] {
    fn encode<B: EncodeBuf>(&self, buf: &mut B) {
        buf.put_slice(self);
    }
}

impl<const N: usize> Encodable for [u8; N] {
    fn encoded_size(&self) -> usize {
        N
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn encode<B: EncodeBuf>(&self, buf: &mut B) {
        buf.put_slice(&self[..]);
    }
}

macro_rules! impl_int {
    ($ty:ty, $size:expr, $put_be:ident, $put_le:ident) => {
        impl Encodable for $ty {
            fn encoded_size(&self) -> usize {
                $size
            }
        }

        impl EncodeBe for $ty {
            fn encode_be<B: EncodeBuf>(&self, buf: &mut B) {
                buf.$put_be(*self);
            }
        }

        impl EncodeLe for $ty {
            fn encode_le<B: EncodeBuf>(&self, buf: &mut B) {
                buf.$put_le(*self);
            }
        }
    };
}

impl_int!(u16, 2, put_u16, put_u16_le);
impl_int!(u32, 4, put_u32, put_u32_le);
impl_int!(u64, 8, put_u64, put_u64_le);
impl_int!(i16, 2, put_i16, put_i16_le);
impl_int!(i32, 4, put_i32, put_i32_le);
