//! Binary encode/decode primitives for `pduforge`.
//!
//! Unlike `serde`, this crate does not serialize arbitrary types with an
//! arbitrary encoding. It exists to let each protocol header in
//! `pduforge-protos` describe its own fixed on-wire layout precisely,
//! field by field, with explicit endianness.

pub mod decode;
pub mod encode;

pub use decode::{Decode, DecodeBe, DecodeBuf, DecodeError, DecodeLe};
pub use encode::{Encodable, Encode, EncodeBe, EncodeBuf, EncodeLe};
