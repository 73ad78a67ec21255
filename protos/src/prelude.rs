//! Common imports for implementing a protocol module in this crate.

pub use pduforge_core::{
    dissector_table, AnyPdu, BasePdu, Constructor, DResult, Demux, Dissect, DissectError,
    DissectorTable, IPv4Address, LinkType, LinkTypeTable, MacAddress, OptionList, Pdu, PduError,
    PduExt, PduKind, PduObj, PduResult, RawPdu, TlvOption,
};
pub use pduforge_ende::decode::{Decode, DecodeBe, DecodeBuf, DecodeLe};
pub use pduforge_ende::encode::{Encodable, Encode, EncodeBe, EncodeBuf, EncodeLe};
pub use pduforge_utils::checksum;
