//! The PDU composition and codec engine: the abstract PDU contract,
//! chain-of-PDUs linkage, table-driven demultiplexing, and the two
//! reusable TLV engines (option lists, tagged-element trailers) that
//! concrete protocols in `pduforge-protos` build on.

mod dissection;
mod error;
mod ipv4_address;
mod link_type;
mod mac_address;
mod option_list;
mod pdu;
mod raw_pdu;

pub use dissection::{Constructor, Demux, Dissect, DissectorTable};

pub use error::{DResult, DissectError, PduError, PduResult};

pub use ipv4_address::{IPv4Address, IPv4Network, IPv4NetworkIter, Ipv4ParseError};

pub use link_type::{LinkType, LinkTypeTable};

pub use mac_address::{MacAddress, MacParseError};

pub use option_list::{OptionList, TlvOption};

pub use pdu::{AnyPdu, BasePdu, Pdu, PduExt, PduKind};

#[doc(hidden)]
pub use pdu::PduObj;

pub use raw_pdu::RawPdu;
