//! pduforge: a packet-crafting and packet-dissection library.
//!
//! Recognizes link-layer framing from a data-link-type hint, recursively
//! decodes nested protocol headers into typed records, and serializes a
//! composed stack of records back to bit-exact bytes. See
//! [`from_bytes`] for the single public entry point.

pub mod pdu {
    #[doc(inline)]
    pub use pduforge_core::{AnyPdu, BasePdu, Pdu, PduExt, PduKind, RawPdu};
}

pub mod address {
    #[doc(inline)]
    pub use pduforge_core::{IPv4Address, IPv4Network, IPv4NetworkIter, Ipv4ParseError, MacAddress, MacParseError};
}

pub mod dissect {
    #[doc(inline)]
    pub use pduforge_core::{
        dissector_table, Constructor, DResult, Demux, Dissect, DissectError, DissectorTable,
        LinkType, LinkTypeTable,
    };
}

pub mod error {
    #[doc(inline)]
    pub use pduforge_core::{PduError, PduResult};
}

pub mod protos {
    #[doc(inline)]
    pub use pduforge_protos::*;
}

/// Re-exports the types most callers need: the PDU contract, the two
/// address newtypes, the closed error enums, and the concrete protocols.
pub mod prelude {
    pub use crate::address::{IPv4Address, MacAddress};
    pub use crate::dissect::{Dissect, DissectError, LinkType};
    pub use crate::error::{PduError, PduResult};
    pub use crate::pdu::{AnyPdu, Pdu, PduExt, RawPdu};
    pub use crate::protos;
}

use dissect::{DissectorTable, LinkType, LinkTypeTable};
use lazy_static::lazy_static;
use pdu::{AnyPdu, RawPdu};

lazy_static! {
    static ref LINK_TYPE_TABLE: LinkTypeTable = {
        use pduforge_core::Dissect;
        let mut table = LinkTypeTable::default();
        table.register(LinkType::EN10MB, |buf| protos::ethernet_ii::EthernetII::dissect(buf).map(AnyPdu::new));
        table.register(LinkType::NULL, |buf| protos::loopback::Loopback::dissect(buf).map(AnyPdu::new));
        #[cfg(feature = "dot11")]
        table.register(LinkType::IEEE802_11, |buf| protos::dot11::Dot11::dissect(buf).map(AnyPdu::new));
        table
    };
}

/// Parses `buf` as the outermost PDU for the given data-link type,
/// recursively dissecting every inner layer the registered demultiplexer
/// tables recognize. Nested layers draw a hard distinction between "no
/// dissector is registered for this selector" (fall back to [`RawPdu`])
/// and "the registered dissector rejected this payload" (leave `inner`
/// unset and keep the bytes recoverable through
/// [`pduforge_core::BasePdu::unparsed`]) — see each protocol module's
/// `dissect` implementation. That second accessor needs an outer PDU to
/// hang off of; at this outermost layer there is none, so both cases
/// fall back to a [`RawPdu`] holding the undissected bytes, which is
/// itself already the residual-bytes accessor.
pub fn from_bytes(dlt: LinkType, buf: &[u8]) -> AnyPdu {
    LINK_TYPE_TABLE.dissect_or_raw(&dlt, buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prelude::*;

    #[test]
    fn unregistered_dlt_falls_back_to_raw() {
        let pdu = from_bytes(LinkType::RAW, &[1, 2, 3]);
        assert!(pdu.is::<RawPdu>());
    }

    #[test]
    fn loopback_ipv4_udp_dhcp_chain_round_trips() {
        let mut dhcp = protos::dhcp::Dhcp::new(protos::bootp::OP_REQUEST, 0x1234);
        dhcp.set_message_type(protos::dhcp::MessageType::Discover).unwrap();

        let mut udp = protos::udp::Udp::new(68, 67);
        udp.set_inner_pdu(dhcp);

        let mut ip = protos::ipv4::Ipv4::new(IPv4Address::new(0, 0, 0, 0), IPv4Address::new(255, 255, 255, 255), protos::ip_proto::IpProto::UDP);
        ip.set_inner_pdu(udp);
        ip.make_canonical();

        let mut lo = protos::loopback::Loopback::new();
        lo.set_inner_pdu(ip);
        lo.make_canonical();

        let bytes = lo.serialize();
        let parsed = from_bytes(LinkType::NULL, &bytes);
        assert!(parsed.is::<protos::loopback::Loopback>());
        let found = parsed.find::<protos::dhcp::Dhcp>().expect("chain should contain a DHCP layer");
        assert_eq!(found.message_type(), Some(protos::dhcp::MessageType::Discover));
        assert_eq!(parsed.serialize(), bytes);
    }
}
