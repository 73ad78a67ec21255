//! The link-layer selector: the `DLT_*` value a capture's framing header
//! (or an explicit caller argument to `from_bytes`) uses to say which
//! protocol's dissector should run first.
//!
//! This module only defines the selector type and the empty dispatch
//! table — it has no dependency on any concrete protocol, so it cannot
//! name `EthernetII`/`Loopback`/`Dot11` directly. Those constructors are
//! registered against specific [`LinkType`] values by the crate that
//! defines them.

use crate::dissector_table;

/// A link-layer type, numerically identical to the libpcap `DLT_*`
/// constants so a caller can pass one straight through from a capture
/// file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LinkType(pub u32);

impl LinkType {
    pub const NULL: LinkType = LinkType(0);
    pub const EN10MB: LinkType = LinkType(1);
    pub const RAW: LinkType = LinkType(101);
    pub const IEEE802_11: LinkType = LinkType(105);
    pub const LINUX_SLL: LinkType = LinkType(113);
}

impl From<u32> for LinkType {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<LinkType> for u32 {
    fn from(v: LinkType) -> Self {
        v.0
    }
}

dissector_table!(pub LinkTypeTable, LinkType);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissection::DissectorTable;
    use crate::error::DResult;
    use crate::pdu::AnyPdu;
    use crate::raw_pdu::RawPdu;

    fn ctor(buf: &[u8]) -> DResult<AnyPdu> {
        Ok(AnyPdu::new(RawPdu::new(buf.to_vec())))
    }

    #[test]
    fn unregistered_link_type_falls_back_to_raw() {
        let table = LinkTypeTable::default();
        let pdu = table.dissect_or_raw(&LinkType::EN10MB, &[1, 2, 3]);
        assert!(pdu.is::<RawPdu>());
    }

    #[test]
    fn registered_link_type_dispatches() {
        let mut table = LinkTypeTable::default();
        table.register(LinkType::NULL, ctor);
        assert!(table.dissect(&LinkType::NULL, &[]).is_ok());
    }
}
