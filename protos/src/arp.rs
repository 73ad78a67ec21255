//! ARP (RFC 826), restricted to the common case this crate's demux table
//! needs to target: Ethernet hardware addresses over IPv4.

use crate::prelude::*;

const HTYPE_ETHERNET: u16 = 1;
const PTYPE_IPV4: u16 = 0x0800;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArpOperation {
    Request,
    Reply,
    Unknown(u16),
}

impl From<u16> for ArpOperation {
    fn from(v: u16) -> Self {
        match v {
            1 => ArpOperation::Request,
            2 => ArpOperation::Reply,
            other => ArpOperation::Unknown(other),
        }
    }
}

impl From<ArpOperation> for u16 {
    fn from(op: ArpOperation) -> Self {
        match op {
            ArpOperation::Request => 1,
            ArpOperation::Reply => 2,
            ArpOperation::Unknown(v) => v,
        }
    }
}

#[derive(Clone)]
pub struct Arp {
    base: BasePdu,
    operation: ArpOperation,
    sender_hw: MacAddress,
    sender_proto: IPv4Address,
    target_hw: MacAddress,
    target_proto: IPv4Address,
}

impl Arp {
    pub fn new(operation: ArpOperation, sender_hw: MacAddress, sender_proto: IPv4Address, target_hw: MacAddress, target_proto: IPv4Address) -> Self {
        Self {
            base: BasePdu::default(),
            operation,
            sender_hw,
            sender_proto,
            target_hw,
            target_proto,
        }
    }

    pub fn operation(&self) -> ArpOperation {
        self.operation
    }

    pub fn operation_mut(&mut self) -> &mut ArpOperation {
        &mut self.operation
    }

    pub fn sender_hw_address(&self) -> MacAddress {
        self.sender_hw
    }

    pub fn sender_hw_address_mut(&mut self) -> &mut MacAddress {
        &mut self.sender_hw
    }

    pub fn sender_proto_address(&self) -> IPv4Address {
        self.sender_proto
    }

    pub fn sender_proto_address_mut(&mut self) -> &mut IPv4Address {
        &mut self.sender_proto
    }

    pub fn target_hw_address(&self) -> MacAddress {
        self.target_hw
    }

    pub fn target_hw_address_mut(&mut self) -> &mut MacAddress {
        &mut self.target_hw
    }

    pub fn target_proto_address(&self) -> IPv4Address {
        self.target_proto
    }

    pub fn target_proto_address_mut(&mut self) -> &mut IPv4Address {
        &mut self.target_proto
    }
}

impl Dissect for Arp {
    fn dissect(buf: &[u8]) -> DResult<Self> {
        if buf.len() < 28 {
            return Err(PduError::BufferTooShort.into());
        }
        let mut cursor = buf;
        let htype: u16 = cursor.decode_be()?;
        let ptype: u16 = cursor.decode_be()?;
        let hlen: u8 = cursor.decode()?;
        let plen: u8 = cursor.decode()?;
        if htype != HTYPE_ETHERNET || ptype != PTYPE_IPV4 || hlen != 6 || plen != 4 {
            return Err(PduError::MalformedOption.into());
        }
        let operation = ArpOperation::from(cursor.decode_be::<u16>()?);
        let sender_hw: MacAddress = cursor.decode()?;
        let sender_proto: IPv4Address = cursor.decode()?;
        let target_hw: MacAddress = cursor.decode()?;
        let target_proto: IPv4Address = cursor.decode()?;
        Ok(Self {
            base: BasePdu::default(),
            operation,
            sender_hw,
            sender_proto,
            target_hw,
            target_proto,
        })
    }
}

impl Pdu for Arp {
    fn base_pdu(&self) -> &BasePdu {
        &self.base
    }

    fn base_pdu_mut(&mut self) -> &mut BasePdu {
        &mut self.base
    }

    fn header_len(&self) -> usize {
        28
    }

    fn serialize_header(&self, buf: &mut [u8], _parent: Option<&dyn PduObj>) {
        let mut w = &mut buf[..];
        w.encode_be(&HTYPE_ETHERNET);
        w.encode_be(&PTYPE_IPV4);
        w.encode(&6u8);
        w.encode(&4u8);
        w.encode_be(&u16::from(self.operation));
        w.encode(&self.sender_hw);
        w.encode(&self.sender_proto);
        w.encode(&self.target_hw);
        w.encode(&self.target_proto);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_request() {
        let arp = Arp::new(
            ArpOperation::Request,
            MacAddress::new([1, 2, 3, 4, 5, 6]),
            IPv4Address::new(10, 0, 0, 1),
            MacAddress::BROADCAST,
            IPv4Address::new(10, 0, 0, 2),
        );
        let bytes = arp.serialize();
        let parsed = Arp::dissect(&bytes).unwrap();
        assert_eq!(parsed.operation(), ArpOperation::Request);
        assert_eq!(parsed.sender_proto_address(), IPv4Address::new(10, 0, 0, 1));
    }
}
