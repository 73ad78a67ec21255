//! UDP (RFC 768). The checksum is always freshly computed at serialize
//! time from the live enclosing [`crate::ipv4::Ipv4`] (read through
//! `serialize_header`'s `parent` argument, never through the `inner`
//! back-reference — see the caveat on `BasePdu::parent`), not stored or
//! left stale between mutations.

use crate::ip_proto::IpProto;
use crate::ipv4::Ipv4;
use crate::prelude::*;
use lazy_static::lazy_static;
use std::io::Write;

dissector_table!(pub UdpPortTable, u16);

lazy_static! {
    static ref UDP_PORT_TABLE: UdpPortTable = {
        let mut table = UdpPortTable::default();
        table.register(67, |buf| crate::dhcp::Dhcp::dissect(buf).map(AnyPdu::new));
        table.register(68, |buf| crate::dhcp::Dhcp::dissect(buf).map(AnyPdu::new));
        table
    };
}

const HEADER_LEN: usize = 8;

#[derive(Clone)]
pub struct Udp {
    base: BasePdu,
    src_port: u16,
    dst_port: u16,
}

impl Udp {
    pub fn new(src_port: u16, dst_port: u16) -> Self {
        Self {
            base: BasePdu::default(),
            src_port,
            dst_port,
        }
    }

    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    pub fn src_port_mut(&mut self) -> &mut u16 {
        &mut self.src_port
    }

    pub fn dst_port(&self) -> u16 {
        self.dst_port
    }

    pub fn dst_port_mut(&mut self) -> &mut u16 {
        &mut self.dst_port
    }

    fn checksum_over(&self, parent: Option<&dyn PduObj>, length: u16, header_no_checksum: &[u8; HEADER_LEN], payload: &[u8]) -> u16 {
        let mut acc = checksum::U16OnesComplement::new();
        if let Some(ipv4) = parent.and_then(|p| p.as_any().downcast_ref::<Ipv4>()) {
            let mut pseudo = [0u8; 12];
            pseudo[0..4].copy_from_slice(&ipv4.src_address().octets());
            pseudo[4..8].copy_from_slice(&ipv4.dst_address().octets());
            pseudo[9] = IpProto::UDP.0;
            pseudo[10..12].copy_from_slice(&length.to_be_bytes());
            acc.write_all(&pseudo).expect("in-memory writer never fails");
        }
        acc.write_all(header_no_checksum).expect("in-memory writer never fails");
        acc.write_all(payload).expect("in-memory writer never fails");
        match acc.checksum() {
            0 if parent.is_some() => 0xFFFF,
            other => other,
        }
    }
}

impl Dissect for Udp {
    fn dissect(buf: &[u8]) -> DResult<Self> {
        if buf.len() < HEADER_LEN {
            return Err(PduError::BufferTooShort.into());
        }
        let mut cursor = buf;
        let src_port: u16 = cursor.decode_be()?;
        let dst_port: u16 = cursor.decode_be()?;
        let length: u16 = cursor.decode_be()?;
        let _checksum: u16 = cursor.decode_be()?;

        let payload_len = (length as usize).saturating_sub(HEADER_LEN);
        if cursor.len() < payload_len {
            return Err(PduError::BufferTooShort.into());
        }
        let payload = &cursor[..payload_len];

        let mut udp = Self {
            base: BasePdu::default(),
            src_port,
            dst_port,
        };

        if !payload.is_empty() {
            match UDP_PORT_TABLE.lookup(&dst_port).or_else(|| UDP_PORT_TABLE.lookup(&src_port)) {
                Some(ctor) => match ctor(payload) {
                    Ok(inner) => udp.set_inner_any(inner),
                    Err(error) => {
                        tracing::debug!(dst_port, src_port, %error, "registered dissector failed; leaving inner unset");
                        udp.base_pdu_mut().set_unparsed(payload.to_vec());
                    }
                },
                None => {
                    let inner = AnyPdu::new(RawPdu::dissect(payload).expect("RawPdu::dissect is infallible"));
                    udp.set_inner_any(inner);
                }
            }
        }
        Ok(udp)
    }
}

impl Pdu for Udp {
    fn base_pdu(&self) -> &BasePdu {
        &self.base
    }

    fn base_pdu_mut(&mut self) -> &mut BasePdu {
        &mut self.base
    }

    fn header_len(&self) -> usize {
        HEADER_LEN
    }

    fn serialize_header(&self, buf: &mut [u8], parent: Option<&dyn PduObj>) {
        let payload = self.inner_pdu().map(AnyPdu::serialize).unwrap_or_default();
        let length = (HEADER_LEN + payload.len()) as u16;

        let mut header_no_checksum = [0u8; HEADER_LEN];
        header_no_checksum[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        header_no_checksum[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        header_no_checksum[4..6].copy_from_slice(&length.to_be_bytes());

        let checksum = self.checksum_over(parent, length, &header_no_checksum, &payload);

        let mut w = &mut buf[..];
        w.encode_be(&self.src_port);
        w.encode_be(&self.dst_port);
        w.encode_be(&length);
        w.encode_be(&checksum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_header_without_parent() {
        let udp = Udp::new(1234, 53);
        let bytes = udp.serialize();
        let parsed = Udp::dissect(&bytes).unwrap();
        assert_eq!(parsed.src_port(), 1234);
        assert_eq!(parsed.dst_port(), 53);
    }

    #[test]
    fn checksum_reflects_ipv4_pseudo_header() {
        let udp = Udp::new(1234, 53);
        let mut ip = Ipv4::new(IPv4Address::new(10, 0, 0, 1), IPv4Address::new(10, 0, 0, 2), IpProto::UDP);
        ip.set_inner_pdu(udp);
        ip.make_canonical();
        let bytes = ip.serialize();
        assert_ne!(bytes[26], 0);
    }

    #[test]
    fn payload_on_a_registered_port_that_fails_to_parse_leaves_inner_unset() {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[0..2].copy_from_slice(&1234u16.to_be_bytes());
        buf[2..4].copy_from_slice(&67u16.to_be_bytes());
        let payload = [0x01, 0x02, 0x03];
        buf[4..6].copy_from_slice(&((HEADER_LEN + payload.len()) as u16).to_be_bytes());
        buf.extend_from_slice(&payload);

        let udp = Udp::dissect(&buf).unwrap();
        assert!(udp.inner_pdu().is_none());
        assert_eq!(udp.base_pdu().unparsed(), Some(&payload[..]));
    }
}
