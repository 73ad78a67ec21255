//! IPv4 (RFC 791), restricted to the fixed 20-byte header: no IP option
//! area. `version`/`ihl` are therefore not stored fields but implied
//! constants, and a dissected packet whose `ihl` claims an option area is
//! rejected rather than silently dropping the options.

use crate::ip_proto::IpProto;
use crate::prelude::*;
use crate::tcp::Tcp;
use crate::udp::Udp;
use lazy_static::lazy_static;
use std::io::Write;

dissector_table!(pub IpProtoTable, IpProto);

lazy_static! {
    static ref IP_PROTO_TABLE: IpProtoTable = {
        let mut table = IpProtoTable::default();
        table.register(IpProto::UDP, |buf| Udp::dissect(buf).map(AnyPdu::new));
        table.register(IpProto::TCP, |buf| Tcp::dissect(buf).map(AnyPdu::new));
        table
    };
}

const VERSION: u8 = 4;
const IHL_NO_OPTIONS: u8 = 5;
const HEADER_LEN: usize = 20;

#[derive(Clone)]
pub struct Ipv4 {
    base: BasePdu,
    dscp: u8,
    ecn: u8,
    total_length: u16,
    identification: u16,
    flags: u8,
    fragment_offset: u16,
    ttl: u8,
    protocol: IpProto,
    checksum: u16,
    src_addr: IPv4Address,
    dst_addr: IPv4Address,
}

impl Ipv4 {
    pub fn new(src_addr: IPv4Address, dst_addr: IPv4Address, protocol: IpProto) -> Self {
        Self {
            base: BasePdu::default(),
            dscp: 0,
            ecn: 0,
            total_length: HEADER_LEN as u16,
            identification: 0,
            flags: 0b010,
            fragment_offset: 0,
            ttl: 64,
            protocol,
            checksum: 0,
            src_addr,
            dst_addr,
        }
    }

    pub fn dscp(&self) -> u8 {
        self.dscp
    }

    pub fn set_dscp(&mut self, dscp: u8) -> PduResult<()> {
        if dscp > 0x3F {
            return Err(PduError::FieldOverflow);
        }
        self.dscp = dscp;
        Ok(())
    }

    pub fn ecn(&self) -> u8 {
        self.ecn
    }

    pub fn set_ecn(&mut self, ecn: u8) -> PduResult<()> {
        if ecn > 0x03 {
            return Err(PduError::FieldOverflow);
        }
        self.ecn = ecn;
        Ok(())
    }

    pub fn identification(&self) -> u16 {
        self.identification
    }

    pub fn identification_mut(&mut self) -> &mut u16 {
        &mut self.identification
    }

    pub fn dont_fragment(&self) -> bool {
        self.flags & 0b010 != 0
    }

    pub fn set_dont_fragment(&mut self, df: bool) {
        if df {
            self.flags |= 0b010;
        } else {
            self.flags &= !0b010;
        }
    }

    pub fn more_fragments(&self) -> bool {
        self.flags & 0b001 != 0
    }

    pub fn set_more_fragments(&mut self, mf: bool) {
        if mf {
            self.flags |= 0b001;
        } else {
            self.flags &= !0b001;
        }
    }

    pub fn fragment_offset(&self) -> u16 {
        self.fragment_offset
    }

    pub fn set_fragment_offset(&mut self, offset: u16) -> PduResult<()> {
        if offset > 0x1FFF {
            return Err(PduError::FieldOverflow);
        }
        self.fragment_offset = offset;
        Ok(())
    }

    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    pub fn ttl_mut(&mut self) -> &mut u8 {
        &mut self.ttl
    }

    pub fn protocol(&self) -> IpProto {
        self.protocol
    }

    pub fn protocol_mut(&mut self) -> &mut IpProto {
        &mut self.protocol
    }

    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    pub fn src_address(&self) -> IPv4Address {
        self.src_addr
    }

    pub fn src_address_mut(&mut self) -> &mut IPv4Address {
        &mut self.src_addr
    }

    pub fn dst_address(&self) -> IPv4Address {
        self.dst_addr
    }

    pub fn dst_address_mut(&mut self) -> &mut IPv4Address {
        &mut self.dst_addr
    }

    fn header_for_checksum(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0] = (VERSION << 4) | IHL_NO_OPTIONS;
        buf[1] = (self.dscp << 2) | self.ecn;
        buf[2..4].copy_from_slice(&self.total_length.to_be_bytes());
        buf[4..6].copy_from_slice(&self.identification.to_be_bytes());
        let flags_fragment = ((self.flags as u16) << 13) | self.fragment_offset;
        buf[6..8].copy_from_slice(&flags_fragment.to_be_bytes());
        buf[8] = self.ttl;
        buf[9] = self.protocol.0;
        buf[12..16].copy_from_slice(&self.src_addr.octets());
        buf[16..20].copy_from_slice(&self.dst_addr.octets());
        buf
    }
}

impl Dissect for Ipv4 {
    fn dissect(buf: &[u8]) -> DResult<Self> {
        if buf.len() < HEADER_LEN {
            return Err(PduError::BufferTooShort.into());
        }
        let mut cursor = buf;
        let version_ihl: u8 = cursor.decode()?;
        let version = version_ihl >> 4;
        let ihl = version_ihl & 0x0F;
        if version != VERSION {
            return Err(PduError::MalformedOption.into());
        }
        if ihl != IHL_NO_OPTIONS {
            return Err(PduError::MalformedOption.into());
        }
        let dscp_ecn: u8 = cursor.decode()?;
        let total_length: u16 = cursor.decode_be()?;
        let identification: u16 = cursor.decode_be()?;
        let flags_fragment: u16 = cursor.decode_be()?;
        let ttl: u8 = cursor.decode()?;
        let protocol = IpProto(cursor.decode()?);
        let checksum: u16 = cursor.decode_be()?;
        let src_addr: IPv4Address = cursor.decode()?;
        let dst_addr: IPv4Address = cursor.decode()?;

        let payload_len = (total_length as usize).saturating_sub(HEADER_LEN);
        if cursor.len() < payload_len {
            return Err(PduError::BufferTooShort.into());
        }
        let payload = &cursor[..payload_len];

        let mut ip = Self {
            base: BasePdu::default(),
            dscp: dscp_ecn >> 2,
            ecn: dscp_ecn & 0x03,
            total_length,
            identification,
            flags: (flags_fragment >> 13) as u8,
            fragment_offset: flags_fragment & 0x1FFF,
            ttl,
            protocol,
            checksum,
            src_addr,
            dst_addr,
        };

        if !payload.is_empty() {
            match IP_PROTO_TABLE.demux(&protocol, payload) {
                Demux::Dissected(inner) => ip.set_inner_any(inner),
                Demux::Unrecognized => {
                    let inner = AnyPdu::new(RawPdu::dissect(payload).expect("RawPdu::dissect is infallible"));
                    ip.set_inner_any(inner);
                }
                Demux::Failed(_) => ip.base_pdu_mut().set_unparsed(payload.to_vec()),
            }
        }
        Ok(ip)
    }
}

impl Pdu for Ipv4 {
    fn base_pdu(&self) -> &BasePdu {
        &self.base
    }

    fn base_pdu_mut(&mut self) -> &mut BasePdu {
        &mut self.base
    }

    fn header_len(&self) -> usize {
        HEADER_LEN
    }

    fn serialize_header(&self, buf: &mut [u8], _parent: Option<&dyn PduObj>) {
        let mut w = &mut buf[..];
        w.encode(&((VERSION << 4) | IHL_NO_OPTIONS));
        w.encode(&((self.dscp << 2) | self.ecn));
        w.encode_be(&self.total_length);
        w.encode_be(&self.identification);
        let flags_fragment = ((self.flags as u16) << 13) | self.fragment_offset;
        w.encode_be(&flags_fragment);
        w.encode(&self.ttl);
        w.encode(&self.protocol.0);
        w.encode_be(&self.checksum);
        w.encode(&self.src_addr);
        w.encode(&self.dst_addr);
    }

    fn make_canonical(&mut self) {
        if let Some(inner) = self.inner_pdu() {
            if let Some(proto) = ip_proto_of(inner) {
                self.protocol = proto;
            }
        }
        self.total_length = Pdu::total_len(self) as u16;
        self.checksum = 0;
        let mut acc = checksum::U16OnesComplement::new();
        acc.write_all(&self.header_for_checksum()).expect("in-memory writer never fails");
        self.checksum = acc.checksum();
    }
}

fn ip_proto_of(inner: &AnyPdu) -> Option<IpProto> {
    if inner.is::<Udp>() {
        Some(IpProto::UDP)
    } else if inner.is::<Tcp>() {
        Some(IpProto::TCP)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_header_and_recomputes_checksum() {
        let mut ip = Ipv4::new(
            IPv4Address::new(192, 168, 1, 1),
            IPv4Address::new(192, 168, 1, 2),
            IpProto::UDP,
        );
        ip.make_canonical();
        let bytes = ip.serialize();
        let parsed = Ipv4::dissect(&bytes).unwrap();
        assert_eq!(parsed.src_address(), IPv4Address::new(192, 168, 1, 1));
        assert_eq!(parsed.checksum(), ip.checksum());
        assert_eq!(parsed.total_length, HEADER_LEN as u16);
    }

    #[test]
    fn rejects_options_present() {
        let mut bytes = vec![0u8; 24];
        bytes[0] = (VERSION << 4) | 6;
        assert!(Ipv4::dissect(&bytes).is_err());
    }
}
