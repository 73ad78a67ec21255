//! BOOTP (RFC 951): the fixed 236-byte request/reply header DHCP
//! extends by composition in [`crate::dhcp::Dhcp`] rather than
//! inheritance — a `Dhcp` embeds a `Bootp` value and adds the magic
//! cookie and option area after it.

use crate::prelude::*;

pub const HEADER_LEN: usize = 236;

pub const OP_REQUEST: u8 = 1;
pub const OP_REPLY: u8 = 2;

pub const HTYPE_ETHERNET: u8 = 1;

#[derive(Clone)]
pub struct Bootp {
    base: BasePdu,
    op: u8,
    htype: u8,
    hlen: u8,
    hops: u8,
    xid: u32,
    secs: u16,
    flags: u16,
    ciaddr: IPv4Address,
    yiaddr: IPv4Address,
    siaddr: IPv4Address,
    giaddr: IPv4Address,
    chaddr: [u8; 16],
    sname: [u8; 64],
    file: [u8; 128],
}

impl Bootp {
    pub fn new(op: u8, xid: u32) -> Self {
        Self {
            base: BasePdu::default(),
            op,
            htype: HTYPE_ETHERNET,
            hlen: 6,
            hops: 0,
            xid,
            secs: 0,
            flags: 0,
            ciaddr: IPv4Address::default(),
            yiaddr: IPv4Address::default(),
            siaddr: IPv4Address::default(),
            giaddr: IPv4Address::default(),
            chaddr: [0u8; 16],
            sname: [0u8; 64],
            file: [0u8; 128],
        }
    }

    pub fn op(&self) -> u8 {
        self.op
    }

    pub fn op_mut(&mut self) -> &mut u8 {
        &mut self.op
    }

    pub fn htype(&self) -> u8 {
        self.htype
    }

    pub fn hlen(&self) -> u8 {
        self.hlen
    }

    pub fn hops(&self) -> u8 {
        self.hops
    }

    pub fn hops_mut(&mut self) -> &mut u8 {
        &mut self.hops
    }

    pub fn xid(&self) -> u32 {
        self.xid
    }

    pub fn xid_mut(&mut self) -> &mut u32 {
        &mut self.xid
    }

    pub fn secs(&self) -> u16 {
        self.secs
    }

    pub fn secs_mut(&mut self) -> &mut u16 {
        &mut self.secs
    }

    pub fn broadcast(&self) -> bool {
        self.flags & 0x8000 != 0
    }

    pub fn set_broadcast(&mut self, broadcast: bool) {
        if broadcast {
            self.flags |= 0x8000;
        } else {
            self.flags &= !0x8000;
        }
    }

    pub fn client_addr(&self) -> IPv4Address {
        self.ciaddr
    }

    pub fn client_addr_mut(&mut self) -> &mut IPv4Address {
        &mut self.ciaddr
    }

    pub fn your_addr(&self) -> IPv4Address {
        self.yiaddr
    }

    pub fn your_addr_mut(&mut self) -> &mut IPv4Address {
        &mut self.yiaddr
    }

    pub fn server_addr(&self) -> IPv4Address {
        self.siaddr
    }

    pub fn server_addr_mut(&mut self) -> &mut IPv4Address {
        &mut self.siaddr
    }

    pub fn relay_addr(&self) -> IPv4Address {
        self.giaddr
    }

    pub fn relay_addr_mut(&mut self) -> &mut IPv4Address {
        &mut self.giaddr
    }

    pub fn client_hw_addr(&self) -> MacAddress {
        MacAddress::new([
            self.chaddr[0],
            self.chaddr[1],
            self.chaddr[2],
            self.chaddr[3],
            self.chaddr[4],
            self.chaddr[5],
        ])
    }

    pub fn set_client_hw_addr(&mut self, mac: MacAddress) {
        self.chaddr[0..6].copy_from_slice(&mac.octets());
    }

    pub fn server_name(&self) -> &[u8; 64] {
        &self.sname
    }

    pub fn boot_filename(&self) -> &[u8; 128] {
        &self.file
    }
}

impl Dissect for Bootp {
    fn dissect(buf: &[u8]) -> DResult<Self> {
        if buf.len() < HEADER_LEN {
            return Err(PduError::BufferTooShort.into());
        }
        let mut cursor = buf;
        let op: u8 = cursor.decode()?;
        let htype: u8 = cursor.decode()?;
        let hlen: u8 = cursor.decode()?;
        let hops: u8 = cursor.decode()?;
        let xid: u32 = cursor.decode_be()?;
        let secs: u16 = cursor.decode_be()?;
        let flags: u16 = cursor.decode_be()?;
        let ciaddr: IPv4Address = cursor.decode()?;
        let yiaddr: IPv4Address = cursor.decode()?;
        let siaddr: IPv4Address = cursor.decode()?;
        let giaddr: IPv4Address = cursor.decode()?;
        let chaddr: [u8; 16] = cursor.decode()?;
        let sname: [u8; 64] = cursor.decode()?;
        let file: [u8; 128] = cursor.decode()?;

        Ok(Self {
            base: BasePdu::default(),
            op,
            htype,
            hlen,
            hops,
            xid,
            secs,
            flags,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
            sname,
            file,
        })
    }
}

impl Pdu for Bootp {
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
        w.encode(&self.op);
        w.encode(&self.htype);
        w.encode(&self.hlen);
        w.encode(&self.hops);
        w.encode_be(&self.xid);
        w.encode_be(&self.secs);
        w.encode_be(&self.flags);
        w.encode(&self.ciaddr);
        w.encode(&self.yiaddr);
        w.encode(&self.siaddr);
        w.encode(&self.giaddr);
        w.encode(&self.chaddr);
        w.encode(&self.sname);
        w.encode(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_fixed_header() {
        let mut bootp = Bootp::new(OP_REQUEST, 0xDEADBEEF);
        bootp.set_client_hw_addr(MacAddress::new([1, 2, 3, 4, 5, 6]));
        let bytes = bootp.serialize();
        assert_eq!(bytes.len(), HEADER_LEN);
        let parsed = Bootp::dissect(&bytes).unwrap();
        assert_eq!(parsed.xid(), 0xDEADBEEF);
        assert_eq!(parsed.client_hw_addr(), MacAddress::new([1, 2, 3, 4, 5, 6]));
    }
}
