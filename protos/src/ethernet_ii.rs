//! Ethernet II framing: 14-byte header (dst/src MAC + ethertype) plus an
//! auto-computed zero-padding trailer when the payload is short of the
//! 64-byte minimum frame size.

use crate::arp::Arp;
use crate::ethertype::Ethertype;
use crate::ipv4::Ipv4;
use crate::prelude::*;
use lazy_static::lazy_static;

dissector_table!(pub EthertypeTable, Ethertype);

lazy_static! {
    static ref ETHERTYPE_TABLE: EthertypeTable = {
        let mut table = EthertypeTable::default();
        table.register(Ethertype::IPV4, |buf| Ipv4::dissect(buf).map(AnyPdu::new));
        table.register(Ethertype::ARP, |buf| Arp::dissect(buf).map(AnyPdu::new));
        table
    };
}

const MIN_PAYLOAD: usize = 46;
const PADDING: [u8; MIN_PAYLOAD] = [0u8; MIN_PAYLOAD];

#[derive(Clone)]
pub struct EthernetII {
    base: BasePdu,
    dst_addr: MacAddress,
    src_addr: MacAddress,
    ethertype: Ethertype,
    trailer: Vec<u8>,
}

impl EthernetII {
    pub fn new(dst_addr: MacAddress, src_addr: MacAddress) -> Self {
        Self {
            base: BasePdu::default(),
            dst_addr,
            src_addr,
            ethertype: Ethertype(0),
            trailer: Vec::new(),
        }
    }

    pub fn dst_address(&self) -> MacAddress {
        self.dst_addr
    }

    pub fn dst_address_mut(&mut self) -> &mut MacAddress {
        &mut self.dst_addr
    }

    pub fn src_address(&self) -> MacAddress {
        self.src_addr
    }

    pub fn src_address_mut(&mut self) -> &mut MacAddress {
        &mut self.src_addr
    }

    pub fn ethertype(&self) -> Ethertype {
        self.ethertype
    }

    pub fn ethertype_mut(&mut self) -> &mut Ethertype {
        &mut self.ethertype
    }

    fn auto_trailer_len(&self, inner_len: usize) -> usize {
        MIN_PAYLOAD.saturating_sub(inner_len)
    }
}

impl Dissect for EthernetII {
    fn dissect(buf: &[u8]) -> DResult<Self> {
        if buf.len() < 14 {
            return Err(PduError::BufferTooShort.into());
        }
        let mut cursor = buf;
        let dst_addr: MacAddress = cursor.decode()?;
        let src_addr: MacAddress = cursor.decode()?;
        let ethertype = Ethertype(cursor.decode_be()?);

        let mut eth = Self {
            base: BasePdu::default(),
            dst_addr,
            src_addr,
            ethertype,
            trailer: Vec::new(),
        };

        let payload = cursor;
        if !payload.is_empty() {
            match ETHERTYPE_TABLE.demux(&ethertype, payload) {
                Demux::Dissected(inner) => {
                    let inner_len = inner.total_len();
                    if inner_len < payload.len() {
                        eth.trailer = payload[inner_len..].to_vec();
                    }
                    eth.set_inner_any(inner);
                }
                Demux::Unrecognized => {
                    let inner = AnyPdu::new(RawPdu::dissect(payload).expect("RawPdu::dissect is infallible"));
                    eth.set_inner_any(inner);
                }
                Demux::Failed(_) => eth.base_pdu_mut().set_unparsed(payload.to_vec()),
            }
        }
        Ok(eth)
    }
}

impl Pdu for EthernetII {
    fn base_pdu(&self) -> &BasePdu {
        &self.base
    }

    fn base_pdu_mut(&mut self) -> &mut BasePdu {
        &mut self.base
    }

    fn header_len(&self) -> usize {
        14
    }

    fn trailer_len(&self) -> usize {
        if self.trailer.is_empty() {
            let inner_len = self.inner_pdu().map(AnyPdu::total_len).unwrap_or(0);
            self.auto_trailer_len(inner_len)
        } else {
            self.trailer.len()
        }
    }

    fn serialize_header(&self, buf: &mut [u8], _parent: Option<&dyn PduObj>) {
        let mut w = &mut buf[..];
        w.encode(&self.dst_addr);
        w.encode(&self.src_addr);
        w.encode_be(&self.ethertype.0);
    }

    fn serialize_trailer(&self, buf: &mut [u8]) {
        if self.trailer.is_empty() {
            buf.copy_from_slice(&PADDING[..buf.len()]);
        } else {
            buf.copy_from_slice(&self.trailer);
        }
    }

    fn make_canonical(&mut self) {
        if let Some(inner) = self.inner_pdu() {
            self.ethertype = ethertype_of(inner).unwrap_or(self.ethertype);
        }
        self.trailer.clear();
    }
}

fn ethertype_of(inner: &AnyPdu) -> Option<Ethertype> {
    if inner.is::<Ipv4>() {
        Some(Ethertype::IPV4)
    } else if inner.is::<Arp>() {
        Some(Ethertype::ARP)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_header() {
        let mut eth = EthernetII::new(
            MacAddress::BROADCAST,
            MacAddress::new([0x02, 0x03, 0x04, 0x05, 0x06, 0x07]),
        );
        *eth.ethertype_mut() = Ethertype::IPV4;
        let bytes = eth.serialize();
        assert_eq!(bytes.len(), 14 + MIN_PAYLOAD);
        assert_eq!(&bytes[0..6], &[0xFF; 6]);
    }
}
