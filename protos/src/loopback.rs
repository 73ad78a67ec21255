//! DLT_NULL/DLT_LOOPBACK framing used by loopback capture links: a single
//! 4-byte address-family field, in the capturing host's native byte
//! order, ahead of the payload. Only `PF_INET` is dispatched; `PF_LLC`
//! (used by some BSDs for non-IP loopback traffic) is out of scope, and
//! anything else falls back to [`RawPdu`].

use crate::ipv4::Ipv4;
use crate::prelude::*;

const HEADER_LEN: usize = 4;
const PF_INET: u32 = 2;

#[derive(Clone)]
pub struct Loopback {
    base: BasePdu,
    family: u32,
}

impl Loopback {
    pub fn new() -> Self {
        Self {
            base: BasePdu::default(),
            family: PF_INET,
        }
    }

    pub fn family(&self) -> u32 {
        self.family
    }

    pub fn family_mut(&mut self) -> &mut u32 {
        &mut self.family
    }
}

impl Default for Loopback {
    fn default() -> Self {
        Self::new()
    }
}

impl Dissect for Loopback {
    fn dissect(buf: &[u8]) -> DResult<Self> {
        if buf.len() < HEADER_LEN {
            return Err(PduError::BufferTooShort.into());
        }
        let family = u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let payload = &buf[HEADER_LEN..];

        let mut pdu = Self {
            base: BasePdu::default(),
            family,
        };

        if !payload.is_empty() {
            if family == PF_INET {
                match Ipv4::dissect(payload) {
                    Ok(ip) => pdu.set_inner_pdu(ip),
                    Err(error) => {
                        tracing::debug!(%error, "registered PF_INET dissector failed; leaving inner unset");
                        pdu.base_pdu_mut().set_unparsed(payload.to_vec());
                    }
                }
            } else {
                let inner = AnyPdu::new(RawPdu::dissect(payload).expect("RawPdu::dissect is infallible"));
                pdu.set_inner_any(inner);
            }
        }
        Ok(pdu)
    }
}

impl Pdu for Loopback {
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
        buf.copy_from_slice(&self.family.to_ne_bytes());
    }

    fn make_canonical(&mut self) {
        if let Some(inner) = self.inner_pdu() {
            if inner.is::<Ipv4>() {
                self.family = PF_INET;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffer() {
        assert!(Loopback::dissect(&[0u8; 3]).is_err());
    }

    #[test]
    fn unknown_family_falls_back_to_raw() {
        let mut buf = 99u32.to_ne_bytes().to_vec();
        buf.extend_from_slice(&[1, 2, 3]);
        let lo = Loopback::dissect(&buf).unwrap();
        assert!(lo.inner_pdu().unwrap().is::<RawPdu>());
    }

    #[test]
    fn dispatches_pf_inet_to_ipv4() {
        let mut ip = Ipv4::new(IPv4Address::new(127, 0, 0, 1), IPv4Address::new(127, 0, 0, 1), crate::ip_proto::IpProto::UDP);
        ip.make_canonical();
        let mut buf = PF_INET.to_ne_bytes().to_vec();
        buf.extend_from_slice(&ip.serialize());
        let lo = Loopback::dissect(&buf).unwrap();
        assert!(lo.inner_pdu().unwrap().is::<Ipv4>());
    }
}
