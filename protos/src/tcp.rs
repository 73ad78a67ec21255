//! TCP (RFC 793). The option area uses the same tag-length-value engine
//! as every other option-bearing protocol in this crate, with one
//! exception: kind 0 (end-of-options) and kind 1 (no-op) have no length
//! byte on the wire, so they're handled as raw padding around the real,
//! length-prefixed options rather than represented as [`TlvOption`]s.
//!
//! The checksum is always freshly computed at serialize time from the
//! live enclosing [`crate::ipv4::Ipv4`], the same way as
//! [`crate::udp::Udp`].

use crate::ip_proto::IpProto;
use crate::ipv4::Ipv4;
use crate::prelude::*;
use pduforge_ende::decode::take_bytes;
use std::io::Write;

const MIN_HEADER_LEN: usize = 20;
const MAX_OPTIONS_LEN: usize = 40;
const KIND_EOL: u8 = 0;
const KIND_NOP: u8 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TcpFlags {
    pub ns: bool,
    pub cwr: bool,
    pub ece: bool,
    pub urg: bool,
    pub ack: bool,
    pub psh: bool,
    pub rst: bool,
    pub syn: bool,
    pub fin: bool,
}

#[derive(Clone)]
pub struct Tcp {
    base: BasePdu,
    src_port: u16,
    dst_port: u16,
    seq_num: u32,
    ack_num: u32,
    flags: TcpFlags,
    window: u16,
    urgent_ptr: u16,
    options: OptionList,
}

impl Tcp {
    pub fn new(src_port: u16, dst_port: u16) -> Self {
        Self {
            base: BasePdu::default(),
            src_port,
            dst_port,
            seq_num: 0,
            ack_num: 0,
            flags: TcpFlags::default(),
            window: 0,
            urgent_ptr: 0,
            options: OptionList::new(),
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

    pub fn seq_num(&self) -> u32 {
        self.seq_num
    }

    pub fn seq_num_mut(&mut self) -> &mut u32 {
        &mut self.seq_num
    }

    pub fn ack_num(&self) -> u32 {
        self.ack_num
    }

    pub fn ack_num_mut(&mut self) -> &mut u32 {
        &mut self.ack_num
    }

    pub fn flags(&self) -> TcpFlags {
        self.flags
    }

    pub fn flags_mut(&mut self) -> &mut TcpFlags {
        &mut self.flags
    }

    pub fn window(&self) -> u16 {
        self.window
    }

    pub fn window_mut(&mut self) -> &mut u16 {
        &mut self.window
    }

    pub fn urgent_ptr(&self) -> u16 {
        self.urgent_ptr
    }

    pub fn urgent_ptr_mut(&mut self) -> &mut u16 {
        &mut self.urgent_ptr
    }

    pub fn options(&self) -> &OptionList {
        &self.options
    }

    pub fn add_option(&mut self, code: u8, value: Vec<u8>) -> PduResult<()> {
        if code == KIND_EOL || code == KIND_NOP {
            return Err(PduError::MalformedOption);
        }
        if self.options_padded_len_with(&value, code) > MAX_OPTIONS_LEN {
            tracing::warn!(code, "option dropped: would exceed the 40-byte TCP options area");
            return Err(PduError::OptionTooLarge);
        }
        self.options.add(code, value)
    }

    fn options_padded_len_with(&self, extra_value: &[u8], _extra_code: u8) -> usize {
        let hypothetical = self.options.total_len() + 2 + extra_value.len();
        (hypothetical + 3) / 4 * 4
    }

    fn options_padded_len(&self) -> usize {
        (self.options.total_len() + 3) / 4 * 4
    }

    fn flags_bytes(&self) -> [u8; 2] {
        let byte12_ns = if self.flags.ns { 0x01 } else { 0x00 };
        let mut byte13 = 0u8;
        if self.flags.cwr {
            byte13 |= 0x80;
        }
        if self.flags.ece {
            byte13 |= 0x40;
        }
        if self.flags.urg {
            byte13 |= 0x20;
        }
        if self.flags.ack {
            byte13 |= 0x10;
        }
        if self.flags.psh {
            byte13 |= 0x08;
        }
        if self.flags.rst {
            byte13 |= 0x04;
        }
        if self.flags.syn {
            byte13 |= 0x02;
        }
        if self.flags.fin {
            byte13 |= 0x01;
        }
        [byte12_ns, byte13]
    }

    fn checksum_over(&self, parent: Option<&dyn PduObj>, header_and_options: &[u8], payload: &[u8]) -> u16 {
        let mut acc = checksum::U16OnesComplement::new();
        if let Some(ipv4) = parent.and_then(|p| p.as_any().downcast_ref::<Ipv4>()) {
            let total_len = (header_and_options.len() + payload.len()) as u16;
            let mut pseudo = [0u8; 12];
            pseudo[0..4].copy_from_slice(&ipv4.src_address().octets());
            pseudo[4..8].copy_from_slice(&ipv4.dst_address().octets());
            pseudo[9] = IpProto::TCP.0;
            pseudo[10..12].copy_from_slice(&total_len.to_be_bytes());
            acc.write_all(&pseudo).expect("in-memory writer never fails");
        }
        acc.write_all(header_and_options).expect("in-memory writer never fails");
        acc.write_all(payload).expect("in-memory writer never fails");
        acc.checksum()
    }
}

impl Dissect for Tcp {
    fn dissect(buf: &[u8]) -> DResult<Self> {
        if buf.len() < MIN_HEADER_LEN {
            return Err(PduError::BufferTooShort.into());
        }
        let mut cursor = buf;
        let src_port: u16 = cursor.decode_be()?;
        let dst_port: u16 = cursor.decode_be()?;
        let seq_num: u32 = cursor.decode_be()?;
        let ack_num: u32 = cursor.decode_be()?;
        let byte12: u8 = cursor.decode()?;
        let byte13: u8 = cursor.decode()?;
        let window: u16 = cursor.decode_be()?;
        let _checksum: u16 = cursor.decode_be()?;
        let urgent_ptr: u16 = cursor.decode_be()?;

        let data_offset = (byte12 >> 4) as usize;
        if data_offset < 5 {
            return Err(PduError::MalformedOption.into());
        }
        let header_len = data_offset * 4;
        if buf.len() < header_len {
            return Err(PduError::BufferTooShort.into());
        }
        let options_len = header_len - MIN_HEADER_LEN;
        let options_bytes = take_bytes(&mut cursor, options_len)?;
        let options = parse_tcp_options(&options_bytes)?;

        let flags = TcpFlags {
            ns: byte12 & 0x01 != 0,
            cwr: byte13 & 0x80 != 0,
            ece: byte13 & 0x40 != 0,
            urg: byte13 & 0x20 != 0,
            ack: byte13 & 0x10 != 0,
            psh: byte13 & 0x08 != 0,
            rst: byte13 & 0x04 != 0,
            syn: byte13 & 0x02 != 0,
            fin: byte13 & 0x01 != 0,
        };

        let mut tcp = Self {
            base: BasePdu::default(),
            src_port,
            dst_port,
            seq_num,
            ack_num,
            flags,
            window,
            urgent_ptr,
            options,
        };

        let payload = cursor;
        if !payload.is_empty() {
            let inner = AnyPdu::new(RawPdu::dissect(payload).expect("RawPdu::dissect is infallible"));
            tcp.set_inner_any(inner);
        }
        Ok(tcp)
    }
}

fn parse_tcp_options(mut bytes: &[u8]) -> DResult<OptionList> {
    let mut list = OptionList::new();
    while !bytes.is_empty() {
        let kind = bytes[0];
        if kind == KIND_EOL {
            break;
        }
        if kind == KIND_NOP {
            bytes = &bytes[1..];
            continue;
        }
        if bytes.len() < 2 {
            return Err(PduError::TruncatedOption.into());
        }
        let len = bytes[1] as usize;
        if len < 2 || bytes.len() < len {
            return Err(PduError::TruncatedOption.into());
        }
        let value = bytes[2..len].to_vec();
        list.add(kind, value).map_err(DissectError::from)?;
        bytes = &bytes[len..];
    }
    Ok(list)
}

impl Pdu for Tcp {
    fn base_pdu(&self) -> &BasePdu {
        &self.base
    }

    fn base_pdu_mut(&mut self) -> &mut BasePdu {
        &mut self.base
    }

    fn header_len(&self) -> usize {
        MIN_HEADER_LEN + self.options_padded_len()
    }

    fn serialize_header(&self, buf: &mut [u8], parent: Option<&dyn PduObj>) {
        let options_len = self.options_padded_len();
        let data_offset = ((MIN_HEADER_LEN + options_len) / 4) as u8;
        let [byte12_ns, byte13] = self.flags_bytes();
        let byte12 = (data_offset << 4) | byte12_ns;

        let mut header = vec![0u8; MIN_HEADER_LEN + options_len];
        {
            let mut w = &mut header[..];
            w.encode_be(&self.src_port);
            w.encode_be(&self.dst_port);
            w.encode_be(&self.seq_num);
            w.encode_be(&self.ack_num);
            w.encode(&byte12);
            w.encode(&byte13);
            w.encode_be(&self.window);
            w.encode_be(&0u16);
            w.encode_be(&self.urgent_ptr);
        }
        self.options.serialize_in_order(&mut header[MIN_HEADER_LEN..MIN_HEADER_LEN + self.options.total_len()]);

        let payload = self.inner_pdu().map(AnyPdu::serialize).unwrap_or_default();
        let checksum = self.checksum_over(parent, &header, &payload);
        header[16..18].copy_from_slice(&checksum.to_be_bytes());

        buf.copy_from_slice(&header);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_header_with_options() {
        let mut tcp = Tcp::new(1234, 80);
        tcp.flags_mut().syn = true;
        tcp.add_option(2, vec![0x05, 0xB4]).unwrap();
        let bytes = tcp.serialize();
        let parsed = Tcp::dissect(&bytes).unwrap();
        assert_eq!(parsed.src_port(), 1234);
        assert!(parsed.flags().syn);
        assert_eq!(parsed.options().get(2).unwrap().value(), &[0x05, 0xB4]);
    }

    #[test]
    fn header_len_is_4byte_aligned() {
        let mut tcp = Tcp::new(1, 2);
        tcp.add_option(2, vec![0x05, 0xB4]).unwrap();
        assert_eq!(tcp.header_len() % 4, 0);
    }
}
