//! A reusable type-length-value (TLV) engine shared by every option- or
//! tagged-element-bearing protocol (DHCP options, 802.11 information
//! elements, TCP options). The engine itself is agnostic to whether the
//! family uses an end sentinel (DHCP) or terminates at buffer exhaustion
//! (802.11); callers choose the parse/serialize entry point that matches
//! their framing.

use crate::error::{PduError, PduResult};
use pduforge_ende::decode::{DecodeBe, DecodeBuf};
use pduforge_ende::encode::{Encodable, EncodeBe};

/// One `(code, value)` pair. `length` is never stored separately — it is
/// always `value.len()`, enforced at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlvOption {
    code: u8,
    value: Vec<u8>,
}

impl TlvOption {
    pub fn new(code: u8, value: Vec<u8>) -> PduResult<Self> {
        if value.len() > 255 {
            tracing::warn!(code, len = value.len(), "option dropped: value exceeds 255 bytes");
            return Err(PduError::OptionTooLarge);
        }
        Ok(Self { code, value })
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Vec<u8> {
        &mut self.value
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    fn encoded_size(&self) -> usize {
        2 + self.value.len()
    }

    fn write(&self, buf: &mut [u8]) {
        buf[0] = self.code;
        buf[1] = self.value.len() as u8;
        buf[2..].copy_from_slice(&self.value);
    }
}

/// An ordered sequence of [`TlvOption`]s, preserving insertion order and
/// permitting duplicate codes (first-match lookup is load-bearing per
/// RFC 2131 semantics).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionList {
    options: Vec<TlvOption>,
}

impl OptionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TlvOption> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Returns the first option with the given code, per the
    /// first-match lookup rule.
    pub fn get(&self, code: u8) -> Option<&TlvOption> {
        self.options.iter().find(|o| o.code == code)
    }

    pub fn get_mut(&mut self, code: u8) -> Option<&mut TlvOption> {
        self.options.iter_mut().find(|o| o.code == code)
    }

    pub fn remove(&mut self, code: u8) -> Option<TlvOption> {
        let idx = self.options.iter().position(|o| o.code == code)?;
        Some(self.options.remove(idx))
    }

    /// Appends a raw `(code, value)` pair. Does not dedupe against an
    /// existing option of the same code.
    pub fn add(&mut self, code: u8, value: Vec<u8>) -> PduResult<()> {
        self.options.push(TlvOption::new(code, value)?);
        Ok(())
    }

    /// Adds an option whose value is a single scalar's big-endian
    /// encoding (e.g. DHCP's lease-time option).
    pub fn add_scalar_be<T: EncodeBe>(&mut self, code: u8, value: &T) -> PduResult<()> {
        let mut bytes = Vec::with_capacity(value.encoded_size());
        value.encode_be(&mut bytes);
        self.add(code, bytes)
    }

    /// Reads an option's value as a single scalar; fails softly (returns
    /// `None`) if the option is absent or its length doesn't match `T`'s
    /// encoded width, matching the getter-never-raises rule.
    pub fn get_scalar_be<T: DecodeBe + Default + Encodable>(&self, code: u8) -> Option<T> {
        let opt = self.get(code)?;
        let mut value = T::default();
        if opt.len() != value.encoded_size() {
            return None;
        }
        let mut buf = opt.value();
        value.decode_be(&mut buf).ok()?;
        Some(value)
    }

    /// Total bytes this list occupies when there is no end sentinel
    /// (802.11-style tagged elements).
    pub fn total_len(&self) -> usize {
        self.options.iter().map(TlvOption::encoded_size).sum()
    }

    /// Total bytes including a single trailing end-sentinel byte
    /// (DHCP-style).
    pub fn total_len_with_end(&self) -> usize {
        self.total_len() + 1
    }

    /// Writes options in insertion order, with no sentinel and no
    /// padding. Used by tagged-element trailers (802.11).
    pub fn serialize_in_order(&self, buf: &mut [u8]) {
        self.write_ordered(buf, self.options.iter());
    }

    /// Writes options sorted by ascending code. Callers use this only
    /// when every code present is one of the protocol's known tags —
    /// see the frame-body variant codec's canonical-order rule.
    pub fn serialize_canonical(&self, buf: &mut [u8]) {
        let mut sorted: Vec<&TlvOption> = self.options.iter().collect();
        sorted.sort_by_key(|o| o.code);
        self.write_ordered(buf, sorted.into_iter());
    }

    fn write_ordered<'a>(&self, mut buf: &mut [u8], options: impl Iterator<Item = &'a TlvOption>) {
        for opt in options {
            let size = opt.encoded_size();
            let (head, rest) = buf.split_at_mut(size);
            opt.write(head);
            buf = rest;
        }
    }

    /// Writes options in insertion order followed by one `end` sentinel
    /// byte (DHCP: `end = 255`).
    pub fn serialize_with_end(&self, buf: &mut [u8], end: u8) {
        let opts_len = self.total_len();
        let (opts_buf, tail) = buf.split_at_mut(opts_len);
        self.write_ordered(opts_buf, self.options.iter());
        tail[0] = end;
    }

    /// Parses a tagged-element trailer with no end sentinel: consumes
    /// `buf` to exhaustion, one `(code, length, value)` triple at a time.
    pub fn parse_tagged<B: DecodeBuf>(buf: &mut B) -> PduResult<Self> {
        let mut options = Vec::new();
        while buf.has_remaining() {
            let code: u8 = buf.decode().map_err(|_| PduError::TruncatedOption)?;
            let len: u8 = buf.decode().map_err(|_| PduError::TruncatedOption)?;
            if (len as usize) > buf.remaining() {
                return Err(PduError::TruncatedOption);
            }
            let value = pduforge_ende::decode::take_bytes(buf, len as usize)
                .map_err(|_| PduError::TruncatedOption)?;
            options.push(TlvOption { code, value });
        }
        Ok(Self { options })
    }

    /// Parses a sentinel-terminated option area (DHCP: `end = 255`,
    /// `pad = Some(0)`). Stops at the first `end` byte; runs of `pad`
    /// bytes between options are skipped, not recorded.
    pub fn parse_with_end<B: DecodeBuf>(buf: &mut B, end: u8, pad: Option<u8>) -> PduResult<Self> {
        let mut options = Vec::new();
        loop {
            if !buf.has_remaining() {
                break;
            }
            let code: u8 = buf.decode().map_err(|_| PduError::TruncatedOption)?;
            if code == end {
                break;
            }
            if Some(code) == pad {
                continue;
            }
            let len: u8 = buf.decode().map_err(|_| PduError::TruncatedOption)?;
            if (len as usize) > buf.remaining() {
                return Err(PduError::TruncatedOption);
            }
            let value = pduforge_ende::decode::take_bytes(buf, len as usize)
                .map_err(|_| PduError::TruncatedOption)?;
            options.push(TlvOption { code, value });
        }
        Ok(Self { options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order_and_first_match() {
        let mut list = OptionList::new();
        list.add(1, vec![0xAA]).unwrap();
        list.add(1, vec![0xBB]).unwrap();
        list.add(2, vec![0xCC]).unwrap();
        assert_eq!(list.get(1).unwrap().value(), &[0xAA]);
        let codes: Vec<u8> = list.iter().map(TlvOption::code).collect();
        assert_eq!(codes, vec![1, 1, 2]);
    }

    #[test]
    fn round_trips_with_end_sentinel() {
        let mut list = OptionList::new();
        list.add(53, vec![3]).unwrap();
        list.add(50, vec![192, 0, 2, 5]).unwrap();
        let mut buf = vec![0u8; list.total_len_with_end()];
        list.serialize_with_end(&mut buf, 255);
        let mut cursor: &[u8] = &buf;
        let parsed = OptionList::parse_with_end(&mut cursor, 255, Some(0)).unwrap();
        assert_eq!(parsed, list);
    }

    #[test]
    fn skips_pad_bytes_between_options() {
        let raw = [0u8, 0, 53, 1, 3, 255];
        let mut cursor: &[u8] = &raw;
        let parsed = OptionList::parse_with_end(&mut cursor, 255, Some(0)).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get(53).unwrap().value(), &[3]);
    }

    #[test]
    fn truncated_option_is_rejected() {
        let raw = [53u8, 5, 3];
        let mut cursor: &[u8] = &raw;
        assert_eq!(
            OptionList::parse_with_end(&mut cursor, 255, Some(0)),
            Err(PduError::TruncatedOption)
        );
    }

    #[test]
    fn tagged_trailer_has_no_sentinel() {
        let mut list = OptionList::new();
        list.add(0, b"US ".to_vec()).unwrap();
        let mut buf = vec![0u8; list.total_len()];
        list.serialize_in_order(&mut buf);
        let mut cursor: &[u8] = &buf;
        let parsed = OptionList::parse_tagged(&mut cursor).unwrap();
        assert_eq!(parsed, list);
    }

    #[test]
    fn canonical_order_sorts_by_code() {
        let mut list = OptionList::new();
        list.add(5, vec![1]).unwrap();
        list.add(1, vec![2]).unwrap();
        let mut buf = vec![0u8; list.total_len()];
        list.serialize_canonical(&mut buf);
        assert_eq!(buf, vec![1, 1, 2, 5, 1, 1]);
    }
}
