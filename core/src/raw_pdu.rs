use crate::dissection::Dissect;
use crate::error::DResult;
use crate::pdu::{BasePdu, Pdu, PduObj};

/// The fallback leaf PDU: an opaque byte blob with no further structure.
/// Produced by a demultiplexer whenever no dissector claims a selector
/// value, and by [`RawPdu::new`] when a caller wants to attach arbitrary
/// payload bytes by hand.
pub struct RawPdu {
    base: BasePdu,
    data: Vec<u8>,
}

impl RawPdu {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            base: BasePdu::default(),
            data,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }
}

impl Clone for RawPdu {
    fn clone(&self) -> Self {
        Self {
            base: BasePdu::default(),
            data: self.data.clone(),
        }
    }
}

impl Pdu for RawPdu {
    fn base_pdu(&self) -> &BasePdu {
        &self.base
    }

    fn base_pdu_mut(&mut self) -> &mut BasePdu {
        &mut self.base
    }

    fn header_len(&self) -> usize {
        self.data.len()
    }

    fn serialize_header(&self, buf: &mut [u8], _parent: Option<&dyn PduObj>) {
        buf.copy_from_slice(&self.data);
    }
}

impl Dissect for RawPdu {
    fn dissect(buf: &[u8]) -> DResult<Self> {
        Ok(Self {
            base: BasePdu::default(),
            data: Vec::from(buf),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::PduExt;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let raw = RawPdu::new(vec![1, 2, 3, 4]);
        assert_eq!(raw.total_len(), 4);
        assert_eq!(raw.serialize(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn dissect_consumes_whole_buffer() {
        let raw = RawPdu::dissect(&[9, 8, 7]).unwrap();
        assert_eq!(raw.data(), &[9, 8, 7]);
    }
}
