//! DHCP (RFC 2131), built by composing a [`Bootp`] with the magic
//! cookie and a DHCP option area rather than deriving from it: a `Dhcp`
//! holds a `Bootp` value and is not itself a `Bootp`.

use crate::bootp::Bootp;
use crate::prelude::*;

const MAGIC_COOKIE: u32 = 0x6382_5363;
const OPT_MESSAGE_TYPE: u8 = 53;
const OPT_SUBNET_MASK: u8 = 1;
const OPT_ROUTERS: u8 = 3;
const OPT_LEASE_TIME: u8 = 51;
const END: u8 = 255;
const PAD: u8 = 0;

/// The largest the options area (including the trailing `end` sentinel)
/// is allowed to grow: RFC 2131 requires a DHCP message to fit the
/// 576-byte minimum IP datagram every host must accept, which leaves
/// `576 - 20 (IP) - 8 (UDP) - 236 (BOOTP) - 4 (magic cookie)` bytes here.
const MAX_OPTIONS_AREA_LEN: usize = 308;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    Discover,
    Offer,
    Request,
    Decline,
    Ack,
    Nak,
    Release,
    Inform,
    Unknown(u8),
}

impl From<u8> for MessageType {
    fn from(v: u8) -> Self {
        match v {
            1 => MessageType::Discover,
            2 => MessageType::Offer,
            3 => MessageType::Request,
            4 => MessageType::Decline,
            5 => MessageType::Ack,
            6 => MessageType::Nak,
            7 => MessageType::Release,
            8 => MessageType::Inform,
            other => MessageType::Unknown(other),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(mt: MessageType) -> Self {
        match mt {
            MessageType::Discover => 1,
            MessageType::Offer => 2,
            MessageType::Request => 3,
            MessageType::Decline => 4,
            MessageType::Ack => 5,
            MessageType::Nak => 6,
            MessageType::Release => 7,
            MessageType::Inform => 8,
            MessageType::Unknown(v) => v,
        }
    }
}

#[derive(Clone)]
pub struct Dhcp {
    base: BasePdu,
    bootp: Bootp,
    options: OptionList,
}

impl Dhcp {
    pub fn new(op: u8, xid: u32) -> Self {
        Self {
            base: BasePdu::default(),
            bootp: Bootp::new(op, xid),
            options: OptionList::new(),
        }
    }

    pub fn bootp(&self) -> &Bootp {
        &self.bootp
    }

    pub fn bootp_mut(&mut self) -> &mut Bootp {
        &mut self.bootp
    }

    pub fn options(&self) -> &OptionList {
        &self.options
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.options.get(OPT_MESSAGE_TYPE).and_then(|opt| opt.value().first().copied()).map(MessageType::from)
    }

    pub fn set_message_type(&mut self, mt: MessageType) -> PduResult<()> {
        self.add_option_checked(OPT_MESSAGE_TYPE, vec![mt.into()])
    }

    pub fn search_subnet_mask(&self) -> Option<IPv4Address> {
        let value = self.options.get(OPT_SUBNET_MASK)?.value();
        if value.len() != 4 {
            return None;
        }
        Some(IPv4Address::from([value[0], value[1], value[2], value[3]]))
    }

    pub fn set_subnet_mask(&mut self, mask: IPv4Address) -> PduResult<()> {
        self.add_option_checked(OPT_SUBNET_MASK, mask.octets().to_vec())
    }

    pub fn routers(&self) -> Vec<IPv4Address> {
        match self.options.get(OPT_ROUTERS) {
            Some(opt) => opt
                .value()
                .chunks_exact(4)
                .map(|c| IPv4Address::from([c[0], c[1], c[2], c[3]]))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn add_routers_option(&mut self, addrs: &[IPv4Address]) -> PduResult<()> {
        let mut value = Vec::with_capacity(addrs.len() * 4);
        for addr in addrs {
            value.extend_from_slice(&addr.octets());
        }
        self.add_option_checked(OPT_ROUTERS, value)
    }

    pub fn lease_time(&self) -> Option<u32> {
        self.options.get_scalar_be::<u32>(OPT_LEASE_TIME)
    }

    pub fn add_lease_time(&mut self, secs: u32) -> PduResult<()> {
        let mut value = Vec::with_capacity(4);
        secs.encode_be(&mut value);
        self.add_option_checked(OPT_LEASE_TIME, value)
    }

    /// Appends an option, failing with [`PduError::OptionTooLarge`] if
    /// doing so would grow the options area (including its `end`
    /// sentinel) past [`MAX_OPTIONS_AREA_LEN`], in addition to the
    /// per-option 255-byte cap [`OptionList::add`] already enforces.
    fn add_option_checked(&mut self, code: u8, value: Vec<u8>) -> PduResult<()> {
        let hypothetical = self.options.total_len() + 2 + value.len() + 1;
        if hypothetical > MAX_OPTIONS_AREA_LEN {
            tracing::warn!(code, "option dropped: would exceed the DHCP minimum-message options area");
            return Err(PduError::OptionTooLarge);
        }
        self.options.add(code, value)
    }
}

impl Dissect for Dhcp {
    fn dissect(buf: &[u8]) -> DResult<Self> {
        let bootp = Bootp::dissect(buf)?;
        let rest = &buf[crate::bootp::HEADER_LEN..];
        if rest.len() < 4 {
            return Err(PduError::BufferTooShort.into());
        }
        let cookie = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]);
        if cookie != MAGIC_COOKIE {
            return Err(PduError::MalformedOption.into());
        }
        let mut cursor = &rest[4..];
        let options = OptionList::parse_with_end(&mut cursor, END, Some(PAD))?;

        Ok(Self {
            base: BasePdu::default(),
            bootp,
            options,
        })
    }
}

impl Pdu for Dhcp {
    fn base_pdu(&self) -> &BasePdu {
        &self.base
    }

    fn base_pdu_mut(&mut self) -> &mut BasePdu {
        &mut self.base
    }

    fn header_len(&self) -> usize {
        crate::bootp::HEADER_LEN + 4 + self.options.total_len_with_end()
    }

    fn serialize_header(&self, buf: &mut [u8], _parent: Option<&dyn PduObj>) {
        let fixed_len = crate::bootp::HEADER_LEN;
        Pdu::serialize_header(&self.bootp, &mut buf[..fixed_len], None);
        buf[fixed_len..fixed_len + 4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
        self.options.serialize_with_end(&mut buf[fixed_len + 4..], END);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_options() {
        let mut dhcp = Dhcp::new(crate::bootp::OP_REQUEST, 0x1234);
        dhcp.set_message_type(MessageType::Discover).unwrap();
        dhcp.add_lease_time(3600).unwrap();
        dhcp.set_subnet_mask(IPv4Address::new(255, 255, 255, 0)).unwrap();

        let bytes = dhcp.serialize();
        let parsed = Dhcp::dissect(&bytes).unwrap();
        assert_eq!(parsed.message_type(), Some(MessageType::Discover));
        assert_eq!(parsed.lease_time(), Some(3600));
        assert_eq!(parsed.search_subnet_mask(), Some(IPv4Address::new(255, 255, 255, 0)));
    }

    #[test]
    fn rejects_missing_magic_cookie() {
        let bootp = Bootp::new(crate::bootp::OP_REQUEST, 0);
        let bytes = bootp.serialize();
        assert!(Dhcp::dissect(&bytes).is_err());
    }

    #[test]
    fn rejects_option_that_would_exceed_minimum_message_floor() {
        let mut dhcp = Dhcp::new(crate::bootp::OP_REQUEST, 0x1234);
        let addrs = vec![IPv4Address::new(0, 0, 0, 0); MAX_OPTIONS_AREA_LEN / 4 + 1];
        assert_eq!(dhcp.add_routers_option(&addrs), Err(PduError::OptionTooLarge));
        assert!(dhcp.options.is_empty());
    }
}
