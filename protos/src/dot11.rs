//! IEEE 802.11-2012 management frames. Only the fields this crate's
//! demultiplexer needs are modeled: the fixed addressing header shared
//! by every management subtype, and the Beacon body.
//!
//! The source hierarchy this is distilled from expresses Beacon as
//! `Dot11 <- Dot11ManagementFrame <- Dot11Beacon`. Rather than replicate
//! that as a trait/struct inheritance chain, it is flattened into the
//! same two-layer PDU chain every other protocol in this crate uses:
//! [`Dot11`] is the fixed 24-byte addressing header (common to every
//! management subtype this crate recognizes), and [`Dot11Beacon`] is the
//! inner leaf the demultiplexer selects by `(type, subtype)`, the same
//! way [`crate::loopback::Loopback`] selects its inner PDU by address
//! family. `kind()` (via [`AnyPdu::is`]/[`AnyPdu::downcast_ref`]) is the
//! tagged-variant discriminator the composition note calls for.
//!
//! All multi-byte fields in this module are little-endian, unlike the
//! rest of this crate's network-byte-order protocols.

use crate::prelude::*;
use lazy_static::lazy_static;

const HEADER_LEN: usize = 24;
const BEACON_FIXED_LEN: usize = 12;

pub const TYPE_MANAGEMENT: u8 = 0;
pub const SUBTYPE_BEACON: u8 = 8;

const TAG_SSID: u8 = 0;
const TAG_SUPPORTED_RATES: u8 = 1;
const TAG_DS_PARAMETER_SET: u8 = 3;
const TAG_TIM: u8 = 5;
const TAG_COUNTRY: u8 = 7;
const TAG_RSN: u8 = 48;
const KNOWN_TAGS: [u8; 6] = [TAG_SSID, TAG_SUPPORTED_RATES, TAG_DS_PARAMETER_SET, TAG_TIM, TAG_COUNTRY, TAG_RSN];

dissector_table!(pub Dot11FrameTable, (u8, u8));

lazy_static! {
    static ref FRAME_TABLE: Dot11FrameTable = {
        let mut table = Dot11FrameTable::default();
        table.register((TYPE_MANAGEMENT, SUBTYPE_BEACON), |buf| Dot11Beacon::dissect(buf).map(AnyPdu::new));
        table
    };
}

/// The frame control field, unpacked. `protocol_version`/`frame_type`/
/// `subtype` occupy the first byte; the flags occupy the second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameControl {
    pub protocol_version: u8,
    pub frame_type: u8,
    pub subtype: u8,
    pub to_ds: bool,
    pub from_ds: bool,
    pub more_frag: bool,
    pub retry: bool,
    pub pwr_mgmt: bool,
    pub more_data: bool,
    pub protected: bool,
    pub order: bool,
}

impl FrameControl {
    fn from_bytes(bytes: [u8; 2]) -> Self {
        let [b0, b1] = bytes;
        Self {
            protocol_version: b0 & 0x03,
            frame_type: (b0 >> 2) & 0x03,
            subtype: (b0 >> 4) & 0x0F,
            to_ds: b1 & 0x01 != 0,
            from_ds: b1 & 0x02 != 0,
            more_frag: b1 & 0x04 != 0,
            retry: b1 & 0x08 != 0,
            pwr_mgmt: b1 & 0x10 != 0,
            more_data: b1 & 0x20 != 0,
            protected: b1 & 0x40 != 0,
            order: b1 & 0x80 != 0,
        }
    }

    fn to_bytes(self) -> [u8; 2] {
        let b0 = (self.subtype << 4) | (self.frame_type << 2) | self.protocol_version;
        let mut b1 = 0u8;
        if self.to_ds {
            b1 |= 0x01;
        }
        if self.from_ds {
            b1 |= 0x02;
        }
        if self.more_frag {
            b1 |= 0x04;
        }
        if self.retry {
            b1 |= 0x08;
        }
        if self.pwr_mgmt {
            b1 |= 0x10;
        }
        if self.more_data {
            b1 |= 0x20;
        }
        if self.protected {
            b1 |= 0x40;
        }
        if self.order {
            b1 |= 0x80;
        }
        [b0, b1]
    }
}

/// The fixed addressing header common to every management-frame subtype
/// this crate recognizes: frame control, duration/ID, three addresses,
/// and sequence control. No address 4 (WDS) — out of scope.
#[derive(Clone)]
pub struct Dot11 {
    base: BasePdu,
    frame_control: FrameControl,
    duration: u16,
    addr1: MacAddress,
    addr2: MacAddress,
    addr3: MacAddress,
    seq_ctrl: u16,
}

impl Dot11 {
    pub fn new(frame_control: FrameControl, addr1: MacAddress, addr2: MacAddress, addr3: MacAddress) -> Self {
        Self {
            base: BasePdu::default(),
            frame_control,
            duration: 0,
            addr1,
            addr2,
            addr3,
            seq_ctrl: 0,
        }
    }

    pub fn frame_control(&self) -> FrameControl {
        self.frame_control
    }

    pub fn frame_control_mut(&mut self) -> &mut FrameControl {
        &mut self.frame_control
    }

    pub fn duration(&self) -> u16 {
        self.duration
    }

    pub fn duration_mut(&mut self) -> &mut u16 {
        &mut self.duration
    }

    pub fn addr1(&self) -> MacAddress {
        self.addr1
    }

    pub fn addr1_mut(&mut self) -> &mut MacAddress {
        &mut self.addr1
    }

    pub fn addr2(&self) -> MacAddress {
        self.addr2
    }

    pub fn addr2_mut(&mut self) -> &mut MacAddress {
        &mut self.addr2
    }

    pub fn addr3(&self) -> MacAddress {
        self.addr3
    }

    pub fn addr3_mut(&mut self) -> &mut MacAddress {
        &mut self.addr3
    }

    pub fn fragment_number(&self) -> u8 {
        (self.seq_ctrl & 0x0F) as u8
    }

    pub fn set_fragment_number(&mut self, frag: u8) -> PduResult<()> {
        if frag > 0x0F {
            return Err(PduError::FieldOverflow);
        }
        self.seq_ctrl = (self.seq_ctrl & !0x0F) | frag as u16;
        Ok(())
    }

    pub fn sequence_number(&self) -> u16 {
        self.seq_ctrl >> 4
    }

    pub fn set_sequence_number(&mut self, seq: u16) -> PduResult<()> {
        if seq > 0x0FFF {
            return Err(PduError::FieldOverflow);
        }
        self.seq_ctrl = (self.seq_ctrl & 0x0F) | (seq << 4);
        Ok(())
    }
}

impl Dissect for Dot11 {
    fn dissect(buf: &[u8]) -> DResult<Self> {
        if buf.len() < HEADER_LEN {
            return Err(PduError::BufferTooShort.into());
        }
        let mut cursor = buf;
        let fc_bytes: [u8; 2] = cursor.decode()?;
        let frame_control = FrameControl::from_bytes(fc_bytes);
        let duration: u16 = cursor.decode_le()?;
        let addr1: MacAddress = cursor.decode()?;
        let addr2: MacAddress = cursor.decode()?;
        let addr3: MacAddress = cursor.decode()?;
        let seq_ctrl: u16 = cursor.decode_le()?;

        let mut frame = Self {
            base: BasePdu::default(),
            frame_control,
            duration,
            addr1,
            addr2,
            addr3,
            seq_ctrl,
        };

        let payload = cursor;
        if !payload.is_empty() {
            match FRAME_TABLE.lookup(&(frame_control.frame_type, frame_control.subtype)) {
                Some(ctor) => match ctor(payload) {
                    Ok(inner) => frame.set_inner_any(inner),
                    Err(error) => {
                        tracing::debug!(
                            frame_type = frame_control.frame_type,
                            subtype = frame_control.subtype,
                            %error,
                            "registered dissector failed; leaving inner unset"
                        );
                        frame.base_pdu_mut().set_unparsed(payload.to_vec());
                    }
                },
                None => {
                    let inner = AnyPdu::new(RawPdu::dissect(payload).expect("RawPdu::dissect is infallible"));
                    frame.set_inner_any(inner);
                }
            }
        }
        Ok(frame)
    }
}

impl Pdu for Dot11 {
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
        w.encode(&self.frame_control.to_bytes());
        w.encode_le(&self.duration);
        w.encode(&self.addr1);
        w.encode(&self.addr2);
        w.encode(&self.addr3);
        w.encode_le(&self.seq_ctrl);
    }

    fn make_canonical(&mut self) {
        if let Some(inner) = self.inner_pdu() {
            if inner.is::<Dot11Beacon>() {
                self.frame_control.frame_type = TYPE_MANAGEMENT;
                self.frame_control.subtype = SUBTYPE_BEACON;
            }
        }
    }
}

/// The 16-bit capability information field, unpacked bit-by-bit per the
/// glossary's flag list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CapabilityInfo {
    pub ess: bool,
    pub ibss: bool,
    pub cf_pollable: bool,
    pub cf_poll_request: bool,
    pub privacy: bool,
    pub short_preamble: bool,
    pub pbcc: bool,
    pub channel_agility: bool,
    pub spectrum_mgmt: bool,
    pub qos: bool,
    pub short_slot_time: bool,
    pub apsd: bool,
    pub reserved: bool,
    pub dsss_ofdm: bool,
    pub delayed_block_ack: bool,
    pub immediate_block_ack: bool,
}

impl CapabilityInfo {
    fn from_bits(v: u16) -> Self {
        Self {
            ess: v & (1 << 0) != 0,
            ibss: v & (1 << 1) != 0,
            cf_pollable: v & (1 << 2) != 0,
            cf_poll_request: v & (1 << 3) != 0,
            privacy: v & (1 << 4) != 0,
            short_preamble: v & (1 << 5) != 0,
            pbcc: v & (1 << 6) != 0,
            channel_agility: v & (1 << 7) != 0,
            spectrum_mgmt: v & (1 << 8) != 0,
            qos: v & (1 << 9) != 0,
            short_slot_time: v & (1 << 10) != 0,
            apsd: v & (1 << 11) != 0,
            reserved: v & (1 << 12) != 0,
            dsss_ofdm: v & (1 << 13) != 0,
            delayed_block_ack: v & (1 << 14) != 0,
            immediate_block_ack: v & (1 << 15) != 0,
        }
    }

    fn to_bits(self) -> u16 {
        let mut v = 0u16;
        let mut set = |bit: u32, flag: bool| {
            if flag {
                v |= 1 << bit;
            }
        };
        set(0, self.ess);
        set(1, self.ibss);
        set(2, self.cf_pollable);
        set(3, self.cf_poll_request);
        set(4, self.privacy);
        set(5, self.short_preamble);
        set(6, self.pbcc);
        set(7, self.channel_agility);
        set(8, self.spectrum_mgmt);
        set(9, self.qos);
        set(10, self.short_slot_time);
        set(11, self.apsd);
        set(12, self.reserved);
        set(13, self.dsss_ofdm);
        set(14, self.delayed_block_ack);
        set(15, self.immediate_block_ack);
        v
    }
}

/// A supported-rate entry: `mbps` is the decoded rate, `basic` is the
/// high-bit "this rate is mandatory" flag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SupportedRate {
    pub mbps: f32,
    pub basic: bool,
}

/// The decoded Country information element (tag 7): a 3-byte country
/// code followed by `(first_channel, number_channels, max_transmit_power)`
/// triples, reported as parallel vectors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountryInfo {
    pub code: [u8; 3],
    pub first_channel: Vec<u8>,
    pub number_channels: Vec<u8>,
    pub max_transmit_power: Vec<u8>,
}

/// The decoded Traffic Indication Map element (tag 5).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tim {
    pub dtim_count: u8,
    pub dtim_period: u8,
    pub bitmap_control: u8,
    pub partial_virtual_bitmap: Vec<u8>,
}

/// Beacon frame body: fixed timestamp/interval/capability fields
/// followed by a tagged-element trailer with no end sentinel (§4.4),
/// terminated by buffer exhaustion.
#[derive(Clone)]
pub struct Dot11Beacon {
    base: BasePdu,
    timestamp: u64,
    interval: u16,
    capabilities: CapabilityInfo,
    elements: OptionList,
}

impl Dot11Beacon {
    pub fn new(timestamp: u64, interval: u16, capabilities: CapabilityInfo) -> Self {
        Self {
            base: BasePdu::default(),
            timestamp,
            interval,
            capabilities,
            elements: OptionList::new(),
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn timestamp_mut(&mut self) -> &mut u64 {
        &mut self.timestamp
    }

    pub fn interval(&self) -> u16 {
        self.interval
    }

    pub fn interval_mut(&mut self) -> &mut u16 {
        &mut self.interval
    }

    pub fn capabilities(&self) -> CapabilityInfo {
        self.capabilities
    }

    pub fn capabilities_mut(&mut self) -> &mut CapabilityInfo {
        &mut self.capabilities
    }

    pub fn elements(&self) -> &OptionList {
        &self.elements
    }

    pub fn ssid(&self) -> Option<&[u8]> {
        self.elements.get(TAG_SSID).map(TlvOption::value)
    }

    pub fn set_ssid(&mut self, ssid: &[u8]) -> PduResult<()> {
        self.elements.remove(TAG_SSID);
        self.elements.add(TAG_SSID, ssid.to_vec())
    }

    pub fn supported_rates(&self) -> Vec<SupportedRate> {
        match self.elements.get(TAG_SUPPORTED_RATES) {
            Some(opt) => opt
                .value()
                .iter()
                .map(|&b| SupportedRate {
                    basic: b & 0x80 != 0,
                    mbps: (b & 0x7F) as f32 * 0.5,
                })
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn set_supported_rates(&mut self, rates: &[SupportedRate]) -> PduResult<()> {
        self.elements.remove(TAG_SUPPORTED_RATES);
        let value = rates
            .iter()
            .map(|r| {
                let raw = ((r.mbps / 0.5).round() as u8) & 0x7F;
                if r.basic {
                    raw | 0x80
                } else {
                    raw
                }
            })
            .collect();
        self.elements.add(TAG_SUPPORTED_RATES, value)
    }

    pub fn country(&self) -> Option<CountryInfo> {
        let value = self.elements.get(TAG_COUNTRY)?.value();
        if value.len() < 3 {
            return None;
        }
        let code = [value[0], value[1], value[2]];
        let mut first_channel = Vec::new();
        let mut number_channels = Vec::new();
        let mut max_transmit_power = Vec::new();
        for triple in value[3..].chunks_exact(3) {
            first_channel.push(triple[0]);
            number_channels.push(triple[1]);
            max_transmit_power.push(triple[2]);
        }
        Some(CountryInfo {
            code,
            first_channel,
            number_channels,
            max_transmit_power,
        })
    }

    pub fn set_country(&mut self, info: &CountryInfo) -> PduResult<()> {
        self.elements.remove(TAG_COUNTRY);
        let mut value = Vec::with_capacity(3 + info.first_channel.len() * 3);
        value.extend_from_slice(&info.code);
        for i in 0..info.first_channel.len() {
            value.push(info.first_channel[i]);
            value.push(info.number_channels[i]);
            value.push(info.max_transmit_power[i]);
        }
        self.elements.add(TAG_COUNTRY, value)
    }

    pub fn tim(&self) -> Option<Tim> {
        let value = self.elements.get(TAG_TIM)?.value();
        if value.len() < 3 {
            return None;
        }
        Some(Tim {
            dtim_count: value[0],
            dtim_period: value[1],
            bitmap_control: value[2],
            partial_virtual_bitmap: value[3..].to_vec(),
        })
    }

    pub fn set_tim(&mut self, tim: &Tim) -> PduResult<()> {
        self.elements.remove(TAG_TIM);
        let mut value = Vec::with_capacity(3 + tim.partial_virtual_bitmap.len());
        value.push(tim.dtim_count);
        value.push(tim.dtim_period);
        value.push(tim.bitmap_control);
        value.extend_from_slice(&tim.partial_virtual_bitmap);
        self.elements.add(TAG_TIM, value)
    }

    fn all_tags_known(&self) -> bool {
        self.elements.iter().all(|o| KNOWN_TAGS.contains(&o.code()))
    }
}

impl Dissect for Dot11Beacon {
    fn dissect(buf: &[u8]) -> DResult<Self> {
        if buf.len() < BEACON_FIXED_LEN {
            return Err(PduError::BufferTooShort.into());
        }
        let mut cursor = buf;
        let timestamp: u64 = cursor.decode_le()?;
        let interval: u16 = cursor.decode_le()?;
        let capability_bits: u16 = cursor.decode_le()?;
        let elements = OptionList::parse_tagged(&mut cursor)?;

        Ok(Self {
            base: BasePdu::default(),
            timestamp,
            interval,
            capabilities: CapabilityInfo::from_bits(capability_bits),
            elements,
        })
    }
}

impl Pdu for Dot11Beacon {
    fn base_pdu(&self) -> &BasePdu {
        &self.base
    }

    fn base_pdu_mut(&mut self) -> &mut BasePdu {
        &mut self.base
    }

    fn header_len(&self) -> usize {
        BEACON_FIXED_LEN + self.elements.total_len()
    }

    fn serialize_header(&self, buf: &mut [u8], _parent: Option<&dyn PduObj>) {
        {
            let mut w = &mut buf[..BEACON_FIXED_LEN];
            w.encode_le(&self.timestamp);
            w.encode_le(&self.interval);
            w.encode_le(&self.capabilities.to_bits());
        }
        if self.all_tags_known() {
            self.elements.serialize_canonical(&mut buf[BEACON_FIXED_LEN..]);
        } else {
            self.elements.serialize_in_order(&mut buf[BEACON_FIXED_LEN..]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED_BEACON: [u8; 36] = [
        0x81, 0x01, 0x4F, 0x23, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x02, 0x03,
        0x04, 0x05, 0x06, 0x07, 0x00, 0x00, 0xFA, 0x01, 0x93, 0x28, 0x41, 0x23, 0xAD, 0x1F, 0xFA, 0x14, 0x95, 0x20,
    ];

    #[test]
    fn parses_seed_beacon_scenario() {
        let frame = Dot11::dissect(&SEED_BEACON).unwrap();
        assert_eq!(frame.frame_control().frame_type, TYPE_MANAGEMENT);
        assert_eq!(frame.frame_control().subtype, SUBTYPE_BEACON);

        let beacon = frame.inner_pdu().unwrap().downcast_ref::<Dot11Beacon>().unwrap();
        assert_eq!(beacon.timestamp(), 0x1FAD2341289301FA);
        assert_eq!(beacon.interval(), 0x14FA);

        let cap = beacon.capabilities();
        assert!(cap.ess);
        assert!(cap.cf_pollable);
        assert!(cap.privacy);
        assert!(cap.channel_agility);
        assert!(cap.dsss_ofdm);
        assert!(!cap.ibss);
        assert!(!cap.cf_poll_request);
        assert!(!cap.short_preamble);
        assert!(!cap.pbcc);
        assert!(!cap.spectrum_mgmt);
        assert!(!cap.qos);
        assert!(!cap.short_slot_time);
        assert!(!cap.apsd);
        assert!(!cap.reserved);
        assert!(!cap.delayed_block_ack);
        assert!(!cap.immediate_block_ack);
    }

    #[test]
    fn parses_country_element() {
        let mut buf = vec![0u8; BEACON_FIXED_LEN];
        buf.extend_from_slice(&[0x07, 0x06, b'U', b'S', b' ', 0x01, 0x0D, 0x14]);
        let beacon = Dot11Beacon::dissect(&buf).unwrap();
        let country = beacon.country().unwrap();
        assert_eq!(&country.code, b"US ");
        assert_eq!(country.first_channel, vec![1]);
        assert_eq!(country.number_channels, vec![13]);
        assert_eq!(country.max_transmit_power, vec![20]);
    }

    #[test]
    fn round_trips_beacon_with_elements() {
        let mut beacon = Dot11Beacon::new(0x1234, 100, CapabilityInfo { ess: true, privacy: true, ..Default::default() });
        beacon.set_ssid(b"test-ap").unwrap();
        beacon.set_supported_rates(&[SupportedRate { mbps: 1.0, basic: true }, SupportedRate { mbps: 5.5, basic: false }]).unwrap();

        let bytes = beacon.serialize();
        let parsed = Dot11Beacon::dissect(&bytes).unwrap();
        assert_eq!(parsed.ssid(), Some(&b"test-ap"[..]));
        assert_eq!(parsed.supported_rates(), beacon.supported_rates());
        assert_eq!(parsed.capabilities(), beacon.capabilities());
    }

    #[test]
    fn truncated_beacon_body_leaves_inner_unset_with_residual() {
        let mut header = [0u8; HEADER_LEN];
        header[0] = (SUBTYPE_BEACON << 4) | (TYPE_MANAGEMENT << 2);
        let mut buf = header.to_vec();
        buf.extend_from_slice(&[0x01, 0x02, 0x03]);

        let frame = Dot11::dissect(&buf).unwrap();
        assert!(frame.inner_pdu().is_none());
        assert_eq!(frame.base_pdu().unparsed(), Some(&[0x01, 0x02, 0x03][..]));
    }

    #[test]
    fn rejects_short_header() {
        assert!(Dot11::dissect(&[0u8; 10]).is_err());
    }
}
