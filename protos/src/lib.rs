//! Concrete protocol PDUs built on the engine in `pduforge-core`:
//! Ethernet II, ARP, IPv4, TCP, UDP, DLT_NULL loopback framing,
//! BOOTP/DHCP, and (behind the `dot11` feature) IEEE 802.11 management
//! frames.

pub mod prelude;

pub mod arp;
pub mod bootp;
pub mod dhcp;
pub mod ethernet_ii;
pub mod ethertype;
pub mod ip_proto;
pub mod ipv4;
pub mod loopback;
pub mod tcp;
pub mod udp;

#[cfg(feature = "dot11")]
pub mod dot11;

pub use pduforge_core::RawPdu;
