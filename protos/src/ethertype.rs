//! The EtherType field selector used by the Ethernet II demultiplexer.

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct Ethertype(pub u16);

macro_rules! ethertype {
    ($name:ident = $val:literal) => {
        pub const $name: Ethertype = Ethertype($val);
    };
}

impl Ethertype {
    ethertype!(IPV4 = 0x0800);
    ethertype!(ARP = 0x0806);
    ethertype!(IPV6 = 0x86DD);
    ethertype!(VLAN = 0x8100);
}

impl From<u16> for Ethertype {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

impl From<Ethertype> for u16 {
    fn from(v: Ethertype) -> Self {
        v.0
    }
}
