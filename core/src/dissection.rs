//! Table-driven demultiplexing: mapping a selector value (an ethertype,
//! an IP protocol number, a DLT) taken from an already-parsed header to
//! the constructor for the PDU that should be dissected next.

use crate::error::{DResult, DissectError};
use crate::pdu::AnyPdu;
use crate::raw_pdu::RawPdu;
use std::collections::HashMap;
use std::hash::Hash;

/// A trait every concrete PDU that can be produced by dissecting a byte
/// buffer implements. Separate from [`crate::Pdu`] itself since not every
/// PDU needs a dissector (a purely hand-built request body might not).
pub trait Dissect: Sized {
    fn dissect(buf: &[u8]) -> DResult<Self>;
}

/// A dissector table entry: parses `buf` into some concrete PDU and
/// erases it to [`AnyPdu`]. Free functions and non-capturing closures
/// coerce to this automatically; this is usually just `|buf|
/// SomeProto::dissect(buf).map(AnyPdu::new)`.
pub type Constructor = fn(&[u8]) -> DResult<AnyPdu>;

/// The outcome of looking `param` up in a [`DissectorTable`] and, if
/// found, running its constructor. Distinguishes a lookup *miss* (no
/// constructor registered for `param`, the caller's cue to fall back to
/// [`RawPdu`]) from a lookup *hit whose constructor itself failed* (the
/// caller should leave its own `inner` unset and keep `buf` recoverable
/// as residual bytes, not paper over the failure with `RawPdu`).
pub enum Demux {
    Dissected(AnyPdu),
    Unrecognized,
    Failed(DissectError),
}

/// A closed, exact-match demultiplexer table: `Param` is the selector
/// value (an `Ethertype`, an `IpProto`, a `LinkType`), and a table holds
/// at most one constructor per value. Lookup misses are the caller's cue
/// to fall back to [`RawPdu`] — see [`DissectorTable::demux`].
pub trait DissectorTable: Default {
    type Param: Eq + Hash + std::fmt::Debug;

    fn register(&mut self, param: Self::Param, ctor: Constructor);

    fn lookup(&self, param: &Self::Param) -> Option<Constructor>;

    fn dissect(&self, param: &Self::Param, buf: &[u8]) -> DResult<AnyPdu> {
        tracing::trace!(?param, len = buf.len(), "dissector table lookup");
        match self.lookup(param) {
            Some(ctor) => ctor(buf),
            None => Err(DissectError::UnknownNextProtocol),
        }
    }

    /// Looks `param` up and runs its constructor if registered, reporting
    /// which of the three outcomes above occurred. Callers that need to
    /// draw the hard-fail-vs-raw-fallback distinction use this instead of
    /// [`DissectorTable::dissect_or_raw`].
    fn demux(&self, param: &Self::Param, buf: &[u8]) -> Demux {
        tracing::trace!(?param, len = buf.len(), "dissector table lookup");
        match self.lookup(param) {
            Some(ctor) => match ctor(buf) {
                Ok(pdu) => Demux::Dissected(pdu),
                Err(error) => {
                    tracing::debug!(?param, %error, "registered dissector failed; leaving inner unset");
                    Demux::Failed(error)
                }
            },
            None => {
                tracing::debug!(?param, "no dissector registered; falling back to RawPdu");
                Demux::Unrecognized
            }
        }
    }

    /// Dissects `buf` as `param`'s registered protocol, or as [`RawPdu`]
    /// if nothing is registered for `param` *or* the registered
    /// constructor itself fails. `RawPdu::dissect` never fails, so this
    /// always succeeds. Coarser than [`DissectorTable::demux`] — only use
    /// this where a caller genuinely wants fail-soft behavior regardless
    /// of which of the two cases occurred (e.g. a table with no
    /// surrounding PDU to leave `inner` unset on).
    fn dissect_or_raw(&self, param: &Self::Param, buf: &[u8]) -> AnyPdu {
        match self.dissect(param, buf) {
            Ok(pdu) => pdu,
            Err(error) => {
                tracing::debug!(?param, %error, "falling back to RawPdu");
                AnyPdu::new(RawPdu::dissect(buf).expect("RawPdu::dissect is infallible"))
            }
        }
    }
}

/// Declares a closed demultiplexer table type keyed by `$param`, plus its
/// [`DissectorTable`] impl. Used once per selector type (ethertype, IP
/// protocol number, link type) in the protocol module that owns that
/// selector; populated by a `lazy_static!` in the module that needs it,
/// not by cross-crate registration magic.
#[macro_export]
macro_rules! dissector_table {
    ($name:ident, $param:ty) => {
        #[derive(Default)]
        struct $name(::std::collections::HashMap<$param, $crate::Constructor>);

        impl $crate::DissectorTable for $name {
            type Param = $param;

            fn register(&mut self, param: Self::Param, ctor: $crate::Constructor) {
                self.0.insert(param, ctor);
            }

            fn lookup(&self, param: &Self::Param) -> Option<$crate::Constructor> {
                self.0.get(param).copied()
            }
        }
    };
    (pub $name:ident, $param:ty) => {
        #[derive(Default)]
        pub struct $name(::std::collections::HashMap<$param, $crate::Constructor>);

        impl $crate::DissectorTable for $name {
            type Param = $param;

            fn register(&mut self, param: Self::Param, ctor: $crate::Constructor) {
                self.0.insert(param, ctor);
            }

            fn lookup(&self, param: &Self::Param) -> Option<$crate::Constructor> {
                self.0.get(param).copied()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PduError;
    use crate::pdu::{BasePdu, Pdu, PduObj};

    #[derive(Clone)]
    struct Probe;

    impl Pdu for Probe {
        fn base_pdu(&self) -> &BasePdu {
            unimplemented!()
        }
        fn base_pdu_mut(&mut self) -> &mut BasePdu {
            unimplemented!()
        }
        fn header_len(&self) -> usize {
            0
        }
        fn serialize_header(&self, _buf: &mut [u8], _parent: Option<&dyn PduObj>) {}
    }

    impl Dissect for Probe {
        fn dissect(_buf: &[u8]) -> DResult<Self> {
            Ok(Probe)
        }
    }

    dissector_table!(ProbeTable, u8);

    #[test]
    fn registered_selector_dispatches() {
        let mut table = ProbeTable::default();
        table.register(7, |buf| Probe::dissect(buf).map(AnyPdu::new));
        assert!(table.dissect(&7, &[]).is_ok());
    }

    #[test]
    fn unregistered_selector_falls_back_to_raw() {
        let table = ProbeTable::default();
        let pdu = table.dissect_or_raw(&9, &[1, 2, 3]);
        assert!(pdu.is::<RawPdu>());
    }

    struct Picky;

    impl Pdu for Picky {
        fn base_pdu(&self) -> &BasePdu {
            unimplemented!()
        }
        fn base_pdu_mut(&mut self) -> &mut BasePdu {
            unimplemented!()
        }
        fn header_len(&self) -> usize {
            0
        }
        fn serialize_header(&self, _buf: &mut [u8], _parent: Option<&dyn PduObj>) {}
    }

    impl Clone for Picky {
        fn clone(&self) -> Self {
            Picky
        }
    }

    impl Dissect for Picky {
        fn dissect(buf: &[u8]) -> DResult<Self> {
            if buf.is_empty() {
                Err(PduError::BufferTooShort.into())
            } else {
                Ok(Picky)
            }
        }
    }

    dissector_table!(PickyTable, u8);

    #[test]
    fn demux_distinguishes_miss_from_registered_failure() {
        let mut table = PickyTable::default();
        table.register(1, |buf| Picky::dissect(buf).map(AnyPdu::new));

        assert!(matches!(table.demux(&9, &[1, 2, 3]), Demux::Unrecognized));
        assert!(matches!(table.demux(&1, &[]), Demux::Failed(_)));
        assert!(matches!(table.demux(&1, &[1]), Demux::Dissected(_)));
    }
}
