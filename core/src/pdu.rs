//! The PDU contract: the polymorphic interface every protocol body
//! implements, and the chain-of-PDUs linkage that lets a fully composed
//! stack be walked, mutated, and serialized.

use std::any::{Any, TypeId};
use std::ptr::NonNull;

/// Runtime discriminator for a PDU's concrete type.
pub type PduKind = TypeId;

struct ParentLink {
    ptr: NonNull<()>,
    kind: PduKind,
}

/// The shared, non-protocol-specific state every PDU embeds: the owning
/// link to its `inner` PDU and the non-owning back-reference to its
/// `parent`.
///
/// `parent` is a raw, non-owning pointer refreshed on every attach; it is
/// valid only while the PDU it points at remains at the address it had
/// when the link was set. Moving that PDU — most commonly, attaching it
/// in turn to some outer PDU — silently invalidates the link. Nothing in
/// this crate relies on `parent` for correctness (the serialization
/// driver threads the real, live parent reference through
/// [`Pdu::serialize_header`] instead); it exists purely so callers
/// inspecting an already-built, not-further-mutated chain can walk
/// upward.
#[derive(Default)]
pub struct BasePdu {
    parent: Option<ParentLink>,
    inner: Option<AnyPdu>,
    unparsed: Option<Vec<u8>>,
}

impl BasePdu {
    pub fn new() -> Self {
        Self::default()
    }

    /// The residual payload bytes left behind when a registered
    /// demultiplexer constructor failed to dissect them — `inner` stays
    /// unset in that case, and this is the dedicated recovery accessor
    /// rather than silently discarding the bytes. `None` both when this
    /// PDU has no payload and when `inner` was attached successfully.
    pub fn unparsed(&self) -> Option<&[u8]> {
        self.unparsed.as_deref()
    }

    /// Records payload bytes a registered dissector rejected. Cleared by
    /// any subsequent `inner` attach.
    pub fn set_unparsed(&mut self, bytes: Vec<u8>) {
        self.unparsed = Some(bytes);
    }
}

/// Object-safe core behind every concrete [`Pdu`]. `Pdu` itself can't be
/// made into a trait object (it requires `Clone` + `Sized` bounds), so
/// [`AnyPdu`] stores a `Box<dyn PduObj>` and forwards through this.
pub trait PduObj: Any {
    fn base(&self) -> &BasePdu;
    fn base_mut(&mut self) -> &mut BasePdu;
    fn kind(&self) -> PduKind;
    fn header_len(&self) -> usize;
    fn trailer_len(&self) -> usize;
    fn serialize_header(&self, buf: &mut [u8], parent: Option<&dyn PduObj>);
    fn serialize_trailer(&self, buf: &mut [u8]);
    fn make_canonical(&mut self);
    fn clone_box(&self) -> Box<dyn PduObj>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn PduObj {
    fn total_len(&self) -> usize {
        self.header_len()
            + self.base().inner.as_ref().map(AnyPdu::total_len).unwrap_or(0)
            + self.trailer_len()
    }
}

fn attach_inner(parent: &mut dyn PduObj, mut inner: AnyPdu) {
    let kind = parent.kind();
    // SAFETY: truncating a fat `*mut dyn PduObj` to a thin `*mut ()`
    // merely drops the vtable pointer; the data pointer is untouched and
    // non-null since it came from a live `&mut`.
    let ptr = unsafe { NonNull::new_unchecked(parent as *mut dyn PduObj as *mut ()) };
    inner.obj.base_mut().parent = Some(ParentLink { ptr, kind });
    let base = parent.base_mut();
    base.inner = Some(inner);
    base.unparsed = None;
}

fn find_obj<'a, P: Pdu>(obj: &'a dyn PduObj) -> Option<&'a P> {
    if let Some(found) = obj.as_any().downcast_ref::<P>() {
        return Some(found);
    }
    obj.base().inner.as_ref().and_then(|inner| find_obj(inner.obj.as_ref()))
}

fn find_obj_mut<'a, P: Pdu>(obj: &'a mut dyn PduObj) -> Option<&'a mut P> {
    if obj.kind() == TypeId::of::<P>() {
        return obj.as_any_mut().downcast_mut::<P>();
    }
    obj.base_mut()
        .inner
        .as_mut()
        .and_then(|inner| find_obj_mut(inner.obj.as_mut()))
}

/// Writes `pdu` and its whole `inner` chain into `buf`, which must be
/// exactly `pdu`'s `total_len()` bytes. Recurses into `inner` before
/// writing `pdu`'s own header, so a checksum-bearing layer can read its
/// already-written payload back out of `buf` and a framing layer can
/// stamp a next-protocol field from the (already fully constructed)
/// `inner` object. Since every layer writes into its own disjoint slice
/// of a buffer sized up front, this "innermost first" order is safe and
/// correct regardless of whether a given layer actually depends on its
/// payload bytes.
fn write_chain(pdu: &dyn PduObj, buf: &mut [u8], parent: Option<&dyn PduObj>) {
    let header_len = pdu.header_len();
    let inner_total = pdu.base().inner.as_ref().map(AnyPdu::total_len).unwrap_or(0);
    let (header_buf, rest) = buf.split_at_mut(header_len);
    let (inner_buf, trailer_buf) = rest.split_at_mut(inner_total);
    if let Some(inner) = pdu.base().inner.as_ref() {
        write_chain(inner.obj.as_ref(), inner_buf, Some(pdu));
    }
    pdu.serialize_header(header_buf, parent);
    pdu.serialize_trailer(trailer_buf);
}

/// A type-erased, owned PDU. Every `inner` link in a chain is stored as
/// one of these.
pub struct AnyPdu {
    obj: Box<dyn PduObj>,
}

impl AnyPdu {
    pub fn new<P: Pdu>(pdu: P) -> Self {
        Self { obj: Box::new(pdu) }
    }

    pub fn kind(&self) -> PduKind {
        self.obj.kind()
    }

    pub fn header_len(&self) -> usize {
        self.obj.header_len()
    }

    pub fn trailer_len(&self) -> usize {
        self.obj.trailer_len()
    }

    pub fn total_len(&self) -> usize {
        self.obj.as_ref().total_len()
    }

    pub fn is<P: Pdu>(&self) -> bool {
        self.kind() == TypeId::of::<P>()
    }

    pub fn downcast_ref<P: Pdu>(&self) -> Option<&P> {
        self.obj.as_any().downcast_ref::<P>()
    }

    pub fn downcast_mut<P: Pdu>(&mut self) -> Option<&mut P> {
        self.obj.as_any_mut().downcast_mut::<P>()
    }

    pub fn downcast<P: Pdu>(self) -> Result<P, Self> {
        if self.is::<P>() {
            let raw = Box::into_raw(self.obj);
            // SAFETY: `is::<P>()` confirmed the concrete type behind this
            // `Box<dyn PduObj>` is exactly `P`.
            Ok(*unsafe { Box::from_raw(raw as *mut P) })
        } else {
            Err(self)
        }
    }

    pub fn inner_pdu(&self) -> Option<&AnyPdu> {
        self.obj.base().inner.as_ref()
    }

    pub fn inner_pdu_mut(&mut self) -> Option<&mut AnyPdu> {
        self.obj.base_mut().inner.as_mut()
    }

    pub fn take_inner_pdu(&mut self) -> Option<AnyPdu> {
        self.obj.base_mut().inner.take()
    }

    /// See [`BasePdu::unparsed`].
    pub fn unparsed(&self) -> Option<&[u8]> {
        self.obj.base().unparsed()
    }

    pub fn set_inner_pdu<P: Pdu>(&mut self, pdu: P) {
        attach_inner(self.obj.as_mut(), AnyPdu::new(pdu));
    }

    /// Attaches an already type-erased PDU as `inner`. Dissectors that
    /// dispatch through a [`crate::DissectorTable`] get an [`AnyPdu`] back
    /// from the lookup and use this instead of `set_inner_pdu`, which
    /// expects a concrete, still-typed [`Pdu`].
    pub fn set_inner_any(&mut self, inner: AnyPdu) {
        attach_inner(self.obj.as_mut(), inner);
    }

    pub fn find<P: Pdu>(&self) -> Option<&P> {
        find_obj(self.obj.as_ref())
    }

    pub fn find_mut<P: Pdu>(&mut self) -> Option<&mut P> {
        find_obj_mut(self.obj.as_mut())
    }

    pub fn deep_clone(&self) -> Self {
        let mut obj = self.obj.clone_box();
        if let Some(inner) = self.obj.base().inner.as_ref() {
            attach_inner(obj.as_mut(), inner.deep_clone());
        }
        Self { obj }
    }

    pub fn make_all_canonical(&mut self) {
        self.obj.make_canonical();
        if let Some(inner) = self.obj.base_mut().inner.as_mut() {
            inner.make_all_canonical();
        }
    }

    /// Serializes this PDU and everything attached to its `inner` chain
    /// into a freshly allocated, bit-exact byte buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.total_len()];
        write_chain(self.obj.as_ref(), &mut buf[..], None);
        buf
    }
}

impl Clone for AnyPdu {
    fn clone(&self) -> Self {
        Self {
            obj: self.obj.clone_box(),
        }
    }
}

/// The trait every protocol body in this crate implements.
///
/// Not object safe itself (it needs `Clone` + `Sized`); the crate erases
/// it behind [`AnyPdu`] for storage in a chain. Most callers work with a
/// concrete type (e.g. `Ipv4`) and reach for [`AnyPdu`] only when holding
/// a heterogeneous `inner`.
pub trait Pdu: 'static + Any + Clone {
    fn base_pdu(&self) -> &BasePdu;
    fn base_pdu_mut(&mut self) -> &mut BasePdu;

    /// Bytes this layer itself contributes, excluding `inner`. Must be a
    /// pure function of this PDU's own fields — never recurse into `inner`.
    fn header_len(&self) -> usize;

    /// Bytes of trailing material this layer owns (option lists, tagged
    /// elements, alignment padding) after `inner`, excluding `inner` itself.
    fn trailer_len(&self) -> usize {
        0
    }

    fn total_len(&self) -> usize {
        self.header_len()
            + self
                .base_pdu()
                .inner
                .as_ref()
                .map(AnyPdu::total_len)
                .unwrap_or(0)
            + self.trailer_len()
    }

    /// Writes exactly `header_len()` bytes into `buf`. `parent`, when
    /// present, is the already-constructed enclosing PDU — used by
    /// transport-layer checksums to read pseudo-header fields, and by
    /// framing layers to stamp a next-protocol field derived from `inner`.
    /// `inner`'s bytes, if any, are already present in the buffer
    /// immediately following `buf` by the time this is called.
    fn serialize_header(&self, buf: &mut [u8], parent: Option<&dyn PduObj>);

    /// Writes exactly `trailer_len()` bytes into `buf`.
    fn serialize_trailer(&self, _buf: &mut [u8]) {}

    /// Brings the PDU into a protocol-valid state: recomputes checksums,
    /// refreshes length/next-protocol fields from `inner`, and the like.
    /// Never called implicitly by `serialize()`; callers opt in via
    /// [`PduExt::make_all_canonical`].
    fn make_canonical(&mut self) {}
}

impl<P: Pdu> PduObj for P {
    fn base(&self) -> &BasePdu {
        self.base_pdu()
    }

    fn base_mut(&mut self) -> &mut BasePdu {
        self.base_pdu_mut()
    }

    fn kind(&self) -> PduKind {
        TypeId::of::<P>()
    }

    fn header_len(&self) -> usize {
        Pdu::header_len(self)
    }

    fn trailer_len(&self) -> usize {
        Pdu::trailer_len(self)
    }

    fn serialize_header(&self, buf: &mut [u8], parent: Option<&dyn PduObj>) {
        Pdu::serialize_header(self, buf, parent)
    }

    fn serialize_trailer(&self, buf: &mut [u8]) {
        Pdu::serialize_trailer(self, buf)
    }

    fn make_canonical(&mut self) {
        Pdu::make_canonical(self)
    }

    fn clone_box(&self) -> Box<dyn PduObj> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Extension methods every [`Pdu`] implementor gets for free: chain
/// navigation, downcasting, and the deep-clone / deep-canonicalize
/// operations that walk the whole `inner` chain.
pub trait PduExt: Pdu {
    fn kind(&self) -> PduKind {
        TypeId::of::<Self>()
    }

    fn is<P: Pdu>(&self) -> bool {
        PduExt::kind(self) == TypeId::of::<P>()
    }

    fn total_len(&self) -> usize {
        Pdu::total_len(self)
    }

    fn inner_pdu(&self) -> Option<&AnyPdu> {
        self.base_pdu().inner.as_ref()
    }

    fn inner_pdu_mut(&mut self) -> Option<&mut AnyPdu> {
        self.base_pdu_mut().inner.as_mut()
    }

    fn take_inner_pdu(&mut self) -> Option<AnyPdu> {
        self.base_pdu_mut().inner.take()
    }

    /// See [`BasePdu::unparsed`].
    fn unparsed(&self) -> Option<&[u8]> {
        self.base_pdu().unparsed()
    }

    fn set_inner_pdu<P: Pdu>(&mut self, pdu: P) {
        let obj: &mut dyn PduObj = self;
        attach_inner(obj, AnyPdu::new(pdu));
    }

    /// Attaches an already type-erased PDU as `inner` — see
    /// [`AnyPdu::set_inner_any`].
    fn set_inner_any(&mut self, inner: AnyPdu) {
        let obj: &mut dyn PduObj = self;
        attach_inner(obj, inner);
    }

    /// Looks up the back-reference set by the most recent attach. Returns
    /// `None` if this PDU is outermost, was detached, or `P` doesn't
    /// match the kind recorded at attach time.
    ///
    /// Only call this on a chain that was built and has not been further
    /// restructured since: see the safety discussion on [`BasePdu`].
    fn parent_pdu<P: Pdu>(&self) -> Option<&P> {
        let link = self.base_pdu().parent.as_ref()?;
        if link.kind != TypeId::of::<P>() {
            return None;
        }
        // SAFETY: see `BasePdu` docs; caller contract requires the parent
        // to still be live at its recorded address.
        Some(unsafe { link.ptr.cast::<P>().as_ref() })
    }

    fn find<P: Pdu>(&self) -> Option<&P> {
        find_obj(self)
    }

    fn find_mut<P: Pdu>(&mut self) -> Option<&mut P> {
        find_obj_mut(self)
    }

    /// Deep-copies this PDU and its whole `inner` chain, rewiring fresh
    /// back-references as it goes. Named distinctly from [`Clone::clone`]
    /// (which a protocol's own `impl Clone` only needs to cover its own
    /// fields) to keep "clone one layer" and "clone the stack" unambiguous.
    fn deep_clone(&self) -> Self {
        let mut ret = self.clone();
        if let Some(inner) = self.inner_pdu() {
            let obj: &mut dyn PduObj = &mut ret;
            attach_inner(obj, inner.deep_clone());
        }
        ret
    }

    fn make_all_canonical(&mut self) {
        self.make_canonical();
        if let Some(inner) = self.inner_pdu_mut() {
            inner.make_all_canonical();
        }
    }

    fn into_any(self) -> AnyPdu {
        AnyPdu::new(self)
    }

    /// Allocates a buffer sized to `total_len()` and serializes this PDU
    /// and its whole `inner` chain into it.
    fn serialize(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Pdu::total_len(self)];
        write_chain(self, &mut buf[..], None);
        buf
    }
}

impl<P: Pdu> PduExt for P {}
