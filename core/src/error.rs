//! The closed error enumeration every fallible operation in the engine returns.

/// Errors raised while constructing, mutating, or serializing a PDU.
///
/// This is a closed set: adding a protocol never needs a new variant, only
/// a new occurrence of one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PduError {
    /// A constructor's buffer is smaller than the protocol's minimum header.
    #[error("buffer too short to decode this PDU")]
    BufferTooShort,
    /// An option/tag's declared length is inconsistent with remaining bytes
    /// or with its expected encoding (e.g. a scalar accessor applied to an
    /// option whose length doesn't match the scalar's width).
    #[error("option is malformed")]
    MalformedOption,
    /// An option's declared length exceeds the bytes actually remaining.
    #[error("option length exceeds remaining buffer")]
    TruncatedOption,
    /// A setter received a value that does not fit the protocol's encoded width.
    #[error("field value overflows its encoded width")]
    FieldOverflow,
    /// Adding an option would push the option area past the protocol's
    /// declared maximum, or the option itself is longer than 255 bytes.
    #[error("option would exceed the protocol's maximum option-area size")]
    OptionTooLarge,
}

pub type PduResult<T> = Result<T, PduError>;

/// Errors raised while dissecting a byte buffer into a PDU chain.
///
/// Wraps [`PduError`] with a parse-specific "not enough bytes yet" case
/// that a streaming caller could use to ask for more data; the crate's own
/// `from_bytes` entry point always has the whole buffer up front, so it
/// treats `NeedMore` the same as [`PduError::BufferTooShort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DissectError {
    #[error(transparent)]
    Pdu(#[from] PduError),
    #[error("not enough data to continue dissecting")]
    NeedMore,
    /// No dissector in the table claimed this selector value; callers that
    /// hit this should fall back to [`crate::RawPDU`]. Not surfaced as an
    /// error from `from_bytes` — the demultiplexer downgrades it itself.
    #[error("no dissector registered for this selector")]
    UnknownNextProtocol,
}

impl From<pduforge_ende::decode::DecodeError> for DissectError {
    fn from(e: pduforge_ende::decode::DecodeError) -> Self {
        match e {
            pduforge_ende::decode::DecodeError::NeedMore => DissectError::NeedMore,
            pduforge_ende::decode::DecodeError::Malformed => DissectError::Pdu(PduError::BufferTooShort),
        }
    }
}

pub type DResult<T> = Result<T, DissectError>;
