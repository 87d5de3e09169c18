//! Status codes reported by the protocol engine and codecs.
//!
//! Nothing in this crate treats a link-layer condition as an unrecoverable
//! fault. Receive-side corruption (checksum mismatch, malformed length) is
//! dropped silently inside the tick path and only counted; the conditions a
//! caller must react to are surfaced through [`LinkError`].

/// Errors surfaced to callers of the send, receive, and encode paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LinkError {
    /// No acknowledgment arrived within the configured wait after a
    /// transmission that requested one. The attempt is over; retrying is
    /// the caller's decision.
    #[error("no acknowledgment within the configured timeout")]
    AckTimeout,

    /// The node has not accepted a LINK command from a master yet, and the
    /// attempted operation is not itself a link request.
    #[error("node is not linked to a master")]
    NotLinked,

    /// Packing the requested value would overflow the frame's payload
    /// capacity.
    #[error("frame payload capacity exceeded")]
    CapacityExceeded,

    /// A frame or payload failed structural validation: bad type tag,
    /// out-of-bounds length, truncated value, or checksum mismatch.
    #[error("malformed or corrupt frame")]
    InvalidFrame,
}
