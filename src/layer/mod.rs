//! Transmit and receive façades.
//!
//! Transmit: an [`Sdu`] is wrapped into an ALPDU inside a per-fragment-id
//! buffer, walked out as COMP or START/CONT/END PPDUs, and packed into
//! fixed-size FPDUs. Receive: FPDUs are scanned back into PPDUs and fed to
//! per-fragment-id reassembly machines that rebuild and deliver the SDUs.

mod frag_buf;
mod rasm_buf;
mod receiver;
mod transmitter;

pub use receiver::*;
pub use transmitter::*;

/// Largest SDU the protocol can carry: the 12-bit ALPDU total length minus
/// the worst-case ALPDU header and trailer.
pub const SDU_LEN_MAX: usize = 4088;

/// One network PDU handed to or delivered by RLE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sdu {
    pub protocol_type: u16,
    pub payload: Vec<u8>,
}
