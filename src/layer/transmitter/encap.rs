use crate::config::Config;
use crate::protocol::alpdu::PtypeEncoding;
use crate::utils::SeqNum;

use super::super::Sdu;
use super::TxContext;

#[derive(Debug)]
pub enum EncapError {
    InvalidFragId,
    SduTooBig,
    ContextBusy,
}

/// Builds the ALPDU for one SDU in the context's fragmentation buffer:
/// copies the payload, prepends the protocol-type header, and records what
/// the PPDU headers will need. The trailer is only reserved once the
/// fragmentation engine decides the ALPDU will not fit a single PPDU.
pub(super) fn encapsulate(ctx: &mut TxContext, conf: &Config, sdu: &Sdu) -> Result<(), EncapError> {
    ctx.frag_buf.init();
    ctx.frag_buf
        .copy_sdu(&sdu.payload)
        .map_err(|_e| EncapError::SduTooBig)?;

    let enc = PtypeEncoding::select(conf, sdu.protocol_type);
    // The headroom is sized for the largest header variant.
    ctx.frag_buf.prepend_hdr(&enc.to_bytes()).unwrap();

    ctx.label_type = enc.label_type();
    ctx.ptype_suppressed = enc.is_suppressed();
    ctx.use_crc = false;
    ctx.frag_count = 0;
    Ok(())
}

impl TxContext {
    pub(super) fn new(frag_id: u8) -> Self {
        Self {
            frag_id,
            frag_buf: super::super::frag_buf::FragBuf::new(),
            next_seq: SeqNum::zero(),
            frag_count: 0,
            label_type: 0,
            ptype_suppressed: false,
            use_crc: false,
            stat: Default::default(),
        }
    }
}
