use crate::config::Config;
use crate::protocol::alpdu::Trailer;
use crate::protocol::crc;
use crate::protocol::ppdu_hdr::{
    CompHeaderBuilder, ContEndHeaderBuilder, PpduKind, StartHeaderBuilder, COMP_HDR_LEN,
    CONT_END_HDR_LEN, PPDU_LEN_MAX, START_HDR_LEN,
};

use super::TxContext;

/// A CONT whose length field has its top six bits clear starts with a zero
/// byte, which the unpacker would read as FPDU padding. The packer refuses
/// to emit one and pads the frame instead.
pub(super) const MIN_CONT_PAYLOAD: usize = 32;

#[derive(Debug)]
pub enum FragError {
    BurstTooSmall,
    NoAlpduPending,
    TooManyFrags,
    BufNotInitialised,
}

pub(super) struct PpduEmission {
    pub bytes: Vec<u8>,
    pub done: bool,
    pub kind: PpduKind,
}

/// Whether `emit_ppdu` can make progress for this context within `space`
/// bytes, under the packer's padding-safety rule.
pub(super) fn fits_burst(ctx: &TxContext, space: usize) -> bool {
    if space < CONT_END_HDR_LEN + 1 {
        return false;
    }
    if ctx.frag_buf.at_start() {
        let alpdu_len = ctx.frag_buf.alpdu_len();
        if alpdu_len <= PPDU_LEN_MAX && space >= alpdu_len + COMP_HDR_LEN {
            return true;
        }
        return space >= START_HDR_LEN + 1;
    }
    let max_payload = (space - CONT_END_HDR_LEN).min(PPDU_LEN_MAX);
    if ctx.frag_buf.remaining() <= max_payload {
        return true;
    }
    max_payload >= MIN_CONT_PAYLOAD
}

/// Emits exactly one PPDU of at most `burst_size` bytes from the pending
/// ALPDU. A COMP is produced when the whole ALPDU fits from a fresh cursor;
/// otherwise the ALPDU grows its trailer on the first fragment and is walked
/// with START/CONT/END. The final fragment always contains the trailer.
pub(super) fn emit_ppdu(
    ctx: &mut TxContext,
    conf: &Config,
    burst_size: usize,
    max_frag_count: usize,
) -> Result<PpduEmission, FragError> {
    if !ctx.frag_buf.is_initialised() {
        return Err(FragError::BufNotInitialised);
    }
    if !ctx.frag_buf.has_sdu() || ctx.frag_buf.remaining() == 0 {
        return Err(FragError::NoAlpduPending);
    }
    if ctx.frag_count >= max_frag_count {
        return Err(FragError::TooManyFrags);
    }

    if ctx.frag_buf.at_start() {
        let alpdu_len = ctx.frag_buf.alpdu_len();
        if alpdu_len <= PPDU_LEN_MAX && burst_size >= alpdu_len + COMP_HDR_LEN {
            let hdr = CompHeaderBuilder {
                label_type: ctx.label_type,
                ptype_suppressed: ctx.ptype_suppressed,
                alpdu_len: alpdu_len as u16,
            }
            .build()
            .unwrap();
            let mut bytes = hdr.to_bytes();
            bytes.extend_from_slice(ctx.frag_buf.take(alpdu_len));
            ctx.frag_count += 1;
            return Ok(PpduEmission {
                bytes,
                done: true,
                kind: PpduKind::Comp,
            });
        }

        if burst_size < START_HDR_LEN + 1 {
            return Err(FragError::BurstTooSmall);
        }
        if !ctx.frag_buf.has_trailer() {
            let trailer = if conf.use_crc_trailer() {
                Trailer::Crc(crc::compute(crc::CRC_INIT, ctx.frag_buf.alpdu()))
            } else {
                let seq = ctx.next_seq;
                ctx.next_seq = ctx.next_seq.next();
                Trailer::SeqNo(seq)
            };
            ctx.use_crc = matches!(trailer, Trailer::Crc(_));
            ctx.frag_buf
                .append_trailer(&trailer.to_bytes())
                .map_err(|_e| FragError::BufNotInitialised)?;
        }
        let total = ctx.frag_buf.alpdu_len();
        let frag_len = (burst_size - START_HDR_LEN).min(PPDU_LEN_MAX);
        debug_assert!(frag_len < total);
        let hdr = StartHeaderBuilder {
            label_type: ctx.label_type,
            ptype_suppressed: ctx.ptype_suppressed,
            frag_id: ctx.frag_id,
            frag_len: frag_len as u16,
            alpdu_total_len: total as u16,
            use_crc: ctx.use_crc,
        }
        .build()
        .unwrap();
        let mut bytes = hdr.to_bytes();
        bytes.extend_from_slice(ctx.frag_buf.take(frag_len));
        ctx.frag_count += 1;
        return Ok(PpduEmission {
            bytes,
            done: false,
            kind: PpduKind::Start,
        });
    }

    if burst_size < CONT_END_HDR_LEN + 1 {
        return Err(FragError::BurstTooSmall);
    }
    let remaining = ctx.frag_buf.remaining();
    let max_payload = (burst_size - CONT_END_HDR_LEN).min(PPDU_LEN_MAX);
    let (end, frag_len) = if remaining <= max_payload {
        (true, remaining)
    } else {
        (false, max_payload)
    };
    let hdr = ContEndHeaderBuilder {
        end,
        frag_id: ctx.frag_id,
        frag_len: frag_len as u16,
    }
    .build()
    .unwrap();
    let mut bytes = hdr.to_bytes();
    bytes.extend_from_slice(ctx.frag_buf.take(frag_len));
    ctx.frag_count += 1;
    Ok(PpduEmission {
        bytes,
        done: end,
        kind: if end { PpduKind::End } else { PpduKind::Cont },
    })
}
