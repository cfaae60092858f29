use std::io::Cursor;

use byteorder::{BigEndian, ByteOrder};
use log::{debug, error, warn};

use crate::protocol::alpdu::{
    parse_ptype, Trailer, CRC_TRAILER_LEN, SEQ_TRAILER_LEN,
};
use crate::protocol::crc;
use crate::protocol::ppdu_hdr::{
    CompHeader, ContEndHeader, StartHeader, COMP_HDR_LEN, CONT_END_HDR_LEN, LABEL_TYPE_SIGNAL,
    START_HDR_LEN,
};
use crate::protocol::ptype::{CompressedPtype, PTYPE_IPV4, PTYPE_IPV6, PTYPE_VLAN};

use super::super::{Sdu, SDU_LEN_MAX};
use super::Receiver;

/// Sequence gaps past half the 3-bit space cannot be told from reordering;
/// the SDU is dropped instead of resequenced.
const SEQ_GAP_MAX: u8 = 3;

const ETH_HDR_LEN: usize = 14;
const VLAN_HDR_LEN: usize = 4;
/// Ethernet header plus VLAN header with the protocol-type field removed.
const COMP_ETH_VLAN_LEN: usize = ETH_HDR_LEN + VLAN_HDR_LEN - 2;

#[derive(Debug)]
pub enum VlanReconstructError {
    TooShort,
    NotVlan,
    BadIpVersion,
}

/// Rebuilds the suppressed protocol-type field of a VLAN/IP frame from the
/// IP version nibble of the VLAN payload, growing the SDU by two bytes.
pub(super) fn insert_vlan_ptype(frag: &[u8]) -> Result<Sdu, VlanReconstructError> {
    if frag.len() < COMP_ETH_VLAN_LEN + 1 {
        return Err(VlanReconstructError::TooShort);
    }
    if BigEndian::read_u16(&frag[12..14]) != PTYPE_VLAN {
        return Err(VlanReconstructError::NotVlan);
    }
    let restored = match frag[COMP_ETH_VLAN_LEN] >> 4 {
        4 => PTYPE_IPV4,
        6 => PTYPE_IPV6,
        _ => return Err(VlanReconstructError::BadIpVersion),
    };
    let mut payload = Vec::with_capacity(frag.len() + 2);
    payload.extend_from_slice(&frag[..COMP_ETH_VLAN_LEN]);
    payload.extend_from_slice(&restored.to_be_bytes());
    payload.extend_from_slice(&frag[COMP_ETH_VLAN_LEN..]);
    Ok(Sdu {
        protocol_type: PTYPE_VLAN,
        payload,
    })
}

impl Receiver {
    /// COMP PPDU: the whole ALPDU in one piece, no trailer, no context.
    pub(super) fn comp_ppdu(&mut self, ppdu: &[u8]) -> Option<Sdu> {
        self.comp_stat.packets_in += 1;
        self.comp_stat.bytes_in += ppdu.len() as u64;
        let hdr = match CompHeader::from_bytes(&mut Cursor::new(ppdu)) {
            Ok(hdr) => hdr,
            Err(e) => {
                error!("bad COMP header: {:?}", e);
                self.comp_stat.packets_dropped += 1;
                self.comp_stat.bytes_dropped += ppdu.len() as u64;
                return None;
            }
        };
        let alpdu = &ppdu[COMP_HDR_LEN..];
        if alpdu.is_empty() {
            warn!("0-byte ALPDU in Complete PPDU");
        }
        let parsed = match parse_ptype(
            alpdu,
            hdr.ptype_suppressed(),
            hdr.label_type() == LABEL_TYPE_SIGNAL,
            &self.conf,
        ) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("COMP ALPDU header rejected: {:?}", e);
                self.comp_stat.packets_dropped += 1;
                self.comp_stat.bytes_dropped += ppdu.len() as u64;
                return None;
            }
        };
        let sdu_frag = &alpdu[parsed.header_len..];
        let sdu = if parsed.compressed == u8::from(CompressedPtype::VlanNoPtypeField) {
            match insert_vlan_ptype(sdu_frag) {
                Ok(sdu) => sdu,
                Err(e) => {
                    error!("VLAN protocol-type reconstruction failed: {:?}", e);
                    self.comp_stat.packets_dropped += 1;
                    self.comp_stat.bytes_dropped += ppdu.len() as u64;
                    return None;
                }
            }
        } else {
            Sdu {
                protocol_type: parsed.protocol_type,
                payload: sdu_frag.to_vec(),
            }
        };
        self.comp_stat.packets_ok += 1;
        self.comp_stat.packets_out += 1;
        self.comp_stat.bytes_ok += sdu.payload.len() as u64;
        self.comp_stat.bytes_out += sdu.payload.len() as u64;
        Some(sdu)
    }

    /// START PPDU: opens the context and records the declared totals.
    pub(super) fn start_ppdu(&mut self, ppdu: &[u8]) -> Option<Sdu> {
        let hdr = match StartHeader::from_bytes(&mut Cursor::new(ppdu)) {
            Ok(hdr) => hdr,
            Err(e) => {
                error!("bad START header: {:?}", e);
                return None;
            }
        };
        let id = hdr.frag_id();
        debug!("START for fragment id {}", id);
        {
            let ctx = &mut self.ctxs[id as usize];
            ctx.stat.packets_in += 1;
            ctx.stat.bytes_in += ppdu.len() as u64;
            ctx.rasm_buf.add_burst_bytes(ppdu.len());
        }
        if self.is_busy(id) {
            error!("START on busy context {}, reassembly in progress dropped", id);
            self.drop_context(id);
            return None;
        }

        let alpdu_frag = &ppdu[START_HDR_LEN..];
        let total = hdr.alpdu_total_len();
        let trailer_len = if hdr.use_crc() {
            CRC_TRAILER_LEN
        } else {
            SEQ_TRAILER_LEN
        };
        let parsed = match parse_ptype(
            alpdu_frag,
            hdr.ptype_suppressed(),
            hdr.label_type() == LABEL_TYPE_SIGNAL,
            &self.conf,
        ) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("START ALPDU header rejected: {:?}", e);
                self.drop_context(id);
                return None;
            }
        };
        if total < parsed.header_len + trailer_len
            || total - parsed.header_len - trailer_len > SDU_LEN_MAX
        {
            error!("START declares an impossible ALPDU total of {} bytes", total);
            self.drop_context(id);
            return None;
        }
        if alpdu_frag.len() > total {
            error!(
                "START carries more ALPDU bytes than declared in total ({} > {})",
                alpdu_frag.len(),
                total
            );
            self.drop_context(id);
            return None;
        }
        let ctx = &mut self.ctxs[id as usize];
        ctx.rasm_buf.begin(
            total,
            parsed.header_len,
            trailer_len,
            hdr.use_crc(),
            parsed.protocol_type,
            parsed.compressed,
        );
        ctx.rasm_buf.append(alpdu_frag).unwrap();
        self.free_ctx |= 1 << id;
        None
    }

    /// CONT PPDU: appends to an open context.
    pub(super) fn cont_ppdu(&mut self, ppdu: &[u8]) -> Option<Sdu> {
        let hdr = match ContEndHeader::from_bytes(&mut Cursor::new(ppdu)) {
            Ok(hdr) => hdr,
            Err(e) => {
                error!("bad CONT header: {:?}", e);
                return None;
            }
        };
        let id = hdr.frag_id();
        {
            let ctx = &mut self.ctxs[id as usize];
            ctx.stat.bytes_in += ppdu.len() as u64;
            ctx.rasm_buf.add_burst_bytes(ppdu.len());
        }
        if !self.is_busy(id) {
            error!("CONT without a START on context {}", id);
            self.drop_context(id);
            return None;
        }
        let frag = &ppdu[CONT_END_HDR_LEN..];
        if frag.is_empty() {
            warn!("0-byte ALPDU fragment in CONT PPDU");
        }
        if self.ctxs[id as usize].rasm_buf.append(frag).is_err() {
            error!(
                "CONT overruns the declared ALPDU total on context {}",
                id
            );
            self.drop_context(id);
        }
        None
    }

    /// END PPDU: appends the last fragment, validates the trailer, and
    /// delivers the SDU.
    pub(super) fn end_ppdu(&mut self, ppdu: &[u8]) -> Option<Sdu> {
        let hdr = match ContEndHeader::from_bytes(&mut Cursor::new(ppdu)) {
            Ok(hdr) => hdr,
            Err(e) => {
                error!("bad END header: {:?}", e);
                return None;
            }
        };
        let id = hdr.frag_id();
        {
            let ctx = &mut self.ctxs[id as usize];
            ctx.stat.bytes_in += ppdu.len() as u64;
            ctx.rasm_buf.add_burst_bytes(ppdu.len());
        }
        if !self.is_busy(id) {
            error!("END without a START on context {}", id);
            self.drop_context(id);
            return None;
        }
        let frag = &ppdu[CONT_END_HDR_LEN..];
        if self.ctxs[id as usize].rasm_buf.append(frag).is_err() {
            error!("END overruns the declared ALPDU total on context {}", id);
            self.drop_context(id);
            return None;
        }
        if !self.ctxs[id as usize].rasm_buf.is_complete() {
            let ctx = &self.ctxs[id as usize];
            error!(
                "END received with {} of {} ALPDU bytes on context {}",
                ctx.rasm_buf.received(),
                ctx.rasm_buf.expected(),
                id
            );
            self.drop_context(id);
            return None;
        }

        if !self.check_trailer(id) {
            self.drop_context(id);
            return None;
        }

        let ctx = &mut self.ctxs[id as usize];
        let sdu = if ctx.rasm_buf.compressed_ptype()
            == u8::from(CompressedPtype::VlanNoPtypeField)
        {
            match insert_vlan_ptype(ctx.rasm_buf.sdu()) {
                Ok(sdu) => sdu,
                Err(e) => {
                    error!("VLAN protocol-type reconstruction failed: {:?}", e);
                    self.drop_context(id);
                    return None;
                }
            }
        } else {
            Sdu {
                protocol_type: ctx.rasm_buf.protocol_type(),
                payload: ctx.rasm_buf.sdu().to_vec(),
            }
        };
        let ctx = &mut self.ctxs[id as usize];
        ctx.stat.packets_ok += 1;
        ctx.stat.packets_out += 1;
        ctx.stat.bytes_ok += sdu.payload.len() as u64;
        ctx.stat.bytes_out += sdu.payload.len() as u64;
        ctx.rasm_buf.reset();
        self.free_ctx &= !(1 << id);
        Some(sdu)
    }

    /// Trailer validation on a complete ALPDU. Returns false when the SDU
    /// must be dropped; gap accounting happens here.
    fn check_trailer(&mut self, id: u8) -> bool {
        let ctx = &mut self.ctxs[id as usize];
        if ctx.rasm_buf.use_crc() {
            let computed = crc::compute(crc::CRC_INIT, ctx.rasm_buf.crc_region());
            match Trailer::parse(ctx.rasm_buf.trailer(), true) {
                Ok(Trailer::Crc(received)) if received == computed => true,
                _ => {
                    error!("CRC trailer mismatch on context {}", id);
                    false
                }
            }
        } else {
            let seq = match Trailer::parse(ctx.rasm_buf.trailer(), false) {
                Ok(Trailer::SeqNo(seq)) => seq,
                _ => return false,
            };
            if !ctx.seq_initialised {
                ctx.seq_initialised = true;
                ctx.expected_seq = seq.next();
                return true;
            }
            let delta = seq.delta(ctx.expected_seq);
            ctx.expected_seq = seq.next();
            if delta == 0 {
                true
            } else if delta <= SEQ_GAP_MAX {
                warn!("sequence gap of {} on context {}", delta, id);
                ctx.stat.packets_lost += delta as u64;
                true
            } else {
                error!(
                    "ambiguous sequence jump of {} on context {}, SDU dropped",
                    delta, id
                );
                false
            }
        }
    }

    /// Error epilogue: the burst in progress is charged as dropped and
    /// lost, and the context is freed.
    fn drop_context(&mut self, id: u8) {
        let ctx = &mut self.ctxs[id as usize];
        ctx.stat.packets_dropped += 1;
        ctx.stat.packets_lost += 1;
        ctx.stat.bytes_dropped += ctx.rasm_buf.burst_bytes() as u64;
        ctx.rasm_buf.reset();
        self.free_ctx &= !(1 << id);
    }
}
