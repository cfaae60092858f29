use std::sync::atomic::{AtomicU8, Ordering};

use log::{debug, error};

use crate::config::{Config, ConfigError};
use crate::protocol::fpdu::{Fpdu, FpduWtr};
use crate::protocol::ppdu_hdr::{FRAG_ID_COUNT, FRAG_ID_MAX};
use crate::stats::Stat;
use crate::utils::SeqNum;

use super::frag_buf::FragBuf;
use super::{Sdu, SDU_LEN_MAX};

mod encap;
mod frag;

pub use encap::EncapError;
pub use frag::FragError;

/// Fragments per ALPDU before the context is declared stuck and dropped.
pub const DEFAULT_MAX_FRAG_COUNT: usize = 4096;

struct TxContext {
    frag_id: u8,
    frag_buf: FragBuf,
    next_seq: SeqNum,
    frag_count: usize,
    label_type: u8,
    ptype_suppressed: bool,
    use_crc: bool,
    stat: Stat,
}

/// RLE transmitter: eight fragmentation contexts selected by fragment id,
/// with a shared free-context bitmap.
///
/// A context is taken by `encapsulate` and released when its last PPDU has
/// been packed, or on any error. Distinct fragment ids may be driven from
/// distinct producers (the bitmap is atomic); a single fragment id must not
/// be driven concurrently.
pub struct Transmitter {
    conf: Config,
    ctxs: [TxContext; FRAG_ID_COUNT],
    /// Bit n set while fragment id n holds an unfinished ALPDU.
    free_ctx: AtomicU8,
    max_frag_count: usize,
}

pub struct TransmitterBuilder {
    pub conf: Config,
    pub max_frag_count: usize,
}

impl TransmitterBuilder {
    pub fn build(self) -> Result<Transmitter, ConfigError> {
        self.conf.check()?;
        Ok(Transmitter {
            conf: self.conf,
            ctxs: std::array::from_fn(|i| TxContext::new(i as u8)),
            free_ctx: AtomicU8::new(0),
            max_frag_count: self.max_frag_count,
        })
    }
}

impl Transmitter {
    pub fn new(conf: Config) -> Result<Self, ConfigError> {
        TransmitterBuilder {
            conf,
            max_frag_count: DEFAULT_MAX_FRAG_COUNT,
        }
        .build()
    }

    #[must_use]
    #[inline]
    pub fn conf(&self) -> &Config {
        &self.conf
    }

    #[inline]
    fn is_busy(&self, frag_id: u8) -> bool {
        self.free_ctx.load(Ordering::Acquire) & (1 << frag_id) != 0
    }

    /// Wraps `sdu` into an ALPDU in the context of `frag_id`. The context
    /// stays taken until `pack_one_fpdu` has emitted its final PPDU.
    pub fn encapsulate(&mut self, sdu: &Sdu, frag_id: u8) -> Result<(), EncapError> {
        if frag_id > FRAG_ID_MAX {
            return Err(EncapError::InvalidFragId);
        }
        if sdu.payload.len() > SDU_LEN_MAX {
            return Err(EncapError::SduTooBig);
        }
        let bit = 1 << frag_id;
        if self.free_ctx.fetch_or(bit, Ordering::AcqRel) & bit != 0 {
            return Err(EncapError::ContextBusy);
        }
        let ctx = &mut self.ctxs[frag_id as usize];
        match encap::encapsulate(ctx, &self.conf, sdu) {
            Ok(()) => {
                ctx.stat.packets_in += 1;
                ctx.stat.bytes_in += sdu.payload.len() as u64;
                debug!(
                    "frag_id {}: encapsulated {}-byte SDU, ptype 0x{:04x}",
                    frag_id,
                    sdu.payload.len(),
                    sdu.protocol_type
                );
                Ok(())
            }
            Err(e) => {
                ctx.stat.packets_dropped += 1;
                self.free_ctx.fetch_and(!bit, Ordering::AcqRel);
                Err(e)
            }
        }
    }

    /// Packs pending PPDUs from all busy contexts into one fixed-size FPDU,
    /// zero-padding the remainder. Contexts are drained in fragment-id
    /// order; a context whose END fits is completed and released.
    pub fn pack_one_fpdu(&mut self, fpdu_size: usize) -> Result<Fpdu, FragError> {
        let label = vec![0u8; self.conf.implicit_payload_label_size as usize];
        let mut wtr = FpduWtr::new(fpdu_size, &label).map_err(|_e| FragError::BurstTooSmall)?;
        let mut packed_any = false;
        let mut had_pending = false;
        let mut cap_tripped = false;
        loop {
            let mut progress = false;
            for id in 0..FRAG_ID_COUNT as u8 {
                if !self.is_busy(id) {
                    continue;
                }
                had_pending = true;
                let space = wtr.remaining();
                let ctx = &mut self.ctxs[id as usize];
                if !frag::fits_burst(ctx, space) {
                    continue;
                }
                match frag::emit_ppdu(ctx, &self.conf, space, self.max_frag_count) {
                    Ok(emission) => {
                        ctx.stat.packets_out += 1;
                        ctx.stat.bytes_out += emission.bytes.len() as u64;
                        wtr.append_ppdu(&emission.bytes).unwrap();
                        if emission.done {
                            ctx.stat.packets_ok += 1;
                            ctx.stat.bytes_ok += ctx.frag_buf.sdu_len() as u64;
                            self.free_ctx.fetch_and(!(1 << id), Ordering::AcqRel);
                        }
                        progress = true;
                        packed_any = true;
                    }
                    Err(FragError::TooManyFrags) => {
                        error!("frag_id {}: ALPDU exceeded the fragment cap, dropped", id);
                        ctx.stat.packets_dropped += 1;
                        ctx.stat.bytes_dropped += ctx.frag_buf.sdu_len() as u64;
                        self.free_ctx.fetch_and(!(1 << id), Ordering::AcqRel);
                        cap_tripped = true;
                    }
                    Err(_e) => {
                        // fits_burst said no progress was possible after all;
                        // leave the context for a roomier frame.
                    }
                }
            }
            if !progress {
                break;
            }
        }
        if !packed_any {
            return Err(if cap_tripped {
                FragError::TooManyFrags
            } else if had_pending {
                FragError::BurstTooSmall
            } else {
                FragError::NoAlpduPending
            });
        }
        Ok(wtr.finish())
    }

    /// True when the context of `frag_id` has nothing left to emit.
    #[must_use]
    pub fn queue_state(&self, frag_id: u8) -> bool {
        self.queue_size(frag_id) == 0
    }

    /// ALPDU bytes still pending for `frag_id`.
    #[must_use]
    pub fn queue_size(&self, frag_id: u8) -> usize {
        if !self.is_busy(frag_id) {
            return 0;
        }
        self.ctxs[frag_id as usize].frag_buf.remaining()
    }

    /// The ALPDU currently held by `frag_id`, for inspection.
    #[must_use]
    pub fn pending_alpdu(&self, frag_id: u8) -> Option<&[u8]> {
        if !self.is_busy(frag_id) {
            return None;
        }
        Some(self.ctxs[frag_id as usize].frag_buf.alpdu())
    }

    /// Force-releases a context, abandoning any unfinished ALPDU.
    pub fn free_context(&mut self, frag_id: u8) {
        self.free_ctx.fetch_and(!(1 << frag_id), Ordering::AcqRel);
    }

    #[must_use]
    pub fn context_stat(&self, frag_id: u8) -> Stat {
        self.ctxs[frag_id as usize].stat
    }

    /// Counters summed over all contexts.
    #[must_use]
    pub fn stat(&self) -> Stat {
        let mut total = Stat::default();
        for ctx in self.ctxs.iter() {
            total.merge(&ctx.stat);
        }
        total
    }

    pub fn reset_stats(&mut self) {
        for ctx in self.ctxs.iter_mut() {
            ctx.stat.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::fpdu::PpduRdr;
    use crate::protocol::ptype::PTYPE_IPV4;

    fn sdu(len: usize) -> Sdu {
        Sdu {
            protocol_type: PTYPE_IPV4,
            payload: (0..len).map(|i| i as u8).collect(),
        }
    }

    #[test]
    fn context_taken_and_released() {
        let mut trmt = Transmitter::new(Config::default()).unwrap();
        trmt.encapsulate(&sdu(10), 0).unwrap();
        assert!(matches!(
            trmt.encapsulate(&sdu(10), 0),
            Err(EncapError::ContextBusy)
        ));
        assert_eq!(trmt.queue_size(0), 12);
        assert_eq!(&trmt.pending_alpdu(0).unwrap()[..2], &[0x00, 0x08]);
        let fpdu = trmt.pack_one_fpdu(64).unwrap();
        assert_eq!(fpdu.bytes.len(), 64);
        // COMP: 2 + 12 bytes.
        assert_eq!(fpdu.padding, 50);
        assert!(trmt.queue_state(0));
        trmt.encapsulate(&sdu(10), 0).unwrap();
    }

    #[test]
    fn invalid_inputs() {
        let mut trmt = Transmitter::new(Config::default()).unwrap();
        assert!(matches!(
            trmt.encapsulate(&sdu(1), 8),
            Err(EncapError::InvalidFragId)
        ));
        assert!(matches!(
            trmt.encapsulate(&sdu(SDU_LEN_MAX + 1), 0),
            Err(EncapError::SduTooBig)
        ));
        assert!(trmt.encapsulate(&sdu(SDU_LEN_MAX), 0).is_ok());
        assert!(matches!(
            trmt.pack_one_fpdu(3),
            Err(FragError::BurstTooSmall)
        ));
    }

    #[test]
    fn invalid_config_rejected() {
        let conf = Config {
            implicit_protocol_type: 0x31,
            ..Config::default()
        };
        assert!(Transmitter::new(conf).is_err());
    }

    #[test]
    fn nothing_pending() {
        let mut trmt = Transmitter::new(Config::default()).unwrap();
        assert!(matches!(
            trmt.pack_one_fpdu(64),
            Err(FragError::NoAlpduPending)
        ));
    }

    #[test]
    fn fragments_across_fpdus() {
        let mut trmt = Transmitter::new(Config::default()).unwrap();
        trmt.encapsulate(&sdu(100), 2).unwrap();
        // 102-byte ALPDU + 1 trailer byte: START fills the first frame.
        let fpdu = trmt.pack_one_fpdu(40).unwrap();
        assert_eq!(fpdu.padding, 0);
        assert!(!trmt.queue_state(2));
        let fpdu = trmt.pack_one_fpdu(40).unwrap();
        assert_eq!(fpdu.padding, 0);
        let fpdu = trmt.pack_one_fpdu(40).unwrap();
        // END: 103 - 36 - 38 = 29 payload bytes + 2 header bytes.
        assert_eq!(fpdu.padding, 9);
        assert!(trmt.queue_state(2));
        let stat = trmt.context_stat(2);
        assert_eq!(stat.packets_in, 1);
        assert_eq!(stat.packets_ok, 1);
        assert_eq!(stat.packets_out, 3);
        assert_eq!(stat.bytes_ok, 100);
    }

    #[test]
    fn two_contexts_share_an_fpdu() {
        let mut trmt = Transmitter::new(Config::default()).unwrap();
        trmt.encapsulate(&sdu(8), 1).unwrap();
        trmt.encapsulate(&sdu(8), 5).unwrap();
        let fpdu = trmt.pack_one_fpdu(64).unwrap();
        // Two COMPs of 12 bytes each.
        assert_eq!(fpdu.padding, 64 - 24);
        let ppdus = PpduRdr::new(&fpdu.bytes, 0)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(ppdus.len(), 2);
        assert!(trmt.queue_state(1));
        assert!(trmt.queue_state(5));
    }

    #[test]
    fn payload_label_prefix() {
        let conf = Config {
            implicit_payload_label_size: 3,
            ..Config::default()
        };
        let mut trmt = Transmitter::new(conf).unwrap();
        trmt.encapsulate(&sdu(4), 0).unwrap();
        let fpdu = trmt.pack_one_fpdu(16).unwrap();
        // 3 label bytes + 8-byte COMP.
        assert_eq!(fpdu.padding, 5);
        let ppdus = PpduRdr::new(&fpdu.bytes, 3)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(ppdus.len(), 1);
    }

    #[test]
    fn fragment_cap_drops_and_releases() {
        let mut trmt = TransmitterBuilder {
            conf: Config::default(),
            max_frag_count: 2,
        }
        .build()
        .unwrap();
        trmt.encapsulate(&sdu(200), 0).unwrap();
        trmt.pack_one_fpdu(40).unwrap();
        trmt.pack_one_fpdu(40).unwrap();
        // The third fragment trips the cap: context dropped and freed.
        assert!(matches!(
            trmt.pack_one_fpdu(40),
            Err(FragError::TooManyFrags)
        ));
        let stat = trmt.context_stat(0);
        assert_eq!(stat.packets_dropped, 1);
        assert!(trmt.queue_state(0));
        trmt.encapsulate(&sdu(10), 0).unwrap();
    }

    #[test]
    fn free_context_abandons() {
        let mut trmt = Transmitter::new(Config::default()).unwrap();
        trmt.encapsulate(&sdu(10), 4).unwrap();
        assert!(trmt.pending_alpdu(4).is_some());
        trmt.free_context(4);
        assert!(trmt.pending_alpdu(4).is_none());
        trmt.encapsulate(&sdu(10), 4).unwrap();
    }
}
