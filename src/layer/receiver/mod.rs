use log::error;

use crate::config::{Config, ConfigError};
use crate::protocol::fpdu::PpduRdr;
use crate::protocol::ppdu_hdr::{PpduKind, FRAG_ID_COUNT};
use crate::stats::Stat;
use crate::utils::SeqNum;

use super::rasm_buf::RasmBuf;
use super::Sdu;

mod reassembly;

pub use reassembly::VlanReconstructError;

struct RxContext {
    rasm_buf: RasmBuf,
    /// Set once the first END for this fragment id has established the
    /// sender's sequence numbering.
    seq_initialised: bool,
    expected_seq: SeqNum,
    stat: Stat,
}

impl RxContext {
    fn new() -> Self {
        Self {
            rasm_buf: RasmBuf::new(),
            seq_initialised: false,
            expected_seq: SeqNum::zero(),
            stat: Stat::default(),
        }
    }
}

/// RLE receiver: eight reassembly contexts selected by fragment id. One
/// instance is single-threaded; hosts wanting parallel receive instantiate
/// one per worker.
pub struct Receiver {
    conf: Config,
    ctxs: [RxContext; FRAG_ID_COUNT],
    /// Bit n set while fragment id n has a reassembly in progress.
    free_ctx: u8,
    /// SDUs carried by COMP PPDUs have no fragment id; they are counted
    /// here and folded into the aggregate.
    comp_stat: Stat,
}

impl Receiver {
    pub fn new(conf: Config) -> Result<Self, ConfigError> {
        conf.check()?;
        Ok(Self {
            conf,
            ctxs: std::array::from_fn(|_| RxContext::new()),
            free_ctx: 0,
            comp_stat: Stat::default(),
        })
    }

    #[must_use]
    #[inline]
    pub fn conf(&self) -> &Config {
        &self.conf
    }

    #[inline]
    fn is_busy(&self, frag_id: u8) -> bool {
        self.free_ctx & (1 << frag_id) != 0
    }

    /// Walks the PPDUs of one FPDU and feeds them to the per-fragment-id
    /// state machines. Returns the SDUs completed by this FPDU; everything
    /// that went wrong shows up in the counters.
    pub fn decapsulate(&mut self, fpdu: &[u8]) -> Vec<Sdu> {
        let mut sdus = Vec::new();
        let label_size = self.conf.implicit_payload_label_size as usize;
        for ppdu in PpduRdr::new(fpdu, label_size) {
            let ppdu = match ppdu {
                Ok(ppdu) => ppdu,
                Err(e) => {
                    // No way to resync inside this frame.
                    error!("malformed PPDU, rest of FPDU discarded: {:?}", e);
                    break;
                }
            };
            let delivered = match PpduKind::of_first_byte(ppdu[0]) {
                PpduKind::Comp => self.comp_ppdu(ppdu),
                PpduKind::Start => self.start_ppdu(ppdu),
                PpduKind::Cont => self.cont_ppdu(ppdu),
                PpduKind::End => self.end_ppdu(ppdu),
            };
            if let Some(sdu) = delivered {
                sdus.push(sdu);
            }
        }
        sdus
    }

    /// Abandons the reassembly in progress on `frag_id`, if any. The
    /// sequence-number tracking survives.
    pub fn free_context(&mut self, frag_id: u8) {
        self.ctxs[frag_id as usize].rasm_buf.reset();
        self.free_ctx &= !(1 << frag_id);
    }

    #[must_use]
    pub fn context_stat(&self, frag_id: u8) -> Stat {
        self.ctxs[frag_id as usize].stat
    }

    /// Counters summed over all contexts, COMP traffic included.
    #[must_use]
    pub fn stat(&self) -> Stat {
        let mut total = self.comp_stat;
        for ctx in self.ctxs.iter() {
            total.merge(&ctx.stat);
        }
        total
    }

    pub fn reset_stats(&mut self) {
        self.comp_stat.clear();
        for ctx in self.ctxs.iter_mut() {
            ctx.stat.clear();
        }
    }
}
