use crate::protocol::alpdu::{ALPDU_HDR_MAX_LEN, CRC_TRAILER_LEN};
use crate::utils::BufWtr;

use super::SDU_LEN_MAX;

/// Worst-case ALPDU: maximum header, maximum SDU, CRC trailer.
pub(crate) const FRAG_BUF_CAPACITY: usize = ALPDU_HDR_MAX_LEN + SDU_LEN_MAX + CRC_TRAILER_LEN;

#[derive(Debug)]
pub enum Error {
    NotInitialised,
    SduAlreadyCopied,
    SduTooBig,
    NotEnoughSpace,
}

/// Holds one SDU with headroom for the ALPDU header and room behind for the
/// trailer. The header is prepended in place; the cursor then walks the
/// finished ALPDU as fragments are emitted.
#[derive(Debug)]
pub struct FragBuf {
    wtr: BufWtr,
    cursor: usize,
    hdr_len: usize,
    trailer_len: usize,
    sdu_len: usize,
    initialised: bool,
    sdu_copied: bool,
}

impl FragBuf {
    #[inline]
    fn check_rep(&self) {
        assert!(self.cursor <= self.wtr.data_len());
        assert!(self.hdr_len + self.sdu_len + self.trailer_len == self.wtr.data_len());
    }

    pub fn new() -> Self {
        let this = Self {
            wtr: BufWtr::new(FRAG_BUF_CAPACITY, ALPDU_HDR_MAX_LEN),
            cursor: 0,
            hdr_len: 0,
            trailer_len: 0,
            sdu_len: 0,
            initialised: false,
            sdu_copied: false,
        };
        this.check_rep();
        this
    }

    /// Back to the empty state, full headroom restored.
    pub fn init(&mut self) {
        self.wtr.reset_data(ALPDU_HDR_MAX_LEN);
        self.cursor = 0;
        self.hdr_len = 0;
        self.trailer_len = 0;
        self.sdu_len = 0;
        self.initialised = true;
        self.sdu_copied = false;
        self.check_rep();
    }

    pub fn copy_sdu(&mut self, sdu: &[u8]) -> Result<(), Error> {
        if !self.initialised {
            return Err(Error::NotInitialised);
        }
        if self.sdu_copied {
            return Err(Error::SduAlreadyCopied);
        }
        if sdu.len() > SDU_LEN_MAX {
            return Err(Error::SduTooBig);
        }
        self.wtr.append(sdu).map_err(|_e| Error::NotEnoughSpace)?;
        self.sdu_len = sdu.len();
        self.sdu_copied = true;
        self.check_rep();
        Ok(())
    }

    pub fn prepend_hdr(&mut self, hdr: &[u8]) -> Result<(), Error> {
        if !self.initialised || !self.sdu_copied {
            return Err(Error::NotInitialised);
        }
        self.wtr.prepend(hdr).map_err(|_e| Error::NotEnoughSpace)?;
        self.hdr_len += hdr.len();
        self.check_rep();
        Ok(())
    }

    pub fn append_trailer(&mut self, trailer: &[u8]) -> Result<(), Error> {
        if !self.initialised || !self.sdu_copied {
            return Err(Error::NotInitialised);
        }
        self.wtr
            .append(trailer)
            .map_err(|_e| Error::NotEnoughSpace)?;
        self.trailer_len += trailer.len();
        self.check_rep();
        Ok(())
    }

    /// The finished ALPDU (header + SDU + any trailer appended so far).
    #[inline]
    pub fn alpdu(&self) -> &[u8] {
        self.wtr.data()
    }
    #[inline]
    pub fn alpdu_len(&self) -> usize {
        self.wtr.data_len()
    }
    #[inline]
    pub fn sdu_len(&self) -> usize {
        self.sdu_len
    }
    #[inline]
    pub fn has_trailer(&self) -> bool {
        self.trailer_len > 0
    }
    #[inline]
    pub fn is_initialised(&self) -> bool {
        self.initialised
    }
    #[inline]
    pub fn has_sdu(&self) -> bool {
        self.sdu_copied
    }

    /// Bytes not yet handed out as fragments.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.wtr.data_len() - self.cursor
    }
    #[inline]
    pub fn at_start(&self) -> bool {
        self.cursor == 0
    }

    /// Hands out the next `len` ALPDU bytes and advances the cursor.
    pub fn take(&mut self, len: usize) -> &[u8] {
        assert!(len <= self.remaining());
        let slice = &self.wtr.data()[self.cursor..self.cursor + len];
        self.cursor += len;
        slice
    }
}
