use super::frag_buf::FRAG_BUF_CAPACITY;

#[derive(Debug)]
pub enum Error {
    NotActive,
    TooManyBytes,
}

/// Per-fragment-id reassembly buffer. Accumulates the raw ALPDU bytes of a
/// fragmented SDU (header, SDU and trailer bytes in arrival order) so a
/// trailer split across a CONT/END boundary still lands in the right place,
/// then slices the SDU out once the declared total has been reached.
#[derive(Debug)]
pub struct RasmBuf {
    buf: Vec<u8>,
    expected_len: usize,
    hdr_len: usize,
    trailer_len: usize,
    use_crc: bool,
    protocol_type: u16,
    compressed_ptype: u8,
    /// PPDU bytes consumed by the burst in progress; charged to
    /// `bytes_dropped` when the burst dies.
    burst_bytes: usize,
    active: bool,
}

impl RasmBuf {
    #[inline]
    fn check_rep(&self) {
        assert!(self.buf.len() <= self.expected_len);
        assert!(self.hdr_len + self.trailer_len <= self.expected_len || !self.active);
    }

    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(FRAG_BUF_CAPACITY),
            expected_len: 0,
            hdr_len: 0,
            trailer_len: 0,
            use_crc: false,
            protocol_type: 0,
            compressed_ptype: 0,
            burst_bytes: 0,
            active: false,
        }
    }

    /// Starts a reassembly from the declared totals of a START PPDU.
    pub fn begin(
        &mut self,
        expected_len: usize,
        hdr_len: usize,
        trailer_len: usize,
        use_crc: bool,
        protocol_type: u16,
        compressed_ptype: u8,
    ) {
        self.buf.clear();
        self.expected_len = expected_len;
        self.hdr_len = hdr_len;
        self.trailer_len = trailer_len;
        self.use_crc = use_crc;
        self.protocol_type = protocol_type;
        self.compressed_ptype = compressed_ptype;
        self.active = true;
        self.check_rep();
    }

    pub fn append(&mut self, frag: &[u8]) -> Result<(), Error> {
        if !self.active {
            return Err(Error::NotActive);
        }
        if self.buf.len() + frag.len() > self.expected_len {
            return Err(Error::TooManyBytes);
        }
        self.buf.extend_from_slice(frag);
        self.check_rep();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.buf.clear();
        self.expected_len = 0;
        self.burst_bytes = 0;
        self.active = false;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }
    #[inline]
    pub fn received(&self) -> usize {
        self.buf.len()
    }
    #[inline]
    pub fn expected(&self) -> usize {
        self.expected_len
    }
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.active && self.buf.len() == self.expected_len
    }
    #[inline]
    pub fn use_crc(&self) -> bool {
        self.use_crc
    }
    #[inline]
    pub fn protocol_type(&self) -> u16 {
        self.protocol_type
    }
    #[inline]
    pub fn compressed_ptype(&self) -> u8 {
        self.compressed_ptype
    }

    /// ALPDU header + SDU, the region the CRC trailer covers.
    #[inline]
    pub fn crc_region(&self) -> &[u8] {
        &self.buf[..self.expected_len - self.trailer_len]
    }
    /// The reassembled SDU bytes.
    #[inline]
    pub fn sdu(&self) -> &[u8] {
        &self.buf[self.hdr_len..self.expected_len - self.trailer_len]
    }
    #[inline]
    pub fn trailer(&self) -> &[u8] {
        &self.buf[self.expected_len - self.trailer_len..]
    }

    #[inline]
    pub fn add_burst_bytes(&mut self, n: usize) {
        self.burst_bytes += n;
    }
    #[inline]
    pub fn burst_bytes(&self) -> usize {
        self.burst_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_and_slice() {
        let mut buf = RasmBuf::new();
        buf.begin(8, 1, 1, false, 0x0800, 0x0d);
        buf.append(&[0x0d, 1, 2]).unwrap();
        assert!(!buf.is_complete());
        buf.append(&[3, 4]).unwrap();
        buf.append(&[5, 6, 0x03]).unwrap();
        assert!(buf.is_complete());
        assert_eq!(buf.sdu(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(buf.trailer(), &[0x03]);
        assert_eq!(buf.crc_region(), &[0x0d, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn trailer_split_across_fragments() {
        let mut buf = RasmBuf::new();
        // 1-byte header, 1-byte SDU, 4-byte CRC.
        buf.begin(6, 1, 4, true, 0x0800, 0x0d);
        buf.append(&[0x0d, 9, 0xaa, 0xbb, 0xcc]).unwrap();
        buf.append(&[0xdd]).unwrap();
        assert!(buf.is_complete());
        assert_eq!(buf.sdu(), &[9]);
        assert_eq!(buf.trailer(), &[0xaa, 0xbb, 0xcc, 0xdd]);
    }

    #[test]
    fn over_declared_total() {
        let mut buf = RasmBuf::new();
        buf.begin(4, 0, 1, false, 0, 0);
        buf.append(&[1, 2, 3]).unwrap();
        assert!(matches!(buf.append(&[4, 5]), Err(Error::TooManyBytes)));
    }

    #[test]
    fn inactive_rejects() {
        let mut buf = RasmBuf::new();
        assert!(matches!(buf.append(&[1]), Err(Error::NotActive)));
        buf.begin(2, 0, 1, false, 0, 0);
        buf.reset();
        assert!(!buf.is_active());
        assert!(matches!(buf.append(&[1]), Err(Error::NotActive)));
    }
}
