use byteorder::{BigEndian, ByteOrder};

use super::ppdu_hdr::PpduKind;

#[derive(Debug)]
pub enum Error {
    NotEnoughSpace,
    Decoding { field: &'static str },
}

/// One packed FPDU: `bytes.len()` is the configured frame size, of which the
/// last `padding` bytes are zero filler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fpdu {
    pub bytes: Vec<u8>,
    pub padding: usize,
}

/// Builds one fixed-size FPDU: optional payload label, then PPDUs in arrival
/// order, then zero padding.
#[derive(Debug)]
pub struct FpduWtr {
    buf: Vec<u8>,
    size: usize,
}

impl FpduWtr {
    #[inline]
    fn check_rep(&self) {
        assert!(self.buf.len() <= self.size);
    }

    pub fn new(size: usize, payload_label: &[u8]) -> Result<Self, Error> {
        if payload_label.len() > size {
            return Err(Error::NotEnoughSpace);
        }
        let mut buf = Vec::with_capacity(size);
        buf.extend_from_slice(payload_label);
        let this = Self { buf, size };
        this.check_rep();
        Ok(this)
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.size - self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn append_ppdu(&mut self, ppdu: &[u8]) -> Result<(), Error> {
        if ppdu.len() > self.remaining() {
            return Err(Error::NotEnoughSpace);
        }
        self.buf.extend_from_slice(ppdu);
        self.check_rep();
        Ok(())
    }

    /// Zero-pads to the frame size. Padding starts with a zero byte in a
    /// PPDU-header position, which is how the receiver detects it.
    pub fn finish(mut self) -> Fpdu {
        let padding = self.remaining();
        self.buf.resize(self.size, 0);
        Fpdu {
            bytes: self.buf,
            padding,
        }
    }
}

/// Lazily walks the PPDUs of one FPDU, stopping at the first padding byte.
/// Slices are checked for header consistency only (indicator bits known and
/// the length field in bounds); everything else is reassembly's business.
#[derive(Debug)]
pub struct PpduRdr<'a> {
    fpdu: &'a [u8],
    pos: usize,
}

impl<'a> PpduRdr<'a> {
    pub fn new(fpdu: &'a [u8], payload_label_size: usize) -> Self {
        // A frame shorter than its label is all padding.
        let pos = payload_label_size.min(fpdu.len());
        Self { fpdu, pos }
    }
}

impl<'a> Iterator for PpduRdr<'a> {
    type Item = Result<&'a [u8], Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.fpdu.len() {
            return None;
        }
        let first = self.fpdu[self.pos];
        if first == 0 {
            return None;
        }
        let kind = PpduKind::of_first_byte(first);
        let hdr_len = kind.header_len();
        if self.fpdu.len() - self.pos < hdr_len {
            self.pos = self.fpdu.len();
            return Some(Err(Error::Decoding { field: "header" }));
        }
        let word0 = BigEndian::read_u16(&self.fpdu[self.pos..self.pos + 2]);
        let frag_len = match kind {
            PpduKind::Comp | PpduKind::Start => (word0 & 0x07ff) as usize,
            PpduKind::Cont | PpduKind::End => ((word0 >> 3) & 0x07ff) as usize,
        };
        let total = hdr_len + frag_len;
        if self.fpdu.len() - self.pos < total {
            self.pos = self.fpdu.len();
            return Some(Err(Error::Decoding { field: "length" }));
        }
        let ppdu = &self.fpdu[self.pos..self.pos + total];
        self.pos += total;
        Some(Ok(ppdu))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_and_walk() {
        let mut wtr = FpduWtr::new(16, &[]).unwrap();
        // END frag_id 0, 3 payload bytes; COMP, 2 payload bytes.
        wtr.append_ppdu(&[0x40, 0x18, 1, 2, 3]).unwrap();
        wtr.append_ppdu(&[0xc0, 0x02, 4, 5]).unwrap();
        let fpdu = wtr.finish();
        assert_eq!(fpdu.bytes.len(), 16);
        assert_eq!(fpdu.padding, 7);
        assert_eq!(&fpdu.bytes[9..], &[0; 7]);

        let ppdus = PpduRdr::new(&fpdu.bytes, 0)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(ppdus, vec![&[0x40, 0x18, 1, 2, 3][..], &[0xc0, 0x02, 4, 5][..]]);
    }

    #[test]
    fn payload_label_skipped() {
        let mut wtr = FpduWtr::new(8, &[0xaa, 0xbb]).unwrap();
        assert_eq!(wtr.remaining(), 6);
        wtr.append_ppdu(&[0xc0, 0x01, 9]).unwrap();
        let fpdu = wtr.finish();
        let ppdus = PpduRdr::new(&fpdu.bytes, 2)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(ppdus, vec![&[0xc0, 0x01, 9][..]]);
    }

    #[test]
    fn no_room() {
        let mut wtr = FpduWtr::new(4, &[]).unwrap();
        assert!(matches!(
            wtr.append_ppdu(&[0xc0, 0x03, 1, 2, 3]),
            Err(Error::NotEnoughSpace)
        ));
        assert!(FpduWtr::new(1, &[0, 0]).is_err());
    }

    #[test]
    fn all_padding() {
        assert!(PpduRdr::new(&[0; 32], 0).next().is_none());
        assert!(PpduRdr::new(&[], 0).next().is_none());
    }

    #[test]
    fn truncated_length_is_an_error() {
        // COMP claiming 100 payload bytes inside a 4-byte frame.
        let fpdu = [0xc0, 0x64, 1, 2];
        let mut rdr = PpduRdr::new(&fpdu, 0);
        assert!(matches!(rdr.next(), Some(Err(Error::Decoding { .. }))));
        assert!(rdr.next().is_none());
    }
}
