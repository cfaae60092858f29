use std::io;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

pub const COMP_HDR_LEN: usize = 2;
pub const START_HDR_LEN: usize = 4;
pub const CONT_END_HDR_LEN: usize = 2;

/// The PPDU length fields are 11 bits wide.
pub const PPDU_LEN_MAX: usize = 0x7ff;
/// The START total-length field is 12 bits wide.
pub const ALPDU_LEN_MAX: usize = 0xfff;

pub const FRAG_ID_MAX: u8 = 7;
pub const FRAG_ID_COUNT: usize = 8;

pub const LABEL_TYPE_IMPLICIT: u8 = 0;
pub const LABEL_TYPE_SIGNAL: u8 = 3;
pub const LABEL_TYPE_MAX: u8 = 3;

/// PPDU kind, read off the start/end indicator bits of the first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpduKind {
    Comp,
    Start,
    Cont,
    End,
}

impl PpduKind {
    #[inline]
    pub fn of_first_byte(b: u8) -> PpduKind {
        match (b & 0x80 != 0, b & 0x40 != 0) {
            (true, true) => PpduKind::Comp,
            (true, false) => PpduKind::Start,
            (false, false) => PpduKind::Cont,
            (false, true) => PpduKind::End,
        }
    }

    /// Header length implied by the indicator bits alone.
    #[inline]
    pub fn header_len(self) -> usize {
        match self {
            PpduKind::Comp => COMP_HDR_LEN,
            PpduKind::Start => START_HDR_LEN,
            PpduKind::Cont | PpduKind::End => CONT_END_HDR_LEN,
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Decoding { field: &'static str },
    FieldOverflow { field: &'static str },
}

/// Complete PPDU header: the whole ALPDU fits in one PPDU.
///
/// ```text
///  0    1    2         4     5            16 (BIT)
/// +----+----+---------+-----+-------------+
/// |S=1 |E=1 | LT (2)  | PTS | length (11) |
/// +----+----+---------+-----+-------------+
/// ```
pub struct CompHeader {
    label_type: u8,
    ptype_suppressed: bool,
    alpdu_len: u16,
}

pub struct CompHeaderBuilder {
    pub label_type: u8,
    pub ptype_suppressed: bool,
    pub alpdu_len: u16,
}

impl CompHeaderBuilder {
    pub fn build(self) -> Result<CompHeader, Error> {
        if self.label_type > LABEL_TYPE_MAX {
            return Err(Error::FieldOverflow { field: "label_type" });
        }
        if self.alpdu_len as usize > PPDU_LEN_MAX {
            return Err(Error::FieldOverflow { field: "alpdu_len" });
        }
        let this = CompHeader {
            label_type: self.label_type,
            ptype_suppressed: self.ptype_suppressed,
            alpdu_len: self.alpdu_len,
        };
        this.check_rep();
        Ok(this)
    }
}

impl CompHeader {
    #[inline]
    fn check_rep(&self) {
        assert!(self.label_type <= LABEL_TYPE_MAX);
        assert!(self.alpdu_len as usize <= PPDU_LEN_MAX);
    }

    pub fn from_bytes(rdr: &mut io::Cursor<&[u8]>) -> Result<Self, Error> {
        let word = rdr
            .read_u16::<BigEndian>()
            .map_err(|_e| Error::Decoding { field: "word0" })?;
        if word & 0xc000 != 0xc000 {
            return Err(Error::Decoding { field: "start_end" });
        }
        let this = CompHeader {
            label_type: ((word >> 12) & 0x3) as u8,
            ptype_suppressed: word & 0x0800 != 0,
            alpdu_len: word & 0x07ff,
        };
        this.check_rep();
        Ok(this)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let word = 0xc000
            | (self.label_type as u16) << 12
            | (self.ptype_suppressed as u16) << 11
            | self.alpdu_len;
        let mut hdr = Vec::new();
        hdr.write_u16::<BigEndian>(word).unwrap();
        assert_eq!(hdr.len(), COMP_HDR_LEN);
        hdr
    }

    #[must_use]
    #[inline]
    pub fn label_type(&self) -> u8 {
        self.label_type
    }
    #[must_use]
    #[inline]
    pub fn ptype_suppressed(&self) -> bool {
        self.ptype_suppressed
    }
    #[must_use]
    #[inline]
    pub fn alpdu_len(&self) -> usize {
        self.alpdu_len as usize
    }
}

/// START PPDU header: first fragment of a fragmented ALPDU.
///
/// ```text
///  0    1    2        4     5             16        19             31       32 (BIT)
/// +----+----+--------+-----+--------------+---------+--------------+--------+
/// |S=1 |E=0 | LT (2) | PTS | fragLen (11) | FID (3) | totalLen (12)| UseCRC |
/// +----+----+--------+-----+--------------+---------+--------------+--------+
/// ```
pub struct StartHeader {
    label_type: u8,
    ptype_suppressed: bool,
    frag_id: u8,
    frag_len: u16,
    alpdu_total_len: u16,
    use_crc: bool,
}

pub struct StartHeaderBuilder {
    pub label_type: u8,
    pub ptype_suppressed: bool,
    pub frag_id: u8,
    pub frag_len: u16,
    pub alpdu_total_len: u16,
    pub use_crc: bool,
}

impl StartHeaderBuilder {
    pub fn build(self) -> Result<StartHeader, Error> {
        if self.label_type > LABEL_TYPE_MAX {
            return Err(Error::FieldOverflow { field: "label_type" });
        }
        if self.frag_id > FRAG_ID_MAX {
            return Err(Error::FieldOverflow { field: "frag_id" });
        }
        if self.frag_len as usize > PPDU_LEN_MAX {
            return Err(Error::FieldOverflow { field: "frag_len" });
        }
        if self.alpdu_total_len as usize > ALPDU_LEN_MAX {
            return Err(Error::FieldOverflow {
                field: "alpdu_total_len",
            });
        }
        let this = StartHeader {
            label_type: self.label_type,
            ptype_suppressed: self.ptype_suppressed,
            frag_id: self.frag_id,
            frag_len: self.frag_len,
            alpdu_total_len: self.alpdu_total_len,
            use_crc: self.use_crc,
        };
        this.check_rep();
        Ok(this)
    }
}

impl StartHeader {
    #[inline]
    fn check_rep(&self) {
        assert!(self.label_type <= LABEL_TYPE_MAX);
        assert!(self.frag_id <= FRAG_ID_MAX);
        assert!(self.frag_len as usize <= PPDU_LEN_MAX);
        assert!(self.alpdu_total_len as usize <= ALPDU_LEN_MAX);
    }

    pub fn from_bytes(rdr: &mut io::Cursor<&[u8]>) -> Result<Self, Error> {
        let word0 = rdr
            .read_u16::<BigEndian>()
            .map_err(|_e| Error::Decoding { field: "word0" })?;
        if word0 & 0xc000 != 0x8000 {
            return Err(Error::Decoding { field: "start_end" });
        }
        let word1 = rdr
            .read_u16::<BigEndian>()
            .map_err(|_e| Error::Decoding { field: "word1" })?;
        let this = StartHeader {
            label_type: ((word0 >> 12) & 0x3) as u8,
            ptype_suppressed: word0 & 0x0800 != 0,
            frag_len: word0 & 0x07ff,
            frag_id: (word1 >> 13) as u8,
            alpdu_total_len: (word1 >> 1) & 0x0fff,
            use_crc: word1 & 0x0001 != 0,
        };
        this.check_rep();
        Ok(this)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let word0 = 0x8000
            | (self.label_type as u16) << 12
            | (self.ptype_suppressed as u16) << 11
            | self.frag_len;
        let word1 = (self.frag_id as u16) << 13 | self.alpdu_total_len << 1 | self.use_crc as u16;
        let mut hdr = Vec::new();
        hdr.write_u16::<BigEndian>(word0).unwrap();
        hdr.write_u16::<BigEndian>(word1).unwrap();
        assert_eq!(hdr.len(), START_HDR_LEN);
        hdr
    }

    #[must_use]
    #[inline]
    pub fn label_type(&self) -> u8 {
        self.label_type
    }
    #[must_use]
    #[inline]
    pub fn ptype_suppressed(&self) -> bool {
        self.ptype_suppressed
    }
    #[must_use]
    #[inline]
    pub fn frag_id(&self) -> u8 {
        self.frag_id
    }
    #[must_use]
    #[inline]
    pub fn frag_len(&self) -> usize {
        self.frag_len as usize
    }
    #[must_use]
    #[inline]
    pub fn alpdu_total_len(&self) -> usize {
        self.alpdu_total_len as usize
    }
    #[must_use]
    #[inline]
    pub fn use_crc(&self) -> bool {
        self.use_crc
    }
}

/// CONT (E=0) / END (E=1) PPDU header.
///
/// ```text
///  0    1    2             13        16 (BIT)
/// +----+----+--------------+---------+
/// |S=0 |E   | length (11)  | FID (3) |
/// +----+----+--------------+---------+
/// ```
pub struct ContEndHeader {
    end: bool,
    frag_id: u8,
    frag_len: u16,
}

pub struct ContEndHeaderBuilder {
    pub end: bool,
    pub frag_id: u8,
    pub frag_len: u16,
}

impl ContEndHeaderBuilder {
    pub fn build(self) -> Result<ContEndHeader, Error> {
        if self.frag_id > FRAG_ID_MAX {
            return Err(Error::FieldOverflow { field: "frag_id" });
        }
        if self.frag_len as usize > PPDU_LEN_MAX {
            return Err(Error::FieldOverflow { field: "frag_len" });
        }
        let this = ContEndHeader {
            end: self.end,
            frag_id: self.frag_id,
            frag_len: self.frag_len,
        };
        this.check_rep();
        Ok(this)
    }
}

impl ContEndHeader {
    #[inline]
    fn check_rep(&self) {
        assert!(self.frag_id <= FRAG_ID_MAX);
        assert!(self.frag_len as usize <= PPDU_LEN_MAX);
    }

    pub fn from_bytes(rdr: &mut io::Cursor<&[u8]>) -> Result<Self, Error> {
        let word = rdr
            .read_u16::<BigEndian>()
            .map_err(|_e| Error::Decoding { field: "word0" })?;
        if word & 0x8000 != 0 {
            return Err(Error::Decoding { field: "start_end" });
        }
        let this = ContEndHeader {
            end: word & 0x4000 != 0,
            frag_len: (word >> 3) & 0x07ff,
            frag_id: (word & 0x7) as u8,
        };
        this.check_rep();
        Ok(this)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let word = (self.end as u16) << 14 | self.frag_len << 3 | self.frag_id as u16;
        let mut hdr = Vec::new();
        hdr.write_u16::<BigEndian>(word).unwrap();
        assert_eq!(hdr.len(), CONT_END_HDR_LEN);
        hdr
    }

    #[must_use]
    #[inline]
    pub fn is_end(&self) -> bool {
        self.end
    }
    #[must_use]
    #[inline]
    pub fn frag_id(&self) -> u8 {
        self.frag_id
    }
    #[must_use]
    #[inline]
    pub fn frag_len(&self) -> usize {
        self.frag_len as usize
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn comp_bit_exact() {
        let hdr = CompHeaderBuilder {
            label_type: 0,
            ptype_suppressed: false,
            alpdu_len: 102,
        }
        .build()
        .unwrap();
        assert_eq!(hdr.to_bytes(), vec![0xc0, 0x66]);
        let hdr2 = CompHeader::from_bytes(&mut Cursor::new(&[0xc0, 0x66][..])).unwrap();
        assert_eq!(hdr2.alpdu_len(), 102);
        assert!(!hdr2.ptype_suppressed());
        assert_eq!(hdr2.label_type(), 0);
    }

    #[test]
    fn comp_suppressed_signal() {
        let hdr = CompHeaderBuilder {
            label_type: LABEL_TYPE_SIGNAL,
            ptype_suppressed: true,
            alpdu_len: 1,
        }
        .build()
        .unwrap();
        assert_eq!(hdr.to_bytes(), vec![0xf8, 0x01]);
    }

    #[test]
    fn start_bit_exact() {
        let hdr = StartHeaderBuilder {
            label_type: 0,
            ptype_suppressed: false,
            frag_id: 1,
            frag_len: 5,
            alpdu_total_len: 0xfff,
            use_crc: true,
        }
        .build()
        .unwrap();
        assert_eq!(hdr.to_bytes(), vec![0x80, 0x05, 0x3f, 0xff]);
        let hdr2 = StartHeader::from_bytes(&mut Cursor::new(&[0x80, 0x05, 0x3f, 0xff][..])).unwrap();
        assert_eq!(hdr2.frag_id(), 1);
        assert_eq!(hdr2.frag_len(), 5);
        assert_eq!(hdr2.alpdu_total_len(), 0xfff);
        assert!(hdr2.use_crc());
    }

    #[test]
    fn cont_end_bit_exact() {
        let hdr = ContEndHeaderBuilder {
            end: true,
            frag_id: 7,
            frag_len: 1,
        }
        .build()
        .unwrap();
        assert_eq!(hdr.to_bytes(), vec![0x40, 0x0f]);
        let hdr2 = ContEndHeader::from_bytes(&mut Cursor::new(&[0x40, 0x0f][..])).unwrap();
        assert!(hdr2.is_end());
        assert_eq!(hdr2.frag_id(), 7);
        assert_eq!(hdr2.frag_len(), 1);

        let cont = ContEndHeaderBuilder {
            end: false,
            frag_id: 2,
            frag_len: 0x7ff,
        }
        .build()
        .unwrap();
        assert_eq!(cont.to_bytes(), vec![0x3f, 0xfa]);
    }

    #[test]
    fn kind_from_first_byte() {
        assert_eq!(PpduKind::of_first_byte(0xc0), PpduKind::Comp);
        assert_eq!(PpduKind::of_first_byte(0x80), PpduKind::Start);
        assert_eq!(PpduKind::of_first_byte(0x40), PpduKind::End);
        assert_eq!(PpduKind::of_first_byte(0x01), PpduKind::Cont);
    }

    #[test]
    fn field_overflow() {
        assert!(matches!(
            CompHeaderBuilder {
                label_type: 0,
                ptype_suppressed: false,
                alpdu_len: 0x800,
            }
            .build(),
            Err(Error::FieldOverflow { field: "alpdu_len" })
        ));
        assert!(matches!(
            ContEndHeaderBuilder {
                end: false,
                frag_id: 8,
                frag_len: 0,
            }
            .build(),
            Err(Error::FieldOverflow { field: "frag_id" })
        ));
    }

    #[test]
    fn rejects_wrong_indicators() {
        // END bytes fed to the COMP parser.
        assert!(CompHeader::from_bytes(&mut Cursor::new(&[0x40, 0x0f][..])).is_err());
        // COMP bytes fed to the CONT/END parser.
        assert!(ContEndHeader::from_bytes(&mut Cursor::new(&[0xc0, 0x66][..])).is_err());
    }
}
