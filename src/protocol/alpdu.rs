use byteorder::{ByteOrder, LittleEndian};

use crate::config::Config;
use crate::protocol::ptype::{self, CompressedPtype, PTYPE_IPV4, PTYPE_IPV6, PTYPE_SIGNAL};
use crate::utils::SeqNum;

pub const ALPDU_HDR_MAX_LEN: usize = 3;
pub const SEQ_TRAILER_LEN: usize = 1;
pub const CRC_TRAILER_LEN: usize = 4;

#[derive(Debug)]
pub enum Error {
    Decoding { field: &'static str },
}

/// How the SDU protocol type is carried in the ALPDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtypeEncoding {
    /// No header byte; the receiver rebuilds the type from the configuration
    /// (or from label type 3 for L2S).
    Omitted { signal: bool },
    /// One byte holding a known compressed code.
    Compressed(CompressedPtype),
    /// 0xff escape followed by the 2-byte little-endian uncompressed type.
    CompressedFallback(u16),
    /// 2-byte little-endian uncompressed type.
    Uncompressed(u16),
}

impl PtypeEncoding {
    /// Applies the omission / compression / passthrough decision for one SDU.
    pub fn select(conf: &Config, protocol_type: u16) -> PtypeEncoding {
        if conf.allow_ptype_omission
            && ptype::is_suppressible(protocol_type, conf.implicit_protocol_type)
        {
            return PtypeEncoding::Omitted {
                signal: protocol_type == PTYPE_SIGNAL,
            };
        }
        if conf.use_compressed_ptype {
            return match ptype::compress(protocol_type) {
                Some(code) => PtypeEncoding::Compressed(code),
                None => PtypeEncoding::CompressedFallback(protocol_type),
            };
        }
        PtypeEncoding::Uncompressed(protocol_type)
    }

    #[must_use]
    pub fn header_len(&self) -> usize {
        match self {
            PtypeEncoding::Omitted { .. } => 0,
            PtypeEncoding::Compressed(_) => 1,
            PtypeEncoding::CompressedFallback(_) => 3,
            PtypeEncoding::Uncompressed(_) => 2,
        }
    }

    #[must_use]
    #[inline]
    pub fn is_suppressed(&self) -> bool {
        matches!(self, PtypeEncoding::Omitted { .. })
    }

    #[must_use]
    pub fn label_type(&self) -> u8 {
        match self {
            PtypeEncoding::Omitted { signal: true } => super::ppdu_hdr::LABEL_TYPE_SIGNAL,
            _ => super::ppdu_hdr::LABEL_TYPE_IMPLICIT,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            PtypeEncoding::Omitted { .. } => Vec::new(),
            PtypeEncoding::Compressed(code) => vec![code.into()],
            PtypeEncoding::CompressedFallback(uncomp) => {
                let mut hdr = vec![CompressedPtype::Fallback.into(), 0, 0];
                LittleEndian::write_u16(&mut hdr[1..], uncomp);
                hdr
            }
            PtypeEncoding::Uncompressed(uncomp) => {
                let mut hdr = vec![0, 0];
                LittleEndian::write_u16(&mut hdr, uncomp);
                hdr
            }
        }
    }
}

/// Protocol type recovered from an ALPDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPtype {
    pub protocol_type: u16,
    pub compressed: u8,
    pub header_len: usize,
}

/// Reads the protocol type off the front of an ALPDU fragment. `suppressed`
/// and `signal` come from the PPDU header (PTS bit and label type 3); the
/// rest of the decision is driven by the configuration, mirroring the
/// transmit-side selection.
pub fn parse_ptype(
    alpdu: &[u8],
    suppressed: bool,
    signal: bool,
    conf: &Config,
) -> Result<ParsedPtype, Error> {
    if suppressed {
        if signal {
            return Ok(ParsedPtype {
                protocol_type: PTYPE_SIGNAL,
                compressed: CompressedPtype::Signal.into(),
                header_len: 0,
            });
        }
        let code = conf.implicit_protocol_type;
        let protocol_type = match CompressedPtype::try_from(code) {
            Ok(CompressedPtype::Ip) => {
                let first = *alpdu.first().ok_or(Error::Decoding {
                    field: "ip_version",
                })?;
                ptype_from_ip_version(first)?
            }
            Ok(known) => known.uncompressed().ok_or(Error::Decoding {
                field: "implicit_ptype",
            })?,
            Err(_) => {
                return Err(Error::Decoding {
                    field: "implicit_ptype",
                })
            }
        };
        return Ok(ParsedPtype {
            protocol_type,
            compressed: code,
            header_len: 0,
        });
    }

    if conf.use_compressed_ptype {
        let code = *alpdu.first().ok_or(Error::Decoding {
            field: "compressed_ptype",
        })?;
        return match CompressedPtype::try_from(code) {
            Ok(CompressedPtype::Fallback) => {
                if alpdu.len() < 3 {
                    return Err(Error::Decoding {
                        field: "fallback_ptype",
                    });
                }
                Ok(ParsedPtype {
                    protocol_type: LittleEndian::read_u16(&alpdu[1..3]),
                    compressed: code,
                    header_len: 3,
                })
            }
            Ok(CompressedPtype::Ip) => {
                let first = *alpdu.get(1).ok_or(Error::Decoding {
                    field: "ip_version",
                })?;
                Ok(ParsedPtype {
                    protocol_type: ptype_from_ip_version(first)?,
                    compressed: code,
                    header_len: 1,
                })
            }
            Ok(known) => Ok(ParsedPtype {
                protocol_type: known.uncompressed().ok_or(Error::Decoding {
                    field: "compressed_ptype",
                })?,
                compressed: code,
                header_len: 1,
            }),
            Err(_) => Err(Error::Decoding {
                field: "compressed_ptype",
            }),
        };
    }

    if alpdu.len() < 2 {
        return Err(Error::Decoding { field: "ptype" });
    }
    let protocol_type = LittleEndian::read_u16(&alpdu[..2]);
    let compressed = match ptype::compress(protocol_type) {
        Some(code) => code.into(),
        None => CompressedPtype::Fallback.into(),
    };
    Ok(ParsedPtype {
        protocol_type,
        compressed,
        header_len: 2,
    })
}

fn ptype_from_ip_version(first_byte: u8) -> Result<u16, Error> {
    match first_byte >> 4 {
        4 => Ok(PTYPE_IPV4),
        6 => Ok(PTYPE_IPV6),
        _ => Err(Error::Decoding {
            field: "ip_version",
        }),
    }
}

/// ALPDU trailer of a fragmented ALPDU. COMP PPDUs never carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trailer {
    SeqNo(SeqNum),
    Crc(u32),
}

impl Trailer {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Trailer::SeqNo(_) => SEQ_TRAILER_LEN,
            Trailer::Crc(_) => CRC_TRAILER_LEN,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            Trailer::SeqNo(seq) => vec![seq.to_byte()],
            Trailer::Crc(crc) => {
                let mut bytes = vec![0; CRC_TRAILER_LEN];
                LittleEndian::write_u32(&mut bytes, crc);
                bytes
            }
        }
    }

    pub fn parse(bytes: &[u8], use_crc: bool) -> Result<Trailer, Error> {
        if use_crc {
            if bytes.len() != CRC_TRAILER_LEN {
                return Err(Error::Decoding { field: "crc" });
            }
            Ok(Trailer::Crc(LittleEndian::read_u32(bytes)))
        } else {
            if bytes.len() != SEQ_TRAILER_LEN {
                return Err(Error::Decoding { field: "seq_no" });
            }
            Ok(Trailer::SeqNo(SeqNum::from_byte(bytes[0])))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn conf(omit: bool, comp: bool, implicit: u8) -> Config {
        Config {
            allow_ptype_omission: omit,
            use_compressed_ptype: comp,
            implicit_protocol_type: implicit,
            ..Config::default()
        }
    }

    #[test]
    fn uncompressed_ipv4() {
        let enc = PtypeEncoding::select(&conf(false, false, 0x00), PTYPE_IPV4);
        assert_eq!(enc, PtypeEncoding::Uncompressed(PTYPE_IPV4));
        assert_eq!(enc.to_bytes(), vec![0x00, 0x08]);
        assert_eq!(enc.header_len(), 2);
    }

    #[test]
    fn compressed_ipv4() {
        let enc = PtypeEncoding::select(&conf(false, true, 0x00), PTYPE_IPV4);
        assert_eq!(enc.to_bytes(), vec![0x0d]);
        assert_eq!(enc.header_len(), 1);
    }

    #[test]
    fn compressed_fallback() {
        let enc = PtypeEncoding::select(&conf(false, true, 0x00), 0x1234);
        assert_eq!(enc.to_bytes(), vec![0xff, 0x34, 0x12]);
        assert_eq!(enc.header_len(), 3);
    }

    #[test]
    fn omitted_ipv4() {
        let enc = PtypeEncoding::select(&conf(true, false, 0x0d), PTYPE_IPV4);
        assert_eq!(enc, PtypeEncoding::Omitted { signal: false });
        assert!(enc.to_bytes().is_empty());
        assert!(enc.is_suppressed());
        assert_eq!(enc.label_type(), 0);
    }

    #[test]
    fn omitted_signal_label_type() {
        let enc = PtypeEncoding::select(&conf(true, false, 0x00), PTYPE_SIGNAL);
        assert_eq!(enc, PtypeEncoding::Omitted { signal: true });
        assert_eq!(enc.label_type(), 3);
    }

    #[test]
    fn omission_refused_without_match() {
        let enc = PtypeEncoding::select(&conf(true, true, 0x0d), PTYPE_IPV6);
        assert_eq!(enc, PtypeEncoding::Compressed(CompressedPtype::Ipv6));
    }

    #[test]
    fn parse_matches_select() {
        let cases = [
            (conf(false, false, 0x00), PTYPE_IPV4),
            (conf(false, true, 0x00), PTYPE_IPV6),
            (conf(false, true, 0x00), 0x1234),
            (conf(true, false, 0x0d), PTYPE_IPV4),
            (conf(true, true, 0x00), PTYPE_SIGNAL),
        ];
        for (conf, ptype) in cases {
            let enc = PtypeEncoding::select(&conf, ptype);
            let mut alpdu = enc.to_bytes();
            alpdu.extend_from_slice(&[0x45, 0x00]);
            let parsed = parse_ptype(
                &alpdu,
                enc.is_suppressed(),
                enc.label_type() == 3,
                &conf,
            )
            .unwrap();
            assert_eq!(parsed.protocol_type, ptype);
            assert_eq!(parsed.header_len, enc.header_len());
        }
    }

    #[test]
    fn implicit_ip_decides_from_nibble() {
        let conf = conf(true, false, 0x30);
        let parsed = parse_ptype(&[0x45, 0x00], true, false, &conf).unwrap();
        assert_eq!(parsed.protocol_type, PTYPE_IPV4);
        let parsed = parse_ptype(&[0x60, 0x00], true, false, &conf).unwrap();
        assert_eq!(parsed.protocol_type, PTYPE_IPV6);
        assert!(parse_ptype(&[0x00], true, false, &conf).is_err());
    }

    #[test]
    fn trailer_round_trip() {
        let seq = Trailer::SeqNo(SeqNum::from_byte(5));
        assert_eq!(seq.to_bytes(), vec![0x05]);
        assert_eq!(Trailer::parse(&[0x05], false).unwrap(), seq);

        let crc = Trailer::Crc(0x0376_e6e7);
        assert_eq!(crc.to_bytes(), vec![0xe7, 0xe6, 0x76, 0x03]);
        assert_eq!(Trailer::parse(&[0xe7, 0xe6, 0x76, 0x03], true).unwrap(), crc);
        assert!(Trailer::parse(&[0x05], true).is_err());
    }
}
