//! # On-wire formats
//!
//! ## PPDU headers (network bit order, MSB first)
//!
//! ```text
//! COMP   0    1    2        4     5             16 (BIT)
//!       +----+----+--------+-----+--------------+
//!       |S=1 |E=1 | LT (2) | PTS | length (11)  |
//!       +----+----+--------+-----+--------------+
//!
//! START  0    1    2        4     5             16        19             31       32
//!       +----+----+--------+-----+--------------+---------+--------------+--------+
//!       |S=1 |E=0 | LT (2) | PTS | fragLen (11) | FID (3) | totalLen (12)| UseCRC |
//!       +----+----+--------+-----+--------------+---------+--------------+--------+
//!
//! CONT   0    1    2              13        16
//! /END  +----+----+--------------+---------+
//!       |S=0 |E   | length (11)  | FID (3) |
//!       +----+----+--------------+---------+
//! ```
//!
//! ## ALPDU
//!
//! ```text
//! (header: 0, 1, 2 or 3 bytes) (SDU) (trailer: absent, 1 or 4 bytes)
//! ```
//!
//! Header: empty when the protocol type is omitted, one compressed code
//! byte, two bytes of little-endian uncompressed type, or the 0xff escape
//! followed by the little-endian uncompressed type. Trailer: one byte
//! holding the 3-bit sequence number, or the little-endian CRC-32 of the
//! ALPDU header plus SDU; COMP PPDUs carry no trailer.
//!
//! ## FPDU
//!
//! ```text
//! (payload label)? (PPDU)* (zero padding)
//! ```
//!
//! # Invariants
//!
//! - PPDU payload lengths fit 11 bits; the ALPDU total length fits 12 bits.
//! - The first byte of every emitted PPDU is non-zero, so a zero byte in a
//!   header position marks the start of padding.

pub mod alpdu;
pub mod crc;
pub mod fpdu;
pub mod ppdu_hdr;
pub mod ptype;
