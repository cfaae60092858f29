//! Return Link Encapsulation (RLE) per ETSI TS 103 179 / EN 301 545-2.
//!
//! RLE carries variable-length network PDUs (SDUs) over the fixed-bandwidth
//! frame bursts (FPDUs) of a satellite return channel. Each SDU becomes an
//! ALPDU whose protocol type may be compressed or omitted; ALPDUs are cut
//! into COMP or START/CONT/END PPDUs across eight fragment-id contexts,
//! sealed with a sequence-number or CRC trailer, and packed into FPDUs.
//!
//! ```
//! use rle::{Config, Receiver, Sdu, Transmitter};
//!
//! let conf = Config::default();
//! let mut trmt = Transmitter::new(conf).unwrap();
//! let mut rcvr = Receiver::new(conf).unwrap();
//!
//! let sdu = Sdu { protocol_type: 0x0800, payload: vec![0; 1500] };
//! trmt.encapsulate(&sdu, 0).unwrap();
//! let mut received = Vec::new();
//! while let Ok(fpdu) = trmt.pack_one_fpdu(599) {
//!     received.extend(rcvr.decapsulate(&fpdu.bytes));
//! }
//! assert_eq!(received, vec![sdu]);
//! ```

pub mod config;
pub mod layer;
pub mod protocol;
pub mod stats;
pub mod utils;

pub use config::{header_size, Config, ConfigError, FpduType, HeaderSizeError};
pub use layer::{
    EncapError, FragError, Receiver, Sdu, Transmitter, TransmitterBuilder, SDU_LEN_MAX,
};
pub use protocol::fpdu::Fpdu;
pub use stats::Stat;
