use crate::protocol::ptype::CompressedPtype;

/// Label size fields are 4 bits wide.
pub const LABEL_SIZE_MAX: u8 = 15;

/// Link configuration, shared verbatim by the transmitter and the receiver
/// of a link. Field semantics follow ETSI TS 103 179.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Omit the ALPDU protocol-type field when the SDU type matches the
    /// implicit one.
    pub allow_ptype_omission: bool,
    /// Carry a 1-byte compressed code instead of the 2-byte type (with a
    /// 3-byte escape for unknown types).
    pub use_compressed_ptype: bool,
    /// Fragmented ALPDUs end in a 4-byte CRC trailer.
    pub allow_alpdu_crc: bool,
    /// Fragmented ALPDUs end in a 1-byte sequence-number trailer. Must be
    /// set when `allow_alpdu_crc` is not; CRC wins when both are set.
    pub allow_alpdu_sequence_number: bool,
    /// Reserved; must stay unset.
    pub use_explicit_payload_header_map: bool,
    /// Compressed code assumed when the protocol type is omitted. 0x30
    /// means IPv4-or-IPv6, decided from the first payload nibble.
    pub implicit_protocol_type: u8,
    pub implicit_ppdu_label_size: u8,
    pub implicit_payload_label_size: u8,
    pub type_0_alpdu_label_size: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_ptype_omission: false,
            use_compressed_ptype: false,
            allow_alpdu_crc: false,
            allow_alpdu_sequence_number: true,
            use_explicit_payload_header_map: false,
            implicit_protocol_type: 0x00,
            implicit_ppdu_label_size: 0,
            implicit_payload_label_size: 0,
            type_0_alpdu_label_size: 0,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    LabelSizeTooBig { field: &'static str, size: u8 },
    InvalidImplicitPtype { code: u8 },
    NoAlpduTrailerAllowed,
    ExplicitHeaderMapNotSupported,
}

impl Config {
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.implicit_ppdu_label_size > LABEL_SIZE_MAX {
            return Err(ConfigError::LabelSizeTooBig {
                field: "implicit_ppdu_label_size",
                size: self.implicit_ppdu_label_size,
            });
        }
        if self.implicit_payload_label_size > LABEL_SIZE_MAX {
            return Err(ConfigError::LabelSizeTooBig {
                field: "implicit_payload_label_size",
                size: self.implicit_payload_label_size,
            });
        }
        if self.type_0_alpdu_label_size > LABEL_SIZE_MAX {
            return Err(ConfigError::LabelSizeTooBig {
                field: "type_0_alpdu_label_size",
                size: self.type_0_alpdu_label_size,
            });
        }
        if !CompressedPtype::is_valid_implicit(self.implicit_protocol_type) {
            return Err(ConfigError::InvalidImplicitPtype {
                code: self.implicit_protocol_type,
            });
        }
        if !self.allow_alpdu_crc && !self.allow_alpdu_sequence_number {
            return Err(ConfigError::NoAlpduTrailerAllowed);
        }
        if self.use_explicit_payload_header_map {
            return Err(ConfigError::ExplicitHeaderMapNotSupported);
        }
        Ok(())
    }

    /// Trailer selection for fragmented ALPDUs.
    #[must_use]
    #[inline]
    pub fn use_crc_trailer(&self) -> bool {
        self.allow_alpdu_crc
    }
}

/// The four FPDU flavours of the outer MAC layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpduType {
    Logon,
    Control,
    Traffic,
    TrafficControl,
}

pub const LOGON_HEADER_SIZE: usize = 6;
pub const CONTROL_HEADER_SIZE: usize = 3;
pub const TRAFFIC_CONTROL_HEADER_SIZE: usize = 5;

#[derive(Debug)]
pub enum HeaderSizeError {
    /// Traffic FPDU overhead depends on the runtime protocol type and
    /// cannot be answered from the configuration alone.
    NonDeterministic,
    InvalidConfig(ConfigError),
}

/// Fixed header overhead of one FPDU flavour under `conf`.
pub fn header_size(conf: &Config, fpdu_type: FpduType) -> Result<usize, HeaderSizeError> {
    conf.check().map_err(HeaderSizeError::InvalidConfig)?;
    match fpdu_type {
        FpduType::Logon => Ok(LOGON_HEADER_SIZE),
        FpduType::Control => Ok(CONTROL_HEADER_SIZE),
        FpduType::TrafficControl => Ok(TRAFFIC_CONTROL_HEADER_SIZE),
        FpduType::Traffic => Err(HeaderSizeError::NonDeterministic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(Config::default().check().is_ok());
    }

    #[test]
    fn label_size_bounds() {
        let conf = Config {
            implicit_ppdu_label_size: LABEL_SIZE_MAX + 1,
            ..Config::default()
        };
        assert!(matches!(
            conf.check(),
            Err(ConfigError::LabelSizeTooBig {
                field: "implicit_ppdu_label_size",
                size: 16,
            })
        ));
        let conf = Config {
            implicit_payload_label_size: LABEL_SIZE_MAX,
            ..Config::default()
        };
        assert!(conf.check().is_ok());
    }

    #[test]
    fn vlan_without_ptype_is_not_an_implicit_type() {
        let conf = Config {
            implicit_protocol_type: 0x31,
            ..Config::default()
        };
        assert!(matches!(
            conf.check(),
            Err(ConfigError::InvalidImplicitPtype { code: 0x31 })
        ));
    }

    #[test]
    fn undefined_implicit_code() {
        let conf = Config {
            implicit_protocol_type: 0x77,
            ..Config::default()
        };
        assert!(conf.check().is_err());
    }

    #[test]
    fn some_trailer_must_be_allowed() {
        let conf = Config {
            allow_alpdu_crc: false,
            allow_alpdu_sequence_number: false,
            ..Config::default()
        };
        assert!(matches!(conf.check(), Err(ConfigError::NoAlpduTrailerAllowed)));
        let conf = Config {
            allow_alpdu_crc: true,
            allow_alpdu_sequence_number: false,
            ..Config::default()
        };
        assert!(conf.check().is_ok());
    }

    #[test]
    fn explicit_header_map_is_reserved() {
        let conf = Config {
            use_explicit_payload_header_map: true,
            ..Config::default()
        };
        assert!(matches!(
            conf.check(),
            Err(ConfigError::ExplicitHeaderMapNotSupported)
        ));
    }

    #[test]
    fn header_overhead_matrix() {
        let omitted = Config {
            allow_ptype_omission: true,
            implicit_protocol_type: 0x0d,
            ..Config::default()
        };
        let compressed = Config {
            use_compressed_ptype: true,
            ..Config::default()
        };
        let uncompressed = Config::default();
        for conf in [omitted, compressed, uncompressed] {
            assert_eq!(header_size(&conf, FpduType::Logon).unwrap(), 6);
            assert_eq!(header_size(&conf, FpduType::Control).unwrap(), 3);
            assert_eq!(header_size(&conf, FpduType::TrafficControl).unwrap(), 5);
            assert!(matches!(
                header_size(&conf, FpduType::Traffic),
                Err(HeaderSizeError::NonDeterministic)
            ));
        }
    }

    #[test]
    fn header_overhead_rejects_bad_config() {
        let conf = Config {
            implicit_protocol_type: 0x31,
            ..Config::default()
        };
        assert!(matches!(
            header_size(&conf, FpduType::Logon),
            Err(HeaderSizeError::InvalidConfig(_))
        ));
    }
}
