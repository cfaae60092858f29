use num_enum::{IntoPrimitive, TryFromPrimitive};

pub const PTYPE_SIGNAL: u16 = 0x0082;
pub const PTYPE_IPV4: u16 = 0x0800;
pub const PTYPE_ARP: u16 = 0x0806;
pub const PTYPE_VLAN: u16 = 0x8100;
pub const PTYPE_IPV6: u16 = 0x86dd;
pub const PTYPE_QINQ: u16 = 0x88a8;
pub const PTYPE_QINQ_LEGACY: u16 = 0x9100;

/// 8-bit codes standing in for the 16-bit protocol type in compressed ALPDU
/// headers and as the implicit (omitted) default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CompressedPtype {
    Unspecified = 0x00,
    Ipv4 = 0x0d,
    Arp = 0x0e,
    Vlan = 0x0f,
    Ipv6 = 0x11,
    QinQ = 0x19,
    QinQLegacy = 0x1a,
    /// IPv4 or IPv6, decided from the first nibble of the payload.
    Ip = 0x30,
    /// VLAN frame whose embedded protocol-type field was removed; the
    /// receiver rebuilds it from the IP version of the VLAN payload.
    VlanNoPtypeField = 0x31,
    /// L2S signalling, label type 3.
    Signal = 0x42,
    /// Escape code: the 2-byte uncompressed protocol type follows.
    Fallback = 0xff,
}

impl CompressedPtype {
    /// The uncompressed protocol type this code stands for, when it stands
    /// for exactly one.
    pub fn uncompressed(self) -> Option<u16> {
        match self {
            CompressedPtype::Unspecified => Some(0x0000),
            CompressedPtype::Ipv4 => Some(PTYPE_IPV4),
            CompressedPtype::Arp => Some(PTYPE_ARP),
            CompressedPtype::Vlan => Some(PTYPE_VLAN),
            CompressedPtype::Ipv6 => Some(PTYPE_IPV6),
            CompressedPtype::QinQ => Some(PTYPE_QINQ),
            CompressedPtype::QinQLegacy => Some(PTYPE_QINQ_LEGACY),
            CompressedPtype::VlanNoPtypeField => Some(PTYPE_VLAN),
            CompressedPtype::Signal => Some(PTYPE_SIGNAL),
            CompressedPtype::Ip | CompressedPtype::Fallback => None,
        }
    }

    /// Whether `code` may serve as the implicit protocol type of a
    /// configuration. The VLAN-without-ptype-field code only ever appears in
    /// ALPDU headers, and undefined codes have no agreed meaning.
    pub fn is_valid_implicit(code: u8) -> bool {
        match CompressedPtype::try_from(code) {
            Ok(CompressedPtype::VlanNoPtypeField) | Ok(CompressedPtype::Fallback) => false,
            Ok(_) => true,
            Err(_) => false,
        }
    }
}

pub fn compress(protocol_type: u16) -> Option<CompressedPtype> {
    match protocol_type {
        0x0000 => Some(CompressedPtype::Unspecified),
        PTYPE_SIGNAL => Some(CompressedPtype::Signal),
        PTYPE_IPV4 => Some(CompressedPtype::Ipv4),
        PTYPE_ARP => Some(CompressedPtype::Arp),
        PTYPE_VLAN => Some(CompressedPtype::Vlan),
        PTYPE_IPV6 => Some(CompressedPtype::Ipv6),
        PTYPE_QINQ => Some(CompressedPtype::QinQ),
        PTYPE_QINQ_LEGACY => Some(CompressedPtype::QinQLegacy),
        _ => None,
    }
}

/// Whether the protocol-type field may be omitted from the ALPDU header
/// because the receiver can rebuild it from `implicit` alone. L2S is
/// suppressible under any implicit code since the PPDU header marks it with
/// label type 3.
pub fn is_suppressible(protocol_type: u16, implicit: u8) -> bool {
    match protocol_type {
        PTYPE_SIGNAL => true,
        PTYPE_VLAN => implicit == CompressedPtype::Vlan as u8,
        PTYPE_QINQ => implicit == CompressedPtype::QinQ as u8,
        PTYPE_QINQ_LEGACY => implicit == CompressedPtype::QinQLegacy as u8,
        PTYPE_IPV4 => {
            implicit == CompressedPtype::Ipv4 as u8 || implicit == CompressedPtype::Ip as u8
        }
        PTYPE_IPV6 => {
            implicit == CompressedPtype::Ipv6 as u8 || implicit == CompressedPtype::Ip as u8
        }
        PTYPE_ARP => implicit == CompressedPtype::Arp as u8,
        _ => false,
    }
}
