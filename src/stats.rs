/// Per-context traffic counters. The transmitter counts SDUs in, PPDUs out
/// and SDUs fully emitted; the receiver counts reassemblies begun, PPDU
/// bytes in and SDUs delivered. `packets_lost` only moves on the receiver,
/// from sequence-number gaps and dropped remainders.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub packets_in: u64,
    pub packets_out: u64,
    pub packets_ok: u64,
    pub packets_dropped: u64,
    pub packets_lost: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub bytes_ok: u64,
    pub bytes_dropped: u64,
}

impl Stat {
    pub fn merge(&mut self, other: &Stat) {
        self.packets_in += other.packets_in;
        self.packets_out += other.packets_out;
        self.packets_ok += other.packets_ok;
        self.packets_dropped += other.packets_dropped;
        self.packets_lost += other.packets_lost;
        self.bytes_in += other.bytes_in;
        self.bytes_out += other.bytes_out;
        self.bytes_ok += other.bytes_ok;
        self.bytes_dropped += other.bytes_dropped;
    }

    pub fn clear(&mut self) {
        *self = Stat::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums() {
        let mut a = Stat {
            packets_in: 1,
            bytes_in: 10,
            ..Stat::default()
        };
        let b = Stat {
            packets_in: 2,
            packets_lost: 1,
            bytes_in: 5,
            ..Stat::default()
        };
        a.merge(&b);
        assert_eq!(a.packets_in, 3);
        assert_eq!(a.packets_lost, 1);
        assert_eq!(a.bytes_in, 15);
        a.clear();
        assert_eq!(a, Stat::default());
    }
}
