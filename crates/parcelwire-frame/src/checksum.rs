//! 8-bit running XOR checksum.
//!
//! The trailer of every frame is the XOR of its type byte, its length byte and
//! every payload byte, in any grouping.

/// Running checksum accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum(u8);

impl Checksum {
    /// An empty accumulator. XOR-ing the type byte into it seeds it.
    pub fn new() -> Self {
        Self(0)
    }

    /// Fold `bytes` into the accumulator.
    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.0 = bytes.iter().fold(self.0, |acc, b| acc ^ b);
        self
    }

    /// Current value.
    pub fn value(&self) -> u8 {
        self.0
    }
}

/// Checksum of a complete header + payload slice (trailer excluded).
pub fn checksum(bytes: &[u8]) -> u8 {
    Checksum::new().update(bytes).value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_by_first_byte() {
        assert_eq!(checksum(&[0x80]), 0x80);
        assert_eq!(checksum(&[0x80, 0x00]), 0x80);
        assert_eq!(checksum(&[0x02, 0x01, 0x8A]), 0x89);
    }

    #[test]
    fn status_command_is_zero() {
        assert_eq!(checksum(&[0x00, 0x00]), 0x00);
    }

    #[test]
    fn deterministic() {
        let data = b"1ZA807T70336134832";
        assert_eq!(checksum(data), checksum(data));
    }

    #[test]
    fn grouping_does_not_matter() {
        let data: Vec<u8> = (0u8..=200).map(|b| b.wrapping_mul(37)).collect();
        let whole = checksum(&data);

        for split in [1usize, 2, 3, 7, 16, 100, 200] {
            let mut acc = Checksum::new();
            for chunk in data.chunks(split) {
                acc.update(chunk);
            }
            assert_eq!(acc.value(), whole, "chunk size {split}");
        }

        let (a, b) = data.split_at(57);
        assert_eq!(checksum(&[checksum(a), checksum(b)]), whole);
    }

    #[test]
    fn empty_is_identity() {
        assert_eq!(checksum(&[]), 0);
        let mut acc = Checksum::new();
        acc.update(&[]).update(&[0x5A]);
        assert_eq!(acc.value(), 0x5A);
    }
}
