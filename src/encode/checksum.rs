//! CRC-32 (PNG chunks) and Adler-32 (zlib stream) checksums.

/// Reflected CRC-32 polynomial used by PNG and zlib
const CRC32_POLY: u32 = 0xEDB8_8320;

/// Largest prime below 2^16
const ADLER_BASE: u32 = 65521;

/// Largest n such that 255n(n+1)/2 + (n+1)(BASE-1) <= 2^32-1
const ADLER_NMAX: usize = 5552;

const fn make_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { CRC32_POLY ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

static CRC_TABLE: [u32; 256] = make_crc_table();

/// Table-driven CRC-32 of `bytes`
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &b in bytes {
        crc = CRC_TABLE[((crc ^ b as u32) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc ^ 0xFFFF_FFFF
}

/// Running Adler-32 that defers the modulo for up to `NMAX` bytes.
#[derive(Debug, Clone, Copy)]
pub struct Adler32 {
    s1: u32,
    s2: u32,
    pending: usize,
}

impl Adler32 {
    pub fn new() -> Self {
        Self {
            s1: 1,
            s2: 0,
            pending: 0,
        }
    }

    pub fn update(&mut self, byte: u8) {
        self.s1 += byte as u32;
        self.s2 += self.s1;
        self.pending += 1;
        if self.pending == ADLER_NMAX {
            self.s1 %= ADLER_BASE;
            self.s2 %= ADLER_BASE;
            self.pending = 0;
        }
    }

    pub fn update_slice(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.update(b);
        }
    }

    pub fn finish(&self) -> u32 {
        ((self.s2 % ADLER_BASE) << 16) | (self.s1 % ADLER_BASE)
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot Adler-32 of `bytes`
pub fn adler32(bytes: &[u8]) -> u32 {
    let mut a = Adler32::new();
    a.update_slice(bytes);
    a.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_table_known_entries() {
        assert_eq!(CRC_TABLE[0], 0);
        assert_eq!(CRC_TABLE[1], 0x7707_3096);
        assert_eq!(CRC_TABLE[255], 0x2D02_EF8D);
    }

    #[test]
    fn crc32_check_values() {
        assert_eq!(crc32(b""), 0);
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b"IEND"), 0xAE42_6082);
    }

    #[test]
    fn adler32_check_values() {
        assert_eq!(adler32(b""), 1);
        assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
    }

    #[test]
    fn adler32_long_input_matches_naive() {
        let data: Vec<u8> = (0..20_000u32).map(|i| 255 - (i % 7) as u8).collect();
        let mut a: u32 = 1;
        let mut b: u32 = 0;
        for &byte in &data {
            a = (a + byte as u32) % ADLER_BASE;
            b = (b + a) % ADLER_BASE;
        }
        assert_eq!(adler32(&data), (b << 16) | a);
    }
}
