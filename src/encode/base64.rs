//! RFC 4648 Base64 with the standard alphabet and `=` padding.

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const PAD: char = '=';

/// Encode `bytes` as padded Base64.
///
/// Every 3 input bytes become 4 symbols. A trailing group of 1 byte becomes
/// 2 symbols and `==`, a trailing group of 2 bytes becomes 3 symbols and `=`.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(encoded_len(bytes.len()));
    let mut chunks = bytes.chunks_exact(3);
    for c in &mut chunks {
        let n = (c[0] as u32) << 16 | (c[1] as u32) << 8 | c[2] as u32;
        out.push(symbol(n >> 18));
        out.push(symbol(n >> 12));
        out.push(symbol(n >> 6));
        out.push(symbol(n));
    }
    match *chunks.remainder() {
        [a] => {
            let n = (a as u32) << 16;
            out.push(symbol(n >> 18));
            out.push(symbol(n >> 12));
            out.push(PAD);
            out.push(PAD);
        }
        [a, b] => {
            let n = (a as u32) << 16 | (b as u32) << 8;
            out.push(symbol(n >> 18));
            out.push(symbol(n >> 12));
            out.push(symbol(n >> 6));
            out.push(PAD);
        }
        _ => {}
    }
    out
}

/// Length of the padded encoding of `n` bytes
pub fn encoded_len(n: usize) -> usize {
    n.div_ceil(3) * 4
}

#[inline]
fn symbol(sextet: u32) -> char {
    ALPHABET[(sextet & 0x3F) as usize] as char
}
