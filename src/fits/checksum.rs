//! FITS CHECKSUM/DATASUM convention: 32-bit ones' complement sums over the
//! big-endian words of an HDU, with the complement of the header+data sum
//! encoded as 16 ASCII characters so the whole HDU sums to negative zero.

/// Sum of an HDU whose CHECKSUM card is valid.
pub const VALID_SUM: u32 = 0xFFFF_FFFF;

/// Placeholder CHECKSUM value while the sum is being computed.
pub const ZERO_CHECKSUM: &str = "0000000000000000";

/// ASCII punctuation the encoded characters must avoid.
const EXCLUDE: [u32; 13] = [
    0x3a, 0x3b, 0x3c, 0x3d, 0x3e, 0x3f, 0x40, 0x5b, 0x5c, 0x5d, 0x5e, 0x5f, 0x60,
];

const OFFSET: u32 = 0x30;

/// Ones' complement sum of `bytes` taken as big-endian 32-bit words.
/// A trailing partial word is zero-padded.
pub fn checksum(bytes: &[u8]) -> u32 {
    let mut hi: u64 = 0;
    let mut lo: u64 = 0;
    for word in bytes.chunks(4) {
        let mut buf = [0u8; 4];
        buf[..word.len()].copy_from_slice(word);
        hi += u64::from(u16::from_be_bytes([buf[0], buf[1]]));
        lo += u64::from(u16::from_be_bytes([buf[2], buf[3]]));
    }

    // Fold the carries of each half into the other
    loop {
        let hi_carry = hi >> 16;
        let lo_carry = lo >> 16;
        if hi_carry == 0 && lo_carry == 0 {
            break;
        }
        hi = (hi & 0xFFFF) + lo_carry;
        lo = (lo & 0xFFFF) + hi_carry;
    }
    ((hi << 16) | lo) as u32
}

/// Ones' complement addition of two partial sums.
pub fn add(a: u32, b: u32) -> u32 {
    let mut sum = u64::from(a) + u64::from(b);
    while sum >> 32 != 0 {
        sum = (sum & 0xFFFF_FFFF) + (sum >> 32);
    }
    sum as u32
}

/// Encode `value` as the 16-character CHECKSUM string.
///
/// Each byte becomes four characters whose offsets from `'0'` add up to it;
/// the result is rotated one place because the value starts at card column 12.
pub fn encode(value: u32) -> String {
    let mut asc = [0u8; 16];
    for i in 0..4 {
        let byte = (value >> ((3 - i) * 8)) & 0xFF;
        let quotient = byte / 4 + OFFSET;
        let remainder = byte % 4;
        let mut ch = [quotient; 4];
        ch[0] += remainder;

        loop {
            let mut adjusted = false;
            for excluded in EXCLUDE {
                for j in (0..4).step_by(2) {
                    if ch[j] == excluded || ch[j + 1] == excluded {
                        ch[j] += 1;
                        ch[j + 1] -= 1;
                        adjusted = true;
                    }
                }
            }
            if !adjusted {
                break;
            }
        }

        for (j, c) in ch.iter().enumerate() {
            asc[4 * j + i] = *c as u8;
        }
    }

    (0..16).map(|i| asc[(i + 15) % 16] as char).collect()
}
