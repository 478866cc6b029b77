//! TSID Generator
//!
//! Time-sorted identifiers rendered as 13-character Crockford Base32 strings.
//! Every document `_id` in the platform is one of these.

use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Crockford Base32 alphabet (excludes I, L, O, U)
const ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

const TSID_LEN: usize = 13;

static COUNTER: AtomicU16 = AtomicU16::new(0);

pub struct TsidGenerator;

impl TsidGenerator {
    /// Generate a new TSID, e.g. `"0HZXEQ5Y8JY5Z"`.
    ///
    /// Layout (64 bits): 42 bits of milliseconds since epoch, 10 random bits,
    /// 12 counter bits.
    pub fn generate() -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let counter = COUNTER.fetch_add(1, Ordering::SeqCst) as u64;
        let random = rand::random::<u16>() as u64 & 0x3FF;

        let tsid = ((now & 0x3FF_FFFF_FFFF) << 22) | (random << 12) | (counter & 0xFFF);

        encode_crockford(tsid)
    }

    /// Whether `value` is a well-formed TSID. Used to drop malformed reference
    /// ids from filters before they reach the store.
    pub fn is_valid(value: &str) -> bool {
        decode_crockford(value).is_some()
    }
}

fn encode_crockford(mut value: u64) -> String {
    let mut result = [b'0'; TSID_LEN];

    for slot in result.iter_mut().rev() {
        *slot = ALPHABET[(value & 0x1F) as usize];
        value >>= 5;
    }

    result.iter().map(|b| *b as char).collect()
}

fn decode_crockford(s: &str) -> Option<u64> {
    if s.len() != TSID_LEN {
        return None;
    }

    let mut result: u64 = 0;
    for (i, c) in s.chars().enumerate() {
        let c = c.to_ascii_uppercase();
        let val = match c {
            '0'..='9' => c as u64 - '0' as u64,
            'A'..='H' => c as u64 - 'A' as u64 + 10,
            'J'..='K' => c as u64 - 'J' as u64 + 18,
            'M'..='N' => c as u64 - 'M' as u64 + 20,
            'P'..='T' => c as u64 - 'P' as u64 + 22,
            'V'..='Z' => c as u64 - 'V' as u64 + 27,
            _ => return None,
        };
        // 13 symbols carry 65 bits; the leading one only has four
        if i == 0 && val > 0xF {
            return None;
        }
        result = (result << 5) | val;
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_tsid() {
        let id = TsidGenerator::generate();
        assert_eq!(id.len(), 13);
        assert!(TsidGenerator::is_valid(&id));
    }

    #[test]
    fn test_uniqueness() {
        let mut ids = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(ids.insert(TsidGenerator::generate()), "Duplicate TSID generated");
        }
    }

    #[test]
    fn test_sortability() {
        let id1 = TsidGenerator::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = TsidGenerator::generate();
        assert!(id1 < id2, "TSIDs should be lexicographically sortable");
    }

    #[test]
    fn test_malformed_ids_rejected() {
        assert!(!TsidGenerator::is_valid(""));
        assert!(!TsidGenerator::is_valid("not-an-id"));
        assert!(!TsidGenerator::is_valid("0HZXEQ5Y8JY5"));
        assert!(!TsidGenerator::is_valid("0HZXEQ5Y8JY5U"));
        assert!(!TsidGenerator::is_valid("507f1f77bcf86cd799439011"));
        assert!(TsidGenerator::is_valid("0hzxeq5y8jy5z"));
        assert!(!TsidGenerator::is_valid("ZZZZZZZZZZZZZ"));
    }
}
