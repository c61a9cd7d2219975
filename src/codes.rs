//! License code and claim number generation.
//!
//! Neither generator guarantees uniqueness by construction; the unique
//! indexes on `licenses.code` and `support_claims.claim_number` are the
//! enforcement point, and insertion sites retry with a fresh value on
//! collision.

use chrono::Utc;
use rand::Rng;

/// Restricted alphabet for license codes. Excludes 0/O and 1/I.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const CODE_SYMBOLS: usize = 16;
const CODE_BLOCK_LEN: usize = 4;

pub const CLAIM_NUMBER_PREFIX: &str = "SUP";

/// Generate a license code: 16 symbols in dash-separated blocks of 4,
/// e.g. `K7XM-P2QA-9RWD-HB4N`.
pub fn generate_license_code() -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(CODE_SYMBOLS + CODE_SYMBOLS / CODE_BLOCK_LEN - 1);

    for i in 0..CODE_SYMBOLS {
        if i > 0 && i % CODE_BLOCK_LEN == 0 {
            code.push('-');
        }
        let idx = rng.gen_range(0..CODE_ALPHABET.len());
        code.push(CODE_ALPHABET[idx] as char);
    }

    code
}

/// Generate a claim number: `SUP-<YYYYMMDD>-<4-digit-random>`.
pub fn generate_claim_number() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{}-{}-{:04}", CLAIM_NUMBER_PREFIX, date, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn license_code_shape() {
        let code = generate_license_code();
        assert_eq!(code.len(), 19);

        let blocks: Vec<&str> = code.split('-').collect();
        assert_eq!(blocks.len(), 4);
        for block in blocks {
            assert_eq!(block.len(), 4);
        }
    }

    #[test]
    fn license_code_avoids_ambiguous_symbols() {
        for _ in 0..50 {
            let code = generate_license_code();
            for c in code.chars().filter(|c| *c != '-') {
                assert!(c.is_ascii_uppercase() || c.is_ascii_digit());
                assert!(!matches!(c, '0' | 'O' | '1' | 'I'), "ambiguous symbol in {}", code);
            }
        }
    }

    #[test]
    fn claim_number_shape() {
        let number = generate_claim_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "SUP");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }
}
