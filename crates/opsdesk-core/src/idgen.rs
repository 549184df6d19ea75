//! Local task ID generation: SHA256 over the task content, base36 encoded.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use num_traits::Zero;
use sha2::{Digest, Sha256};

/// Prefix of every locally generated task ID.
pub const TASK_ID_PREFIX: &str = "od";

/// Number of base36 characters after the prefix.
pub const TASK_ID_LENGTH: usize = 6;

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Encodes `data` as a base36 string of exactly `length` characters.
///
/// Shorter encodings are zero padded on the left; longer ones keep the
/// least significant digits.
pub fn encode_base36(data: &[u8], length: usize) -> String {
    let mut num = BigUint::from_bytes_be(data);
    let base = BigUint::from(36u32);

    let mut digits: Vec<char> = Vec::with_capacity(length);
    while !num.is_zero() {
        let rem = (&num % &base).to_u32_digits();
        num /= &base;
        let i = rem.first().copied().unwrap_or(0) as usize;
        digits.push(char::from(BASE36_ALPHABET[i]));
    }
    while digits.len() < length {
        digits.push('0');
    }
    digits.truncate(length);
    digits.iter().rev().collect()
}

/// Creates the local ID for a task.
///
/// The ID is derived from the task name, its external engine ID and the
/// creation time. `nonce` is bumped by the caller on collision.
pub fn generate_task_id(
    name: &str,
    external_id: Option<&str>,
    created_at: DateTime<Utc>,
    nonce: u32,
) -> String {
    let content = format!(
        "{}|{}|{}|{}",
        name,
        external_id.unwrap_or(""),
        created_at.timestamp_nanos_opt().unwrap_or(0),
        nonce
    );
    let hash = Sha256::digest(content.as_bytes());
    // 4 bytes = 32 bits, a little over 6 base36 characters.
    format!(
        "{}-{}",
        TASK_ID_PREFIX,
        encode_base36(&hash[..4], TASK_ID_LENGTH)
    )
}
