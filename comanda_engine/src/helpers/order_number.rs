use rand::Rng;

use crate::db_types::OrderNumber;

const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draws a fresh candidate order number, `#AAA-NNN` with both groups sampled uniformly from the uppercase
/// alphanumeric alphabet. Uniqueness is the caller's problem: candidates must be checked against storage and
/// regenerated on collision.
pub fn new_order_number() -> OrderNumber {
    let mut rng = rand::thread_rng();
    let mut group = || {
        (0..3).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect::<String>()
    };
    let first = group();
    let second = group();
    OrderNumber::new_unchecked(format!("#{first}-{second}"))
}
