//! Table codes, GM secrets, and deterministic player ids.
//!
//! Table ids are short human-shareable codes (read over voice chat, typed on
//! a phone), so they use uppercase base-36. GM codes are longer and lowercase
//! so the two are visually distinct. Player ids are *derived*, not generated:
//! the same display name on the same table always maps to the same id, which
//! makes joins idempotent across reconnects.

use rand::Rng;

/// Length of a table code (6 chars of base-36 ≈ 2.2 billion combinations).
pub const TABLE_CODE_LEN: usize = 6;

/// Length of a GM secret code.
pub const GM_CODE_LEN: usize = 8;

const BASE36_UPPER: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const BASE36_LOWER: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a new table code.
///
/// Collisions are probabilistically negligible but not impossible; the store
/// re-derives on a detected primary-key conflict.
pub fn generate_table_code() -> String {
    random_code(BASE36_UPPER, TABLE_CODE_LEN)
}

/// Generate a new GM secret code.
pub fn generate_gm_code() -> String {
    random_code(BASE36_LOWER, GM_CODE_LEN)
}

/// Derive the player id for a display name on a table.
///
/// Deterministic: reconnecting with the same name resolves to the same
/// player row. Two different people choosing the same display name collide
/// into one identity — documented behavior.
pub fn player_id(name: &str, table_id: &str) -> String {
    format!("{name}-{table_id}")
}

/// The fixed GM identity for a table.
pub fn gm_player_id(table_id: &str) -> String {
    format!("GM-{table_id}")
}

fn random_code(alphabet: &[u8], len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_code_is_uppercase_base36() {
        let code = generate_table_code();
        assert_eq!(code.len(), TABLE_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn gm_code_is_lowercase_base36() {
        let code = generate_gm_code();
        assert_eq!(code.len(), GM_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn codes_vary() {
        let codes: std::collections::HashSet<String> =
            (0..64).map(|_| generate_table_code()).collect();
        // Not a randomness test, just a sanity check against a constant output.
        assert!(codes.len() > 1);
    }

    #[test]
    fn player_id_is_deterministic() {
        assert_eq!(player_id("Alice", "AB12CD"), "Alice-AB12CD");
        assert_eq!(player_id("Alice", "AB12CD"), player_id("Alice", "AB12CD"));
    }

    #[test]
    fn gm_player_id_uses_sentinel() {
        assert_eq!(gm_player_id("AB12CD"), "GM-AB12CD");
    }

    #[test]
    fn same_name_different_tables_do_not_collide() {
        assert_ne!(player_id("Alice", "TABLE1"), player_id("Alice", "TABLE2"));
    }
}
