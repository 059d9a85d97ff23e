// Seed derivation
//
// Every instant inside the same slot maps to the same seed, so a shop is
// stable for the length of its slot.

use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use sha2::{Digest, Sha256};

/// Start of the `slot_minutes` slot containing `now`
///
/// Slots are aligned to the top of the hour, so `slot_minutes` should divide 60.
pub fn slot_start(now: DateTime<Utc>, slot_minutes: u32) -> DateTime<Utc> {
    let slot_minutes = slot_minutes.max(1);
    let truncated = now
        .duration_trunc(Duration::minutes(1))
        .unwrap_or(now);
    let offset = truncated.minute() % slot_minutes;
    truncated - Duration::minutes(offset as i64)
}

/// Seed for a given secret and slot
///
/// SHA-256 over `"{secret}:{YYYY-MM-DDTHH:MM}"`, reduced modulo 2^32, i.e. the
/// last four digest bytes read big-endian.
pub fn derive_seed(secret_key: &str, slot: DateTime<Utc>) -> u32 {
    let material = format!("{}:{}", secret_key, slot.format("%Y-%m-%dT%H:%M"));
    let digest = Sha256::digest(material.as_bytes());
    let tail: [u8; 4] = [digest[28], digest[29], digest[30], digest[31]];
    u32::from_be_bytes(tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_slot_start_rounds_down() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 38, 59).unwrap();
        let slot = slot_start(now, 5);
        assert_eq!(slot, Utc.with_ymd_and_hms(2025, 6, 1, 10, 35, 0).unwrap());
    }

    #[test]
    fn test_slot_start_on_boundary() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 40, 0).unwrap();
        assert_eq!(slot_start(now, 5), now);
    }

    #[test]
    fn test_slot_start_drops_subseconds() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 59).unwrap()
            + Duration::milliseconds(999);
        assert_eq!(
            slot_start(now, 5),
            Utc.with_ymd_and_hms(2025, 6, 1, 23, 55, 0).unwrap()
        );
    }

    #[test]
    fn test_zero_slot_minutes_means_one() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 38, 20).unwrap();
        assert_eq!(
            slot_start(now, 0),
            Utc.with_ymd_and_hms(2025, 6, 1, 10, 38, 0).unwrap()
        );
    }

    #[test]
    fn test_seed_matches_modulo_of_full_digest() {
        let slot = Utc.with_ymd_and_hms(2025, 6, 1, 10, 35, 0).unwrap();
        let digest = Sha256::digest(b"secret:2025-06-01T10:35");
        let hex = hex::encode(digest);
        // The digest as a big integer mod 2^32 is its last 8 hex digits
        let expected = u32::from_str_radix(&hex[56..], 16).unwrap();
        assert_eq!(derive_seed("secret", slot), expected);
    }

    #[test]
    fn test_seed_depends_on_secret_and_slot() {
        let slot = Utc.with_ymd_and_hms(2025, 6, 1, 10, 35, 0).unwrap();
        let next = slot + Duration::minutes(5);
        assert_ne!(derive_seed("a", slot), derive_seed("b", slot));
        assert_ne!(derive_seed("a", slot), derive_seed("a", next));
        assert_eq!(derive_seed("a", slot), derive_seed("a", slot));
    }
}
