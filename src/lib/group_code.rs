use chrono::{DateTime, Duration, Utc};

use crate::random::RandomSource;

pub const CODE_LENGTH: usize = 6;
/// Groups are discarded this many days after creation.
pub const GROUP_LIFETIME_DAYS: i64 = 30;

// no O/0 or I/1
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub fn generate_group_code<R: RandomSource>(source: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = source.next_below(CODE_ALPHABET.len() as u64) as usize;
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Draws codes until one is free, giving up after `max_attempts`.
pub fn generate_unique_group_code<R, F>(
    source: &mut R,
    is_taken: F,
    max_attempts: usize,
) -> Option<String>
where
    R: RandomSource,
    F: Fn(&str) -> bool,
{
    (0..max_attempts)
        .map(|_| generate_group_code(source))
        .find(|code| !is_taken(code))
}

/// Six upper-case letters or digits.
pub fn is_valid_group_code(code: &str) -> bool {
    code.len() == CODE_LENGTH
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

fn has_triple(chars: &[char]) -> bool {
    chars.windows(3).any(|w| w[0] == w[1] && w[1] == w[2])
}

fn has_sequence(chars: &[char]) -> bool {
    chars.windows(3).any(|w| {
        let [a, b, c] = [w[0], w[1], w[2]].map(|ch| i64::from(u32::from(ch)));
        (b == a + 1 && c == b + 1) || (b == a - 1 && c == b - 1)
    })
}

fn is_uniform(chars: &[char]) -> bool {
    match chars.split_first() {
        Some((first, rest)) => rest.iter().all(|c| c == first),
        None => false,
    }
}

/// `ABABAB` for a period of 2, `ABCABC` for 3. Only six-character codes qualify.
fn is_repeating(chars: &[char], period: usize) -> bool {
    chars.len() == CODE_LENGTH
        && chars
            .iter()
            .enumerate()
            .all(|(i, c)| *c == chars[i % period])
}

/// Codes that are easy to remember: a character three times in a row, a single repeated
/// character, an `ABABAB` or `ABCABC` pattern, or a run like `ABC` / `321`.
pub fn is_memorable_code(code: &str) -> bool {
    let chars: Vec<char> = code.chars().collect();
    has_triple(&chars)
        || is_uniform(&chars)
        || is_repeating(&chars, 2)
        || is_repeating(&chars, 3)
        || has_sequence(&chars)
}

/// Whole days left before a group expires, rounded up and never negative.
pub fn days_until_expiry(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let expiry = created_at + Duration::days(GROUP_LIFETIME_DAYS);
    let remaining_ms = (expiry - now).num_milliseconds();
    if remaining_ms <= 0 {
        return 0;
    }
    (remaining_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

pub fn is_group_expired(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    days_until_expiry(created_at, now) == 0
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::random::SeededRandom;

    use super::{
        days_until_expiry, generate_group_code, generate_unique_group_code, is_group_expired,
        is_memorable_code, is_valid_group_code, CODE_ALPHABET,
    };

    #[test]
    fn generated_codes_are_valid() {
        let mut source = SeededRandom::new(5);
        for _ in 0..200 {
            let code = generate_group_code(&mut source);
            assert!(is_valid_group_code(&code), "{}", code);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn generated_codes_avoid_ambiguous_characters() {
        let mut source = SeededRandom::new(11);
        let codes: String = (0..200).map(|_| generate_group_code(&mut source)).collect();
        assert!(!codes.contains(&['O', '0', 'I', '1'][..]));
    }

    #[test]
    fn same_seed_same_code() {
        let a = generate_group_code(&mut SeededRandom::new(3));
        let b = generate_group_code(&mut SeededRandom::new(3));
        assert_eq!(a, b);
    }

    #[test]
    fn unique_code_skips_taken_codes() {
        let taken = generate_group_code(&mut SeededRandom::new(8));
        let code = generate_unique_group_code(&mut SeededRandom::new(8), |c| c == taken, 10);
        assert!(code.is_some());
        assert_ne!(code.unwrap(), taken);
    }

    #[test]
    fn unique_code_gives_up() {
        let code = generate_unique_group_code(&mut SeededRandom::new(8), |_| true, 10);
        assert_eq!(code, None);
    }

    #[test]
    fn code_validation() {
        assert!(is_valid_group_code("ABC123"));
        assert!(!is_valid_group_code("abc123"));
        assert!(!is_valid_group_code("ABC12"));
        assert!(!is_valid_group_code("ABC-12"));
    }

    #[test]
    fn memorable_codes_are_detected() {
        assert!(is_memorable_code("AAAB7Z"));
        assert!(is_memorable_code("ABABAB"));
        assert!(is_memorable_code("XYZXYZ"));
        assert!(is_memorable_code("K9ABCQ"));
        assert!(is_memorable_code("Q987ZT"));
        assert!(!is_memorable_code("H7K2QM"));
    }

    #[test]
    fn single_repeated_character_is_memorable_at_any_length() {
        assert!(is_memorable_code("AAAAAA"));
        assert!(is_memorable_code("AA"));
        assert!(is_memorable_code("ZZZZ"));
        assert!(is_memorable_code("7"));
        assert!(!is_memorable_code(""));
        assert!(!is_memorable_code("ABAB"));
        assert!(!is_memorable_code("AZ"));
    }

    #[test]
    fn expiry_counts_down_whole_days() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        assert_eq!(days_until_expiry(created, created), 30);
        assert_eq!(days_until_expiry(created, created + Duration::hours(1)), 30);
        assert_eq!(days_until_expiry(created, created + Duration::days(29)), 1);
        assert_eq!(days_until_expiry(created, created + Duration::days(30)), 0);
        assert_eq!(days_until_expiry(created, created + Duration::days(45)), 0);
    }

    #[test]
    fn group_expires_after_thirty_days() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert!(!is_group_expired(created, created + Duration::days(10)));
        assert!(is_group_expired(created, created + Duration::days(31)));
    }
}
