//! Batch codes: `{courseCode}{branchCode}{serial}{year}`, e.g. `GTKR0325`.
//!
//! The serial is per `(branch, category)` and read back from existing codes
//! at offset 4..6. Codes that do not have the 8-character shape are ignored.

use chrono::{Datelike, NaiveDate};

use crate::domain::error::DomainError;

pub const CODE_LEN: usize = 8;
pub const MAX_SERIAL: u32 = 99;

/// Upper-cases and checks a two-letter course or branch code.
pub fn normalize_code(field: &str, raw: &str) -> Result<String, DomainError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(DomainError::validation(
            field,
            format!("must be exactly two letters, got '{raw}'"),
        ));
    }
    Ok(code)
}

/// Serial of a well-formed batch code, `None` for anything else.
pub fn parse_serial(code: &str) -> Option<u32> {
    let b = code.as_bytes();
    if b.len() != CODE_LEN
        || !b[..4].iter().all(u8::is_ascii_uppercase)
        || !b[4..].iter().all(u8::is_ascii_digit)
    {
        return None;
    }
    code[4..6].parse().ok()
}

/// One past the highest serial among `existing`; 1 for an empty scope.
pub fn next_serial<'a, I>(existing: I) -> Option<u32>
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(|code| {
            let serial = parse_serial(code);
            if serial.is_none() {
                tracing::debug!(code, "skipping malformed batch code");
            }
            serial
        })
        .max()
        .unwrap_or(0);
    let next = max + 1;
    (next <= MAX_SERIAL).then_some(next)
}

pub fn format_code(course_code: &str, branch_code: &str, serial: u32, start_date: NaiveDate) -> String {
    format!(
        "{course_code}{branch_code}{serial:02}{:02}",
        start_date.year().rem_euclid(100)
    )
}

/// Whether `code` would clash with codes generated for this course, branch
/// and start year, whatever category it was issued under.
pub fn same_family(code: &str, course_code: &str, branch_code: &str, start_date: NaiveDate) -> bool {
    parse_serial(code).is_some()
        && code[..2] == *course_code
        && code[2..4] == *branch_code
        && code[6..] == format!("{:02}", start_date.year().rem_euclid(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 6, 1).unwrap()
    }

    fn is_batch_code(code: &str) -> bool {
        parse_serial(code).is_some()
    }

    #[test]
    fn first_code_in_scope() {
        let serial = next_serial(std::iter::empty()).unwrap();
        let code = format_code("GT", "KR", serial, date(2025));
        assert_eq!(code, "GTKR0125");
        assert!(is_batch_code(&code));
    }

    #[test]
    fn serial_follows_highest_existing() {
        let existing = ["GTKR0125", "PNKR0724", "GTKR0325"];
        assert_eq!(next_serial(existing), Some(8));
    }

    #[test]
    fn malformed_codes_are_ignored() {
        let existing = ["legacy", "GTKR1", "GTKRAB25", "gtkr0925", "GTKR0225"];
        assert_eq!(next_serial(existing), Some(3));
    }

    #[test]
    fn exhausted_scope_has_no_next_serial() {
        assert_eq!(next_serial(["GTKR9925"]), None);
        assert_eq!(next_serial(["GTKR9825"]), Some(99));
    }

    #[test]
    fn year_uses_last_two_digits() {
        assert_eq!(format_code("DN", "BL", 12, date(2009)), "DNBL1209");
        assert_eq!(format_code("DN", "BL", 1, date(2100)), "DNBL0100");
    }

    #[test]
    fn family_matches_prefix_and_year_only() {
        assert!(same_family("GTKR0425", "GT", "KR", date(2025)));
        assert!(!same_family("GTKR0424", "GT", "KR", date(2025)));
        assert!(!same_family("PNKR0425", "GT", "KR", date(2025)));
        assert!(!same_family("GTBL0425", "GT", "KR", date(2025)));
        assert!(!same_family("legacy", "GT", "KR", date(2025)));
    }

    #[test]
    fn codes_are_normalized() {
        assert_eq!(normalize_code("code", " kr ").unwrap(), "KR");
        assert!(normalize_code("code", "K").is_err());
        assert!(normalize_code("code", "K1").is_err());
        assert!(normalize_code("code", "KRA").is_err());
        assert!(normalize_code("code", "ÄB").is_err());
    }
}
