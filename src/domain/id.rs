use crate::app::{BrookError, Result};

pub type FeedId = u32;
pub type EntryId = u32;

/// Parses a feed or entry id: ASCII decimal in `1..=u32::MAX`.
pub fn parse_id(s: &str) -> Result<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BrookError::InvalidId(s.to_string()));
    }
    match s.parse::<u32>() {
        Ok(0) | Err(_) => Err(BrookError::InvalidId(s.to_string())),
        Ok(id) => Ok(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_ids() {
        assert_eq!(parse_id("1").unwrap(), 1);
        assert_eq!(parse_id("0042").unwrap(), 42);
        assert_eq!(parse_id("4294967295").unwrap(), u32::MAX);
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        for bad in ["", "0", "-1", "+1", "1.5", "abc", " 7", "4294967296", "99999999999999999999"] {
            let err = parse_id(bad).unwrap_err();
            assert!(matches!(err, BrookError::InvalidId(_)), "{bad:?} gave {err}");
        }
    }
}
