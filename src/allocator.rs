use crate::domain::SchemeType;
use crate::error::LedgerError;

/// How the sequence part of a new member id is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberIdPolicy {
    /// Number of members currently stored for the scheme, plus one. Two
    /// concurrent creators, or a delete followed by a create, can end up with
    /// the same id.
    Count,
    /// Persisted per-scheme counter, incremented atomically by the backend.
    #[default]
    Sequence,
}

impl std::str::FromStr for MemberIdPolicy {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(MemberIdPolicy::Count),
            "sequence" => Ok(MemberIdPolicy::Sequence),
            _ => Err(LedgerError::validation("member_id_policy", format!("unknown policy {s:?}"))),
        }
    }
}

/// `allocate(Khss, 2)` is `KHSS-003`.
pub fn allocate(scheme: SchemeType, existing_count: u32) -> String {
    format_id(scheme, existing_count.saturating_add(1))
}

pub fn format_id(scheme: SchemeType, sequence: u32) -> String {
    format!("{}-{:03}", scheme.prefix(), sequence)
}

/// Sequence number of an id issued for `scheme`, if it is one.
pub fn parse_sequence(scheme: SchemeType, id: &str) -> Option<u32> {
    id.strip_prefix(scheme.prefix())?
        .strip_prefix('-')?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate() {
        assert_eq!(allocate(SchemeType::Khss, 0), "KHSS-001");
        assert_eq!(allocate(SchemeType::Khss, 2), "KHSS-003");
        assert_eq!(allocate(SchemeType::Dss, 41), "DSS-042");
        assert_eq!(allocate(SchemeType::Finance, 998), "FIN-999");
        assert_eq!(allocate(SchemeType::Finance, 999), "FIN-1000");
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(parse_sequence(SchemeType::Khss, "KHSS-007"), Some(7));
        assert_eq!(parse_sequence(SchemeType::Finance, "FIN-1000"), Some(1000));
        assert_eq!(parse_sequence(SchemeType::Dss, "KHSS-007"), None);
        assert_eq!(parse_sequence(SchemeType::Dss, "DSS007"), None);
        assert_eq!(parse_sequence(SchemeType::Dss, "DSS-x"), None);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("COUNT".parse::<MemberIdPolicy>().unwrap(), MemberIdPolicy::Count);
        assert_eq!("sequence".parse::<MemberIdPolicy>().unwrap(), MemberIdPolicy::Sequence);
        assert!("random".parse::<MemberIdPolicy>().is_err());
    }
}
