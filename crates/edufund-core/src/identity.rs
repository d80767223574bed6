//! # Account Identity Newtypes
//!
//! `Npsn` and `Email` are the two natural keys of a school account. Both are
//! unique across the platform, so both are normalized at construction: two
//! spellings of the same address must collide.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Nomor Pokok Sekolah Nasional: the national school identifier.
///
/// Always exactly eight ASCII digits. Surrounding whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Npsn(String);

impl Npsn {
    /// Number of digits in a valid NPSN.
    pub const LEN: usize = 8;

    /// Validate and wrap an NPSN.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.len() != Self::LEN || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidNpsn(raw.as_ref().to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Npsn {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Npsn> for String {
    fn from(value: Npsn) -> Self {
        value.0
    }
}

impl std::fmt::Display for Npsn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A school account email, trimmed and lowercased.
///
/// Validation is structural only (one `@`, non-empty local part, a dot in
/// the domain). Deliverability is never checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let normalized = raw.as_ref().trim().to_ascii_lowercase();
        let invalid = || ValidationError::InvalidEmail(raw.as_ref().to_string());

        let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
        if local.is_empty()
            || domain.contains('@')
            || normalized.chars().any(char::is_whitespace)
            || normalized.len() > 254
        {
            return Err(invalid());
        }
        match domain.rsplit_once('.') {
            Some((host, tld)) if !host.is_empty() && !tld.is_empty() => {}
            _ => return Err(invalid()),
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npsn_accepts_eight_digits() {
        let npsn = Npsn::new("20100123").unwrap();
        assert_eq!(npsn.as_str(), "20100123");
    }

    #[test]
    fn npsn_trims_whitespace() {
        assert_eq!(Npsn::new(" 20100123 ").unwrap().as_str(), "20100123");
    }

    #[test]
    fn npsn_rejects_wrong_length() {
        assert!(Npsn::new("2010012").is_err());
        assert!(Npsn::new("201001234").is_err());
        assert!(Npsn::new("").is_err());
    }

    #[test]
    fn npsn_rejects_non_digits() {
        assert!(matches!(
            Npsn::new("2010012a"),
            Err(ValidationError::InvalidNpsn(_))
        ));
        // Full-width digits are not ASCII.
        assert!(Npsn::new("２０１００１２３").is_err());
    }

    #[test]
    fn npsn_deserialize_validates() {
        let ok: Npsn = serde_json::from_str("\"12345678\"").unwrap();
        assert_eq!(ok.to_string(), "12345678");
        assert!(serde_json::from_str::<Npsn>("\"1234\"").is_err());
    }

    #[test]
    fn email_is_normalized() {
        let email = Email::new("  Admin@SDN1.sch.ID ").unwrap();
        assert_eq!(email.as_str(), "admin@sdn1.sch.id");
    }

    #[test]
    fn email_rejects_malformed() {
        for bad in ["", "no-at-sign", "@example.com", "a@b", "a@@b.com", "a b@c.com", "a@.com"] {
            assert!(Email::new(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn email_serializes_as_plain_string() {
        let email = Email::new("kepala@sekolah.id").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"kepala@sekolah.id\"");
    }
}
