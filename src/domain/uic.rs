use std::{fmt, ops::Deref, str::FromStr};

/// Maximum length of a UIC.
///
/// Real-world codes are at most nine characters; generated task-force codes
/// stay well inside this.
pub const MAX_LEN: usize = 9;

/// Prefix used for generated task-force UICs.
const TASK_FORCE_PREFIX: &str = "TF";

/// A validated Unit Identification Code.
///
/// Format: 1 to 9 ASCII alphanumeric characters, stored uppercase. The UIC is
/// the primary, perpetually stable identity of a unit; there is no surrogate
/// key.
///
/// Examples: `WAGGAA`, `WABCB0`, `TF0001`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uic(String);

impl Uic {
    /// Creates a new UIC from a string, normalizing to uppercase.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is empty, longer than [`MAX_LEN`]
    /// characters, or contains a character that is not ASCII alphanumeric.
    pub fn new(s: String) -> Result<Self, Error> {
        if s.is_empty() {
            return Err(Error::Empty);
        }
        if s.len() > MAX_LEN {
            return Err(Error::TooLong(s));
        }
        if let Some(c) = s.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(Error::BadCharacter(s.clone(), c));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Constructs a generated task-force UIC: `TF` followed by the serial
    /// padded to `digits` with leading zeros.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooLong`] if the padded serial does not fit within
    /// [`MAX_LEN`] characters.
    pub fn task_force(serial: u32, digits: usize) -> Result<Self, Error> {
        let code = format!("{TASK_FORCE_PREFIX}{serial:0digits$}");
        if code.len() > MAX_LEN {
            return Err(Error::TooLong(code));
        }
        Ok(Self(code))
    }

    /// Whether this is a generated task-force code.
    #[must_use]
    pub fn is_task_force(&self) -> bool {
        self.0.starts_with(TASK_FORCE_PREFIX)
            && self.0[TASK_FORCE_PREFIX.len()..]
                .chars()
                .all(|c| c.is_ascii_digit())
            && self.0.len() > TASK_FORCE_PREFIX.len()
    }

    /// The numeric serial of a generated task-force code, if this is one.
    #[must_use]
    pub fn task_force_serial(&self) -> Option<u32> {
        if !self.is_task_force() {
            return None;
        }
        self.0[TASK_FORCE_PREFIX.len()..].parse().ok()
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Uic {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Uic {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl FromStr for Uic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl From<Uic> for String {
    fn from(uic: Uic) -> Self {
        uic.0
    }
}

impl AsRef<str> for Uic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for Uic {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Uic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur when parsing or constructing a UIC.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The UIC string was empty.
    #[error("UIC must not be empty")]
    Empty,

    /// The UIC string exceeded [`MAX_LEN`] characters.
    #[error("UIC '{0}' is longer than {MAX_LEN} characters")]
    TooLong(String),

    /// The UIC contained a character that is not ASCII alphanumeric.
    #[error("UIC '{0}' contains invalid character '{1}'")]
    BadCharacter(String, char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_codes() {
        let uic = Uic::new("WAGGAA".to_string()).unwrap();
        assert_eq!(uic.as_str(), "WAGGAA");

        let uic = Uic::new("W1".to_string()).unwrap();
        assert_eq!(uic.as_str(), "W1");

        // Maximum length is allowed.
        assert!(Uic::new("A12345678".to_string()).is_ok());
    }

    #[test]
    fn normalizes_to_uppercase() {
        let uic = Uic::new("wagga0".to_string()).unwrap();
        assert_eq!(uic.as_str(), "WAGGA0");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(Uic::new(String::new()), Err(Error::Empty));
    }

    #[test]
    fn rejects_too_long() {
        let result = Uic::new("A123456789".to_string());
        assert!(matches!(result, Err(Error::TooLong(_))));
    }

    #[test]
    fn rejects_bad_characters() {
        let result = Uic::new("WA GG".to_string());
        assert!(matches!(result, Err(Error::BadCharacter(_, ' '))));

        let result = Uic::new("WA-GG".to_string());
        assert!(matches!(result, Err(Error::BadCharacter(_, '-'))));
    }

    #[test]
    fn task_force_codes_are_padded() {
        let uic = Uic::task_force(7, 4).unwrap();
        assert_eq!(uic.as_str(), "TF0007");
        assert!(uic.is_task_force());
        assert_eq!(uic.task_force_serial(), Some(7));
    }

    #[test]
    fn task_force_serial_too_wide_fails() {
        assert!(matches!(Uic::task_force(1, 8), Err(Error::TooLong(_))));
    }

    #[test]
    fn real_codes_are_not_task_forces() {
        let uic = Uic::new("TFABC".to_string()).unwrap();
        assert!(!uic.is_task_force());
        assert_eq!(uic.task_force_serial(), None);

        let uic = Uic::new("WAGGAA".to_string()).unwrap();
        assert!(!uic.is_task_force());
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = Uic::new("AAA".to_string()).unwrap();
        let b = Uic::new("AAB".to_string()).unwrap();
        assert!(a < b);
    }

    #[test]
    fn roundtrip_display_parse() {
        let original = Uic::new("WABC01".to_string()).unwrap();
        let parsed: Uic = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn error_display() {
        let error = Uic::new("WA GG".to_string()).unwrap_err();
        assert_eq!(
            format!("{error}"),
            "UIC 'WA GG' contains invalid character ' '"
        );
    }
}
