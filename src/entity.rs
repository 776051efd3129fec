use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref ICAO24: Regex = Regex::new(r"^[0-9a-fA-F]{6}$").unwrap();
    static ref REGISTRATION: Regex = Regex::new(r"^[A-Z0-9]{1,3}-?[A-Z0-9]{1,5}$").unwrap();
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EntityError {
    #[error("aircraft identifier is empty")]
    Empty,
    #[error("`{0}` is neither a registration nor an ICAO24 hex address")]
    Malformed(String),
    #[error("`{0}` is not a six digit ICAO24 hex address")]
    NotIcao24(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdKind {
    Registration,
    Icao24,
}

/// One tracked aircraft, either by registration (`ZS-CJI`) or by its
/// 24-bit transponder address (`00b1f3`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    id: String,
    kind: IdKind,
}

fn non_empty(s: &str) -> Result<&str, EntityError> {
    let s = s.trim();
    if s.is_empty() {
        Err(EntityError::Empty)
    } else {
        Ok(s)
    }
}

impl EntityId {
    /// Parse strictly as a registration. `C12345` stays a registration
    /// even though it is also valid hex.
    pub fn registration(s: &str) -> Result<Self, EntityError> {
        let upper = non_empty(s)?.to_ascii_uppercase();
        if REGISTRATION.is_match(&upper) {
            Ok(Self {
                id: upper,
                kind: IdKind::Registration,
            })
        } else {
            Err(EntityError::Malformed(s.trim().to_string()))
        }
    }

    /// Parse strictly as a transponder address, stored lower-case.
    pub fn icao24(s: &str) -> Result<Self, EntityError> {
        let s = non_empty(s)?;
        if ICAO24.is_match(s) {
            Ok(Self {
                id: s.to_ascii_lowercase(),
                kind: IdKind::Icao24,
            })
        } else {
            Err(EntityError::NotIcao24(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    pub fn is_icao24(&self) -> bool {
        self.kind == IdKind::Icao24
    }
}

/// Guesses the kind: six hex characters with at least one digit read as a
/// transponder address, anything else as a registration. Use
/// [`EntityId::registration`] or [`EntityId::icao24`] when the kind is known.
impl FromStr for EntityId {
    type Err = EntityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = non_empty(s)?;
        if ICAO24.is_match(s) && s.chars().any(|c| c.is_ascii_digit()) {
            Self::icao24(s)
        } else {
            Self::registration(s)
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
