//! Unit echelon: the organizational rank of a unit.
//!
//! Echelons form a strict ordering (team < squad < ... < army) used to sanity
//! check the hierarchy. Task forces are synthetic nodes that sit outside the
//! ordering, and unknown echelons are never checked.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// The organizational rank of a unit.
///
/// Stored and serialized as the short code (`TM`, `SQD`, `BN`, ...), matching
/// the codes used in official unit data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Echelon {
    /// Team (`TM`).
    #[serde(rename = "TM")]
    Team,
    /// Squad (`SQD`).
    #[serde(rename = "SQD")]
    Squad,
    /// Section (`SEC`).
    #[serde(rename = "SEC")]
    Section,
    /// Platoon (`PLT`).
    #[serde(rename = "PLT")]
    Platoon,
    /// Detachment (`DET`).
    #[serde(rename = "DET")]
    Detachment,
    /// Company (`CO`). A troop is stored as a company.
    #[serde(rename = "CO")]
    Company,
    /// Battalion (`BN`). A squadron is stored as a battalion.
    #[serde(rename = "BN")]
    Battalion,
    /// Brigade (`BDE`).
    #[serde(rename = "BDE")]
    Brigade,
    /// Division (`DIV`).
    #[serde(rename = "DIV")]
    Division,
    /// Corps (`CORPS`).
    #[serde(rename = "CORPS")]
    Corps,
    /// Army (`ARMY`).
    #[serde(rename = "ARMY")]
    Army,
    /// Task force (`TF`): a synthetic node outside the echelon ordering.
    #[serde(rename = "TF")]
    TaskForce,
    /// Unknown (`UNK`): for echelons not in this list.
    #[serde(rename = "UNK")]
    Unknown,
}

impl Echelon {
    /// All echelons, in rank order (ranked echelons first).
    pub const ALL: [Self; 13] = [
        Self::Team,
        Self::Squad,
        Self::Section,
        Self::Platoon,
        Self::Detachment,
        Self::Company,
        Self::Battalion,
        Self::Brigade,
        Self::Division,
        Self::Corps,
        Self::Army,
        Self::TaskForce,
        Self::Unknown,
    ];

    /// The position of this echelon in the strict ordering, lowest first.
    ///
    /// Returns `None` for [`Echelon::TaskForce`] and [`Echelon::Unknown`],
    /// which sit outside the ordering.
    #[must_use]
    pub const fn rank(self) -> Option<u8> {
        match self {
            Self::Team => Some(0),
            Self::Squad => Some(1),
            Self::Section => Some(2),
            Self::Platoon => Some(3),
            Self::Detachment => Some(4),
            Self::Company => Some(5),
            Self::Battalion => Some(6),
            Self::Brigade => Some(7),
            Self::Division => Some(8),
            Self::Corps => Some(9),
            Self::Army => Some(10),
            Self::TaskForce | Self::Unknown => None,
        }
    }

    /// Whether this echelon participates in the strict ordering.
    #[must_use]
    pub const fn is_ranked(self) -> bool {
        self.rank().is_some()
    }

    /// Whether a unit of this echelon may sit directly under a unit of
    /// `parent` echelon.
    ///
    /// Ranked echelons must be strictly below their parent's rank. Pairs
    /// involving a task force or an unknown echelon are always permitted.
    #[must_use]
    pub const fn may_subordinate_to(self, parent: Self) -> bool {
        match (self.rank(), parent.rank()) {
            (Some(child), Some(parent)) => child < parent,
            _ => true,
        }
    }

    /// The short code used on the wire and in unit files.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Team => "TM",
            Self::Squad => "SQD",
            Self::Section => "SEC",
            Self::Platoon => "PLT",
            Self::Detachment => "DET",
            Self::Company => "CO",
            Self::Battalion => "BN",
            Self::Brigade => "BDE",
            Self::Division => "DIV",
            Self::Corps => "CORPS",
            Self::Army => "ARMY",
            Self::TaskForce => "TF",
            Self::Unknown => "UNK",
        }
    }

    /// The long human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Team => "Team",
            Self::Squad => "Squad",
            Self::Section => "Section",
            Self::Platoon => "Platoon",
            Self::Detachment => "Detachment",
            Self::Company => "Company",
            Self::Battalion => "Battalion",
            Self::Brigade => "Brigade",
            Self::Division => "Division",
            Self::Corps => "Corps",
            Self::Army => "Army",
            Self::TaskForce => "Task Force",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Echelon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Echelon {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|echelon| echelon.code() == upper)
            .ok_or_else(|| ParseError(s.to_string()))
    }
}

/// Error returned when a string is not a recognized echelon code.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unrecognized echelon code '{0}'")]
pub struct ParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip() {
        for echelon in Echelon::ALL {
            let parsed: Echelon = echelon.code().parse().unwrap();
            assert_eq!(parsed, echelon);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("bn".parse::<Echelon>().unwrap(), Echelon::Battalion);
        assert_eq!("Plt".parse::<Echelon>().unwrap(), Echelon::Platoon);
    }

    #[test]
    fn parse_unrecognized_fails() {
        assert!("BATTALION".parse::<Echelon>().is_err());
    }

    #[test]
    fn ranks_are_strictly_increasing() {
        let ranked: Vec<_> = Echelon::ALL
            .into_iter()
            .filter_map(Echelon::rank)
            .collect();
        assert!(ranked.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn company_subordinates_to_battalion() {
        assert!(Echelon::Company.may_subordinate_to(Echelon::Battalion));
        assert!(!Echelon::Battalion.may_subordinate_to(Echelon::Company));
        assert!(!Echelon::Company.may_subordinate_to(Echelon::Company));
    }

    #[test]
    fn task_force_is_exempt_from_ordering() {
        assert!(!Echelon::TaskForce.is_ranked());
        assert!(Echelon::Battalion.may_subordinate_to(Echelon::TaskForce));
        assert!(Echelon::TaskForce.may_subordinate_to(Echelon::Team));
    }

    #[test]
    fn yaml_serialization_uses_codes() {
        let yaml = serde_yaml::to_string(&Echelon::Battalion).unwrap();
        assert_eq!(yaml.trim(), "BN");

        let parsed: Echelon = serde_yaml::from_str("CORPS").unwrap();
        assert_eq!(parsed, Echelon::Corps);
    }
}
