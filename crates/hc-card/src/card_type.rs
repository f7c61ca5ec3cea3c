//! Card families, generations and the resulting card types

use std::fmt;

use crate::error::{CardError, Result};

/// Product family of a health card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardFamily {
    /// Electronic health insurance card (eGK)
    Egk,
    /// Health professional card (HBA)
    Hba,
    /// Security module card type B, issued to institutions (SMC-B)
    Smcb,
}

/// Object system generation of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CardGeneration {
    Unknown,
    G1,
    G1Plus,
    G2,
    /// Generation 2.1
    G21,
}

impl CardGeneration {
    /// Classify a version number of the form major * 10000 + minor * 100 + revision.
    pub fn from_version_number(version: u32) -> Self {
        match version {
            v if v >= 40400 => CardGeneration::G21,
            v if v >= 40000 => CardGeneration::G2,
            v if v >= 30003 => CardGeneration::G1Plus,
            v if v > 0 => CardGeneration::G1,
            _ => CardGeneration::Unknown,
        }
    }

    /// Classify the three byte object system version (major, minor, revision)
    /// as stored in EF.Version2.
    pub fn from_object_system_version(version: &[u8]) -> Result<Self> {
        match version {
            [major, minor, revision] => Ok(Self::from_version_number(
                *major as u32 * 10000 + *minor as u32 * 100 + *revision as u32,
            )),
            other => Err(CardError::InvalidVersionLength(other.len())),
        }
    }
}

/// A card family in one of the supported generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardType {
    Egk2,
    Egk21,
    Hba2,
    Hba21,
    Smcb2,
    Smcb21,
}

impl CardType {
    pub const ALL: [CardType; 6] = [
        CardType::Egk2,
        CardType::Egk21,
        CardType::Hba2,
        CardType::Hba21,
        CardType::Smcb2,
        CardType::Smcb21,
    ];

    /// Combine a family with a generation. Only G2 and G2.1 cards are supported.
    pub fn from_parts(family: CardFamily, generation: CardGeneration) -> Option<Self> {
        match (family, generation) {
            (CardFamily::Egk, CardGeneration::G2) => Some(CardType::Egk2),
            (CardFamily::Egk, CardGeneration::G21) => Some(CardType::Egk21),
            (CardFamily::Hba, CardGeneration::G2) => Some(CardType::Hba2),
            (CardFamily::Hba, CardGeneration::G21) => Some(CardType::Hba21),
            (CardFamily::Smcb, CardGeneration::G2) => Some(CardType::Smcb2),
            (CardFamily::Smcb, CardGeneration::G21) => Some(CardType::Smcb21),
            _ => None,
        }
    }

    pub fn family(&self) -> CardFamily {
        match self {
            CardType::Egk2 | CardType::Egk21 => CardFamily::Egk,
            CardType::Hba2 | CardType::Hba21 => CardFamily::Hba,
            CardType::Smcb2 | CardType::Smcb21 => CardFamily::Smcb,
        }
    }

    pub fn generation(&self) -> CardGeneration {
        match self {
            CardType::Egk2 | CardType::Hba2 | CardType::Smcb2 => CardGeneration::G2,
            CardType::Egk21 | CardType::Hba21 | CardType::Smcb21 => CardGeneration::G21,
        }
    }

    pub fn is_egk(&self) -> bool {
        self.family() == CardFamily::Egk
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardType::Egk2 => "eGK G2",
            CardType::Egk21 => "eGK G2.1",
            CardType::Hba2 => "HBA G2",
            CardType::Hba21 => "HBA G2.1",
            CardType::Smcb2 => "SMC-B G2",
            CardType::Smcb21 => "SMC-B G2.1",
        };
        f.write_str(name)
    }
}
