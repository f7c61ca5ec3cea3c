//! Access rights to emergency data (NFD) and personal declarations (DPE)
//!
//! Each (data type, card generation) pair has a table that sorts roles into
//! three buckets. The bucket and the access rule decide the right; roles
//! missing from a table get no access.

use std::fmt;

use hc_card::{CardGeneration, HealthCard, PinPurpose};
use tracing::debug;

use super::role::ProfessionalRole;
use super::rule::AccessRule;
use crate::error::{ControlError, Result};
use crate::pin::valid_card_type;

/// Protected data on an eGK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Notfalldaten, emergency data
    Nfd,
    /// Datensatz persoenliche Erklaerungen, personal declarations
    Dpe,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Nfd => write!(f, "NFD"),
            DataType::Dpe => write!(f, "DPE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessRight {
    /// MRPIN.NFD must be verified
    MrPinNfd,
    /// MRPIN.NFD_READ must be verified
    MrPinNfdRead,
    /// MRPIN.DPE must be verified
    MrPinDpe,
    /// MRPIN.DPE_READ must be verified
    MrPinDpeRead,
    NoPin,
    EmergencyNoPin,
    NoAccess,
}

impl AccessRight {
    /// MR-PIN the right is conditional on
    pub fn required_pin(&self) -> Option<PinPurpose> {
        match self {
            AccessRight::MrPinNfd => Some(PinPurpose::Nfd),
            AccessRight::MrPinNfdRead => Some(PinPurpose::NfdRead),
            AccessRight::MrPinDpe => Some(PinPurpose::Dpe),
            AccessRight::MrPinDpeRead => Some(PinPurpose::DpeRead),
            AccessRight::NoPin | AccessRight::EmergencyNoPin | AccessRight::NoAccess => None,
        }
    }

    pub fn is_granted(&self) -> bool {
        *self != AccessRight::NoAccess
    }

    /// Type of access recorded in the access protocol: `N` emergency, `A`
    /// update, `R` read behind an MR-PIN, `r` read without PIN
    pub fn type_access_code(&self, rule: AccessRule) -> Option<char> {
        match self {
            AccessRight::MrPinNfd
            | AccessRight::MrPinNfdRead
            | AccessRight::MrPinDpe
            | AccessRight::MrPinDpeRead => Some('R'),
            AccessRight::NoPin => Some('r'),
            AccessRight::EmergencyNoPin | AccessRight::NoAccess => match rule {
                AccessRule::R1 => Some('N'),
                AccessRule::R2 => Some('A'),
                AccessRule::R3 | AccessRule::R4 => None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    /// Full access, PIN only for normal access with enabled PIN
    Standing,
    /// Read-only access behind the MR-PIN
    Conditional,
    /// Emergency access or read-only access
    Fallback,
}

fn nfd_bucket(role: ProfessionalRole) -> Option<Bucket> {
    use ProfessionalRole::*;

    match role {
        Arzt | PraxisArzt | Krankenhaus | Zahnarzt | PraxisZahnarzt => Some(Bucket::Standing),
        Apotheker
        | MitarbeiterApotheke
        | PsPsychotherapeut
        | PraxisPsychotherapeut
        | OeffentlicheApotheke
        | BundeswehrApotheke
        | KrankenhausApotheke => Some(Bucket::Conditional),
        AndererHeilberuf => Some(Bucket::Fallback),
        _ => None,
    }
}

fn dpe_bucket(generation: CardGeneration, role: ProfessionalRole) -> Option<Bucket> {
    use ProfessionalRole::*;

    match (generation, role) {
        (_, Arzt | PraxisArzt | Krankenhaus) => Some(Bucket::Standing),
        // The insured person may read own declarations on G2 cards only
        (CardGeneration::G2, Versicherter) => Some(Bucket::Conditional),
        _ => None,
    }
}

/// Decide the right for `role` under `rule`.
///
/// Emergency data share one table for both generations. Personal
/// declarations on generation 2.1 cards have no read-only bucket.
pub fn access_right(
    data_type: DataType,
    generation: CardGeneration,
    role: ProfessionalRole,
    rule: AccessRule,
) -> AccessRight {
    let (bucket, full, read) = match data_type {
        DataType::Nfd => (nfd_bucket(role), AccessRight::MrPinNfd, AccessRight::MrPinNfdRead),
        DataType::Dpe => (dpe_bucket(generation, role), AccessRight::MrPinDpe, AccessRight::MrPinDpeRead),
    };

    match (bucket, rule) {
        (None, _) => AccessRight::NoAccess,
        (Some(Bucket::Standing), AccessRule::R1) => AccessRight::EmergencyNoPin,
        (Some(Bucket::Standing), AccessRule::R2 | AccessRule::R4) => AccessRight::NoPin,
        (Some(Bucket::Standing), AccessRule::R3) => full,
        (Some(Bucket::Conditional), AccessRule::R3 | AccessRule::R4) => read,
        (Some(Bucket::Conditional), _) => AccessRight::NoAccess,
        (Some(Bucket::Fallback), AccessRule::R1) => AccessRight::EmergencyNoPin,
        (Some(Bucket::Fallback), AccessRule::R3 | AccessRule::R4) => read,
        (Some(Bucket::Fallback), AccessRule::R2) => AccessRight::NoAccess,
    }
}

/// Decide the right for reading `data_type` from `card_to_read`
pub fn resolve_access_right(
    card_to_read: &HealthCard,
    data_type: DataType,
    role: ProfessionalRole,
    rule: AccessRule,
) -> Result<AccessRight> {
    let card_type = valid_card_type(card_to_read, "access right needs a valid card to read")?;
    if !card_type.is_egk() {
        return Err(ControlError::WrongCardType {
            expected: "NFD and DPE are stored on an eGK",
            actual: card_type,
        });
    }

    let right = access_right(data_type, card_type.generation(), role, rule);
    debug!(%card_type, %data_type, %role, %rule, ?right, "Access right resolved");
    Ok(right)
}

/// Fail with `AccessDenied` unless the right grants access
pub fn ensure_granted(right: AccessRight) -> Result<AccessRight> {
    if right.is_granted() {
        Ok(right)
    } else {
        Err(ControlError::AccessDenied(
            "You are not authorized to read the emergency data (NFD) or personal declarations (DPE)"
                .to_string(),
        ))
    }
}
