//! Professional roles of certificate holders
//!
//! Roles are looked up from the admission OID (professionOID) of the
//! authentication certificate. The OID table is embedded from
//! `data/admission-oids.txt`.

use std::fmt;
use std::str::FromStr;

use crate::error::{ControlError, Result};

const ADMISSION_OIDS: &str = include_str!("../../data/admission-oids.txt");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfessionalRole {
    Versicherter,
    Arzt,
    Zahnarzt,
    Apotheker,
    MitarbeiterApotheke,
    PsPsychotherapeut,
    AndererHeilberuf,
    PraxisArzt,
    PraxisZahnarzt,
    PraxisPsychotherapeut,
    Krankenhaus,
    OeffentlicheApotheke,
    KrankenhausApotheke,
    BundeswehrApotheke,
    MobileEinrichtungRettungsdienst,
    BsGematik,
    MitarbeiterKostentraeger,
    LeoZahnaerzte,
    AdvKostentraeger,
}

impl ProfessionalRole {
    /// Find the role for an admission OID such as `1.2.276.0.76.4.30`
    pub fn from_oid(oid: &str) -> Result<Self> {
        let oid = oid.trim();
        for line in ADMISSION_OIDS.lines() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 2 {
                continue;
            }

            if parts[0] == oid {
                return parts[1].parse();
            }
        }

        Err(ControlError::UnknownRole(oid.to_string()))
    }

    /// All OIDs that map to this role
    pub fn oids(&self) -> Vec<&'static str> {
        ADMISSION_OIDS
            .lines()
            .filter(|line| !line.starts_with('#'))
            .filter_map(|line| {
                let mut parts = line.split('\t');
                let oid = parts.next()?;
                let role = parts.next()?.parse::<ProfessionalRole>().ok()?;
                (role == *self).then_some(oid)
            })
            .collect()
    }

    fn table_name(&self) -> &'static str {
        match self {
            ProfessionalRole::Versicherter => "VERSICHERTER",
            ProfessionalRole::Arzt => "ARZT",
            ProfessionalRole::Zahnarzt => "ZAHNARZT",
            ProfessionalRole::Apotheker => "APOTHEKER",
            ProfessionalRole::MitarbeiterApotheke => "MITARBEITER_APOTHEKE",
            ProfessionalRole::PsPsychotherapeut => "PS_PSYCHOTHERAPEUT",
            ProfessionalRole::AndererHeilberuf => "ANDERER_HEILBERUF",
            ProfessionalRole::PraxisArzt => "PRAXIS_ARZT",
            ProfessionalRole::PraxisZahnarzt => "PRAXIS_ZAHNARZT",
            ProfessionalRole::PraxisPsychotherapeut => "PRAXIS_PSYCHOTHERAPEUT",
            ProfessionalRole::Krankenhaus => "KRANKENHAUS",
            ProfessionalRole::OeffentlicheApotheke => "OEFFENTLICHE_APOTHEKE",
            ProfessionalRole::KrankenhausApotheke => "KRANKENHAUS_APOTHEKE",
            ProfessionalRole::BundeswehrApotheke => "BUNDESWEHR_APOTHEKE",
            ProfessionalRole::MobileEinrichtungRettungsdienst => "MOBILE_EINRICHTUNG_RETTUNGSDIENST",
            ProfessionalRole::BsGematik => "BS_GEMATIK",
            ProfessionalRole::MitarbeiterKostentraeger => "MITARBEITER_KOSTENTRAEGER",
            ProfessionalRole::LeoZahnaerzte => "LEO_ZAHNAERZTE",
            ProfessionalRole::AdvKostentraeger => "ADV_KOSTENTRAEGER",
        }
    }
}

impl FromStr for ProfessionalRole {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        let role = match s {
            "VERSICHERTER" => ProfessionalRole::Versicherter,
            "ARZT" => ProfessionalRole::Arzt,
            "ZAHNARZT" => ProfessionalRole::Zahnarzt,
            "APOTHEKER" => ProfessionalRole::Apotheker,
            "MITARBEITER_APOTHEKE" => ProfessionalRole::MitarbeiterApotheke,
            "PS_PSYCHOTHERAPEUT" => ProfessionalRole::PsPsychotherapeut,
            "ANDERER_HEILBERUF" => ProfessionalRole::AndererHeilberuf,
            "PRAXIS_ARZT" => ProfessionalRole::PraxisArzt,
            "PRAXIS_ZAHNARZT" => ProfessionalRole::PraxisZahnarzt,
            "PRAXIS_PSYCHOTHERAPEUT" => ProfessionalRole::PraxisPsychotherapeut,
            "KRANKENHAUS" => ProfessionalRole::Krankenhaus,
            "OEFFENTLICHE_APOTHEKE" => ProfessionalRole::OeffentlicheApotheke,
            "KRANKENHAUS_APOTHEKE" => ProfessionalRole::KrankenhausApotheke,
            "BUNDESWEHR_APOTHEKE" => ProfessionalRole::BundeswehrApotheke,
            "MOBILE_EINRICHTUNG_RETTUNGSDIENST" => ProfessionalRole::MobileEinrichtungRettungsdienst,
            "BS_GEMATIK" => ProfessionalRole::BsGematik,
            "MITARBEITER_KOSTENTRAEGER" => ProfessionalRole::MitarbeiterKostentraeger,
            "LEO_ZAHNAERZTE" => ProfessionalRole::LeoZahnaerzte,
            "ADV_KOSTENTRAEGER" => ProfessionalRole::AdvKostentraeger,
            other => return Err(ControlError::UnknownRole(other.to_string())),
        };
        Ok(role)
    }
}

impl fmt::Display for ProfessionalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}
