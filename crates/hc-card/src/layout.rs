//! File layout of the supported health card types
//!
//! Identifiers follow the gematik object systems for eGK, HBA
//! and SMC-B of generation 2 and 2.1. Everything that differs between card
//! types is resolved through a `match` on [`CardType`].

use crate::card_type::CardType;

/// Application identifiers
pub mod aid {
    /// Root application of the eGK
    pub const MF_EGK: &[u8] = &[0xD2, 0x76, 0x00, 0x01, 0x44, 0x80, 0x00];
    /// Root application of the HBA
    pub const MF_HBA: &[u8] = &[0xD2, 0x76, 0x00, 0x01, 0x46, 0x01];
    /// Root application of the SMC-B
    pub const MF_SMCB: &[u8] = &[0xD2, 0x76, 0x00, 0x01, 0x46, 0x06];

    /// Health care application (eGK)
    pub const DF_HCA: &[u8] = &[0xD2, 0x76, 0x00, 0x00, 0x01, 0x02];
    /// Emergency data (Notfalldaten)
    pub const DF_NFD: &[u8] = &[0xD2, 0x76, 0x00, 0x01, 0x44, 0x07];
    /// Personal declarations (Persönliche Erklärungen)
    pub const DF_DPE: &[u8] = &[0xD2, 0x76, 0x00, 0x01, 0x44, 0x08];
    pub const DF_GDD: &[u8] = &[0xD2, 0x76, 0x00, 0x01, 0x44, 0x0A];
    pub const DF_OSE: &[u8] = &[0xD2, 0x76, 0x00, 0x01, 0x44, 0x0B];
    pub const DF_AMTS: &[u8] = &[0xD2, 0x76, 0x00, 0x01, 0x44, 0x0C];

    /// Signature and authentication application
    pub const DF_ESIGN: &[u8] = &[0xA0, 0x00, 0x00, 0x01, 0x67, 0x45, 0x53, 0x49, 0x47, 0x4E];
}

/// EF.GDO, holds the ICCSN (same SFID on all card types)
pub const EF_GDO_SFID: u8 = 0x02;
/// EF.Version2, holds the object system version
pub const EF_VERSION2_SFID: u8 = 0x11;

/// Objects of DF.HCA on the eGK
pub mod egk {
    use super::PasswordReference;

    /// MRPIN.home, guards reading the access log
    pub const MRPIN_HOME: PasswordReference = PasswordReference::global(0x02);

    /// EF.Logging, linear record file with the access log
    pub const EF_LOGGING_FID: u16 = 0xD019;
    pub const EF_LOGGING_SFID: u8 = 0x19;
    /// Number of records in EF.Logging
    pub const LOGGING_RECORD_COUNT: u8 = 50;

    /// EF.C.CH.AUT.R2048 below DF.ESIGN, present on both generations
    pub const EF_C_CH_AUT_R2048_SFID: u8 = 0x01;
}

pub mod smcb {
    /// EF.C.HCI.OSIG.R2048 below DF.ESIGN of an SMC-B G2
    pub const EF_C_HCI_OSIG_R2048_SFID: u8 = 0x08;
    /// EF.C.HCI.OSIG.E256 below DF.ESIGN of an SMC-B G2.1
    pub const EF_C_HCI_OSIG_E256_SFID: u8 = 0x07;
}

/// Reference to a password object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PasswordReference {
    pub pwid: u8,
    /// DF-specific passwords are addressed relative to the current DF
    pub df_specific: bool,
}

impl PasswordReference {
    pub const fn global(pwid: u8) -> Self {
        Self {
            pwid,
            df_specific: false,
        }
    }

    pub const fn df_specific(pwid: u8) -> Self {
        Self {
            pwid,
            df_specific: true,
        }
    }

    /// Value of P2 in VERIFY and GET PIN STATUS
    pub fn p2(&self) -> u8 {
        if self.df_specific {
            0x80 | self.pwid
        } else {
            self.pwid
        }
    }
}

/// Reference to a private key object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyReference {
    pub key_id: u8,
    pub df_specific: bool,
}

impl KeyReference {
    pub const fn global(key_id: u8) -> Self {
        Self {
            key_id,
            df_specific: false,
        }
    }

    pub fn p2(&self) -> u8 {
        if self.df_specific {
            0x80 | self.key_id
        } else {
            self.key_id
        }
    }
}

/// What a PIN is verified for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinPurpose {
    /// Primary cardholder PIN (PIN.CH on eGK and HBA, PIN.SMC on SMC-B)
    Ch,
    /// MRPIN.home
    Home,
    /// MRPIN.NFD, full access to emergency data
    Nfd,
    /// MRPIN.NFD_READ
    NfdRead,
    /// MRPIN.DPE, full access to personal declarations
    Dpe,
    /// MRPIN.DPE_READ
    DpeRead,
    /// MRPIN.AMTS, medication plan
    Amts,
    /// MRPIN.GDD
    Gdd,
    /// MRPIN.OSE
    Ose,
}

impl PinPurpose {
    pub const ALL: [PinPurpose; 9] = [
        PinPurpose::Ch,
        PinPurpose::Home,
        PinPurpose::Nfd,
        PinPurpose::NfdRead,
        PinPurpose::Dpe,
        PinPurpose::DpeRead,
        PinPurpose::Amts,
        PinPurpose::Gdd,
        PinPurpose::Ose,
    ];
}

/// Where a password lives: the DFs to select after the root, then the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinTarget {
    pub path: &'static [&'static [u8]],
    pub password: PasswordReference,
}

impl PinTarget {
    const fn root(password: PasswordReference) -> Self {
        Self { path: &[], password }
    }

    const fn below_hca(df: &'static [&'static [u8]], password: PasswordReference) -> Self {
        Self { path: df, password }
    }
}

const HCA_NFD: &[&[u8]] = &[aid::DF_HCA, aid::DF_NFD];
const HCA_DPE: &[&[u8]] = &[aid::DF_HCA, aid::DF_DPE];
const HCA_GDD: &[&[u8]] = &[aid::DF_HCA, aid::DF_GDD];
const HCA_OSE: &[&[u8]] = &[aid::DF_HCA, aid::DF_OSE];
const HCA_AMTS: &[&[u8]] = &[aid::DF_HCA, aid::DF_AMTS];

/// A data container (NFD or DPE) below DF.HCA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataContainer {
    pub df: &'static [u8],
    pub data_fid: u16,
    pub data_sfid: u8,
    pub status_sfid: u8,
}

pub const NFD_CONTAINER: DataContainer = DataContainer {
    df: aid::DF_NFD,
    data_fid: 0xD010,
    data_sfid: 0x10,
    status_sfid: 0x0F,
};

pub const DPE_CONTAINER: DataContainer = DataContainer {
    df: aid::DF_DPE,
    data_fid: 0xD01C,
    data_sfid: 0x1C,
    status_sfid: 0x18,
};

/// Per card type identifiers used by authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardFileLayout {
    pub card_type: CardType,
    /// Application identifier of the root application
    pub root_aid: &'static [u8],
    /// Cardholder PIN (PIN.CH or PIN.SMC)
    pub pin_ch: PasswordReference,
    /// CV certificate of the issuing CA, for example EF.C.CA_eGK.CS.E256
    pub cvc_ca_sfid: u8,
    /// CV certificate used for role authentication, for example EF.C.eGK.AUT_CVC.E256
    pub cvc_aut_sfid: u8,
    pub gdo_sfid: u8,
    /// Private key matching `cvc_aut_sfid`, for example PrK.eGK.AUT_CVC.E256
    pub prk_aut_cvc: KeyReference,
    /// X.509 authentication certificate below DF.ESIGN
    pub esign_aut_sfid: u8,
}

impl CardFileLayout {
    pub fn for_card_type(card_type: CardType) -> Self {
        let (root_aid, pin_ch) = match card_type {
            CardType::Egk2 | CardType::Egk21 => (aid::MF_EGK, PasswordReference::global(0x01)),
            CardType::Hba2 | CardType::Hba21 => (aid::MF_HBA, PasswordReference::global(0x01)),
            CardType::Smcb2 | CardType::Smcb21 => (aid::MF_SMCB, PasswordReference::global(0x07)),
        };
        let esign_aut_sfid = match card_type {
            CardType::Egk21 => 0x04,
            CardType::Hba21 => 0x06,
            _ => 0x01,
        };

        Self {
            card_type,
            root_aid,
            pin_ch,
            cvc_ca_sfid: 0x07,
            cvc_aut_sfid: 0x06,
            gdo_sfid: EF_GDO_SFID,
            prk_aut_cvc: KeyReference::global(0x09),
            esign_aut_sfid,
        }
    }
}

impl CardType {
    pub fn layout(&self) -> CardFileLayout {
        CardFileLayout::for_card_type(*self)
    }

    /// Resolve the password object for a PIN purpose, `None` when this card
    /// type has no such PIN.
    pub fn pin_target(&self, purpose: PinPurpose) -> Option<PinTarget> {
        use PinPurpose::*;

        let pin_ch = self.layout().pin_ch;
        match self {
            CardType::Hba2 | CardType::Hba21 | CardType::Smcb2 | CardType::Smcb21 => match purpose {
                Ch => Some(PinTarget::root(pin_ch)),
                _ => None,
            },
            // Generation 2.1 addresses all MR-PINs globally from the root
            CardType::Egk21 => {
                let pwid = match purpose {
                    Ch => return Some(PinTarget::root(pin_ch)),
                    Home => return Some(PinTarget::root(egk::MRPIN_HOME)),
                    Nfd => 0x03,
                    Dpe => 0x04,
                    Gdd => 0x05,
                    Ose => 0x06,
                    Amts => 0x0C,
                    NfdRead => 0x07,
                    DpeRead => return None,
                };
                Some(PinTarget::root(PasswordReference::global(pwid)))
            }
            // Generation 2 keeps MR-PINs DF-specific in the data DFs below DF.HCA
            CardType::Egk2 => match purpose {
                Ch => Some(PinTarget::root(pin_ch)),
                Home => Some(PinTarget::root(egk::MRPIN_HOME)),
                Nfd => Some(PinTarget::below_hca(HCA_NFD, PasswordReference::df_specific(0x03))),
                NfdRead => Some(PinTarget::below_hca(HCA_NFD, PasswordReference::df_specific(0x07))),
                Dpe => Some(PinTarget::below_hca(HCA_DPE, PasswordReference::df_specific(0x04))),
                DpeRead => Some(PinTarget::below_hca(HCA_DPE, PasswordReference::df_specific(0x08))),
                Gdd => Some(PinTarget::below_hca(HCA_GDD, PasswordReference::df_specific(0x05))),
                Ose => Some(PinTarget::below_hca(HCA_OSE, PasswordReference::df_specific(0x06))),
                Amts => Some(PinTarget::below_hca(HCA_AMTS, PasswordReference::df_specific(0x0C))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_cards_only_know_their_cardholder_pin() {
        for card_type in [CardType::Hba2, CardType::Hba21, CardType::Smcb2, CardType::Smcb21] {
            for purpose in PinPurpose::ALL {
                let target = card_type.pin_target(purpose);
                if purpose == PinPurpose::Ch {
                    assert_eq!(target.map(|t| t.path.len()), Some(0));
                } else {
                    assert_eq!(target, None, "{card_type} {purpose:?}");
                }
            }
        }
    }

    #[test]
    fn smcb_uses_pin_smc() {
        let target = CardType::Smcb21.pin_target(PinPurpose::Ch).unwrap();
        assert_eq!(target.password, PasswordReference::global(0x07));
        let target = CardType::Hba2.pin_target(PinPurpose::Ch).unwrap();
        assert_eq!(target.password, PasswordReference::global(0x01));
    }

    #[test]
    fn egk2_mr_pins_are_df_specific_below_hca() {
        let target = CardType::Egk2.pin_target(PinPurpose::Nfd).unwrap();
        assert_eq!(target.path, &[aid::DF_HCA, aid::DF_NFD]);
        assert!(target.password.df_specific);
        assert_eq!(target.password.p2(), 0x83);

        let target = CardType::Egk2.pin_target(PinPurpose::DpeRead).unwrap();
        assert_eq!(target.path, &[aid::DF_HCA, aid::DF_DPE]);
    }

    #[test]
    fn egk21_mr_pins_are_global() {
        for purpose in PinPurpose::ALL {
            match CardType::Egk21.pin_target(purpose) {
                Some(target) => {
                    assert!(target.path.is_empty());
                    assert!(!target.password.df_specific);
                }
                None => assert_eq!(purpose, PinPurpose::DpeRead),
            }
        }
    }

    #[test]
    fn esign_certificate_depends_on_type() {
        assert_eq!(CardType::Egk21.layout().esign_aut_sfid, 0x04);
        assert_eq!(CardType::Hba21.layout().esign_aut_sfid, 0x06);
        assert_eq!(CardType::Smcb2.layout().esign_aut_sfid, 0x01);
    }
}
