//! Seam to the X.509 certificate parser
//!
//! Authentication certificates below DF.ESIGN are X.509. Parsing them is left
//! to the caller, who plugs in an implementation of [`CertificateInspector`].

use hc_card::CardType;

use crate::error::Result;

pub trait CertificateInspector {
    /// Admission OID (professionOID) from the admission extension, for
    /// example `1.2.276.0.76.4.30`
    fn admission_oid(&self, certificate: &[u8]) -> Result<String>;

    /// Name recorded in the access protocol: surname and given name for an
    /// HBA, common name for an SMC-B
    fn actor_name(&self, certificate: &[u8], card_type: CardType) -> Result<String>;

    /// Whether the certificate is inside its validity period and not revoked
    fn is_currently_valid(&self, certificate: &[u8]) -> bool;
}

impl<T: CertificateInspector + ?Sized> CertificateInspector for &T {
    fn admission_oid(&self, certificate: &[u8]) -> Result<String> {
        (**self).admission_oid(certificate)
    }

    fn actor_name(&self, certificate: &[u8], card_type: CardType) -> Result<String> {
        (**self).actor_name(certificate, card_type)
    }

    fn is_currently_valid(&self, certificate: &[u8]) -> bool {
        (**self).is_currently_valid(certificate)
    }
}
