//! Certificate facts supplied on the command line

use hc_card::CardType;
use hc_control::{CertificateInspector, ControlError, Result};

/// Answers with the admission OID and actor name given as flags instead of
/// parsing the X.509 certificate. A certificate counts as valid when the
/// card returned one at all.
pub struct FixedInspector {
    profession_oid: String,
    actor_name: String,
}

impl FixedInspector {
    pub fn new(profession_oid: impl Into<String>, actor_name: impl Into<String>) -> Self {
        Self {
            profession_oid: profession_oid.into(),
            actor_name: actor_name.into(),
        }
    }
}

impl CertificateInspector for FixedInspector {
    fn admission_oid(&self, certificate: &[u8]) -> Result<String> {
        if certificate.is_empty() {
            return Err(ControlError::CertificateValidation(
                "card holds no authentication certificate".to_string(),
            ));
        }
        Ok(self.profession_oid.clone())
    }

    fn actor_name(&self, _certificate: &[u8], _card_type: CardType) -> Result<String> {
        Ok(self.actor_name.clone())
    }

    fn is_currently_valid(&self, certificate: &[u8]) -> bool {
        !certificate.is_empty()
    }
}
