//! HC Control - Access control for German health cards
//!
//! Built on the card command layer of `hc-card`, this crate decides and
//! carries out access to the emergency data and personal declarations of an
//! eGK:
//!
//! - PIN verification per card type, also with digits from an interactive UI
//! - mutual card-to-card authentication of the eGK and an HBA or SMC-B
//! - access rights derived from the professional role and the access rule
//! - the access protocol kept in EF.Logging of the eGK
//!
//! Every card operation returns a [`Result`] and stops at the first failing
//! step.

pub mod access;
pub mod c2c;
pub mod certificate;
pub mod config;
pub mod error;
pub mod nfd;
pub mod pin;
pub mod protocol;
pub mod session;
pub mod verifier;

pub use access::{access_rule, resolve_access_right, AccessRight, AccessRule, DataType, ProfessionalRole};
pub use c2c::{authenticate_card_to_card, C2CState};
pub use certificate::CertificateInspector;
pub use config::ControlConfig;
pub use error::{ControlError, Result};
pub use pin::{verify_pin, Pin, PinPrompt, PinPurpose, PinResult, PinSource, PinState};
pub use protocol::{read_entries, write_entry, ProtocolEntry, ProtocolLog, ProtocolRecordBuilder};
pub use session::{AccessRequest, AccessSession};
pub use verifier::{AuthCertificateState, CardVerifier};
