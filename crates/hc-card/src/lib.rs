//! HC Card - Card command layer for German health cards
//!
//! This crate talks to eGK, HBA and SMC-B cards: it builds the ISO 7816-4
//! commands the access control layer needs, interprets status words per
//! command, identifies card types and generations, and knows where each card
//! type keeps its PINs, keys and certificates. Cards are reached through the
//! [`CardChannel`] seam, backed by PC/SC in production.

pub mod apdu;
pub mod card;
pub mod card_type;
pub mod channel;
pub mod cvc;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod reader;
pub mod status;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use apdu::{ApduCommand, ApduResponse, CommandKind, Format2Pin};
pub use card::{CardStatus, HealthCard, Response};
pub use card_type::{CardFamily, CardGeneration, CardType};
pub use channel::{CardChannel, PcscChannel};
pub use cvc::CvCertificate;
pub use error::{CardError, Result};
pub use layout::{CardFileLayout, PasswordReference, PinPurpose, PinTarget};
pub use pipeline::{expect_state, Validate};
pub use reader::CardReader;
pub use status::ResponseStatus;

/// Re-export commonly used types
pub use pcsc::Error as PcscError;
