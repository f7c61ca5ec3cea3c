//! Access decisions for emergency data and personal declarations

mod right;
mod role;
mod rule;

pub use right::{access_right, ensure_granted, resolve_access_right, AccessRight, DataType};
pub use role::ProfessionalRole;
pub use rule::{access_rule, AccessRule};
