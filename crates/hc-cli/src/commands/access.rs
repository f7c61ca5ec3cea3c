use hc_card::CardGeneration;
use hc_control::access::access_right;
use hc_control::{
    AccessRequest, AccessRule, AccessSession, CardVerifier, ControlConfig, DataType, PinPrompt, ProfessionalRole,
    Result,
};

use crate::formatters::FormatMode;
use crate::inspector::FixedInspector;
use crate::pin_entry::{StderrSink, TerminalPinUi};

pub struct AccessOptions {
    pub egk_reader: String,
    pub provider_reader: String,
    pub request: AccessRequest,
    pub profession_oid: String,
    pub actor_name: String,
    /// Dump the container after the checks
    pub read: bool,
}

pub fn cmd_access(options: &AccessOptions, config: &ControlConfig, format_mode: FormatMode) -> Result<()> {
    println!("Access to {}\n", options.request.data_type);
    let mut egk = super::connect(Some(&options.egk_reader))?;
    let mut provider = super::connect(Some(&options.provider_reader))?;

    let verifier = CardVerifier::new(FixedInspector::new(&options.profession_oid, &options.actor_name));
    let prompt = PinPrompt::new(TerminalPinUi, StderrSink, config);

    let session = AccessSession::prepare(&mut egk, &mut provider, options.request, &verifier, &prompt)?;
    println!("Role: {}", session.role());
    println!("Access rule: {}", session.rule());
    println!("Access right: {:?}", session.right());

    session.open(&mut egk, &mut provider, &verifier, &prompt)?;
    println!("Access protocolled, container ready");

    if options.read {
        let data = session.read(&mut egk)?;
        match format_mode {
            FormatMode::Raw => println!("{}", hex::encode_upper(&data)),
            FormatMode::Human => println!("{} bytes of compressed container data", data.len()),
        }
    }
    Ok(())
}

/// Decide a right without any card
pub fn cmd_access_right(data_type: DataType, generation: CardGeneration, role: ProfessionalRole, rule: AccessRule) {
    let right = access_right(data_type, generation, role, rule);
    println!("{} on {:?} for {} under {}: {:?}", data_type, generation, role, rule, right);
    if let Some(pin) = right.required_pin() {
        println!("Requires MR-PIN {:?}", pin);
    }
    if let Some(code) = right.type_access_code(rule) {
        println!("Protocolled as type of access '{}'", code);
    }
}
