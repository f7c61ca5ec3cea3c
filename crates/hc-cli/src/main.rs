use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use hc_card::CardGeneration;
use hc_control::{AccessRequest, AccessRule, ControlConfig, DataType, PinPurpose, ProfessionalRole};
use tracing_subscriber::EnvFilter;

mod commands;
mod formatters;
mod inspector;
mod pin_entry;

use commands::access::AccessOptions;
use formatters::FormatMode;

#[derive(Parser)]
#[command(name = "hc")]
#[command(about = "Health card access control - PIN, card-to-card authentication, access protocol")]
#[command(version)]
struct Args {
    /// Output format mode
    #[arg(short, long, global = true, value_enum, default_value_t = FormatMode::Human)]
    format: FormatMode,

    /// Card reader to use, defaults to the first reader holding a card
    #[arg(short, long, global = true)]
    reader: Option<String>,

    /// Seconds to wait for PIN entry, 0 waits forever
    #[arg(long, global = true, default_value_t = 120)]
    pin_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List card readers
    Readers,
    /// Identify the card type and generation
    Detect,
    /// Show the state of a PIN
    PinStatus {
        #[arg(value_enum)]
        purpose: PurposeArg,
    },
    /// Ask for a PIN and verify it
    VerifyPin {
        #[arg(value_enum)]
        purpose: PurposeArg,
    },
    /// Authenticate an eGK and a provider card to each other
    C2c {
        #[arg(long)]
        egk_reader: String,
        #[arg(long)]
        provider_reader: String,
        /// Skip the cardholder PIN of the provider card
        #[arg(long)]
        no_pin: bool,
    },
    /// Read the access protocol of an eGK
    Protocol {
        /// Also show empty records
        #[arg(long)]
        all: bool,
    },
    /// Prepare and open access to emergency data or personal declarations
    Access {
        #[arg(long)]
        egk_reader: String,
        #[arg(long)]
        provider_reader: String,
        #[arg(long, value_enum, default_value_t = DataArg::Nfd)]
        data: DataArg,
        #[arg(long)]
        emergency: bool,
        #[arg(long)]
        update: bool,
        /// Admission OID of the provider's authentication certificate
        #[arg(long)]
        profession_oid: String,
        /// Name recorded in the access protocol
        #[arg(long)]
        actor_name: String,
        /// Read the container after the checks
        #[arg(long)]
        read: bool,
    },
    /// Decide an access right without cards
    AccessRight {
        #[arg(long, value_enum, default_value_t = DataArg::Nfd)]
        data: DataArg,
        #[arg(long, value_enum, default_value_t = GenerationArg::G21)]
        generation: GenerationArg,
        /// Role name, for example ARZT or APOTHEKER
        #[arg(long)]
        role: ProfessionalRole,
        #[arg(long, value_enum)]
        rule: RuleArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PurposeArg {
    Ch,
    Home,
    Nfd,
    NfdRead,
    Dpe,
    DpeRead,
    Amts,
    Gdd,
    Ose,
}

impl From<PurposeArg> for PinPurpose {
    fn from(arg: PurposeArg) -> Self {
        match arg {
            PurposeArg::Ch => PinPurpose::Ch,
            PurposeArg::Home => PinPurpose::Home,
            PurposeArg::Nfd => PinPurpose::Nfd,
            PurposeArg::NfdRead => PinPurpose::NfdRead,
            PurposeArg::Dpe => PinPurpose::Dpe,
            PurposeArg::DpeRead => PinPurpose::DpeRead,
            PurposeArg::Amts => PinPurpose::Amts,
            PurposeArg::Gdd => PinPurpose::Gdd,
            PurposeArg::Ose => PinPurpose::Ose,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DataArg {
    Nfd,
    Dpe,
}

impl From<DataArg> for DataType {
    fn from(arg: DataArg) -> Self {
        match arg {
            DataArg::Nfd => DataType::Nfd,
            DataArg::Dpe => DataType::Dpe,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GenerationArg {
    G2,
    G21,
}

impl From<GenerationArg> for CardGeneration {
    fn from(arg: GenerationArg) -> Self {
        match arg {
            GenerationArg::G2 => CardGeneration::G2,
            GenerationArg::G21 => CardGeneration::G21,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RuleArg {
    R1,
    R2,
    R3,
    R4,
}

impl From<RuleArg> for AccessRule {
    fn from(arg: RuleArg) -> Self {
        match arg {
            RuleArg::R1 => AccessRule::R1,
            RuleArg::R2 => AccessRule::R2,
            RuleArg::R3 => AccessRule::R3,
            RuleArg::R4 => AccessRule::R4,
        }
    }
}

fn main() -> ExitCode {
    // Initialize tracing subscriber with environment-based filtering
    // Set RUST_LOG=debug for detailed logs, RUST_LOG=trace for very verbose
    // Default: info level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let format_mode = args.format;
    let reader = args.reader.as_deref();
    let timeout = match args.pin_timeout {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let config = ControlConfig::default().with_pin_entry_timeout(timeout);

    let result = match args.command {
        Command::Readers => commands::readers::cmd_readers(),
        Command::Detect => commands::detect::cmd_detect(reader, format_mode),
        Command::PinStatus { purpose } => commands::pin::cmd_pin_status(reader, purpose.into()),
        Command::VerifyPin { purpose } => {
            commands::pin::cmd_verify_pin(reader, purpose.into(), &config, format_mode)
        }
        Command::C2c {
            egk_reader,
            provider_reader,
            no_pin,
        } => commands::c2c::cmd_c2c(&egk_reader, &provider_reader, !no_pin),
        Command::Protocol { all } => commands::protocol::cmd_protocol(reader, all, &config, format_mode),
        Command::Access {
            egk_reader,
            provider_reader,
            data,
            emergency,
            update,
            profession_oid,
            actor_name,
            read,
        } => {
            let options = AccessOptions {
                egk_reader,
                provider_reader,
                request: AccessRequest {
                    data_type: data.into(),
                    emergency,
                    update,
                },
                profession_oid,
                actor_name,
                read,
            };
            commands::access::cmd_access(&options, &config, format_mode)
        }
        Command::AccessRight {
            data,
            generation,
            role,
            rule,
        } => {
            commands::access::cmd_access_right(data.into(), generation.into(), role, rule.into());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
