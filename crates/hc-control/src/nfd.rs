//! Readiness checks and raw reads for the NFD and DPE containers
//!
//! Before emergency data or personal declarations are read, the eGK must
//! show the container DF as active, report no open write transaction, carry
//! a supported storage version and hold data at all. The container content is
//! returned as stored: gzip compressed XML.

use std::fmt::Debug;

use hc_card::apdu::commands;
use hc_card::layout::{DataContainer, DPE_CONTAINER, NFD_CONTAINER};
use hc_card::{CardError, HealthCard, ResponseStatus, Validate};
use hc_common::{find_tag, tags};
use tracing::{debug, info};

use crate::access::DataType;
use crate::error::{ControlError, Result};
use crate::pin::valid_card_type;

/// Storage structure version this crate understands, hex of EF.Status* from offset 20
const PERMITTED_VERSION: &str = "0010000000";
const VERSION_OFFSET: usize = 20;
/// Largest chunk requested per READ BINARY
const READ_CHUNK: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeCycleState {
    Creation,
    Initialisation,
    OperationalActivated,
    OperationalDeactivated,
    Termination,
}

impl LifeCycleState {
    /// Interpret the FCP returned by SELECT. A missing FCP or life cycle byte
    /// counts as deactivated.
    pub fn from_fcp(data: &[u8]) -> Self {
        let status = find_tag(data, tags::FCP_TEMPLATE.bytes())
            .and_then(|fcp| find_tag(fcp, tags::LIFE_CYCLE_STATUS.bytes()))
            .and_then(|value| value.first().copied());

        match status {
            Some(0x01) => LifeCycleState::Creation,
            Some(0x03) => LifeCycleState::Initialisation,
            Some(0x05) | Some(0x07) => LifeCycleState::OperationalActivated,
            Some(0x0C..=0x0F) => LifeCycleState::Termination,
            _ => LifeCycleState::OperationalDeactivated,
        }
    }
}

/// Technical consistency from the status byte of EF.StatusNFD / EF.StatusDPE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyState {
    NoTransactionsOpen,
    TransactionsOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionState {
    Permitted,
    Inadmissible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataAvailableState {
    DataAvailable,
    NoDataAvailable,
}

pub fn container(data_type: DataType) -> DataContainer {
    match data_type {
        DataType::Nfd => NFD_CONTAINER,
        DataType::Dpe => DPE_CONTAINER,
    }
}

fn require<T: PartialEq + Debug>(what: &'static str, expected: T, actual: T) -> Result<T> {
    if expected == actual {
        Ok(actual)
    } else {
        Err(ControlError::UnexpectedState {
            what,
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        })
    }
}

fn select_container(card: &mut HealthCard, container: &DataContainer) -> Result<()> {
    card.execute(&commands::select_aid(container.df))
        .validate(ResponseStatus::Success)?;
    Ok(())
}

pub fn read_life_cycle_state(card: &mut HealthCard, container: &DataContainer) -> Result<LifeCycleState> {
    let response = card
        .execute(&commands::select_aid_with_fcp(container.df))
        .validate(ResponseStatus::Success)?;
    Ok(LifeCycleState::from_fcp(&response.data))
}

pub fn check_consistency(card: &mut HealthCard, container: &DataContainer) -> Result<ConsistencyState> {
    select_container(card, container)?;
    let status = card
        .execute(&commands::read_binary_sfid(container.status_sfid, 0))
        .validate(ResponseStatus::Success)?;
    match status.data.first() {
        Some(b'0') => Ok(ConsistencyState::NoTransactionsOpen),
        Some(_) => Ok(ConsistencyState::TransactionsOpen),
        None => Err(CardError::Malformed {
            what: "container status",
            reason: "empty".to_string(),
        }
        .into()),
    }
}

pub fn check_container_version(card: &mut HealthCard, container: &DataContainer) -> Result<VersionState> {
    select_container(card, container)?;
    let status = card
        .execute(&commands::read_binary_sfid(container.status_sfid, 0))
        .validate(ResponseStatus::Success)?;
    let version = status.data.get(VERSION_OFFSET..).map(hex::encode);
    debug!(version = ?version, "Container version read");
    Ok(match version.as_deref() {
        Some(PERMITTED_VERSION) => VersionState::Permitted,
        _ => VersionState::Inadmissible,
    })
}

/// Length of the stored document, from the first two bytes of the data EF
fn stored_length(card: &mut HealthCard, container: &DataContainer) -> Result<usize> {
    select_container(card, container)?;
    let response = card
        .execute(&commands::read_binary_sfid_range(container.data_sfid, 0, 2))
        .validate(ResponseStatus::Success)?;
    match response.data.as_slice() {
        [high, low, ..] => Ok(u16::from_be_bytes([*high, *low]) as usize),
        _ => Ok(0),
    }
}

pub fn check_data_available(card: &mut HealthCard, container: &DataContainer) -> Result<DataAvailableState> {
    Ok(if stored_length(card, container)? == 0 {
        DataAvailableState::NoDataAvailable
    } else {
        DataAvailableState::DataAvailable
    })
}

/// Run all readiness checks for `data_type` in order, stopping at the first
/// one that fails
pub fn ensure_ready(card: &mut HealthCard, data_type: DataType) -> Result<()> {
    let card_type = valid_card_type(card, "container checks need a valid card")?;
    if !card_type.is_egk() {
        return Err(ControlError::WrongCardType {
            expected: "NFD and DPE are stored on an eGK",
            actual: card_type,
        });
    }
    let container = container(data_type);

    let life_cycle = read_life_cycle_state(card, &container)?;
    if life_cycle == LifeCycleState::OperationalDeactivated {
        return Err(ControlError::UnexpectedState {
            what: "life cycle state",
            expected: "not deactivated".to_string(),
            actual: format!("{:?}", life_cycle),
        });
    }
    require(
        "consistency",
        ConsistencyState::NoTransactionsOpen,
        check_consistency(card, &container)?,
    )?;
    require("container version", VersionState::Permitted, check_container_version(card, &container)?)?;
    require(
        "data available",
        DataAvailableState::DataAvailable,
        check_data_available(card, &container)?,
    )?;

    info!(%card_type, %data_type, "Container ready");
    Ok(())
}

/// Read the stored document of `data_type` as it is kept on the card
pub fn read_container(card: &mut HealthCard, data_type: DataType) -> Result<Vec<u8>> {
    let container = container(data_type);
    let mut remaining = stored_length(card, &container)?;

    card.execute(&commands::select_ef(container.data_fid))
        .validate(ResponseStatus::Success)?;

    let mut data = Vec::with_capacity(remaining);
    let mut offset: usize = 2;
    while remaining > 0 {
        let chunk = remaining.min(READ_CHUNK);
        // Le 00 asks for 256 bytes
        let response = card
            .execute(&commands::read_binary(offset as u16, chunk as u8))
            .validate(ResponseStatus::Success)?;
        if response.data.is_empty() {
            return Err(CardError::Malformed {
                what: "container data",
                reason: format!("{} bytes missing", remaining),
            }
            .into());
        }
        let read = response.data.len().min(remaining);
        data.extend_from_slice(&response.data[..read]);
        offset += read;
        remaining -= read;
    }

    debug!(%data_type, len = data.len(), "Container read");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_card::testing::FakeChannel;
    use hc_card::{CardType, CommandKind};
    use hc_common::encode_tlv;
    use rstest::rstest;

    fn fcp(life_cycle: u8) -> Vec<u8> {
        let mut inner = encode_tlv(&[0x82], &[0x38]);
        inner.extend(encode_tlv(&[0x8A], &[life_cycle]));
        encode_tlv(&[0x62], &inner)
    }

    fn status_ef(state: u8) -> Vec<u8> {
        let mut data = vec![state];
        data.extend_from_slice(&[0x00; 19]);
        data.extend_from_slice(&[0x00, 0x10, 0x00, 0x00, 0x00]);
        data
    }

    #[rstest]
    #[case(0x01, LifeCycleState::Creation)]
    #[case(0x03, LifeCycleState::Initialisation)]
    #[case(0x05, LifeCycleState::OperationalActivated)]
    #[case(0x07, LifeCycleState::OperationalActivated)]
    #[case(0x04, LifeCycleState::OperationalDeactivated)]
    #[case(0x06, LifeCycleState::OperationalDeactivated)]
    #[case(0x0D, LifeCycleState::Termination)]
    fn life_cycle_from_fcp(#[case] byte: u8, #[case] expected: LifeCycleState) {
        assert_eq!(LifeCycleState::from_fcp(&fcp(byte)), expected);
    }

    #[test]
    fn empty_fcp_is_deactivated() {
        assert_eq!(LifeCycleState::from_fcp(&[]), LifeCycleState::OperationalDeactivated);
    }

    fn ready_card() -> FakeChannel {
        FakeChannel::new()
            .respond(CommandKind::Select, 0x9000, &fcp(0x05))
            .respond(CommandKind::ReadBinary, 0x9000, &status_ef(b'0'))
            .respond(CommandKind::ReadBinary, 0x9000, &status_ef(b'0'))
            .respond(CommandKind::ReadBinary, 0x9000, &[0x01, 0x20])
    }

    #[test]
    fn ready_container_passes() {
        let (mut egk, journal) = ready_card().into_card(CardType::Egk21);
        ensure_ready(&mut egk, DataType::Nfd).unwrap();
        assert_eq!(journal.count(CommandKind::ReadBinary), 3);
    }

    #[test]
    fn open_transaction_stops_checks() {
        let channel = FakeChannel::new()
            .respond(CommandKind::Select, 0x9000, &fcp(0x05))
            .respond(CommandKind::ReadBinary, 0x9000, &status_ef(b'1'));
        let (mut egk, journal) = channel.into_card(CardType::Egk2);
        let err = ensure_ready(&mut egk, DataType::Dpe).unwrap_err();
        assert!(matches!(err, ControlError::UnexpectedState { what: "consistency", .. }));
        assert_eq!(journal.count(CommandKind::ReadBinary), 1);
    }

    #[test]
    fn deactivated_container_fails() {
        let channel = FakeChannel::new().respond(CommandKind::Select, 0x9000, &fcp(0x04));
        let (mut egk, _) = channel.into_card(CardType::Egk21);
        assert!(matches!(
            ensure_ready(&mut egk, DataType::Nfd),
            Err(ControlError::UnexpectedState { what: "life cycle state", .. })
        ));
    }

    #[test]
    fn unknown_version_is_inadmissible() {
        let mut status = status_ef(b'0');
        status[22] = 0x20;
        let channel = FakeChannel::new().respond(CommandKind::ReadBinary, 0x9000, &status);
        let (mut egk, _) = channel.into_card(CardType::Egk21);
        assert_eq!(
            check_container_version(&mut egk, &NFD_CONTAINER).unwrap(),
            VersionState::Inadmissible
        );
    }

    #[test]
    fn empty_container_has_no_data() {
        let channel = FakeChannel::new().respond(CommandKind::ReadBinary, 0x9000, &[0x00, 0x00]);
        let (mut egk, _) = channel.into_card(CardType::Egk21);
        assert_eq!(
            check_data_available(&mut egk, &DPE_CONTAINER).unwrap(),
            DataAvailableState::NoDataAvailable
        );
    }

    #[test]
    fn read_container_in_chunks() {
        let channel = FakeChannel::new()
            .respond(CommandKind::ReadBinary, 0x9000, &[0x01, 0x2C])
            .respond(CommandKind::ReadBinary, 0x9000, &[0x1F; 256])
            .respond(CommandKind::ReadBinary, 0x9000, &[0x8B; 44]);
        let (mut egk, journal) = channel.into_card(CardType::Egk2);
        let data = read_container(&mut egk, DataType::Nfd).unwrap();
        assert_eq!(data.len(), 300);

        let reads: Vec<_> = journal
            .commands()
            .into_iter()
            .filter(|c| c.command_kind() == CommandKind::ReadBinary)
            .collect();
        assert_eq!(reads[1].header(), [0x00, 0xB0, 0x00, 0x02]);
        assert_eq!(reads[2].header(), [0x00, 0xB0, 0x01, 0x02]);
    }
}
