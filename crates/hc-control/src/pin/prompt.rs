//! Interactive PIN entry through an external UI
//!
//! The caller blocks on a capacity-one channel while the UI collects digits.
//! The UI answers through the [`PinRequest`] it was handed: with digits, or
//! with an abort. Card commands always run on the calling thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use hc_card::{CardType, HealthCard, PinPurpose};
use tracing::{debug, info, warn};

use super::verifier::{resolve_target, verify_pin};
use super::{Pin, PinResult};
use crate::config::ControlConfig;
use crate::error::{ControlError, Result};

const INVALID_CARD_MESSAGE: &str = "Pin cannot be verified because card is invalid";

/// Answer to a PIN entry request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinReply {
    Digits(String),
    Abort,
}

/// A pending PIN entry, owned by the UI until it is answered
#[derive(Debug)]
pub struct PinRequest {
    pub purpose: PinPurpose,
    pub card_type: CardType,
    pub prompt: String,
    reply: SyncSender<PinReply>,
}

impl PinRequest {
    /// Hand the entered digits to the waiting caller
    pub fn submit(self, digits: impl Into<String>) {
        self.send(PinReply::Digits(digits.into()));
    }

    /// Cancel the request
    pub fn abort(self) {
        self.send(PinReply::Abort);
    }

    fn send(self, reply: PinReply) {
        // The caller may have timed out already
        if self.reply.try_send(reply).is_err() {
            debug!(purpose = ?self.purpose, "PIN reply dropped, nobody is waiting");
        }
    }
}

/// UI collaborator that shows PIN prompts.
///
/// `request_pin_entry` must not wait for the user; it hands the request to
/// whatever collects the digits and returns.
pub trait PinEntryUi: Send + Sync {
    fn request_pin_entry(&self, request: PinRequest);
}

/// Receives errors meant for the user
pub trait NotificationSink: Send + Sync {
    fn post_error(&self, error: &ControlError, message: &str);
}

/// PIN verification with the digits coming from a human.
///
/// One request may be pending per prompt; a second concurrent call fails
/// with [`ControlError::PinEntryPending`].
pub struct PinPrompt<U, N> {
    ui: U,
    sink: N,
    timeout: Option<Duration>,
    pending: AtomicBool,
}

struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<U: PinEntryUi, N: NotificationSink> PinPrompt<U, N> {
    pub fn new(ui: U, sink: N, config: &ControlConfig) -> Self {
        Self {
            ui,
            sink,
            timeout: config.pin_entry_timeout,
            pending: AtomicBool::new(false),
        }
    }

    /// Ask the user for the PIN of `purpose` and verify it on `card`.
    ///
    /// Aborts and timeouts are posted to the notification sink and returned
    /// as errors without touching the card. A verification that runs but
    /// fails is posted as well and returned as an unsuccessful [`PinResult`].
    pub fn verify(&self, card: &mut HealthCard, purpose: PinPurpose) -> Result<PinResult> {
        let card_type = match card.card_type() {
            Some(card_type) => card_type,
            None => {
                let err = ControlError::InvalidCard(INVALID_CARD_MESSAGE);
                self.sink.post_error(&err, INVALID_CARD_MESSAGE);
                return Err(err);
            }
        };
        if let Err(err) = resolve_target(card_type, purpose) {
            self.sink.post_error(&err, &err.to_string());
            return Err(err);
        }

        if self.pending.swap(true, Ordering::SeqCst) {
            return Err(ControlError::PinEntryPending);
        }
        let _pending = PendingGuard(&self.pending);

        let (reply, replies) = mpsc::sync_channel(1);
        info!(%card_type, ?purpose, "Requesting PIN entry");
        self.ui.request_pin_entry(PinRequest {
            purpose,
            card_type,
            prompt: format!("Please enter the PIN for {}", card_type),
            reply,
        });

        match self.wait(&replies) {
            Ok(PinReply::Digits(digits)) => {
                let result = verify_pin(card, purpose, &Pin::parse(&digits))?;
                if !result.verified {
                    let message = result.error_text();
                    self.sink
                        .post_error(&ControlError::PinVerification(message.clone()), &message);
                }
                Ok(result)
            }
            Ok(PinReply::Abort) => {
                let err = ControlError::PinEntryAborted;
                self.sink.post_error(&err, &err.to_string());
                Err(err)
            }
            Err(err) => {
                warn!(error = %err, "PIN entry did not complete");
                self.sink.post_error(&err, &err.to_string());
                Err(err)
            }
        }
    }

    fn wait(&self, replies: &Receiver<PinReply>) -> Result<PinReply> {
        match self.timeout {
            Some(timeout) => replies.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => ControlError::PinEntryTimedOut(timeout.as_secs()),
                RecvTimeoutError::Disconnected => ControlError::PinEntryAborted,
            }),
            // A dropped request counts as an abort
            None => replies.recv().map_err(|_| ControlError::PinEntryAborted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_card::testing::FakeChannel;
    use hc_card::{CardStatus, CommandKind};
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[derive(Default, Clone)]
    struct Notes(Arc<Mutex<Vec<String>>>);

    impl NotificationSink for Notes {
        fn post_error(&self, _error: &ControlError, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    impl Notes {
        fn messages(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    /// Answers from a separate thread, as a real UI would
    struct ThreadedUi(Option<&'static str>);

    impl PinEntryUi for ThreadedUi {
        fn request_pin_entry(&self, request: PinRequest) {
            let answer = self.0;
            thread::spawn(move || match answer {
                Some(digits) => request.submit(digits),
                None => request.abort(),
            });
        }
    }

    /// Keeps the request without answering
    #[derive(Default, Clone)]
    struct ParkingUi(Arc<Mutex<Option<PinRequest>>>);

    impl PinEntryUi for ParkingUi {
        fn request_pin_entry(&self, request: PinRequest) {
            *self.0.lock().unwrap() = Some(request);
        }
    }

    fn config(timeout: Option<Duration>) -> ControlConfig {
        ControlConfig::default().with_pin_entry_timeout(timeout)
    }

    #[test]
    fn digits_are_verified_on_calling_thread() {
        let notes = Notes::default();
        let prompt = PinPrompt::new(ThreadedUi(Some("123456")), notes.clone(), &config(None));
        let (mut card, journal) = FakeChannel::new().into_card(CardType::Hba2);

        let result = prompt.verify(&mut card, PinPurpose::Ch).unwrap();
        assert!(result.verified);
        assert_eq!(journal.count(CommandKind::Verify), 1);
        assert!(notes.messages().is_empty());
    }

    #[test]
    fn failed_verification_is_posted() {
        let notes = Notes::default();
        let prompt = PinPrompt::new(ThreadedUi(Some("123456")), notes.clone(), &config(None));
        let (mut card, _) = FakeChannel::new()
            .respond(CommandKind::GetPinStatus, 0x62C1, &[])
            .respond(CommandKind::Verify, 0x6985, &[])
            .into_card(CardType::Egk21);

        let result = prompt.verify(&mut card, PinPurpose::Ch).unwrap();
        assert!(!result.verified);
        assert_eq!(notes.messages(), vec![result.error_text()]);
    }

    #[test]
    fn abort_sends_no_commands() {
        let notes = Notes::default();
        let prompt = PinPrompt::new(ThreadedUi(None), notes.clone(), &config(None));
        let (mut card, journal) = FakeChannel::new().into_card(CardType::Smcb21);

        let err = prompt.verify(&mut card, PinPurpose::Ch).unwrap_err();
        assert!(matches!(err, ControlError::PinEntryAborted));
        assert!(journal.is_empty());
        assert_eq!(notes.messages(), vec!["PIN entry aborted".to_string()]);
    }

    #[test]
    fn unanswered_request_times_out() {
        let notes = Notes::default();
        let ui = ParkingUi::default();
        let prompt = PinPrompt::new(ui.clone(), notes.clone(), &config(Some(Duration::from_millis(20))));
        let (mut card, journal) = FakeChannel::new().into_card(CardType::Hba21);

        let err = prompt.verify(&mut card, PinPurpose::Ch).unwrap_err();
        assert!(matches!(err, ControlError::PinEntryTimedOut(_)));
        assert!(journal.is_empty());
        assert_eq!(notes.messages().len(), 1);

        // A late answer goes nowhere and does not block
        if let Some(request) = ui.0.lock().unwrap().take() {
            request.submit("123456");
        };
    }

    #[test]
    fn invalid_card_is_posted() {
        let notes = Notes::default();
        let prompt = PinPrompt::new(ThreadedUi(Some("123456")), notes.clone(), &config(None));
        let mut card = HealthCard::new(FakeChannel::new(), CardStatus::Invalid);

        let err = prompt.verify(&mut card, PinPurpose::Ch).unwrap_err();
        assert!(matches!(err, ControlError::InvalidCard(_)));
        assert_eq!(notes.messages(), vec![INVALID_CARD_MESSAGE.to_string()]);
    }

    #[test]
    fn unsupported_purpose_is_posted_without_prompting() {
        let notes = Notes::default();
        let ui = ParkingUi::default();
        let prompt = PinPrompt::new(ui.clone(), notes.clone(), &config(None));
        let (mut card, journal) = FakeChannel::new().into_card(CardType::Smcb2);

        let err = prompt.verify(&mut card, PinPurpose::Nfd).unwrap_err();
        assert!(matches!(err, ControlError::UnsupportedPinPurpose { .. }));
        assert_eq!(notes.messages(), vec![err.to_string()]);
        assert!(ui.0.lock().unwrap().is_none());
        assert!(journal.is_empty());
    }

    #[test]
    fn second_request_while_pending_is_rejected() {
        let ui = ParkingUi::default();
        let prompt = Arc::new(PinPrompt::new(ui.clone(), Notes::default(), &config(None)));

        let waiting = {
            let prompt = Arc::clone(&prompt);
            thread::spawn(move || {
                let (mut card, _) = FakeChannel::new().into_card(CardType::Hba2);
                prompt.verify(&mut card, PinPurpose::Ch)
            })
        };

        let request = loop {
            if let Some(request) = ui.0.lock().unwrap().take() {
                break request;
            }
            thread::sleep(Duration::from_millis(1));
        };

        let (mut other, _) = FakeChannel::new().into_card(CardType::Hba2);
        assert!(matches!(
            prompt.verify(&mut other, PinPurpose::Ch),
            Err(ControlError::PinEntryPending)
        ));

        request.submit("123456");
        assert!(waiting.join().unwrap().unwrap().verified);
    }
}
