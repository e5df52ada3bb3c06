// Integration tests for the transfer confirmation state machine
//
// These drive TransferFlow against the in-memory bank and check every
// precondition: forward-only status, PIN gating, single active attempt,
// and transport failures leaving state untouched.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use common::MockBank;
use echobank_voice::{BankApi, RecipientMatch, TransferFlow, TransferStatus, VoiceBankError};

fn flow(bank: &Arc<MockBank>) -> TransferFlow {
    TransferFlow::new(Arc::clone(bank) as Arc<dyn BankApi>, "session_test_1")
}

#[tokio::test]
async fn test_full_happy_path() -> Result<()> {
    let bank = Arc::new(MockBank::default());
    let mut flow = flow(&bank);

    let recipient = match flow.search_recipient("mary", 5).await? {
        RecipientMatch::Single(r) => r,
        other => panic!("expected a single match, got {other:?}"),
    };

    let attempt = flow.initiate(&recipient, 5000.0).await?;
    assert_eq!(attempt.status, TransferStatus::Initiated);
    assert_eq!(attempt.current_balance, common::DEMO_BALANCE);
    assert_eq!(attempt.new_balance, common::DEMO_BALANCE - 5000.0);

    let attempt = flow.verify_pin(common::CORRECT_PIN).await?;
    assert_eq!(attempt.status, TransferStatus::PinVerified);

    let receipt = flow.confirm().await?;
    assert_eq!(receipt.status, TransferStatus::Confirmed);
    assert!(receipt.transaction_ref.is_some(), "confirmed transfers carry a ledger reference");
    assert!(flow.attempt().is_none(), "attempt is dropped after confirmation");

    Ok(())
}

#[tokio::test]
async fn test_initiate_rejects_nonpositive_amounts() -> Result<()> {
    let bank = Arc::new(MockBank::default());
    let mut flow = flow(&bank);
    let recipient = common::mary_adewale();

    for amount in [0.0, -250.0, f64::NAN, f64::INFINITY] {
        let err = flow.initiate(&recipient, amount).await.unwrap_err();
        assert!(matches!(err, VoiceBankError::InvalidAmount(_)), "amount {amount} must be rejected");
    }

    // Rejected before any network call.
    assert_eq!(bank.initiate_calls.load(Ordering::SeqCst), 0);
    assert!(flow.attempt().is_none());

    Ok(())
}

#[tokio::test]
async fn test_one_active_attempt_per_session() -> Result<()> {
    let bank = Arc::new(MockBank::default());
    let mut flow = flow(&bank);

    flow.initiate(&common::mary_adewale(), 1000.0).await?;
    let err = flow.initiate(&common::john_okafor(), 2000.0).await.unwrap_err();
    assert!(matches!(err, VoiceBankError::TransferInProgress));
    assert_eq!(bank.initiate_calls.load(Ordering::SeqCst), 1);

    // The original attempt is untouched.
    let attempt = flow.attempt().expect("first attempt survives");
    assert_eq!(attempt.amount, 1000.0);
    assert_eq!(attempt.recipient.name, "Mary Adewale");

    Ok(())
}

#[tokio::test]
async fn test_confirm_requires_pin_verification() -> Result<()> {
    let bank = Arc::new(MockBank::default());
    let mut flow = flow(&bank);

    flow.initiate(&common::mary_adewale(), 1000.0).await?;
    let err = flow.confirm().await.unwrap_err();
    assert!(matches!(
        err,
        VoiceBankError::Precondition {
            expected: TransferStatus::PinVerified,
            actual: TransferStatus::Initiated,
        }
    ));

    // Never reached the remote; attempt still pending PIN.
    assert_eq!(bank.confirm_calls.load(Ordering::SeqCst), 0);
    assert_eq!(flow.status(), Some(TransferStatus::Initiated));

    Ok(())
}

#[tokio::test]
async fn test_wrong_pin_keeps_attempt_alive() -> Result<()> {
    let bank = Arc::new(MockBank::default());
    let mut flow = flow(&bank);

    flow.initiate(&common::mary_adewale(), 1000.0).await?;

    let err = flow.verify_pin("0000").await.unwrap_err();
    match err {
        VoiceBankError::InvalidPin { attempts_remaining } => {
            assert_eq!(attempts_remaining, Some(2));
        }
        other => panic!("expected InvalidPin, got {other}"),
    }
    assert_eq!(flow.status(), Some(TransferStatus::Initiated), "rejection does not advance status");

    // A correct retry still works.
    flow.verify_pin(common::CORRECT_PIN).await?;
    assert_eq!(flow.status(), Some(TransferStatus::PinVerified));

    Ok(())
}

#[tokio::test]
async fn test_pin_format_checked_locally() -> Result<()> {
    let bank = Arc::new(MockBank::default());
    let mut flow = flow(&bank);

    flow.initiate(&common::mary_adewale(), 1000.0).await?;

    for pin in ["12", "12345", "12a4", ""] {
        let err = flow.verify_pin(pin).await.unwrap_err();
        assert!(matches!(err, VoiceBankError::Validation(_)), "pin {pin:?} must fail locally");
    }
    assert_eq!(bank.pin_calls.load(Ordering::SeqCst), 0, "malformed PINs never hit the network");

    Ok(())
}

#[tokio::test]
async fn test_cancel_after_pin_verification() -> Result<()> {
    let bank = Arc::new(MockBank::default());
    let mut flow = flow(&bank);

    flow.initiate(&common::mary_adewale(), 1000.0).await?;
    flow.verify_pin(common::CORRECT_PIN).await?;

    let receipt = flow.cancel().await?;
    assert_eq!(receipt.status, TransferStatus::Cancelled);
    assert!(flow.attempt().is_none());

    // No funds moved.
    assert_eq!(bank.confirm_calls.load(Ordering::SeqCst), 0);
    assert_eq!(bank.fetch_balance("0011223344").await?, common::DEMO_BALANCE);

    Ok(())
}

#[tokio::test]
async fn test_cancel_with_no_attempt() {
    let bank = Arc::new(MockBank::default());
    let mut flow = flow(&bank);

    let err = flow.cancel().await.unwrap_err();
    assert!(matches!(err, VoiceBankError::TransferNotFound));
    assert_eq!(bank.cancel_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reset_then_fresh_initiate() -> Result<()> {
    let bank = Arc::new(MockBank::default());
    let mut flow = flow(&bank);

    flow.initiate(&common::mary_adewale(), 1000.0).await?;
    flow.reset();
    assert!(flow.attempt().is_none());

    // A brand-new attempt starts cleanly after reset.
    let attempt = flow.initiate(&common::john_okafor(), 2500.0).await?;
    assert_eq!(attempt.status, TransferStatus::Initiated);
    assert_eq!(attempt.recipient.name, "John Okafor");
    assert_eq!(bank.initiate_calls.load(Ordering::SeqCst), 2);

    Ok(())
}

#[tokio::test]
async fn test_expired_confirmation_marks_attempt_failed() -> Result<()> {
    let bank = Arc::new(MockBank::default());
    let mut flow = flow(&bank);

    flow.initiate(&common::mary_adewale(), 1000.0).await?;
    flow.verify_pin(common::CORRECT_PIN).await?;

    bank.expire_on_confirm.store(true, Ordering::SeqCst);
    let err = flow.confirm().await.unwrap_err();
    assert!(matches!(err, VoiceBankError::TransferExpired));
    assert_eq!(flow.status(), Some(TransferStatus::Failed), "attempt is kept as failed for display");

    // A failed (terminal) attempt no longer blocks a new one.
    bank.expire_on_confirm.store(false, Ordering::SeqCst);
    flow.initiate(&common::mary_adewale(), 500.0).await?;
    assert_eq!(flow.status(), Some(TransferStatus::Initiated));

    Ok(())
}

#[tokio::test]
async fn test_transport_failure_leaves_state_untouched() -> Result<()> {
    let bank = Arc::new(MockBank::default());
    let mut flow = flow(&bank);

    flow.initiate(&common::mary_adewale(), 1000.0).await?;
    flow.verify_pin(common::CORRECT_PIN).await?;

    bank.offline.store(true, Ordering::SeqCst);
    let err = flow.confirm().await.unwrap_err();
    assert!(matches!(err, VoiceBankError::Network(_)));
    assert_eq!(flow.status(), Some(TransferStatus::PinVerified), "network failure is not a state transition");

    // Retry succeeds once the transport recovers.
    bank.offline.store(false, Ordering::SeqCst);
    let receipt = flow.confirm().await?;
    assert_eq!(receipt.status, TransferStatus::Confirmed);

    Ok(())
}

#[tokio::test]
async fn test_search_classification() -> Result<()> {
    let bank = Arc::new(MockBank::default());
    let flow = flow(&bank);

    assert!(matches!(flow.search_recipient("mary", 5).await?, RecipientMatch::Single(_)));

    match flow.search_recipient("john", 5).await? {
        RecipientMatch::Multiple(candidates) => assert_eq!(candidates.len(), 2),
        other => panic!("expected multiple matches, got {other:?}"),
    }

    assert!(matches!(flow.search_recipient("nobody", 5).await?, RecipientMatch::None));

    Ok(())
}
