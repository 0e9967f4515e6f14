// Copyright (c) 2022-2023 The MobileCoin Foundation

use keycard_card::PairingInfo;
use keycard_flow::{Action, FlowParams, FlowType, PairingStore, StatusError};

mod helpers;
use helpers::*;

const NEW_PIN: &str = "654321";

fn with_pin(pin: &str) -> FlowParams {
    FlowParams {
        pin: Some(pin.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn pin_exhaustion_unblocks() {
    let card = card_with_keys();
    let mut h = Harness::new(card.clone());

    h.start(FlowType::Login, with_pin("000000"));

    let s = h.expect(Action::EnterPin).await;
    assert_eq!(s.error, Some(StatusError::Pin));
    assert_eq!(s.pin_retries, Some(2));

    h.resume(with_pin("111111"));

    let s = h.expect(Action::EnterPin).await;
    assert_eq!(s.error, Some(StatusError::Pin));
    assert_eq!(s.pin_retries, Some(1));

    h.resume(with_pin("222222"));

    // Last attempt used, continuing with unblock
    let s = h.expect(Action::EnterPuk).await;
    assert_eq!(s.error, None);
    assert_eq!(s.pin_retries, Some(0));
    assert_eq!(card.pin_retries(), 0);

    h.resume(FlowParams {
        puk: Some(PUK.to_string()),
        new_pin: Some(NEW_PIN.to_string()),
        ..Default::default()
    });

    let r = h.result().await;
    assert_eq!(r.error, Some(StatusError::Ok));
    assert_eq!(r.pin_retries, Some(3));
    assert_eq!(r.puk_retries, Some(5));
    assert!(r.encryption_key.is_some());

    assert_eq!(card.pin(), NEW_PIN);
}

#[tokio::test]
async fn wrong_puk() {
    let card = card_with_keys().with_pin_retries(0);
    let mut h = Harness::new(card.clone());

    h.start(
        FlowType::Login,
        FlowParams {
            puk: Some("000000000000".to_string()),
            new_pin: Some(NEW_PIN.to_string()),
            ..Default::default()
        },
    );

    let s = h.expect(Action::EnterPuk).await;
    assert_eq!(s.error, Some(StatusError::Puk));
    assert_eq!(s.puk_retries, Some(4));

    h.resume(FlowParams {
        puk: Some(PUK.to_string()),
        ..Default::default()
    });

    assert_eq!(h.result().await.error, Some(StatusError::Ok));
    assert_eq!(card.pin(), NEW_PIN);
    assert_eq!(card.puk_retries(), 5);
}

#[tokio::test]
async fn unblock_requests_new_pin() {
    let card = card_with_keys().with_pin_retries(0);
    let mut h = Harness::new(card.clone());

    h.start(
        FlowType::Login,
        FlowParams {
            puk: Some(PUK.to_string()),
            ..Default::default()
        },
    );

    let s = h.expect(Action::EnterNewPin).await;
    assert_eq!(s.error, Some(StatusError::Unblocking));

    h.resume(FlowParams {
        new_pin: Some(NEW_PIN.to_string()),
        ..Default::default()
    });

    assert_eq!(h.result().await.error, Some(StatusError::Ok));
    assert_eq!(card.pin(), NEW_PIN);
}

#[tokio::test]
async fn puk_exhausted_requests_swap() {
    let card = card_with_keys().with_pin_retries(0).with_puk_retries(0);
    let mut h = Harness::new(card);

    h.start(FlowType::Login, FlowParams::default());

    let s = h.expect(Action::SwapCard).await;
    assert_eq!(s.error, Some(StatusError::PukRetries));
    assert_eq!(s.puk_retries, Some(0));

    h.flow.cancel().unwrap();
    h.flow.wait().await;
}

#[tokio::test]
async fn malformed_pin_keeps_retries() {
    let card = card_with_keys();
    let mut h = Harness::new(card.clone());

    h.start(FlowType::Login, with_pin("12"));

    let s = h.expect(Action::EnterPin).await;
    assert_eq!(s.error, Some(StatusError::Pin));
    assert_eq!(s.pin_retries, Some(3));
    assert_eq!(card.pin_retries(), 3);

    h.resume(pin());

    assert_eq!(h.result().await.error, Some(StatusError::Ok));
}

#[tokio::test]
async fn no_free_pairing_slots() {
    let card = card_with_keys().with_used_slots(5);
    let mut h = Harness::new(card);

    h.start(FlowType::Login, pin());

    let s = h.expect(Action::SwapCard).await;
    assert_eq!(s.error, Some(StatusError::FreePairingSlots));
    assert_eq!(s.free_pairing_slots, Some(0));

    h.reader.insert(card_with_keys());
    h.resume(FlowParams::default());

    assert_eq!(h.result().await.error, Some(StatusError::Ok));
}

#[tokio::test]
async fn stale_pairing_is_replaced() {
    let card = card_with_keys();
    let mut h = Harness::new(card.clone());

    let stale = PairingInfo {
        key: vec![0u8; 32],
        index: 0,
    };
    h.pairings.store(&card.instance_uid(), stale.clone()).unwrap();

    let r = h.run(FlowType::Login, pin()).await;
    assert_eq!(r.error, Some(StatusError::Ok));

    let p = h.pairings.get(&card.instance_uid()).unwrap();
    assert_ne!(p, stale);
}

#[tokio::test]
async fn stored_pairing_is_reused() {
    let card = card_with_keys();
    let mut h = Harness::new(card.clone());

    login(&mut h).await;
    assert_eq!(card.free_slots(), 4);

    login(&mut h).await;
    assert_eq!(card.free_slots(), 4);
    assert_eq!(h.pairings.len(), 1);
}
