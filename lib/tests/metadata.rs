// Copyright (c) 2022-2023 The MobileCoin Foundation

use keycard_card::Metadata;
use keycard_flow::{Action, FlowParams, FlowType, StatusError};
use keycard_sim::SimCard;

mod helpers;
use helpers::*;

fn wallets(paths: &[&str]) -> Option<Vec<String>> {
    Some(paths.iter().map(|p| p.to_string()).collect())
}

#[tokio::test]
async fn store_and_get_metadata() {
    let card = card_with_keys();
    let mut h = Harness::new(card.clone());

    let r = h
        .run(
            FlowType::StoreMetadata,
            FlowParams {
                pin: Some(PIN.to_string()),
                card_name: Some("My Keycard".to_string()),
                wallet_paths: wallets(&["m/44'/60'/0'/0/0", "m/44'/60'/0'/0/7"]),
                ..Default::default()
            },
        )
        .await;
    assert_eq!(r.error, Some(StatusError::Ok));

    assert_eq!(
        card.metadata(),
        Some(Metadata {
            name: "My Keycard".to_string(),
            wallets: vec![0, 7],
        })
    );

    // Metadata is readable without authentication
    let r = h.run(FlowType::GetMetadata, FlowParams::default()).await;
    assert_eq!(r.error, Some(StatusError::Ok));

    let m = r.card_metadata.unwrap();
    assert_eq!(m.name, "My Keycard");
    assert_eq!(m.wallets.len(), 2);
    assert_eq!(m.wallets[1].path, "m/44'/60'/0'/0/7");
    assert!(m.wallets[1].address.is_empty());
}

#[tokio::test]
async fn get_metadata_resolves_addresses() {
    let card = card_with_keys().with_metadata(Metadata {
        name: "card".to_string(),
        wallets: vec![1],
    });
    let mut h = Harness::new(card.clone());

    let r = h
        .run(
            FlowType::GetMetadata,
            FlowParams {
                pin: Some(PIN.to_string()),
                resolve_addresses: Some(true),
                export_master_address: Some(true),
                ..Default::default()
            },
        )
        .await;
    assert_eq!(r.error, Some(StatusError::Ok));

    let key = card.public_key("m/44'/60'/0'/0/1").unwrap();
    let m = r.card_metadata.unwrap();
    assert_eq!(m.wallets[0].address, key.address);
    assert_eq!(m.wallets[0].public_key, key.public_key);

    assert_eq!(
        r.master_key_address,
        card.public_key("m").map(|k| k.address.clone())
    );
}

#[tokio::test]
async fn get_metadata_without_data() {
    let mut h = Harness::new(card_with_keys());

    let r = h.run(FlowType::GetMetadata, FlowParams::default()).await;
    assert_eq!(r.error, Some(StatusError::NoData));
    assert!(r.card_metadata.is_none());
}

#[tokio::test]
async fn get_metadata_without_keys() {
    let mut h = Harness::new(SimCard::initialized(PIN, PUK, PAIRING_PASS));

    let r = h.run(FlowType::GetMetadata, FlowParams::default()).await;
    assert_eq!(r.error, Some(StatusError::NoKeys));
}

#[tokio::test]
async fn store_metadata_invalid_values() {
    let card = card_with_keys();
    let mut h = Harness::new(card.clone());

    h.start(
        FlowType::StoreMetadata,
        FlowParams {
            pin: Some(PIN.to_string()),
            card_name: Some("a card name that is far too long".to_string()),
            wallet_paths: wallets(&["m/44'/60'/0'/1/0"]),
            ..Default::default()
        },
    );

    let s = h.expect(Action::EnterCardName).await;
    assert_eq!(s.error, Some(StatusError::StoringMetadata));

    h.resume(FlowParams {
        card_name: Some("short".to_string()),
        ..Default::default()
    });

    // Wallets must be direct children of the wallet root
    let s = h.expect(Action::EnterWallets).await;
    assert_eq!(s.error, Some(StatusError::StoringMetadata));

    h.resume(FlowParams {
        wallet_paths: wallets(&["m/44'/60'/0'/0/2"]),
        ..Default::default()
    });

    assert_eq!(h.result().await.error, Some(StatusError::Ok));
    assert_eq!(card.metadata().map(|m| m.wallets), Some(vec![2]));
}
