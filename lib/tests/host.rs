// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::time::Duration;

use keycard_flow::{
    open, Config, EnvelopeSink, FilePairingStore, FlowParams, FlowType, PairingStore,
};
use keycard_sim::SimReader;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

mod helpers;
use helpers::*;

async fn next_envelope(rx: &mut UnboundedReceiver<String>) -> serde_json::Value {
    let s = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timeout waiting for signal")
        .expect("signal channel closed");

    serde_json::from_str(&s).unwrap()
}

#[tokio::test]
async fn login_with_file_store() -> anyhow::Result<()> {
    setup_logging();

    let d = tempfile::tempdir()?;
    let config = Config {
        pairings_file: d.path().join("pairings.json"),
        insert_card_delay_ms: 20,
        ..Default::default()
    };

    let card = card_with_keys();
    let reader = SimReader::with_card(card.clone());

    let (tx, mut rx) = unbounded_channel();
    let flow = open(&config, reader.clone(), EnvelopeSink::new(move |s| {
        let _ = tx.send(s);
    }))?;

    flow.start(FlowType::Login, FlowParams::from_json("{}")?)?;

    let v = next_envelope(&mut rx).await;
    assert_eq!(v["type"], "enter-pin");
    assert_eq!(v["event"]["error"], "");
    assert_eq!(v["event"]["instance-uid"], card.instance_uid().as_str());
    assert_eq!(v["event"]["pin-retries"], 3);

    flow.resume(FlowParams::from_json(&format!(r#"{{"pin": "{PIN}"}}"#))?)?;

    let v = next_envelope(&mut rx).await;
    assert_eq!(v["type"], "flow-result");
    assert_eq!(v["event"]["error"], "ok");
    assert_eq!(v["event"]["key-uid"], card.key_uid().as_str());
    assert!(v["event"]["encryption-key"]["privateKey"].is_string());

    // Pairing persisted for future sessions
    let store = FilePairingStore::open(&config.pairings_file)?;
    let pairing = store.get(&card.instance_uid()).unwrap();
    assert_eq!(pairing.index, 0);

    Ok(())
}

#[tokio::test]
async fn config_file() -> anyhow::Result<()> {
    let d = tempfile::tempdir()?;
    let path = d.path().join("keycard.toml");

    std::fs::write(
        &path,
        r#"
        pairings-file = "/tmp/keycard-pairings.json"
        insert-card-delay-ms = 500
        "#,
    )?;

    let c = Config::load(&path)?;
    assert_eq!(
        c.pairings_file,
        std::path::PathBuf::from("/tmp/keycard-pairings.json")
    );
    assert_eq!(c.flow_config().insert_card_delay, Duration::from_millis(500));

    std::fs::write(&path, "insert-card-delay-ms = \"soon\"")?;
    assert!(matches!(
        Config::load(&path),
        Err(keycard_flow::Error::Config(_))
    ));

    Ok(())
}
