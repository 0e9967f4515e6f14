// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Simulated card reader

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use tokio::sync::watch;

use keycard_card::{CardError, Connector};

use crate::{SimCard, SimSession};

/// Reader slot contents
#[derive(Clone, Debug)]
pub(crate) enum Slot {
    /// No reader attached
    NoReader,
    /// Reader attached, no card inserted
    Empty,
    /// Card inserted
    Card(SimCard),
}

/// Simulated reader, cards may be inserted and removed while
/// a flow is running
#[derive(Clone, Debug)]
pub struct SimReader {
    slot: Arc<watch::Sender<Slot>>,
}

impl SimReader {
    /// Create an empty reader
    pub fn new() -> Self {
        Self::with_slot(Slot::Empty)
    }

    /// Create a reader with a card inserted
    pub fn with_card(card: SimCard) -> Self {
        Self::with_slot(Slot::Card(card))
    }

    /// Simulate a missing reader, connection attempts fail
    pub fn without_reader() -> Self {
        Self::with_slot(Slot::NoReader)
    }

    fn with_slot(slot: Slot) -> Self {
        let (tx, _rx) = watch::channel(slot);
        Self { slot: Arc::new(tx) }
    }

    /// Insert a card, replacing any present card
    pub fn insert(&self, card: SimCard) {
        debug!("Card inserted");
        self.slot.send_replace(Slot::Card(card));
    }

    /// Remove the inserted card
    pub fn remove(&self) {
        debug!("Card removed");
        self.slot.send_replace(Slot::Empty);
    }

    /// Fetch the inserted card
    pub fn card(&self) -> Option<SimCard> {
        match &*self.slot.borrow() {
            Slot::Card(c) => Some(c.clone()),
            _ => None,
        }
    }

    /// Check whether `card` is still inserted
    pub(crate) fn holds(&self, card: &SimCard) -> bool {
        matches!(&*self.slot.borrow(), Slot::Card(c) if c.same(card))
    }
}

impl Default for SimReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for SimReader {
    type Session = SimSession;

    async fn connect(&self) -> Result<Self::Session, CardError> {
        let mut rx = self.slot.subscribe();

        loop {
            let card = match &*rx.borrow_and_update() {
                Slot::NoReader => return Err(CardError::NoReader),
                Slot::Empty => None,
                Slot::Card(c) => Some(c.clone()),
            };

            if let Some(card) = card {
                return Ok(SimSession::new(self.clone(), card));
            }

            rx.changed().await.map_err(|_| CardError::NoReader)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn connect_waits_for_card() {
        let reader = SimReader::new();

        let r = reader.clone();
        let h = tokio::task::spawn(async move { r.connect().await.map(|_| ()) });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!h.is_finished());

        reader.insert(SimCard::blank());

        let r = tokio::time::timeout(Duration::from_secs(1), h).await;
        assert!(matches!(r, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn missing_reader() {
        let reader = SimReader::without_reader();
        assert!(matches!(reader.connect().await, Err(CardError::NoReader)));
    }

    #[test]
    fn insert_and_remove() {
        let reader = SimReader::new();
        let card = SimCard::blank();

        reader.insert(card.clone());
        assert!(reader.holds(&card));
        assert!(!reader.holds(&SimCard::blank()));

        reader.remove();
        assert!(reader.card().is_none());
    }
}
