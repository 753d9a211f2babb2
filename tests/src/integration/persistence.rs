//! Metadata survival across restarts.
//!
//! The metadata store is a cache over the feeds. It must bring a party back
//! to its own writable feed after a restart, and shrug off corruption by
//! falling back to empty state.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{frame, CollectSink, TestParty};
    use echo_feeds::{FeedStore, MetadataStore, PartyFeedProvider};
    use echo_pipeline::{Pipeline, PipelineConfig};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_writable_feed_reopens_after_restart() {
        let party = TestParty::new();
        let first_key = {
            let feed = party.provider.create_or_open_writable_feed().await.unwrap();
            *feed.key()
        };

        // Restart: fresh metadata store over the same path, fresh feed
        // store, same keyring.
        let metadata = Arc::new(MetadataStore::new(party.metadata.path().to_path_buf()));
        metadata.load().await.unwrap();
        let provider = PartyFeedProvider::new(
            party.party_key,
            metadata,
            party.keyring.clone(),
            Arc::new(FeedStore::new()),
        );
        let reopened = provider.create_or_open_writable_feed().await.unwrap();
        assert_eq!(*reopened.key(), first_key);
        assert!(reopened.writable());
    }

    #[tokio::test]
    async fn test_corrupt_metadata_falls_back_to_empty() {
        let party = TestParty::new();
        let first_key = {
            let feed = party.provider.create_or_open_writable_feed().await.unwrap();
            *feed.key()
        };

        let path = party.metadata.path().to_path_buf();
        tokio::fs::write(&path, b"\xff\xff\xff\xffgarbage")
            .await
            .unwrap();

        let metadata = Arc::new(MetadataStore::new(path));
        metadata.load().await.unwrap();
        assert!(metadata.parties().is_empty());

        // With the record gone, a restart mints a new feed identity; the
        // old feed's entries remain reachable through replication.
        let provider = PartyFeedProvider::new(
            party.party_key,
            metadata,
            party.keyring.clone(),
            Arc::new(FeedStore::new()),
        );
        let minted = provider.create_or_open_writable_feed().await.unwrap();
        assert_ne!(*minted.key(), first_key);
    }

    #[tokio::test]
    async fn test_close_persists_genesis_feed_and_timeframe() {
        let party = TestParty::new();
        let genesis_feed = party.bootstrap().await;
        let genesis_key = *genesis_feed.key();
        party
            .pipeline
            .wait_until_reached(&frame(genesis_key, 0))
            .await;
        party.pipeline.close().await.unwrap();

        let record = party.metadata.party(&party.party_key).expect("party record");
        assert_eq!(record.genesis_feed_key, Some(genesis_key));
        assert_eq!(record.data_feed_key, Some(genesis_key));
        assert_eq!(record.latest_timeframe.get(&genesis_key), Some(0));

        // And the record survives a reload from disk.
        let reloaded = MetadataStore::new(party.metadata.path().to_path_buf());
        reloaded.load().await.unwrap();
        let record = reloaded.party(&party.party_key).expect("reloaded record");
        assert_eq!(record.latest_timeframe.get(&genesis_key), Some(0));
    }

    #[tokio::test]
    async fn test_restart_resumes_from_persisted_timeframe() {
        let mut party = TestParty::new();
        let genesis_feed = party.bootstrap().await;
        let genesis_key = *genesis_feed.key();
        let seq = party.pipeline.write_mutation(b"first".to_vec()).unwrap();
        let first = party.recv().await;
        assert_eq!(first.seq, seq);
        party.pipeline.close().await.unwrap();

        // Restart over the same storage: a snapshot is the supported resume
        // path, but the persisted timeframe alone tells the caller where
        // consumption left off.
        let record = party.metadata.party(&party.party_key).expect("record");
        assert_eq!(record.latest_timeframe.get(&genesis_key), Some(seq));

        let snapshot = party.pipeline.create_snapshot(None);
        let (tx, mut delivered) = mpsc::unbounded_channel();
        let restored = Pipeline::new(
            party.provider.clone(),
            Arc::new(CollectSink::new(tx)),
            PipelineConfig::default(),
        );
        restored.restore_from_snapshot(snapshot).unwrap();
        restored.open(genesis_key).await.unwrap();
        restored.set_write_feed(genesis_feed.clone()).unwrap();

        let next_seq = restored.write_mutation(b"second".to_vec()).unwrap();
        let record = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            delivered.recv(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(record.seq, next_seq);
        assert_eq!(record.payload, b"second");
        restored.close().await.unwrap();
    }
}
