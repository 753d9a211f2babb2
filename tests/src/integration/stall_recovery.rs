//! Stall and recovery scenarios.
//!
//! A stall is a normal operating state: the iterator simply has nothing
//! eligible. These tests drive a pipeline into a stall, watch the diagnostic
//! fire, then resolve the stall and verify nothing is lost or duplicated.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{frame, TestParty};
    use echo_pipeline::PipelineEvent;
    use shared_types::{FeedMessage, Timeframe};
    use std::time::Duration;
    use tokio::time::timeout;

    async fn expect_stall(
        events: &mut tokio::sync::broadcast::Receiver<PipelineEvent>,
    ) -> echo_pipeline::StallDiagnostics {
        timeout(Duration::from_secs(1), async {
            loop {
                if let Ok(PipelineEvent::Stalled(diag)) = events.recv().await {
                    break diag;
                }
            }
        })
        .await
        .expect("expected a stall diagnostic")
    }

    #[tokio::test]
    async fn test_dependency_on_untracked_feed_stalls_then_recovers() {
        let mut party = TestParty::new();
        let genesis_feed = party.bootstrap().await;
        let genesis_key = *genesis_feed.key();
        party
            .pipeline
            .wait_until_reached(&frame(genesis_key, 0))
            .await;

        // An admitted feed carries an entry depending on a feed the party
        // has never heard of.
        let blocked_key = party.keyring.generate();
        let missing_key = party.keyring.generate();
        party
            .pipeline
            .write_credential(party.feed_admit(blocked_key, party.identity))
            .unwrap();
        let blocked_feed = party.feed_store.open_read_only(blocked_key);
        blocked_feed.replicate(FeedMessage::echo(frame(missing_key, 0), b"blocked".to_vec()));

        let mut events = party.pipeline.subscribe();
        let diag = expect_stall(&mut events).await;
        assert_eq!(diag.candidates, vec![(blocked_key, 0)]);
        party.assert_nothing_delivered().await;

        // Admitting and filling the missing feed resolves the stall; the
        // missing entry is delivered first, the blocked entry exactly once.
        party
            .pipeline
            .write_credential(party.feed_admit(missing_key, party.identity))
            .unwrap();
        let missing_feed = party.feed_store.open_read_only(missing_key);
        missing_feed.replicate(FeedMessage::echo(Timeframe::new(), b"missing".to_vec()));

        let first = party.recv().await;
        assert_eq!(first.feed_key, missing_key);
        assert_eq!(first.payload, b"missing");
        let second = party.recv().await;
        assert_eq!(second.feed_key, blocked_key);
        assert_eq!(second.payload, b"blocked");
        party.assert_nothing_delivered().await;
        party.pipeline.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_pre_genesis_credentials_wait_for_genesis_on_other_feed() {
        let party = TestParty::new();
        let writable = party.provider.create_or_open_writable_feed().await.unwrap();
        let genesis_key = *writable.key();
        party.pipeline.set_write_feed(writable.clone()).unwrap();

        // Another feed is already tracked and full of credentials, but the
        // genesis has not been written anywhere yet.
        let other_key = party.keyring.generate();
        party
            .provider
            .create_or_open_readonly_feed(other_key)
            .await
            .unwrap();
        let other = party.feed_store.open_read_only(other_key);
        let member = party.keyring.generate();
        other.replicate(FeedMessage::halo(party.key_admit(member, &party.identity)));

        party.pipeline.open(genesis_key).await.unwrap();
        let mut events = party.pipeline.subscribe();
        expect_stall(&mut events).await;
        assert!(!party.pipeline.genesis_found());

        // Genesis lands on the writable feed; the stalled credential is
        // then processed and the member admitted.
        party
            .pipeline
            .write_credential(party.genesis(genesis_key))
            .unwrap();
        let barrier = frame(genesis_key, 0).merged(&frame(other_key, 0));
        party.pipeline.wait_until_reached(&barrier).await;

        assert!(party.pipeline.genesis_found());
        let mut members = vec![party.identity, member];
        members.sort();
        assert_eq!(party.pipeline.member_keys(), members);
        party.pipeline.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_pipeline_reports_empty_stall() {
        let party = TestParty::new();
        let writable = party.provider.create_or_open_writable_feed().await.unwrap();
        let genesis_key = *writable.key();
        party.pipeline.set_write_feed(writable.clone()).unwrap();

        // Nothing to consume at all still counts as a stall; the diagnostic
        // just has no candidates to name.
        party.pipeline.open(genesis_key).await.unwrap();
        let mut events = party.pipeline.subscribe();
        let diag = expect_stall(&mut events).await;
        assert!(diag.candidates.is_empty());
        party.pipeline.close().await.unwrap();
    }
}
