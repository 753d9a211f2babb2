//! Trust bootstrap choreography.
//!
//! The full chicken-and-egg sequence: a party's first feed admits itself
//! through the genesis credential, later members and feeds chain off it, and
//! data flows only once attribution is possible.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{frame, TestParty};
    use echo_pipeline::PipelineEvent;
    use shared_types::FeedMessage;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_genesis_establishes_feed_and_member() {
        let party = TestParty::new();
        let genesis_feed = party.bootstrap().await;
        let genesis_key = *genesis_feed.key();

        party
            .pipeline
            .wait_until_reached(&frame(genesis_key, 0))
            .await;

        assert!(party.pipeline.genesis_found());
        assert_eq!(party.pipeline.member_keys(), vec![party.identity]);
        assert_eq!(party.pipeline.feed_keys(), vec![genesis_key]);
        assert_eq!(
            party.pipeline.feed_owner(&genesis_key),
            Some(party.identity)
        );
        party.pipeline.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_delegated_member_admits_own_feed() {
        let mut party = TestParty::new();
        let genesis_feed = party.bootstrap().await;
        let genesis_key = *genesis_feed.key();

        // A second member admitted by the first, then a device key signing
        // on the member's behalf through a delegation chain.
        let member = party.keyring.generate();
        let device = party.keyring.generate();
        party
            .pipeline
            .write_credential(party.key_admit(member, &party.identity))
            .unwrap();

        let member_feed_key = party.keyring.generate();
        let delegation = party.keyring.delegate(&device, &member).unwrap();
        let admit = party
            .keyring
            .sign_credential_with_chain(
                shared_types::Credential::FeedAdmit {
                    party_key: party.party_key,
                    feed_key: member_feed_key,
                    identity_key: member,
                },
                &device,
                vec![delegation],
            )
            .unwrap();
        party.pipeline.write_credential(admit).unwrap();

        // The admitted feed carries a mutation depending on the admission.
        let member_feed = party.feed_store.open_read_only(member_feed_key);
        member_feed.replicate(FeedMessage::echo(
            frame(genesis_key, 2),
            b"from-member".to_vec(),
        ));

        let record = party.recv().await;
        assert_eq!(record.feed_key, member_feed_key);
        assert_eq!(record.member, member);
        assert_eq!(record.payload, b"from-member");

        let mut members = vec![party.identity, member];
        members.sort();
        assert_eq!(party.pipeline.member_keys(), members);
        party.pipeline.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_credential_before_genesis_never_applies() {
        let party = TestParty::new();
        let writable = party.provider.create_or_open_writable_feed().await.unwrap();
        let genesis_key = *writable.key();
        party.pipeline.set_write_feed(writable.clone()).unwrap();

        // Write a self-signed admission first; it precedes genesis on the
        // same feed, so the iterator cannot even deliver genesis until the
        // intruding entry has been consumed and rejected.
        let stranger = party.keyring.generate();
        let premature = party.key_admit(stranger, &stranger);
        writable.append(FeedMessage::halo(premature)).unwrap();
        party
            .pipeline
            .write_credential(party.genesis(genesis_key))
            .unwrap();
        party.pipeline.open(genesis_key).await.unwrap();

        // The head of the feed is not a genesis credential, so the selector
        // holds everything back: the party never bootstraps.
        let mut events = party.pipeline.subscribe();
        let stalled = timeout(Duration::from_secs(1), async {
            loop {
                if let Ok(PipelineEvent::Stalled(diag)) = events.recv().await {
                    break diag;
                }
            }
        })
        .await
        .expect("expected a stall");
        assert_eq!(stalled.candidates, vec![(genesis_key, 0)]);
        assert!(!party.pipeline.genesis_found());
        assert!(party.pipeline.member_keys().is_empty());
        party.pipeline.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_admission_events_reach_subscribers() {
        let party = TestParty::new();
        let mut events = party.pipeline.subscribe();
        let genesis_feed = party.bootstrap().await;
        let genesis_key = *genesis_feed.key();
        party
            .pipeline
            .wait_until_reached(&frame(genesis_key, 0))
            .await;

        let mut member_admitted = false;
        let mut feed_admitted = false;
        while let Ok(event) = events.try_recv() {
            match event {
                PipelineEvent::MemberAdmitted { identity, .. } => {
                    assert_eq!(identity, party.identity);
                    member_admitted = true;
                }
                PipelineEvent::FeedAdmitted { feed_key, owner } => {
                    assert_eq!(feed_key, genesis_key);
                    assert_eq!(owner, party.identity);
                    feed_admitted = true;
                }
                _ => {}
            }
        }
        assert!(member_admitted);
        assert!(feed_admitted);
        party.pipeline.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_feed_admission_is_silent() {
        let party = TestParty::new();
        let genesis_feed = party.bootstrap().await;
        let genesis_key = *genesis_feed.key();
        party
            .pipeline
            .wait_until_reached(&frame(genesis_key, 0))
            .await;

        let mut events = party.pipeline.subscribe();
        party
            .pipeline
            .write_credential(party.feed_admit(genesis_key, party.identity))
            .unwrap();
        party
            .pipeline
            .wait_until_reached(&frame(genesis_key, 1))
            .await;

        while let Ok(event) = events.try_recv() {
            assert!(
                !matches!(event, PipelineEvent::FeedAdmitted { .. }),
                "re-admission must not fire a duplicate event"
            );
        }
        assert_eq!(party.pipeline.feed_keys(), vec![genesis_key]);
        party.pipeline.close().await.unwrap();
    }
}
