//! End-to-end scenarios driving real `Election` instances (Send Worker,
//! Receive Worker, and Election Core all running) over an in-memory
//! `ChannelTransport`.

mod common;

use std::sync::Arc;
use std::thread;

use fast_leader_election::{Config, Election};

use common::{ChannelTransport, TestPeerContext};

#[test]
fn three_peer_cold_start_elects_the_highest_sid() {
    let ids = [1, 2, 3];
    let transports = ChannelTransport::cluster(&ids);

    let elections: Vec<Arc<Election>> = ids
        .iter()
        .map(|&id| {
            let ctx = Arc::new(TestPeerContext::new(id, 0, &ids));
            Arc::new(Election::start(Config::default(), ctx, transports[&id].clone()))
        })
        .collect();

    let handles: Vec<_> = elections
        .iter()
        .cloned()
        .map(|e| thread::spawn(move || e.look_for_leader()))
        .collect();

    for h in handles {
        let vote = h.join().unwrap().expect("election should commit");
        assert_eq!(vote.leader_id, 3);
    }
}

#[test]
fn higher_zxid_breaks_the_tie_among_cold_start_peers() {
    let ids = [1, 2, 3];
    let transports = ChannelTransport::cluster(&ids);
    // Peer 2 is ahead on its log; everyone else starts from scratch.
    let zxids = [(1, 0i64), (2, 42), (3, 0)];

    let elections: Vec<Arc<Election>> = zxids
        .iter()
        .map(|&(id, zxid)| {
            let ctx = Arc::new(TestPeerContext::new(id, zxid, &ids));
            Arc::new(Election::start(Config::default(), ctx, transports[&id].clone()))
        })
        .collect();

    let handles: Vec<_> = elections
        .iter()
        .cloned()
        .map(|e| thread::spawn(move || e.look_for_leader()))
        .collect();

    for h in handles {
        let vote = h.join().unwrap().expect("election should commit");
        assert_eq!(vote.leader_id, 2);
        assert_eq!(vote.zxid, 42);
    }
}

#[test]
fn late_joiner_follows_an_already_elected_leader() {
    let ids = [1, 2, 3];
    let transports = ChannelTransport::cluster(&ids);

    // Peers 1 and 2 elect a leader between themselves first (tie on zxid,
    // so the higher sid, 2, wins).
    let early_ids = [1, 2];
    let early: Vec<Arc<Election>> = early_ids
        .iter()
        .map(|&id| {
            let ctx = Arc::new(TestPeerContext::new(id, 0, &ids));
            Arc::new(Election::start(Config::default(), ctx, transports[&id].clone()))
        })
        .collect();

    let early_handles: Vec<_> = early.iter().cloned().map(|e| thread::spawn(move || e.look_for_leader())).collect();
    for h in early_handles {
        let vote = h.join().unwrap().expect("early quorum should commit");
        assert_eq!(vote.leader_id, 2);
    }

    // Peer 3 joins afterwards; it should fall in behind the standing
    // leader rather than forcing a fresh round.
    let ctx3 = Arc::new(TestPeerContext::new(3, 0, &ids));
    let late = Election::start(Config::default(), ctx3, transports[&3].clone());
    let vote = late.look_for_leader().expect("late joiner should commit");
    assert_eq!(vote.leader_id, 2);

    // Keep the early peers' Elections alive until the joiner is done so
    // their Receive Workers are still around to answer it.
    drop(early);
}
