//! Send Worker: dequeues outbound notifications, encodes them, and hands
//! them to the Transport addressed to a specific peer id.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use log::trace;

use crate::iface::Transport;
use crate::message::ToSend;

const POLL_TIMEOUT: Duration = Duration::from_secs(3);

/// Runs the Send Worker's blocking loop until `stop` is set or the
/// outbound channel disconnects (the Election Core dropped its sender).
pub fn run(outbound: Receiver<ToSend>, transport: Arc<dyn Transport>, stop: Arc<AtomicBool>) {
    loop {
        if stop.load(Ordering::Acquire) {
            return;
        }
        match outbound.recv_timeout(POLL_TIMEOUT) {
            Ok(item) => {
                let recipient = item.recipient_sid;
                let frame = item.encode();
                trace!("sending notification to {}", recipient);
                transport.send_to(recipient, frame);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vote::PeerState;
    use std::collections::HashMap;
    use std::sync::mpsc::{channel, Sender};
    use std::sync::Mutex;
    use std::thread;

    struct RecordingTransport {
        sent: Mutex<HashMap<u64, Vec<u8>>>,
    }

    impl Transport for RecordingTransport {
        fn send_to(&self, sid: u64, frame: Vec<u8>) {
            self.sent.lock().unwrap().insert(sid, frame);
        }
        fn poll_recv(&self, _timeout: Duration) -> Option<(u64, Vec<u8>)> {
            None
        }
        fn have_delivered(&self) -> bool {
            true
        }
        fn connect_all(&self) {}
        fn halt(&self) {}
    }

    #[test]
    fn encodes_and_forwards_to_recipient() {
        let transport = Arc::new(RecordingTransport { sent: Mutex::new(HashMap::new()) });
        let (tx, rx): (Sender<ToSend>, Receiver<ToSend>) = channel();
        let stop = Arc::new(AtomicBool::new(false));
        let t2 = transport.clone();
        let stop2 = stop.clone();
        let handle = thread::spawn(move || run(rx, t2, stop2));

        tx.send(ToSend {
            recipient_sid: 2,
            leader_sid: 1,
            zxid: 5,
            election_epoch: 3,
            peer_epoch: 1,
            sender_state: PeerState::Looking,
            config_bytes: vec![],
        })
        .unwrap();

        // Give the worker a moment to process, then shut it down.
        thread::sleep(Duration::from_millis(50));
        stop.store(true, Ordering::Release);
        drop(tx);
        handle.join().unwrap();

        assert!(transport.sent.lock().unwrap().contains_key(&2));
    }
}
