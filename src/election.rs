//! Top-level wiring: spawns the Send Worker, Receive Worker, and holds
//! the Election Core, exposing the contract from spec.md §6
//! (`look_for_leader`, `shutdown`, `start`, `get_vote`, `get_logical_clock`).

use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::Config;
use crate::core::ElectionCore;
use crate::iface::{PeerContext, Transport};
use crate::queue::InboundQueue;
use crate::recv_worker::ReceiveWorker;
use crate::send_worker;
use crate::vote::Vote;

/// A running election subsystem for one peer: three execution contexts
/// (Send Worker, Receive Worker, and whichever thread calls
/// `look_for_leader`) sharing the inbound/outbound queues and the
/// logical clock.
pub struct Election {
    core: Arc<ElectionCore>,
    transport: Arc<dyn Transport>,
    stop: Arc<AtomicBool>,
    send_thread: Option<JoinHandle<()>>,
    recv_thread: Option<JoinHandle<()>>,
}

impl Election {
    pub fn start(config: Config, ctx: Arc<dyn PeerContext>, transport: Arc<dyn Transport>) -> Election {
        let (outbound_tx, outbound_rx) = channel();
        let inbound = Arc::new(InboundQueue::new());
        let logical_clock = Arc::new(AtomicU64::new(0));
        let abort_flag = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));

        let core = Arc::new(ElectionCore::new(
            config,
            ctx.clone(),
            transport.clone(),
            outbound_tx.clone(),
            inbound.clone(),
            logical_clock.clone(),
            abort_flag.clone(),
            stop.clone(),
        ));

        let send_thread = {
            let transport = transport.clone();
            let stop = stop.clone();
            thread::Builder::new()
                .name("fle-send".into())
                .spawn(move || send_worker::run(outbound_rx, transport, stop))
                .expect("failed to spawn send worker thread")
        };

        let recv_thread = {
            let worker = ReceiveWorker::new(transport.clone(), ctx, inbound, outbound_tx, abort_flag, logical_clock);
            let stop = stop.clone();
            thread::Builder::new()
                .name("fle-recv".into())
                .spawn(move || worker.run(stop))
                .expect("failed to spawn receive worker thread")
        };

        Election {
            core,
            transport,
            stop,
            send_thread: Some(send_thread),
            recv_thread: Some(recv_thread),
        }
    }

    /// Runs one election attempt. Call repeatedly (the outer driver loop
    /// owns re-entry after an abort) until it returns a committed Vote.
    pub fn look_for_leader(&self) -> Option<Vote> {
        self.core.look_for_leader()
    }

    pub fn get_vote(&self) -> Vote {
        self.core.get_vote()
    }

    pub fn get_logical_clock(&self) -> u64 {
        self.core.get_logical_clock()
    }

    /// Signals all three execution contexts to stop and tears down the
    /// Transport. Workers exit at their next poll timeout (<=3s).
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
        self.core.shutdown();
        self.transport.halt();
    }
}

impl Drop for Election {
    /// Blocks until both worker threads exit. Mirrors the teacher's
    /// `PeerHandle` drop discipline: a background thread is joined, not
    /// abandoned.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(t) = mem::replace(&mut self.send_thread, None) {
            let _ = t.join();
        }
        if let Some(t) = mem::replace(&mut self.recv_thread, None) {
            let _ = t.join();
        }
    }
}
