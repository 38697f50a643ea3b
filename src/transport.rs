//! Transport worker: owns the UDP socket and bridges it to the facade.
//!
//! One worker thread per environment. It multiplexes two sources:
//!
//! - the command inbox (unbounded FIFO, written by the facade), drained
//!   first each iteration because commands are latency-sensitive;
//! - the UDP socket, polled with a short read timeout.
//!
//! Received datagrams are de-duplicated against the previously published
//! bytes and handed to the facade through a single-slot mailbox
//! (`bounded(1)` channel written with `try_send`). When the mailbox is
//! full the frame is dropped, not queued: only the latest state is ever
//! useful to the controller, so staleness beats buffering. A dropped
//! frame is also not recorded as "last seen", so its retransmission can
//! still be published once the slot frees up.
//!
//! The worker is fail-fast: a send or receive error stops the loop. On
//! exit it drops its channel endpoints, so the facade observes
//! termination as a disconnect instead of blocking forever.
//!
//! State machine: Starting -> Running -> Stopped. Starting covers socket
//! setup and the initial `Start` send, which happen synchronously in
//! [`TransportHandle::connect`] so setup errors reach the caller. There
//! is no way back from Stopped; a new bridge must be constructed.

use crate::config::ConnectionConfig;
use crate::error::{BridgeError, Result};
use crate::protocol::Command;
use crossbeam_channel::{
    Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded, unbounded,
};
use std::io;
use std::net::UdpSocket;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Datagram size ceiling; server frames never exceed this
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Socket read timeout used as the multiplexing poll interval.
/// Bounds the worst-case latency of an enqueued command.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Facade-side handle to the transport worker
pub struct TransportHandle {
    cmd_tx: Sender<Command>,
    frame_rx: Receiver<Vec<u8>>,
    worker: Option<JoinHandle<()>>,
}

impl TransportHandle {
    /// Connect to the game server and spawn the worker thread.
    ///
    /// Sends the session-opening `Start` command before the worker
    /// starts, so connection problems surface here rather than as a dead
    /// worker later.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(config.address())?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        socket.set_write_timeout(Some(Duration::from_millis(config.socket_timeout_ms)))?;
        socket.send(Command::Start.token().as_bytes())?;

        tracing::info!("Transport connected to {}", config.address());

        let (cmd_tx, cmd_rx) = unbounded();
        let (frame_tx, frame_rx) = bounded(1);

        let worker = thread::Builder::new()
            .name("transport".into())
            .spawn(move || {
                let mut worker = TransportWorker {
                    socket,
                    cmd_rx,
                    frame_tx,
                    last_frame: None,
                };
                worker.run();
            })
            .expect("Failed to spawn transport thread");

        Ok(Self {
            cmd_tx,
            frame_rx,
            worker: Some(worker),
        })
    }

    /// Enqueue a command for delivery on the socket, in enqueue order
    pub fn send(&self, command: Command) -> Result<()> {
        self.cmd_tx
            .send(command)
            .map_err(|_| BridgeError::TransportTerminated)
    }

    /// Block until the worker publishes the next state frame.
    ///
    /// Takes and clears the mailbox slot. Fails with `Timeout` when no
    /// frame arrives in time and with `TransportTerminated` when the
    /// worker has stopped.
    pub fn recv_frame(&self, timeout: Duration) -> Result<Vec<u8>> {
        match self.frame_rx.recv_timeout(timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => Err(BridgeError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(BridgeError::TransportTerminated),
        }
    }

    /// Discard any frame still sitting in the mailbox
    pub fn drain(&self) {
        while self.frame_rx.try_recv().is_ok() {}
    }

    /// Best-effort shutdown: enqueue `Quit`, then wait up to `timeout`
    /// for the worker thread to finish. Never fails; a worker that does
    /// not stop in time is detached.
    pub fn shutdown(&mut self, timeout: Duration) {
        let _ = self.send(Command::Quit);

        let Some(worker) = self.worker.take() else {
            return;
        };
        let deadline = Instant::now() + timeout;
        while !worker.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        if worker.is_finished() {
            if worker.join().is_err() {
                tracing::error!("Transport thread panicked");
            }
        } else {
            tracing::warn!("Transport thread did not stop within {:?}, detaching", timeout);
        }
    }
}

/// The worker's half of the bridge: socket, inbox, mailbox
struct TransportWorker {
    socket: UdpSocket,
    cmd_rx: Receiver<Command>,
    frame_tx: Sender<Vec<u8>>,
    /// Bytes of the last published frame, for de-duplication
    last_frame: Option<Vec<u8>>,
}

impl TransportWorker {
    /// Run the worker main loop until quit, facade drop, or socket error
    fn run(&mut self) {
        tracing::debug!("Transport worker running");
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];

        let reason = loop {
            match self.drain_commands() {
                Ok(true) => {}
                Ok(false) => break "quit",
                Err(e) => {
                    tracing::error!("Command send failed: {}", e);
                    break "send failure";
                }
            }

            match self.poll_socket(&mut buf) {
                Ok(()) => {}
                Err(e) => {
                    tracing::error!("Socket receive failed: {}", e);
                    break "receive failure";
                }
            }
        };

        // Dropping our channel endpoints here is the observable Stopped
        // transition: the facade's next send/fetch fails fast
        tracing::info!("Transport worker stopped ({})", reason);
    }

    /// Drain the command inbox, sending each command verbatim.
    ///
    /// Returns `Ok(false)` when the loop must stop: `Quit` was processed
    /// (sent first, then terminal) or the facade dropped its handle.
    fn drain_commands(&mut self) -> io::Result<bool> {
        loop {
            match self.cmd_rx.try_recv() {
                Ok(command) => {
                    self.socket.send(command.token().as_bytes())?;
                    tracing::trace!("Sent command {:?}", command);
                    if command == Command::Quit {
                        return Ok(false);
                    }
                }
                Err(TryRecvError::Empty) => return Ok(true),
                Err(TryRecvError::Disconnected) => return Ok(false),
            }
        }
    }

    /// Wait up to the poll interval for a datagram, then de-duplicate
    /// and publish. Timeouts are normal; other receive errors are fatal.
    fn poll_socket(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let len = match self.socket.recv(buf) {
            Ok(len) => len,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let frame = buf[..len].to_vec();
        if self.last_frame.as_deref() == Some(frame.as_slice()) {
            return Ok(());
        }

        match self.frame_tx.try_send(frame.clone()) {
            Ok(()) => self.last_frame = Some(frame),
            Err(TrySendError::Full(_)) => {
                tracing::trace!("Mailbox full, dropped frame");
            }
            // Facade gone; the next drain_commands() sees the disconnect
            Err(TrySendError::Disconnected(_)) => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Worker wired to a local peer socket instead of a live server
    fn fixture() -> (TransportWorker, UdpSocket, Receiver<Vec<u8>>, Sender<Command>) {
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.connect(peer.local_addr().unwrap()).unwrap();
        peer.connect(socket.local_addr().unwrap()).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();

        let (cmd_tx, cmd_rx) = unbounded();
        let (frame_tx, frame_rx) = bounded(1);
        let worker = TransportWorker {
            socket,
            cmd_rx,
            frame_tx,
            last_frame: None,
        };
        (worker, peer, frame_rx, cmd_tx)
    }

    #[test]
    fn test_duplicate_datagram_published_once() {
        let (mut worker, peer, frame_rx, _cmd_tx) = fixture();

        peer.send(b"frame-a").unwrap();
        worker.poll_socket(&mut [0u8; MAX_DATAGRAM_SIZE]).unwrap();
        assert_eq!(frame_rx.try_recv().unwrap(), b"frame-a");

        // Mailbox is empty again; the identical datagram must be dropped
        peer.send(b"frame-a").unwrap();
        worker.poll_socket(&mut [0u8; MAX_DATAGRAM_SIZE]).unwrap();
        assert!(frame_rx.try_recv().is_err());
    }

    #[test]
    fn test_full_mailbox_drops_distinct_frame() {
        let (mut worker, peer, frame_rx, _cmd_tx) = fixture();
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];

        peer.send(b"frame-a").unwrap();
        worker.poll_socket(&mut buf).unwrap();

        // Distinct frame while the slot is occupied: dropped, not queued
        peer.send(b"frame-b").unwrap();
        worker.poll_socket(&mut buf).unwrap();

        assert_eq!(frame_rx.try_recv().unwrap(), b"frame-a");
        assert!(frame_rx.try_recv().is_err());

        // The dropped frame was not recorded as seen, so its
        // retransmission publishes now that the slot is free
        peer.send(b"frame-b").unwrap();
        worker.poll_socket(&mut buf).unwrap();
        assert_eq!(frame_rx.try_recv().unwrap(), b"frame-b");
    }

    #[test]
    fn test_quit_terminates_loop_after_send() {
        let (mut worker, peer, _frame_rx, cmd_tx) = fixture();
        peer.set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();

        cmd_tx.send(Command::Turn(crate::protocol::Direction::Up)).unwrap();
        cmd_tx.send(Command::Quit).unwrap();

        // Quit stops the drain, but both commands reach the wire first
        assert!(!worker.drain_commands().unwrap());

        let mut buf = [0u8; 16];
        let len = peer.recv(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"mu");
        let len = peer.recv(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"q");
    }

    #[test]
    fn test_facade_drop_terminates_loop() {
        let (mut worker, _peer, _frame_rx, cmd_tx) = fixture();
        drop(cmd_tx);
        assert!(!worker.drain_commands().unwrap());
    }

    #[test]
    fn test_commands_sent_in_enqueue_order() {
        let (mut worker, peer, _frame_rx, cmd_tx) = fixture();
        peer.set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();

        cmd_tx.send(Command::Start).unwrap();
        cmd_tx.send(Command::Reset).unwrap();
        assert!(worker.drain_commands().unwrap());

        let mut buf = [0u8; 16];
        let len = peer.recv(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"s");
        let len = peer.recv(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"r");
    }
}
