//! Synchronous environment facade over the transport bridge.
//!
//! This is the boundary a control loop talks to: `reset` and `step`
//! block until the next state frame, everything behind them (socket,
//! worker thread, de-duplication) stays hidden. The facade never hangs
//! indefinitely: the blocking fetch honors the configured step timeout,
//! and a stopped worker surfaces as `TransportTerminated` on the next
//! interaction.

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::observation::ObservationGrid;
use crate::protocol::{Command, Direction, Snapshot, encode_action};
use crate::reward::RewardTracker;
use crate::transport::TransportHandle;
use std::io::{self, Write};
use std::time::Duration;

/// Outcome of a single environment step
#[derive(Clone, Debug)]
pub struct Step {
    pub observation: ObservationGrid,
    pub reward: i32,
    /// Whether our snake died on this frame
    pub done: bool,
    /// Server-reported score, for logging and collaborators
    pub score: u32,
}

/// Step-based interface to a remote Netsnake server
pub struct SnakeEnv {
    config: BridgeConfig,
    transport: TransportHandle,
    grid: ObservationGrid,
    reward: RewardTracker,
    /// Heading from the last decoded frame, for the relative action
    /// policy. None until the first frame after connect/reset.
    heading: Option<Direction>,
    step_timeout: Duration,
    closed: bool,
}

impl SnakeEnv {
    /// Connect to the configured server and spawn the transport worker
    pub fn connect(config: BridgeConfig) -> Result<Self> {
        tracing::info!("Connecting to Netsnake server at {}", config.address());
        let transport = TransportHandle::connect(&config.connection)?;
        let grid = ObservationGrid::new(config.game.server_grid_size);
        let reward = RewardTracker::new(config.reward.clone());
        let step_timeout = Duration::from_millis(config.connection.step_timeout_ms);

        Ok(Self {
            config,
            transport,
            grid,
            reward,
            heading: None,
            step_timeout,
            closed: false,
        })
    }

    /// Number of discrete actions under the configured policy
    pub fn action_space(&self) -> usize {
        self.config.game.action_set.size()
    }

    /// Start a fresh episode and return its first observation.
    ///
    /// Drops any stale buffered frame, clears the reward baselines, asks
    /// the server for a restart, and blocks for the first frame of the
    /// new episode.
    pub fn reset(&mut self) -> Result<&ObservationGrid> {
        self.transport.drain();
        self.reward.reset();
        self.heading = None;

        // A freshly (re)started server may have dropped the session, so
        // open one before asking for the reset
        self.transport.send(Command::Start)?;
        self.transport.send(Command::Reset)?;

        let snapshot = self.fetch()?;
        self.grid.rebuild(&snapshot);
        Ok(&self.grid)
    }

    /// Apply one action and block for the resulting state.
    ///
    /// The action is validated against the configured action space
    /// before anything touches the transport; the no-op action produces
    /// no wire traffic at all.
    pub fn step(&mut self, action: usize) -> Result<Step> {
        let command = encode_action(self.config.game.action_set, action, self.heading)?;
        if let Some(command) = command {
            self.transport.send(command)?;
        }

        let snapshot = self.fetch()?;
        let reward = self.reward.update(&snapshot);
        self.grid.rebuild(&snapshot);

        let own = snapshot.own_player();
        Ok(Step {
            observation: self.grid.clone(),
            reward,
            done: !own.alive,
            score: own.score,
        })
    }

    /// Render the last observation into `sink`. No state mutation.
    pub fn render(&self, sink: &mut impl Write) -> io::Result<()> {
        self.grid.render(sink)
    }

    /// Tear the bridge down: enqueue `Quit` and wait (bounded) for the
    /// worker to stop. Best-effort and idempotent; never fails.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let timeout = Duration::from_millis(self.config.connection.shutdown_timeout_ms);
        self.transport.shutdown(timeout);
        tracing::info!("Environment closed");
    }

    /// Blocking fetch: next de-duplicated frame, decoded.
    ///
    /// `MalformedFrame` propagates to the caller, which may treat it as
    /// a missed tick and simply step again.
    fn fetch(&mut self) -> Result<Snapshot> {
        let frame = self.transport.recv_frame(self.step_timeout)?;
        let snapshot = Snapshot::decode(&frame)?;
        self.heading = Some(snapshot.own_player().heading);
        Ok(snapshot)
    }
}

impl Drop for SnakeEnv {
    fn drop(&mut self) {
        self.close();
    }
}
