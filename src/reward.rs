//! Reward shaping from successive state frames.
//!
//! The signal has three parts: a bonus per score point gained, a
//! shaping term that pays +1 per cell of progress toward the apple
//! (and -1 per cell of regress), and a flat penalty on a death frame.
//! Baselines persist across steps and reset with the environment.

use crate::config::RewardConfig;
use crate::protocol::Snapshot;

/// Tracks the score and apple-distance baselines between steps
#[derive(Debug)]
pub struct RewardTracker {
    config: RewardConfig,
    prev_score: u32,
    /// None until the first frame after a reset: the first step sets the
    /// baseline and contributes no distance delta
    prev_distance: Option<i32>,
}

impl RewardTracker {
    pub fn new(config: RewardConfig) -> Self {
        Self {
            config,
            prev_score: 0,
            prev_distance: None,
        }
    }

    /// Forget the baselines. The next update starts a fresh episode.
    pub fn reset(&mut self) {
        self.prev_score = 0;
        self.prev_distance = None;
    }

    /// Compute the reward for a frame and advance the baselines
    pub fn update(&mut self, snapshot: &Snapshot) -> i32 {
        let own = snapshot.own_player();
        let distance = own.head.manhattan(snapshot.apple);

        let score_delta = own.score as i32 - self.prev_score as i32;
        let distance_delta = self.prev_distance.map_or(0, |prev| prev - distance);

        let mut reward = score_delta * self.config.apple_bonus + distance_delta;
        if !own.alive {
            reward -= self.config.death_penalty;
        }

        self.prev_score = own.score;
        self.prev_distance = Some(distance);
        reward
    }
}
