use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::game::CELLS;

/// Linear epsilon decay for self-play training.
///
/// `epsilon = start + min(1, steps / decay_steps) * (end - start)`, held at
/// exactly `end` once `steps >= decay_steps`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonSchedule {
    pub start: f32,
    pub end: f32,
    pub decay_steps: usize,
}

impl EpsilonSchedule {
    pub fn new(start: f32, end: f32, decay_steps: usize) -> Self {
        EpsilonSchedule {
            start,
            end,
            decay_steps,
        }
    }

    pub fn at(&self, steps: usize) -> f32 {
        if steps >= self.decay_steps {
            return self.end;
        }
        let progress = steps as f32 / self.decay_steps as f32;
        self.start + progress * (self.end - self.start)
    }
}

/// Serving skill tier. Each tier pins a fixed exploration rate that play
/// never advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    #[default]
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn epsilon(self) -> f32 {
        match self {
            Difficulty::Easy => 0.40,
            Difficulty::Medium => 0.15,
            Difficulty::Hard => 0.05,
        }
    }

    /// Parse a tier name; unknown names fall back to the most exploitative
    /// tier.
    pub fn from_name(name: &str) -> Difficulty {
        match name.trim().to_ascii_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Difficulty::from_name(s))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Highest-valued action among `valid`, ties going to the lowest index.
pub fn masked_argmax(q_values: &[f32], valid: impl IntoIterator<Item = usize>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for action in valid {
        let q = q_values[action];
        match best {
            Some((best_action, best_q)) if q < best_q || (q == best_q && action > best_action) => {}
            _ => best = Some((action, q)),
        }
    }
    best.map(|(action, _)| action)
}

/// Indices set in a mask, ascending.
pub fn mask_actions(mask: &[bool; CELLS]) -> impl Iterator<Item = usize> + '_ {
    mask.iter().enumerate().filter(|&(_, &ok)| ok).map(|(i, _)| i)
}

/// Epsilon-greedy selection restricted to `valid`.
///
/// With probability `epsilon` a uniformly random valid action is returned;
/// otherwise `q_values` is evaluated and the masked argmax taken. Returns
/// `None` when there is no valid action. `q_values` is only called on the
/// greedy branch.
pub fn select_action<R: Rng>(
    valid: &[usize],
    epsilon: f32,
    rng: &mut R,
    q_values: impl FnOnce() -> [f32; CELLS],
) -> Option<usize> {
    if valid.is_empty() {
        return None;
    }
    if epsilon > 0.0 && rng.random::<f32>() < epsilon {
        return Some(valid[rng.random_range(0..valid.len())]);
    }
    masked_argmax(&q_values(), valid.iter().copied())
}
