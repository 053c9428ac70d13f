//! Points awarded for accepted words

/// Pluggable scoring rule. Must never decrease as words get longer.
pub trait ScoringPolicy: Send + Sync {
    /// Points for `word` submitted with `time_left_ms` of a `turn_length_ms` turn
    fn points_for(&self, word: &str, time_left_ms: u64, turn_length_ms: u64) -> u32;
}

/// Per-letter points plus a bonus proportional to the time left on the clock
#[derive(Debug, Clone, Copy)]
pub struct LengthScoring {
    pub points_per_letter: u32,
    pub max_speed_bonus: u32,
}

impl Default for LengthScoring {
    fn default() -> Self {
        Self {
            points_per_letter: 10,
            max_speed_bonus: 10,
        }
    }
}

impl ScoringPolicy for LengthScoring {
    fn points_for(&self, word: &str, time_left_ms: u64, turn_length_ms: u64) -> u32 {
        let letters = word.trim().chars().count() as u32;
        let base = letters.saturating_mul(self.points_per_letter);

        let bonus = if turn_length_ms == 0 {
            0
        } else {
            let left = time_left_ms.min(turn_length_ms);
            (u64::from(self.max_speed_bonus) * left / turn_length_ms) as u32
        };

        base.saturating_add(bonus)
    }
}
