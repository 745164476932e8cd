use serde::{Deserialize, Serialize};
use std::fmt;

/// Question difficulty requested from the content generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        };
        write!(f, "{label}")
    }
}

/// Maps a run's curriculum position onto a difficulty level.
///
/// Kept behind a trait because the exact banding is presentation policy,
/// not progression logic; the orchestrator only requires that the result is
/// a valid `Difficulty` for a valid topic pointer.
pub trait DifficultyPolicy: Send + Sync {
    fn difficulty_for(&self, topic_pointer: usize, curriculum_len: usize) -> Difficulty;
}

/// Default policy: the curriculum is split into three equal bands,
/// beginner → intermediate → advanced.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThirdsBanding;

impl DifficultyPolicy for ThirdsBanding {
    fn difficulty_for(&self, topic_pointer: usize, curriculum_len: usize) -> Difficulty {
        if curriculum_len == 0 {
            return Difficulty::Beginner;
        }

        // A terminal pointer (free practice after completion) lands in the
        // last band.
        let pointer = topic_pointer.min(curriculum_len - 1);
        match pointer * 3 / curriculum_len {
            0 => Difficulty::Beginner,
            1 => Difficulty::Intermediate,
            _ => Difficulty::Advanced,
        }
    }
}
