use std::collections::HashSet;

use thiserror::Error;

use crate::model::{Topic, TopicId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CurriculumError {
    #[error("topic at index {index} carries position {position}")]
    PositionMismatch { index: usize, position: usize },

    #[error("duplicate topic id: {0}")]
    DuplicateTopicId(TopicId),
}

/// Immutable, ordered catalog of problem archetypes.
///
/// Holds the flattened module → subtopic → topic sequence the run's topic
/// pointer indexes into. The catalog is read-only and stable for the life
/// of a session; a pointer equal to `len()` is the terminal (completed)
/// position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curriculum {
    topics: Vec<Topic>,
}

impl Curriculum {
    /// Builds a catalog from an already-flattened topic sequence.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError::PositionMismatch` if a topic's recorded
    /// position disagrees with its index, or `DuplicateTopicId` if two
    /// topics share an id.
    pub fn new(topics: Vec<Topic>) -> Result<Self, CurriculumError> {
        let mut seen = HashSet::new();
        for (index, topic) in topics.iter().enumerate() {
            if topic.position() != index {
                return Err(CurriculumError::PositionMismatch {
                    index,
                    position: topic.position(),
                });
            }
            if !seen.insert(topic.id()) {
                return Err(CurriculumError::DuplicateTopicId(topic.id()));
            }
        }

        Ok(Self { topics })
    }

    /// The flattened topic sequence in curriculum order.
    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    #[must_use]
    pub fn topic_at(&self, index: usize) -> Option<&Topic> {
        self.topics.get(index)
    }

    /// True when `index` is at or past the end of the sequence, i.e. a
    /// completed run's pointer value.
    #[must_use]
    pub fn is_terminal(&self, index: usize) -> bool {
        index >= self.topics.len()
    }
}
