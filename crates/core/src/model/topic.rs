use thiserror::Error;

use crate::model::ids::{ModuleId, SubtopicId, TopicId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic name cannot be empty")]
    EmptyName,
}

/// One problem archetype in the curriculum.
///
/// Topics come from the read-only curriculum catalog and never change within
/// an app version; `position` is the index in the flattened
/// module → subtopic → topic order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    id: TopicId,
    name: String,
    module_id: ModuleId,
    subtopic_id: SubtopicId,
    position: usize,
}

impl Topic {
    /// Builds a topic, validating the display name.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyName` if the name is blank.
    pub fn new(
        id: TopicId,
        name: impl Into<String>,
        module_id: ModuleId,
        subtopic_id: SubtopicId,
        position: usize,
    ) -> Result<Self, TopicError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TopicError::EmptyName);
        }

        Ok(Self {
            id,
            name,
            module_id,
            subtopic_id,
            position,
        })
    }

    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn subtopic_id(&self) -> SubtopicId {
        self.subtopic_id
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }
}
