use thiserror::Error;

use crate::curriculum::CurriculumError;
use crate::model::{SaveIdError, TopicError};
use crate::progression::ProgressionError;
use crate::sequencer::SequencerError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    SaveId(#[from] SaveIdError),
    #[error(transparent)]
    Progression(#[from] ProgressionError),
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
}
