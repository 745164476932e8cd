mod ids;
mod outcome;
mod run;
mod topic;

pub use ids::{
    MAX_SAVE_ID_LEN, ModuleId, ParseIdError, SaveId, SaveIdError, SubtopicId, TopicId,
};
pub use outcome::{AttemptLog, AttemptOutcome, OutcomeError};
pub use run::{Run, RunStatus, RunToggle};
pub use topic::{Topic, TopicError};
