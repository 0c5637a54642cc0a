use thiserror::Error;
use uuid::Uuid;

/// Internal invariant violations. Each one is a bug upstream or in the view
/// code; the page is not rendered.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("view `{0}` is not grouped by participant and has no section panels")]
    NotGroupedByParticipant(&'static str),
    #[error("response {response} refers to unknown question `{question}`")]
    UnknownQuestion { response: Uuid, question: String },
    #[error("question id `{0}` appears more than once")]
    DuplicateQuestion(String),
}
