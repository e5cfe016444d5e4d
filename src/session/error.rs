use thiserror::Error;

use crate::session::store::StoreError;

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("exam definition has no sections")]
    EmptyDefinition,
    #[error("section {0} does not exist")]
    UnknownSection(usize),
    #[error("question {question} does not exist in section {section}")]
    UnknownQuestion { section: usize, question: usize },
    #[error("option is not offered for question {question} in section {section}")]
    InvalidOption { section: usize, question: usize },
    #[error("question {question} in section {section} must offer between 2 and 4 options")]
    MalformedQuestion { section: usize, question: usize },
    #[error("this exam cannot be taken from a {0} device")]
    DeviceRestricted(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
