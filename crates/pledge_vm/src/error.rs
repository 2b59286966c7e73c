use thiserror::Error;

/// Internal invariant violations. These indicate a bug in the pledge core and are never turned
/// into rejections.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PledgeError {
    #[error("pledge is already settled (state: {0})")]
    AlreadySettled(&'static str),
}
