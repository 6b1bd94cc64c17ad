use crate::domain::{DeadLetterQueue, Error};

/// Reports failed operations on stderr, where a real frontend would raise a
/// notification instead.
#[derive(Default, Debug)]
pub struct StdErrDLQ {}

impl DeadLetterQueue for StdErrDLQ {
    fn report(&self, user_id: &str, error: &Error) {
        tracing::warn!(user = user_id, "operation failed: {}", error);
        eprintln!("FAILED user={}: {}", user_id, error);
    }
}
