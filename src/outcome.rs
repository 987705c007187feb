//! Per-message result of the consuming services.
//!
//! Every handler returns an [`Outcome`] instead of a bare `Result`, so a
//! drive loop can tell a message it chose to drop apart from a failure
//! that must stop the process.

use crate::error::{PaasError, Result};
use tracing::{debug, error, warn};

#[derive(Debug)]
pub enum Outcome {
    /// The message changed local state
    Applied,
    /// The message was understood to be irrelevant or malformed and dropped
    Ignored(String),
    /// The process cannot keep running
    Fatal(PaasError),
}

impl Outcome {
    pub fn ignored(reason: impl Into<String>) -> Self {
        Outcome::Ignored(reason.into())
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Outcome::Ignored(_))
    }

    /// Logs the outcome and escalates only the fatal category
    ///
    /// # Arguments
    /// * `context` - Short description of the message source, used in logs
    ///
    /// # Returns
    /// * `Result<()>` - Err only for `Outcome::Fatal`
    pub fn escalate(self, context: &str) -> Result<()> {
        match self {
            Outcome::Applied => {
                debug!("{}: applied", context);
                Ok(())
            }
            Outcome::Ignored(reason) => {
                warn!("{}: dropped message ({})", context, reason);
                Ok(())
            }
            Outcome::Fatal(err) => {
                error!("{}: fatal error: {}", context, err);
                Err(err)
            }
        }
    }
}
