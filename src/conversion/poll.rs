use std::time::Duration;

use super::{ConversionClient, ConversionOutcome};
use crate::error::ServiceError;

/// Time between status queries unless configured otherwise
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How often and for how long to poll a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Upper bound on status queries; `None` polls until a terminal state
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

/// Query the conversion until it succeeds, fails, or the attempt budget runs out.
///
/// Never returns [`ConversionOutcome::Pending`]. At least one query is made.
/// A failed query ends polling with its error.
pub async fn poll_conversion(
    client: &ConversionClient,
    conversion_id: &str,
    policy: &PollPolicy,
) -> Result<ConversionOutcome, ServiceError> {
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let outcome = client.check(conversion_id).await?;

        match outcome {
            ConversionOutcome::Pending => {
                if policy.max_attempts.is_some_and(|max| attempts >= max) {
                    tracing::warn!(
                        conversion_id,
                        attempts,
                        "Conversion still running, giving up"
                    );
                    return Ok(ConversionOutcome::TimedOut);
                }
                tracing::info!(
                    conversion_id,
                    attempts,
                    "Conversion running, checking again in {:?}",
                    policy.interval
                );
                tokio::time::sleep(policy.interval).await;
            }
            terminal => {
                tracing::debug!(conversion_id, attempts, "Conversion reached terminal state");
                return Ok(terminal);
            }
        }
    }
}
