//! Analytics sink that discards every event.
//!
//! Used when analytics are disabled in configuration.

use crate::{AnalyticsError, AnalyticsEvent, AnalyticsSink};

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalyticsSink;

impl AnalyticsSink for NoopAnalyticsSink {
	fn track(&self, _event: AnalyticsEvent) -> Result<(), AnalyticsError> {
		Ok(())
	}
}
