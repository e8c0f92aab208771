//! Error taxonomy for submissions.
//!
//! Transaction-level failures and exceptional failures stay distinct all the way
//! to the caller so operators can tell chain rejections from infrastructure faults.

use thiserror::Error;

/// Errors that reject a submission or one of its completion points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
	/// The chain rejected or reverted the transaction.
	#[error("Transaction failed: {0}")]
	Failed(String),
	/// A local or transport fault unrelated to transaction semantics.
	#[error("Transaction exception: {0}")]
	Exception(String),
	/// The fee contract could not be resolved; nothing was sent.
	#[error("Fee contract resolution failed: {0}")]
	FeeContract(String),
	/// The send primitive rejected the submission before it started.
	#[error("Send rejected: {0}")]
	Send(String),
	/// The producer went away without settling this completion point.
	#[error("Submission abandoned before completion")]
	Abandoned,
}

impl SubmissionError {
	/// Returns true if the error happened before any lifecycle event was emitted.
	pub fn is_pre_start(&self) -> bool {
		matches!(self, SubmissionError::FeeContract(_) | SubmissionError::Send(_))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pre_start_classification() {
		assert!(SubmissionError::FeeContract("rpc down".into()).is_pre_start());
		assert!(SubmissionError::Send("bad chain".into()).is_pre_start());
		assert!(!SubmissionError::Failed("reverted".into()).is_pre_start());
		assert!(!SubmissionError::Exception("timeout".into()).is_pre_start());
		assert!(!SubmissionError::Abandoned.is_pre_start());
	}

	#[test]
	fn test_failed_and_exception_messages_differ() {
		let failed = SubmissionError::Failed("boom".into()).to_string();
		let exception = SubmissionError::Exception("boom".into()).to_string();
		assert_ne!(failed, exception);
		assert!(failed.contains("boom"));
		assert!(exception.contains("boom"));
	}
}
