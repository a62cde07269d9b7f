use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::Result;

/// Owns a group of tasks sharing one cancellation token.
pub struct Supervisor {
	shutdown: CancellationToken,
	tasks: JoinSet<Result<()>>,
}

impl Supervisor {
	pub fn new() -> Self {
		Self {
			shutdown: CancellationToken::new(),
			tasks: JoinSet::new(),
		}
	}

	pub fn token(&self) -> CancellationToken {
		self.shutdown.clone()
	}

	pub fn spawn<F>(&mut self, fut: F)
	where
		F: Future<Output = Result<()>> + Send + 'static,
	{
		self.tasks.spawn(fut);
	}

	/// Cancels every task and waits for all of them. Returns the first failure, after all have exited.
	pub async fn shutdown(mut self) -> Result<()> {
		debug!("Supervisor shutdown starting ({} tasks)", self.tasks.len());
		self.shutdown.cancel();

		let mut first_err = None;
		while let Some(res) = self.tasks.join_next().await {
			let res: Result<()> = match res {
				Ok(task_res) => task_res,
				Err(join_err) => Err(join_err.into()),
			};
			if let Err(err) = res {
				warn!("supervised task failed: {err}");
				first_err.get_or_insert(err);
			}
		}
		debug!("Supervisor shutdown complete");

		match first_err {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}
}

// region:    --- Tests


// endregion: --- Tests
