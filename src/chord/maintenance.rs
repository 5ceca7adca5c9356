use std::{future::Future, time::Duration};

use chrono::Utc;
use tokio::{
	select,
	sync::watch,
	task::JoinHandle,
	time::{interval_at, sleep, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn, Instrument, Span};

use crate::error::Result;

use super::Chord;


/// Runs a node's background tasks inside its span and stops them together.
///
/// A task is only interrupted between runs: shutdown waits for a tick that
/// is already executing.
#[derive(Debug)]
pub(crate) struct Scheduler{
	span: Span,
	shutdown: watch::Sender<bool>,
	tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Scheduler{
	pub fn new(span: Span) -> Self{
		let (shutdown, _) = watch::channel(false);
		Scheduler{
			span,
			shutdown,
			tasks: Vec::new(),
		}
	}

	/// Run `task` every `period`, first after one full period. A failed run is
	/// logged and the next tick happens as usual.
	pub fn every<F, Fut>(&mut self, name: &'static str, period: Duration, task: F)
	where
		F: Fn() -> Fut + Send + 'static,
		Fut: Future<Output = Result<()>> + Send + 'static,
	{
		let mut shutdown = self.shutdown.subscribe();
		let handle = tokio::spawn(async move {
			let mut interval = interval_at(Instant::now() + period, period);
			interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop{
				select! {
					_ = interval.tick() => {
						if let Err(e) = task().await {
							warn!("{} failed: {}", name, e);
						}
					},
					_ = shutdown.changed() => break,
				}
			}
			debug!("{} stopped", name);
		}.instrument(self.span.clone()));
		self.tasks.push((name, handle));
	}

	/// Run `task` once after `delay`, unless shut down first.
	pub fn after<Fut>(&mut self, name: &'static str, delay: Duration, task: Fut)
	where
		Fut: Future<Output = ()> + Send + 'static,
	{
		let mut shutdown = self.shutdown.subscribe();
		let handle = tokio::spawn(async move {
			select! {
				_ = sleep(delay) => task.await,
				_ = shutdown.changed() => debug!("{} cancelled", name),
			}
		}.instrument(self.span.clone()));
		self.tasks.push((name, handle));
	}

	pub async fn shutdown(self){
		let Scheduler{span, shutdown, tasks} = self;
		let _ = shutdown.send(true);
		for (name, handle) in tasks {
			if let Err(e) = handle.await {
				warn!(parent: &span, "{} ended abnormally: {}", name, e);
			}
		}
	}
}


impl Chord{
	/// Log this node's view of the ring.
	pub(crate) async fn report(&self) -> Result<()>{
		let view = self.view().await;
		let uptime = Utc::now().signed_duration_since(self.started_at);
		let predecessor = view.predecessor.as_ref().map(|p| p.address.as_str()).unwrap_or("none");
		let keys = self.store.len().await;

		info!(
			successor = %view.successor.address,
			predecessor,
			keys,
			uptime_secs = uptime.num_seconds(),
			"Ring state",
		);
		for (index, finger) in self.fingers().await.iter().enumerate() {
			debug!("finger {}: start {} -> {} ({})", index, finger.start, finger.node.identifier, finger.node.address);
		}
		Ok(())
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::{atomic::{AtomicU32, Ordering}, Arc};

	#[tokio::test(start_paused = true)]
	async fn periodic_tasks_survive_failures() {
		let mut scheduler = Scheduler::new(Span::none());
		let runs = Arc::new(AtomicU32::new(0));

		let counter = runs.clone();
		scheduler.every("flaky", Duration::from_millis(10), move || {
			let counter = counter.clone();
			async move {
				let run = counter.fetch_add(1, Ordering::SeqCst);
				if run % 2 == 0 {
					Err(crate::error::Error::Timeout("nowhere".to_string()))
				}else{
					Ok(())
				}
			}
		});

		sleep(Duration::from_millis(55)).await;
		scheduler.shutdown().await;
		let seen = runs.load(Ordering::SeqCst);
		assert!(seen >= 4, "only {} runs", seen);

		sleep(Duration::from_millis(50)).await;
		assert_eq!(runs.load(Ordering::SeqCst), seen);
	}

	#[tokio::test(start_paused = true)]
	async fn delayed_tasks_can_be_cancelled() {
		let fired = Arc::new(AtomicU32::new(0));

		let mut scheduler = Scheduler::new(Span::none());
		let flag = fired.clone();
		scheduler.after("later", Duration::from_secs(5), async move {
			flag.fetch_add(1, Ordering::SeqCst);
		});
		scheduler.shutdown().await;
		assert_eq!(fired.load(Ordering::SeqCst), 0);

		let mut scheduler = Scheduler::new(Span::none());
		let flag = fired.clone();
		scheduler.after("sooner", Duration::from_millis(5), async move {
			flag.fetch_add(1, Ordering::SeqCst);
		});
		sleep(Duration::from_millis(10)).await;
		scheduler.shutdown().await;
		assert_eq!(fired.load(Ordering::SeqCst), 1);
	}
}
