//! Genericized threadpool, used for fanning out the two places this
//! crate does a lot of independent, uniform work: fetching several
//! artifacts over HTTP (`pool::fetch`) and hash-checking several
//! artifacts already on disk (`pool::hashcheck`).

pub mod fetch;
pub mod hashcheck;


use std::sync::atomic::{AtomicU32, Ordering};

/// How many concurrent fetches to run (spec §4.5: "a small fan-out,
/// not unbounded").
static JOBS_NET: AtomicU32 = AtomicU32::new(4);

/// How many threads to use for CPU-bound hash checking.
static JOBS_CPU: AtomicU32 = AtomicU32::new(4);

fn jobs_net() -> u32 { JOBS_NET.load(Ordering::Relaxed) }
fn jobs_cpu() -> u32 { JOBS_CPU.load(Ordering::Relaxed) }

/// Override the default parallelism levels.  Expected to be called once
/// up front, if at all; `None` leaves a level at its default.
pub fn init_jobs(net: Option<u32>, cpu: Option<u32>)
{
	if let Some(n) = net
	{
		if n == 0 { panic!("0 network threads is insane."); }
		JOBS_NET.store(n, Ordering::Relaxed);
	}
	if let Some(c) = cpu
	{
		if c == 0 { panic!("0 cpu threads is insane."); }
		JOBS_CPU.store(c, Ordering::Relaxed);
	}
}


/// The overarching trait that implements pools.  Individual users
/// define the handful of associated types and fill in the steps of the
/// process that vary; `run()` ties it all together over a scoped thread
/// pool with crossbeam channels doing the work handoff.
pub trait Pool: Sized
{
	/// What `run()` ultimately hands back, after `finalize()`.
	type PoolResult;

	/// Shared, per-run state a worker thread needs (an HTTP agent, a
	/// base URL, an output directory, ...).  Cloned per-thread via
	/// `mk_unitcontrol`.
	type Control;

	/// The per-thread copy of `Control`.  In every impl so far this is
	/// just `Control` itself, cloned.
	type UnitControl: Send;

	fn mk_unitcontrol(ctrl: &Self::Control) -> Self::UnitControl;

	/// A single unit of work dispatched to a worker thread.
	type WorkRequest: Send + Sync + 'static;
	/// What a worker thread hands back for one `WorkRequest`.
	type WorkResult: Send;
	/// What a worker thread hands back on failure for one `WorkRequest`.
	type WorkErr: Send;

	/// Do one unit of work.  Called once per `WorkRequest`, on whichever
	/// worker thread picks it up.
	fn work(ctrl: &Self::UnitControl, req: Self::WorkRequest)
			-> Result<Self::WorkResult, Self::WorkErr>;

	/// Accumulate one worker's result as it comes in.  Called on the
	/// driving thread, so no synchronization needed here.
	fn work_result(&mut self, resp: Result<Self::WorkResult, Self::WorkErr>);

	/// Called once every `WorkRequest` has been dispatched, processed,
	/// and folded in via `work_result`.  Builds the final `PoolResult`.
	fn finalize(self) -> Self::PoolResult;

	/// How many worker threads to spin up.
	fn nthreads(&self) -> u32 { 4 }

	/// Run the pool to completion over `items`.  An `Err` return here
	/// only ever reflects a plumbing failure (a channel send failing);
	/// per-item failures go through `WorkErr` and `work_result` instead.
	fn run(mut self, ctrl: &Self::Control, items: Vec<Self::WorkRequest>)
			-> Result<Self::PoolResult, anyhow::Error>
	{
		std::thread::scope(|s| -> Result<Self::PoolResult, anyhow::Error> {
			use crossbeam::channel;
			let (req_snd, req_rcv) = channel::unbounded();
			let (res_snd, res_rcv) = channel::unbounded();

			let nthr = self.nthreads();
			if nthr == 0 { panic!("nthreads {nthr} is insane"); }
			for _ in 1..=nthr
			{
				let uctrl = Self::mk_unitcontrol(ctrl);
				let reqs = req_rcv.clone();
				let ress = res_snd.clone();
				s.spawn(move || {
					while let Ok(req) = reqs.recv()
					{
						let res = Self::work(&uctrl, req);
						ress.send(res).expect("response channel shouldn't be closed");
					}
				});
			}

			drop(req_rcv);
			drop(res_snd);

			for i in items.into_iter() { req_snd.send(i)?; }
			drop(req_snd);

			while let Ok(resp) = res_rcv.recv() { self.work_result(resp); }

			Ok(self.finalize())
		})
	}
}
