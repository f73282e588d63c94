//! Background tick scheduler.
//!
//! Owns a [`SeriesEngine`] on a worker thread and advances it once per
//! interval, sending each tick's snapshot, bounds and histories back to the
//! host. Requests and ticks are handled on the same thread, so a reset can
//! never interleave with a half-applied step.
//!
//! Every reset starts a new run id. Frames from an older run may still sit
//! in the channel when the host resets; the receiving side drops them.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};
use log::{debug, info, warn};
use rand::Rng;

use crate::config::SchedulerConfig;
use crate::engine::{SeriesEngine, TickResult};
use crate::viewport::{AxisRange, ViewportBounds};

/// Request sent from host to worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerRequest {
    /// Reset the engine and start a new run.
    Reset,
    /// Stop ticking, keep state.
    Pause,
    /// Continue a paused run.
    Resume,
    Shutdown,
}

/// Everything the host needs to draw one tick.
#[derive(Debug, Clone)]
pub struct Frame {
    pub run: u64,
    pub result: TickResult,
    pub bounds: ViewportBounds,
    pub x_range: AxisRange,
    /// Histories in `Method::ALL` order
    pub histories: [Vec<f64>; 3],
}

/// Event sent from worker to host.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    Frame(Frame),
    /// The run stopped ticking: all methods converged, or `max_ticks` hit.
    Finished { run: u64, ticks: usize, converged: bool },
}

impl SchedulerEvent {
    pub fn run(&self) -> u64 {
        match self {
            SchedulerEvent::Frame(frame) => frame.run,
            SchedulerEvent::Finished { run, .. } => *run,
        }
    }
}

/// Handle to the background worker. Dropping it shuts the worker down.
pub struct TickScheduler {
    tx: Sender<SchedulerRequest>,
    rx: Receiver<SchedulerEvent>,
    run: u64,
    handle: Option<JoinHandle<()>>,
}

impl TickScheduler {
    /// Spawn the worker. It idles until the first [`TickScheduler::reset`].
    pub fn spawn<R>(engine: SeriesEngine<R>, config: SchedulerConfig) -> Self
    where
        R: Rng + Send + 'static,
    {
        let (req_tx, req_rx) = crossbeam_channel::unbounded::<SchedulerRequest>();
        let (event_tx, event_rx) = crossbeam_channel::unbounded::<SchedulerEvent>();

        let handle = thread::spawn(move || worker_loop(engine, config, req_rx, event_tx));

        TickScheduler {
            tx: req_tx,
            rx: event_rx,
            run: 0,
            handle: Some(handle),
        }
    }

    /// Start a fresh run. Anything still queued from the previous run is
    /// ignored from now on.
    pub fn reset(&mut self) {
        self.run += 1;
        self.send(SchedulerRequest::Reset);
    }

    pub fn pause(&self) {
        self.send(SchedulerRequest::Pause);
    }

    pub fn resume(&self) {
        self.send(SchedulerRequest::Resume);
    }

    /// Id of the current run; 0 before the first reset.
    pub fn run_id(&self) -> u64 {
        self.run
    }

    fn send(&self, req: SchedulerRequest) {
        if self.tx.send(req).is_err() {
            warn!("scheduler worker is gone, dropped {:?}", req);
        }
    }

    /// Next event of the current run, if one is ready (non-blocking).
    pub fn try_recv(&self) -> Option<SchedulerEvent> {
        while let Ok(event) = self.rx.try_recv() {
            if event.run() == self.run {
                return Some(event);
            }
            debug!("dropping stale event from run {}", event.run());
        }
        None
    }

    /// Wait up to `timeout` for the next event of the current run.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SchedulerEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(event) if event.run() == self.run => return Some(event),
                Ok(event) => debug!("dropping stale event from run {}", event.run()),
                Err(_) => return None,
            }
        }
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        let _ = self.tx.send(SchedulerRequest::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop<R: Rng>(
    engine: SeriesEngine<R>,
    config: SchedulerConfig,
    requests: Receiver<SchedulerRequest>,
    events: Sender<SchedulerEvent>,
) {
    let ticker = crossbeam_channel::tick(config.interval());
    let mut worker = Worker {
        engine,
        config,
        events,
        run: 0,
        running: false,
    };

    let mut alive = true;
    while alive {
        select! {
            recv(requests) -> msg => {
                alive = match msg {
                    Ok(req) => worker.handle(req),
                    Err(_) => false,
                };
            }
            recv(ticker) -> _ => {
                if worker.running {
                    alive = worker.tick();
                }
            }
        }
    }
    debug!("scheduler worker exiting");
}

struct Worker<R> {
    engine: SeriesEngine<R>,
    config: SchedulerConfig,
    events: Sender<SchedulerEvent>,
    run: u64,
    running: bool,
}

impl<R: Rng> Worker<R> {
    /// Apply a host request; false means shut down.
    fn handle(&mut self, req: SchedulerRequest) -> bool {
        match req {
            SchedulerRequest::Reset => {
                self.engine.reset();
                self.run += 1;
                self.running = true;
                info!("run {} started ({} ms interval)", self.run, self.config.interval_ms);
            }
            SchedulerRequest::Pause => self.running = false,
            SchedulerRequest::Resume => {
                self.running = self.run > 0
                    && !self.engine.all_converged()
                    && self.engine.ticks() < self.config.max_ticks;
            }
            SchedulerRequest::Shutdown => return false,
        }
        true
    }

    /// Step the engine and publish the frame; false once the host is gone.
    /// A run never steps past `max_ticks`, even when that is zero.
    fn tick(&mut self) -> bool {
        if self.engine.ticks() < self.config.max_ticks {
            let result = self.engine.step();
            let frame = Frame {
                run: self.run,
                result,
                bounds: self.engine.bounds(),
                x_range: self.engine.x_range(),
                histories: self.engine.histories().map(|h| h.to_vec()),
            };
            if self.events.send(SchedulerEvent::Frame(frame)).is_err() {
                return false;
            }
        }

        let converged = self.engine.all_converged();
        let ticks = self.engine.ticks();
        if converged || ticks >= self.config.max_ticks {
            self.running = false;
            if !converged {
                warn!("run {} stopped at {} ticks before converging", self.run, ticks);
            }
            let finished = SchedulerEvent::Finished {
                run: self.run,
                ticks,
                converged,
            };
            return self.events.send(finished).is_ok();
        }
        true
    }
}
