//! Periodic cycle scheduling.
//!
//! The state machine is a pure function ([`SchedulerState::on`]) so it can be
//! driven with synthetic events; [`Scheduler::run`] feeds it real ones. Cycles
//! never overlap: the next cycle starts at `previous start + interval`, or
//! right after the previous cycle ends if that took longer.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::sync::engine::{CycleResult, SyncEngine};

/// Requests a stop. Cloneable; every clone stops the same scheduler.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes stop requests.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once a stop is requested. Pends forever if every handle is gone.
    pub async fn stopped(&mut self) {
        if self.rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx: Arc::new(tx) }, StopSignal { rx })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running { cycle: u64 },
    Waiting { cycle: u64 },
    /// Terminal.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    Start,
    CycleFinished,
    IntervalElapsed,
    StopRequested,
}

/// What the driver must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    RunCycle(u64),
    Wait,
    Halt,
    /// Event does not apply in this state.
    Ignore,
}

impl SchedulerState {
    pub fn on(self, event: SchedulerEvent) -> (SchedulerState, Directive) {
        use SchedulerEvent::*;
        use SchedulerState::*;

        match (self, event) {
            (Stopped, _) => (Stopped, Directive::Halt),
            (_, StopRequested) => (Stopped, Directive::Halt),
            (Idle, Start) => (Running { cycle: 1 }, Directive::RunCycle(1)),
            (Running { cycle }, CycleFinished) => (Waiting { cycle }, Directive::Wait),
            (Waiting { cycle }, IntervalElapsed) => {
                (Running { cycle: cycle + 1 }, Directive::RunCycle(cycle + 1))
            }
            (state, _) => (state, Directive::Ignore),
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, SchedulerState::Stopped)
    }
}

/// Totals over a scheduler run.
#[derive(Debug, Clone, Default)]
pub struct SchedulerReport {
    pub cycles: u64,
    /// Cycles that ended with failures, an abort or an interruption.
    pub unclean_cycles: u64,
    pub last: Option<CycleResult>,
}

pub struct Scheduler {
    engine: SyncEngine,
    interval: Duration,
    max_cycles: Option<u64>,
}

impl Scheduler {
    pub fn new(engine: SyncEngine) -> Self {
        let interval = engine.config().interval;
        Self {
            engine,
            interval,
            max_cycles: None,
        }
    }

    /// Stop on its own after `cycles` cycles.
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Run cycles until `stop` fires (or the cycle limit is reached).
    pub async fn run(&self, mut stop: StopSignal) -> SchedulerReport {
        let mut report = SchedulerReport::default();
        let mut state = SchedulerState::Idle;
        let mut event = if stop.is_stopped() {
            SchedulerEvent::StopRequested
        } else {
            SchedulerEvent::Start
        };
        let mut next_start = Instant::now();

        loop {
            let (next, directive) = state.on(event);
            debug!(?state, ?event, ?next, "Scheduler transition");
            state = next;

            event = match directive {
                Directive::RunCycle(cycle) => {
                    next_start = Instant::now() + self.interval;
                    let result = self.engine.run_cycle(cycle, &stop).await;
                    report.cycles += 1;
                    if !result.is_clean() {
                        report.unclean_cycles += 1;
                    }
                    report.last = Some(result);

                    let limit_reached = self.max_cycles.is_some_and(|max| report.cycles >= max);
                    if stop.is_stopped() || limit_reached {
                        SchedulerEvent::StopRequested
                    } else {
                        SchedulerEvent::CycleFinished
                    }
                }
                Directive::Wait => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(next_start) => SchedulerEvent::IntervalElapsed,
                        _ = stop.stopped() => SchedulerEvent::StopRequested,
                    }
                }
                Directive::Halt | Directive::Ignore => break,
            };
        }

        info!(
            "Scheduler stopped after {} cycles ({} with failures)",
            report.cycles, report.unclean_cycles
        );
        report
    }
}
