//! Session clock and scan scheduler.
//!
//! The scheduler is a pure state machine: callers feed it the current local
//! time on every poll and run the tasks it returns, in order. Per trading
//! date it emits `SessionStart` once, `Scan` at most every `scan_interval`
//! while the session is trading, and `ForceExit` after the last scan and
//! before the close. A force exit that leaves positions open is reported
//! back through `force_exit_finished` and re-issued on every later tick
//! until the book is flat.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::config::SessionParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    PreOpen,
    Trading,
    ForceExitWindow,
    Closed,
}

#[derive(Debug, Clone)]
pub struct SessionClock {
    params: SessionParams,
}

impl SessionClock {
    pub fn new(params: SessionParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn phase(&self, time: NaiveTime) -> SessionPhase {
        let p = &self.params;
        if p.ignore_hours {
            SessionPhase::Trading
        } else if time < p.open {
            SessionPhase::PreOpen
        } else if time < p.force_exit {
            SessionPhase::Trading
        } else if time < p.close {
            SessionPhase::ForceExitWindow
        } else {
            SessionPhase::Closed
        }
    }

    /// open <= time <= close
    pub fn is_market_open(&self, time: NaiveTime) -> bool {
        self.params.open <= time && time <= self.params.close
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    SessionStart(NaiveDate),
    Scan,
    ForceExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForceExitState {
    Pending,
    Done,
    Retry,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    clock: SessionClock,
    session_date: Option<NaiveDate>,
    last_scan: Option<NaiveDateTime>,
    force_exit: ForceExitState,
}

impl Scheduler {
    pub fn new(params: SessionParams) -> Self {
        Self {
            clock: SessionClock::new(params),
            session_date: None,
            last_scan: None,
            force_exit: ForceExitState::Pending,
        }
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn last_scan(&self) -> Option<NaiveDateTime> {
        self.last_scan
    }

    /// Report how many positions a `ForceExit` left open.
    pub fn force_exit_finished(&mut self, still_open: usize) {
        if still_open > 0 {
            self.force_exit = ForceExitState::Retry;
        }
    }

    pub fn tick(&mut self, now: NaiveDateTime) -> Vec<Task> {
        let mut tasks = Vec::new();

        if self.session_date != Some(now.date()) {
            self.session_date = Some(now.date());
            self.last_scan = None;
            self.force_exit = ForceExitState::Pending;
            tasks.push(Task::SessionStart(now.date()));
        }

        match self.clock.phase(now.time()) {
            SessionPhase::PreOpen => {}
            SessionPhase::Trading => {
                if self.scan_due(now) {
                    self.last_scan = Some(now);
                    tasks.push(Task::Scan);
                }
            }
            SessionPhase::ForceExitWindow => {
                if self.force_exit != ForceExitState::Done {
                    self.force_exit = ForceExitState::Done;
                    tasks.push(Task::ForceExit);
                }
            }
            SessionPhase::Closed => {
                // Poll gap skipped the force-exit window; flatten anyway.
                let missed = self.force_exit == ForceExitState::Pending && self.last_scan.is_some();
                if missed || self.force_exit == ForceExitState::Retry {
                    self.force_exit = ForceExitState::Done;
                    tasks.push(Task::ForceExit);
                }
            }
        }

        tasks
    }

    fn scan_due(&self, now: NaiveDateTime) -> bool {
        let Some(last) = self.last_scan else {
            return true;
        };
        match chrono::Duration::from_std(self.clock.params.scan_interval) {
            Ok(interval) => now - last >= interval,
            Err(_) => false,
        }
    }
}
