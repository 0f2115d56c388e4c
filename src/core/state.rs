//! Refresh loop state

use std::time::{Duration, Instant};

/// Where the refresh loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopPhase {
    #[default]
    Running,
    /// Terminal handed to a sub-view; no ticks run
    Suspended,
    Terminating,
}

/// Counters and phase owned by the refresh loop
#[derive(Debug, Default)]
pub struct RefreshState {
    pub last_tick_start: Option<Instant>,
    pub last_latency: Duration,
    pub cumulative_latency: Duration,
    pub ticks: u64,
    pub phase: LoopPhase,
    notice: Option<String>,
}

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_tick(&mut self) -> Instant {
        let now = Instant::now();
        self.last_tick_start = Some(now);
        now
    }

    /// Records how long the tick since `begin_tick` took.
    pub fn end_tick(&mut self) -> Duration {
        let latency = self
            .last_tick_start
            .map(|start| start.elapsed())
            .unwrap_or_default();
        self.last_latency = latency;
        self.cumulative_latency += latency;
        self.ticks += 1;
        latency
    }

    pub fn average_latency(&self) -> Duration {
        match u32::try_from(self.ticks) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.cumulative_latency / n,
            Err(_) => Duration::ZERO,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == LoopPhase::Running
    }

    pub fn suspend(&mut self) {
        if self.phase == LoopPhase::Running {
            self.phase = LoopPhase::Suspended;
        }
    }

    /// Back to running; the next tick starts from a clean slate.
    pub fn resume(&mut self) {
        if self.phase == LoopPhase::Suspended {
            self.phase = LoopPhase::Running;
            self.last_tick_start = None;
        }
    }

    pub fn terminate(&mut self) {
        self.phase = LoopPhase::Terminating;
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    /// Notices are shown on one paint only.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }
}
