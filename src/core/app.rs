//! The refresh loop: sample, compose, paint, handle one key

use anyhow::Result;
use chrono::Local;

use crate::core::events::{Command, InputRouter};
use crate::core::sampler::Sampler;
use crate::core::state::RefreshState;
use crate::integrations::ssd::SubView;
use crate::ui::composer::{ScreenComposer, StatusLine};
use crate::ui::terminal::Screen;

pub struct App<S: Screen, V: SubView> {
    screen: S,
    sampler: Sampler,
    sub_view: V,
    state: RefreshState,
}

impl<S: Screen, V: SubView> App<S, V> {
    pub fn new(screen: S, sampler: Sampler, sub_view: V) -> Self {
        Self {
            screen,
            sampler,
            sub_view,
            state: RefreshState::new(),
        }
    }

    /// Owns the terminal until quit; it is restored even when the loop fails.
    pub async fn run(&mut self) -> Result<()> {
        self.screen.enter()?;
        tracing::info!(sources = self.sampler.source_count(), "dashboard started");

        let result = self.event_loop().await;

        let restored = self.screen.restore();
        tracing::info!(
            ticks = self.state.ticks,
            avg_latency_ms = self.state.average_latency().as_millis() as u64,
            "dashboard stopped"
        );
        result.and(restored)
    }

    async fn event_loop(&mut self) -> Result<()> {
        while self.state.is_running() {
            if let Err(e) = self.tick().await {
                tracing::error!(error = %e, "terminal lost");
                self.state.terminate();
                return Err(e);
            }
        }
        Ok(())
    }

    /// One sample, compose, paint and input cycle.
    pub async fn tick(&mut self) -> Result<()> {
        self.state.begin_tick();
        let results = self.sampler.sample_all().await;
        let size = self.screen.size()?;
        self.state.end_tick();

        let status = StatusLine {
            updated_at: Local::now(),
            latency: self.state.last_latency,
            notice: self.state.take_notice(),
        };
        let buffer = ScreenComposer::compose(&results, size, &status);
        self.screen.paint(&buffer)?;

        if let Some(key) = self.screen.poll_key()? {
            self.dispatch(InputRouter::route(&key)).await?;
        }
        Ok(())
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Quit => {
                tracing::debug!("quit requested");
                self.state.terminate();
            }
            Command::OpenSubView => {
                self.state.suspend();
                self.screen.suspend()?;

                if let Err(e) = self.sub_view.run().await {
                    tracing::warn!(error = %e, "SSD report failed");
                    self.state.set_notice(format!("SSD info: {}", e));
                }

                self.screen.resume()?;
                self.state.resume();
            }
            Command::None => {}
        }
        Ok(())
    }
}
