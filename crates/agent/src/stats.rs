//! Running counters for `show_stats`.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Stats {
    queries: u64,
    tool_calls: u64,
    started: Instant,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            queries: 0,
            tool_calls: 0,
            started: Instant::now(),
        }
    }

    pub fn record_query(&mut self) {
        self.queries += 1;
    }

    pub fn record_tool_call(&mut self) {
        self.tool_calls += 1;
    }

    pub fn queries(&self) -> u64 {
        self.queries
    }

    pub fn tool_calls(&self) -> u64 {
        self.tool_calls
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn counters_and_uptime() {
        let mut stats = Stats::new();
        stats.record_query();
        stats.record_tool_call();
        stats.record_tool_call();
        tokio::time::advance(Duration::from_secs(42)).await;

        assert_eq!(stats.queries(), 1);
        assert_eq!(stats.tool_calls(), 2);
        assert_eq!(stats.uptime().as_secs(), 42);
    }
}
