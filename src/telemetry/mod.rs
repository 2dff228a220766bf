//! Telemetry system for cmdjail
//!
//! Collects gateway events per request and keeps running statistics. The
//! collector is handed to the gateway explicitly; nothing here is global.
//! Only the most recent events are retained; statistics cover the whole
//! session.

use colored::Colorize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use uuid::Uuid;

/// Gateway event types
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    CommandReceived {
        request_id: Uuid,
        length: usize,
        timestamp: Instant,
    },
    CommandRejected {
        request_id: Uuid,
        kind: String,
        reason: String,
        timestamp: Instant,
    },
    CommandStarted {
        request_id: Uuid,
        argv: Vec<String>,
        timestamp: Instant,
    },
    CommandCompleted {
        request_id: Uuid,
        exit_code: i32,
        duration_ms: u64,
        timestamp: Instant,
    },
    CommandTimedOut {
        request_id: Uuid,
        timeout_secs: u64,
        timestamp: Instant,
    },
    ExecutionFailed {
        request_id: Uuid,
        reason: String,
        timestamp: Instant,
    },
    PolicyQueried {
        timestamp: Instant,
    },
}

impl GatewayEvent {
    /// One-line rendering used for stderr echo
    pub fn describe(&self) -> String {
        match self {
            GatewayEvent::CommandReceived { request_id, length, .. } => {
                format!("[RECV] {} ({} chars)", request_id, length)
            }
            GatewayEvent::CommandRejected { request_id, kind, reason, .. } => {
                format!("[REJECT] {} {}: {}", request_id, kind, reason)
            }
            GatewayEvent::CommandStarted { request_id, argv, .. } => {
                format!("[START] {} {}", request_id, render_argv(argv))
            }
            GatewayEvent::CommandCompleted {
                request_id,
                exit_code,
                duration_ms,
                ..
            } => format!("[DONE] {} exit={} {}ms", request_id, exit_code, duration_ms),
            GatewayEvent::CommandTimedOut {
                request_id,
                timeout_secs,
                ..
            } => format!("[TIMEOUT] {} after {}s", request_id, timeout_secs),
            GatewayEvent::ExecutionFailed { request_id, reason, .. } => {
                format!("[FAIL] {} {}", request_id, reason)
            }
            GatewayEvent::PolicyQueried { .. } => "[POLICY] rules requested".to_string(),
        }
    }

    fn is_problem(&self) -> bool {
        matches!(
            self,
            GatewayEvent::CommandRejected { .. }
                | GatewayEvent::CommandTimedOut { .. }
                | GatewayEvent::ExecutionFailed { .. }
        )
    }
}

/// Shell-quoted rendering, so the logged line reads like the command run
fn render_argv(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| match shlex::try_quote(arg) {
            Ok(quoted) => quoted.into_owned(),
            Err(_) => format!("{:?}", arg),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Events kept for the session summary
pub const MAX_RETAINED_EVENTS: usize = 256;

/// Telemetry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub commands_received: usize,
    pub commands_rejected: usize,
    pub commands_started: usize,
    pub commands_completed: usize,
    pub commands_succeeded: usize,
    pub timeouts: usize,
    pub execution_failures: usize,
    pub policy_queries: usize,
}

/// Telemetry collector
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<VecDeque<GatewayEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
    echo: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_RETAINED_EVENTS))),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
            echo: false,
        }
    }

    /// Echo every recorded event to stderr
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Record an event
    pub fn record(&self, event: GatewayEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                GatewayEvent::CommandReceived { .. } => stats.commands_received += 1,
                GatewayEvent::CommandRejected { .. } => stats.commands_rejected += 1,
                GatewayEvent::CommandStarted { .. } => stats.commands_started += 1,
                GatewayEvent::CommandCompleted { exit_code, .. } => {
                    stats.commands_completed += 1;
                    if *exit_code == 0 {
                        stats.commands_succeeded += 1;
                    }
                }
                GatewayEvent::CommandTimedOut { .. } => stats.timeouts += 1,
                GatewayEvent::ExecutionFailed { .. } => stats.execution_failures += 1,
                GatewayEvent::PolicyQueried { .. } => stats.policy_queries += 1,
            }
        }

        if self.echo {
            let line = event.describe();
            if event.is_problem() {
                eprintln!("{}", line.yellow());
            } else {
                eprintln!("{}", line.dimmed());
            }
        }

        let mut events = lock(&self.events);
        if events.len() == MAX_RETAINED_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Number of retained events
    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<GatewayEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events.iter().skip(start).cloned().collect()
    }

    /// Fraction of received commands that were rejected by policy
    pub fn rejection_rate(&self) -> f64 {
        let stats = lock(&self.stats);
        if stats.commands_received == 0 {
            0.0
        } else {
            stats.commands_rejected as f64 / stats.commands_received as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: crate::cli::Verbosity,
}

impl TelemetryDisplay {
    /// Create a new display
    pub fn new(collector: TelemetryCollector, verbosity: crate::cli::Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Display summary statistics
    pub fn display_summary(&self) {
        if !self.verbosity.show_events() {
            return;
        }

        let stats = self.collector.get_stats();
        eprintln!();
        eprintln!("{}", "Session Summary".bold());
        eprintln!("─────────────────────────────────────");
        eprintln!("Duration:          {:?}", self.collector.elapsed());
        eprintln!("Commands received: {}", stats.commands_received);
        eprintln!("Rejected:          {}", stats.commands_rejected);
        eprintln!("Executed:          {}", stats.commands_completed);
        eprintln!("Timed out:         {}", stats.timeouts);
        eprintln!("Launch failures:   {}", stats.execution_failures);
        eprintln!(
            "Rejection rate:    {:.1}%",
            self.collector.rejection_rate() * 100.0
        );

        if self.verbosity == crate::cli::Verbosity::VeryVerbose {
            let problems: Vec<GatewayEvent> = self
                .collector
                .recent_events(MAX_RETAINED_EVENTS)
                .into_iter()
                .filter(GatewayEvent::is_problem)
                .collect();
            if !problems.is_empty() {
                eprintln!();
                eprintln!("{}", "Recent problems".bold());
                for event in problems.iter().rev().take(10).rev() {
                    eprintln!("  {}", event.describe().yellow());
                }
            }
        }
        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_creation() {
        let collector = TelemetryCollector::new();
        assert_eq!(collector.event_count(), 0);
        assert_eq!(collector.get_stats(), TelemetryStats::default());
    }

    #[test]
    fn test_record_lifecycle() {
        let collector = TelemetryCollector::new();
        let request_id = Uuid::new_v4();

        collector.record(GatewayEvent::CommandReceived {
            request_id,
            length: 5,
            timestamp: Instant::now(),
        });
        collector.record(GatewayEvent::CommandStarted {
            request_id,
            argv: vec!["ls".to_string()],
            timestamp: Instant::now(),
        });
        collector.record(GatewayEvent::CommandCompleted {
            request_id,
            exit_code: 0,
            duration_ms: 3,
            timestamp: Instant::now(),
        });

        let stats = collector.get_stats();
        assert_eq!(stats.commands_received, 1);
        assert_eq!(stats.commands_started, 1);
        assert_eq!(stats.commands_completed, 1);
        assert_eq!(stats.commands_succeeded, 1);
        assert_eq!(collector.event_count(), 3);
    }

    #[test]
    fn test_rejection_rate() {
        let collector = TelemetryCollector::new();

        for _ in 0..4 {
            collector.record(GatewayEvent::CommandReceived {
                request_id: Uuid::new_v4(),
                length: 1,
                timestamp: Instant::now(),
            });
        }
        collector.record(GatewayEvent::CommandRejected {
            request_id: Uuid::new_v4(),
            kind: "path_escape".to_string(),
            reason: "outside".to_string(),
            timestamp: Instant::now(),
        });

        assert!((collector.rejection_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_recent_events() {
        let collector = TelemetryCollector::new();
        for _ in 0..10 {
            collector.record(GatewayEvent::PolicyQueried {
                timestamp: Instant::now(),
            });
        }

        assert_eq!(collector.recent_events(3).len(), 3);
        assert_eq!(collector.get_stats().policy_queries, 10);
    }

    #[test]
    fn test_event_log_is_bounded() {
        let collector = TelemetryCollector::new();
        for _ in 0..MAX_RETAINED_EVENTS * 3 {
            collector.record(GatewayEvent::CommandReceived {
                request_id: Uuid::new_v4(),
                length: 2,
                timestamp: Instant::now(),
            });
        }
        collector.record(GatewayEvent::PolicyQueried {
            timestamp: Instant::now(),
        });

        assert_eq!(collector.event_count(), MAX_RETAINED_EVENTS);
        assert_eq!(collector.get_stats().commands_received, MAX_RETAINED_EVENTS * 3);
        assert!(matches!(
            collector.recent_events(1)[0],
            GatewayEvent::PolicyQueried { .. }
        ));
    }

    #[test]
    fn test_started_event_quotes_arguments() {
        let argv = vec!["grep".to_string(), "two words".to_string(), "-n".to_string()];
        let rendered = render_argv(&argv);
        assert_eq!(shlex::split(&rendered).unwrap(), argv);

        let event = GatewayEvent::CommandStarted {
            request_id: Uuid::nil(),
            argv,
            timestamp: Instant::now(),
        };
        assert!(event.describe().ends_with(&rendered));
    }

    #[test]
    fn test_clones_share_state() {
        let collector = TelemetryCollector::new();
        let clone = collector.clone();
        clone.record(GatewayEvent::PolicyQueried {
            timestamp: Instant::now(),
        });
        assert_eq!(collector.event_count(), 1);
    }

    #[test]
    fn test_describe_event() {
        let event = GatewayEvent::CommandTimedOut {
            request_id: Uuid::nil(),
            timeout_secs: 1,
            timestamp: Instant::now(),
        };
        assert!(event.describe().starts_with("[TIMEOUT]"));
        assert!(event.is_problem());
    }
}
