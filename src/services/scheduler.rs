//! Daily broadcast scheduler
//!
//! Wakes up periodically. Inside the morning or evening window of the
//! schedule calendar it sends that window's broadcast, at most once per day:
//! prepared content is claimed and delivered, and a window that opens with
//! nothing prepared has its slot reserved and closed as failed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveTime, Timelike};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::models::{Broadcast, BroadcastStatus};
use crate::services::broadcast::{BroadcastService, DeliverySummary};
use crate::services::newsletter::NewsletterManager;
use crate::services::registry::ManagedService;
use crate::utils::errors::Result;

/// Registry name of the shared [`BroadcastScheduler`]
pub const SCHEDULER_SERVICE: &str = "broadcast_scheduler";

/// Part of the day, on the schedule calendar, in which a broadcast type goes out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastWindow {
    pub broadcast_type: &'static str,
    pub emoji: &'static str,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl BroadcastWindow {
    /// Both ends inclusive
    pub fn contains(&self, time: NaiveTime) -> bool {
        let minute_of_day = time.hour() * 60 + time.minute();
        (self.start_hour * 60..=self.end_hour * 60).contains(&minute_of_day)
    }
}

pub const WISDOM_WINDOW: BroadcastWindow = BroadcastWindow {
    broadcast_type: "wisdom",
    emoji: "🌅",
    start_hour: 6,
    end_hour: 12,
};

pub const QUIZ_WINDOW: BroadcastWindow = BroadcastWindow {
    broadcast_type: "quiz",
    emoji: "🌆",
    start_hour: 18,
    end_hour: 22,
};

pub const BROADCAST_WINDOWS: &[BroadcastWindow] = &[WISDOM_WINDOW, QUIZ_WINDOW];

pub fn window_at(time: NaiveTime) -> Option<&'static BroadcastWindow> {
    BROADCAST_WINDOWS.iter().find(|window| window.contains(time))
}

/// What one scheduler check did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledRun {
    Delivered(DeliverySummary),
    /// The window opened without prepared content
    NoContent { broadcast_id: i64 },
}

/// Snapshot for the `/schedule_status` admin command
#[derive(Debug, Clone)]
pub struct ScheduleStatus {
    pub now: DateTime<FixedOffset>,
    pub last_check: Option<DateTime<FixedOffset>>,
    pub running: bool,
    pub today: Vec<(BroadcastWindow, Option<Broadcast>)>,
}

pub struct BroadcastScheduler {
    newsletter: Arc<NewsletterManager>,
    broadcaster: Arc<BroadcastService>,
    interval: Duration,
    last_check: RwLock<Option<DateTime<FixedOffset>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BroadcastScheduler {
    pub fn new(
        newsletter: Arc<NewsletterManager>,
        broadcaster: Arc<BroadcastService>,
        interval: Duration,
    ) -> Self {
        Self {
            newsletter,
            broadcaster,
            interval,
            last_check: RwLock::new(None),
            task: Mutex::new(None),
        }
    }

    /// Spawn the periodic check; a second call is a no-op
    pub async fn start(self: &Arc<Self>) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            warn!("Broadcast scheduler is already running");
            return;
        }

        let scheduler = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.interval);
            loop {
                ticker.tick().await;
                scheduler.tick().await;
            }
        }));

        info!(interval = ?self.interval, "Broadcast scheduler started");
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
            info!("Broadcast scheduler stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    /// One check at the current schedule time. Errors are logged.
    pub async fn tick(&self) {
        let now = self.newsletter.schedule_now();
        match self.run_due(now).await {
            Ok(Some(ScheduledRun::Delivered(summary))) => info!(
                broadcast_id = summary.broadcast_id,
                sent = summary.sent,
                failed = summary.failed,
                "Scheduled broadcast delivered"
            ),
            Ok(Some(ScheduledRun::NoContent { broadcast_id })) => {
                warn!(broadcast_id, "Scheduled broadcast had no content")
            }
            Ok(None) => {}
            Err(e) => error!(error = %e, "Scheduled broadcast check failed"),
        }
    }

    /// Send the broadcast due at `now`, if any and not yet handled today
    pub async fn run_due(&self, now: DateTime<FixedOffset>) -> Result<Option<ScheduledRun>> {
        *self.last_check.write().await = Some(now);

        let Some(window) = window_at(now.time()) else {
            debug!(time = %now.format("%H:%M"), "Outside broadcast windows");
            return Ok(None);
        };
        let date = now.date_naive();
        let broadcast_type = window.broadcast_type;

        if let Some(existing) = self.newsletter.get_broadcast_for_date(date, broadcast_type).await? {
            if !existing.is_ready() {
                debug!(broadcast_id = existing.id, status = %existing.status, "Broadcast already handled today");
                return Ok(None);
            }
            if !self.newsletter.claim_prepared_broadcast(existing.id).await? {
                return Ok(None);
            }

            return match existing.content() {
                Some(content) => {
                    info!(broadcast_id = existing.id, broadcast_type, "Delivering prepared broadcast");
                    let summary = self.broadcaster.deliver(existing.id, &content).await?;
                    Ok(Some(ScheduledRun::Delivered(summary)))
                }
                None => self.close_without_content(existing.id).await.map(Some),
            };
        }

        match self.newsletter.reserve_broadcast_slot_on(date, broadcast_type).await? {
            Some(broadcast_id) => self.close_without_content(broadcast_id).await.map(Some),
            None => Ok(None),
        }
    }

    async fn close_without_content(&self, broadcast_id: i64) -> Result<ScheduledRun> {
        warn!(broadcast_id, "No prepared content for broadcast window, closing slot");
        self.newsletter
            .database()
            .broadcasts
            .complete(broadcast_id, BroadcastStatus::Failed, 0, 0, 0)
            .await?;
        Ok(ScheduledRun::NoContent { broadcast_id })
    }

    pub async fn status(&self) -> Result<ScheduleStatus> {
        let now = self.newsletter.schedule_now();
        let date = now.date_naive();

        let mut today = Vec::with_capacity(BROADCAST_WINDOWS.len());
        for window in BROADCAST_WINDOWS {
            let broadcast = self
                .newsletter
                .get_broadcast_for_date(date, window.broadcast_type)
                .await?;
            today.push((*window, broadcast));
        }

        Ok(ScheduleStatus {
            now,
            last_check: *self.last_check.read().await,
            running: self.is_running().await,
            today,
        })
    }
}

#[async_trait]
impl ManagedService for BroadcastScheduler {
    async fn cleanup(&self) -> Result<()> {
        self.stop().await;
        Ok(())
    }
}

/// Plain-text schedule overview for the `/schedule_status` reply
pub fn format_schedule_status(status: &ScheduleStatus) -> String {
    let mut lines = vec![
        format!("📅 Broadcast schedule (UTC{})", status.now.offset()),
        String::new(),
        format!("🕒 Now: {}", status.now.format("%Y-%m-%d %H:%M")),
        format!(
            "🔎 Last check: {}",
            status
                .last_check
                .map(|at| at.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string())
        ),
        format!(
            "⚙️ Scheduler: {}",
            if status.running { "running" } else { "stopped" }
        ),
        String::new(),
    ];

    for (window, broadcast) in &status.today {
        let state = match broadcast {
            None => "not sent yet".to_string(),
            Some(b) if b.status == BroadcastStatus::Completed.as_str() => format!(
                "completed, {}/{} delivered",
                b.successful_deliveries, b.total_recipients
            ),
            Some(b) => b.status.clone(),
        };
        lines.push(format!(
            "{} {} {:02}:00-{:02}:00: {}",
            window.emoji, window.broadcast_type, window.start_hour, window.end_hour, state
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_window_at() {
        assert_eq!(window_at(at(5, 59)), None);
        assert_eq!(window_at(at(6, 0)).map(|w| w.broadcast_type), Some("wisdom"));
        assert_eq!(window_at(at(12, 0)).map(|w| w.broadcast_type), Some("wisdom"));
        assert_eq!(window_at(at(12, 1)), None);
        assert_eq!(window_at(at(18, 30)).map(|w| w.broadcast_type), Some("quiz"));
        assert_eq!(window_at(at(22, 0)).map(|w| w.broadcast_type), Some("quiz"));
        assert_eq!(window_at(at(23, 0)), None);
    }

    fn broadcast(status: &str, sent: i32, total: i32) -> Broadcast {
        Broadcast {
            id: 1,
            broadcast_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            broadcast_type: "wisdom".to_string(),
            wisdom_content: None,
            image_url: None,
            status: status.to_string(),
            created_by: "auto_scheduler".to_string(),
            total_recipients: total,
            successful_deliveries: sent,
            failed_deliveries: total - sent,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn test_format_schedule_status() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = offset.with_ymd_and_hms(2025, 3, 14, 19, 5, 0).unwrap();
        let status = ScheduleStatus {
            now,
            last_check: None,
            running: true,
            today: vec![
                (WISDOM_WINDOW, Some(broadcast("completed", 8, 10))),
                (QUIZ_WINDOW, None),
            ],
        };

        let text = format_schedule_status(&status);
        assert!(text.starts_with("📅 Broadcast schedule (UTC+03:00)"));
        assert!(text.contains("🕒 Now: 2025-03-14 19:05"));
        assert!(text.contains("🔎 Last check: never"));
        assert!(text.contains("⚙️ Scheduler: running"));
        assert!(text.contains("🌅 wisdom 06:00-12:00: completed, 8/10 delivered"));
        assert!(text.contains("🌆 quiz 18:00-22:00: not sent yet"));
    }

    #[test]
    fn test_format_pending_status() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let now = offset.with_ymd_and_hms(2025, 3, 14, 7, 0, 0).unwrap();
        let status = ScheduleStatus {
            now,
            last_check: Some(now),
            running: false,
            today: vec![(WISDOM_WINDOW, Some(broadcast("sending", 0, 0)))],
        };

        let text = format_schedule_status(&status);
        assert!(text.contains("🔎 Last check: 07:00:00"));
        assert!(text.contains("⚙️ Scheduler: stopped"));
        assert!(text.contains("🌅 wisdom 06:00-12:00: sending"));
    }
}
