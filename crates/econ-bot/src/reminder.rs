//! Release reminder poller
//!
//! A timer loop that keeps the release calendar fresh and posts a reminder
//! to every subscribed channel shortly before each scheduled release.

use crate::calendar::{CalendarSnapshot, CalendarSource, ReleaseEvent};
use crate::config::BotConfig;
use crate::error::Result;
use crate::subscriptions::SubscriptionStore;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use chrono_tz::US::Eastern;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;

/// Calendar cache shared between the poller and the `events` command
pub type SharedEvents = Arc<RwLock<Vec<ReleaseEvent>>>;

/// Delivers a reminder to one channel
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel_id: u64, event: &ReleaseEvent) -> Result<()>;
}

/// Poller timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSettings {
    /// Time between ticks
    pub poll_interval: Duration,
    /// Maximum age of the cached calendar
    pub refresh_interval: Duration,
    /// How long before a release the reminder goes out
    pub lead: Duration,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            refresh_interval: Duration::from_secs(24 * 60 * 60),
            lead: Duration::from_secs(15 * 60),
        }
    }
}

impl ReminderSettings {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            refresh_interval: config.calendar_refresh_interval,
            lead: config.reminder_lead,
        }
    }
}

/// Whether `event` is due for a reminder at `now`
///
/// Only events with a known release instant qualify, and only while
/// `0 < release - now <= lead`.
pub fn in_release_window(event: &ReleaseEvent, now: DateTime<Utc>, lead: Duration) -> bool {
    let Some(scheduled_at) = event.scheduled_at else {
        return false;
    };
    let lead = TimeDelta::from_std(lead).unwrap_or(TimeDelta::MAX);
    let until = scheduled_at - now;
    until > TimeDelta::zero() && until <= lead
}

#[derive(Debug, Default)]
struct PollState {
    last_refresh: Option<DateTime<Utc>>,
    notified: HashSet<(String, NaiveDate)>,
}

/// Periodic calendar refresh and reminder delivery
pub struct ReminderPoller<S: ?Sized, N> {
    source: Arc<S>,
    notifier: N,
    subscriptions: Arc<SubscriptionStore>,
    events: SharedEvents,
    settings: ReminderSettings,
    state: PollState,
}

impl<S, N> ReminderPoller<S, N>
where
    S: CalendarSource + ?Sized,
    N: Notifier,
{
    pub fn new(
        source: Arc<S>,
        notifier: N,
        subscriptions: Arc<SubscriptionStore>,
        events: SharedEvents,
        settings: ReminderSettings,
    ) -> Self {
        Self {
            source,
            notifier,
            subscriptions,
            events,
            settings,
            state: PollState::default(),
        }
    }

    /// Run forever, ticking every poll interval
    pub async fn run(mut self) {
        tracing::info!(
            poll_secs = self.settings.poll_interval.as_secs(),
            lead_secs = self.settings.lead.as_secs(),
            "Reminder poller started"
        );

        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let sent = self.tick(Utc::now()).await;
            if sent > 0 {
                tracing::info!(sent, "Release reminders sent");
            }
        }
    }

    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        let max_age = TimeDelta::from_std(self.settings.refresh_interval).unwrap_or(TimeDelta::MAX);
        self.state
            .last_refresh
            .is_none_or(|last| now - last >= max_age)
    }

    /// Install a fresh calendar
    ///
    /// An incomplete calendar is used as is but not stamped, so the next tick
    /// fetches it again.
    async fn apply_refresh(&mut self, snapshot: CalendarSnapshot, now: DateTime<Utc>) {
        if snapshot.is_complete() {
            self.state.last_refresh = Some(now);
        } else {
            tracing::warn!(
                unresolved = ?snapshot.unresolved,
                "Calendar incomplete, retrying next tick"
            );
        }
        *self.events.write().await = snapshot.events;
    }

    /// One poll cycle; returns the number of reminders delivered
    pub async fn tick(&mut self, now: DateTime<Utc>) -> usize {
        if self.needs_refresh(now) {
            match self.source.upcoming_releases(now).await {
                Ok(snapshot) => self.apply_refresh(snapshot, now).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Calendar refresh failed, skipping cycle");
                    return 0;
                }
            }
        }

        let today = now.with_timezone(&Eastern).date_naive();
        self.state.notified.retain(|(_, date)| *date >= today);

        let due: Vec<ReleaseEvent> = self
            .events
            .read()
            .await
            .iter()
            .filter(|event| in_release_window(event, now, self.settings.lead))
            .filter(|event| !self.state.notified.contains(&event.key()))
            .cloned()
            .collect();

        if due.is_empty() {
            return 0;
        }

        let channels = self.subscriptions.list_subscribers().await;
        if channels.is_empty() {
            tracing::debug!(due = due.len(), "Releases due but no subscribed channels");
            return 0;
        }

        let mut sent = 0;
        for event in &due {
            for &channel_id in &channels {
                match self.notifier.notify(channel_id, event).await {
                    Ok(()) => sent += 1,
                    Err(e) => tracing::warn!(
                        channel_id,
                        series_id = %event.series_id,
                        error = %e,
                        "Failed to deliver reminder"
                    ),
                }
            }
            self.state.notified.insert(event.key());
        }

        sent
    }
}
