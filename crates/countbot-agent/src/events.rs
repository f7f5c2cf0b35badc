//! Membership event processor.
//!
//! ```text
//! event ──▶ increment counters ──▶ first selected group? ──no──▶ done
//!                                        │yes
//!                                  fetch metadata ──err──▶ dropped (logged)
//!                                        │ok
//!                                  compose text ──▶ deliver (unbounded)
//! ```
//!
//! Counting never waits on the network: the counter moves first, so a
//! failed lookup or an empty selection only loses the notification.

use countbot_channels::RetryPolicy;
use countbot_core::error::Result;
use countbot_core::types::{CounterKind, DailyCounter, Day, MembershipEvent, ParticipantAction};

use crate::CountBot;

/// What happened to one membership event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not a join or leave.
    Ignored,
    /// Counters moved; `notified` tells whether a notification went out.
    Counted { counter: DailyCounter, notified: bool },
}

pub fn welcome_text(subject: &str, participants: usize, counter: &DailyCounter) -> String {
    format!(
        "🎉 Nova entrada no grupo!\n\n\
         Grupo: {subject}\n\
         Total de Participantes: {participants}\n\
         Entradas hoje: {}\n\
         Saídas hoje: {}\n\n\
         Ficamos felizes em ter mais um membro! 🎉",
        counter.entries, counter.exits
    )
}

pub fn farewell_text(subject: &str, participants: usize, counter: &DailyCounter) -> String {
    format!(
        "😢 Alguém saiu do grupo!\n\n\
         Grupo: {subject}\n\
         Total de Participantes: {participants}\n\
         Entradas hoje: {}\n\
         Saídas hoje: {}\n\n\
         Sentiremos sua falta! 😢",
        counter.entries, counter.exits
    )
}

impl CountBot {
    /// Process one membership event for today.
    pub async fn handle_membership_event(&self, event: &MembershipEvent) -> Result<EventOutcome> {
        self.handle_membership_event_on(event, Day::today()).await
    }

    /// Process one membership event, counting it on `day`.
    pub async fn handle_membership_event_on(&self, event: &MembershipEvent, day: Day) -> Result<EventOutcome> {
        let kind = match event.action {
            ParticipantAction::Add => CounterKind::Entries,
            ParticipantAction::Remove => CounterKind::Exits,
            other => {
                tracing::debug!("Ignoring {other:?} event in {}", event.group_id);
                return Ok(EventOutcome::Ignored);
            }
        };

        // An event without participant ids still stands for one member.
        let times = event.participants.len().max(1);
        let mut counter = DailyCounter::empty(&event.group_id, day);
        for _ in 0..times {
            counter = self
                .counters
                .increment_counter(&event.group_id, day, kind)
                .inspect_err(|e| tracing::error!("Counter update failed for {}: {e}", event.group_id))?;
        }
        tracing::info!(
            "{} +{times} in {} ({day}): entries={} exits={}",
            kind, event.group_id, counter.entries, counter.exits
        );

        let notified = self.notify(event, kind, &counter).await?;
        Ok(EventOutcome::Counted { counter, notified })
    }

    async fn notify(&self, event: &MembershipEvent, kind: CounterKind, counter: &DailyCounter) -> Result<bool> {
        let selected = self.registry.list_selected()?;
        let Some(report_group) = selected.first() else {
            tracing::debug!("No selected group, skipping notification for {}", event.group_id);
            return Ok(false);
        };

        let policy = if self.config.retry.event_metadata_unbounded {
            self.background_policy()
        } else {
            self.lookup_policy()
        };
        let meta = match self.metadata.fetch(&event.group_id, policy).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!("Notification for {} dropped: {e}", event.group_id);
                return Ok(false);
            }
        };

        let text = match kind {
            CounterKind::Entries => welcome_text(&meta.subject, meta.participant_count(), counter),
            CounterKind::Exits => farewell_text(&meta.subject, meta.participant_count(), counter),
        };
        self.delivery
            .deliver(&report_group.id, &text, Some(&report_group.name), RetryPolicy::broadcast(&self.config.retry))
            .await?;
        Ok(true)
    }
}
