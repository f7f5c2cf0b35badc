//! Daily summary report.

use countbot_channels::RetryPolicy;
use countbot_core::error::Result;
use countbot_core::types::Day;
use serde::Serialize;
use std::fmt;

use crate::CountBot;

const SEPARATOR: &str = "-----------------------------";

/// Reply sent when `@participantes` comes from a group that is not selected.
pub const NOT_SELECTED_REPLY: &str = "Este grupo não está na lista de grupos selecionados para contagem.";

/// One group block of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupLine {
    pub name: String,
    pub participants: usize,
    pub entries: u32,
    pub exits: u32,
}

/// A built report. `Display` renders the exact chat text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub date: String,
    /// Groups in the registry, including ones whose lookup failed.
    pub group_count: usize,
    /// Live participants over the groups that could be fetched.
    pub participants: usize,
    /// Sum over every counter row of the day.
    pub entries: u64,
    pub exits: u64,
    pub groups: Vec<GroupLine>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Resumo do dia {}:", self.date)?;
        writeln!(f, "Total de grupos: {}", self.group_count)?;
        writeln!(f, "Total de participantes: {}", self.participants)?;
        writeln!(f, "Total de entradas hoje: {}", self.entries)?;
        writeln!(f, "Total de saídas hoje: {}", self.exits)?;
        writeln!(f, "{SEPARATOR}")?;
        for group in &self.groups {
            writeln!(f, "{SEPARATOR}")?;
            writeln!(f, "Grupo: {}", group.name)?;
            writeln!(f, "Total de Participantes: {}", group.participants)?;
            writeln!(f, "Entradas hoje: {}", group.entries)?;
            writeln!(f, "Saídas hoje: {}", group.exits)?;
        }
        Ok(())
    }
}

impl CountBot {
    /// Build the report for `day`, fetching each registry group's metadata
    /// under `policy`. Groups whose lookup fails are left out of the body.
    pub async fn build_report(&self, day: Day, policy: RetryPolicy) -> Result<Report> {
        let groups = self.registry.list_groups()?;
        let counters = self.counters.get_counters(day)?;

        let mut report = Report {
            date: day.key(),
            group_count: groups.len(),
            participants: 0,
            entries: counters.iter().map(|c| u64::from(c.entries)).sum(),
            exits: counters.iter().map(|c| u64::from(c.exits)).sum(),
            groups: Vec::with_capacity(groups.len()),
        };

        for group in &groups {
            let meta = match self.metadata.fetch(&group.id, policy).await {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!("Skipping {} in report: {e}", group.name);
                    continue;
                }
            };
            let (entries, exits) = counters
                .iter()
                .find(|c| c.group_id == group.id)
                .map_or((0, 0), |c| (c.entries, c.exits));

            report.participants += meta.participant_count();
            report.groups.push(GroupLine {
                name: group.name.clone(),
                participants: meta.participant_count(),
                entries,
                exits,
            });
        }

        Ok(report)
    }

    /// Scheduled report: build with the background policy and deliver to
    /// every selected group in turn. Returns the number of destinations.
    pub async fn broadcast_report(&self, day: Day) -> Result<usize> {
        tracing::info!("📊 Building report for {day}");
        let policy = self.background_policy();
        let text = self.build_report(day, policy).await?.to_string();

        let selected = self.registry.list_selected()?;
        if selected.is_empty() {
            tracing::warn!("No selected groups, report for {day} not sent");
        }
        for group in &selected {
            self.delivery.deliver(&group.id, &text, Some(&group.name), policy).await?;
        }
        Ok(selected.len())
    }

    /// On-demand report for the chat that asked. Chats that are not
    /// selected get a refusal instead.
    pub async fn reply_report(&self, chat_id: &str, day: Day) -> Result<()> {
        let reply = if self.registry.is_selected(chat_id)? {
            self.build_report(day, self.lookup_policy()).await?.to_string()
        } else {
            tracing::info!("Group {chat_id} is not selected, refusing report");
            NOT_SELECTED_REPLY.to_string()
        };
        self.delivery.deliver(chat_id, &reply, None, self.interactive_policy()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bot, FakeTransport};
    use countbot_core::traits::{CounterStore, GroupRegistry};
    use countbot_core::types::CounterKind;
    use std::sync::Arc;

    fn day() -> Day {
        Day::parse("10/05/2024").unwrap()
    }

    fn bump(store: &dyn CounterStore, group: &str, kind: CounterKind, n: u32) {
        for _ in 0..n {
            store.increment_counter(group, day(), kind).unwrap();
        }
    }

    #[tokio::test]
    async fn test_report_layout_and_totals() {
        let transport = Arc::new(
            FakeTransport::new()
                .with_group("a@g.us", "Offertando - A", 10)
                .with_group("b@g.us", "Offertando - B", 5),
        );
        let (bot, store) = bot(transport);
        bot.update_group_list().await.unwrap();
        bump(store.as_ref(), "a@g.us", CounterKind::Entries, 2);
        bump(store.as_ref(), "b@g.us", CounterKind::Exits, 1);

        let report = bot.build_report(day(), RetryPolicy::default()).await.unwrap();

        assert_eq!(
            report.to_string(),
            "Resumo do dia 10/05/2024:\n\
             Total de grupos: 2\n\
             Total de participantes: 15\n\
             Total de entradas hoje: 2\n\
             Total de saídas hoje: 1\n\
             -----------------------------\n\
             -----------------------------\n\
             Grupo: Offertando - A\n\
             Total de Participantes: 10\n\
             Entradas hoje: 2\n\
             Saídas hoje: 0\n\
             -----------------------------\n\
             Grupo: Offertando - B\n\
             Total de Participantes: 5\n\
             Entradas hoje: 0\n\
             Saídas hoje: 1\n"
        );
    }

    #[tokio::test]
    async fn test_failed_lookup_skips_group_block() {
        let transport = Arc::new(
            FakeTransport::new()
                .with_group("a@g.us", "Offertando - A", 10)
                .with_group("b@g.us", "Offertando - B", 5)
                .with_broken_metadata("b@g.us"),
        );
        let (bot, store) = bot(transport);
        bot.update_group_list().await.unwrap();
        bump(store.as_ref(), "b@g.us", CounterKind::Entries, 4);

        let report = bot.build_report(day(), bot.lookup_policy()).await.unwrap();

        assert_eq!(report.group_count, 2);
        assert_eq!(report.participants, 10);
        assert_eq!(report.entries, 4);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].name, "Offertando - A");
    }

    #[tokio::test]
    async fn test_empty_registry_report() {
        let (bot, _store) = bot(Arc::new(FakeTransport::new()));
        let report = bot.build_report(day(), RetryPolicy::default()).await.unwrap();
        assert_eq!(
            report.to_string(),
            "Resumo do dia 10/05/2024:\nTotal de grupos: 0\nTotal de participantes: 0\n\
             Total de entradas hoje: 0\nTotal de saídas hoje: 0\n-----------------------------\n"
        );
    }

    #[tokio::test]
    async fn test_reply_report_refuses_unselected_chat() {
        let transport = Arc::new(FakeTransport::new().with_group("a@g.us", "Offertando - A", 3));
        let (bot, _store) = bot(transport.clone());

        bot.reply_report("x@g.us", day()).await.unwrap();

        assert_eq!(transport.sent(), vec![("x@g.us".to_string(), NOT_SELECTED_REPLY.to_string())]);
    }

    #[tokio::test]
    async fn test_reply_report_to_selected_chat() {
        let transport = Arc::new(FakeTransport::new().with_group("a@g.us", "Offertando - A", 3));
        let (bot, store) = bot(transport.clone());
        bot.update_group_list().await.unwrap();
        store.mark_selected("r@g.us", "Relatórios").unwrap();

        bot.reply_report("r@g.us", day()).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "r@g.us");
        assert!(sent[0].1.starts_with("Resumo do dia 10/05/2024:\nTotal de grupos: 1\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_retries_each_destination() {
        let transport = Arc::new(
            FakeTransport::new()
                .with_group("a@g.us", "Offertando - A", 3)
                .with_failing_sends(2),
        );
        let (bot, store) = bot(transport.clone());
        bot.update_group_list().await.unwrap();
        store.mark_selected("r1@g.us", "Um").unwrap();
        store.mark_selected("r2@g.us", "Dois").unwrap();

        let delivered = bot.broadcast_report(day()).await.unwrap();

        assert_eq!(delivered, 2);
        let to: Vec<String> = transport.sent().into_iter().map(|(id, _)| id).collect();
        assert_eq!(to, vec!["r1@g.us", "r2@g.us"]);
    }
}
