//! Chat commands. A message is a command only when its whole trimmed,
//! lower-cased body equals one of the configured command words.

use countbot_core::config::CommandsConfig;
use countbot_core::error::Result;
use countbot_core::types::{Day, IncomingMessage};

use crate::CountBot;

pub const SELECTED_REPLY: &str = "Grupo salvo para verificação agendada.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `@participantes`: report for today, sent back to the asking chat.
    Participants,
    /// `@selecionargrupo`: register the asking chat as a report destination.
    Select,
    /// `@atualizargrupos`: re-sync the registry from the bridge.
    UpdateGroups,
}

impl Command {
    pub fn parse(text: &str, commands: &CommandsConfig) -> Option<Self> {
        let text = text.trim().to_lowercase();
        let is = |word: &str| text == word.trim().to_lowercase();
        if is(&commands.participants) {
            Some(Self::Participants)
        } else if is(&commands.select) {
            Some(Self::Select)
        } else if is(&commands.update_groups) {
            Some(Self::UpdateGroups)
        } else {
            None
        }
    }
}

pub fn group_list_reply(monitored: usize) -> String {
    format!("Lista de grupos atualizada: {monitored} grupos monitorados.")
}

impl CountBot {
    /// Dispatch a chat message. Returns the command it carried, if any.
    pub async fn handle_message(&self, message: &IncomingMessage) -> Result<Option<Command>> {
        let Some(command) = Command::parse(&message.text, &self.config.commands) else {
            return Ok(None);
        };
        tracing::info!("Command {command:?} from {}", message.chat_id);

        match command {
            Command::Participants => self.reply_report(&message.chat_id, Day::today()).await?,
            Command::Select => self.select_group(&message.chat_id).await?,
            Command::UpdateGroups => {
                let groups = self.update_group_list().await?;
                self.delivery
                    .deliver(&message.chat_id, &group_list_reply(groups.len()), None, self.interactive_policy())
                    .await?;
            }
        }
        Ok(Some(command))
    }

    /// Mark `chat_id` as selected under its current subject and confirm.
    pub async fn select_group(&self, chat_id: &str) -> Result<()> {
        let meta = self.metadata.fetch(chat_id, self.lookup_policy()).await?;
        self.registry.mark_selected(&meta.id, meta.subject.trim())?;
        tracing::info!("✅ Group selected: {}", meta.subject.trim());
        self.delivery
            .deliver(chat_id, SELECTED_REPLY, Some(meta.subject.trim()), self.interactive_policy())
            .await
    }
}
