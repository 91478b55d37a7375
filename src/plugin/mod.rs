use crate::{context::Context, event::*};
use anyhow::Result;

mod ai_chat;
mod bot;
mod changelog;
mod channel;
mod command_gate;
pub mod connection_error;
mod debug;
mod direct_message;
mod guild_cleanup;
mod ignore_bots;
mod image;
mod ready;

#[serenity::async_trait]
pub trait Plugin: Sync + Send {
    /// Plugin name.  Used for debug
    fn name(&self) -> &'static str;
    /// Help entries as `(usage, description)`.  Empty if the plugin has no commands
    fn usage(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }
    /// Potentially handle event.  Returns:
    /// - Ok(EventHandled::Yes) if the event has been handled and no other plugin should attempt to
    /// handle it
    /// - Ok(EventHandled::No) if another plugin should attempt to handle the event
    /// - Err if an error occurred
    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled>;
}

/// Ordered list of available plugins
pub fn plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        // Core bot operations
        Box::new(debug::Debug),
        Box::new(ready::Ready),
        Box::new(ignore_bots::IgnoreBots),
        Box::new(direct_message::DirectMessage),
        Box::new(command_gate::CommandGate),
        // Lifecycle
        Box::new(guild_cleanup::GuildCleanup),
        Box::new(connection_error::ConnectionError),
        // Commands
        Box::new(image::Image),
        Box::new(channel::Channel),
        Box::new(changelog::Changelog),
        Box::new(bot::Bot),
        // AI chat answers any remaining message in an AI channel.
        // Keep last.
        Box::new(ai_chat::AiChat),
    ]
}

/// Every plugin's help entries, in plugin order
pub fn usage() -> Vec<(&'static str, &'static str)> {
    plugins()
        .iter()
        .flat_map(|plugin| plugin.usage().iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_names_are_unique() {
        let mut names: Vec<&str> = plugins().iter().map(|p| p.name()).collect();
        let count = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), count);
    }

    #[test]
    fn help_lists_every_user_command() {
        let entries = usage();
        for expected in [
            "/image generate <prompt>",
            "/channel ai set/remove <channel>",
            "/bot ping",
            "/bot feedback <message>",
        ] {
            assert!(
                entries.iter().any(|(usage, _)| *usage == expected),
                "missing {}",
                expected
            );
        }
    }

    #[test]
    fn ai_chat_is_the_fallback() {
        assert_eq!(plugins().last().map(|p| p.name()), Some("ai_chat"));
    }
}
