//! Per-guild channel membership.
//!
//! Guilds only ever configure a handful of channels, so lookups are linear scans over the guild's
//! list.

use serenity::all::{ChannelId, GuildId};
use std::collections::BTreeMap;

/// What a configured channel is used for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    /// Every message is answered by the text generation API
    Ai,
    /// Every message is a prompt for the image generation API
    Imagine,
}

impl ChannelKind {
    pub fn other(self) -> Self {
        match self {
            ChannelKind::Ai => ChannelKind::Imagine,
            ChannelKind::Imagine => ChannelKind::Ai,
        }
    }

    /// Human-facing purpose, e.g. "set for AI chat"
    pub fn purpose(self) -> &'static str {
        match self {
            ChannelKind::Ai => "AI chat",
            ChannelKind::Imagine => "image generation",
        }
    }

    /// Human-facing name used in embed titles
    pub fn title(self) -> &'static str {
        match self {
            ChannelKind::Ai => "AI",
            ChannelKind::Imagine => "Imagine",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnableOutcome {
    Added,
    AlreadyPresent,
    /// The channel is already used for the other kind
    InOtherSet(ChannelKind),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisableOutcome {
    Removed,
    NotPresent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveBindingOutcome {
    Removed,
    NotFound,
}

/// Ordered channels per guild.  A channel appears at most once per guild.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GuildChannelSet(BTreeMap<GuildId, Vec<ChannelId>>);

impl GuildChannelSet {
    pub fn contains(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        self.list(guild_id).contains(&channel_id)
    }

    /// Returns false if the channel was already present.
    pub fn insert(&mut self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        let channels = self.0.entry(guild_id).or_default();
        if channels.contains(&channel_id) {
            return false;
        }
        channels.push(channel_id);
        true
    }

    /// Returns false if the channel was not present.  Drops the guild once its last channel is
    /// gone.
    pub fn remove(&mut self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        let Some(channels) = self.0.get_mut(&guild_id) else {
            return false;
        };
        let Some(index) = channels.iter().position(|id| *id == channel_id) else {
            return false;
        };
        channels.remove(index);
        if channels.is_empty() {
            self.0.remove(&guild_id);
        }
        true
    }

    /// Channels in the order they were added
    pub fn list(&self, guild_id: GuildId) -> &[ChannelId] {
        self.0.get(&guild_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns true if the guild had any channels.
    pub fn remove_guild(&mut self, guild_id: GuildId) -> bool {
        self.0.remove(&guild_id).is_some()
    }

    /// Number of channels across all guilds
    pub fn total(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

/// Where connection errors are reported for a guild
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogBinding {
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
}

/// At most one changelog channel per guild
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChangelogBindings(BTreeMap<GuildId, ChangelogBinding>);

impl ChangelogBindings {
    /// Replaces any previous binding for the guild.
    pub fn set(&mut self, guild_id: GuildId, channel_id: ChannelId) {
        self.0.insert(
            guild_id,
            ChangelogBinding {
                channel_id,
                guild_id,
            },
        );
    }

    /// Only removes the binding if it points at `channel_id`.
    pub fn remove(&mut self, guild_id: GuildId, channel_id: ChannelId) -> RemoveBindingOutcome {
        match self.0.get(&guild_id) {
            Some(binding) if binding.channel_id == channel_id => {
                self.0.remove(&guild_id);
                RemoveBindingOutcome::Removed
            }
            _ => RemoveBindingOutcome::NotFound,
        }
    }

    pub fn remove_guild(&mut self, guild_id: GuildId) -> bool {
        self.0.remove(&guild_id).is_some()
    }

    pub fn channels(&self) -> Vec<(GuildId, ChannelId)> {
        self.0
            .iter()
            .map(|(guild_id, binding)| (*guild_id, binding.channel_id))
            .collect()
    }
}
