use crate::{
    log_error, log_internal,
    routing::{
        ChangelogBindings, ChannelKind, DisableOutcome, EnableOutcome, GuildChannelSet,
        RemoveBindingOutcome,
    },
};
use anyhow::{anyhow, Result};
use serenity::all::{ChannelId, GuildId};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

const CHANNELS_FILE_NAME: &str = "ai-channels.json";
const CHANGELOGS_FILE_NAME: &str = "changelogs.json";

/// State which persists across sessions
///
/// Every mutation is written through to disk before returning.
pub struct PersistentState {
    dir: PathBuf,
    channels: ChannelsDocument,
    changelogs: ChangelogsDocument,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelsDocument {
    ai_channels: GuildChannelSet,
    #[serde(default)]
    imagine_channels: GuildChannelSet,
}

/// Older versions stored the AI channel mapping bare, without the `aiChannels` wrapper.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ChannelsFile {
    Current(ChannelsDocument),
    Legacy(GuildChannelSet),
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangelogsDocument {
    #[serde(default)]
    changelog_channels: ChangelogBindings,
}

impl PersistentState {
    pub async fn load() -> Result<Self> {
        Ok(Self::load_from(crate::config::config_dir()?).await)
    }

    /// Missing or unreadable documents start out empty.
    pub async fn load_from(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();

        let channels = match read_document::<ChannelsFile>(&dir.join(CHANNELS_FILE_NAME)).await {
            Ok(Some(ChannelsFile::Current(doc))) => doc,
            Ok(Some(ChannelsFile::Legacy(ai_channels))) => ChannelsDocument {
                ai_channels,
                imagine_channels: GuildChannelSet::default(),
            },
            Ok(None) => ChannelsDocument::default(),
            Err(e) => {
                log_error!("Error loading channel settings: {}", e);
                ChannelsDocument::default()
            }
        };

        let changelogs = match read_document(&dir.join(CHANGELOGS_FILE_NAME)).await {
            Ok(Some(doc)) => doc,
            Ok(None) => ChangelogsDocument::default(),
            Err(e) => {
                log_error!("Error loading changelog channels: {}", e);
                ChangelogsDocument::default()
            }
        };

        Self {
            dir,
            channels,
            changelogs,
        }
    }

    pub async fn save_channels(&self) -> Result<()> {
        write_document(&self.dir.join(CHANNELS_FILE_NAME), &self.channels).await
    }

    pub async fn save_changelogs(&self) -> Result<()> {
        write_document(&self.dir.join(CHANGELOGS_FILE_NAME), &self.changelogs).await
    }

    /// Swap in an edited channels document and save it.  On failure the previous document is
    /// restored.
    async fn commit_channels(&mut self, channels: ChannelsDocument) -> Result<()> {
        let previous = std::mem::replace(&mut self.channels, channels);
        if let Err(e) = self.save_channels().await {
            self.channels = previous;
            return Err(e);
        }
        Ok(())
    }

    async fn commit_changelogs(&mut self, changelogs: ChangelogsDocument) -> Result<()> {
        let previous = std::mem::replace(&mut self.changelogs, changelogs);
        if let Err(e) = self.save_changelogs().await {
            self.changelogs = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn is_enabled(&self, kind: ChannelKind, guild_id: GuildId, channel_id: ChannelId) -> bool {
        self.channels.set(kind).contains(guild_id, channel_id)
    }

    /// What the channel is configured for, if anything.  Image generation wins should a channel
    /// somehow be in both sets.
    pub fn classify(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<ChannelKind> {
        [ChannelKind::Imagine, ChannelKind::Ai]
            .into_iter()
            .find(|kind| self.is_enabled(*kind, guild_id, channel_id))
    }

    pub async fn enable(
        &mut self,
        kind: ChannelKind,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<EnableOutcome> {
        if self.is_enabled(kind.other(), guild_id, channel_id) {
            return Ok(EnableOutcome::InOtherSet(kind.other()));
        }
        let mut channels = self.channels.clone();
        if !channels.set_mut(kind).insert(guild_id, channel_id) {
            return Ok(EnableOutcome::AlreadyPresent);
        }
        self.commit_channels(channels).await?;
        Ok(EnableOutcome::Added)
    }

    pub async fn disable(
        &mut self,
        kind: ChannelKind,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<DisableOutcome> {
        let mut channels = self.channels.clone();
        if !channels.set_mut(kind).remove(guild_id, channel_id) {
            return Ok(DisableOutcome::NotPresent);
        }
        self.commit_channels(channels).await?;
        Ok(DisableOutcome::Removed)
    }

    pub fn list(&self, kind: ChannelKind, guild_id: GuildId) -> &[ChannelId] {
        self.channels.set(kind).list(guild_id)
    }

    pub fn total(&self, kind: ChannelKind) -> usize {
        self.channels.set(kind).total()
    }

    pub async fn set_changelog(&mut self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        let mut changelogs = self.changelogs.clone();
        changelogs.changelog_channels.set(guild_id, channel_id);
        self.commit_changelogs(changelogs).await
    }

    pub async fn remove_changelog(
        &mut self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<RemoveBindingOutcome> {
        let mut changelogs = self.changelogs.clone();
        let outcome = changelogs.changelog_channels.remove(guild_id, channel_id);
        if outcome == RemoveBindingOutcome::Removed {
            self.commit_changelogs(changelogs).await?;
        }
        Ok(outcome)
    }

    pub fn changelog_channels(&self) -> Vec<(GuildId, ChannelId)> {
        self.changelogs.changelog_channels.channels()
    }

    /// Forget everything about a guild, e.g. after the bot was removed from it.
    pub async fn purge_guild(&mut self, guild_id: GuildId) -> Result<()> {
        let mut channels = self.channels.clone();
        if channels.ai_channels.remove_guild(guild_id) {
            log_internal!("Removed AI channels for guild {}", guild_id);
        }
        if channels.imagine_channels.remove_guild(guild_id) {
            log_internal!("Removed imagine channels for guild {}", guild_id);
        }
        self.commit_channels(channels).await?;

        let mut changelogs = self.changelogs.clone();
        if changelogs.changelog_channels.remove_guild(guild_id) {
            log_internal!("Removed changelog channel for guild {}", guild_id);
        }
        self.commit_changelogs(changelogs).await
    }
}

impl ChannelsDocument {
    fn set(&self, kind: ChannelKind) -> &GuildChannelSet {
        match kind {
            ChannelKind::Ai => &self.ai_channels,
            ChannelKind::Imagine => &self.imagine_channels,
        }
    }

    fn set_mut(&mut self, kind: ChannelKind) -> &mut GuildChannelSet {
        match kind {
            ChannelKind::Ai => &mut self.ai_channels,
            ChannelKind::Imagine => &mut self.imagine_channels,
        }
    }
}

/// Ok(None) if the document does not exist yet.
async fn read_document<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(anyhow!(
                "Could not read state at `{}`: {}",
                path.to_string_lossy(),
                e
            ))
        }
    };

    serde_json::from_slice(&data).map(Some).map_err(|e| {
        anyhow!(
            "Could not parse state at `{}`: {}",
            path.to_string_lossy(),
            e
        )
    })
}

async fn write_document<T: serde::Serialize>(path: &Path, document: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(document)
        .map_err(|e| anyhow!("Could not serialize state: {}", e))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            anyhow!(
                "Could not create directory `{}`: {}",
                parent.to_string_lossy(),
                e
            )
        })?;
    }

    // Create a temporary file in the same directory.
    let tmp_path = path.with_extension("json.new");

    tokio::fs::write(&tmp_path, serialized).await.map_err(|e| {
        anyhow!(
            "Could not write state to temporary file `{}`: {}",
            tmp_path.to_string_lossy(),
            e
        )
    })?;

    // Atomically rename the temporary file over the target file.
    tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
        anyhow!(
            "Could not rename temporary file `{}` to `{}`: {}",
            tmp_path.to_string_lossy(),
            path.to_string_lossy(),
            e
        )
    })?;

    log_internal!("Saved {}", path.to_string_lossy());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild() -> GuildId {
        GuildId::new(700)
    }

    fn channel() -> ChannelId {
        ChannelId::new(800)
    }

    #[tokio::test]
    async fn starts_empty_without_documents() {
        let dir = tempfile::tempdir().unwrap();
        let state = PersistentState::load_from(dir.path()).await;

        assert_eq!(state.total(ChannelKind::Ai), 0);
        assert_eq!(state.total(ChannelKind::Imagine), 0);
        assert!(state.changelog_channels().is_empty());
    }

    #[tokio::test]
    async fn enabling_twice_reports_already_present() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = PersistentState::load_from(dir.path()).await;

        let first = state.enable(ChannelKind::Ai, guild(), channel()).await.unwrap();
        let second = state.enable(ChannelKind::Ai, guild(), channel()).await.unwrap();

        assert_eq!(first, EnableOutcome::Added);
        assert_eq!(second, EnableOutcome::AlreadyPresent);
        assert_eq!(state.list(ChannelKind::Ai, guild()).len(), 1);
    }

    #[tokio::test]
    async fn enable_then_disable_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = PersistentState::load_from(dir.path()).await;
        let kept = ChannelId::new(801);

        state.enable(ChannelKind::Imagine, guild(), channel()).await.unwrap();
        state.enable(ChannelKind::Imagine, guild(), kept).await.unwrap();
        let outcome = state
            .disable(ChannelKind::Imagine, guild(), channel())
            .await
            .unwrap();

        assert_eq!(outcome, DisableOutcome::Removed);
        assert!(!state.is_enabled(ChannelKind::Imagine, guild(), channel()));

        let reloaded = PersistentState::load_from(dir.path()).await;
        assert_eq!(reloaded.channels, state.channels);
        assert_eq!(reloaded.list(ChannelKind::Imagine, guild()), &[kept]);
    }

    /// A state directory that can never be created: its parent is a regular file.
    async fn unwritable_state() -> (tempfile::TempDir, PersistentState) {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, "not a directory").await.unwrap();
        let state = PersistentState::load_from(blocker.join("state")).await;
        (dir, state)
    }

    #[tokio::test]
    async fn failed_enable_leaves_memory_unchanged() {
        let (_dir, mut state) = unwritable_state().await;

        assert!(state.enable(ChannelKind::Ai, guild(), channel()).await.is_err());
        assert!(!state.is_enabled(ChannelKind::Ai, guild(), channel()));

        // A retry fails the same way instead of claiming the channel is already set
        assert!(state.enable(ChannelKind::Ai, guild(), channel()).await.is_err());
        assert_eq!(state.total(ChannelKind::Ai), 0);
    }

    #[tokio::test]
    async fn failed_disable_keeps_the_channel() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = PersistentState::load_from(dir.path()).await;
        state.enable(ChannelKind::Imagine, guild(), channel()).await.unwrap();

        // Make the next save fail by putting a directory where the temporary file goes
        tokio::fs::create_dir(dir.path().join("ai-channels.json.new"))
            .await
            .unwrap();

        assert!(state
            .disable(ChannelKind::Imagine, guild(), channel())
            .await
            .is_err());
        assert!(state.is_enabled(ChannelKind::Imagine, guild(), channel()));
    }

    #[tokio::test]
    async fn failed_changelog_set_leaves_no_binding() {
        let (_dir, mut state) = unwritable_state().await;

        assert!(state.set_changelog(guild(), channel()).await.is_err());
        assert!(state.changelog_channels().is_empty());
    }

    #[tokio::test]
    async fn disabling_unknown_channel_is_not_present() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = PersistentState::load_from(dir.path()).await;

        let outcome = state
            .disable(ChannelKind::Ai, guild(), channel())
            .await
            .unwrap();

        assert_eq!(outcome, DisableOutcome::NotPresent);
        assert!(!dir.path().join(CHANNELS_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn channel_cannot_serve_both_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = PersistentState::load_from(dir.path()).await;

        state.enable(ChannelKind::Ai, guild(), channel()).await.unwrap();
        let outcome = state
            .enable(ChannelKind::Imagine, guild(), channel())
            .await
            .unwrap();

        assert_eq!(outcome, EnableOutcome::InOtherSet(ChannelKind::Ai));
        assert_eq!(state.classify(guild(), channel()), Some(ChannelKind::Ai));
    }

    #[tokio::test]
    async fn legacy_document_loads_as_ai_channels() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join(CHANNELS_FILE_NAME),
            r#"{ "700": ["800", "801"] }"#,
        )
        .await
        .unwrap();

        let state = PersistentState::load_from(dir.path()).await;

        assert_eq!(
            state.list(ChannelKind::Ai, guild()),
            &[ChannelId::new(800), ChannelId::new(801)]
        );
        assert_eq!(state.total(ChannelKind::Imagine), 0);
    }

    #[tokio::test]
    async fn image_channels_take_precedence_in_hand_edited_documents() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join(CHANNELS_FILE_NAME),
            r#"{ "aiChannels": { "700": ["800"] }, "imagineChannels": { "700": ["800"] } }"#,
        )
        .await
        .unwrap();

        let state = PersistentState::load_from(dir.path()).await;

        assert_eq!(state.classify(guild(), channel()), Some(ChannelKind::Imagine));
        assert_eq!(state.classify(guild(), ChannelId::new(1)), None);
    }

    #[tokio::test]
    async fn corrupt_documents_fall_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(CHANNELS_FILE_NAME), "{ not json")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join(CHANGELOGS_FILE_NAME), r#"{ "changelogChannels": 5 }"#)
            .await
            .unwrap();

        let state = PersistentState::load_from(dir.path()).await;

        assert_eq!(state.total(ChannelKind::Ai), 0);
        assert!(state.changelog_channels().is_empty());
    }

    #[tokio::test]
    async fn changelog_remove_with_other_channel_keeps_binding() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = PersistentState::load_from(dir.path()).await;
        state.set_changelog(guild(), channel()).await.unwrap();

        let outcome = state
            .remove_changelog(guild(), ChannelId::new(999))
            .await
            .unwrap();

        assert_eq!(outcome, RemoveBindingOutcome::NotFound);
        let reloaded = PersistentState::load_from(dir.path()).await;
        assert_eq!(reloaded.changelog_channels(), vec![(guild(), channel())]);
    }

    #[tokio::test]
    async fn changelog_document_uses_wrapped_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = PersistentState::load_from(dir.path()).await;
        state.set_changelog(guild(), channel()).await.unwrap();

        let raw = tokio::fs::read_to_string(dir.path().join(CHANGELOGS_FILE_NAME))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let binding = &value["changelogChannels"]["700"];

        assert!(binding["channelId"].is_string() || binding["channelId"].is_u64());
        assert!(binding["guildId"].is_string() || binding["guildId"].is_u64());
    }

    #[tokio::test]
    async fn purge_removes_every_trace_of_guild() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = PersistentState::load_from(dir.path()).await;
        let survivor = GuildId::new(55);

        state.enable(ChannelKind::Ai, guild(), channel()).await.unwrap();
        state
            .enable(ChannelKind::Imagine, guild(), ChannelId::new(801))
            .await
            .unwrap();
        state.set_changelog(guild(), ChannelId::new(802)).await.unwrap();
        state
            .enable(ChannelKind::Ai, survivor, ChannelId::new(66))
            .await
            .unwrap();

        state.purge_guild(guild()).await.unwrap();

        for file in [CHANNELS_FILE_NAME, CHANGELOGS_FILE_NAME] {
            let raw = tokio::fs::read_to_string(dir.path().join(file))
                .await
                .unwrap();
            assert!(!raw.contains("700"), "{} still mentions the guild", file);
        }
        let reloaded = PersistentState::load_from(dir.path()).await;
        assert_eq!(reloaded.list(ChannelKind::Ai, survivor), &[ChannelId::new(66)]);
        assert!(reloaded.changelog_channels().is_empty());
    }
}
