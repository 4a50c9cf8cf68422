// File: tunebot-core/src/services/replies.rs

use twilight_model::channel::message::Embed;
use twilight_util::builder::embed::{
    EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder, ImageSource,
};

use tunebot_common::models::{ReapReason, SessionNotice, SessionSnapshot, Track};

use crate::services::commands::COMMAND_HELP;
use crate::utils::{format_duration, track_line};

const GREEN: u32 = 0x2E_CC_71;
const BLUE: u32 = 0x34_98_DB;

/// How many upcoming tracks the queue embed lists before summarising.
pub const QUEUE_PREVIEW_LEN: usize = 10;

/// What the bot answers with in the invoking channel.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Text(String),
    /// An embed, optionally with a plain line above it in the same message.
    Embed { content: Option<String>, embed: Box<Embed> },
}

impl CommandReply {
    pub fn text(s: impl Into<String>) -> Self {
        CommandReply::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CommandReply::Text(s) => Some(s),
            CommandReply::Embed { .. } => None,
        }
    }

    /// Plain line sent along with an embed.
    pub fn content(&self) -> Option<&str> {
        match self {
            CommandReply::Embed { content, .. } => content.as_deref(),
            CommandReply::Text(_) => None,
        }
    }

    pub fn with_content(self, line: impl Into<String>) -> Self {
        match self {
            CommandReply::Embed { embed, .. } => {
                CommandReply::Embed { content: Some(line.into()), embed }
            }
            CommandReply::Text(text) => CommandReply::Text(format!("{}\n{text}", line.into())),
        }
    }

    pub fn as_embed(&self) -> Option<&Embed> {
        match self {
            CommandReply::Embed { embed, .. } => Some(embed),
            CommandReply::Text(_) => None,
        }
    }
}

impl From<Embed> for CommandReply {
    fn from(e: Embed) -> Self {
        CommandReply::Embed { content: None, embed: Box::new(e) }
    }
}

fn with_thumbnail(builder: EmbedBuilder, track: &Track) -> EmbedBuilder {
    match track.thumbnail_url.as_deref().map(ImageSource::url) {
        Some(Ok(source)) => builder.thumbnail(source),
        _ => builder,
    }
}

fn requester_mention(track: &Track) -> String {
    track
        .requester
        .as_ref()
        .map(|r| r.mention())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn status_label(snapshot: &SessionSnapshot) -> &'static str {
    if snapshot.is_paused() { "⏸️ Paused" } else { "▶️ Playing" }
}

fn volume_label(volume: f32) -> String {
    format!("{}%", (volume * 100.0).round() as i64)
}

pub fn song_added(track: &Track, position: usize) -> Embed {
    let builder = EmbedBuilder::new()
        .title("🎵 Song Added to Queue")
        .description(format!("**{}**", track.title))
        .color(GREEN)
        .field(EmbedFieldBuilder::new("Duration", format_duration(track.duration_secs)).inline())
        .field(EmbedFieldBuilder::new("Requested by", requester_mention(track)).inline())
        .field(EmbedFieldBuilder::new("Position in queue", position.to_string()).inline());
    with_thumbnail(builder, track).build()
}

pub fn now_playing(snapshot: &SessionSnapshot, track: &Track) -> Embed {
    let builder = EmbedBuilder::new()
        .title("🎵 Now Playing")
        .description(format!("**{}**", track.title))
        .color(GREEN)
        .field(EmbedFieldBuilder::new("Duration", format_duration(track.duration_secs)).inline())
        .field(EmbedFieldBuilder::new("Requested by", requester_mention(track)).inline())
        .field(EmbedFieldBuilder::new("Volume", volume_label(snapshot.volume)).inline())
        .field(EmbedFieldBuilder::new("Status", status_label(snapshot)).inline());
    with_thumbnail(builder, track).build()
}

pub fn queue(snapshot: &SessionSnapshot) -> Embed {
    let now = match &snapshot.current {
        Some(track) if snapshot.is_playing() => format!(
            "{} {}",
            status_label(snapshot),
            track_line(&track.title, track.duration_secs)
        ),
        Some(track) => format!("🔍 Loading {}", track_line(&track.title, track.duration_secs)),
        None => "Nothing is currently playing".to_string(),
    };

    let upcoming = if snapshot.queue.is_empty() {
        EmbedFieldBuilder::new("Up Next", "Queue is empty")
    } else {
        let mut lines: Vec<String> = snapshot
            .queue
            .iter()
            .take(QUEUE_PREVIEW_LEN)
            .enumerate()
            .map(|(i, t)| format!("{}. {}", i + 1, track_line(&t.title, t.duration_secs)))
            .collect();
        if snapshot.queue.len() > QUEUE_PREVIEW_LEN {
            lines.push(format!(
                "... and {} more songs",
                snapshot.queue.len() - QUEUE_PREVIEW_LEN
            ));
        }
        EmbedFieldBuilder::new(
            format!("Up Next ({} songs)", snapshot.queue.len()),
            lines.join("\n"),
        )
    };

    EmbedBuilder::new()
        .title("🎵 Music Queue")
        .color(BLUE)
        .field(EmbedFieldBuilder::new("Now Playing", now))
        .field(upcoming)
        .field(EmbedFieldBuilder::new("Volume", volume_label(snapshot.volume)).inline())
        .build()
}

pub fn help(prefix: &str) -> Embed {
    COMMAND_HELP
        .iter()
        .fold(
            EmbedBuilder::new()
                .title("🎵 Music Bot Commands")
                .description("Here are all the available commands:")
                .color(BLUE),
            |builder, (usage, description)| {
                builder.field(EmbedFieldBuilder::new(format!("`{prefix}{usage}`"), *description))
            },
        )
        .footer(EmbedFooterBuilder::new("🎵 Enjoy your music!"))
        .build()
}

/// Channel text for a session notice.
pub fn notice_text(notice: &SessionNotice) -> String {
    match notice {
        SessionNotice::TrackStarted { track, .. } => {
            format!("🎶 Now playing {}", track_line(&track.title, track.duration_secs))
        }
        SessionNotice::TrackSkipped { title, reason, .. } => {
            format!("⚠️ Skipped **{title}**: {reason}")
        }
        SessionNotice::QueueExhaustedByErrors { failures, .. } => format!(
            "❌ Stopped after {failures} songs in a row failed to play. Use `play` to try again."
        ),
        SessionNotice::Disconnected { reason, .. } => match reason {
            ReapReason::NothingPlaying => "👋 Left the voice channel after being idle.".to_string(),
            ReapReason::NoListeners => "👋 Left the voice channel since nobody was listening.".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunebot_common::models::{PlaybackState, Requester};

    fn snapshot(state: PlaybackState, current: Option<Track>, queue: Vec<Track>) -> SessionSnapshot {
        SessionSnapshot {
            guild_id: 1,
            state,
            current,
            queue,
            volume: 0.5,
            channel_id: Some(2),
        }
    }

    #[test]
    fn test_content_rides_along_with_embed() {
        let reply = CommandReply::from(song_added(&Track::new("Song", "https://y/1"), 1))
            .with_content("✅ Joined <#7>");
        assert_eq!(reply.content(), Some("✅ Joined <#7>"));
        assert!(reply.as_embed().is_some());

        let text = CommandReply::text("❌ nope").with_content("✅ Joined <#7>");
        assert_eq!(text.as_text(), Some("✅ Joined <#7>\n❌ nope"));
        assert_eq!(text.content(), None);
    }

    #[test]
    fn test_song_added_fields() {
        let track = Track::new("Song", "https://y/1")
            .with_duration(185)
            .with_thumbnail("https://i/1.jpg")
            .with_requester(Requester::new(42, "alice"));
        let embed = song_added(&track, 3);
        assert_eq!(embed.title.as_deref(), Some("🎵 Song Added to Queue"));
        assert_eq!(embed.description.as_deref(), Some("**Song**"));
        let values: Vec<(&str, &str)> =
            embed.fields.iter().map(|f| (f.name.as_str(), f.value.as_str())).collect();
        assert_eq!(
            values,
            vec![("Duration", "03:05"), ("Requested by", "<@42>"), ("Position in queue", "3")]
        );
        assert!(embed.thumbnail.is_some());
    }

    #[test]
    fn test_queue_embed_truncates_after_ten() {
        let tracks: Vec<Track> = (1..=13).map(|i| Track::new(format!("t{i}"), "u")).collect();
        let embed = queue(&snapshot(
            PlaybackState::Paused,
            Some(Track::new("cur", "u").with_duration(60)),
            tracks,
        ));
        assert_eq!(embed.fields[0].value, "⏸️ Paused **cur** [01:00]");
        assert_eq!(embed.fields[1].name, "Up Next (13 songs)");
        assert!(embed.fields[1].value.starts_with("1. **t1** [Unknown]"));
        assert!(embed.fields[1].value.ends_with("... and 3 more songs"));
        assert!(!embed.fields[1].value.contains("t11"));
        assert_eq!(embed.fields[2].value, "50%");
    }

    #[test]
    fn test_queue_embed_empty() {
        let embed = queue(&snapshot(PlaybackState::Idle, None, vec![]));
        assert_eq!(embed.fields[0].value, "Nothing is currently playing");
        assert_eq!(embed.fields[1].value, "Queue is empty");
    }

    #[test]
    fn test_help_lists_every_command() {
        let embed = help("!");
        assert_eq!(embed.fields.len(), COMMAND_HELP.len());
        assert_eq!(embed.fields[0].name, "`!play <song/url>`");
        assert!(embed.footer.is_some());
    }
}
