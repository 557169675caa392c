//! Render settings sent with every video generation request.
//!
//! The renderer picks its visual pattern and ambient audio from the theme and
//! layers chosen here; both are derived from keywords in the prompt.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::post::Platform;

pub const VIDEO_DURATION_SECS: u32 = 30;

static RAINFOREST: LazyLock<Regex> = LazyLock::new(|| keyword(&["rainforest", "forest"]));
static COASTAL: LazyLock<Regex> = LazyLock::new(|| keyword(&["beach", "coastal"]));
static OFFICE: LazyLock<Regex> = LazyLock::new(|| keyword(&["office"]));
static WORKSPACE: LazyLock<Regex> = LazyLock::new(|| keyword(&["office", "workspace"]));
static AUTOMATION: LazyLock<Regex> = LazyLock::new(|| keyword(&["automation"]));
static GROWTH: LazyLock<Regex> = LazyLock::new(|| keyword(&["growth", "success"]));

/// Case-insensitive substring match: "backoffice" counts as office.
fn keyword(words: &[&str]) -> Regex {
    let pattern = format!("(?i)({})", words.join("|"));
    // Patterns are built from the literal word lists above.
    Regex::new(&pattern).expect("keyword pattern is valid")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoTheme {
    Rainforest,
    Coastal,
    Workspace,
    Ambient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSettings {
    pub duration_secs: u32,
    pub width: u32,
    pub height: u32,
    pub theme: VideoTheme,
    pub audio_layers: Vec<String>,
}

impl RenderSettings {
    /// Landscape 1920x1080, or vertical 1080x1920 for short-form platforms.
    pub fn for_post(platform: Platform, prompt: &str) -> Self {
        let (width, height) = if platform.is_short_form() {
            (1080, 1920)
        } else {
            (1920, 1080)
        };
        Self {
            duration_secs: VIDEO_DURATION_SECS,
            width,
            height,
            theme: theme_for(prompt),
            audio_layers: audio_layers_for(prompt),
        }
    }
}

pub fn theme_for(prompt: &str) -> VideoTheme {
    if RAINFOREST.is_match(prompt) {
        VideoTheme::Rainforest
    } else if COASTAL.is_match(prompt) {
        VideoTheme::Coastal
    } else if OFFICE.is_match(prompt) || AUTOMATION.is_match(prompt) {
        VideoTheme::Workspace
    } else {
        VideoTheme::Ambient
    }
}

/// Ambient sound layers: one environment set, then any mood sets.
pub fn audio_layers_for(prompt: &str) -> Vec<String> {
    let mut layers: Vec<&str> = Vec::new();

    if RAINFOREST.is_match(prompt) {
        layers.extend(["gentle_rain", "bird_calls", "rustling_leaves"]);
    } else if COASTAL.is_match(prompt) {
        layers.extend(["ocean_waves", "gentle_breeze"]);
    } else if WORKSPACE.is_match(prompt) {
        layers.extend(["soft_typing", "paper_shuffle", "coffee_pour"]);
    }

    if AUTOMATION.is_match(prompt) {
        layers.extend(["mechanical_clicks", "soft_notifications"]);
    }
    if GROWTH.is_match(prompt) {
        layers.extend(["satisfying_completion", "achievement_chime"]);
    }

    layers.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_platforms_render_vertically() {
        let tiktok = RenderSettings::for_post(Platform::Tiktok, "calm beach at dawn");
        assert_eq!((tiktok.width, tiktok.height), (1080, 1920));
        assert_eq!(tiktok.theme, VideoTheme::Coastal);
        assert_eq!(tiktok.duration_secs, 30);

        let youtube = RenderSettings::for_post(Platform::Youtube, "calm beach at dawn");
        assert_eq!((youtube.width, youtube.height), (1920, 1080));
    }

    #[test]
    fn layers_combine_environment_and_mood() {
        let layers = audio_layers_for("Rainforest retreat celebrating business Growth through automation");
        assert_eq!(
            layers,
            vec![
                "gentle_rain",
                "bird_calls",
                "rustling_leaves",
                "mechanical_clicks",
                "soft_notifications",
                "satisfying_completion",
                "achievement_chime",
            ]
        );
    }

    #[test]
    fn automation_alone_selects_workspace_theme_without_office_sounds() {
        assert_eq!(theme_for("Automation in action"), VideoTheme::Workspace);
        assert_eq!(
            audio_layers_for("Automation in action"),
            vec!["mechanical_clicks", "soft_notifications"]
        );
        assert_eq!(theme_for("a quiet morning"), VideoTheme::Ambient);
        assert!(audio_layers_for("a quiet morning").is_empty());
    }

    #[test]
    fn keywords_match_inside_longer_words() {
        assert_eq!(theme_for("A tidy backoffice"), VideoTheme::Workspace);
        assert_eq!(
            audio_layers_for("A tidy backoffice"),
            vec!["soft_typing", "paper_shuffle", "coffee_pour"]
        );
        assert_eq!(
            audio_layers_for("Turning unsuccessful launches around"),
            vec!["satisfying_completion", "achievement_chime"]
        );
    }

    #[test]
    fn workspace_adds_office_sounds_but_keeps_ambient_visuals() {
        assert_eq!(theme_for("A calm shared workspace"), VideoTheme::Ambient);
        assert_eq!(
            audio_layers_for("A calm shared workspace"),
            vec!["soft_typing", "paper_shuffle", "coffee_pour"]
        );
    }
}
