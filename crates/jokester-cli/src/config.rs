//! Configuration vault – reads/writes `~/.jokester/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use jokester_skill::{JokeScript, SkillConfig};

/// Settings of the simulated robot the CLI drives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSettings {
    /// How long a simulated clip "plays" before its completion event.
    #[serde(default = "default_clip_ms")]
    pub clip_ms: u64,

    /// Publish audio-completion events for every clip played.
    #[serde(default = "default_true")]
    pub auto_complete: bool,

    /// Audio catalog of the simulated robot.  Empty means every clip the
    /// joke script names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audio: Vec<String>,

    /// Image catalog.  Empty means every image the joke script names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

fn default_clip_ms() -> u64 {
    2_500
}
fn default_true() -> bool {
    true
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            clip_ms: default_clip_ms(),
            auto_complete: true,
            audio: Vec::new(),
            images: Vec::new(),
        }
    }
}

impl SimSettings {
    /// The audio catalog to load, falling back to the script's clips.
    pub fn audio_catalog(&self, script: &JokeScript) -> Vec<String> {
        if !self.audio.is_empty() {
            return self.audio.clone();
        }
        let mut clips: Vec<String> = script.intro.iter().map(|l| l.clip.clone()).collect();
        clips.extend(script.mood_clips.iter().cloned());
        clips.extend(script.joke_clips.iter().cloned());
        clips.extend(script.laugh_clips.iter().cloned());
        clips.extend(script.identity_greetings.iter().map(|g| g.clip.clone()));
        clips.push(script.end_clip.clone());
        clips.push(script.greeting_clip.clone());
        clips.push(script.fallback_clip.clone());
        clips.sort();
        clips.dedup();
        clips
    }

    /// The image catalog to load, falling back to the script's images.
    pub fn image_catalog(&self, script: &JokeScript) -> Vec<String> {
        if !self.images.is_empty() {
            return self.images.clone();
        }
        let mut images = vec![
            script.default_image.clone(),
            script.hilarious_image.clone(),
            script.known_face_image.clone(),
            script.key_phrase_image.clone(),
        ];
        images.extend(script.unknown_face_images.iter().cloned());
        images.extend(script.identity_greetings.iter().map(|g| g.image.clone()));
        images.sort();
        images.dedup();
        images
    }
}

/// Persisted user configuration stored in `~/.jokester/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Host-side timeout; the skill gets `on_timeout` after this long.
    #[serde(default = "default_timeout_secs")]
    pub skill_timeout_secs: u64,

    #[serde(default)]
    pub sim: SimSettings,

    #[serde(default)]
    pub skill: SkillConfig,
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            skill_timeout_secs: default_timeout_secs(),
            sim: SimSettings::default(),
            skill: SkillConfig::default(),
        }
    }
}

/// Return the path to `~/.jokester/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".jokester").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    cfg.skill
        .validate()
        .map_err(|e| format!("Invalid skill settings: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `JOKESTER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `JOKESTER_SIM_CLIP_MS` | `sim.clip_ms` |
/// | `JOKESTER_SKILL_TIMEOUT_SECS` | `skill_timeout_secs` |
/// | `JOKESTER_KEY_PHRASE` | `skill.key_phrase_enabled` (`1`/`true`/`on`) |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("JOKESTER_SIM_CLIP_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.sim.clip_ms = ms;
    }
    if let Ok(v) = std::env::var("JOKESTER_SKILL_TIMEOUT_SECS")
        && let Ok(secs) = v.trim().parse::<u64>()
    {
        cfg.skill_timeout_secs = secs;
    }
    if let Ok(v) = std::env::var("JOKESTER_KEY_PHRASE")
        && let Some(enabled) = parse_switch(&v)
    {
        cfg.skill.key_phrase_enabled = enabled;
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Save the config to disk, creating `~/.jokester/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
