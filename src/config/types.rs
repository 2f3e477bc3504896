use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub news: NewsConfig,

    #[serde(default)]
    pub script: ScriptConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub narration: NarrationConfig,

    #[serde(default)]
    pub assembly: AssemblyConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Root of the per-version artifact namespaces
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Plain-text file holding the current version number
    #[serde(default = "default_counter_file")]
    pub counter_file: PathBuf,

    /// JSON file holding processed topics and their fingerprints
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_counter_file() -> PathBuf {
    PathBuf::from("./video_counter.txt")
}
fn default_history_file() -> PathBuf {
    PathBuf::from("./history/history_manager.json")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            counter_file: default_counter_file(),
            history_file: default_history_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewsConfig {
    #[serde(default = "default_news_url")]
    pub base_url: String,

    /// Search expression sent as `q`
    #[serde(default = "default_news_query")]
    pub query: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_news_timeout")]
    pub timeout_secs: u64,

    /// Falls back to the `NEWS_API_KEY` environment variable
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

fn default_news_url() -> String {
    "https://newsapi.org".to_string()
}
fn default_news_query() -> String {
    r#"technology OR tech OR AI OR "artificial intelligence" OR ML OR "machine learning" OR gadgets OR software"#
        .to_string()
}
fn default_page_size() -> u32 {
    50
}
fn default_language() -> String {
    "en".to_string()
}
fn default_news_timeout() -> u64 {
    10
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: default_news_url(),
            query: default_news_query(),
            page_size: default_page_size(),
            language: default_language(),
            timeout_secs: default_news_timeout(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptConfig {
    /// OpenAI-compatible API base (Groq by default)
    #[serde(default = "default_chat_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Target video length in seconds
    #[serde(default = "default_video_duration")]
    pub video_duration_secs: u32,

    /// Each scene covers this many seconds of the video
    #[serde(default = "default_seconds_per_scene")]
    pub seconds_per_scene: u32,

    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,

    /// Falls back to the `GROQ_API_KEY` environment variable
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

fn default_chat_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_video_duration() -> u32 {
    30
}
fn default_seconds_per_scene() -> u32 {
    5
}
fn default_collaborator_timeout() -> u64 {
    120
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            video_duration_secs: default_video_duration(),
            seconds_per_scene: default_seconds_per_scene(),
            timeout_secs: default_collaborator_timeout(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImagesConfig {
    #[serde(default = "default_image_endpoint")]
    pub endpoint: String,

    /// Appended to every visual prompt
    #[serde(default = "default_prompt_suffix")]
    pub prompt_suffix: String,

    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,

    /// Scenes generated at once (1 = strictly sequential)
    #[serde(default = "default_concurrency")]
    pub max_concurrent: usize,

    /// Falls back to the `HF_API_KEY` environment variable
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

fn default_image_endpoint() -> String {
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-xl-base-1.0"
        .to_string()
}
fn default_prompt_suffix() -> String {
    ", ultra high resolution, cinematic lighting, 8k, news photography".to_string()
}
fn default_concurrency() -> usize {
    1
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            endpoint: default_image_endpoint(),
            prompt_suffix: default_prompt_suffix(),
            timeout_secs: default_collaborator_timeout(),
            max_concurrent: default_concurrency(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NarrationConfig {
    /// edge-tts voice name; `STORY_VOICE` overrides it
    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default = "default_rate")]
    pub rate: String,

    #[serde(default = "default_pitch")]
    pub pitch: String,

    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_concurrency")]
    pub max_concurrent: usize,
}

fn default_voice() -> String {
    "en-GB-RyanNeural".to_string()
}
fn default_rate() -> String {
    "-5%".to_string()
}
fn default_pitch() -> String {
    "-2Hz".to_string()
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            rate: default_rate(),
            pitch: default_pitch(),
            timeout_secs: default_collaborator_timeout(),
            max_concurrent: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssemblyConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Output frame size; stills are letterboxed into it
    #[serde(default = "default_frame_side")]
    pub width: u32,

    #[serde(default = "default_frame_side")]
    pub height: u32,

    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    /// Fade-in and fade-out length applied to every scene
    #[serde(default = "default_fade")]
    pub fade_secs: f32,

    #[serde(default = "default_threads")]
    pub threads: u32,

    #[serde(default = "default_assembly_timeout")]
    pub timeout_secs: u64,
}

fn default_fps() -> u32 {
    30
}
fn default_frame_side() -> u32 {
    1024
}
fn default_video_codec() -> String {
    "libx264".to_string()
}
fn default_audio_codec() -> String {
    "aac".to_string()
}
fn default_preset() -> String {
    "medium".to_string()
}
fn default_fade() -> f32 {
    0.5
}
fn default_threads() -> u32 {
    4
}
fn default_assembly_timeout() -> u64 {
    1800
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            width: default_frame_side(),
            height: default_frame_side(),
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            preset: default_preset(),
            fade_secs: default_fade(),
            threads: default_threads(),
            timeout_secs: default_assembly_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishConfig {
    #[serde(default = "default_studio_url")]
    pub studio_url: String,

    /// Chrome user-data-dir that is already logged in to the target
    #[serde(default = "default_profile_dir")]
    pub profile_dir: PathBuf,

    #[serde(default = "default_driver_port")]
    pub driver_port: u16,

    #[serde(default)]
    pub headless: bool,

    /// Pause after loading the console before looking for controls
    #[serde(default = "default_settle")]
    pub settle_secs: u64,

    /// Pause after each click or keystroke batch in the console
    #[serde(default = "default_action_pause")]
    pub action_pause_millis: u64,

    /// Interval between upload-readiness probes
    #[serde(default = "default_processing_poll")]
    pub processing_poll_secs: u64,

    /// Ceiling on the upload-readiness wait; the workflow continues after it
    #[serde(default = "default_processing_max_wait")]
    pub processing_max_wait_secs: u64,

    /// Interval between lookups inside a single locator strategy
    #[serde(default = "default_strategy_poll")]
    pub strategy_poll_millis: u64,

    #[serde(default = "default_made_for_kids")]
    pub made_for_kids: bool,

    #[serde(default)]
    pub visibility: Visibility,
}

fn default_studio_url() -> String {
    "https://studio.youtube.com".to_string()
}
fn default_profile_dir() -> PathBuf {
    PathBuf::from("./chrome-profile")
}
fn default_driver_port() -> u16 {
    9515
}
fn default_settle() -> u64 {
    8
}
fn default_action_pause() -> u64 {
    1000
}
fn default_processing_poll() -> u64 {
    3
}
fn default_processing_max_wait() -> u64 {
    300
}
fn default_strategy_poll() -> u64 {
    500
}
fn default_made_for_kids() -> bool {
    true
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            studio_url: default_studio_url(),
            profile_dir: default_profile_dir(),
            driver_port: default_driver_port(),
            headless: false,
            settle_secs: default_settle(),
            action_pause_millis: default_action_pause(),
            processing_poll_secs: default_processing_poll(),
            processing_max_wait_secs: default_processing_max_wait(),
            strategy_poll_millis: default_strategy_poll(),
            made_for_kids: default_made_for_kids(),
            visibility: Visibility::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl Visibility {
    /// The `name` attribute of the matching radio control in the console.
    pub fn radio_name(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Unlisted => "UNLISTED",
            Self::Private => "PRIVATE",
        }
    }

    /// The label text shown next to the radio control.
    pub fn label(self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Unlisted => "Unlisted",
            Self::Private => "Private",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    #[serde(default)]
    pub edge_tts_path: Option<PathBuf>,

    #[serde(default)]
    pub chromedriver_path: Option<PathBuf>,
}
