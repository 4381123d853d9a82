use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub effects: EffectsConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// メインループの回転数 (照合周期とは別)
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    /// ログレベル ("error" / "warn" / "info" / "debug" / "trace")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingConfig {
    /// 照合パスの周期 (ミリ秒)
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// キーポイント採用の信頼度下限
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// 参照ファイルのパス
    #[serde(default = "default_reference_path")]
    pub reference_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssetsConfig {
    /// 作品画像のディレクトリ
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EffectsConfig {
    /// ベストマッチ確定までの静止時間 (ミリ秒)
    #[serde(default = "default_announce_delay_ms")]
    pub announce_delay_ms: u64,
    /// 作品情報ページのベース URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayConfig {
    /// 再生するキャプチャファイル (JSON Lines)
    #[serde(default = "default_capture_path")]
    pub capture_path: String,
    /// 再生レート
    #[serde(default = "default_replay_fps")]
    pub fps: f64,
    /// 末尾まで再生したら先頭へ戻るか
    #[serde(default = "default_loop_playback")]
    pub loop_playback: bool,
}

fn default_target_fps() -> u32 { 30 }
fn default_log_level() -> String { "info".to_string() }
fn default_update_interval_ms() -> u64 { 250 }
fn default_confidence_threshold() -> f32 { 0.1 }
fn default_reference_path() -> String { "input_image_metadata.json".to_string() }
fn default_image_dir() -> String { "input_images".to_string() }
fn default_announce_delay_ms() -> u64 { 1500 }
fn default_base_url() -> String { "http://localhost:8000/".to_string() }
fn default_capture_path() -> String { "captures/session.jsonl".to_string() }
fn default_replay_fps() -> f64 { 15.0 }
fn default_loop_playback() -> bool { true }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            log_level: default_log_level(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval_ms(),
            confidence_threshold: default_confidence_threshold(),
            reference_path: default_reference_path(),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
        }
    }
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            announce_delay_ms: default_announce_delay_ms(),
            base_url: default_base_url(),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            capture_path: default_capture_path(),
            fps: default_replay_fps(),
            loop_playback: default_loop_playback(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    /// 設定ファイルがなければデフォルトで起動する
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Config not loaded ({:#}), using defaults", err);
                Self::default()
            }
        }
    }
}
