use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::pose::VECTOR_LEN;

// --- データ構造 ---

/// 作品メタデータ (事前計算ツールが書き出す美術館カタログ項目)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtworkMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl ArtworkMetadata {
    /// 表示用タイトル。未設定・空文字は "Untitled"
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => "Untitled",
        }
    }

    /// 表示用作者名。未設定・空文字は "Unknown artist"
    pub fn display_artist(&self) -> &str {
        match self.artist.as_deref() {
            Some(artist) if !artist.is_empty() => artist,
            _ => "Unknown artist",
        }
    }
}

/// 参照エントリ 1 件 (作品 1 点ぶんの事前計算結果)
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceEntry {
    /// 作品識別子。古い書き出しではキーが "id"
    #[serde(alias = "id")]
    pub object_id: String,
    /// 事前計算済みの L2 正規化ベクトル。欠けたエントリは照合から外れる
    #[serde(default)]
    pub l2_vector: Option<Vec<f32>>,
    /// 作品画像のファイル名 (画像ディレクトリ相対)
    pub filename: String,
    #[serde(default)]
    pub metadata: ArtworkMetadata,
}

// --- 読み込み ---

/// 起動時に一度読み込み、以後は不変の参照セット
#[derive(Debug, Clone)]
pub struct ReferenceLibrary {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceLibrary {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference file: {}", path.display()))?;
        let library = Self::from_json(&content)
            .with_context(|| format!("Invalid reference file: {}", path.display()))?;
        info!(
            "Loaded {} reference entries ({} with vectors) from {}",
            library.len(),
            library.usable_count(),
            path.display()
        );
        Ok(library)
    }

    /// JSON 文字列から構築する
    ///
    /// 事前計算ツールの書き出しには配列版とキー付きオブジェクト版が
    /// あるため両対応。ここで一度だけ配列に畳み込み、以降の照合コードは
    /// 形を気にしない。オブジェクト版の順序はファイルのキー順のまま。
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).context("Reference data is not valid JSON")?;

        let raw_entries: Vec<serde_json::Value> = match value {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
            _ => bail!("Reference data must be a JSON array or object"),
        };

        let mut entries = Vec::with_capacity(raw_entries.len());
        for (i, raw) in raw_entries.into_iter().enumerate() {
            let entry: ReferenceEntry = serde_json::from_value(raw)
                .with_context(|| format!("Invalid reference entry at index {}", i))?;
            entries.push(entry);
        }

        for entry in &entries {
            match &entry.l2_vector {
                Some(vector) if vector.len() != VECTOR_LEN => {
                    warn!(
                        "Reference entry {} has vector length {} (expected {})",
                        entry.object_id,
                        vector.len(),
                        VECTOR_LEN
                    );
                }
                Some(_) => {}
                None => {
                    warn!("Reference entry {} has no vector, skipped in matching", entry.object_id);
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<ReferenceEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// ベクトルを持つ (照合対象になる) エントリ数
    pub fn usable_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.l2_vector.is_some())
            .count()
    }
}
