use std::time::{Duration, Instant};

use crate::matching::library::ArtworkMetadata;

/// 変化が収まるまで作用を遅らせるデバウンスタイマー
///
/// reset のたびに締め切りを引き直すので、以前の発火予定はその時点で
/// 無効になる。fire_ready は締め切りを過ぎた最初の呼び出しで一度だけ
/// true を返す。
#[derive(Debug)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// 締め切りを now + delay に引き直す
    pub fn reset(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// 発火予定を取り消す
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// 締め切りを過ぎていれば予定を消化して true を返す
    pub fn fire_ready(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline.saturating_duration_since(now).is_zero() => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// 作品情報ページの URL を組み立てる
///
/// QR コードのペイロードと、クリックで開くリンクの両方に使う。
pub fn info_url(base_url: &str, object_id: &str) -> String {
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    format!("{}/info.html?id={}", base, object_id)
}

/// スクリーンリーダー向けの読み上げ文
pub fn announcement_text(metadata: &ArtworkMetadata) -> String {
    format!(
        "Matched artwork: {} by {}",
        metadata.display_title(),
        metadata.display_artist()
    )
}
