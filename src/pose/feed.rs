use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::keypoint::{NamedKeypoint, Pose};

/// 検出側 (カメラ + 検出器) の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// まだ一度も検出結果が届いていない
    Starting,
    /// 検出結果が届いている
    Live,
    /// 上流が失敗を報告した。次の結果が届くまで維持される
    Unavailable,
}

const STATUS_STARTING: u8 = 0;
const STATUS_LIVE: u8 = 1;
const STATUS_UNAVAILABLE: u8 = 2;

/// 検出結果 1 回ぶんのワイヤ形式 (キャプチャファイルの 1 姿勢)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedPose {
    pub keypoints: Vec<NamedKeypoint>,
}

/// 検出器コールバックと照合ループをつなぐ最新値スロット
///
/// コールバックは結果が来るたびに姿勢を丸ごと差し替え、照合側は
/// スナップショットを読むだけ。キューは持たず、読まれなかった結果は
/// 単に上書きされて消える。
#[derive(Clone)]
pub struct PoseFeed {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    latest: Mutex<Option<Pose>>,
    seq: AtomicU64,
    status: AtomicU8,
}

impl PoseFeed {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FeedInner {
                latest: Mutex::new(None),
                seq: AtomicU64::new(0),
                status: AtomicU8::new(STATUS_STARTING),
            }),
        }
    }

    /// 検出結果 1 回ぶんを反映する
    ///
    /// 複数人写っていても先頭の 1 姿勢だけ使う。空リストは
    /// 「誰も写っていない」としてスロットを空にする。
    pub fn publish(&self, poses: Vec<Pose>) {
        *self.inner.latest.lock().unwrap() = poses.into_iter().next();
        self.inner.seq.fetch_add(1, Ordering::Release);
        self.inner.status.store(STATUS_LIVE, Ordering::Release);
    }

    /// 上流の失敗 (カメラ不可など) を記録する
    pub fn mark_unavailable(&self) {
        self.inner
            .status
            .store(STATUS_UNAVAILABLE, Ordering::Release);
    }

    pub fn status(&self) -> FeedStatus {
        match self.inner.status.load(Ordering::Acquire) {
            STATUS_LIVE => FeedStatus::Live,
            STATUS_UNAVAILABLE => FeedStatus::Unavailable,
            _ => FeedStatus::Starting,
        }
    }

    /// 到着した結果の通し番号。新しい結果が届くたびに増える
    pub fn seq(&self) -> u64 {
        self.inner.seq.load(Ordering::Acquire)
    }

    /// 最新の姿勢のコピーを取る
    ///
    /// 差し替えは値ごと行われるので、書きかけの姿勢が見えることはない。
    /// 結果未着 (または直近が空) のときは None。
    pub fn snapshot(&self) -> Option<Pose> {
        self.inner.latest.lock().unwrap().clone()
    }
}

impl Default for PoseFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// キャプチャファイルを一定レートで再生するフィーダ
///
/// カメラなしで照合ループを回すための検出器スタンドイン。渡された
/// スロットへ、1 行 = 検出 1 回ぶんの姿勢リストを順に publish していく。
pub struct ReplayFeed {
    feed: PoseFeed,
    _handle: thread::JoinHandle<()>,
}

impl ReplayFeed {
    pub fn start<P: AsRef<Path>>(
        feed: PoseFeed,
        path: P,
        fps: f64,
        loop_playback: bool,
    ) -> Result<Self> {
        if fps <= 0.0 {
            bail!("Replay fps must be positive: {}", fps);
        }
        let frames = load_capture(path)?;
        if frames.is_empty() {
            bail!("Capture file has no frames");
        }

        let feed_ref = feed.clone();
        let interval = Duration::from_secs_f64(1.0 / fps);

        let handle = thread::spawn(move || loop {
            for poses in &frames {
                feed_ref.publish(poses.clone());
                thread::sleep(interval);
            }
            if !loop_playback {
                break;
            }
        });

        Ok(Self {
            feed,
            _handle: handle,
        })
    }

    pub fn feed(&self) -> PoseFeed {
        self.feed.clone()
    }
}

/// JSON Lines キャプチャを読み込む。1 行 = 検出 1 回ぶんの姿勢リスト
pub fn load_capture<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<Pose>>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open capture file: {}", path.display()))?;
    read_frames(BufReader::new(file))
}

fn read_frames(reader: impl BufRead) -> Result<Vec<Vec<Pose>>> {
    let mut frames = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read capture line")?;
        if line.trim().is_empty() {
            continue;
        }
        let captured: Vec<CapturedPose> = serde_json::from_str(&line)
            .with_context(|| format!("Invalid capture frame at line {}", line_no + 1))?;
        frames.push(
            captured
                .iter()
                .map(|pose| Pose::from_named(&pose.keypoints))
                .collect(),
        );
    }
    Ok(frames)
}
