use image::DynamicImage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::library::{ReferenceEntry, ReferenceLibrary};
use super::similarity::cosine_similarity;
use crate::assets::ImageCache;
use crate::config::Config;
use crate::effects::{announcement_text, info_url, Debounce};
use crate::pose::{normalize_pose, NormalizedPose, PoseFeed};

// --- パラメータ ---

/// 照合セッションの動作パラメータ
#[derive(Debug, Clone)]
pub struct SessionParams {
    /// 照合パスの周期
    pub update_interval: Duration,
    /// キーポイントを幾何計算に使う信頼度の下限 (これを超えたら採用)
    pub confidence_threshold: f32,
    /// ベストマッチがこの時間変わらなかったら QR / 読み上げを確定する
    pub announce_delay: Duration,
    /// 作品情報ページのベース URL
    pub base_url: String,
}

impl SessionParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            update_interval: Duration::from_millis(config.matching.update_interval_ms),
            confidence_threshold: config.matching.confidence_threshold,
            announce_delay: Duration::from_millis(config.effects.announce_delay_ms),
            base_url: config.effects.base_url.clone(),
        }
    }
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_millis(250),
            confidence_threshold: 0.1,
            announce_delay: Duration::from_millis(1500),
            base_url: "http://localhost:8000/".to_string(),
        }
    }
}

// --- 状態 ---

/// 現在のベストマッチ表示状態
///
/// 照合パスだけが書き換える。描画側は毎フレームこれを読むだけ。
#[derive(Debug, Clone, Default)]
pub struct MatchState {
    best_index: Option<usize>,
    best_score: f32,
    last_update: Option<Instant>,
    image: Option<Arc<DynamicImage>>,
}

impl MatchState {
    pub fn has_match(&self) -> bool {
        self.best_index.is_some()
    }

    pub fn best_score(&self) -> f32 {
        self.best_score
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// 解決済みの表示画像。新しいベストの画像が届くまでは前のまま
    pub fn image(&self) -> Option<&Arc<DynamicImage>> {
        self.image.as_ref()
    }
}

/// デバウンス満了で確定したマッチ (QR 更新と読み上げのペイロード)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledMatch {
    pub object_id: String,
    pub info_url: String,
    pub announcement: String,
}

// --- セッション ---

/// 照合セッション
///
/// 最新姿勢のスロット・参照セット・画像キャッシュ・表示状態を 1 か所に
/// まとめ、poll() だけで回す。照合パスは update_interval ごとに 1 回、
/// それ以外の poll は画像完了の取り込みとデバウンス消化だけを行う。
pub struct MatchSession {
    library: ReferenceLibrary,
    feed: PoseFeed,
    cache: ImageCache,
    params: SessionParams,
    state: MatchState,
    last_normalized: Option<NormalizedPose>,
    last_average_confidence: Option<f32>,
    announce: Debounce,
    last_pass_at: Option<Instant>,
    // ハートビート
    poll_count: u32,
    pass_count: u32,
    heartbeat_at: Option<Instant>,
}

impl MatchSession {
    pub fn new(
        library: ReferenceLibrary,
        feed: PoseFeed,
        cache: ImageCache,
        params: SessionParams,
    ) -> Self {
        let announce = Debounce::new(params.announce_delay);
        Self {
            library,
            feed,
            cache,
            params,
            state: MatchState::default(),
            last_normalized: None,
            last_average_confidence: None,
            announce,
            last_pass_at: None,
            poll_count: 0,
            pass_count: 0,
            heartbeat_at: None,
        }
    }

    /// ループ 1 周ぶんの処理
    ///
    /// 呼び出しレートは描画側の都合でよい (照合周期は内部で守る)。
    /// デバウンスが満了した poll でだけ SettledMatch を返す。
    pub fn poll(&mut self, now: Instant) -> Option<SettledMatch> {
        self.drain_image_loads();

        let due = match self.last_pass_at {
            None => true,
            Some(t) => now.saturating_duration_since(t) >= self.params.update_interval,
        };
        if due {
            self.run_match_pass(now);
            self.last_pass_at = Some(now);
        }

        let settled = self.check_settled(now);
        self.heartbeat(now);
        settled
    }

    /// 完了した画像読み込みをキャッシュへ取り込む
    ///
    /// 表示への反映は完了時点のベストとファイル名が一致するときだけ。
    /// 追い越された読み込みはキャッシュに残すだけで表示は触らない。
    fn drain_image_loads(&mut self) {
        let completed = self.cache.drain_completed();
        if completed.is_empty() {
            return;
        }
        let current = self.best_entry().map(|e| e.filename.clone());
        for (filename, image) in completed {
            if current.as_deref() == Some(filename.as_str()) {
                self.state.image = Some(image);
            } else {
                debug!("Stale image load kept for reuse: {}", filename);
            }
        }
    }

    /// 照合パス本体。どの失敗も「今回は更新なし」に落ちるだけ
    fn run_match_pass(&mut self, now: Instant) {
        self.pass_count += 1;

        let Some(pose) = self.feed.snapshot() else {
            return;
        };
        if self.library.is_empty() {
            return;
        }
        self.last_average_confidence = Some(pose.average_confidence());

        let Some(normalized) = normalize_pose(&pose, self.params.confidence_threshold) else {
            debug!("No confident keypoints, match pass skipped");
            return;
        };

        // 真に大きいときだけ更新する → 同点は先のエントリが勝つ
        let mut best_index: Option<usize> = None;
        let mut best_score = f32::NEG_INFINITY;
        for (i, entry) in self.library.entries().iter().enumerate() {
            let Some(vector) = &entry.l2_vector else {
                continue;
            };
            let score = cosine_similarity(normalized.vector(), vector);
            if score > best_score {
                best_score = score;
                best_index = Some(i);
            }
        }

        self.last_normalized = Some(normalized);

        let Some(index) = best_index else {
            // ベクトルつきエントリが 1 件もない
            return;
        };

        let previous_id = self.best_entry().map(|e| e.object_id.clone());
        self.state.best_index = Some(index);
        self.state.best_score = best_score;
        self.state.last_update = Some(now);

        let entry = &self.library.entries()[index];
        let filename = entry.filename.clone();
        let object_id = entry.object_id.clone();
        if let Some(image) = self.cache.resolve(&filename) {
            self.state.image = Some(image);
        }

        if previous_id.as_deref() != Some(object_id.as_str()) {
            debug!("Best match changed: {} (score {:.3})", object_id, best_score);
            self.announce.reset(now);
        }
    }

    /// デバウンス満了なら、その時点のベストで確定ペイロードを作る
    fn check_settled(&mut self, now: Instant) -> Option<SettledMatch> {
        if !self.announce.fire_ready(now) {
            return None;
        }
        let entry = self.best_entry()?;
        let settled = SettledMatch {
            object_id: entry.object_id.clone(),
            info_url: info_url(&self.params.base_url, &entry.object_id),
            announcement: announcement_text(&entry.metadata),
        };
        info!("Match settled: {} ({})", settled.object_id, settled.announcement);
        Some(settled)
    }

    /// 1 秒に 1 回の状態ログ
    fn heartbeat(&mut self, now: Instant) {
        self.poll_count += 1;
        let Some(started) = self.heartbeat_at else {
            self.heartbeat_at = Some(now);
            return;
        };
        let elapsed = now.saturating_duration_since(started);
        if elapsed < Duration::from_secs(1) {
            return;
        }

        let best = match self.best_entry() {
            Some(entry) => format!("{} ({:.3})", entry.object_id, self.state.best_score),
            None => "none".to_string(),
        };
        let avg_conf = self.last_average_confidence.unwrap_or(0.0);
        info!(
            "{} polls, {} passes in {:.1}s, best: {}, avg conf {:.2}",
            self.poll_count,
            self.pass_count,
            elapsed.as_secs_f32(),
            best,
            avg_conf
        );
        self.poll_count = 0;
        self.pass_count = 0;
        self.heartbeat_at = Some(now);
    }

    // --- 照会 (描画側 API) ---

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn best_entry(&self) -> Option<&ReferenceEntry> {
        self.state
            .best_index
            .and_then(|i| self.library.entries().get(i))
    }

    pub fn current_image(&self) -> Option<Arc<DynamicImage>> {
        self.state.image.clone()
    }

    /// 直近の照合パスで得た正規化姿勢 (スケルトン描画用)
    pub fn normalized_pose(&self) -> Option<&NormalizedPose> {
        self.last_normalized.as_ref()
    }

    pub fn library(&self) -> &ReferenceLibrary {
        &self.library
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn feed(&self) -> &PoseFeed {
        &self.feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::library::ArtworkMetadata;
    use crate::pose::{Keypoint, KeypointIndex, Pose};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};

    const INTERVAL: Duration = Duration::from_millis(250);
    const DELAY: Duration = Duration::from_millis(1500);

    fn make_pose(points: &[(KeypointIndex, f32, f32)]) -> Pose {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        for &(index, x, y) in points {
            keypoints[index as usize] = Keypoint::new(x, y, 0.9);
        }
        Pose::new(keypoints)
    }

    /// テスト姿勢 A: 直立ぎみ
    fn pose_a() -> Pose {
        make_pose(&[
            (KeypointIndex::Nose, 100.0, 20.0),
            (KeypointIndex::LeftShoulder, 80.0, 60.0),
            (KeypointIndex::RightShoulder, 120.0, 60.0),
            (KeypointIndex::LeftAnkle, 90.0, 200.0),
            (KeypointIndex::RightAnkle, 110.0, 200.0),
        ])
    }

    /// テスト姿勢 B: 腕を大きく広げた別の形
    fn pose_b() -> Pose {
        make_pose(&[
            (KeypointIndex::Nose, 100.0, 20.0),
            (KeypointIndex::LeftWrist, 10.0, 30.0),
            (KeypointIndex::RightWrist, 190.0, 30.0),
            (KeypointIndex::LeftAnkle, 95.0, 120.0),
            (KeypointIndex::RightAnkle, 105.0, 120.0),
        ])
    }

    fn vector_of(pose: &Pose) -> Vec<f32> {
        normalize_pose(pose, 0.1).unwrap().vector().to_vec()
    }

    fn entry(id: &str, filename: &str, vector: Option<Vec<f32>>) -> ReferenceEntry {
        ReferenceEntry {
            object_id: id.to_string(),
            l2_vector: vector,
            filename: filename.to_string(),
            metadata: ArtworkMetadata {
                title: Some(format!("Work {}", id)),
                artist: Some("Tester".to_string()),
                ..Default::default()
            },
        }
    }

    fn instant_loader() -> crate::assets::LoaderFn {
        Box::new(|_path| Ok(DynamicImage::new_rgba8(1, 1)))
    }

    fn session_with(entries: Vec<ReferenceEntry>) -> (MatchSession, PoseFeed) {
        let feed = PoseFeed::new();
        let cache = ImageCache::with_loader("images", instant_loader());
        let params = SessionParams::default();
        let session = MatchSession::new(
            ReferenceLibrary::from_entries(entries),
            feed.clone(),
            cache,
            params,
        );
        (session, feed)
    }

    #[test]
    fn test_exact_match_selected_with_unit_score() {
        let va = vector_of(&pose_a());
        let negated: Vec<f32> = va.iter().map(|v| -v).collect();
        let mut basis = vec![0.0f32; va.len()];
        basis[0] = 1.0;

        let (mut session, feed) = session_with(vec![
            entry("100", "a.jpg", Some(negated)),
            entry("200", "b.jpg", Some(va)),
            entry("300", "c.jpg", Some(basis)),
        ]);

        feed.publish(vec![pose_a()]);
        session.poll(Instant::now());

        let best = session.best_entry().unwrap();
        assert_eq!(best.object_id, "200");
        assert!(
            (session.state().best_score() - 1.0).abs() < 1e-6,
            "score = {}",
            session.state().best_score()
        );
    }

    #[test]
    fn test_tie_break_prefers_first_entry() {
        let va = vector_of(&pose_a());
        let (mut session, feed) = session_with(vec![
            entry("first", "a.jpg", Some(va.clone())),
            entry("second", "b.jpg", Some(va)),
        ]);

        feed.publish(vec![pose_a()]);
        session.poll(Instant::now());

        assert_eq!(session.best_entry().unwrap().object_id, "first");
    }

    #[test]
    fn test_no_pose_retains_previous_state() {
        let va = vector_of(&pose_a());
        let (mut session, feed) = session_with(vec![entry("100", "a.jpg", Some(va))]);

        let t0 = Instant::now();
        feed.publish(vec![pose_a()]);
        session.poll(t0);
        assert!(session.state().has_match());

        // 誰もいなくなっても直前のマッチは残る
        feed.publish(vec![]);
        session.poll(t0 + INTERVAL);
        assert_eq!(session.best_entry().unwrap().object_id, "100");
        assert_eq!(session.state().last_update(), Some(t0));
    }

    #[test]
    fn test_empty_library_is_noop() {
        let (mut session, feed) = session_with(vec![]);
        feed.publish(vec![pose_a()]);
        session.poll(Instant::now());
        assert!(!session.state().has_match());
    }

    #[test]
    fn test_degenerate_pose_is_noop() {
        let va = vector_of(&pose_a());
        let (mut session, feed) = session_with(vec![entry("100", "a.jpg", Some(va))]);

        // 全キーポイントが信頼度 0 (Pose::default)
        feed.publish(vec![Pose::default()]);
        session.poll(Instant::now());
        assert!(!session.state().has_match());
    }

    #[test]
    fn test_entries_without_vector_skipped() {
        let va = vector_of(&pose_a());
        let (mut session, feed) = session_with(vec![
            entry("no-vec", "a.jpg", None),
            entry("with-vec", "b.jpg", Some(va)),
        ]);

        feed.publish(vec![pose_a()]);
        session.poll(Instant::now());
        assert_eq!(session.best_entry().unwrap().object_id, "with-vec");
    }

    #[test]
    fn test_all_entries_without_vector_is_noop() {
        let (mut session, feed) = session_with(vec![
            entry("1", "a.jpg", None),
            entry("2", "b.jpg", None),
        ]);

        feed.publish(vec![pose_a()]);
        session.poll(Instant::now());
        assert!(!session.state().has_match());
    }

    #[test]
    fn test_mismatched_length_loses_to_real_match() {
        let va = vector_of(&pose_a());
        let (mut session, feed) = session_with(vec![
            entry("short", "a.jpg", Some(vec![1.0])),
            entry("full", "b.jpg", Some(va)),
        ]);

        feed.publish(vec![pose_a()]);
        session.poll(Instant::now());
        assert_eq!(session.best_entry().unwrap().object_id, "full");
    }

    #[test]
    fn test_only_mismatched_vector_still_selected_at_zero() {
        // 長さ違いは 0 点だが -∞ よりは大きいので選ばれはする
        let (mut session, feed) =
            session_with(vec![entry("short", "a.jpg", Some(vec![1.0, 0.0]))]);

        feed.publish(vec![pose_a()]);
        session.poll(Instant::now());

        assert_eq!(session.best_entry().unwrap().object_id, "short");
        assert_eq!(session.state().best_score(), 0.0);
    }

    #[test]
    fn test_match_pass_respects_interval() {
        let va = vector_of(&pose_a());
        let vb = vector_of(&pose_b());
        let (mut session, feed) = session_with(vec![
            entry("A", "a.jpg", Some(va)),
            entry("B", "b.jpg", Some(vb)),
        ]);

        let t0 = Instant::now();
        feed.publish(vec![pose_a()]);
        session.poll(t0);
        assert_eq!(session.best_entry().unwrap().object_id, "A");

        // 周期の途中では姿勢が変わっても照合しない
        feed.publish(vec![pose_b()]);
        session.poll(t0 + Duration::from_millis(100));
        assert_eq!(session.best_entry().unwrap().object_id, "A");

        session.poll(t0 + INTERVAL);
        assert_eq!(session.best_entry().unwrap().object_id, "B");
    }

    #[test]
    fn test_settled_fires_after_stable_delay() {
        let va = vector_of(&pose_a());
        let (mut session, feed) = session_with(vec![entry("100", "a.jpg", Some(va))]);

        let t0 = Instant::now();
        feed.publish(vec![pose_a()]);
        assert!(session.poll(t0).is_none());

        // 安定したまま polls を刻む
        let mut t = t0;
        let mut settled = Vec::new();
        while t < t0 + DELAY {
            t += INTERVAL;
            settled.extend(session.poll(t));
        }

        assert_eq!(settled.len(), 1);
        let settled = &settled[0];
        assert_eq!(settled.object_id, "100");
        assert_eq!(
            settled.info_url,
            "http://localhost:8000/info.html?id=100"
        );
        assert_eq!(
            settled.announcement,
            "Matched artwork: Work 100 by Tester"
        );
    }

    #[test]
    fn test_flicker_announces_only_stable_state() {
        let va = vector_of(&pose_a());
        let vb = vector_of(&pose_b());
        let (mut session, feed) = session_with(vec![
            entry("A", "a.jpg", Some(va)),
            entry("B", "b.jpg", Some(vb)),
        ]);

        let t0 = Instant::now();
        let mut settled = Vec::new();

        // A → B → A と遅延内で揺れる
        feed.publish(vec![pose_a()]);
        settled.extend(session.poll(t0));
        feed.publish(vec![pose_b()]);
        settled.extend(session.poll(t0 + INTERVAL));
        feed.publish(vec![pose_a()]);
        settled.extend(session.poll(t0 + INTERVAL * 2));
        assert!(settled.is_empty());

        // 最後の変化 (t0+500ms) から delay が満ちるまで回す
        let mut t = t0 + INTERVAL * 2;
        let end = t0 + INTERVAL * 2 + DELAY + INTERVAL;
        while t < end {
            t += INTERVAL;
            settled.extend(session.poll(t));
        }

        // B の読み上げは発火せず、安定した A が一度だけ
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].object_id, "A");
    }

    #[test]
    fn test_same_best_does_not_restart_debounce() {
        let va = vector_of(&pose_a());
        let (mut session, feed) = session_with(vec![entry("100", "a.jpg", Some(va))]);

        let t0 = Instant::now();
        feed.publish(vec![pose_a()]);
        session.poll(t0);
        // 同じベストで照合が続いても締め切りは動かない
        session.poll(t0 + INTERVAL);
        session.poll(t0 + INTERVAL * 2);

        assert!(session.poll(t0 + DELAY).is_some());
    }

    #[test]
    fn test_image_retained_until_replacement_arrives() {
        let va = vector_of(&pose_a());
        let vb = vector_of(&pose_b());

        // 画像 1 件ごとに許可トークンを要求するブロッキングローダー
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let loader: crate::assets::LoaderFn = Box::new(move |_path| {
            release_rx.lock().unwrap().recv().ok();
            Ok(DynamicImage::new_rgba8(1, 1))
        });

        let feed = PoseFeed::new();
        let cache = ImageCache::with_loader("images", loader);
        let mut session = MatchSession::new(
            ReferenceLibrary::from_entries(vec![
                entry("A", "a.jpg", Some(va)),
                entry("B", "b.jpg", Some(vb)),
            ]),
            feed.clone(),
            cache,
            SessionParams::default(),
        );

        let t0 = Instant::now();
        feed.publish(vec![pose_a()]);
        session.poll(t0);
        release_tx.send(()).unwrap();

        // a.jpg の取り込みを待つ
        let deadline = Instant::now() + Duration::from_secs(1);
        let mut t = t0;
        while session.current_image().is_none() && Instant::now() < deadline {
            t += Duration::from_millis(1);
            session.poll(t);
            std::thread::sleep(Duration::from_millis(2));
        }
        let image_a = session.current_image().expect("a.jpg never loaded");

        // B に切り替わっても b.jpg が届くまでは A の画像のまま
        feed.publish(vec![pose_b()]);
        session.poll(t + INTERVAL);
        assert_eq!(session.best_entry().unwrap().object_id, "B");
        assert!(Arc::ptr_eq(&session.current_image().unwrap(), &image_a));
    }

    #[test]
    fn test_stale_load_does_not_override_new_best() {
        let va = vector_of(&pose_a());
        let vb = vector_of(&pose_b());

        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let loader: crate::assets::LoaderFn = Box::new(move |_path| {
            release_rx.lock().unwrap().recv().ok();
            Ok(DynamicImage::new_rgba8(1, 1))
        });

        let feed = PoseFeed::new();
        let cache = ImageCache::with_loader("images", loader);
        let mut session = MatchSession::new(
            ReferenceLibrary::from_entries(vec![
                entry("A", "a.jpg", Some(va)),
                entry("B", "b.jpg", Some(vb)),
            ]),
            feed.clone(),
            cache,
            SessionParams::default(),
        );

        // A をベストにして a.jpg を飛行中にする
        let t0 = Instant::now();
        feed.publish(vec![pose_a()]);
        session.poll(t0);
        assert!(session.current_image().is_none());

        // a.jpg が届く前に B へ切り替え
        feed.publish(vec![pose_b()]);
        session.poll(t0 + INTERVAL);
        assert_eq!(session.best_entry().unwrap().object_id, "B");

        // 両方の読み込みを許可して完了を待つ
        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(1);
        let mut t = t0 + INTERVAL;
        while session.cache().loaded_count() < 2 && Instant::now() < deadline {
            t += Duration::from_millis(1);
            session.poll(t);
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(session.cache().loaded_count(), 2, "loads never completed");

        // 表示は B の画像。追い越された a.jpg はキャッシュにだけ残る
        let shown = session.current_image().expect("b.jpg never applied");
        let image_b = session.cache().get("b.jpg").unwrap();
        let image_a = session.cache().get("a.jpg").unwrap();
        assert!(Arc::ptr_eq(&shown, &image_b));
        assert!(!Arc::ptr_eq(&shown, &image_a));
    }

    #[test]
    fn test_cached_image_reused_without_reload() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_ref = calls.clone();
        let loader: crate::assets::LoaderFn = Box::new(move |_path| {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            Ok(DynamicImage::new_rgba8(1, 1))
        });

        let va = vector_of(&pose_a());
        let vb = vector_of(&pose_b());
        let feed = PoseFeed::new();
        let cache = ImageCache::with_loader("images", loader);
        let mut session = MatchSession::new(
            ReferenceLibrary::from_entries(vec![
                entry("A", "a.jpg", Some(va)),
                entry("B", "b.jpg", Some(vb)),
            ]),
            feed.clone(),
            cache,
            SessionParams::default(),
        );

        let t0 = Instant::now();
        feed.publish(vec![pose_a()]);
        session.poll(t0);

        let deadline = Instant::now() + Duration::from_secs(1);
        let mut t = t0;
        while session.current_image().is_none() && Instant::now() < deadline {
            t += Duration::from_millis(1);
            session.poll(t);
            std::thread::sleep(Duration::from_millis(2));
        }
        let first = session.current_image().expect("a.jpg never loaded");

        // B を挟んで b.jpg の読み込み完了まで待つ
        feed.publish(vec![pose_b()]);
        session.poll(t + INTERVAL);
        let deadline = Instant::now() + Duration::from_secs(1);
        let mut t = t + INTERVAL;
        while session.cache().loaded_count() < 2 && Instant::now() < deadline {
            t += Duration::from_millis(1);
            session.poll(t);
            std::thread::sleep(Duration::from_millis(2));
        }

        // A に戻る: a.jpg は再読み込みされず同じインスタンス
        feed.publish(vec![pose_a()]);
        session.poll(t + INTERVAL);

        let again = session.current_image().expect("image dropped");
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(calls.load(Ordering::SeqCst), 2); // a.jpg と b.jpg で計 2 回
    }
}
