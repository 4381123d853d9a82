use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use pose_match::assets::ImageCache;
use pose_match::config::Config;
use pose_match::matching::{MatchSession, ReferenceLibrary, SessionParams};
use pose_match::pose::{FeedStatus, PoseFeed, ReplayFeed};

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);

    let level: Level = config.app.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    println!("=== Pose Match ===");
    println!("Reference file: {}", config.matching.reference_path);
    println!("Image dir: {}", config.assets.image_dir);
    println!(
        "Match interval: {}ms, announce delay: {}ms",
        config.matching.update_interval_ms, config.effects.announce_delay_ms
    );
    println!(
        "Replay: {} @ {} fps{}",
        config.replay.capture_path,
        config.replay.fps,
        if config.replay.loop_playback { " (loop)" } else { "" }
    );
    println!();

    let library = ReferenceLibrary::load(&config.matching.reference_path)?;
    println!(
        "Library: {} entries ({} with vectors)",
        library.len(),
        library.usable_count()
    );

    let cache = ImageCache::new(&config.assets.image_dir);

    // 検出器スタンドイン: キャプチャが開けなければ「利用不可」のまま走らせる
    let feed = PoseFeed::new();
    let _replay = match ReplayFeed::start(
        feed.clone(),
        &config.replay.capture_path,
        config.replay.fps,
        config.replay.loop_playback,
    ) {
        Ok(replay) => Some(replay),
        Err(err) => {
            warn!("Replay feed unavailable: {:#}", err);
            feed.mark_unavailable();
            None
        }
    };

    let params = SessionParams::from_config(&config);
    let mut session = MatchSession::new(library, feed.clone(), cache, params);

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrl_c = running.clone();
    ctrlc::set_handler(move || {
        running_ctrl_c.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl-C handler")?;

    println!("操作: [Ctrl-C] 終了");
    println!();

    let frame_duration = Duration::from_secs_f64(1.0 / config.app.target_fps as f64);
    let mut last_status: Option<FeedStatus> = None;

    while running.load(Ordering::SeqCst) {
        let loop_start = Instant::now();

        // フィード状態の変化を通知
        let status = feed.status();
        if last_status != Some(status) {
            match status {
                FeedStatus::Starting => println!("Waiting for pose feed..."),
                FeedStatus::Live => println!("Pose feed live"),
                FeedStatus::Unavailable => println!("Pose feed unavailable"),
            }
            last_status = Some(status);
        }

        if let Some(settled) = session.poll(loop_start) {
            println!();
            println!("Stable match: {}", settled.object_id);
            if let Some(entry) = session.best_entry() {
                println!("  image:    {}", entry.filename);
            }
            println!("  QR:       {}", settled.info_url);
            println!("  announce: {}", settled.announcement);
            println!();
        }

        // FPS上限制御（spin wait for precision）
        while loop_start.elapsed() < frame_duration {
            std::hint::spin_loop();
        }
    }

    println!("Shutting down...");
    Ok(())
}
