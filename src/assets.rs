use anyhow::{Context, Result};
use image::DynamicImage;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// 読み込みスレッドへの依頼
struct LoadRequest {
    filename: String,
    path: PathBuf,
}

/// 読み込み結果 (失敗もここで運ぶ)
struct LoadResult {
    filename: String,
    result: Result<DynamicImage>,
}

pub type LoaderFn = Box<dyn Fn(&Path) -> Result<DynamicImage> + Send>;

/// 作品画像のファイル名キャッシュ
///
/// 初回要求時にワーカースレッドへ読み込みを依頼し、完了後はセッション
/// 終了まで保持する。参照セットは小さく固定なので追い出しはしない。
///
/// 完了の取り込み (drain_completed) は呼び出し側のループが行う。
/// どの画像を表示するかの判断はここでは持たない。
pub struct ImageCache {
    image_dir: PathBuf,
    loaded: HashMap<String, Arc<DynamicImage>>,
    pending: HashSet<String>,
    request_tx: mpsc::Sender<LoadRequest>,
    result_rx: mpsc::Receiver<LoadResult>,
    _worker: thread::JoinHandle<()>,
}

impl ImageCache {
    pub fn new<P: Into<PathBuf>>(image_dir: P) -> Self {
        Self::with_loader(
            image_dir,
            Box::new(|path| {
                image::open(path)
                    .with_context(|| format!("Failed to load image: {}", path.display()))
            }),
        )
    }

    /// 読み込み関数を差し替えられるコンストラクタ (テスト用)
    pub fn with_loader<P: Into<PathBuf>>(image_dir: P, loader: LoaderFn) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<LoadRequest>();
        let (result_tx, result_rx) = mpsc::channel::<LoadResult>();

        // 依頼元 (request_tx) が落ちたら recv が Err になり抜ける
        let worker = thread::spawn(move || {
            while let Ok(request) = request_rx.recv() {
                let result = loader(&request.path);
                let completed = LoadResult {
                    filename: request.filename,
                    result,
                };
                if result_tx.send(completed).is_err() {
                    break;
                }
            }
        });

        Self {
            image_dir: image_dir.into(),
            loaded: HashMap::new(),
            pending: HashSet::new(),
            request_tx,
            result_rx,
            _worker: worker,
        }
    }

    /// キャッシュにあれば即座に返す。なければ読み込みを発行して None
    ///
    /// 同じファイル名の依頼が飛行中のときは重複発行しない。
    pub fn resolve(&mut self, filename: &str) -> Option<Arc<DynamicImage>> {
        if let Some(image) = self.loaded.get(filename) {
            return Some(image.clone());
        }

        if !self.pending.contains(filename) {
            let request = LoadRequest {
                filename: filename.to_string(),
                path: self.image_dir.join(filename),
            };
            if self.request_tx.send(request).is_ok() {
                self.pending.insert(filename.to_string());
                debug!("Image load queued: {}", filename);
            } else {
                warn!("Image loader thread is gone, cannot load {}", filename);
            }
        }
        None
    }

    /// 完了した読み込みをキャッシュへ取り込み、取り込んだ分を返す
    ///
    /// 失敗は警告を残して「未読み込み」に戻すだけ。次に resolve された
    /// ときに再試行される。
    pub fn drain_completed(&mut self) -> Vec<(String, Arc<DynamicImage>)> {
        let mut done = Vec::new();
        while let Ok(completed) = self.result_rx.try_recv() {
            self.pending.remove(&completed.filename);
            match completed.result {
                Ok(image) => {
                    let image = Arc::new(image);
                    self.loaded.insert(completed.filename.clone(), image.clone());
                    done.push((completed.filename, image));
                }
                Err(err) => warn!("Image load failed: {:#}", err),
            }
        }
        done
    }

    /// 読み込み済みならそのまま返す。読み込みは発行しない
    pub fn get(&self, filename: &str) -> Option<Arc<DynamicImage>> {
        self.loaded.get(filename).cloned()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
