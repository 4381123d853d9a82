use tracing::warn;

/// 単位ベクトル同士の類似度 (内積 = コサイン類似度)
///
/// 両入力とも構築時に L2 正規化済みで、内積がそのままコサイン類似度に
/// なる。値域は [-1, 1]。
///
/// 長さ違いは参照データ側の不備。照合パスを止めないため警告を出して
/// 0 (無相関) を返す。
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        warn!("Vector length mismatch: {} vs {}", a.len(), b.len());
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    dot as f32
}
