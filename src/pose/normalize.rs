use super::keypoint::{Keypoint, KeypointIndex, Pose};

/// 正規化ベクトルの長さ ([x0,y0,x1,y1,...] のフラット配列)
pub const VECTOR_LEN: usize = KeypointIndex::COUNT * 2;

/// 信頼できるキーポイントを囲む軸平行バウンディングボックス
///
/// 毎回の正規化で再計算される使い捨ての値。キーポイントが一つも
/// 閾値を超えない場合は min/max が ±∞ のまま残る (is_empty)。
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl BoundingBox {
    /// 信頼度が閾値を超えるキーポイントの min/max を取る
    pub fn from_pose(pose: &Pose, confidence_threshold: f32) -> Self {
        let mut bbox = Self {
            x_min: f32::INFINITY,
            x_max: f32::NEG_INFINITY,
            y_min: f32::INFINITY,
            y_max: f32::NEG_INFINITY,
        };

        for kp in &pose.keypoints {
            if kp.is_confident(confidence_threshold) {
                bbox.x_min = bbox.x_min.min(kp.x);
                bbox.x_max = bbox.x_max.max(kp.x);
                bbox.y_min = bbox.y_min.min(kp.y);
                bbox.y_max = bbox.y_max.max(kp.y);
            }
        }

        bbox
    }

    /// 閾値を超えたキーポイントが一つもなかったか
    pub fn is_empty(&self) -> bool {
        self.x_min > self.x_max || self.y_min > self.y_max
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// 長辺を両軸共通のスケールとして使う (アスペクト比を保つ)
    pub fn size(&self) -> f32 {
        self.width().max(self.height())
    }
}

/// 位置・スケール不変に変換済みの姿勢
///
/// keypoints は概ね [-0.5, 0.5] に再配置した座標 (信頼度は元のまま)、
/// vector はそれをフラット化して L2 正規化した比較用の単位ベクトル。
#[derive(Debug, Clone)]
pub struct NormalizedPose {
    pub keypoints: [Keypoint; KeypointIndex::COUNT],
    pub vector: [f32; VECTOR_LEN],
}

impl NormalizedPose {
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }
}

/// 生の姿勢を位置・スケール不変の単位ベクトル表現へ変換する
///
/// 1. 信頼度が閾値を超えるキーポイントでバウンディングボックスを取る
/// 2. 中心とスケール (長辺) で全キーポイントを再配置
/// 3. フラット化して L2 正規化
///
/// 閾値を超えるキーポイントがゼロなら None (有効な姿勢なし)。
/// スケール 0 (全点一致) は 1 に置き換えて中心化だけ行う。
pub fn normalize_pose(pose: &Pose, confidence_threshold: f32) -> Option<NormalizedPose> {
    let bbox = BoundingBox::from_pose(pose, confidence_threshold);
    if bbox.is_empty() {
        // ±∞ の箱をそのまま割り算に通すと NaN が伝播する
        return None;
    }

    let (center_x, center_y) = bbox.center();
    let mut size = bbox.size();
    if size == 0.0 {
        size = 1.0;
    }

    // 信頼度の低いキーポイントも同じ変換で再配置する
    // (ベクトルは常に全 17 関節ぶんで参照側と位置対応させる)
    let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
    for (i, kp) in pose.keypoints.iter().enumerate() {
        keypoints[i] = Keypoint::new(
            (kp.x - center_x) / size,
            (kp.y - center_y) / size,
            kp.confidence,
        );
    }

    let mut vector = [0.0f32; VECTOR_LEN];
    for (i, kp) in keypoints.iter().enumerate() {
        vector[i * 2] = kp.x;
        vector[i * 2 + 1] = kp.y;
    }
    l2_normalize(&mut vector);

    Some(NormalizedPose { keypoints, vector })
}

/// ベクトルを単位長に正規化する。ノルム 0 のときは変更しない
fn l2_normalize(vector: &mut [f32]) {
    let norm_sq: f64 = vector.iter().map(|&v| (v as f64) * (v as f64)).sum();
    let norm = norm_sq.sqrt();
    if norm == 0.0 {
        return;
    }
    for v in vector.iter_mut() {
        *v = (*v as f64 / norm) as f32;
    }
}
