pub mod feed;
pub mod keypoint;
pub mod normalize;

pub use feed::{CapturedPose, FeedStatus, PoseFeed, ReplayFeed};
pub use keypoint::{Keypoint, KeypointIndex, NamedKeypoint, Pose};
pub use normalize::{normalize_pose, BoundingBox, NormalizedPose, VECTOR_LEN};
