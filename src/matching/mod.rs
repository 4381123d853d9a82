pub mod library;
pub mod session;
pub mod similarity;

pub use library::{ArtworkMetadata, ReferenceEntry, ReferenceLibrary};
pub use session::{MatchSession, MatchState, SessionParams, SettledMatch};
pub use similarity::cosine_similarity;
