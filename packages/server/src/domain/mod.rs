//! Domain layer: broadcast state, stream entity, tag grammar, subtitle
//! chunking, and the ports (traits) the outer layers implement.

pub mod broadcast;
pub mod chat;
pub mod collaborator;
pub mod error;
pub mod ids;
pub mod pusher;
pub mod registry;
pub mod stream;
pub mod subtitle;
pub mod tags;

pub use broadcast::{
    AudioSnapshot, AvatarSnapshot, BroadcastSnapshot, BroadcastState, PoseUpdate, SubtitleSnapshot,
};
pub use chat::{ChatEntry, ChatRole};
pub use collaborator::{
    AuthError, MediaLookup, MediaLookupError, MediaRef, ProducerAuthorizer, SpeechSynthesizer,
    SynthesisError, SynthesizedSpeech, estimate_duration_ms,
};
pub use error::DomainError;
pub use ids::{ClientId, MessageContent, StreamId, Timestamp};
pub use pusher::{MessagePushError, PusherChannel, ViewerPusher};
pub use registry::{SharedStream, StreamRegistry};
pub use stream::{Stream, StreamOverview, StreamStats, StreamStatus};
pub use subtitle::ChunkPolicy;
pub use tags::{
    Expression, Gesture, GestureTier, LookDirection, MediaKind, MediaRequest, ParsedUtterance,
};
