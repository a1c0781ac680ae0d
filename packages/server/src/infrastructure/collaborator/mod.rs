//! External collaborator implementations (speech synthesis, media lookup,
//! producer authorization).

pub mod auth;
pub mod media;
pub mod tts;

pub use auth::SharedSecretAuthorizer;
pub use media::{HttpMediaLookup, NullMediaLookup};
pub use tts::{HttpSpeechSynthesizer, NullSpeechSynthesizer};
