//! Butai server library.
//!
//! A live-streaming engine for an autonomous agent: one producer per stream
//! drives a server-authoritative broadcast state (audio timeline, avatar
//! pose, subtitles), which is ticked at a fixed rate and fanned out to every
//! connected viewer. Viewers joining mid-utterance receive a snapshot from
//! which the exact playback position can be reconstructed.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// startup configuration
pub mod config;
