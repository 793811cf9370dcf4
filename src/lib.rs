//! Caption normalization and synchronized caption playback.
//!
//! [`normalize::normalize`] turns SRT text or one of several JSON caption
//! shapes into an ordered list of [`model::Cue`]s. [`player::CaptionPlayer`]
//! drives a media element's clock against that list, and
//! [`player::loader::CaptionLoader`] obtains the list from a durable store
//! or a remote URL.

pub mod config;
pub mod error;
pub mod formats;
pub mod model;
pub mod normalize;
pub mod player;

pub use model::Cue;
pub use normalize::{PayloadShape, detect, normalize};
