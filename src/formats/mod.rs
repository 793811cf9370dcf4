pub mod json;
pub mod srt;
pub mod time;
pub mod words;
