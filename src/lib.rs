pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod keyboard;
pub mod logging;
pub mod model;
pub mod pauses;
pub mod playback;
pub mod sanitize;
pub mod sim;
pub mod timing;
pub mod tokens;
pub mod trace;
pub mod tuning;
pub mod typo;

pub use error::{Result, TypistError};
