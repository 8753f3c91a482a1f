#![forbid(unsafe_code)]

pub mod daily;
pub mod error;
pub mod guess;
pub mod model;
pub mod session;
pub mod time;
pub mod timer;

pub use time::Clock;
