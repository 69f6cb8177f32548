mod time;

pub use time::{LocalTimer, format_local, now_local};
