// API module entry
// Date-keyed URL list endpoints backed by the injected store, plus the
// tweet metadata proxy

mod date;
mod handlers;
mod response;
mod tweet_info;
mod types;

pub use handlers::{handle_get_data, handle_post_update};
pub use tweet_info::handle_tweet_info;

/// Path serving stored URLs for a date
pub const DATA_PATH: &str = "/api/data";

/// Path accepting replacement URL lists
pub const UPDATE_PATH: &str = "/api/update";

/// Path proxying tweet metadata lookups
pub const TWEET_INFO_PATH: &str = "/api/tweet_info";
