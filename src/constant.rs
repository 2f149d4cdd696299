pub const MAX_DAILY_POSTS: u32 = 50;
pub const POSTED_LINKS_LIMIT: usize = 1000;
pub const FIRST_CHECK_LOOKBACK_HOURS: i64 = 1;

pub const MAX_POST_ATTEMPTS: u32 = 3;
pub const BASE_RETRY_DELAY_SECS: u64 = 4;
pub const MIN_COOLDOWN_SECS: u64 = 30;
pub const MAX_COOLDOWN_SECS: u64 = 120;

pub const STATE_SCHEMA_VERSION: u32 = 1;
pub const TITLE_PREVIEW_CHARS: usize = 20;
