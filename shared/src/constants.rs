pub const INVALID_ADDRESS_ERROR: &str = "Please provide a valid 0x wallet address";
pub const INVALID_TOKEN_ERROR: &str = "Token must be one of TOKEN_1, TOKEN_2, TOKEN_3 or ALL";
pub const STORAGE_ERROR: &str = "Storage unavailable. Please try again";
pub const BUSY_ERROR: &str = "Another request for this wallet is in progress. Please retry";

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
pub const MAX_LEADERBOARD_LIMIT: usize = 100;
