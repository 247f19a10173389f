// API Constants
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const GENERATE_PATH: &str = "/api/generate";
pub const DEFAULT_MODEL: &str = "gemma:2b";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are MelChat, a helpful assistant. Answer clearly and use markdown where it helps.";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

// Storage slots
pub const ACTIVE_CHAT_SLOT: &str = "active_chat";
pub const CHAT_HISTORY_SLOT: &str = "chat_history";

// UI Constants
pub const HISTORY_TITLE_WIDTH: usize = 28;
pub const SIDEBAR_WIDTH: u16 = 32;
