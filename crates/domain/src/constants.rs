//! Service constants
//!
//! Centralized location for the fixed values the upstream service expects.
//! The private API's header set is unstable; revalidate these against the
//! live service before relying on them.

// Hosts
pub const WEB_HOST: &str = "https://www.instagram.com";
pub const APP_HOST: &str = "https://i.instagram.com";

// Application identity
pub const APP_VERSION: &str = "121.0.0.29.119";
pub const APP_VERSION_CODE: &str = "185203708";
pub const WEB_APP_ID: &str = "936619743392459";
pub const FB_HTTP_ENGINE: &str = "Liger";

// Request signing
pub const SIGNATURE_KEY: &str =
    "9193488027538fd3450b83b7d05286d4ca9599a0f7eeed90d8c85925698a05dc";
pub const SIGNATURE_VERSION: &str = "4";

// Session defaults
pub const DEFAULT_LANGUAGE: &str = "id-ID";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7";
pub const DEFAULT_WWW_CLAIM: &str = "0";
pub const MISSING_CSRF_TOKEN: &str = "missing";
pub const DEFAULT_WEB_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/86.0.4240.75 Safari/537.36";
pub const DEFAULT_APP_USER_AGENT: &str = "Instagram 121.0.0.29.119 Android (26/8.0.0; 480dpi; \
     1080x1920; samsung; SM-G930F; herolte; samsungexynos8890; en_US; 185203708)";

// Identity cookies
pub const COOKIE_CSRF_TOKEN: &str = "csrftoken";
pub const COOKIE_USER_ID: &str = "ds_user_id";
pub const COOKIE_USERNAME: &str = "ds_user";
pub const COOKIE_MACHINE_ID: &str = "mid";

// Response headers that carry session credentials
pub const HEADER_SET_WWW_CLAIM: &str = "x-ig-set-www-claim";
pub const HEADER_SET_AUTHORIZATION: &str = "ig-set-authorization";
pub const HEADER_SET_PW_KEY_ID_WEB: &str = "ig-set-password-encryption-web-key-id";
pub const HEADER_SET_PW_KEY_ID_APP: &str = "ig-set-password-encryption-key-id";
pub const HEADER_SET_PW_PUB_KEY_WEB: &str = "ig-set-password-encryption-web-pub-key";
pub const HEADER_SET_PW_PUB_KEY_APP: &str = "ig-set-password-encryption-pub-key";

/// Suffix the service uses on `ig-set-authorization` to mean "no credential".
pub const AUTHORIZATION_TERMINATOR: char = ':';

// Reserved body fields and their trigger values
pub const CHECKPOINT_REQUIRED_MESSAGE: &str = "checkpoint_required";
pub const ACCOUNT_DISABLED_FRAGMENT: &str = "Your account has been disabled";
pub const RATE_LIMIT_COURTESY_MESSAGE: &str = "Please wait a few minutes before you try again.";
pub const ERROR_TYPE_TWO_FACTOR: &str = "two_factor_required";
pub const ERROR_TYPE_GENERIC_REQUEST: &str = "generic_request_error";

/// Integers with a larger magnitude lose precision as IEEE-754 doubles.
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;
