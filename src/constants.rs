//! Shared constants used across the application.

/// User agent sent to the remote forum when the header bundle does not set one.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/109.0";

/// Origin prepended to page-relative permalinks.
pub const DEFAULT_SITE_ORIGIN: &str = "https://eksisozluk.com";

/// Path of the paginated favorites listing.
pub const DEFAULT_LISTING_PATH: &str = "/favori-entryleri";

/// Only hyperlinks starting with this prefix are kept as entry images.
pub const DEFAULT_MEDIA_HOST_PREFIX: &str = "https://soz.lk/i/";

/// Name of the cookie carrying the curation session token.
pub const SESSION_COOKIE: &str = "session";
