//! Navigation gate
//!
//! Decides whether a page request may pass or has to be sent to the login
//! page. Only the presence of a credential token is checked here, the backend
//! validates it on every API call.

pub const LOGIN_PATH: &str = "/Universal_Login";
pub const ACCESS_TOKEN_COOKIE: &str = "sis_access_token";

const INTERNAL_ASSETS_PREFIX: &str = "/_next";
const API_PREFIX: &str = "/api";
const FAVICON_PATH: &str = "/favicon.ico";
const BEARER_PREFIX: &str = "Bearer ";

/// File extensions served without a credential
pub const STATIC_ASSET_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "avif", "bmp",
    // styles and scripts
    "css", "js", "mjs", "map",
    // fonts
    "woff", "woff2", "ttf", "otf", "eot",
    // media
    "mp4", "webm", "ogg", "mp3", "wav",
    // documents
    "pdf", "txt", "xml", "json", "csv",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Continue,
    RedirectToLogin,
}

/// Credentials found on a request
#[derive(Clone, Copy, Debug, Default)]
pub struct Credentials<'a> {
    pub cookie: Option<&'a str>,
    pub authorization: Option<&'a str>,
}

impl<'a> Credentials<'a> {
    /// Cookie token first, bearer token from the `Authorization` header second
    pub fn token(&self) -> Option<&'a str> {
        self.cookie
            .filter(|token| !token.is_empty())
            .or_else(|| {
                self.authorization
                    .map(|value| value.strip_prefix(BEARER_PREFIX).unwrap_or(value))
            })
            .filter(|token| !token.is_empty())
    }
}

/// Path ends in `.<ext>` for a known extension, compared case-sensitively
pub fn is_static_asset(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);

    file_name
        .rsplit_once('.')
        .is_some_and(|(_, extension)| STATIC_ASSET_EXTENSIONS.contains(&extension))
}

pub fn is_exempt(path: &str) -> bool {
    path == LOGIN_PATH
        || path.starts_with(INTERNAL_ASSETS_PREFIX)
        || path.starts_with(API_PREFIX)
        || path == FAVICON_PATH
}

pub fn decide(path: &str, credentials: Credentials<'_>) -> GateDecision {
    if is_static_asset(path) || is_exempt(path) {
        return GateDecision::Continue;
    }

    match credentials.token() {
        Some(_) => GateDecision::Continue,
        None => GateDecision::RedirectToLogin,
    }
}
