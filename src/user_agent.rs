//! User-Agent string sent with feed and image requests.

/// Tool identifier used as the User-Agent product token.
const PRODUCT: &str = "picasa-dl";

/// Default User-Agent for all requests: `picasa-dl/<version> (gallery-mirror)`.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (gallery-mirror)")
}
