use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub fn now_iso8601() -> anyhow::Result<String> {
    Ok(OffsetDateTime::now_utc().format(&Rfc3339)?)
}

/// Opaque bearer token: base64 of `email:timestamp`. Carries no signature
/// and is never checked server-side; the frontend decodes it for display.
pub fn issue(email: &str) -> anyhow::Result<String> {
    let timestamp = now_iso8601()?;
    Ok(BASE64.encode(format!("{email}:{timestamp}")))
}
