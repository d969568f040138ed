//! Extra utilties for use elsewhere in the API.

use time::OffsetDateTime;

pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Decodes a base64 file sent inside a JSON body.
pub fn decode_file(content: &str) -> Result<Vec<u8>, String> {
    base64::decode(content.trim()).map_err(|err| format!("couldn't decode file as base64: {}", err))
}
