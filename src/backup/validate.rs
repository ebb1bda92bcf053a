//! Payload marker check.

/// Every genuine FortiOS configuration export starts with this
pub const CONFIG_MARKER: &[u8] = b"#config";

/// True when the first line of `payload` begins with [`CONFIG_MARKER`]
///
/// Nothing past the marker is parsed. Error pages, empty bodies and transfers
/// cut off before the first line all fail this check.
pub fn is_valid_payload(payload: &[u8]) -> bool {
    payload.starts_with(CONFIG_MARKER)
}
