use url::form_urlencoded::byte_serialize;

/// Escapes a magnet URI parameter value (`dn`, `tr`).
///
/// `byte_serialize` writes spaces as `+`, which magnet readers take
/// literally, so they become `%20`. A literal `+` is already `%2B` by then.
pub fn url_encode_bytes(bytes: &[u8]) -> String {
    byte_serialize(bytes)
        .map(|chunk| if chunk == "+" { "%20" } else { chunk })
        .collect()
}
