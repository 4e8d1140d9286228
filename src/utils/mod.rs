mod url_encode;

pub use url_encode::url_encode_bytes;
