pub mod bvalue;
pub mod decode;
pub mod error;
pub mod json;

pub use bvalue::{BDict, BIndex, BKey, BKind, BValue, Children};   // re-export
pub use decode::{decode, decode_bencode, decode_buf, decode_file, decode_range};   // re-export
pub use error::BencodeError;   // re-export
pub use json::bvalue_to_json;   // re-export
