// lib.rs - Library interface for decoding bencode and .torrent metadata

pub mod bencode;
pub mod config;
pub mod engine;
pub mod torrent;
pub mod utils;

use std::path::Path;

// Re-export commonly used types for easier testing
pub use bencode::{
    bvalue_to_json, decode, decode_bencode, decode_buf, decode_file, decode_range, BDict, BIndex,
    BKey, BKind, BValue, BencodeError,
};
pub use config::Config;
pub use torrent::{FileEntry, Torrent, TorrentError};

/// Decodes a .torrent file's bytes into a [`Torrent`].
pub fn build_torrent_descriptor(bytes: &[u8]) -> Result<Torrent, TorrentError> {
    Torrent::from_bytes(bytes)
}

/// Reads a .torrent file and decodes it into a [`Torrent`].
pub fn build_torrent_descriptor_from_file<P: AsRef<Path>>(path: P) -> Result<Torrent, TorrentError> {
    Torrent::from_file(path)
}
