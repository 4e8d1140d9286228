use thiserror::Error;

use crate::bencode::BencodeError;

/// Reasons a torrent descriptor cannot be built. Any of them aborts the
/// whole build.
#[derive(Debug, Error)]
pub enum TorrentError {
    #[error("Missing required field '{0}'")]
	MissingRequiredField(&'static str),

	#[error("Invalid value for field '{0}'")]
	InvalidField(&'static str),

	#[error("Invalid tracker URL '{0}'")]
	InvalidUrl(String),

	#[error("Piece list is empty")]
	EmptyPieceList,

	#[error("Torrent describes no files")]
	NoFilesDescribed,

	#[error("Bencode error: {0}")]
	Bencode(#[from] BencodeError),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}
