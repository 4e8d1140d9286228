use thiserror::Error;

/// Reasons a bencode decode can fail. Offsets are absolute positions in the
/// buffer handed to the decoder.
#[derive(Debug, Error)]
pub enum BencodeError {
    #[error("Unexpected end of input at byte {offset}")]
	TruncatedInput { offset: usize },

	#[error("Invalid integer literal at byte {offset}")]
	InvalidIntegerLiteral { offset: usize },

	#[error("Invalid byte string length prefix at byte {offset}")]
	InvalidLengthPrefix { offset: usize },

	#[error("Unterminated list or dictionary opened at byte {offset}")]
	UnterminatedContainer { offset: usize },

	#[error("Expected a value but found a terminator at byte {offset}")]
	UnexpectedTerminator { offset: usize },

	#[error("Unexpected byte {byte:#04x} at byte {offset}")]
	UnexpectedByte { byte: u8, offset: usize },

	#[error("Nesting too deep at byte {offset}")]
	NestingTooDeep { offset: usize },

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}
