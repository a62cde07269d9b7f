use derive_more::{Display, From};
use flume::SendError;
use tokio::task::JoinError;

use crate::lifecycle::Phase;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum Error {
	#[from(String, &String, &str)]
	Custom(String),
	EventSend(String),
	ChannelClosed,
	EbpfProgNotFound(&'static str),
	EbpfMapNotFound(&'static str),
	EbpfNotLoaded,
	InvalidEventSize(usize),
	InvalidTransition {
		from: Phase,
		to: Phase,
	},

	// -- Externals
	//
	#[from]
	JoinError(JoinError),
	#[from]
	AyaEbpf(aya::EbpfError),
	#[from]
	AyaMaps(aya::maps::MapError),
	#[from]
	AyaProgram(aya::programs::ProgramError),
	#[from]
	AyaPerfBuffer(aya::maps::perf::PerfBufferError),
	#[from]
	Io(std::io::Error),
}

impl<T> From<SendError<T>> for Error {
	fn from(value: SendError<T>) -> Self {
		Self::EventSend(value.to_string())
	}
}

// region:    --- Custom

impl Error {
	pub fn custom(val: impl Into<String>) -> Self {
		Self::Custom(val.into())
	}
}

// endregion: --- Custom

// region:    --- Error Boilerplate

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
