use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	/// The transfer failed and its outcome has already been printed.
	/// Used to signal a non-zero exit without additional output.
	#[error("")]
	OutputAlreadyPrinted,

	#[error("I2C port {0} does not exist")]
	PortNotFound(u8),

	#[error(transparent)]
	Runtime(#[from] nvif_runtime::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl CliError {
	pub fn is_output_already_printed(&self) -> bool {
		matches!(self, CliError::OutputAlreadyPrinted)
	}

	/// Process exit status: the negated errno where one applies, else 1.
	pub fn exit_code(&self) -> i32 {
		match self {
			CliError::PortNotFound(_) => 2,
			CliError::Runtime(err) => err.dispatch_error().map_or(1, |err| -err.errno()),
			CliError::OutputAlreadyPrinted | CliError::Io(_) => 1,
		}
	}
}
