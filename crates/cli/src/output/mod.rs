//! Text output of the tool.
//!
//! Everything goes to a caller-supplied writer so commands can be tested
//! against a buffer. Formats:
//!
//! ```text
//! port 0x00: type 0005
//! 00: -- -- -- ... (16 cells per row)
//! 50[10]: 7e
//! ```

#[cfg(test)]
mod tests;

use std::io::{self, Write};

use nvif_protocol::PortInfo;

/// Cells per grid row.
pub const ROW: usize = 16;

pub fn write_port<W: Write>(out: &mut W, port: &PortInfo) -> io::Result<()> {
	writeln!(out, "port 0x{:02x}: type {:04x}", port.index, port.kind)
}

/// Writes `cells` as rows of [`ROW`], each prefixed by the index of its first
/// cell. Missing cells print as `--`.
pub fn write_grid<W, I>(out: &mut W, cells: I) -> io::Result<()>
where
	W: Write,
	I: IntoIterator<Item = Option<u8>>,
{
	for (index, cell) in cells.into_iter().enumerate() {
		if index % ROW == 0 {
			write!(out, "{index:02x}:")?;
		}
		match cell {
			Some(value) => write!(out, " {value:02x}")?,
			None => write!(out, " --")?,
		}
		if index % ROW == ROW - 1 {
			writeln!(out)?;
		}
		out.flush()?;
	}
	Ok(())
}

/// Writes the `AA[RR]: ` prefix of a single-register transfer.
pub fn write_register<W: Write>(out: &mut W, addr: u8, reg: u8) -> io::Result<()> {
	write!(out, "{addr:02x}[{reg:02x}]: ")
}
