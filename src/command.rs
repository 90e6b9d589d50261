//! Wire-format commands understood by the board firmware.
//!
//! Every function here is pure: it only formats text. The driver decides when
//! (and whether) a command goes out.

use crate::binary_state::BinaryState;
use crate::consts::wire::{COMMAND_TERMINATOR, PROMPT};
use std::fmt;

/// A single command line, consumed exactly once by the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
    expects_status: bool,
}

impl Command {
    fn plain(text: String) -> Self {
        Command {
            text,
            expects_status: false,
        }
    }

    /// Command text without terminator.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True for `gpio readall`, whose reply carries the full pin state.
    ///
    /// The driver treats the echo of the last such command sent as the
    /// announcement of the payload line.
    pub fn expects_status(&self) -> bool {
        self.expects_status
    }

    /// Bytes to put on the wire (text + CR).
    pub fn to_wire(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.text.len() + 1);
        bytes.extend_from_slice(self.text.as_bytes());
        bytes.push(COMMAND_TERMINATOR as u8);
        bytes
    }

    /// True if `line` is the firmware's echo of this command (`>` prompt + text).
    pub fn is_echo(&self, line: &str) -> bool {
        line.trim()
            .strip_prefix(PROMPT)
            .is_some_and(|rest| rest == self.text)
    }

    // --- GPIO ---

    /// `gpio readall`: reply is every pin's level as one hex value.
    pub fn read_all() -> Self {
        Command {
            text: "gpio readall".to_string(),
            expects_status: true,
        }
    }

    /// `gpio writeall <hex>`: drives every output at once.
    pub fn write_all(state: &BinaryState) -> Self {
        Self::plain(format!("gpio writeall {}", state.to_hex()))
    }

    /// `gpio iodir <hex>`: per-pin direction. On this hardware a 1 bit is an output.
    pub fn set_io_dir(state: &BinaryState) -> Self {
        Self::plain(format!("gpio iodir {}", state.to_hex()))
    }

    /// `gpio iomask <hex>`: which pins take part in `readall`/`writeall`.
    pub fn set_io_mask(state: &BinaryState) -> Self {
        Self::plain(format!("gpio iomask {}", state.to_hex()))
    }

    /// Logical assert of one output.
    ///
    /// Relay boards are active-low, so a plain assert pulls the pin with `clear`;
    /// `invert` swaps the verb for active-high wiring.
    pub fn assert_output(index: u8, invert: bool) -> Self {
        let verb = if invert { "set" } else { "clear" };
        Self::plain(format!("gpio {} {}", verb, index))
    }

    /// Logical de-assert of one output. Inverse of [`Command::assert_output`].
    pub fn release_output(index: u8, invert: bool) -> Self {
        let verb = if invert { "clear" } else { "set" };
        Self::plain(format!("gpio {} {}", verb, index))
    }

    /// Assert or release depending on `value`.
    pub fn write_output(index: u8, value: bool, invert: bool) -> Self {
        if value {
            Self::assert_output(index, invert)
        } else {
            Self::release_output(index, invert)
        }
    }

    /// `gpio read <n>`. Not issued by the driver.
    pub fn read_input(index: u8) -> Self {
        Self::plain(format!("gpio read {}", index))
    }

    // --- Identification ---

    /// `ver`: firmware version. Not issued by the driver.
    pub fn read_version() -> Self {
        Self::plain("ver".to_string())
    }

    /// `info`: power-on information. Not issued by the driver.
    pub fn power_on_info() -> Self {
        Self::plain("info".to_string())
    }

    /// `id get`. Not issued by the driver.
    pub fn get_id() -> Self {
        Self::plain("id get".to_string())
    }

    /// `id set <id>`. Not issued by the driver.
    pub fn set_id(id: &str) -> Self {
        Self::plain(format!("id set {}", id))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
