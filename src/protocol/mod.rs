//! Mecademic text protocol: framing, code tables, decoding and commands

pub mod codes;
pub mod command;
pub mod decode;
pub mod frame;
pub mod version;

pub use codes::{expected_codes, is_error_code, ExpectedCodes, SessionFlags, TelemetryCodeTable, TelemetryField};
pub use command::Command;
pub use decode::{decode, decode_payload, Value};
pub use frame::{Frame, FrameReassembler};
pub use version::parse_firmware_version;
