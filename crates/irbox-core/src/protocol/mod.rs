//! Protocol module containing the command set, the line codec, and response
//! classification.

pub mod codec;
pub mod command;
pub mod response;
pub mod sequence;

pub use codec::{decode_line, encode_line, LineDecoder, ProtocolError};
pub use command::Command;
pub use response::Response;
pub use sequence::SequenceCounter;
