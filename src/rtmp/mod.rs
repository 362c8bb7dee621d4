// RTMP protocol utilities

mod command;
mod constants;
mod data;
mod error;
mod handshake;
mod messages;
mod packet;

pub use command::*;
pub use constants::*;
pub use data::*;
pub use error::*;
pub use handshake::*;
pub use messages::*;
pub use packet::*;
