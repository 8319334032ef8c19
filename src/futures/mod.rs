//! Futures market WebSocket channels.

pub mod private;
pub mod public;

pub use private::FuturesPrivateWs;
pub use public::FuturesPublicWs;
