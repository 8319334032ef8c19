//! Margin WebSocket channels. They share the spot endpoints and tokens.

pub mod private;
pub mod public;

pub use private::MarginPrivateWs;
pub use public::MarginPublicWs;
