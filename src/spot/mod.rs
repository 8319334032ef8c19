//! Spot market WebSocket channels.

pub mod private;
pub mod public;

pub use private::SpotPrivateWs;
pub use public::SpotPublicWs;
