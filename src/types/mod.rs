mod identity;
mod license;
mod scalar;
mod session;

pub use identity::*;
pub use license::*;
pub use scalar::*;
pub use session::*;
