mod assignment;
mod chain;
mod money;
mod payer;
mod payment;

pub use assignment::*;
pub use chain::*;
pub use money::*;
pub use payer::*;
pub use payment::*;
