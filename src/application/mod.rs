// Application layer: use cases over the repository, the error
// taxonomy, and the structured response envelope for boundaries.

pub mod error;
pub mod reporting;
pub mod response;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use response::*;
pub use service::*;
