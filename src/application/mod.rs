pub mod error;
pub mod service;
pub mod statement;
pub mod sync;

pub use error::*;
pub use service::*;
pub use statement::*;
pub use sync::*;
