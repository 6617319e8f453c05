pub mod error;
pub mod types;
pub mod store;
pub mod runner;

pub use error::*;
pub use types::*;
pub use store::*;
pub use runner::*;
