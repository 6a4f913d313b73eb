pub mod base;
pub mod logging;
pub mod server;
pub mod storage;

pub use base::*;
pub use logging::*;
pub use server::*;
pub use storage::*;
