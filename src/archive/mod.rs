pub mod codec;
pub mod hasher;
pub mod validator;

pub use codec::{ArchiveError, extract_archive};
