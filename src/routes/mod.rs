mod admin;
mod companies;
mod health;
mod http_utils;
mod students;

pub use admin::*;
pub use companies::*;
pub use health::*;
pub use http_utils::{error_chain_fmt, ApiError};
pub use students::*;
