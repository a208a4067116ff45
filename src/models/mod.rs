pub mod token;
pub mod notice;

pub use token::{Token, TokenId};
pub use notice::{LaunchNotice, PermissionState};
