pub mod constants;
pub mod entities;
pub mod error;
pub mod notification;
pub mod types;

pub use constants::*;
pub use entities::*;
pub use error::GsdError;
pub use notification::*;
pub use types::*;
