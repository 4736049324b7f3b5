pub mod error;

pub use error::{constraint_message, AppError};
