mod library;
mod movie;
mod oracle;
mod recommendation;
mod user_preferences;

pub use library::*;
pub use movie::*;
pub use oracle::*;
pub use recommendation::*;
pub use user_preferences::*;
