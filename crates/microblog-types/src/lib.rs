pub mod models;
pub mod page;

pub use models::{Post, User};
pub use page::Page;
