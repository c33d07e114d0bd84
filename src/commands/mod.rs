pub mod config;
mod list;
mod toggle;

pub use list::list;
pub use toggle::{disable, enable};
