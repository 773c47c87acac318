mod click;
mod link;

pub use click::{ClickEvent, NewClick};
pub use link::{Account, Link, LinkFilter, LinkUpdate, NewLink};
