//! Data models for inkpot

mod account;
mod page;

pub use account::{Account, AccountChanges, AccountId, AccountRecord};
pub use page::{Node, NodeElement, Page, PageList, PageViews, nodes_to_text, text_to_nodes};
