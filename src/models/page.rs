//! Telegraph page and content node models

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A page on Telegraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Path to the page (everything after `https://telegra.ph/`)
    pub path: String,
    /// Full URL of the page
    pub url: String,
    /// Page title
    pub title: String,
    /// Page description
    #[serde(default)]
    pub description: String,
    /// Author name shown below the title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Author profile link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
    /// Preview image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Page content, only returned when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Node>>,
    /// Total views
    #[serde(default)]
    pub views: u64,
    /// Whether the requesting account may edit the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_edit: Option<bool>,
}

impl Page {
    /// Flatten the page content into plain text
    pub fn plain_text(&self) -> String {
        self.content
            .as_deref()
            .map(nodes_to_text)
            .unwrap_or_default()
    }
}

/// Pages belonging to an account, most recent first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageList {
    /// Total number of pages of the account
    pub total_count: u32,
    /// Requested slice of pages
    pub pages: Vec<Page>,
}

/// View counter for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageViews {
    /// Number of views
    pub views: u64,
}

/// A DOM node: either a text node or an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// Text node
    Text(String),
    /// Element node
    Element(NodeElement),
}

/// A DOM element node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeElement {
    /// Tag name (a, aside, b, blockquote, br, code, em, figcaption, figure,
    /// h3, h4, hr, i, iframe, img, li, ol, p, pre, s, strong, u, ul, video)
    pub tag: String,
    /// Attributes (href, src)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<HashMap<String, String>>,
    /// Child nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
}

impl Node {
    /// A `<p>` element wrapping a single text node
    pub fn paragraph(text: &str) -> Self {
        Self::Element(NodeElement {
            tag: "p".to_string(),
            attrs: None,
            children: Some(vec![Self::Text(text.to_string())]),
        })
    }

    /// Collect the text of this node and its descendants, one line per text node
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => {
                out.push_str(text);
                out.push('\n');
            }
            Self::Element(element) => {
                for child in element.children.iter().flatten() {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// Flatten a list of nodes into plain text
pub fn nodes_to_text(nodes: &[Node]) -> String {
    nodes.iter().map(Node::plain_text).collect()
}

/// Turn plain text into content nodes, one paragraph per non-empty line
pub fn text_to_nodes(text: &str) -> Vec<Node> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(Node::paragraph)
        .collect()
}
