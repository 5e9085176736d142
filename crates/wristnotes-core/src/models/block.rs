//! Display block model

use serde::{Deserialize, Serialize};

/// Kind of a renderable unit of a note body.
///
/// `Heading2`, `Heading3`, `Bold` and `Link` are renderable but the markup
/// parser has no extraction rule producing them yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Heading1,
    Heading2,
    Heading3,
    Paragraph,
    ListItem,
    Bold,
    Link,
}

/// One renderable unit of a note body, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayBlock {
    pub kind: BlockKind,
    pub text: String,
}

impl DisplayBlock {
    pub fn new(kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}
