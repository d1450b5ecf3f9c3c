use crate::id::NodeId;

#[derive(Debug, Clone)]
pub struct Text {
    id: NodeId,
    pub content: String,
}

impl Text {
    pub fn new(content: impl Into<String>) -> Self {
        Self { id: NodeId::generate(), content: content.into() }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content
    }
}

#[derive(Debug, Clone)]
pub struct Comment {
    id: NodeId,
    pub content: String,
}

impl Comment {
    pub fn new(content: impl Into<String>) -> Self {
        Self { id: NodeId::generate(), content: content.into() }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl PartialEq for Comment {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content
    }
}
