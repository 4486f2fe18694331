//! Identity collaborator: who is looking, and may they edit

use topic_graph::Perspective;

/// Current session identity
pub trait Identity: Send + Sync {
    /// Username, or the playground identity
    fn perspective(&self) -> Perspective;

    /// Whether this session may mutate the topic
    fn can_edit(&self) -> bool;
}

/// Fixed identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity {
    perspective: Perspective,
    can_edit: bool,
}

impl StaticIdentity {
    /// Signed-in editor
    #[must_use]
    pub fn editor(username: impl Into<String>) -> Self {
        Self {
            perspective: Perspective::new(username),
            can_edit: true,
        }
    }

    /// Signed-in user without edit rights
    #[must_use]
    pub fn viewer(username: impl Into<String>) -> Self {
        Self {
            perspective: Perspective::new(username),
            can_edit: false,
        }
    }

    /// Anonymous playground session; playground topics are editable by anyone
    #[must_use]
    pub fn playground() -> Self {
        Self {
            perspective: Perspective::playground(),
            can_edit: true,
        }
    }
}

impl Identity for StaticIdentity {
    fn perspective(&self) -> Perspective {
        self.perspective.clone()
    }

    fn can_edit(&self) -> bool {
        self.can_edit
    }
}
