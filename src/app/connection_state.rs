/// Whether the store is bound to an open database session.
///
/// Disconnecting resets the store and leaves it `Closed` until the next
/// session opens. Tasks of the old session may still be finishing then, so
/// their results are ignored in that state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    NotConnected,
    Connected { database_name: String },
    Closed,
}

impl ConnectionState {
    pub fn connected(database_name: impl Into<String>) -> Self {
        Self::Connected {
            database_name: database_name.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn database_name(&self) -> Option<&str> {
        match self {
            Self::Connected { database_name } => Some(database_name),
            Self::NotConnected | Self::Closed => None,
        }
    }
}
