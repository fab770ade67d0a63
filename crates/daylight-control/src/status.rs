/// Session lifecycle state, mirroring the five states of a mirroring
/// session: an idle daemon, one starting up, one running, one shutting
/// down, and a fatal error carrying its cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    Starting,
    Running,
    Stopping,
    Error(String),
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}
