/// Errors surfaced by the control-channel crate. Display and stats
/// operations are infallible by construction (values are clamped, not
/// rejected); this currently covers only event-bus plumbing failures.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("event bus has no subscribers")]
    NoSubscribers,
}
