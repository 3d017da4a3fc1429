use crate::trail::Fix;

/// Event emitted by a fix source: an observation, or an error message the
/// source wants shown to the consumer instead of a fix.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    Fix(Fix),
    Error(String),
}
