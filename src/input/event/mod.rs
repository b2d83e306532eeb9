pub mod registry;


use serde::{Deserialize, Serialize};

pub use registry::EventRegistry;

/// The semantic kind of signal an event represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Digital inputs with a pressed/released value
    Button,
    /// Absolute axis inputs like joysticks and triggers
    Axis,
    /// Relative axis inputs like mouse motion or wheels
    RelativeAxis,
    /// Any other device specific signal
    Other,
}

/// Whether or not an event takes part in translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    /// The event is translated and may be re-emitted as a recurring event
    #[default]
    Active,
    /// The value is recorded, but nothing is sent downstream
    Disabled,
    /// The event is translated, but never re-emitted as a recurring event
    Ignored,
}

/// Static declaration of an event that a device can emit. Declarations are
/// immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDecl {
    /// Explicit id for the event. When omitted, the next free id is assigned
    /// during registration.
    pub id: Option<usize>,
    pub name: String,
    pub description: String,
    pub event_type: EventType,
    pub state: EventState,
}

impl EventDecl {
    /// Returns a new active [EventDecl] with an id assigned at registration
    pub fn new(name: &str, description: &str, event_type: EventType) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            description: description.to_string(),
            event_type,
            state: EventState::Active,
        }
    }

    /// Returns the declaration with an explicit id
    pub fn with_id(mut self, id: usize) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns the declaration with the given default state
    pub fn with_state(mut self, state: EventState) -> Self {
        self.state = state;
        self
    }
}

/// Live instance of a declared event inside one input source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEvent {
    pub id: usize,
    pub name: String,
    pub description: String,
    pub event_type: EventType,
    pub value: i64,
    pub state: EventState,
}

/// A change in value of a single event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventChange {
    pub id: usize,
    pub value: i64,
}

impl EventChange {
    pub fn new(id: usize, value: i64) -> Self {
        Self { id, value }
    }
}
