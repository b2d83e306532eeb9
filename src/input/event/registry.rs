use std::collections::HashMap;

use crate::input::error::InputError;

use super::{EventDecl, EventState, SourceEvent};

/// Per-device table of declared events and their live state. Events are
/// stored in insertion order and addressed by their dense integer id.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    events: Vec<SourceEvent>,
    names: HashMap<String, usize>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new event from the given declaration and return its id.
    /// The registry is left untouched if the id or name is already taken.
    pub fn register_event(&mut self, decl: EventDecl) -> Result<usize, InputError> {
        let next_id = self.events.len();
        let id = decl.id.unwrap_or(next_id);
        if id < next_id {
            return Err(InputError::DuplicateId(id));
        }
        if id > next_id {
            return Err(InputError::InvalidState(format!(
                "event id {id} would leave a gap after id {}",
                next_id as i64 - 1
            )));
        }
        if self.names.contains_key(&decl.name) {
            return Err(InputError::DuplicateName(decl.name));
        }

        log::trace!("Registering event {id}: {}", decl.name);
        self.names.insert(decl.name.clone(), id);
        self.events.push(SourceEvent {
            id,
            name: decl.name,
            description: decl.description,
            event_type: decl.event_type,
            value: 0,
            state: decl.state,
        });

        Ok(id)
    }

    /// Set the state of the event with the given id
    pub fn toggle_event(&mut self, id: usize, state: EventState) -> Result<(), InputError> {
        let event = self.events.get_mut(id).ok_or(InputError::UnknownId(id))?;
        event.state = state;
        Ok(())
    }

    /// Returns all events in registration order
    pub fn get_events(&self) -> &[SourceEvent] {
        &self.events
    }

    pub fn get(&self, id: usize) -> Option<&SourceEvent> {
        self.events.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: usize) -> Option<&mut SourceEvent> {
        self.events.get_mut(id)
    }

    /// Look up the id of the event with the given canonical name
    pub fn find(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, id: usize) -> bool {
        id < self.events.len()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
