use std::collections::HashMap;

use crate::{
    error::{DuplicateSessionId, NotFound},
    session::Session,
};

/// In-memory, insertion ordered collection of the sessions of this process.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Vec<Session>,
    index: HashMap<i64, usize>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, session: Session) -> Result<(), DuplicateSessionId> {
        if self.index.contains_key(&session.id()) {
            return Err(DuplicateSessionId(session.id()));
        }

        self.index.insert(session.id(), self.sessions.len());
        self.sessions.push(session);
        Ok(())
    }

    pub fn find_by_id(&self, id: i64) -> Result<&Session, NotFound> {
        self.index
            .get(&id)
            .map(|&position| &self.sessions[position])
            .ok_or(NotFound(id))
    }

    /// Sessions in insertion order. The iterator can be cloned to walk them again.
    pub fn all(&self) -> std::slice::Iter<'_, Session> {
        self.sessions.iter()
    }

    /// Swaps in a whole new collection. On error the store is left untouched.
    pub fn replace_all(&mut self, sessions: Vec<Session>) -> Result<(), DuplicateSessionId> {
        let mut index = HashMap::with_capacity(sessions.len());
        for (position, session) in sessions.iter().enumerate() {
            if index.insert(session.id(), position).is_some() {
                return Err(DuplicateSessionId(session.id()));
            }
        }

        self.sessions = sessions;
        self.index = index;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Highest id currently held, used to keep new ids increasing.
    pub fn max_id(&self) -> Option<i64> {
        self.sessions.iter().map(Session::id).max()
    }
}
