//! In-memory [`GameStore`] for tests and the headless harness.

use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::progress::UserProgress;
use crate::session::{ActionLogEntry, GameStore, SessionRecord};
use crate::site::ExcavationSite;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    sites: HashMap<u64, ExcavationSite>,
    sessions: BTreeMap<u64, SessionRecord>,
    actions: Vec<ActionLogEntry>,
    progress: HashMap<u64, UserProgress>,
    next_session_id: u64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            next_session_id: 1,
            ..Self::default()
        }
    }

    pub fn with_site(mut self, site: ExcavationSite) -> Self {
        self.add_site(site);
        self
    }

    pub fn add_site(&mut self, site: ExcavationSite) {
        self.sites.insert(site.id, site);
    }

    pub fn sessions(&self) -> impl Iterator<Item = &SessionRecord> {
        self.sessions.values()
    }

    pub fn actions_for(&self, session_id: u64) -> Vec<&ActionLogEntry> {
        self.actions
            .iter()
            .filter(|a| a.session_id == session_id)
            .collect()
    }

    /// Overwrite a stored session as-is, e.g. to simulate a damaged row.
    pub fn replace_session(&mut self, session: SessionRecord) {
        self.sessions.insert(session.id, session);
    }
}

impl GameStore for InMemoryStore {
    fn site(&self, site_id: u64) -> Result<Option<ExcavationSite>> {
        Ok(self.sites.get(&site_id).cloned())
    }

    fn session(&self, session_id: u64) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.get(&session_id).cloned())
    }

    fn insert_session(&mut self, mut session: SessionRecord) -> Result<u64> {
        // `Default` leaves the counter at 0; ids start at 1 either way.
        let id = self.next_session_id.max(1);
        self.next_session_id = id + 1;
        session.id = id;
        self.sessions.insert(id, session);
        Ok(id)
    }

    fn update_session(&mut self, session: &SessionRecord) -> Result<()> {
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }

    fn append_action(&mut self, entry: ActionLogEntry) -> Result<()> {
        self.actions.push(entry);
        Ok(())
    }

    fn action_count(&self, session_id: u64) -> Result<u32> {
        Ok(self
            .actions
            .iter()
            .filter(|a| a.session_id == session_id)
            .count() as u32)
    }

    fn progress(&self, user_id: u64) -> Result<Option<UserProgress>> {
        Ok(self.progress.get(&user_id).cloned())
    }

    fn save_progress(&mut self, progress: &UserProgress) -> Result<()> {
        self.progress.insert(progress.user_id, progress.clone());
        Ok(())
    }
}
