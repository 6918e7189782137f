//! The user's program library.
//!
//! An ordered list persisted as JSON under [`PROGRAMS_KEY`]. Every mutation is
//! written through to the store immediately.

use std::sync::Arc;

use super::Program;
use crate::error::{CoreError, ProgramError, Result};
use crate::storage::{load_json, save_json, KeyValueStore};

/// Store key holding the serialized program list.
pub const PROGRAMS_KEY: &str = "programs";

pub struct ProgramCatalog {
    store: Arc<dyn KeyValueStore>,
    programs: Vec<Program>,
}

impl ProgramCatalog {
    /// Restore the catalog from `store`. Missing or unreadable data yields an
    /// empty catalog.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let programs: Vec<Program> = load_json(store.as_ref(), PROGRAMS_KEY).unwrap_or_default();
        tracing::debug!(count = programs.len(), "program catalog restored");
        Self { store, programs }
    }

    pub fn list(&self) -> &[Program] {
        &self.programs
    }

    pub fn get(&self, id: &str) -> Option<&Program> {
        self.programs.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Append a program.
    ///
    /// # Errors
    /// Rejects invalid programs and duplicate ids, or fails if persisting fails.
    pub fn add(&mut self, program: Program) -> Result<()> {
        program.validate()?;
        if self.get(&program.id).is_some() {
            return Err(ProgramError::DuplicateId(program.id).into());
        }
        self.programs.push(program);
        self.save()
    }

    /// Replace the program with the same id, keeping its position.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id, or a validation or storage error.
    pub fn update(&mut self, program: Program) -> Result<()> {
        program.validate()?;
        let slot = self
            .programs
            .iter_mut()
            .find(|p| p.id == program.id)
            .ok_or_else(|| ProgramError::NotFound(program.id.clone()))?;
        *slot = program;
        self.save()
    }

    /// Remove and return the program with `id`.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id, or a storage error.
    pub fn remove(&mut self, id: &str) -> Result<Program> {
        let index = self
            .programs
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ProgramError::NotFound(id.to_string()))?;
        let removed = self.programs.remove(index);
        self.save()?;
        Ok(removed)
    }

    fn save(&self) -> Result<()> {
        save_json(self.store.as_ref(), PROGRAMS_KEY, &self.programs).map_err(CoreError::from)
    }
}

impl std::fmt::Debug for ProgramCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramCatalog")
            .field("programs", &self.programs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Interval;
    use crate::storage::MemoryStore;

    fn program(id: &str, minutes: u32) -> Program {
        Program::new(id.to_uppercase(), vec![Interval::sauna("s1", minutes, None)]).with_id(id)
    }

    #[test]
    fn mutations_are_persisted() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut catalog = ProgramCatalog::load(store.clone());
        assert!(catalog.is_empty());

        catalog.add(program("a", 10)).unwrap();
        catalog.add(program("b", 12)).unwrap();
        catalog.update(program("a", 20)).unwrap();

        let restored = ProgramCatalog::load(store);
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.list()[0].id, "a");
        assert_eq!(restored.list()[0].intervals[0].duration_minutes, 20);
        assert_eq!(restored.list()[1].id, "b");
    }

    #[test]
    fn add_rejects_duplicates_and_empty_programs() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut catalog = ProgramCatalog::load(store);
        catalog.add(program("a", 10)).unwrap();

        assert!(matches!(
            catalog.add(program("a", 5)),
            Err(CoreError::Program(ProgramError::DuplicateId(_)))
        ));
        assert!(matches!(
            catalog.add(Program::new("Empty", vec![])),
            Err(CoreError::Program(ProgramError::Empty { .. }))
        ));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn update_and_remove_unknown_id_fail() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut catalog = ProgramCatalog::load(store);
        assert!(matches!(
            catalog.update(program("ghost", 5)),
            Err(CoreError::Program(ProgramError::NotFound(_)))
        ));
        assert!(catalog.remove("ghost").is_err());

        catalog.add(program("a", 10)).unwrap();
        let removed = catalog.remove("a").unwrap();
        assert_eq!(removed.id, "a");
        assert!(catalog.is_empty());
    }

    #[test]
    fn corrupt_catalog_restores_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(PROGRAMS_KEY, "[{\"id\":").unwrap();
        let catalog = ProgramCatalog::load(store);
        assert!(catalog.is_empty());
    }
}
