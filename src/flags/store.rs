// The persistent set of game-progress flags.
use std::collections::BTreeSet;

use bevy::prelude::*;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

use super::prefs::{MemoryPrefs, Prefs};

/// Prefs key holding every flag joined by [`FLAG_DELIMITER`].
pub const FLAGS_KEY: &str = "Flags";
pub const FLAG_DELIMITER: char = '|';

pub const HEALTH_KEY: &str = "player_health";
pub const DEFAULT_HEALTH: f32 = 100.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    #[error("invalid flag id {0:?}: must be non-empty and free of '|'")]
    InvalidFlagId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RemoveOutcome {
    Removed,
    NotPresent,
}

/// A prefs value owned by another system that goes back to a default
/// whenever all flags are cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterReset {
    pub key: String,
    pub value: f32,
}

impl CounterReset {
    pub fn new(key: impl Into<String>, value: f32) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn player_health() -> Self {
        Self::new(HEALTH_KEY, DEFAULT_HEALTH)
    }
}

pub fn validate_flag_id(flag_id: &str) -> Result<(), FlagError> {
    if flag_id.is_empty() || flag_id.contains(FLAG_DELIMITER) {
        return Err(FlagError::InvalidFlagId(flag_id.to_owned()));
    }
    Ok(())
}

fn parse_flags(raw: &str) -> BTreeSet<String> {
    raw.split(FLAG_DELIMITER)
        .filter(|flag| !flag.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Process-wide flag state. Every mutation is written through to the prefs.
#[derive(Resource)]
pub struct FlagStore {
    flags: BTreeSet<String>,
    prefs: Box<dyn Prefs>,
    counter_resets: Vec<CounterReset>,
}

impl FlagStore {
    /// An empty store over `prefs`. Call [`FlagStore::load`] to pick up
    /// previously saved flags.
    pub fn new(prefs: Box<dyn Prefs>) -> Self {
        Self {
            flags: BTreeSet::new(),
            prefs,
            counter_resets: vec![CounterReset::player_health()],
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryPrefs::default()))
    }

    pub fn with_counter_resets(mut self, resets: Vec<CounterReset>) -> Self {
        self.counter_resets = resets;
        self
    }

    pub fn has(&self, flag_id: &str) -> bool {
        self.flags.contains(flag_id)
    }

    pub fn add(&mut self, flag_id: &str) -> Result<AddOutcome, FlagError> {
        validate_flag_id(flag_id)?;
        if self.flags.contains(flag_id) {
            warn!("A flag named '{flag_id}' already exists");
            return Ok(AddOutcome::AlreadyPresent);
        }

        self.flags.insert(flag_id.to_owned());
        self.save();
        info!("flag set: {flag_id}");
        Ok(AddOutcome::Added)
    }

    pub fn remove(&mut self, flag_id: &str) -> Result<RemoveOutcome, FlagError> {
        validate_flag_id(flag_id)?;
        if !self.flags.remove(flag_id) {
            return Ok(RemoveOutcome::NotPresent);
        }

        self.save();
        info!("flag removed: {flag_id}");
        Ok(RemoveOutcome::Removed)
    }

    /// Clear every flag and put dependent counters back to their defaults.
    pub fn reset_all(&mut self) {
        warn!("Removing all flags");
        self.flags.clear();
        for reset in &self.counter_resets {
            self.prefs.set_float(&reset.key, reset.value);
        }
        self.save();
    }

    /// Replace the in-memory set with whatever the prefs hold. Missing or
    /// empty values load as an empty set.
    pub fn load(&mut self) {
        self.flags = self
            .prefs
            .get_string(FLAGS_KEY)
            .map(|raw| parse_flags(&raw))
            .unwrap_or_default();
        debug!("Loaded {} flags", self.flags.len());
    }

    pub fn save(&mut self) {
        let joined = self
            .flags
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(FLAG_DELIMITER.to_string().as_str());
        self.prefs.set_string(FLAGS_KEY, &joined);
        if let Err(err) = self.prefs.save() {
            error!("Failed to persist flags: {err}");
        }
    }

    /// Session teardown: push the current state to disk one last time.
    pub fn flush(&mut self) {
        self.save();
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flags in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn store_with(prefs: &MemoryPrefs) -> FlagStore {
        let mut store = FlagStore::new(Box::new(prefs.clone()));
        store.load();
        store
    }

    #[test]
    fn add_then_has() {
        let mut store = FlagStore::in_memory();
        assert!(!store.has("key_a"));

        assert_eq!(store.add("key_a"), Ok(AddOutcome::Added));
        assert!(store.has("key_a"));
        assert!(!store.has("key_b"));
        assert!(!store.has(""));
    }

    #[test]
    fn second_add_reports_already_present() {
        let prefs = MemoryPrefs::default();
        let mut store = store_with(&prefs);

        assert_eq!(store.add("key_a"), Ok(AddOutcome::Added));
        assert_eq!(store.add("key_a"), Ok(AddOutcome::AlreadyPresent));
        assert_eq!(store.len(), 1);
        // Only the first add touched storage.
        assert_eq!(prefs.save_count(), 1);
    }

    #[test]
    fn invalid_ids_are_rejected() {
        let mut store = FlagStore::in_memory();

        assert_eq!(
            store.add(""),
            Err(FlagError::InvalidFlagId(String::new()))
        );
        assert_eq!(
            store.add("a|b"),
            Err(FlagError::InvalidFlagId("a|b".to_owned()))
        );
        assert!(store.remove("").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn remove_only_mutates_when_present() {
        let prefs = MemoryPrefs::default();
        let mut store = store_with(&prefs);
        store.add("lever_pulled").unwrap();

        assert_eq!(store.remove("door_opened"), Ok(RemoveOutcome::NotPresent));
        assert_eq!(prefs.save_count(), 1);

        assert_eq!(store.remove("lever_pulled"), Ok(RemoveOutcome::Removed));
        assert!(!store.has("lever_pulled"));
        assert_eq!(prefs.save_count(), 2);
        assert_eq!(prefs.get_string(FLAGS_KEY).as_deref(), Some(""));
    }

    #[test]
    fn has_tracks_adds_and_removes() {
        let mut store = FlagStore::in_memory();
        let ops = [
            ("a", true),
            ("b", true),
            ("a", false),
            ("c", true),
            ("a", true),
            ("b", false),
        ];
        for (flag, add) in ops {
            if add {
                store.add(flag).unwrap();
            } else {
                store.remove(flag).unwrap();
            }
        }

        assert!(store.has("a"));
        assert!(!store.has("b"));
        assert!(store.has("c"));
        assert_eq!(store.iter().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn reset_all_clears_flags_and_restores_health() {
        let prefs = MemoryPrefs::default();
        let mut writer = prefs.clone();
        writer.set_float(HEALTH_KEY, 12.5);

        let mut store = store_with(&prefs);
        store.add("key_a").unwrap();
        store.add("door_opened").unwrap();

        store.reset_all();
        assert!(store.is_empty());
        assert_eq!(prefs.get_float(HEALTH_KEY), Some(DEFAULT_HEALTH));
        assert_eq!(prefs.get_string(FLAGS_KEY).as_deref(), Some(""));

        // Again on an empty store.
        store.reset_all();
        assert!(store.is_empty());
        assert_eq!(prefs.get_float(HEALTH_KEY), Some(DEFAULT_HEALTH));
    }

    #[test]
    fn counter_resets_are_configurable() {
        let prefs = MemoryPrefs::default();
        let mut store = FlagStore::new(Box::new(prefs.clone()))
            .with_counter_resets(vec![CounterReset::new("lives", 3.0)]);

        store.reset_all();
        assert_eq!(prefs.get_float("lives"), Some(3.0));
        assert_eq!(prefs.get_float(HEALTH_KEY), None);
    }

    #[test]
    fn saved_flags_load_into_a_fresh_store() {
        let prefs = MemoryPrefs::default();
        let mut store = store_with(&prefs);
        for flag in ["door_1_opened", "key_a", "lever_pulled"] {
            store.add(flag).unwrap();
        }

        let reloaded = store_with(&prefs);
        assert_eq!(
            reloaded.iter().collect::<BTreeSet<_>>(),
            store.iter().collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn load_tolerates_missing_and_sparse_values() {
        let prefs = MemoryPrefs::default();
        assert!(store_with(&prefs).is_empty());

        let mut writer = prefs.clone();
        writer.set_string(FLAGS_KEY, "");
        assert!(store_with(&prefs).is_empty());

        writer.set_string(FLAGS_KEY, "|a||b|");
        let store = store_with(&prefs);
        assert_eq!(store.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(String),
        Remove(String),
        Reset,
    }

    // A small alphabet so sequences revisit the same ids.
    fn small_id() -> impl Strategy<Value = String> {
        "[a-d]{1,2}"
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => small_id().prop_map(Op::Add),
            2 => small_id().prop_map(Op::Remove),
            1 => Just(Op::Reset),
        ]
    }

    proptest! {
        #[test]
        fn store_matches_a_set_under_any_sequence(ops in prop::collection::vec(op(), 0..40)) {
            let prefs = MemoryPrefs::default();
            let mut store = store_with(&prefs);
            let mut model = BTreeSet::new();

            for op in &ops {
                match op {
                    Op::Add(id) => {
                        let expected = if model.insert(id.clone()) {
                            AddOutcome::Added
                        } else {
                            AddOutcome::AlreadyPresent
                        };
                        prop_assert_eq!(store.add(id), Ok(expected));
                    }
                    Op::Remove(id) => {
                        let expected = if model.remove(id) {
                            RemoveOutcome::Removed
                        } else {
                            RemoveOutcome::NotPresent
                        };
                        prop_assert_eq!(store.remove(id), Ok(expected));
                    }
                    Op::Reset => {
                        model.clear();
                        store.reset_all();
                    }
                }
                prop_assert_eq!(store.len(), model.len());
                for id in ["a", "b", "c", "d", "ab", "dd"] {
                    prop_assert_eq!(store.has(id), model.contains(id));
                }
            }

            let reloaded = store_with(&prefs);
            prop_assert!(reloaded.iter().eq(model.iter().map(String::as_str)));
        }

        #[test]
        fn any_delimiter_free_ids_survive_save_and_load(
            ids in prop::collection::btree_set("[^|]{1,16}", 0..12)
        ) {
            let prefs = MemoryPrefs::default();
            let mut store = store_with(&prefs);
            for id in &ids {
                prop_assert_eq!(store.add(id), Ok(AddOutcome::Added));
            }
            store.save();

            let reloaded = store_with(&prefs);
            prop_assert!(reloaded.iter().eq(ids.iter().map(String::as_str)));
        }
    }

    #[test]
    fn outcomes_render_for_logs() {
        assert_eq!(AddOutcome::AlreadyPresent.to_string(), "already_present");
        let name: &'static str = RemoveOutcome::NotPresent.into();
        assert_eq!(name, "not_present");
    }
}
