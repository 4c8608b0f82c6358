// Persistent game-progress flags and the entities that react to them.
pub mod activation;
pub mod gate;
pub mod prefs;
pub mod registry;
pub mod store;
pub mod trigger;
pub mod visibility;

use std::env;
use std::path::PathBuf;

use bevy::prelude::*;

pub use gate::{FlagGate, GateState, RegisterOutcome};
pub use prefs::{FilePrefs, MemoryPrefs, Prefs};
pub use registry::EntityRegistry;
pub use store::{CounterReset, FlagStore};
pub use trigger::{
    InteractPressed, RegisterFlag, TriggerActivator, TriggerEntered, TriggerExited, TriggerVolume,
};
pub use visibility::{ConditionalVisibility, VisibilityBinding};

/// Set to `1` to wipe every flag when the store opens.
const RESET_ENV_VAR: &str = "FLAGKEEPER_RESET_FLAGS";

pub struct FlagsPlugin;

impl Plugin for FlagsPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<FlagConfig>()
            .cloned()
            .unwrap_or_default();
        // The store exists before any schedule runs, including the initial
        // state transition.
        if !app.world().contains_resource::<FlagStore>() {
            let store = config.open_store();
            info!("Opened flag store with {} flags", store.len());
            app.insert_resource(store);
        }

        app.insert_resource(config)
            .init_resource::<EntityRegistry>()
            .add_message::<TriggerEntered>()
            .add_message::<TriggerExited>()
            .add_message::<InteractPressed>()
            .add_message::<RegisterFlag>()
            .configure_sets(
                Update,
                (
                    FlagSystems::Sources,
                    FlagSystems::Gates,
                    FlagSystems::Visibility,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    registry::sync_registry,
                    trigger::detect_trigger_volumes,
                    trigger::read_interact_key,
                )
                    .chain()
                    .in_set(FlagSystems::Sources),
            )
            .add_systems(
                Update,
                (
                    gate::evaluate_gates_on_load,
                    gate::handle_trigger_events,
                    gate::handle_interact,
                    gate::handle_register_requests,
                    gate::monitor_gates,
                )
                    .chain()
                    .in_set(FlagSystems::Gates),
            )
            .add_systems(
                Update,
                visibility::evaluate_conditional_visibility.in_set(FlagSystems::Visibility),
            )
            .add_systems(Last, flush_on_exit);
    }
}

/// Per-tick ordering: a flag added by a gate is visible to every later step.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlagSystems {
    Sources,
    Gates,
    Visibility,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrefsBackend {
    Memory,
    File(PathBuf),
}

/// Insert before adding [`FlagsPlugin`] to override the defaults.
#[derive(Resource, Debug, Clone)]
pub struct FlagConfig {
    pub backend: PrefsBackend,
    pub reset_on_startup: bool,
    pub counter_resets: Vec<CounterReset>,
}

impl Default for FlagConfig {
    fn default() -> Self {
        Self {
            backend: PrefsBackend::File(FilePrefs::default_path()),
            reset_on_startup: env::var(RESET_ENV_VAR).is_ok_and(|value| value == "1"),
            counter_resets: vec![CounterReset::player_health()],
        }
    }
}

impl FlagConfig {
    pub fn in_memory() -> Self {
        Self {
            backend: PrefsBackend::Memory,
            reset_on_startup: false,
            counter_resets: vec![CounterReset::player_health()],
        }
    }

    fn open_store(&self) -> FlagStore {
        let prefs: Box<dyn Prefs> = match &self.backend {
            PrefsBackend::Memory => Box::new(MemoryPrefs::default()),
            PrefsBackend::File(path) => {
                info!("Flags persisted at {:?}", path);
                Box::new(FilePrefs::open(path))
            }
        };
        let mut store = FlagStore::new(prefs).with_counter_resets(self.counter_resets.clone());

        if self.reset_on_startup {
            warn!("Flag reset on startup is enabled; flags will not carry over");
            store.reset_all();
        }
        store.load();
        store
    }
}

fn flush_on_exit(mut exits: MessageReader<AppExit>, store: Option<ResMut<FlagStore>>) {
    if exits.read().count() == 0 {
        return;
    }
    if let Some(mut store) = store {
        store.flush();
    }
}
