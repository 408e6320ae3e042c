//! Window store wired to fakes on a pinned clock

use std::sync::Arc;

use maintenance_manager::clock::FakeClock;
use maintenance_manager::store::{MemoryStorage, WindowStore};
use maintenance_manager::target::Target;
use maintenance_manager::window::RecurrenceSettings;

use super::fake_host::FakeDirectory;
use super::test_data::base_time;

pub struct StoreHarness {
    pub clock: FakeClock,
    pub storage: Arc<MemoryStorage>,
    pub directory: Arc<FakeDirectory>,
    pub store: Arc<WindowStore>,
}

impl StoreHarness {
    /// Store knowing `targets`, clock at [`base_time`], default settings.
    pub fn new(targets: &[Target]) -> Self {
        Self::with_settings(targets, RecurrenceSettings::default())
    }

    pub fn with_settings(targets: &[Target], settings: RecurrenceSettings) -> Self {
        Self::on_storage(targets, settings, Arc::new(MemoryStorage::new()))
    }

    /// Store over existing storage, as after a restart.
    pub fn on_storage(
        targets: &[Target],
        settings: RecurrenceSettings,
        storage: Arc<MemoryStorage>,
    ) -> Self {
        let clock = FakeClock::new(base_time());
        let directory = Arc::new(FakeDirectory::with(targets));
        let store = Arc::new(WindowStore::new(
            storage.clone(),
            directory.clone(),
            Arc::new(clock.clone()),
            settings,
        ));
        Self {
            clock,
            storage,
            directory,
            store,
        }
    }
}
