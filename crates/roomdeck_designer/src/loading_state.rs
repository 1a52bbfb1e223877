use std::collections::BTreeSet;

/// Transient progress of model loading, shown by the host while a single
/// add or a bulk reconstruction is underway.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadingState {
    pub is_loading: bool,
    pub current_item_name: Option<String>,
    /// 0-100 for the current item.
    pub progress: u8,
    pub total_items: usize,
    pub completed_items: usize,
    pub loaded_paths: BTreeSet<String>,
    pub failed_paths: BTreeSet<String>,
}

impl LoadingState {
    pub fn begin(&mut self, total_items: usize) {
        self.is_loading = true;
        self.total_items = total_items;
        self.completed_items = 0;
        self.progress = 0;
        self.current_item_name = None;
    }

    pub fn start_item(&mut self, name: &str) {
        self.is_loading = true;
        self.current_item_name = Some(name.to_owned());
        self.progress = 0;
    }

    /// Only applies when `name` is the item currently being tracked.
    pub fn set_progress(&mut self, name: &str, progress: u8) {
        if self.current_item_name.as_deref() == Some(name) {
            self.progress = progress.min(100);
        }
    }

    pub fn complete_item(&mut self, path: &str, ok: bool) {
        if ok {
            self.loaded_paths.insert(path.to_owned());
            self.failed_paths.remove(path);
        } else {
            self.failed_paths.insert(path.to_owned());
        }
        self.completed_items += 1;
        self.progress = 100;
    }

    pub fn finish(&mut self) {
        self.is_loading = false;
        self.current_item_name = None;
        self.progress = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Overall fraction done, 0.0-1.0.
    pub fn fraction(&self) -> f32 {
        if self.total_items == 0 {
            return if self.is_loading {
                self.progress as f32 / 100.0
            } else {
                0.0
            };
        }
        (self.completed_items as f32 / self.total_items as f32).min(1.0)
    }
}
