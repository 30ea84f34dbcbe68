use std::sync::Arc;

use parking_lot::Mutex;

use crate::storage::ProgressHook;

/// Called with the overall percentage, in `[0, 100]`
pub type PercentHook = Arc<dyn Fn(f64) + Send + Sync>;

/// Aggregates the byte progress of every item of a batch
///
/// Items start out sized by their plaintext; the first report of an upload
/// replaces that with the size actually sent, sealing overhead included.
pub(crate) struct ProgressTracker {
    items: Mutex<Vec<ItemProgress>>,
    hook: Option<PercentHook>,
}

#[derive(Debug, Clone, Copy)]
struct ItemProgress {
    uploaded: u64,
    total: u64,
}

impl ProgressTracker {
    pub fn new(sizes: impl IntoIterator<Item = u64>, hook: Option<PercentHook>) -> Arc<Self> {
        let items = sizes
            .into_iter()
            .map(|total| ItemProgress { uploaded: 0, total })
            .collect();
        Arc::new(Self {
            items: Mutex::new(items),
            hook,
        })
    }

    /// Record the progress of one item and report the overall percentage
    pub fn update(&self, index: usize, uploaded: u64, total: u64) -> f64 {
        let percent = {
            let mut items = self.items.lock();
            if let Some(item) = items.get_mut(index) {
                *item = ItemProgress { uploaded, total };
            }
            Self::percent(&items)
        };
        if let Some(hook) = &self.hook {
            hook(percent);
        }
        percent
    }

    pub fn percentage(&self) -> f64 {
        Self::percent(&self.items.lock())
    }

    /// Upload hook feeding item `index` into the tracker
    pub fn item_hook(self: &Arc<Self>, index: usize) -> ProgressHook {
        let tracker = self.clone();
        Arc::new(move |uploaded, total| {
            tracker.update(index, uploaded, total);
        })
    }

    fn percent(items: &[ItemProgress]) -> f64 {
        let uploaded: u64 = items.iter().map(|item| item.uploaded).sum();
        let total: u64 = items.iter().map(|item| item.total).sum();
        // nothing to upload is nothing left to do
        if total == 0 {
            return 100.0;
        }
        (uploaded as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}
