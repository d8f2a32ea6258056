use std::collections::HashSet;

use crate::naming::image_file_name;
use crate::source::{classify, extension_for, ImageSource};
use crate::ImageDescriptor;

/// Drops images presumed to be UI chrome.
///
/// An image counts as an icon only when both natural dimensions are known
/// (non-zero) and both are strictly below `min_dimension`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconFilter {
    pub min_dimension: u32,
}

impl Default for IconFilter {
    fn default() -> Self {
        Self { min_dimension: 50 }
    }
}

impl IconFilter {
    pub fn is_icon(&self, width: u32, height: u32) -> bool {
        let small = |d: u32| d > 0 && d < self.min_dimension;
        small(width) && small(height)
    }
}

/// One image accepted for saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    /// Position among accepted images, starting at 0.
    pub index: usize,
    pub source: ImageSource,
    pub file_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlanStats {
    pub found: usize,
    pub empty: usize,
    pub duplicates: usize,
    pub icons: usize,
    pub unsupported: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadPlan {
    pub items: Vec<DownloadItem>,
    pub stats: PlanStats,
}

/// Filter, deduplicate and name the extracted images, keeping extraction order.
///
/// `now_ms` is sampled once per accepted image for its file name.
pub fn plan_downloads<F>(descriptors: &[ImageDescriptor], filter: IconFilter, mut now_ms: F) -> DownloadPlan
where
    F: FnMut() -> i64,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut plan = DownloadPlan::default();
    plan.stats.found = descriptors.len();

    for descriptor in descriptors {
        let src = descriptor.src.as_str();
        if src.is_empty() {
            plan.stats.empty += 1;
            continue;
        }
        if seen.contains(src) {
            plan.stats.duplicates += 1;
            continue;
        }
        // Icons are not marked as seen: a later, measured copy of the same
        // URL may still qualify.
        if filter.is_icon(descriptor.width, descriptor.height) {
            plan.stats.icons += 1;
            continue;
        }
        seen.insert(src);

        let Some(source) = classify(src) else {
            plan.stats.unsupported += 1;
            continue;
        };
        let index = plan.items.len();
        let ext = extension_for(&source);
        plan.items.push(DownloadItem {
            index,
            file_name: image_file_name(now_ms(), index, &ext),
            source,
        });
    }

    plan
}
