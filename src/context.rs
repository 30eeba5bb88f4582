use std::sync::Arc;

use crate::registry::{FormatDescriptor, FormatRegistry};

/// Read-only access to the format registry and embedder identity, the only
/// environment state the emitter needs.
///
/// Implemented directly by [`Environment`](crate::environment::Environment)
/// for synchronous emit, and by [`FormatSnapshot`] for the async worker,
/// which cannot borrow the environment across the thread boundary.
pub trait FormatSource {
    fn get_format(&self, id: i64) -> Option<&FormatDescriptor>;
    fn host_name(&self) -> &str;
    fn app_name(&self) -> &str;

    /// The registered name for `category`, for the std-prefix rendering of
    /// `emit_all`. Unlike the original's `GetCategoryName` (a `std::map::at`
    /// that throws on a miss), an unregistered id here falls back to its
    /// decimal form rather than aborting emit over a prefix detail.
    fn category_name(&self, category: i64) -> std::borrow::Cow<'_, str>;
}

/// An owned, `Send + Sync` point-in-time copy of the registry and identity
/// fields, captured when a background format job starts.
///
/// Registry mutation is only ever performed from the caller thread, and
/// never while a worker is active, so a snapshot taken at job start is
/// equivalent to a live borrow for the duration of that job.
#[derive(Debug, Clone)]
pub struct FormatSnapshot {
    registry: Arc<FormatRegistry>,
    host_name: String,
    app_name: String,
    categories: std::collections::HashMap<i64, String>,
}

impl FormatSnapshot {
    #[must_use]
    pub fn new(
        registry: Arc<FormatRegistry>,
        host_name: impl Into<String>,
        app_name: impl Into<String>,
        categories: std::collections::HashMap<i64, String>,
    ) -> Self {
        Self {
            registry,
            host_name: host_name.into(),
            app_name: app_name.into(),
            categories,
        }
    }
}

impl FormatSource for FormatSnapshot {
    fn get_format(&self, id: i64) -> Option<&FormatDescriptor> {
        self.registry.get(id)
    }

    fn host_name(&self) -> &str {
        &self.host_name
    }

    fn app_name(&self) -> &str {
        &self.app_name
    }

    fn category_name(&self, category: i64) -> std::borrow::Cow<'_, str> {
        match self.categories.get(&category) {
            Some(name) => std::borrow::Cow::Borrowed(name.as_str()),
            None => std::borrow::Cow::Owned(category.to_string()),
        }
    }
}
