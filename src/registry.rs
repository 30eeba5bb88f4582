use crate::error::CoreError;
use crate::selector::{FormatEntryKind, FormatSelector};

/// One placeholder within a [`FormatDescriptor`].
#[derive(Debug, Clone, PartialEq)]
pub struct FormatEntry {
    pub kind: FormatEntryKind,
    pub selector: FormatSelector,
    /// Text emitted immediately after this entry's value.
    pub trailing_literal: String,
}

impl FormatEntry {
    #[must_use]
    pub fn new(kind: FormatEntryKind, selector: FormatSelector, trailing_literal: String) -> Self {
        Self {
            kind,
            selector,
            trailing_literal,
        }
    }
}

/// A parsed, immutable format definition identified by a numeric id.
///
/// Descriptors are never mutated after installation: the registry replaces
/// the whole slot on a re-registration rather than patching fields in place.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatDescriptor {
    pub id: i64,
    pub initial_segment: String,
    pub entries: Vec<FormatEntry>,
    /// The original, unparsed format string, kept for diagnostics only.
    pub original: String,
}

/// Append-addressed table mapping a format id to its descriptor.
///
/// A successful [`FormatRegistry::register`] either appends (`id ==
/// self.len()`) or replaces an existing slot (`id < self.len()`) — this
/// mirrors the host's allocation discipline: ids are handed out
/// monotonically by the host, and a re-registration at an already-allocated
/// id is how the host corrects a failed prior registration.
#[derive(Debug, Default, Clone)]
pub struct FormatRegistry {
    formats: Vec<FormatDescriptor>,
}

impl FormatRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { formats: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Register a format descriptor.
    ///
    /// `kinds`, `selectors`, and `trailing_literals` must have equal length;
    /// otherwise the registration is rejected with
    /// [`CoreError::BadArguments`] and the registry is left unchanged.
    pub fn register(
        &mut self,
        id: i64,
        kinds: &[FormatEntryKind],
        selectors: &[FormatSelector],
        initial_segment: impl Into<String>,
        trailing_literals: &[String],
        original: impl Into<String>,
    ) -> Result<(), CoreError> {
        if kinds.len() != selectors.len() || kinds.len() != trailing_literals.len() {
            return Err(CoreError::BadArguments {
                what: "register_format",
                detail: format!(
                    "kinds ({}), selectors ({}), and trailing_literals ({}) must have equal length",
                    kinds.len(),
                    selectors.len(),
                    trailing_literals.len()
                ),
            });
        }
        if id < 0 {
            return Err(CoreError::BadArguments {
                what: "register_format",
                detail: format!("format id must be nonnegative, got {id}"),
            });
        }

        let entries = kinds
            .iter()
            .zip(selectors.iter())
            .zip(trailing_literals.iter())
            .map(|((kind, selector), trailing)| FormatEntry::new(*kind, *selector, trailing.clone()))
            .collect();

        let descriptor = FormatDescriptor {
            id,
            initial_segment: initial_segment.into(),
            entries,
            original: original.into(),
        };

        let idx = id as usize;
        if idx == self.formats.len() {
            self.formats.push(descriptor);
        } else if idx < self.formats.len() {
            tracing::debug!(format_id = id, "replacing existing format registration");
            self.formats[idx] = descriptor;
        } else {
            return Err(CoreError::BadArguments {
                what: "register_format",
                detail: format!(
                    "format id {id} is not the next appendable slot ({}) nor an existing one",
                    self.formats.len()
                ),
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<&FormatDescriptor> {
        if id < 0 {
            return None;
        }
        self.formats.get(id as usize)
    }
}
