//! Snapshot - a point-in-time capture of a backend's reported statistics.

use alloc::collections::BTreeMap;
use alloc::string::String;

/// One named table of raw `field → value` text, as reported by a backend.
pub type Section = BTreeMap<String, String>;

/// A point-in-time capture of the statistics a backend reports.
///
/// Values are kept exactly as the server sent them and parsed lazily by
/// whoever consumes them, because the set of reported fields differs from
/// one server version to the next. Flat tables (such as a MySQL status
/// query) live in a single named section; Redis `INFO` output maps one
/// section per `# Header`.
///
/// # Example
///
/// ```rust
/// use storewatch_types::Snapshot;
///
/// let mut snapshot = Snapshot::new();
/// snapshot.insert("status", "Com_select", "150");
///
/// assert_eq!(snapshot.get("status", "Com_select"), Some("150"));
/// assert_eq!(snapshot.get("status", "Com_insert"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Sections keyed by name, each a table of raw field values.
    pub sections: BTreeMap<String, Section>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for constructing snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Check if the snapshot has no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Number of sections in the snapshot.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Get a section by name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Get the raw value of `field` inside `section`.
    pub fn get(&self, section: &str, field: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(field))
            .map(String::as_str)
    }

    /// Open a section, creating it empty if it does not exist yet.
    ///
    /// A section that exists but holds no fields is meaningful: Redis reports
    /// an empty `# Keyspace` header when no database holds keys.
    pub fn open_section(&mut self, name: impl Into<String>) -> &mut Section {
        self.sections.entry(name.into()).or_default()
    }

    /// Insert a raw value, creating the section if needed.
    pub fn insert(
        &mut self,
        section: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.open_section(section)
            .insert(field.into(), value.into());
    }

    /// Iterate over all sections.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Section)> {
        self.sections.iter()
    }

    /// Total number of fields across all sections.
    pub fn field_count(&self) -> usize {
        self.sections.values().map(|s| s.len()).sum()
    }
}

/// Builder for constructing `Snapshot` instances.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    sections: BTreeMap<String, Section>,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section with fields built using a closure.
    pub fn section<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(SectionBuilder) -> SectionBuilder,
    {
        let section = f(SectionBuilder::default()).fields;
        self.sections.insert(name.into(), section);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        Snapshot {
            sections: self.sections,
        }
    }
}

/// Builder for a single section.
#[derive(Debug, Default)]
pub struct SectionBuilder {
    fields: Section,
}

impl SectionBuilder {
    /// Set a raw field value.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}
