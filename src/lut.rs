// ============================================================================
// COLOR LOOKUP TABLES — explicit registry, resolved by id per draw call
// ============================================================================
//
// The layer stores only a table id, never a reference; absence of the table
// degrades LUT-mode rendering to a no-op instead of failing the frame.

use std::collections::HashMap;

/// An indexed color table mapping integer sample values to display colors,
/// with optional human-readable labels (anatomical structure names and the
/// like) used by the probe readout.
#[derive(Clone, Debug, Default)]
pub struct ColorTable {
    pub label: String,
    entries: HashMap<i32, ([u8; 3], String)>,
}

impl ColorTable {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, index: i32, color: [u8; 3], label: impl Into<String>) {
        self.entries.insert(index, (color, label.into()));
    }

    /// Color for an index; `None` for indices the table does not define.
    pub fn color_at(&self, index: i32) -> Option<[u8; 3]> {
        self.entries.get(&index).map(|(c, _)| *c)
    }

    /// Label for an index, or "Unknown" — matches what the probe displays.
    pub fn label_at(&self, index: i32) -> &str {
        self.entries
            .get(&index)
            .map(|(_, l)| l.as_str())
            .unwrap_or("Unknown")
    }
}

/// Resolves color tables by id. Passed into the layer per call; the registry
/// owns the tables, the layer never does.
#[derive(Default)]
pub struct ColorTableRegistry {
    tables: HashMap<i32, ColorTable>,
}

impl ColorTableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: i32, table: ColorTable) {
        self.tables.insert(id, table);
    }

    pub fn get(&self, id: i32) -> Option<&ColorTable> {
        self.tables.get(&id)
    }

    pub fn contains(&self, id: i32) -> bool {
        self.tables.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_table_is_recoverable() {
        let registry = ColorTableRegistry::new();
        assert!(registry.get(7).is_none());
    }

    #[test]
    fn lookup_by_id_and_index() {
        let mut table = ColorTable::new("test");
        table.insert(17, [10, 20, 30], "hippocampus");
        let mut registry = ColorTableRegistry::new();
        registry.insert(0, table);

        let t = registry.get(0).unwrap();
        assert_eq!(t.color_at(17), Some([10, 20, 30]));
        assert_eq!(t.label_at(17), "hippocampus");
        assert_eq!(t.color_at(18), None);
        assert_eq!(t.label_at(18), "Unknown");
    }
}
