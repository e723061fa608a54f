//! Per-statement render state.

use std::collections::HashMap;

/// How assignment nodes render.
///
/// Only [`Expr::Assign`](crate::recipe::Expr::Assign) consults this: INSERT
/// renders its write list twice, once as a column list and once as a value
/// list, without rebuilding the assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Regular,
    ColumnOnly,
    ValueOnly,
}

/// Mutable state threaded through a single statement render.
///
/// Holds the monotonically increasing placeholder counter, the tag→index
/// map for reused placeholders, and the write mode. One context serves
/// exactly one render and is discarded afterwards.
#[derive(Debug)]
pub struct RenderContext {
    index: usize,
    tags: HashMap<String, usize>,
    write_mode: WriteMode,
    schema_required: bool,
}

impl RenderContext {
    pub fn new() -> Self {
        Self {
            index: 0,
            tags: HashMap::new(),
            write_mode: WriteMode::Regular,
            schema_required: false,
        }
    }

    /// Next placeholder index, 1-based.
    pub fn next_index(&mut self) -> usize {
        self.index += 1;
        self.index
    }

    /// Index for a tagged placeholder.
    ///
    /// The first occurrence of a tag consumes the next index; repeats reuse
    /// it, so one bound value can appear several times in one statement.
    pub fn tag_index(&mut self, tag: &str) -> usize {
        if let Some(&i) = self.tags.get(tag) {
            return i;
        }
        let i = self.next_index();
        self.tags.insert(tag.to_string(), i);
        i
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Run `f` under a write mode, restoring the previous mode afterwards.
    pub fn with_write_mode<R>(&mut self, mode: WriteMode, f: impl FnOnce(&mut Self) -> R) -> R {
        let prev = self.write_mode;
        self.write_mode = mode;
        let ret = f(self);
        self.write_mode = prev;
        ret
    }

    /// Whether relations render their schema qualifier.
    ///
    /// Off by default: inside a FROM clause the qualification is redundant.
    pub fn schema_required(&self) -> bool {
        self.schema_required
    }

    pub fn set_schema_required(&mut self, required: bool) {
        self.schema_required = required;
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}
