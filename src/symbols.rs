use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::warn;

/// A bidirectional table mapping symbols to integer ids
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// Map from symbol to id
    symbols: HashMap<String, u32>,
    /// Map from id to symbol
    indices: HashMap<u32, String>,
    /// Id handed to the next unseen symbol
    next_index: u32,
}

impl SymbolTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of entries in the table
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if the table contains no entries
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Get or create an id for a symbol
    pub fn get_index(&mut self, symbol: &str) -> u32 {
        if let Some(&id) = self.symbols.get(symbol) {
            return id;
        }
        let id = self.next_index;
        self.insert(symbol, id);
        id
    }

    /// Look up the id of a symbol without assigning one
    pub fn index_of(&self, symbol: &str) -> Option<u32> {
        self.symbols.get(symbol).copied()
    }

    /// Look up the symbol with the given id
    pub fn get_symbol(&self, index: u32) -> Option<&str> {
        self.indices.get(&index).map(String::as_str)
    }

    /// Assign `index` to `symbol`
    ///
    /// If the symbol already has an id, the old mapping is removed in both
    /// directions. If another symbol holds `index`, that symbol loses it.
    pub fn set_index(&mut self, symbol: &str, index: u32) {
        if let Some(old) = self.symbols.remove(symbol) {
            if old != index {
                warn!(
                    symbol,
                    old_index = old,
                    new_index = index,
                    "symbol already has an index; reassigning"
                );
            }
            self.indices.remove(&old);
        }
        if let Some(previous) = self.indices.remove(&index) {
            self.symbols.remove(&previous);
        }
        self.insert(symbol, index);
    }

    fn insert(&mut self, symbol: &str, index: u32) {
        self.symbols.insert(symbol.to_string(), index);
        self.indices.insert(index, symbol.to_string());
        if index >= self.next_index {
            self.next_index = index.saturating_add(1);
        }
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.symbols.clear();
        self.indices.clear();
        self.next_index = 0;
    }

    /// Iterate over all (symbol, id) pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        let mut ids: Vec<u32> = self.indices.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(move |id| self.indices.get(&id).map(|s| (s.as_str(), id)))
    }

    /// Write one `symbol<TAB>id` line per entry
    pub fn output<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for (symbol, id) in self.iter() {
            writeln!(w, "{}\t{}", symbol, id)?;
        }
        w.flush()
    }
}

static GLOBAL_SYMBOLS: OnceLock<Mutex<SymbolTable>> = OnceLock::new();

fn global_table() -> MutexGuard<'static, SymbolTable> {
    GLOBAL_SYMBOLS
        .get_or_init(|| Mutex::new(SymbolTable::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// The symbol table held by a model
///
/// A `Local` table is exclusively owned and dies with its owner. The
/// `Global` variant is a handle onto one process-wide table: every owner of
/// such a handle sees the mutations of every other owner. The process-wide
/// table is created on first use and emptied by [`Symbols::clear_global`].
#[derive(Debug, Clone)]
pub enum Symbols {
    Local(SymbolTable),
    Global,
}

impl Symbols {
    /// A fresh instance-scoped table
    pub fn local() -> Self {
        Symbols::Local(SymbolTable::new())
    }

    /// A handle onto the process-wide table
    pub fn global() -> Self {
        Symbols::Global
    }

    /// Empty the process-wide table, e.g. between independent runs
    pub fn clear_global() {
        global_table().clear();
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Symbols::Global)
    }

    /// Run `f` with mutable access to the underlying table
    pub fn with_table<R, F: FnOnce(&mut SymbolTable) -> R>(&mut self, f: F) -> R {
        match self {
            Symbols::Local(table) => f(table),
            Symbols::Global => f(&mut global_table()),
        }
    }

    /// Run `f` with shared access to the underlying table
    pub fn read_table<R, F: FnOnce(&SymbolTable) -> R>(&self, f: F) -> R {
        match self {
            Symbols::Local(table) => f(table),
            Symbols::Global => f(&global_table()),
        }
    }

    pub fn len(&self) -> usize {
        self.read_table(SymbolTable::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read_table(SymbolTable::is_empty)
    }

    /// Get or create an id for a symbol
    pub fn get_index(&mut self, symbol: &str) -> u32 {
        self.with_table(|t| t.get_index(symbol))
    }

    /// Look up the id of a symbol without assigning one
    pub fn index_of(&self, symbol: &str) -> Option<u32> {
        self.read_table(|t| t.index_of(symbol))
    }

    /// Look up the symbol with the given id
    pub fn get_symbol(&self, index: u32) -> Option<String> {
        self.read_table(|t| t.get_symbol(index).map(str::to_string))
    }

    pub fn set_index(&mut self, symbol: &str, index: u32) {
        self.with_table(|t| t.set_index(symbol, index))
    }

    pub fn clear(&mut self) {
        self.with_table(SymbolTable::clear)
    }

    /// All (symbol, id) pairs in id order
    pub fn entries(&self) -> Vec<(String, u32)> {
        self.read_table(|t| t.iter().map(|(s, id)| (s.to_string(), id)).collect())
    }

    pub fn output<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.read_table(|t| t.output(w))
    }
}

impl Default for Symbols {
    fn default() -> Self {
        Self::local()
    }
}

impl From<SymbolTable> for Symbols {
    fn from(table: SymbolTable) -> Self {
        Symbols::Local(table)
    }
}
