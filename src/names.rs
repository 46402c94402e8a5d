use std::collections::HashMap;

/// Read-only id → display-name capability handed to the analyzers.
pub trait NameLookup: Send + Sync {
    fn name_of(&self, player_id: u32) -> Option<String>;

    /// Resolved name, or `"Player {id}"` when the id is unknown.
    fn display_name(&self, player_id: u32) -> String {
        self.name_of(player_id)
            .unwrap_or_else(|| format!("Player {player_id}"))
    }
}

/// Name lookup that knows nobody.
pub struct NoNames;

impl NameLookup for NoNames {
    fn name_of(&self, _player_id: u32) -> Option<String> {
        None
    }
}

/// Directory loaded once at startup and shared read-only behind the app state.
#[derive(Debug, Default)]
pub struct NameDirectory {
    names: HashMap<u32, String>,
}

impl NameDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(names: HashMap<u32, String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NameLookup for NameDirectory {
    fn name_of(&self, player_id: u32) -> Option<String> {
        self.names.get(&player_id).cloned()
    }
}

impl NameLookup for HashMap<u32, String> {
    fn name_of(&self, player_id: u32) -> Option<String> {
        self.get(&player_id).cloned()
    }
}
