use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{CommandError, QueryError};
use crate::plugins::{BlockPlugin, FontSizePlugin, InsertPlugin, ListPlugin, MarksPlugin};
use crate::region::EditableRegion;

pub type CommandHandler =
    Arc<dyn Fn(&mut EditableRegion, Option<&str>) -> Result<(), CommandError> + Send + Sync>;

pub type QueryHandler = Arc<dyn Fn(&EditableRegion) -> Result<Value, QueryError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut EditableRegion, Option<&str>) -> Result<(), CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&EditableRegion) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

pub trait BackendPlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

/// Commands and queries keyed by case-insensitive command name.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl PluginRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn BackendPlugin>>) -> Result<Self, String> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin.as_ref())?;
        }
        Ok(registry)
    }

    pub fn markup() -> Self {
        let plugins: Vec<Box<dyn BackendPlugin>> = vec![
            Box::new(MarksPlugin),
            Box::new(FontSizePlugin),
            Box::new(BlockPlugin),
            Box::new(ListPlugin),
            Box::new(InsertPlugin),
        ];
        Self::new(plugins).expect("markup registry must be valid")
    }

    pub fn register_plugin(&mut self, plugin: &dyn BackendPlugin) -> Result<(), String> {
        for cmd in plugin.commands() {
            let key = cmd.id.to_ascii_lowercase();
            if self.commands.contains_key(&key) {
                return Err(format!("Duplicate command id: {}", cmd.id));
            }
            self.commands.insert(key, cmd);
        }
        for query in plugin.queries() {
            let key = query.id.to_ascii_lowercase();
            if self.queries.contains_key(&key) {
                return Err(format!("Duplicate query id: {}", query.id));
            }
            self.queries.insert(key, query);
        }
        Ok(())
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(&id.to_ascii_lowercase()).cloned()
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(&id.to_ascii_lowercase()).cloned()
    }

    pub fn command_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.commands.values().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

/// Applies and queries formatting by command name.
pub trait FormattingBackend {
    fn apply(
        &mut self,
        region: &mut EditableRegion,
        command: &str,
        value: Option<&str>,
    ) -> Result<(), CommandError>;

    fn query_state(&self, region: &EditableRegion, command: &str) -> Result<bool, QueryError>;

    fn query_value(
        &self,
        region: &EditableRegion,
        command: &str,
    ) -> Result<Option<String>, QueryError>;
}

/// Formatting implemented as explicit edits of the region's tree.
#[derive(Clone)]
pub struct MarkupBackend {
    registry: PluginRegistry,
}

impl Default for MarkupBackend {
    fn default() -> Self {
        Self::new(PluginRegistry::markup())
    }
}

impl MarkupBackend {
    pub fn new(registry: PluginRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    fn run_query(&self, region: &EditableRegion, command: &str) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(command) else {
            return Err(QueryError::new(format!("Unknown query: {command}")));
        };
        (query.handler)(region)
    }
}

impl FormattingBackend for MarkupBackend {
    fn apply(
        &mut self,
        region: &mut EditableRegion,
        command: &str,
        value: Option<&str>,
    ) -> Result<(), CommandError> {
        let Some(spec) = self.registry.command(command) else {
            return Err(CommandError::new(format!("Unknown command: {command}")));
        };
        if !region.is_editable() {
            return Err(CommandError::new("Editable region is read-only"));
        }
        (spec.handler)(region, value)
    }

    fn query_state(&self, region: &EditableRegion, command: &str) -> Result<bool, QueryError> {
        match self.run_query(region, command)? {
            Value::Bool(state) => Ok(state),
            other => Err(QueryError::new(format!(
                "Query {command} has no boolean state (got {other})"
            ))),
        }
    }

    fn query_value(
        &self,
        region: &EditableRegion,
        command: &str,
    ) -> Result<Option<String>, QueryError> {
        match self.run_query(region, command)? {
            Value::Null => Ok(None),
            Value::String(value) => Ok(Some(value)),
            Value::Bool(state) => Ok(Some(state.to_string())),
            other => Ok(Some(other.to_string())),
        }
    }
}
