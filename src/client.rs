//! Remote Resource Client
//!
//! Contract consumed by the operation builder: resolving webs, lists and item
//! collections by name, eager schema calls, and one batched round trip for
//! queued actions. Handles are opaque references to objects owned by the client.

pub mod memory;

pub use crate::error::ClientError;
pub use memory::{ClientCall, InMemoryClient};

use crate::queue::DeferredAction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field values keyed by internal field name.
pub type FieldValues = BTreeMap<String, serde_json::Value>;

/// Identifier of a remote object, issued by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Root of the resource tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteHandle {
    pub url: String,
}

impl SiteHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebHandle {
    pub id: ObjectId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListHandle {
    pub id: ObjectId,
    pub web: WebHandle,
}

/// A filtered item collection under a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemsHandle {
    pub id: ObjectId,
    pub list: ListHandle,
}

/// Target of a deferred action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectRef {
    Web(WebHandle),
    List(ListHandle),
    Items(ItemsHandle),
}

impl ObjectRef {
    pub fn id(&self) -> ObjectId {
        match self {
            ObjectRef::Web(web) => web.id,
            ObjectRef::List(list) => list.id,
            ObjectRef::Items(items) => items.id,
        }
    }
}

impl From<WebHandle> for ObjectRef {
    fn from(web: WebHandle) -> Self {
        ObjectRef::Web(web)
    }
}

impl From<ListHandle> for ObjectRef {
    fn from(list: ListHandle) -> Self {
        ObjectRef::List(list)
    }
}

impl From<ItemsHandle> for ObjectRef {
    fn from(items: ItemsHandle) -> Self {
        ObjectRef::Items(items)
    }
}

/// Query selecting a subset of a list's items.
///
/// The text of `Query` is passed to the client unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterExpression {
    #[default]
    AllItems,
    Query(String),
}

impl FilterExpression {
    pub fn query(text: impl Into<String>) -> Self {
        FilterExpression::Query(text.into())
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpression::AllItems => write!(f, "<all items>"),
            FilterExpression::Query(text) => write!(f, "{}", text),
        }
    }
}

/// Column type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Note,
    Number,
    Integer,
    Boolean,
    DateTime,
    Choice,
    Currency,
    Url,
    User,
    Lookup,
}

impl FieldType {
    /// Type name as the remote schema spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "Text",
            FieldType::Note => "Note",
            FieldType::Number => "Number",
            FieldType::Integer => "Integer",
            FieldType::Boolean => "Boolean",
            FieldType::DateTime => "DateTime",
            FieldType::Choice => "Choice",
            FieldType::Currency => "Currency",
            FieldType::Url => "URL",
            FieldType::User => "User",
            FieldType::Lookup => "Lookup",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of a column to add to a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub internal_name: String,
    pub display_name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub unique_values: bool,
}

impl FieldSpec {
    /// Build a spec; an empty or missing display name falls back to the internal name.
    pub fn new(
        internal_name: &str,
        field_type: FieldType,
        display_name: Option<&str>,
        required: bool,
        unique_values: bool,
    ) -> Self {
        let display_name = match display_name {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => internal_name.to_string(),
        };
        Self {
            internal_name: internal_name.to_string(),
            display_name,
            field_type,
            required,
            unique_values,
        }
    }

    /// Render the `<Field/>` definition element used by the remote schema.
    pub fn to_schema_xml(&self) -> String {
        format!(
            "<Field Type=\"{}\" Name=\"{}\" StaticName=\"{}\" DisplayName=\"{}\" Required=\"{}\" EnforceUniqueValues=\"{}\" />",
            self.field_type.as_str(),
            escape_attr(&self.internal_name),
            escape_attr(&self.internal_name),
            escape_attr(&self.display_name),
            xml_bool(self.required),
            xml_bool(self.unique_values),
        )
    }
}

fn xml_bool(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Partial update of an existing column. Unset members leave the remote property untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPatch {
    pub field_type: Option<FieldType>,
    pub display_name: Option<String>,
    pub required: Option<bool>,
    pub unique_values: Option<bool>,
}

/// One property assignment carried by a [`FieldPatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange<'a> {
    Type(FieldType),
    DisplayName(&'a str),
    Required(bool),
    UniqueValues(bool),
}

impl FieldPatch {
    pub fn is_empty(&self) -> bool {
        self.changes().is_empty()
    }

    /// The present members, in a fixed order. An empty display name counts as absent.
    pub fn changes(&self) -> Vec<FieldChange<'_>> {
        let mut changes = Vec::new();
        if let Some(t) = self.field_type {
            changes.push(FieldChange::Type(t));
        }
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.is_empty()) {
            changes.push(FieldChange::DisplayName(name));
        }
        if let Some(r) = self.required {
            changes.push(FieldChange::Required(r));
        }
        if let Some(u) = self.unique_values {
            changes.push(FieldChange::UniqueValues(u));
        }
        changes
    }

    /// Apply every present member to `spec`.
    pub fn apply_to(&self, spec: &mut FieldSpec) {
        for change in self.changes() {
            match change {
                FieldChange::Type(t) => spec.field_type = t,
                FieldChange::DisplayName(name) => spec.display_name = name.to_string(),
                FieldChange::Required(r) => spec.required = r,
                FieldChange::UniqueValues(u) => spec.unique_values = u,
            }
        }
    }
}

/// Options sent along with an added field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAddOptions {
    #[serde(default = "default_true")]
    pub internal_name_hint: bool,
    #[serde(default = "default_true")]
    pub add_to_default_view: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FieldAddOptions {
    fn default() -> Self {
        Self {
            internal_name_hint: true,
            add_to_default_view: true,
        }
    }
}

/// Request to create a list from a named template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCreation {
    pub title: String,
    pub template: String,
}

/// What a Load action retrieves.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadSelection {
    #[default]
    Full,
    Fields(Vec<String>),
}

impl LoadSelection {
    pub fn includes(&self, property: &str) -> bool {
        match self {
            LoadSelection::Full => true,
            LoadSelection::Fields(fields) => fields.iter().any(|f| f == property),
        }
    }
}

/// A materialized list item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: u64,
    pub values: FieldValues,
}

impl ListItem {
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.values.get(field)
    }
}

/// Items returned by a loaded item collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemCollection {
    pub items: Vec<ListItem>,
}

impl ItemCollection {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ListItem> {
        self.items.iter()
    }
}

/// Data retrieved for a loaded object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RemoteObject {
    Properties(FieldValues),
    Items(ItemCollection),
}

impl RemoteObject {
    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        match self {
            RemoteObject::Properties(props) => props.get(name),
            RemoteObject::Items(_) => None,
        }
    }

    pub fn as_items(&self) -> Option<&ItemCollection> {
        match self {
            RemoteObject::Items(items) => Some(items),
            RemoteObject::Properties(_) => None,
        }
    }
}

/// Per-action result reported by a successful batch, aligned with the submitted actions.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Loaded(RemoteObject),
    Deleted,
    Updated,
    Created,
}

/// Remote Resource Client interface
///
/// Name resolution and schema calls take effect immediately. Only
/// [`RemoteClient::execute_batch`] sends queued work, and it must apply either
/// every action or none of them.
pub trait RemoteClient {
    fn root_web(&mut self, site: &SiteHandle) -> Result<WebHandle, ClientError>;

    fn subweb(&mut self, parent: &WebHandle, relative_url: &str)
        -> Result<WebHandle, ClientError>;

    /// Resolve a list under `web` by its title.
    fn list_by_title(&mut self, web: &WebHandle, title: &str) -> Result<ListHandle, ClientError>;

    /// Register a list creation request and issue the handle it will live under.
    /// The list comes into existence when the matching Create action is executed.
    fn create_list(
        &mut self,
        web: &WebHandle,
        creation: &ListCreation,
    ) -> Result<ListHandle, ClientError>;

    fn items_by_filter(
        &mut self,
        list: &ListHandle,
        filter: &FilterExpression,
    ) -> Result<ItemsHandle, ClientError>;

    fn add_field(
        &mut self,
        list: &ListHandle,
        spec: &FieldSpec,
        options: FieldAddOptions,
    ) -> Result<(), ClientError>;

    /// Update a field found by internal name or title.
    fn update_field(
        &mut self,
        list: &ListHandle,
        name: &str,
        patch: &FieldPatch,
    ) -> Result<(), ClientError>;

    fn delete_field(&mut self, list: &ListHandle, name: &str) -> Result<(), ClientError>;

    /// Send every action in one round trip. On success the outcomes are
    /// returned in the order of `actions`.
    fn execute_batch(&mut self, actions: &[DeferredAction])
        -> Result<Vec<ActionOutcome>, ClientError>;
}
