//! In-process remote resource tree.
//!
//! Implements [`RemoteClient`] over a site held in memory: a root web with
//! optional subwebs, lists with fields and items. Every call is recorded so
//! callers can observe name resolutions and round trips. Batches are applied
//! against a copy of the tree and committed only if every action succeeds.

use super::{
    ActionOutcome, ClientError, FieldAddOptions, FieldPatch, FieldSpec, FieldValues,
    FilterExpression, ItemCollection, ItemsHandle, ListCreation, ListHandle, ListItem,
    LoadSelection, ObjectId, ObjectRef, RemoteClient, RemoteObject, SiteHandle, WebHandle,
};
use crate::queue::{ActionKind, ActionTag, Creation, DeferredAction};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const BUILTIN_TEMPLATES: &[&str] = &[
    "Custom List",
    "Document Library",
    "Tasks",
    "Announcements",
    "Contacts",
    "Links",
];

/// A call received by the in-memory client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    RootWeb,
    Subweb(String),
    ListByTitle(String),
    CreateList(String),
    ItemsByFilter(FilterExpression),
    AddField(String),
    UpdateField(String),
    DeleteField(String),
    ExecuteBatch(Vec<(ObjectRef, ActionTag)>),
}

impl ClientCall {
    /// Whether this call resolves a name against the remote tree.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            ClientCall::RootWeb | ClientCall::Subweb(_) | ClientCall::ListByTitle(_)
        )
    }
}

#[derive(Debug, Clone)]
struct MemWeb {
    title: String,
    url: String,
}

#[derive(Debug, Clone)]
struct MemList {
    web: ObjectId,
    title: String,
    template: String,
    fields: Vec<FieldSpec>,
    default_view: Vec<String>,
    items: Vec<ListItem>,
    next_item_id: u64,
}

impl MemList {
    fn new(web: ObjectId, title: &str, template: &str) -> Self {
        Self {
            web,
            title: title.to_string(),
            template: template.to_string(),
            fields: Vec::new(),
            default_view: Vec::new(),
            items: Vec::new(),
            next_item_id: 1,
        }
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.internal_name == name)
            .or_else(|| self.fields.iter().position(|f| f.display_name == name))
    }
}

#[derive(Debug, Clone)]
struct MemQuery {
    list: ObjectId,
    filter: FilterExpression,
}

#[derive(Debug, Clone, Default)]
struct MemTree {
    webs: BTreeMap<ObjectId, MemWeb>,
    lists: BTreeMap<ObjectId, MemList>,
    queries: BTreeMap<ObjectId, MemQuery>,
}

#[derive(Debug)]
pub struct InMemoryClient {
    site_url: String,
    root: ObjectId,
    next_id: u64,
    templates: Vec<String>,
    tree: MemTree,
    /// Requested lists that no batch has created yet.
    staged_lists: BTreeMap<ObjectId, MemList>,
    calls: Vec<ClientCall>,
    fail_next_batch: Option<ClientError>,
    short_next_batch: bool,
}

impl InMemoryClient {
    /// A site at `site_url` with an empty root web.
    pub fn new(site_url: &str) -> Self {
        let root = ObjectId(1);
        let mut tree = MemTree::default();
        tree.webs.insert(
            root,
            MemWeb {
                title: "Root".to_string(),
                url: site_url.to_string(),
            },
        );
        Self {
            site_url: site_url.to_string(),
            root,
            next_id: 2,
            templates: BUILTIN_TEMPLATES.iter().map(|t| t.to_string()).collect(),
            tree,
            staged_lists: BTreeMap::new(),
            calls: Vec::new(),
            fail_next_batch: None,
            short_next_batch: false,
        }
    }

    fn issue_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a subweb under the root web.
    pub fn seed_subweb(&mut self, relative_url: &str, title: &str) -> ObjectId {
        let id = self.issue_id();
        let url = format!("{}/{}", self.site_url.trim_end_matches('/'), relative_url);
        self.tree.webs.insert(
            id,
            MemWeb {
                title: title.to_string(),
                url,
            },
        );
        id
    }

    /// Add an existing list to the root web.
    pub fn seed_list(&mut self, title: &str) -> ObjectId {
        let web = self.root;
        self.seed_list_in(web, title)
    }

    pub fn seed_list_in(&mut self, web: ObjectId, title: &str) -> ObjectId {
        let id = self.issue_id();
        self.tree
            .lists
            .insert(id, MemList::new(web, title, "Custom List"));
        id
    }

    /// Add an item to a root-web list, returning its item id.
    pub fn seed_item(&mut self, list_title: &str, values: FieldValues) -> Result<u64, ClientError> {
        let root = self.root;
        let list = self
            .tree
            .lists
            .values_mut()
            .find(|l| l.web == root && l.title == list_title)
            .ok_or_else(|| ClientError::NotFound(list_title.to_string()))?;
        Ok(push_item(list, values))
    }

    pub fn add_template(&mut self, name: &str) {
        self.templates.push(name.to_string());
    }

    /// Make the next `execute_batch` fail with `err` without applying anything.
    pub fn fail_next_batch(&mut self, err: ClientError) {
        self.fail_next_batch = Some(err);
    }

    /// Commit the next batch but drop the last outcome from its reply.
    pub fn short_next_batch(&mut self) {
        self.short_next_batch = true;
    }

    pub fn calls(&self) -> &[ClientCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn resolution_count(&self) -> usize {
        self.calls.iter().filter(|c| c.is_resolution()).count()
    }

    /// Summaries of every batch received, including failed ones.
    pub fn batches(&self) -> Vec<Vec<(ObjectRef, ActionTag)>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ClientCall::ExecuteBatch(summary) => Some(summary.clone()),
                _ => None,
            })
            .collect()
    }

    fn root_list(&self, title: &str) -> Option<&MemList> {
        self.tree
            .lists
            .values()
            .find(|l| l.web == self.root && l.title == title)
    }

    /// Whether a created list with `title` exists in the root web.
    pub fn list_exists(&self, title: &str) -> bool {
        self.root_list(title).is_some()
    }

    /// Item queries still known to the remote tree.
    pub fn open_queries(&self) -> usize {
        self.tree.queries.len()
    }

    pub fn field(&self, list_title: &str, name: &str) -> Option<FieldSpec> {
        let list = self.root_list(list_title)?;
        list.field_index(name).map(|i| list.fields[i].clone())
    }

    pub fn default_view(&self, list_title: &str) -> Vec<String> {
        self.root_list(list_title)
            .map(|l| l.default_view.clone())
            .unwrap_or_default()
    }

    pub fn items(&self, list_title: &str) -> Vec<ListItem> {
        self.root_list(list_title)
            .map(|l| l.items.clone())
            .unwrap_or_default()
    }

    /// A created list, or one still waiting for its creation batch.
    fn list_mut(&mut self, handle: &ListHandle) -> Result<&mut MemList, ClientError> {
        let found = if self.tree.lists.contains_key(&handle.id) {
            self.tree.lists.get_mut(&handle.id)
        } else {
            self.staged_lists.get_mut(&handle.id)
        };
        found.ok_or_else(|| ClientError::InvalidHandle(format!("list {}", handle.id)))
    }
}

fn push_item(list: &mut MemList, values: FieldValues) -> u64 {
    let id = list.next_item_id;
    list.next_item_id += 1;
    list.items.push(ListItem { id, values });
    id
}

/// Supported filter text: `Field=Value`, compared against the item's value.
fn parse_filter(text: &str) -> Result<(&str, &str), ClientError> {
    text.split_once('=')
        .map(|(field, value)| (field.trim(), value.trim()))
        .filter(|(field, _)| !field.is_empty())
        .ok_or_else(|| ClientError::Rejected(format!("unsupported filter: {}", text)))
}

fn item_matches(item: &ListItem, filter: &FilterExpression) -> Result<bool, ClientError> {
    match filter {
        FilterExpression::AllItems => Ok(true),
        FilterExpression::Query(text) => {
            let (field, expected) = parse_filter(text)?;
            let matched = match item.values.get(field) {
                Some(Value::String(s)) => s == expected,
                Some(other) => other.to_string() == expected,
                None => false,
            };
            Ok(matched)
        }
    }
}

fn select(props: FieldValues, selection: &LoadSelection) -> FieldValues {
    props
        .into_iter()
        .filter(|(k, _)| selection.includes(k))
        .collect()
}

impl MemTree {
    fn stored_list(&mut self, id: ObjectId) -> Result<&mut MemList, ClientError> {
        self.lists
            .get_mut(&id)
            .ok_or_else(|| ClientError::NotFound(format!("list {}", id)))
    }

    fn has_title(&self, web: ObjectId, title: &str) -> bool {
        self.lists.values().any(|l| l.web == web && l.title == title)
    }

    fn query_target(&self, items: &ItemsHandle) -> Result<MemQuery, ClientError> {
        self.queries
            .get(&items.id)
            .cloned()
            .ok_or_else(|| ClientError::InvalidHandle(format!("items {}", items.id)))
    }

    fn apply(
        &mut self,
        action: &DeferredAction,
        staged_lists: &BTreeMap<ObjectId, MemList>,
    ) -> Result<ActionOutcome, ClientError> {
        match (&action.kind, action.target) {
            (ActionKind::Load(selection), ObjectRef::Web(web)) => {
                let web = self
                    .webs
                    .get(&web.id)
                    .ok_or_else(|| ClientError::NotFound(format!("web {}", web.id)))?;
                let props = FieldValues::from([
                    ("Title".to_string(), json!(web.title)),
                    ("Url".to_string(), json!(web.url)),
                ]);
                Ok(ActionOutcome::Loaded(RemoteObject::Properties(select(
                    props, selection,
                ))))
            }
            (ActionKind::Load(selection), ObjectRef::List(list)) => {
                let list = self.stored_list(list.id)?;
                let fields: Vec<&str> =
                    list.fields.iter().map(|f| f.internal_name.as_str()).collect();
                let props = FieldValues::from([
                    ("Title".to_string(), json!(list.title)),
                    ("Template".to_string(), json!(list.template)),
                    ("ItemCount".to_string(), json!(list.items.len())),
                    ("Fields".to_string(), json!(fields)),
                ]);
                Ok(ActionOutcome::Loaded(RemoteObject::Properties(select(
                    props, selection,
                ))))
            }
            (ActionKind::Load(selection), ObjectRef::Items(items)) => {
                let query = self.query_target(&items)?;
                let list = self.stored_list(query.list)?;
                let mut loaded = Vec::new();
                for item in &list.items {
                    if item_matches(item, &query.filter)? {
                        loaded.push(ListItem {
                            id: item.id,
                            values: select(item.values.clone(), selection),
                        });
                    }
                }
                Ok(ActionOutcome::Loaded(RemoteObject::Items(ItemCollection {
                    items: loaded,
                })))
            }
            (ActionKind::Delete, ObjectRef::Web(web)) => {
                self.webs
                    .remove(&web.id)
                    .ok_or_else(|| ClientError::NotFound(format!("web {}", web.id)))?;
                self.lists.retain(|_, l| l.web != web.id);
                let lists = &self.lists;
                self.queries.retain(|_, q| lists.contains_key(&q.list));
                Ok(ActionOutcome::Deleted)
            }
            (ActionKind::Delete, ObjectRef::List(list)) => {
                self.stored_list(list.id)?;
                self.lists.remove(&list.id);
                self.queries.retain(|_, q| q.list != list.id);
                Ok(ActionOutcome::Deleted)
            }
            (ActionKind::Delete, ObjectRef::Items(items)) => {
                let query = self.query_target(&items)?;
                let list = self.stored_list(query.list)?;
                let mut kept = Vec::with_capacity(list.items.len());
                for item in list.items.drain(..) {
                    if !item_matches(&item, &query.filter)? {
                        kept.push(item);
                    }
                }
                list.items = kept;
                self.queries.remove(&items.id);
                Ok(ActionOutcome::Deleted)
            }
            (ActionKind::Update(values), ObjectRef::Items(items)) => {
                let query = self.query_target(&items)?;
                let list = self.stored_list(query.list)?;
                for item in list.items.iter_mut() {
                    if item_matches(item, &query.filter)? {
                        item.values
                            .extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                }
                Ok(ActionOutcome::Updated)
            }
            (ActionKind::Create(Creation::List(creation)), ObjectRef::List(list)) => {
                let staged = staged_lists
                    .get(&list.id)
                    .ok_or_else(|| ClientError::InvalidHandle(format!("list {}", list.id)))?;
                if self.lists.contains_key(&list.id) || self.has_title(staged.web, &staged.title) {
                    return Err(ClientError::Rejected(format!(
                        "list {} already exists",
                        creation.title
                    )));
                }
                self.lists.insert(list.id, staged.clone());
                Ok(ActionOutcome::Created)
            }
            (ActionKind::Create(Creation::Item(values)), ObjectRef::List(list)) => {
                let list = self.stored_list(list.id)?;
                push_item(list, values.clone());
                Ok(ActionOutcome::Created)
            }
            (kind, target) => Err(ClientError::Rejected(format!(
                "{:?} is not supported on {:?}",
                kind.tag(),
                target
            ))),
        }
    }
}

impl RemoteClient for InMemoryClient {
    fn root_web(&mut self, site: &SiteHandle) -> Result<WebHandle, ClientError> {
        self.calls.push(ClientCall::RootWeb);
        if site.url != self.site_url {
            return Err(ClientError::NotFound(site.url.clone()));
        }
        Ok(WebHandle { id: self.root })
    }

    fn subweb(
        &mut self,
        parent: &WebHandle,
        relative_url: &str,
    ) -> Result<WebHandle, ClientError> {
        self.calls.push(ClientCall::Subweb(relative_url.to_string()));
        let parent_url = self
            .tree
            .webs
            .get(&parent.id)
            .map(|w| w.url.clone())
            .ok_or_else(|| ClientError::InvalidHandle(format!("web {}", parent.id)))?;
        let url = format!(
            "{}/{}",
            parent_url.trim_end_matches('/'),
            relative_url.trim_matches('/')
        );
        self.tree
            .webs
            .iter()
            .find(|(_, w)| w.url == url)
            .map(|(id, _)| WebHandle { id: *id })
            .ok_or(ClientError::NotFound(relative_url.to_string()))
    }

    fn list_by_title(&mut self, web: &WebHandle, title: &str) -> Result<ListHandle, ClientError> {
        self.calls.push(ClientCall::ListByTitle(title.to_string()));
        self.tree
            .lists
            .iter()
            .find(|(_, l)| l.web == web.id && l.title == title)
            .map(|(id, _)| ListHandle { id: *id, web: *web })
            .ok_or_else(|| ClientError::NotFound(title.to_string()))
    }

    fn create_list(
        &mut self,
        web: &WebHandle,
        creation: &ListCreation,
    ) -> Result<ListHandle, ClientError> {
        self.calls.push(ClientCall::CreateList(creation.title.clone()));
        if !self.templates.iter().any(|t| *t == creation.template) {
            return Err(ClientError::NotFound(creation.template.clone()));
        }
        if self.tree.has_title(web.id, &creation.title) {
            return Err(ClientError::Rejected(format!(
                "list {} already exists",
                creation.title
            )));
        }
        let id = self.issue_id();
        self.staged_lists.insert(
            id,
            MemList::new(web.id, &creation.title, &creation.template),
        );
        Ok(ListHandle { id, web: *web })
    }

    fn items_by_filter(
        &mut self,
        list: &ListHandle,
        filter: &FilterExpression,
    ) -> Result<ItemsHandle, ClientError> {
        self.calls.push(ClientCall::ItemsByFilter(filter.clone()));
        self.list_mut(list)?;
        if let FilterExpression::Query(text) = filter {
            parse_filter(text)?;
        }
        let id = self.issue_id();
        self.tree.queries.insert(
            id,
            MemQuery {
                list: list.id,
                filter: filter.clone(),
            },
        );
        Ok(ItemsHandle { id, list: *list })
    }

    fn add_field(
        &mut self,
        list: &ListHandle,
        spec: &FieldSpec,
        options: FieldAddOptions,
    ) -> Result<(), ClientError> {
        self.calls.push(ClientCall::AddField(spec.internal_name.clone()));
        let list = self.list_mut(list)?;
        let mut spec = spec.clone();
        if !options.internal_name_hint {
            spec.internal_name = spec.display_name.replace(' ', "_x0020_");
        }
        if list.fields.iter().any(|f| f.internal_name == spec.internal_name) {
            return Err(ClientError::Rejected(format!(
                "field {} already exists",
                spec.internal_name
            )));
        }
        debug!(field = %spec.internal_name, schema = %spec.to_schema_xml(), "Field added");
        if options.add_to_default_view {
            list.default_view.push(spec.internal_name.clone());
        }
        list.fields.push(spec);
        Ok(())
    }

    fn update_field(
        &mut self,
        list: &ListHandle,
        name: &str,
        patch: &FieldPatch,
    ) -> Result<(), ClientError> {
        self.calls.push(ClientCall::UpdateField(name.to_string()));
        let list = self.list_mut(list)?;
        let index = list
            .field_index(name)
            .ok_or_else(|| ClientError::NotFound(name.to_string()))?;
        patch.apply_to(&mut list.fields[index]);
        Ok(())
    }

    fn delete_field(&mut self, list: &ListHandle, name: &str) -> Result<(), ClientError> {
        self.calls.push(ClientCall::DeleteField(name.to_string()));
        let list = self.list_mut(list)?;
        let index = list
            .field_index(name)
            .ok_or_else(|| ClientError::NotFound(name.to_string()))?;
        let removed = list.fields.remove(index);
        list.default_view.retain(|f| *f != removed.internal_name);
        Ok(())
    }

    fn execute_batch(
        &mut self,
        actions: &[DeferredAction],
    ) -> Result<Vec<ActionOutcome>, ClientError> {
        self.calls.push(ClientCall::ExecuteBatch(
            actions.iter().map(|a| (a.target, a.tag())).collect(),
        ));
        if let Some(err) = self.fail_next_batch.take() {
            warn!(error = %err, "Injected batch failure");
            return Err(err);
        }

        let mut staged = self.tree.clone();
        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            outcomes.push(staged.apply(action, &self.staged_lists)?);
        }
        self.tree = staged;
        for action in actions {
            if let (ActionKind::Create(Creation::List(_)), ObjectRef::List(list)) =
                (&action.kind, action.target)
            {
                self.staged_lists.remove(&list.id);
            }
        }
        if std::mem::take(&mut self.short_next_batch) {
            outcomes.pop();
        }
        Ok(outcomes)
    }
}
