//! Operation Builder
//!
//! Fluent facade over a [`RemoteClient`]. Each call validates the scope cursor,
//! updates the cursor and resource cache, and queues deferred actions. Column
//! operations and item reads are the exceptions: they reach the client
//! immediately.
//!
//! ```
//! use fluently::client::{FieldType, InMemoryClient};
//! use fluently::operation::Operation;
//!
//! let mut client = InMemoryClient::new("https://contoso.test");
//! client.seed_list("Tasks");
//!
//! let mut op = Operation::new(client, "https://contoso.test");
//! op.load_list("Tasks")?
//!     .add_column("Priority", FieldType::Number)?
//!     .delete_items()?;
//! assert_eq!(op.pending().len(), 2);
//!
//! op.execute()?;
//! assert!(op.pending().is_empty());
//! # Ok::<(), fluently::error::OperationError>(())
//! ```

use crate::cache::ResourceCache;
use crate::client::{
    ClientError, FieldPatch, FieldSpec, FieldType, FieldValues, FilterExpression, ItemCollection,
    ListCreation, ListHandle, LoadSelection, ObjectRef, RemoteClient, RemoteObject, SiteHandle,
    WebHandle,
};
use crate::config::{FluentlyConfig, OperationSettings};
use crate::error::OperationError;
use crate::executor::{DrainReport, Executor, HandleRegistry, HandleState};
use crate::queue::{ActionKind, Creation, DeferredAction, DeferredActionQueue};
use crate::scope::{ScopeCursor, ScopeLevel};
use tracing::debug;

/// A chain of operations against one site.
///
/// Not shareable across threads: the cursor, cache and queue belong to the
/// caller that owns the builder.
#[derive(Debug)]
pub struct Operation<C: RemoteClient> {
    client: C,
    settings: OperationSettings,
    cursor: ScopeCursor,
    cache: ResourceCache,
    queue: DeferredActionQueue,
    handles: HandleRegistry,
}

impl<C: RemoteClient> Operation<C> {
    pub fn new(client: C, site_url: &str) -> Self {
        Self::with_settings(client, site_url, OperationSettings::default())
    }

    pub fn with_settings(client: C, site_url: &str, settings: OperationSettings) -> Self {
        Self {
            client,
            settings,
            cursor: ScopeCursor::new(SiteHandle::new(site_url)),
            cache: ResourceCache::new(),
            queue: DeferredActionQueue::new(),
            handles: HandleRegistry::new(),
        }
    }

    /// Build from a loaded configuration, rejecting invalid settings.
    pub fn from_config(
        client: C,
        site_url: &str,
        config: &FluentlyConfig,
    ) -> Result<Self, OperationError> {
        config
            .operation
            .validate()
            .map_err(OperationError::ConfigError)?;
        Ok(Self::with_settings(
            client,
            site_url,
            config.operation.clone(),
        ))
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    pub fn settings(&self) -> &OperationSettings {
        &self.settings
    }

    pub fn cursor(&self) -> &ScopeCursor {
        &self.cursor
    }

    pub fn level(&self) -> ScopeLevel {
        self.cursor.level()
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Actions queued since the last successful drain.
    pub fn pending(&self) -> &DeferredActionQueue {
        &self.queue
    }

    pub fn state_of(&self, target: impl Into<ObjectRef>) -> Option<&HandleState> {
        self.handles.state(target.into().id())
    }

    fn enqueue(&mut self, action: DeferredAction) {
        self.handles.track(action.target);
        self.queue.push(action);
    }

    /// The selected list, failing below List level or once the list was deleted.
    fn current_list(&self, operation: &'static str) -> Result<ListHandle, OperationError> {
        let list = self.cursor.require_list(operation)?;
        if self.handles.is_deleted(list.id) {
            return Err(ClientError::InvalidHandle(format!("list {} was deleted", list.id)).into());
        }
        Ok(list)
    }

    /// The web addressed by the cursor, resolving the root web when none is selected yet.
    fn decide_web(&mut self) -> Result<WebHandle, OperationError> {
        if let Some(web) = self.cursor.web() {
            return Ok(web);
        }
        let web = self.client.root_web(self.cursor.site())?;
        self.cursor.enter_web(web);
        Ok(web)
    }

    /// Select the site's root web.
    pub fn select_web(&mut self) -> Result<&mut Self, OperationError> {
        let web = self.client.root_web(self.cursor.site())?;
        self.cursor.enter_web(web);
        debug!(level = ?self.cursor.level(), "Root web selected");
        Ok(self)
    }

    /// Select a web below the current one.
    pub fn select_subweb(&mut self, relative_url: &str) -> Result<&mut Self, OperationError> {
        let parent = self.decide_web()?;
        let web = self
            .client
            .subweb(&parent, relative_url)
            .map_err(|e| OperationError::from_lookup(relative_url, e))?;
        self.cursor.enter_web(web);
        debug!(web = relative_url, "Subweb selected");
        Ok(self)
    }

    /// Resolve a list by title, remember it and queue a full load.
    pub fn load_list(&mut self, name: &str) -> Result<&mut Self, OperationError> {
        self.load_list_with(name, |_, _| LoadSelection::Full)
    }

    /// Resolve a list by title, remember it and queue a load of what `loader` selects.
    ///
    /// The loader sees the client and the resolved handle. Exactly one Load is
    /// queued either way.
    pub fn load_list_with<F>(&mut self, name: &str, loader: F) -> Result<&mut Self, OperationError>
    where
        F: FnOnce(&C, &ListHandle) -> LoadSelection,
    {
        let web = self.decide_web()?;
        let list = self
            .client
            .list_by_title(&web, name)
            .map_err(|e| OperationError::from_lookup(name, e))?;
        let selection = loader(&self.client, &list);

        self.cursor.enter_list(list);
        self.cache.remember(name, list);
        self.enqueue(DeferredAction::new(list, ActionKind::Load(selection)));
        debug!(list = name, pending = self.queue.len(), "List load queued");
        Ok(self)
    }

    /// Re-select a list previously loaded or created by this operation.
    ///
    /// Pure cache lookup: nothing is resolved remotely.
    pub fn select_list(&mut self, name: &str) -> Result<&mut Self, OperationError> {
        let list = self.cache.recall(name).ok_or_else(|| OperationError::NotFound {
            name: name.to_string(),
        })?;
        self.cursor.enter_list(list);
        debug!(list = name, "List selected from cache");
        Ok(self)
    }

    /// Create a list from the configured default template.
    pub fn create_list(&mut self, name: &str) -> Result<&mut Self, OperationError> {
        let template = self.settings.default_list_template.clone();
        self.create_list_from_template(name, &template)
    }

    pub fn create_list_from_template(
        &mut self,
        name: &str,
        template: &str,
    ) -> Result<&mut Self, OperationError> {
        let web = self.cursor.require_web("create_list")?;
        let template = if template.is_empty() {
            self.settings.default_list_template.clone()
        } else {
            template.to_string()
        };
        let creation = ListCreation {
            title: name.to_string(),
            template: template.clone(),
        };
        let list = self
            .client
            .create_list(&web, &creation)
            .map_err(|e| OperationError::from_lookup(&creation.template, e))?;

        self.enqueue(DeferredAction::new(
            list,
            ActionKind::Create(Creation::List(creation)),
        ));
        self.enqueue(DeferredAction::load(list));
        self.cursor.enter_list(list);
        self.cache.remember(name, list);
        debug!(
            list = name,
            template = %template,
            pending = self.queue.len(),
            "List creation queued"
        );
        Ok(self)
    }

    /// Queue deletion of a list resolved by title against the current web.
    pub fn delete_list(&mut self, name: &str) -> Result<&mut Self, OperationError> {
        let web = self.cursor.require_web("delete_list")?;
        let list = self
            .client
            .list_by_title(&web, name)
            .map_err(|e| OperationError::from_lookup(name, e))?;
        self.enqueue(DeferredAction::delete(list));
        debug!(list = name, pending = self.queue.len(), "List deletion queued");
        Ok(self)
    }

    /// Add a column to the selected list. Applied immediately, not queued.
    pub fn add_column(
        &mut self,
        name: &str,
        field_type: FieldType,
    ) -> Result<&mut Self, OperationError> {
        self.add_column_spec(FieldSpec::new(name, field_type, None, false, false))
    }

    pub fn add_column_spec(&mut self, spec: FieldSpec) -> Result<&mut Self, OperationError> {
        let list = self.current_list("add_column")?;
        self.client
            .add_field(&list, &spec, self.settings.field_options)?;
        debug!(field = %spec.internal_name, field_type = %spec.field_type, "Column added");
        Ok(self)
    }

    /// Change the present members of `patch` on a column found by internal name
    /// or title. Applied immediately, not queued.
    pub fn change_column(
        &mut self,
        name: &str,
        patch: FieldPatch,
    ) -> Result<&mut Self, OperationError> {
        let list = self.current_list("change_column")?;
        self.client
            .update_field(&list, name, &patch)
            .map_err(|e| OperationError::from_lookup(name, e))?;
        debug!(field = name, changes = patch.changes().len(), "Column changed");
        Ok(self)
    }

    /// Delete a column found by internal name or title. Applied immediately, not queued.
    pub fn delete_column(&mut self, name: &str) -> Result<&mut Self, OperationError> {
        let list = self.current_list("delete_column")?;
        self.client
            .delete_field(&list, name)
            .map_err(|e| OperationError::from_lookup(name, e))?;
        debug!(field = name, "Column deleted");
        Ok(self)
    }

    /// Load every item of the selected list. Drains the queue first.
    pub fn get_items(&mut self) -> Result<ItemCollection, OperationError> {
        self.get_items_matching(FilterExpression::AllItems)
    }

    /// Load the items matching `filter`, executing everything queued before it.
    pub fn get_items_matching(
        &mut self,
        filter: FilterExpression,
    ) -> Result<ItemCollection, OperationError> {
        let list = self.current_list("get_items")?;
        let items = self.client.items_by_filter(&list, &filter)?;
        let previous = self.cursor.clone();
        self.cursor.enter_items(items);
        self.enqueue(DeferredAction::load(items));
        if let Err(err) = self.execute() {
            // A failed remote call leaves the caller's own actions queued.
            if matches!(err, OperationError::BatchExecution { .. }) {
                self.queue.pop_back();
            }
            self.cursor = previous;
            return Err(err);
        }

        match self.handles.state(items.id) {
            Some(HandleState::Loaded(RemoteObject::Items(collection))) => Ok(collection.clone()),
            _ => Err(ClientError::InvalidHandle(format!("items {} were not loaded", items.id)).into()),
        }
    }

    /// Queue deletion of every item of the selected list.
    pub fn delete_items(&mut self) -> Result<&mut Self, OperationError> {
        self.delete_items_matching(FilterExpression::AllItems)
    }

    pub fn delete_items_matching(
        &mut self,
        filter: FilterExpression,
    ) -> Result<&mut Self, OperationError> {
        let list = self.current_list("delete_items")?;
        let items = self.client.items_by_filter(&list, &filter)?;
        self.cursor.enter_items(items);
        self.enqueue(DeferredAction::delete(items));
        debug!(filter = %filter, pending = self.queue.len(), "Item deletion queued");
        Ok(self)
    }

    /// Queue an update of `values` on the items matching `filter`.
    pub fn update_items(
        &mut self,
        filter: FilterExpression,
        values: FieldValues,
    ) -> Result<&mut Self, OperationError> {
        let list = self.current_list("update_items")?;
        let items = self.client.items_by_filter(&list, &filter)?;
        self.cursor.enter_items(items);
        self.enqueue(DeferredAction::new(items, ActionKind::Update(values)));
        debug!(filter = %filter, pending = self.queue.len(), "Item update queued");
        Ok(self)
    }

    /// Queue creation of an item in the selected list.
    pub fn add_item(&mut self, values: FieldValues) -> Result<&mut Self, OperationError> {
        let list = self.current_list("add_item")?;
        self.enqueue(DeferredAction::new(
            list,
            ActionKind::Create(Creation::Item(values)),
        ));
        debug!(pending = self.queue.len(), "Item creation queued");
        Ok(self)
    }

    /// Send every queued action in one batch.
    ///
    /// On success the queue is empty and deleted lists are evicted from the
    /// cache. On failure the queue is left exactly as it was.
    pub fn execute(&mut self) -> Result<DrainReport, OperationError> {
        let report = Executor::drain(&mut self.client, &mut self.queue, &mut self.handles)?;
        for target in &report.deleted {
            if let ObjectRef::List(list) = target {
                let evicted = self.cache.evict_object(list.id);
                if !evicted.is_empty() {
                    debug!(lists = ?evicted, "Deleted lists evicted from cache");
                }
            }
        }
        Ok(report)
    }
}
