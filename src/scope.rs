//! Scope Cursor
//!
//! Tracks the site/web/list/items position the fluent chain currently addresses.

use crate::client::{ItemsHandle, ListHandle, SiteHandle, WebHandle};
use crate::error::OperationError;
use serde::{Deserialize, Serialize};

/// Containment depth, ordered site < web < list < item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScopeLevel {
    Site,
    Web,
    List,
    Item,
}

/// Current position of an operation chain.
///
/// A deeper reference is only present when every shallower one is: a list
/// implies its web, items imply their list.
#[derive(Debug, Clone)]
pub struct ScopeCursor {
    level: ScopeLevel,
    site: SiteHandle,
    web: Option<WebHandle>,
    list: Option<ListHandle>,
    items: Option<ItemsHandle>,
}

impl ScopeCursor {
    pub fn new(site: SiteHandle) -> Self {
        Self {
            level: ScopeLevel::Site,
            site,
            web: None,
            list: None,
            items: None,
        }
    }

    pub fn level(&self) -> ScopeLevel {
        self.level
    }

    pub fn site(&self) -> &SiteHandle {
        &self.site
    }

    pub fn web(&self) -> Option<WebHandle> {
        self.web
    }

    pub fn list(&self) -> Option<ListHandle> {
        self.list
    }

    pub fn items(&self) -> Option<ItemsHandle> {
        self.items
    }

    /// Select a web, dropping any list or items below the previous one.
    pub fn enter_web(&mut self, web: WebHandle) {
        self.level = ScopeLevel::Web;
        self.web = Some(web);
        self.list = None;
        self.items = None;
    }

    pub fn enter_list(&mut self, list: ListHandle) {
        self.level = ScopeLevel::List;
        self.web = Some(list.web);
        self.list = Some(list);
        self.items = None;
    }

    pub fn enter_items(&mut self, items: ItemsHandle) {
        self.enter_list(items.list);
        self.level = ScopeLevel::Item;
        self.items = Some(items);
    }

    /// Fail with a precondition error when the cursor is shallower than `required`.
    pub fn require(
        &self,
        operation: &'static str,
        required: ScopeLevel,
    ) -> Result<(), OperationError> {
        if self.level < required {
            return Err(OperationError::Precondition {
                operation,
                required,
                current: self.level,
            });
        }
        Ok(())
    }

    pub fn require_web(&self, operation: &'static str) -> Result<WebHandle, OperationError> {
        self.require(operation, ScopeLevel::Web)?;
        self.web.ok_or(OperationError::Precondition {
            operation,
            required: ScopeLevel::Web,
            current: self.level,
        })
    }

    pub fn require_list(&self, operation: &'static str) -> Result<ListHandle, OperationError> {
        self.require(operation, ScopeLevel::List)?;
        self.list.ok_or(OperationError::Precondition {
            operation,
            required: ScopeLevel::List,
            current: self.level,
        })
    }
}
