use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};
use crate::view::{ResolvedView, ScrollBehavior};

/// Closed set of top-level destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryPageName {
    Home,
    Explore,
    Notifications,
    Me,
    Profile,
    Relay,
    Search,
}

impl PrimaryPageName {
    pub const ALL: [PrimaryPageName; 7] = [
        PrimaryPageName::Home,
        PrimaryPageName::Explore,
        PrimaryPageName::Notifications,
        PrimaryPageName::Me,
        PrimaryPageName::Profile,
        PrimaryPageName::Relay,
        PrimaryPageName::Search,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryPageName::Home => "home",
            PrimaryPageName::Explore => "explore",
            PrimaryPageName::Notifications => "notifications",
            PrimaryPageName::Me => "me",
            PrimaryPageName::Profile => "profile",
            PrimaryPageName::Relay => "relay",
            PrimaryPageName::Search => "search",
        }
    }
}

impl fmt::Display for PrimaryPageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrimaryPageName {
    type Err = NavError;

    fn from_str(value: &str) -> Result<Self> {
        PrimaryPageName::ALL
            .into_iter()
            .find(|name| name.as_str() == value)
            .ok_or_else(|| NavError::UnknownPrimaryPage(value.to_string()))
    }
}

pub type PageProps = serde_json::Value;

/// Factory invoked once per primary page, with the props of the first visit.
pub type PrimaryPageFactory = Arc<dyn Fn(Option<&PageProps>) -> ResolvedView + Send + Sync>;

pub struct PrimaryPageDefinition {
    pub name: PrimaryPageName,
    pub factory: PrimaryPageFactory,
}

impl PrimaryPageDefinition {
    pub fn new<F>(name: PrimaryPageName, factory: F) -> Self
    where
        F: Fn(Option<&PageProps>) -> ResolvedView + Send + Sync + 'static,
    {
        Self {
            name,
            factory: Arc::new(factory),
        }
    }
}

#[derive(Debug)]
pub struct PrimaryPageEntry {
    pub name: PrimaryPageName,
    pub view: ResolvedView,
    pub last_navigation_props: Option<PageProps>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryNavigation {
    /// `name` became current; `created` is true on its first visit.
    Switched { created: bool },
    /// `name` was already current and was scrolled to the top instead.
    ScrolledToTop,
}

/// One persistent view per primary page, created lazily and never dropped.
pub struct PrimaryPageRegistry {
    factories: HashMap<PrimaryPageName, PrimaryPageFactory>,
    entries: HashMap<PrimaryPageName, PrimaryPageEntry>,
    default_page: PrimaryPageName,
}

impl PrimaryPageRegistry {
    /// Register the page definitions and mount `default_page` immediately.
    pub fn new(
        definitions: impl IntoIterator<Item = PrimaryPageDefinition>,
        default_page: PrimaryPageName,
    ) -> Result<Self> {
        let factories: HashMap<_, _> = definitions
            .into_iter()
            .map(|definition| (definition.name, definition.factory))
            .collect();
        let mut registry = Self {
            factories,
            entries: HashMap::new(),
            default_page,
        };
        registry.mount(default_page, None)?;
        Ok(registry)
    }

    pub fn default_page(&self) -> PrimaryPageName {
        self.default_page
    }

    pub fn entry(&self, name: PrimaryPageName) -> Option<&PrimaryPageEntry> {
        self.entries.get(&name)
    }

    /// True when `name` has a definition, mounted or not.
    pub fn is_defined(&self, name: PrimaryPageName) -> bool {
        self.factories.contains_key(&name)
    }

    pub fn is_mounted(&self, name: PrimaryPageName) -> bool {
        self.entries.contains_key(&name)
    }

    pub fn mounted_count(&self) -> usize {
        self.entries.len()
    }

    /// Make `name` current, reusing its mounted view when it has one.
    pub fn navigate(
        &mut self,
        current: PrimaryPageName,
        name: PrimaryPageName,
        props: Option<PageProps>,
    ) -> Result<PrimaryNavigation> {
        if name == current {
            if let Some(control) = self
                .entries
                .get(&name)
                .and_then(|entry| entry.view.control.as_ref())
            {
                control.scroll_to_top(ScrollBehavior::Smooth);
            }
            return Ok(PrimaryNavigation::ScrolledToTop);
        }

        if let Some(entry) = self.entries.get_mut(&name) {
            if props.is_some() {
                entry.last_navigation_props = props;
            }
            return Ok(PrimaryNavigation::Switched { created: false });
        }

        self.mount(name, props)?;
        Ok(PrimaryNavigation::Switched { created: true })
    }

    fn mount(&mut self, name: PrimaryPageName, props: Option<PageProps>) -> Result<()> {
        let factory = self
            .factories
            .get(&name)
            .ok_or_else(|| NavError::UnknownPrimaryPage(name.to_string()))?;
        let view = factory(props.as_ref());
        self.entries.insert(
            name,
            PrimaryPageEntry {
                name,
                view,
                last_navigation_props: props,
            },
        );
        Ok(())
    }
}
