//! The navigation arena and its public entry point

use std::fmt;

use ahash::AHashMap;
use arrow::record_batch::RecordBatch;
use serde_json::Value as Json;
use tracing::debug;

use super::resolve::find_entry;
use crate::cache::QueryCache;
use crate::config::ClientConfig;
use crate::model::{IndexEntry, Table};
use crate::query::Filters;
use crate::transport::{HttpTransport, Transport};
use crate::{PxError, Result};

/// Statistics Finland
const STATFIN_URL: &str = "https://statfin.stat.fi/PXWeb/api/v1";

/// Finnish Tax Administration
const VERO_URL: &str = "https://vero2.stat.fi/PXWeb/api/v1";

/// Base URL of the Statistics Finland API in `lang`
pub fn statfin_url(lang: &str) -> String {
    format!("{STATFIN_URL}/{lang}")
}

/// Base URL of the Tax Administration API in `lang`
pub fn verohallinto_url(lang: &str) -> String {
    format!("{VERO_URL}/{lang}")
}

/// Handle of a node in a [`PxWebApi`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A directory: the API root, a database or a level
#[derive(Debug, Clone)]
pub struct DatabaseNode {
    url: String,
    title: Option<String>,
    /// Fetched on first use, then fixed
    index: Option<Vec<IndexEntry>>,
    /// Entry name → resolved child; never evicted
    children: AHashMap<String, NodeId>,
}

impl DatabaseNode {
    fn new(url: String, title: Option<String>, index: Option<Vec<IndexEntry>>) -> Self {
        Self {
            url,
            title,
            index,
            children: AHashMap::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The directory listing, if it has been fetched
    pub fn loaded_index(&self) -> Option<&[IndexEntry]> {
        self.index.as_deref()
    }
}

impl fmt::Display for DatabaseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "url: {}", self.url)?;
        if let Some(title) = &self.title {
            writeln!(f, "title: {title}")?;
        }
        match self.index.as_deref() {
            None => writeln!(f, "contents: (not loaded)"),
            Some([]) => writeln!(f, "contents: (none)"),
            Some(index) => {
                writeln!(f, "contents:")?;
                let width = index.iter().map(|e| e.name.chars().count()).max().unwrap_or(0);
                for entry in index {
                    let type_id = entry.type_id.as_deref().unwrap_or(" ");
                    writeln!(f, "  {} {:<width$} {}", type_id, entry.name, entry.text)?;
                }
                Ok(())
            }
        }
    }
}

/// Node of the navigation tree
#[derive(Debug, Clone)]
pub enum Node {
    Database(DatabaseNode),
    Table(Table),
}

impl Node {
    pub fn url(&self) -> &str {
        match self {
            Node::Database(db) => db.url(),
            Node::Table(table) => table.url(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Node::Database(db) => db.title(),
            Node::Table(table) => Some(table.title()),
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Node::Table(table) => Some(table),
            Node::Database(_) => None,
        }
    }

    pub fn as_database(&self) -> Option<&DatabaseNode> {
        match self {
            Node::Database(db) => Some(db),
            Node::Table(_) => None,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Node::Table(_))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Database(db) => fmt::Display::fmt(db, f),
            Node::Table(table) => fmt::Display::fmt(table, f),
        }
    }
}

/// Interface to a PxWeb API.
///
/// Owns the transport, the query cache and every node visited so far. Not
/// meant to be shared between threads.
pub struct PxWebApi<T: Transport = HttpTransport> {
    transport: T,
    cache: QueryCache,
    nodes: Vec<Node>,
}

impl PxWebApi<HttpTransport> {
    /// API at `url`, configured from the environment
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_config(url, &ClientConfig::from_env())
    }

    pub fn with_config(url: impl Into<String>, config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_transport(
            url,
            HttpTransport::from_config(config)?,
            QueryCache::from_config(config),
        ))
    }

    /// Statistics Finland; `lang` is one of `fi`, `sv` or `en`
    pub fn statfin(lang: &str) -> Result<Self> {
        Self::new(statfin_url(lang))
    }

    /// Finnish Tax Administration; `lang` is one of `fi`, `sv` or `en`
    pub fn verohallinto(lang: &str) -> Result<Self> {
        Self::new(verohallinto_url(lang))
    }
}

impl<T: Transport> PxWebApi<T> {
    /// API at `url` over an explicit transport and cache. Nothing is fetched
    /// until the first lookup.
    pub fn with_transport(url: impl Into<String>, transport: T, cache: QueryCache) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            cache,
            nodes: vec![Node::Database(DatabaseNode::new(url, None, None))],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// URL of the API root
    pub fn url(&self) -> &str {
        self.nodes[0].url()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Node behind `id`.
    ///
    /// Ids are only handed out by this API, so `id` must come from it.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Directory listing of a database node, fetched on first use
    pub fn index(&mut self, id: NodeId) -> Result<&[IndexEntry]> {
        self.ensure_index(id)?;
        Ok(self.database(id)?.index.as_deref().unwrap_or_default())
    }

    /// Resolve `name` among the children of `id`.
    ///
    /// The first resolution of an entry fetches it; later lookups of the same
    /// entry return the memoized node.
    pub fn get(&mut self, id: NodeId, name: &str) -> Result<NodeId> {
        self.ensure_index(id)?;

        let (entry, url) = {
            let db = self.database(id)?;
            let index = db.index.as_deref().unwrap_or_default();
            let entry = find_entry(index, name, &db.url)?;
            if let Some(&child) = db.children.get(&entry.name) {
                debug!(name, entry = %entry.name, "Memoized lookup");
                return Ok(child);
            }
            (entry.clone(), format!("{}/{}", db.url, entry.name))
        };

        let node = self.fetch_node(url, &entry)?;
        let child = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.database_mut(id)?.children.insert(entry.name, child);
        Ok(child)
    }

    /// Resolve a sequence of names starting from the root
    pub fn resolve(&mut self, path: &[&str]) -> Result<NodeId> {
        let root = self.root();
        path.iter().try_fold(root, |id, name| self.get(id, name))
    }

    /// Every child of `id`, in listing order
    pub fn children(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let names: Vec<String> = self.index(id)?.iter().map(|e| e.name.clone()).collect();
        names.iter().map(|name| self.get(id, name)).collect()
    }

    /// Resolve `path` and require the result to be a table
    pub fn table(&mut self, path: &[&str]) -> Result<&Table> {
        let id = self.resolve(path)?;
        self.node(id)
            .as_table()
            .ok_or_else(|| PxError::not_found("table", &path.join("/"), self.url()))
    }

    /// Query the table at `id`, through the cache when `cache_id` is given
    pub fn query(
        &self,
        id: NodeId,
        filters: &Filters,
        cache_id: Option<&str>,
    ) -> Result<RecordBatch> {
        let node = self.node(id);
        let table = node
            .as_table()
            .ok_or_else(|| PxError::not_found("table", node.url(), self.url()))?;

        match cache_id {
            Some(cache_id) => table.query_cached(&self.transport, filters, &self.cache, cache_id),
            None => table.query(&self.transport, filters),
        }
    }

    fn database(&self, id: NodeId) -> Result<&DatabaseNode> {
        let node = self.node(id);
        node.as_database()
            .ok_or_else(|| PxError::not_found("database", node.url(), self.url()))
    }

    fn database_mut(&mut self, id: NodeId) -> Result<&mut DatabaseNode> {
        match &mut self.nodes[id.0] {
            Node::Database(db) => Ok(db),
            Node::Table(table) => Err(PxError::NotFound {
                kind: "database",
                name: table.url().to_string(),
                scope: String::new(),
            }),
        }
    }

    fn ensure_index(&mut self, id: NodeId) -> Result<()> {
        if self.database(id)?.index.is_some() {
            return Ok(());
        }

        let url = self.database(id)?.url.clone();
        debug!(url = %url, "Fetching index");
        let index = IndexEntry::parse_listing(&self.transport.get(&url)?)?;
        self.database_mut(id)?.index = Some(index);
        Ok(())
    }

    /// A listing becomes a database node, anything else must be a table
    fn fetch_node(&self, url: String, entry: &IndexEntry) -> Result<Node> {
        debug!(url = %url, "Fetching node");
        let j = self.transport.get(&url)?;
        match &j {
            Json::Array(_) => {
                let index = IndexEntry::parse_listing(&j)?;
                Ok(Node::Database(DatabaseNode::new(url, Some(entry.text.clone()), Some(index))))
            }
            Json::Object(_) => Ok(Node::Table(Table::from_json(url, &j)?)),
            _ => Err(PxError::malformed(format!("{url} is neither a listing nor a table"))),
        }
    }
}
