//! In-process [`RemoteStore`] used by tests and dry experiments.
//!
//! Records every call with a timestamp and can be told to fail specific
//! calls, keyed by the title of the page they target.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use docsync_core::PageId;
use docsync_render::{Block, MAX_BLOCKS_PER_REQUEST};

use crate::remote::{ChildKind, ChildRef, RemoteError, RemotePage, RemoteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Retrieve,
    List,
    Create,
    Append,
    Delete,
}

impl CallKind {
    pub fn is_mutation(self) -> bool {
        matches!(self, CallKind::Create | CallKind::Append | CallKind::Delete)
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub kind: CallKind,
    pub target: PageId,
    pub at: Instant,
}

#[derive(Debug, Clone)]
struct Node {
    kind: ChildKind,
    title: Option<String>,
    text: Option<String>,
    children: Vec<PageId>,
}

#[derive(Debug)]
struct Fault {
    kind: CallKind,
    title: String,
    /// Remaining failures; `None` fails forever.
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<PageId, Node>,
    calls: Vec<Call>,
    faults: Vec<Fault>,
    next_id: u64,
}

impl State {
    fn fresh_id(&mut self) -> PageId {
        self.next_id += 1;
        PageId::from(format!("{:032x}", self.next_id))
    }

    fn insert(&mut self, parent: &PageId, node: Node) -> Result<PageId, RemoteError> {
        let id = self.fresh_id();
        self.node_mut(parent)?.children.push(id.clone());
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    /// Insert `block` and the children it carries inline.
    fn insert_block(&mut self, parent: &PageId, block: &Block) -> Result<PageId, RemoteError> {
        let id = self.insert(parent, text_node(block.kind(), &block.plain_text()))?;
        for child in block.split_children().0 {
            self.insert_block(&id, &child)?;
        }
        Ok(id)
    }

    fn node(&self, id: &PageId) -> Result<&Node, RemoteError> {
        self.nodes.get(id).ok_or_else(|| not_found(id))
    }

    fn node_mut(&mut self, id: &PageId) -> Result<&mut Node, RemoteError> {
        self.nodes.get_mut(id).ok_or_else(|| not_found(id))
    }

    /// Log the call, then apply any matching fault.
    fn enter(&mut self, kind: CallKind, target: &PageId) -> Result<(), RemoteError> {
        self.calls.push(Call {
            kind,
            target: target.clone(),
            at: Instant::now(),
        });
        let Some(title) = self.nodes.get(target).and_then(|n| n.title.clone()) else {
            return Ok(());
        };
        let fault = self
            .faults
            .iter_mut()
            .find(|f| f.kind == kind && f.title == title && f.remaining != Some(0));
        match fault {
            Some(fault) => {
                if let Some(n) = fault.remaining.as_mut() {
                    *n -= 1;
                }
                Err(RemoteError::Api {
                    status: 400,
                    message: format!("injected {kind:?} failure on '{title}'"),
                })
            }
            None => Ok(()),
        }
    }
}

fn not_found(id: &PageId) -> RemoteError {
    RemoteError::NotFound {
        resource: format!("block {id}"),
    }
}

pub struct MemoryStore {
    root: PageId,
    state: Mutex<State>,
}

impl MemoryStore {
    /// A store holding one empty root page with the given id.
    pub fn new(root: PageId, title: &str) -> Self {
        let mut state = State::default();
        state.nodes.insert(
            root.clone(),
            Node {
                kind: ChildKind::Page,
                title: Some(title.to_string()),
                text: None,
                children: Vec::new(),
            },
        );
        Self {
            root,
            state: Mutex::new(state),
        }
    }

    pub fn root(&self) -> &PageId {
        &self.root
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a child page under `parent` holding one paragraph per entry of
    /// `texts`. Not logged as a call.
    pub fn seed_page(&self, parent: &PageId, title: &str, texts: &[&str]) -> Result<PageId, RemoteError> {
        let mut state = self.lock();
        let page = state.insert(
            parent,
            Node {
                kind: ChildKind::Page,
                title: Some(title.to_string()),
                text: None,
                children: Vec::new(),
            },
        )?;
        for text in texts {
            state.insert(&page, text_node("paragraph", text))?;
        }
        Ok(page)
    }

    pub fn add_database(&self, parent: &PageId, title: &str) -> Result<PageId, RemoteError> {
        self.lock().insert(
            parent,
            Node {
                kind: ChildKind::Database,
                title: Some(title.to_string()),
                text: None,
                children: Vec::new(),
            },
        )
    }

    /// Titles of the child pages of `parent`, in order.
    pub fn page_titles(&self, parent: &PageId) -> Vec<String> {
        let state = self.lock();
        let Ok(node) = state.node(parent) else {
            return Vec::new();
        };
        node.children
            .iter()
            .filter_map(|id| state.nodes.get(id))
            .filter(|n| n.kind == ChildKind::Page)
            .filter_map(|n| n.title.clone())
            .collect()
    }

    pub fn page_id(&self, parent: &PageId, title: &str) -> Option<PageId> {
        let state = self.lock();
        state.node(parent).ok()?.children.iter().find_map(|id| {
            let node = state.nodes.get(id)?;
            (node.title.as_deref() == Some(title)).then(|| id.clone())
        })
    }

    /// Plain text of every content child of `page`, in order.
    pub fn child_texts(&self, page: &PageId) -> Vec<String> {
        let state = self.lock();
        let Ok(node) = state.node(page) else {
            return Vec::new();
        };
        node.children
            .iter()
            .filter_map(|id| state.nodes.get(id))
            .filter_map(|n| n.text.clone())
            .collect()
    }

    /// Fail every `kind` call targeting the page titled `title`.
    pub fn fail_always(&self, kind: CallKind, title: &str) {
        self.lock().faults.push(Fault {
            kind,
            title: title.to_string(),
            remaining: None,
        });
    }

    /// Fail the next `times` `kind` calls targeting the page titled `title`.
    pub fn fail_times(&self, kind: CallKind, title: &str, times: usize) {
        self.lock().faults.push(Fault {
            kind,
            title: title.to_string(),
            remaining: Some(times),
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.kind.is_mutation()).count()
    }
}

fn text_node(kind: &str, text: &str) -> Node {
    Node {
        kind: ChildKind::Content(kind.to_string()),
        title: None,
        text: Some(text.to_string()),
        children: Vec::new(),
    }
}

impl RemoteStore for MemoryStore {
    fn retrieve_page(&self, id: &PageId) -> Result<RemotePage, RemoteError> {
        let mut state = self.lock();
        state.enter(CallKind::Retrieve, id)?;
        let node = state.node(id)?;
        if node.kind != ChildKind::Page {
            return Err(not_found(id));
        }
        Ok(RemotePage {
            id: id.clone(),
            title: node.title.clone(),
        })
    }

    fn list_children(&self, id: &PageId) -> Result<Vec<ChildRef>, RemoteError> {
        let mut state = self.lock();
        state.enter(CallKind::List, id)?;
        let node = state.node(id)?;
        Ok(node
            .children
            .iter()
            .filter_map(|child| {
                let n = state.nodes.get(child)?;
                Some(ChildRef {
                    id: child.clone(),
                    kind: n.kind.clone(),
                    title: n.title.clone(),
                    plain_text: n.text.clone(),
                })
            })
            .collect())
    }

    fn create_page(&self, parent: &PageId, title: &str) -> Result<RemotePage, RemoteError> {
        let mut state = self.lock();
        state.enter(CallKind::Create, parent)?;
        let id = state.insert(
            parent,
            Node {
                kind: ChildKind::Page,
                title: Some(title.to_string()),
                text: None,
                children: Vec::new(),
            },
        )?;
        Ok(RemotePage {
            id,
            title: Some(title.to_string()),
        })
    }

    fn append_children(&self, id: &PageId, blocks: &[Block]) -> Result<Vec<PageId>, RemoteError> {
        let mut state = self.lock();
        state.enter(CallKind::Append, id)?;
        state.node(id)?;
        if blocks.len() > MAX_BLOCKS_PER_REQUEST {
            return Err(RemoteError::Api {
                status: 400,
                message: format!("{} children exceed the limit of {MAX_BLOCKS_PER_REQUEST}", blocks.len()),
            });
        }
        blocks.iter().map(|block| state.insert_block(id, block)).collect()
    }

    fn delete_block(&self, id: &PageId) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.enter(CallKind::Delete, id)?;
        state.nodes.remove(id).ok_or_else(|| not_found(id))?;
        for node in state.nodes.values_mut() {
            node.children.retain(|child| child != id);
        }
        Ok(())
    }
}
