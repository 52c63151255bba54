//! Menu resource: the node graph and its templates.
//!
//! A resource binds node symbols to templates, entry handlers, input
//! options and flag-conditional forwards. Templates defined in code are
//! the fallback; the RESOURCE store can override any of them per language
//! (`<sym>` or `<sym>_<lang>` as the key).

use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::store::Db;
use crate::types::Result;

/// Where an input option leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Replace the active node; the return path is unchanged.
    Goto(String),
    /// Enter a submenu; Back returns here.
    Push(String),
    /// Pop back to the previous node.
    Back,
}

/// One selectable input on a node.
#[derive(Debug, Clone)]
pub struct MenuOption {
    /// Exact input this option matches; None matches any input.
    pub select: Option<String>,
    pub target: Target,
}

/// Flag-conditional redirect evaluated after a node's handlers run.
#[derive(Debug, Clone)]
pub struct Forward {
    pub flag: u32,
    pub when: bool,
    pub target: String,
}

#[derive(Debug, Clone)]
pub struct MenuNode {
    pub sym: String,
    pub template: String,
    /// Entry handlers, run in order with the input that led here.
    pub handlers: Vec<String>,
    pub options: Vec<MenuOption>,
    pub forwards: Vec<Forward>,
    /// Terminal nodes end the session after rendering.
    pub terminal: bool,
}

impl MenuNode {
    pub fn new(sym: &str, template: &str) -> Self {
        Self {
            sym: sym.to_string(),
            template: template.to_string(),
            handlers: Vec::new(),
            options: Vec::new(),
            forwards: Vec::new(),
            terminal: false,
        }
    }

    pub fn handler(mut self, name: &str) -> Self {
        self.handlers.push(name.to_string());
        self
    }

    pub fn option(mut self, select: &str, sym: &str) -> Self {
        self.options.push(MenuOption {
            select: Some(select.to_string()),
            target: Target::Goto(sym.to_string()),
        });
        self
    }

    pub fn option_push(mut self, select: &str, sym: &str) -> Self {
        self.options.push(MenuOption {
            select: Some(select.to_string()),
            target: Target::Push(sym.to_string()),
        });
        self
    }

    pub fn option_back(mut self, select: &str) -> Self {
        self.options.push(MenuOption {
            select: Some(select.to_string()),
            target: Target::Back,
        });
        self
    }

    /// Catch-all: any input moves on. Evaluated after the exact options.
    pub fn option_any(mut self, sym: &str) -> Self {
        self.options.push(MenuOption {
            select: None,
            target: Target::Goto(sym.to_string()),
        });
        self
    }

    pub fn forward(mut self, flag: u32, when: bool, sym: &str) -> Self {
        self.forwards.push(Forward {
            flag,
            when,
            target: sym.to_string(),
        });
        self
    }

    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }
}

/// Read-only bundle of menu nodes plus the template-override store.
pub struct Resource {
    nodes: HashMap<String, MenuNode>,
    overrides: Option<Arc<dyn Db>>,
}

impl Resource {
    pub fn new(nodes: Vec<MenuNode>) -> Self {
        let nodes = nodes.into_iter().map(|n| (n.sym.clone(), n)).collect();
        Self {
            nodes,
            overrides: None,
        }
    }

    /// Attach the RESOURCE store for template overrides.
    pub fn with_overrides(mut self, store: Arc<dyn Db>) -> Self {
        self.overrides = Some(store);
        self
    }

    pub fn node(&self, sym: &str) -> Option<&MenuNode> {
        self.nodes.get(sym)
    }

    /// Template for a node, preferring a store override in the session
    /// language, then an unqualified override, then the built-in text.
    pub async fn template_for(&self, sym: &str, language: Option<&str>) -> Result<String> {
        let builtin = self
            .nodes
            .get(sym)
            .map(|n| n.template.clone())
            .unwrap_or_default();
        let Some(store) = &self.overrides else {
            return Ok(builtin);
        };

        if let Some(lang) = language {
            let key = format!("{sym}_{lang}");
            match store.get(key.as_bytes()).await {
                Ok(Some(raw)) => return Ok(String::from_utf8_lossy(&raw).into_owned()),
                Ok(None) => {}
                Err(e) => warn!(%sym, %lang, error = %e, "template override read failed"),
            }
        }
        match store.get(sym.as_bytes()).await {
            Ok(Some(raw)) => Ok(String::from_utf8_lossy(&raw).into_owned()),
            Ok(None) => Ok(builtin),
            Err(e) => {
                warn!(%sym, error = %e, "template override read failed");
                Ok(builtin)
            }
        }
    }

    /// Option matching: exact selections first, then a catch-all.
    pub fn select<'a>(&self, node: &'a MenuNode, input: &str) -> Option<&'a MenuOption> {
        node.options
            .iter()
            .find(|o| o.select.as_deref() == Some(input))
            .or_else(|| node.options.iter().find(|o| o.select.is_none()))
    }
}
