//! Menu engine.
//!
//! A small state-machine interpreter over a [`Resource`] node graph with
//! the classic four-primitive surface: construct, `exec` one input,
//! `flush` the rendered output, `finish` to persist. The request pipeline
//! depends only on this surface.
//!
//! Handler names on a node are resolved through [`HandlerDispatch`]; a
//! handler's result is a set of flags to raise, flags to lower and content
//! bytes. After handlers run, flag-conditional forwards may redirect to
//! another node; the engine then renders the active node's template,
//! substituting `{content}` and any `{placeholder}` values the dispatcher
//! resolves from user data.

pub mod persist;
pub mod resource;
pub mod state;

use async_trait::async_trait;
use std::io::Write;
use std::sync::{Arc, LazyLock};
use tracing::{debug, trace};

use regex::Regex;

use crate::types::{MlangoError, Result};

pub use persist::Persister;
pub use resource::{MenuNode, MenuOption, Resource, Target};
pub use state::{FlagSet, PersistedState, APP_FLAG_BASE, DEFAULT_FLAG_COUNT, FLAG_LANG};

/// Upper bound on flag-forward hops in one exec; beyond this the node
/// graph is cyclic.
const MAX_FORWARD_HOPS: usize = 8;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root node symbol.
    pub root: String,
    pub session_id: String,
    /// Output byte budget per response.
    pub output_size: usize,
    /// Width of the flag bitfield.
    pub flag_count: usize,
    pub default_language: Option<String>,
    pub debug: bool,
}

impl EngineConfig {
    pub fn new(session_id: &str) -> Self {
        Self {
            root: "root".to_string(),
            session_id: session_id.to_string(),
            output_size: 160,
            flag_count: DEFAULT_FLAG_COUNT,
            default_language: None,
            debug: false,
        }
    }
}

/// Snapshot handed to a handler.
pub struct HandlerContext {
    pub session_id: String,
    pub flags: FlagSet,
    pub language: Option<String>,
}

/// What a handler returns.
#[derive(Debug, Default, Clone)]
pub struct HandlerResult {
    pub flag_set: Vec<u32>,
    pub flag_reset: Vec<u32>,
    pub content: String,
}

impl HandlerResult {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn set(mut self, flag: u32) -> Self {
        self.flag_set.push(flag);
        self
    }

    pub fn reset(mut self, flag: u32) -> Self {
        self.flag_reset.push(flag);
        self
    }
}

/// Named-handler dispatch plus template value resolution.
#[async_trait]
pub trait HandlerDispatch: Send + Sync {
    async fn dispatch(
        &self,
        name: &str,
        ctx: &HandlerContext,
        input: &str,
    ) -> Result<HandlerResult>;

    /// Value for a template placeholder, from user data.
    async fn resolve(&self, placeholder: &str, session_id: &str) -> Result<Option<String>>;
}

pub struct Engine {
    config: EngineConfig,
    resource: Arc<Resource>,
    handlers: Arc<dyn HandlerDispatch>,
    persister: Persister,
    state: Option<PersistedState>,
    output: String,
    active: bool,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        resource: Arc<Resource>,
        handlers: Arc<dyn HandlerDispatch>,
        persister: Persister,
    ) -> Self {
        Self {
            config,
            resource,
            handlers,
            persister,
            state: None,
            output: String::new(),
            active: true,
        }
    }

    /// Run one input against the session. Empty input renders the current
    /// node; a fresh session starts at the root. Returns whether the
    /// session continues.
    pub async fn exec(&mut self, input: &str) -> Result<bool> {
        if self.state.is_none() {
            let loaded = self.persister.load(&self.config.session_id).await?;
            self.state = Some(loaded.unwrap_or_else(|| {
                let mut fresh =
                    PersistedState::new(&self.config.root, self.config.flag_count);
                fresh.language = self.config.default_language.clone();
                fresh
            }));
        }
        let input = input.trim();

        // Move along the selected option, if the input selects one.
        let mut handler_input = input;
        if !input.is_empty() {
            let state = self.state.as_mut().unwrap();
            state.record_input(input);
            let current = state.current().to_string();
            let node = self
                .resource
                .node(&current)
                .ok_or_else(|| MlangoError::EngineExec(format!("unknown node: {current}")))?;
            match self.resource.select(node, input).map(|o| o.target.clone()) {
                Some(Target::Goto(sym)) => state.goto(&sym),
                Some(Target::Push(sym)) => state.push(&sym),
                Some(Target::Back) => state.back(),
                None => {
                    // Not a valid choice; re-render the node.
                    handler_input = "";
                }
            }
        }

        // Entry handlers, then flag forwards, until the node settles.
        let mut content = String::new();
        let mut hops = 0;
        loop {
            let current = self.state.as_ref().unwrap().current().to_string();
            let node = self
                .resource
                .node(&current)
                .ok_or_else(|| MlangoError::EngineExec(format!("unknown node: {current}")))?
                .clone();
            if self.config.debug {
                debug!(session = %self.config.session_id, node = %current, "engine at node");
            }

            for name in &node.handlers {
                let state = self.state.as_ref().unwrap();
                let ctx = HandlerContext {
                    session_id: self.config.session_id.clone(),
                    flags: state.flags.clone(),
                    language: state.language.clone(),
                };
                let result = self.handlers.dispatch(name, &ctx, handler_input).await?;
                trace!(handler = %name, set = ?result.flag_set, reset = ?result.flag_reset, "handler result");

                let state = self.state.as_mut().unwrap();
                for flag in &result.flag_set {
                    state.flags.set(*flag);
                }
                for flag in &result.flag_reset {
                    state.flags.reset(*flag);
                }
                // The language flag is a pulse: adopt the content and lower
                // it again so the next raise is observed too.
                if state.flags.get(FLAG_LANG) && !result.content.is_empty() {
                    state.language = Some(result.content.clone());
                    state.flags.reset(FLAG_LANG);
                }
                if !result.content.is_empty() {
                    content = result.content;
                }
            }

            let state = self.state.as_mut().unwrap();
            let forwarded = node
                .forwards
                .iter()
                .find(|f| state.flags.get(f.flag) == f.when)
                .map(|f| f.target.clone());
            match forwarded {
                Some(target) => {
                    state.goto(&target);
                    handler_input = "";
                    hops += 1;
                    if hops > MAX_FORWARD_HOPS {
                        return Err(MlangoError::EngineExec(format!(
                            "forward cycle at node {target}"
                        )));
                    }
                }
                None => break,
            }
        }

        // Render the settled node.
        let state = self.state.as_ref().unwrap();
        let current = state.current().to_string();
        let language = state.language.clone();
        let node = self
            .resource
            .node(&current)
            .ok_or_else(|| MlangoError::EngineExec(format!("unknown node: {current}")))?
            .clone();
        let template = self.resource.template_for(&current, language.as_deref()).await?;
        self.output = self.render(&template, &content).await?;

        self.active = !node.terminal;
        if node.terminal {
            // Next dial starts over at the root with flags intact.
            let state = self.state.as_mut().unwrap();
            state.stack = vec![self.config.root.clone()];
        }
        Ok(self.active)
    }

    async fn render(&self, template: &str, content: &str) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(template) {
            let whole = caps.get(0).unwrap();
            let name = &caps[1];
            out.push_str(&template[last..whole.start()]);
            if name == "content" {
                out.push_str(content);
            } else if let Some(value) = self
                .handlers
                .resolve(name, &self.config.session_id)
                .await?
            {
                out.push_str(&value);
            }
            last = whole.end();
        }
        out.push_str(&template[last..]);
        Ok(out)
    }

    /// Write the rendered output, bounded to the configured byte budget on
    /// a character boundary. Returns the bytes written.
    pub fn flush(&mut self, writer: &mut dyn Write) -> Result<usize> {
        let mut end = self.output.len().min(self.config.output_size);
        while end > 0 && !self.output.is_char_boundary(end) {
            end -= 1;
        }
        let bytes = &self.output.as_bytes()[..end];
        writer.write_all(bytes)?;
        Ok(bytes.len())
    }

    /// Persist session state. Called exactly once, after output.
    pub async fn finish(&mut self) -> Result<()> {
        if let Some(state) = &self.state {
            self.persister.save(&self.config.session_id, state).await?;
        }
        Ok(())
    }

    /// Whether the last exec left the session open.
    pub fn continues(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem::MemDb;

    struct RecordingDispatch;

    #[async_trait]
    impl HandlerDispatch for RecordingDispatch {
        async fn dispatch(
            &self,
            name: &str,
            _ctx: &HandlerContext,
            input: &str,
        ) -> Result<HandlerResult> {
            match name {
                "greet" => Ok(HandlerResult::content(format!("hello {input}"))),
                "set_lang" => Ok(HandlerResult::content("swa").set(FLAG_LANG)),
                "raise_nine" => Ok(HandlerResult::default().set(9)),
                _ => Err(MlangoError::EngineExec(format!("unknown handler {name}"))),
            }
        }

        async fn resolve(&self, placeholder: &str, _session_id: &str) -> Result<Option<String>> {
            Ok(match placeholder {
                "name" => Some("Amina".to_string()),
                _ => None,
            })
        }
    }

    fn test_resource() -> Arc<Resource> {
        Arc::new(Resource::new(vec![
            MenuNode::new("root", "start\n1:Go\n2:Quit")
                .option("1", "hello")
                .option("2", "bye"),
            MenuNode::new("hello", "{content} / {name}")
                .handler("greet")
                .option_back("0"),
            MenuNode::new("bye", "goodbye").terminal(),
            MenuNode::new("lang", "language set").handler("set_lang"),
            MenuNode::new("fwd", "never rendered")
                .handler("raise_nine")
                .forward(9, true, "bye"),
        ]))
    }

    fn engine_for(session: &str) -> Engine {
        let mut config = EngineConfig::new(session);
        config.flag_count = 16;
        Engine::new(
            config,
            test_resource(),
            Arc::new(RecordingDispatch),
            Persister::new(Arc::new(MemDb::new())),
        )
    }

    fn flushed(engine: &mut Engine) -> String {
        let mut buf = Vec::new();
        engine.flush(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_fresh_session_renders_root() {
        let mut engine = engine_for("s1");
        assert!(engine.exec("").await.unwrap());
        assert_eq!(flushed(&mut engine), "start\n1:Go\n2:Quit");
    }

    #[tokio::test]
    async fn test_option_moves_and_handler_runs() {
        let mut engine = engine_for("s1");
        engine.exec("").await.unwrap();
        assert!(engine.exec("1").await.unwrap());
        assert_eq!(flushed(&mut engine), "hello 1 / Amina");
    }

    #[tokio::test]
    async fn test_terminal_ends_session_and_resets_stack() {
        let mut engine = engine_for("s1");
        engine.exec("").await.unwrap();
        assert!(!engine.exec("2").await.unwrap());
        assert_eq!(flushed(&mut engine), "goodbye");
        assert!(!engine.continues());
        assert_eq!(engine.state.as_ref().unwrap().current(), "root");
    }

    #[tokio::test]
    async fn test_invalid_choice_rerenders() {
        let mut engine = engine_for("s1");
        engine.exec("").await.unwrap();
        assert!(engine.exec("7").await.unwrap());
        assert_eq!(flushed(&mut engine), "start\n1:Go\n2:Quit");
    }

    #[tokio::test]
    async fn test_output_truncates_on_char_boundary() {
        let mut engine = engine_for("s1");
        engine.config.output_size = 7;
        engine.exec("").await.unwrap();
        let out = flushed(&mut engine);
        assert!(out.len() <= 7);
        assert_eq!(out, "start\n1");
    }

    #[tokio::test]
    async fn test_state_persists_across_engines() {
        let store: Arc<dyn crate::store::Db> = Arc::new(MemDb::new());
        let persister = Persister::new(Arc::clone(&store));
        let mut config = EngineConfig::new("s1");
        config.flag_count = 16;

        let mut engine = Engine::new(
            config.clone(),
            test_resource(),
            Arc::new(RecordingDispatch),
            persister.clone(),
        );
        engine.exec("").await.unwrap();
        engine.exec("1").await.unwrap();
        engine.finish().await.unwrap();

        let mut resumed = Engine::new(
            config,
            test_resource(),
            Arc::new(RecordingDispatch),
            persister,
        );
        resumed.exec("0").await.unwrap();
        let mut buf = Vec::new();
        resumed.flush(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "start\n1:Go\n2:Quit");
    }

    #[tokio::test]
    async fn test_language_adopted_from_lang_flag() {
        let mut engine = engine_for("s1");
        engine.state = Some({
            let mut s = PersistedState::new("lang", 16);
            s.language = None;
            s
        });
        engine.exec("").await.unwrap();
        assert_eq!(
            engine.state.as_ref().unwrap().language.as_deref(),
            Some("swa")
        );
    }

    #[tokio::test]
    async fn test_flag_forward_redirects() {
        let mut engine = engine_for("s1");
        engine.state = Some(PersistedState::new("fwd", 16));
        let continues = engine.exec("").await.unwrap();
        assert!(!continues);
        assert_eq!(flushed(&mut engine), "goodbye");
    }
}
