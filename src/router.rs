//! Route registration.
//!
//! A [`Router`] is a builder: every call appends layers in order, and
//! [`Router::build`] freezes them into a [`Pipeline`]. Each layer pairs one
//! [`Handler`] with a path matcher:
//!
//! - **exact** layers come from [`Router::get`] and match one GET path;
//! - **prefix** layers come from [`Router::scope`] / [`Router::global`] and
//!   match any method on the prefix or anything below it.
//!
//! Path parameters use `:name` syntax. Each layer compiles its own
//! [`matchit`] tree, so overlapping patterns never conflict; ordering
//! between layers is registration order.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::Handler;
use crate::pipeline::Pipeline;

/// Name of the catch-all segment appended to prefix patterns.
const TAIL: &str = "relay_tail";

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum Mode {
    Exact,
    Prefix,
}

/// A registration waiting for [`Router::build`].
struct Entry {
    method: Option<Method>,
    mode: Mode,
    pattern: String,
    handler: Handler,
}

/// The application router.
///
/// ```rust
/// use relay::{Context, Flow, Outcome, Router, from_fn, middleware};
///
/// fn hello(_: &mut Context) -> Outcome { Ok(Flow::respond("hello")) }
///
/// let pipeline = Router::new()
///     .get("/hello", [from_fn(hello)])
///     .global([middleware::log_errors(), middleware::json_errors()])
///     .global([middleware::not_found("sorry, can't help you")])
///     .build();
/// assert_eq!(pipeline.len(), 4);
/// ```
#[derive(Default)]
pub struct Router {
    entries: Vec<Entry>,
}

impl Router {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Registers a GET route. The handlers run in the given order.
    pub fn get(self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> Self {
        self.add(Some(Method::GET), Mode::Exact, path, handlers)
    }

    /// Registers handlers for every request whose path is `prefix` or lies
    /// below it, whatever the method.
    pub fn scope(self, prefix: &str, handlers: impl IntoIterator<Item = Handler>) -> Self {
        self.add(None, Mode::Prefix, prefix, handlers)
    }

    /// Registers handlers for every request. Same as `scope("/", handlers)`.
    pub fn global(self, handlers: impl IntoIterator<Item = Handler>) -> Self {
        self.scope("/", handlers)
    }

    /// Appends every layer of `router` with `prefix` prepended to its path.
    ///
    /// `router.get("/")` mounted at `/user/:userId` answers `/user/:userId`;
    /// `router.get("/food")` answers `/user/:userId/food`.
    pub fn nest(mut self, prefix: &str, router: Router) -> Self {
        for entry in router.entries {
            self.entries.push(Entry { pattern: join(prefix, &entry.pattern), ..entry });
        }
        self
    }

    fn add(
        mut self,
        method: Option<Method>,
        mode: Mode,
        path: &str,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> Self {
        let pattern = normalize(path);
        for handler in handlers {
            self.entries.push(Entry { method: method.clone(), mode, pattern: pattern.clone(), handler });
        }
        self
    }

    /// Compiles every pattern and freezes the router.
    ///
    /// # Panics
    ///
    /// Panics if a pattern is rejected by the matcher, e.g. a catch-all
    /// segment that is not last. Routes are static configuration.
    pub fn build(self) -> Pipeline {
        let mut compiled: HashMap<(Mode, String), Arc<Matcher>> = HashMap::new();
        let layers = self.entries.into_iter()
            .map(|entry| {
                let matcher = compiled
                    .entry((entry.mode, entry.pattern.clone()))
                    .or_insert_with(|| Arc::new(Matcher::new(entry.mode, &entry.pattern)))
                    .clone();
                Layer { method: entry.method, matcher, handler: entry.handler }
            })
            .collect();
        Pipeline::new(layers)
    }
}

impl From<Router> for Pipeline {
    fn from(router: Router) -> Self {
        router.build()
    }
}

// ── Layer ─────────────────────────────────────────────────────────────────────

/// One compiled step of the pipeline.
pub(crate) struct Layer {
    method: Option<Method>,
    matcher: Arc<Matcher>,
    pub(crate) handler: Handler,
}

impl Layer {
    /// Returns the captured parameters if this layer applies to the request.
    pub(crate) fn matches(&self, method: &Method, path: &str) -> Option<HashMap<String, String>> {
        if self.method.as_ref().is_some_and(|m| m != method) {
            return None;
        }
        self.matcher.at(path)
    }

    pub(crate) fn pattern(&self) -> &str {
        &self.matcher.pattern
    }
}

struct Matcher {
    pattern: String,
    tree: MatchitRouter<()>,
}

impl Matcher {
    fn new(mode: Mode, pattern: &str) -> Self {
        let base = to_matchit(pattern);
        let mut tree = MatchitRouter::new();
        insert(&mut tree, &base, pattern);
        if mode == Mode::Prefix {
            let tail = if base == "/" {
                format!("/{{*{TAIL}}}")
            } else {
                format!("{base}/{{*{TAIL}}}")
            };
            insert(&mut tree, &tail, pattern);
        }
        Self { pattern: pattern.to_owned(), tree }
    }

    fn at(&self, path: &str) -> Option<HashMap<String, String>> {
        let matched = self.tree.at(trim_path(path)).ok()?;
        let params = matched.params.iter()
            .filter(|(k, _)| *k != TAIL)
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some(params)
    }
}

fn insert(tree: &mut MatchitRouter<()>, route: &str, pattern: &str) {
    tree.insert(route, ())
        .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Leading slash, no trailing slash (except the root itself).
fn normalize(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() { "/".to_owned() } else { format!("/{trimmed}") }
}

/// Request paths match with or without a trailing slash.
fn trim_path(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

fn join(prefix: &str, path: &str) -> String {
    match (normalize(prefix).as_str(), normalize(path).as_str()) {
        ("/", path) => path.to_owned(),
        (prefix, "/") => prefix.to_owned(),
        (prefix, path) => format!("{prefix}{path}"),
    }
}

/// Rewrites `:name` segments into matchit's `{name}` syntax.
fn to_matchit(pattern: &str) -> String {
    pattern.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
