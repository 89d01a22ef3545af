//! Per-request context shared by every handler of one chain.

use std::collections::HashMap;

use http::Method;
use serde_json::{Map, Value};

use crate::request::Request;

/// State that lives for exactly one request.
///
/// Created when dispatch starts and handed by `&mut` to each handler in
/// turn. Nothing else can reach it, so handlers mutate it freely.
#[derive(Debug)]
pub struct Context {
    request: Request,
    params: HashMap<String, String>,
    locals: Locals,
}

impl Context {
    pub(crate) fn new(request: Request) -> Self {
        Self { request, params: HashMap::new(), locals: Locals::default() }
    }

    pub fn request(&self) -> &Request { &self.request }
    pub fn method(&self) -> &Method { self.request.method() }
    pub fn path(&self) -> &str { self.request.path() }

    /// Returns a named path parameter captured by the layer being run.
    ///
    /// For a layer registered at `/user/:userId`, `ctx.param("userId")` on
    /// `/user/42/food` returns `Some("42")`. The text is raw; checking it is
    /// the handler's job.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn locals(&self) -> &Locals { &self.locals }
    pub fn locals_mut(&mut self) -> &mut Locals { &mut self.locals }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

// ── Locals ────────────────────────────────────────────────────────────────────

/// String-keyed values handlers leave for the handlers after them.
///
/// Values are JSON values, so every entry carries its own type tag. The typed
/// getters return `None` when the key is absent *or* holds another type, so a
/// read site never has to trust what an earlier handler wrote.
///
/// Keys serialise in sorted order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Locals(Map<String, Value>);

impl Locals {
    /// Stores `value` under `key`, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_str()
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key)?.as_i64()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key)?.as_bool()
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn as_map(&self) -> &Map<String, Value> { &self.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_reads_check_the_tag() {
        let mut locals = Locals::default();
        locals.insert("user", "taco");
        locals.insert("count", 3);
        locals.insert("admin", false);

        assert_eq!(locals.get_str("user"), Some("taco"));
        assert_eq!(locals.get_i64("count"), Some(3));
        assert_eq!(locals.get_bool("admin"), Some(false));

        assert_eq!(locals.get_i64("user"), None);
        assert_eq!(locals.get_str("count"), None);
        assert_eq!(locals.get_str("missing"), None);
    }

    #[test]
    fn insert_replaces_and_returns_previous() {
        let mut locals = Locals::default();
        assert_eq!(locals.insert("m1", "first"), None);
        assert_eq!(locals.insert("m1", "second"), Some(Value::from("first")));
        assert_eq!(locals.len(), 1);
        assert_eq!(locals.remove("m1"), Some(Value::from("second")));
        assert!(locals.is_empty());
    }

    #[test]
    fn params_are_replaced_per_layer() {
        let mut ctx = Context::new(Request::get("/user/7"));
        assert_eq!(ctx.param("userId"), None);

        ctx.set_params(HashMap::from([("userId".to_owned(), "7".to_owned())]));
        assert_eq!(ctx.param("userId"), Some("7"));

        ctx.set_params(HashMap::new());
        assert_eq!(ctx.param("userId"), None);
    }
}
