//! Named middleware for identification and manipulation.

use std::fmt;
use std::sync::Arc;

use super::Middleware;
use crate::operation::Operation;

/// Named middleware wrapper that associates a name with a middleware instance.
///
/// This allows middleware to be identified, queried, removed, or replaced by
/// name within a [`MiddlewareStack`].
pub struct NamedMiddleware<Op: Operation> {
    /// Unique name for this middleware
    pub name: String,
    /// The actual middleware implementation
    pub middleware: Arc<dyn Middleware<Op>>,
}

impl<Op: Operation> NamedMiddleware<Op> {
    pub fn new(name: impl Into<String>, middleware: Arc<dyn Middleware<Op>>) -> Self {
        Self {
            name: name.into(),
            middleware,
        }
    }
}

impl<Op: Operation> Clone for NamedMiddleware<Op> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            middleware: self.middleware.clone(),
        }
    }
}

impl<Op: Operation> fmt::Debug for NamedMiddleware<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedMiddleware")
            .field("name", &self.name)
            .field("middleware", &"<dyn Middleware>")
            .finish()
    }
}

/// Ordered middleware list; the first entry is the outermost layer.
///
/// The stack is frozen once an orchestrator is built from it.
pub struct MiddlewareStack<Op: Operation> {
    entries: Vec<NamedMiddleware<Op>>,
}

impl<Op: Operation> Default for MiddlewareStack<Op> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<Op: Operation> Clone for MiddlewareStack<Op> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<Op: Operation> fmt::Debug for MiddlewareStack<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl<Op: Operation> MiddlewareStack<Op> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add as the innermost layer.
    pub fn push(&mut self, named: NamedMiddleware<Op>) {
        self.entries.push(named);
    }

    pub fn with(
        mut self,
        name: impl Into<String>,
        middleware: impl Middleware<Op> + 'static,
    ) -> Self {
        self.push(NamedMiddleware::new(name, Arc::new(middleware)));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|m| m.name == name)
    }

    /// Remove by name; returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|m| m.name != name);
        self.entries.len() != before
    }

    /// Swap the implementation of a named entry in place, keeping its position.
    pub fn replace(&mut self, name: &str, middleware: Arc<dyn Middleware<Op>>) -> bool {
        match self.entries.iter_mut().find(|m| m.name == name) {
            Some(entry) => {
                entry.middleware = middleware;
                true
            }
            None => false,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<NamedMiddleware<Op>> {
        self.entries
    }
}
