use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use futures::Future;

use crate::commands::request::SlashRequest;
use crate::commands::CommandResult;
use crate::Context;


/// Non-generic return type for async command functions.
pub type CallFuture = Pin<Box<dyn Future<Output = CommandResult> + Send>>;

/// Trait for functions that can handle a slash command.
pub trait Callable: Send + Sync {
    fn call(&self, ctx: Context, req: SlashRequest) -> CallFuture;
}

impl<F, Fut> Callable for F
where
    F: Fn(Context, SlashRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    fn call(&self, ctx: Context, req: SlashRequest) -> CallFuture {
        Box::pin((self)(ctx, req))
    }
}

/// Shared handler function.
#[derive(Clone)]
pub struct Function(Arc<dyn Callable>);

impl Function {
    pub fn new(callable: impl Callable + 'static) -> Self {
        Self(Arc::new(callable))
    }

    pub fn call(&self, ctx: Context, req: SlashRequest) -> CallFuture {
        self.0.call(ctx, req)
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Function(_)")
    }
}

/// Compiled handlers that definition files refer to by name.
#[derive(Debug, Clone, Default)]
pub struct Handlers(HashMap<&'static str, Function>);

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a function to a handler name.
    pub fn bind(mut self, name: &'static str, callable: impl Callable + 'static) -> Self {
        self.0.insert(name, Function::new(callable));
        self
    }

    pub fn get(&self, name: &str) -> Option<Function> {
        self.0.get(name).cloned()
    }

    /// Handler names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = self.0.keys().copied().collect::<Vec<_>>();
        names.sort_unstable();
        names
    }
}
