//! Context values that may still need to be computed.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;

use crate::context::record::Context;

/// A pending context computation
pub type DeferredContext = BoxFuture<'static, anyhow::Result<Context>>;

/// A synchronous context constructor, invoked once during resolution
pub type ContextFactory = Box<dyn FnOnce() -> anyhow::Result<Context> + Send>;

/// A context as handed over by producers: ready, deferred, or produced on demand.
pub enum ResolvableContext {
    Value(Context),
    Deferred(DeferredContext),
    Factory(ContextFactory),
}

impl ResolvableContext {
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<Context>> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }

    pub fn factory<F>(factory: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<Context> + Send + 'static,
    {
        Self::Factory(Box::new(factory))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl From<Context> for ResolvableContext {
    fn from(context: Context) -> Self {
        Self::Value(context)
    }
}

impl fmt::Debug for ResolvableContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(context) => f.debug_tuple("Value").field(context).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}
