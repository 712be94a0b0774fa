//! Context domain: context records, deferred values, and resolution.

pub mod record;
pub mod resolvable;
pub mod resolver;

pub use record::{Context, APPLICATION_CONTEXT_TYPE, ERROR_CONTEXT_TYPE, TIMEOUT_MESSAGE};
pub use resolvable::{ContextFactory, DeferredContext, ResolvableContext};
pub use resolver::{ContextResolver, DEFAULT_PROMISE_TIMEOUT};
