//! Property-based tests for context resolution
//!
//! Whatever mix of ready, deferred, and factory entries goes in, the output has
//! the same length and order, and every failed slot holds an error context.

use std::time::Duration;

use anyhow::anyhow;
use proptest::prelude::*;
use waypost::context::{Context, ContextResolver, ResolvableContext};

#[derive(Debug, Clone)]
enum Entry {
    Value,
    DeferredOk,
    DeferredErr,
    FactoryOk,
    FactoryErr,
}

fn entry_strategy() -> impl Strategy<Value = Entry> {
    prop_oneof![
        Just(Entry::Value),
        Just(Entry::DeferredOk),
        Just(Entry::DeferredErr),
        Just(Entry::FactoryOk),
        Just(Entry::FactoryErr),
    ]
}

fn build(index: usize, entry: &Entry) -> ResolvableContext {
    let id = format!("slot-{}", index);
    match entry {
        Entry::Value => Context::new("SectionContext", id).into(),
        Entry::DeferredOk => {
            ResolvableContext::deferred(async move { Ok(Context::new("SectionContext", id)) })
        }
        Entry::DeferredErr => {
            ResolvableContext::deferred(async move { Err(anyhow!("deferred {} failed", id)) })
        }
        Entry::FactoryOk => ResolvableContext::factory(move || Ok(Context::new("SectionContext", id))),
        Entry::FactoryErr => ResolvableContext::factory(move || Err(anyhow!("factory {} failed", id))),
    }
}

fn is_failure(entry: &Entry) -> bool {
    matches!(entry, Entry::DeferredErr | Entry::FactoryErr)
}

proptest! {
    #[test]
    fn test_resolution_preserves_shape(entries in prop::collection::vec(entry_strategy(), 0..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let resolver = ContextResolver::new(Duration::from_millis(500));
        let input: Vec<ResolvableContext> =
            entries.iter().enumerate().map(|(i, e)| build(i, e)).collect();

        let output = runtime.block_on(resolver.resolve(input));

        prop_assert_eq!(output.len(), entries.len());
        for (index, (entry, context)) in entries.iter().zip(&output).enumerate() {
            if is_failure(entry) {
                prop_assert!(context.is_error());
                let message = context.error_message().unwrap_or_default();
                let slot = format!("slot-{}", index);
                prop_assert!(message.contains(&slot), "message {:?} lacks {}", message, slot);
            } else {
                prop_assert_eq!(context.type_name(), "SectionContext");
                prop_assert_eq!(context.id(), format!("slot-{}", index));
            }
        }
    }
}
