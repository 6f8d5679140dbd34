//! Notifications about the lifecycle of a context.

use crate::{BeanIdentifier, BeanType, ContextId};
use tracing::{debug, info};

/// Something that happened in a context.
#[derive(Clone, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum ContextEvent {
    /// The context finished starting.
    Startup {
        /// The context that started.
        context: ContextId,
    },
    /// The context finished stopping.
    Shutdown {
        /// The context that stopped.
        context: ContextId,
    },
    /// A shared bean was created and registered.
    BeanCreated {
        /// The type of the bean.
        bean_type: BeanType,
        /// The name of the registration.
        identifier: BeanIdentifier,
    },
    /// A shared bean was destroyed.
    BeanDestroyed {
        /// The type of the bean.
        bean_type: BeanType,
        /// The name of the registration.
        identifier: BeanIdentifier,
    },
}

/// Receives the events of a context. Publishing never fails and never
/// blocks the context for long.
pub trait EventPublisher: Send + Sync {
    /// Handles one event.
    fn publish(&self, event: &ContextEvent);
}

impl<F> EventPublisher for F
where
    F: Fn(&ContextEvent) + Send + Sync,
{
    fn publish(&self, event: &ContextEvent) {
        self(event);
    }
}

/// Writes every event to the log. This is the default publisher.
#[derive(Clone, Copy, Default, Debug)]
pub struct LoggingEventPublisher;

impl EventPublisher for LoggingEventPublisher {
    fn publish(&self, event: &ContextEvent) {
        match event {
            ContextEvent::Startup { context } => info!(%context, "bean context started"),
            ContextEvent::Shutdown { context } => info!(%context, "bean context stopped"),
            ContextEvent::BeanCreated {
                bean_type,
                identifier,
            } => debug!(bean_type = bean_type.name(), bean = %identifier, "bean created"),
            ContextEvent::BeanDestroyed {
                bean_type,
                identifier,
            } => debug!(bean_type = bean_type.name(), bean = %identifier, "bean destroyed"),
        }
    }
}
