// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline testing.
//!
//! `TestHarness` assembles the complete stack: a command registry with the
//! built-in commands, a context manager with the built-in handlers, an
//! in-memory user store, and a [`MockDelivery`]. [`TestHarness::send`] drives
//! one message through the pipeline.

use std::sync::Arc;

use parley_commands::{
    builtin_capabilities, register_builtins, CapabilityMap, CommandDefinition, CommandHandler,
    CommandRegistry,
};
use parley_config::model::ParleyConfig;
use parley_context::{register_builtin_handlers, ContextManager};
use parley_core::{InboundMessage, ParleyError, User, UserStore};
use parley_pipeline::{
    normalize_address, ContextDetectionHandler, ContextService, InMemoryUserStore,
    MessageHandler, MessagePipeline, PipelineOutcome,
};

use crate::mock_delivery::MockDelivery;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: ParleyConfig,
    store: Option<Arc<dyn UserStore>>,
    context_service: Option<Arc<dyn ContextService>>,
    context_handlers: bool,
    capabilities: CapabilityMap,
    commands: Vec<CommandDefinition>,
    handlers: Vec<Arc<dyn MessageHandler>>,
    delivery: Option<Arc<MockDelivery>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = ParleyConfig::default();
        config.pipeline.typing_delay_ms = 0;
        Self {
            config,
            store: None,
            context_service: None,
            context_handlers: true,
            capabilities: CapabilityMap::new(),
            commands: Vec::new(),
            handlers: Vec::new(),
            delivery: None,
        }
    }

    /// Adjust the configuration before the stack is built.
    pub fn with_config(mut self, edit: impl FnOnce(&mut ParleyConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Use this store instead of a fresh in-memory one.
    pub fn with_store(mut self, store: Arc<dyn UserStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Put this service in front of the pipeline instead of the context manager.
    pub fn with_context_service(mut self, service: Arc<dyn ContextService>) -> Self {
        self.context_service = Some(service);
        self
    }

    /// Skip the built-in context handlers and context detection.
    pub fn without_context_handlers(mut self) -> Self {
        self.context_handlers = false;
        self
    }

    /// Register an extra command backed by `handler`.
    pub fn with_command(
        mut self,
        definition: CommandDefinition,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        self.capabilities
            .insert(definition.handler_ref.clone(), handler);
        self.commands.push(definition);
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn with_delivery(mut self, delivery: Arc<MockDelivery>) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub fn build(self) -> Result<TestHarness, ParleyError> {
        let mut capabilities = builtin_capabilities();
        capabilities.extend(self.capabilities);
        let commands = Arc::new(CommandRegistry::from_config(
            &self.config.commands,
            Arc::new(capabilities),
        ));
        register_builtins(&commands)?;
        for definition in self.commands {
            commands.register(definition)?;
        }

        let users = Arc::new(InMemoryUserStore::new());
        let store: Arc<dyn UserStore> = match self.store {
            Some(store) => store,
            None => Arc::clone(&users) as Arc<dyn UserStore>,
        };

        let contexts = Arc::new(ContextManager::new(&self.config.context));
        if self.context_handlers {
            register_builtin_handlers(&contexts, Some(Arc::clone(&store)));
        }
        let service: Arc<dyn ContextService> = match self.context_service {
            Some(service) => service,
            None => Arc::clone(&contexts) as Arc<dyn ContextService>,
        };

        let delivery = self.delivery.unwrap_or_default();

        let mut pipeline = MessagePipeline::new(
            &self.config,
            Arc::clone(&commands),
            Arc::clone(&service),
            Arc::clone(&store),
            delivery.clone(),
        );
        if self.context_handlers {
            pipeline.add_handler(Arc::new(ContextDetectionHandler::new(service)));
        }
        for handler in self.handlers {
            pipeline.add_handler(handler);
        }

        Ok(TestHarness {
            pipeline: Arc::new(pipeline),
            commands,
            contexts,
            users,
            store,
            delivery,
            config: self.config,
        })
    }
}

/// A complete pipeline with mock delivery and in-memory storage.
pub struct TestHarness {
    pub pipeline: Arc<MessagePipeline>,
    pub commands: Arc<CommandRegistry>,
    /// The context manager. Bypassed when a custom context service was given.
    pub contexts: Arc<ContextManager>,
    /// The default in-memory store. Unused when a custom store was given.
    pub users: Arc<InMemoryUserStore>,
    /// The store the pipeline resolves users against.
    pub store: Arc<dyn UserStore>,
    pub delivery: Arc<MockDelivery>,
    pub config: ParleyConfig,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with the default configuration and every built-in.
    pub fn new() -> Result<Self, ParleyError> {
        Self::builder().build()
    }

    /// Send a text message from `from` through the pipeline.
    pub async fn send(&self, from: &str, text: &str) -> PipelineOutcome {
        self.pipeline
            .process_message(&InboundMessage::text(from, text))
            .await
    }

    /// The stored user behind `address`, if any.
    pub async fn user(&self, address: &str) -> Result<Option<User>, ParleyError> {
        self.store
            .get_by_external_id(&normalize_address(address))
            .await
    }
}
