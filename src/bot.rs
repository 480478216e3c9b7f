//! Application facade.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::{mpsc, RwLock};

use crate::core::config::BotOptions;
use crate::handlers::factory::FactoryRegistry;
use crate::handlers::event::GatewayEvent;
use crate::handlers::HandlerVariant;
use crate::loader::HandlerLoader;
use crate::platform::api::CommandApi;
use crate::platform::interaction::{Interaction, Responder};
use crate::platform::stream::GatewayEvents;
use crate::registries::commands::CommandRegistry;
use crate::registries::components::ComponentRegistry;
use crate::registries::events::EventRegistry;
use crate::reload::{ReloadCoordinator, ReloadRequest};
use crate::router::InteractionRouter;

#[cfg(feature = "watch")]
type WatcherTable = tokio::sync::Mutex<
    std::collections::HashMap<(std::path::PathBuf, HandlerVariant), notify::RecommendedWatcher>,
>;

struct BotInner<D> {
    options: BotOptions,
    data: Arc<D>,
    loader: HandlerLoader<D>,
    commands: Arc<RwLock<CommandRegistry<D>>>,
    components: Arc<RwLock<ComponentRegistry<D>>>,
    events: Arc<RwLock<EventRegistry<D>>>,
    stream: Arc<GatewayEvents<D>>,
    api: Arc<RwLock<Option<Arc<dyn CommandApi>>>>,
    router: InteractionRouter<D>,
    dispatching: AtomicBool,
    reload_tx: mpsc::UnboundedSender<ReloadRequest>,
    #[cfg(feature = "watch")]
    watchers: WatcherTable,
}

/// The framework facade handed to the bootstrap collaborator.
///
/// Cheap to clone; all clones share one set of registries. The loading
/// entry points are idempotent: each clears and rebuilds its registry.
pub struct Bot<D> {
    inner: Arc<BotInner<D>>,
}

impl<D> Clone for Bot<D> {
    fn clone(&self) -> Self {
        Bot {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Send + Sync + 'static> Bot<D> {
    /// Build the bot and start its reload coordinator. Must be called
    /// from within a runtime.
    pub fn new(options: BotOptions, data: Arc<D>, factories: FactoryRegistry<D>) -> Self {
        if options.home_guild_id.is_none() {
            warn!("no home guild configured; global command permissions cannot be applied");
        }

        let loader = HandlerLoader::new(Arc::new(factories), Arc::clone(&data), options.dev_units);
        let commands = Arc::new(RwLock::new(CommandRegistry::new()));
        let components = Arc::new(RwLock::new(ComponentRegistry::new()));
        let events = Arc::new(RwLock::new(EventRegistry::new()));
        let stream = Arc::new(GatewayEvents::new());
        let api: Arc<RwLock<Option<Arc<dyn CommandApi>>>> = Arc::new(RwLock::new(None));

        let router = InteractionRouter::new(
            Arc::clone(&data),
            options.clone(),
            Arc::clone(&commands),
            Arc::clone(&components),
        );

        let (reload_tx, reload_rx) = mpsc::unbounded_channel();
        ReloadCoordinator {
            loader: loader.clone(),
            options: options.clone(),
            commands: Arc::clone(&commands),
            components: Arc::clone(&components),
            events: Arc::clone(&events),
            stream: Arc::clone(&stream),
            api: Arc::clone(&api),
        }
        .spawn(reload_rx);

        Bot {
            inner: Arc::new(BotInner {
                options,
                data,
                loader,
                commands,
                components,
                events,
                stream,
                api,
                router,
                dispatching: AtomicBool::new(false),
                reload_tx,
                #[cfg(feature = "watch")]
                watchers: tokio::sync::Mutex::new(std::collections::HashMap::new()),
            }),
        }
    }

    /// Load (or reload) the command unit directory. Remote registration is
    /// a separate step, see [`Bot::register`].
    pub async fn load_commands(&self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref();
        let units = self.inner.loader.load_commands(dir);
        self.inner.commands.write().await.populate(units);
        self.arm_watch(dir, HandlerVariant::Command).await;
    }

    /// Load (or reload) the component unit directory.
    pub async fn load_components(&self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref();
        let units = self.inner.loader.load_components(dir);
        self.inner.components.write().await.populate(units);
        self.arm_watch(dir, HandlerVariant::Component).await;
    }

    /// Load (or reload) the event unit directory and (re)subscribe every
    /// handler to the event stream.
    pub async fn load_events(&self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref();
        let units = self.inner.loader.load_events(dir);
        self.inner
            .events
            .write()
            .await
            .populate(units, self.inner.stream.as_ref());
        self.arm_watch(dir, HandlerVariant::Event).await;
    }

    /// Run the remote registration protocol for every loaded command and
    /// keep `api` around for hot-reload patches.
    pub async fn register(&self, api: Arc<dyn CommandApi>) {
        *self.inner.api.write().await = Some(Arc::clone(&api));
        let mut commands = self.inner.commands.write().await;
        commands
            .register(api.as_ref(), self.inner.options.home_guild_id)
            .await;
    }

    /// Arm interaction routing. Idempotent; re-invoking is a no-op.
    pub fn begin_dispatch(&self) {
        if !self.inner.dispatching.swap(true, Ordering::SeqCst) {
            info!("interaction dispatch armed");
        }
    }

    /// Route one classified interaction. Does nothing until
    /// [`Bot::begin_dispatch`] has been called.
    pub async fn dispatch(&self, interaction: &Interaction, responder: &dyn Responder) {
        if !self.inner.dispatching.load(Ordering::SeqCst) {
            return;
        }
        self.inner.router.dispatch(interaction, responder).await;
    }

    /// Deliver one gateway event to its subscribed handler.
    pub async fn dispatch_event(&self, event: &GatewayEvent) {
        self.inner.stream.dispatch(&self.inner.data, event).await;
    }

    /// Shared application state.
    pub fn data(&self) -> &Arc<D> {
        &self.inner.data
    }

    #[cfg(feature = "watch")]
    async fn arm_watch(&self, dir: &Path, variant: HandlerVariant) {
        if !self.inner.options.watch_units {
            return;
        }
        match self
            .inner
            .loader
            .watch(dir, variant, self.inner.reload_tx.clone())
        {
            Ok(watcher) => {
                // Replacing the slot drops any watcher a previous load of
                // the same directory installed.
                self.inner
                    .watchers
                    .lock()
                    .await
                    .insert((dir.to_path_buf(), variant), watcher);
            }
            Err(e) => warn!("could not watch {}: {e}", dir.display()),
        }
    }

    #[cfg(not(feature = "watch"))]
    async fn arm_watch(&self, _dir: &Path, _variant: HandlerVariant) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::component::{ComponentHandler, ComponentKind};
    use crate::handlers::factory::FactoryContext;
    use crate::handlers::Handler;
    use crate::platform::interaction::ComponentInvocation;
    use crate::core::response::ReplyPayload;
    use async_trait::async_trait;
    use std::fs;
    use tempfile::TempDir;

    struct ConfirmButton;

    #[async_trait]
    impl ComponentHandler<()> for ConfirmButton {
        fn custom_id(&self) -> &str {
            "confirm"
        }

        fn kind(&self) -> ComponentKind {
            ComponentKind::Button
        }

        async fn run(
            &self,
            _data: &(),
            _interaction: &ComponentInvocation,
            _responder: &dyn Responder,
        ) -> anyhow::Result<Option<ReplyPayload>> {
            Ok(None)
        }
    }

    fn factories() -> FactoryRegistry<()> {
        let mut factories = FactoryRegistry::new();
        factories.register("confirm", |_ctx: &FactoryContext<'_, ()>| {
            Ok(Handler::Component(Arc::new(ConfirmButton)))
        });
        factories
    }

    fn bot() -> Bot<()> {
        let options = BotOptions {
            watch_units: false,
            ..BotOptions::default()
        };
        Bot::new(options, Arc::new(()), factories())
    }

    #[tokio::test]
    async fn test_load_components_is_idempotent() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("confirm.yaml"), "constructor: confirm\n").unwrap();

        let bot = bot();
        bot.load_components(dir.path()).await;
        bot.load_components(dir.path()).await;

        let components = bot.inner.components.read().await;
        assert_eq!(components.len(), 1);
        assert!(components
            .resolve(ComponentKind::Button, "confirm")
            .is_some());
    }

    #[tokio::test]
    async fn test_dispatch_is_gated_until_armed() {
        let bot = bot();
        assert!(!bot.inner.dispatching.load(Ordering::SeqCst));
        bot.begin_dispatch();
        bot.begin_dispatch();
        assert!(bot.inner.dispatching.load(Ordering::SeqCst));
    }
}
