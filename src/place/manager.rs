//! Place manager
//!
//! Composition root of a store. Builds the chain `uris... -> globals: -> program place`,
//! optionally wraps its head in a [`PolicyPlace`], and starts or stops every link.

use crate::config::StoreConfig;
use crate::error::{ConfigError, StoreError};
use crate::place::constant::{self, ConstPlace};
use crate::place::policy_place::PolicyPlace;
use crate::place::progplace::{ProgPlace, RuntimeInfo};
use crate::place::registry::PlaceRegistry;
use crate::place::{chain_locations, ChangeObserver, Context, Filter, Place, Result, Sorter};
use crate::policy::{new_policy, Policy};
use crate::zettel::{Meta, Zettel, Zid};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Manager {
    head: Box<dyn Place>,
    info: Arc<RuntimeInfo>,
}

impl Manager {
    /// Connect `uris` (head first) in front of the built-in and program places.
    pub fn new(
        registry: &PlaceRegistry,
        uris: &[String],
        readonly: bool,
        policy: Option<Arc<dyn Policy>>,
        startup_config: impl Into<String>,
    ) -> Result<Self> {
        let info = Arc::new(RuntimeInfo::new(startup_config));
        let prog: Box<dyn Place> = Box::new(ProgPlace::new(Arc::clone(&info)));
        let mut head: Box<dyn Place> = Box::new(ConstPlace::new(
            &format!("{}:", constant::SCHEME),
            Some(prog),
        ));
        for uri in uris.iter().rev() {
            head = registry.connect(uri, readonly, Some(head))?;
        }
        if let Some(policy) = policy {
            head = Box::new(PolicyPlace::new(head, policy));
        }

        let locations: Vec<String> = chain_locations(head.as_ref())
            .into_iter()
            .filter(|l| !l.is_empty())
            .collect();
        info!(places = ?locations, readonly, "Place chain assembled");
        info.set_locations(locations);
        Ok(Self { head, info })
    }

    /// Build the store described by a configuration, always guarded by its policy.
    pub fn from_config(config: &StoreConfig) -> std::result::Result<Self, StoreError> {
        if let Err(errors) = config.validate() {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ConfigError::Invalid(message).into());
        }
        let policy = new_policy(&config.policy_config()?);
        let manager = Self::new(
            &PlaceRegistry::new(),
            &config.places,
            config.readonly,
            Some(policy),
            config.to_toml()?,
        )?;
        Ok(manager)
    }

    pub fn runtime_info(&self) -> &Arc<RuntimeInfo> {
        &self.info
    }

    /// Locations of all configured and built-in places, head first.
    pub fn locations(&self) -> Vec<String> {
        self.info.locations()
    }

    fn links(&self) -> Vec<&dyn Place> {
        let mut links = Vec::new();
        let mut current = Some(self.head.as_ref());
        while let Some(place) = current {
            links.push(place);
            current = place.next();
        }
        links
    }
}

impl Place for Manager {
    fn next(&self) -> Option<&dyn Place> {
        self.head.next()
    }

    fn location(&self) -> String {
        self.head.location()
    }

    /// Start every link, the terminal place first. Links already started are stopped again
    /// if a later one fails.
    fn start(&self, ctx: &Context) -> Result<()> {
        let links = self.links();
        for (idx, place) in links.iter().enumerate().rev() {
            if let Err(err) = place.start(ctx) {
                warn!(location = %place.location(), error = %err, "Cannot start place");
                for started in &links[idx + 1..] {
                    if let Err(stop_err) = started.stop(ctx) {
                        warn!(location = %started.location(), error = %stop_err, "Cannot stop place");
                    }
                }
                return Err(err);
            }
        }
        info!(count = links.len(), "All places started");
        Ok(())
    }

    /// Stop every link, the head first. Reports the first failure after trying all links.
    fn stop(&self, ctx: &Context) -> Result<()> {
        let mut result = Ok(());
        for place in self.links() {
            if let Err(err) = place.stop(ctx) {
                warn!(location = %place.location(), error = %err, "Cannot stop place");
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        info!("All places stopped");
        result
    }

    fn can_create_zettel(&self, ctx: &Context) -> bool {
        self.head.can_create_zettel(ctx)
    }

    fn create_zettel(&self, ctx: &Context, zettel: Zettel) -> Result<Zid> {
        self.head.create_zettel(ctx, zettel)
    }

    fn get_zettel(&self, ctx: &Context, zid: Zid) -> Result<Zettel> {
        self.head.get_zettel(ctx, zid)
    }

    fn get_meta(&self, ctx: &Context, zid: Zid) -> Result<Meta> {
        self.head.get_meta(ctx, zid)
    }

    fn select_meta(
        &self,
        ctx: &Context,
        filter: Option<&Filter>,
        sorter: Option<&Sorter>,
    ) -> Result<Vec<Meta>> {
        self.head.select_meta(ctx, filter, sorter)
    }

    fn can_update_zettel(&self, ctx: &Context, zettel: &Zettel) -> bool {
        self.head.can_update_zettel(ctx, zettel)
    }

    fn update_zettel(&self, ctx: &Context, zettel: Zettel) -> Result<()> {
        self.head.update_zettel(ctx, zettel)
    }

    fn can_rename_zettel(&self, ctx: &Context, zid: Zid) -> bool {
        self.head.can_rename_zettel(ctx, zid)
    }

    fn rename_zettel(&self, ctx: &Context, cur_zid: Zid, new_zid: Zid) -> Result<()> {
        self.head.rename_zettel(ctx, cur_zid, new_zid)
    }

    fn can_delete_zettel(&self, ctx: &Context, zid: Zid) -> bool {
        self.head.can_delete_zettel(ctx, zid)
    }

    fn delete_zettel(&self, ctx: &Context, zid: Zid) -> Result<()> {
        self.head.delete_zettel(ctx, zid)
    }

    fn register_change_observer(&self, observer: ChangeObserver) {
        self.head.register_change_observer(observer);
    }

    fn reload(&self, ctx: &Context) -> Result<()> {
        self.head.reload(ctx)
    }
}
