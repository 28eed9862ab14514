//! Program-generated introspection zettel
//!
//! The terminal place of every chain. Its zettel describe the running store: version,
//! host, operating system, the place chain, the metadata keys and the startup
//! configuration. They are generated on every access and cannot be modified.

use crate::error::PlaceError;
use crate::place::filter::create_filter_func;
use crate::place::{
    select_chain, ChangeObserver, Context, Filter, Lifecycle, Place, Result, Sorter,
};
use crate::zettel::id::{
    HOST_ZID, METADATA_KEY_ZID, OPERATING_SYSTEM_ZID, PLACE_MANAGER_ZID,
    STARTUP_CONFIGURATION_ZID, VERSION_ZID,
};
use crate::zettel::keys::{
    registered_keys, KEY_NO_INDEX, KEY_READ_ONLY, KEY_ROLE, KEY_SYNTAX, KEY_TITLE,
    KEY_VISIBILITY, ROLE_CONFIGURATION, SYNTAX_TEXT, SYNTAX_ZMK, VALUE_TRUE,
};
use crate::zettel::{Meta, Zettel, Zid};
use parking_lot::RwLock;
use std::fs;
use std::sync::Arc;
use tracing::info;

/// Facts about the running store, shared between the manager and the program place.
#[derive(Debug, Default)]
pub struct RuntimeInfo {
    version: String,
    startup_config: String,
    locations: RwLock<Vec<String>>,
}

impl RuntimeInfo {
    pub fn new(startup_config: impl Into<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            startup_config: startup_config.into(),
            locations: RwLock::new(Vec::new()),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Record the locations of the place chain, head first.
    pub fn set_locations(&self, locations: Vec<String>) {
        *self.locations.write() = locations;
    }

    pub fn locations(&self) -> Vec<String> {
        self.locations.read().clone()
    }
}

struct Generator {
    zid: Zid,
    title: &'static str,
    visibility: &'static str,
    syntax: &'static str,
    content: fn(&RuntimeInfo) -> String,
}

const GENERATORS: &[Generator] = &[
    Generator {
        zid: VERSION_ZID,
        title: "Zettelstore Version",
        visibility: "public",
        syntax: SYNTAX_TEXT,
        content: |info| info.version.clone(),
    },
    Generator {
        zid: HOST_ZID,
        title: "Zettelstore Host",
        visibility: "expert",
        syntax: SYNTAX_TEXT,
        content: |_| hostname(),
    },
    Generator {
        zid: OPERATING_SYSTEM_ZID,
        title: "Zettelstore Operating System",
        visibility: "expert",
        syntax: SYNTAX_TEXT,
        content: |_| format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
    },
    Generator {
        zid: PLACE_MANAGER_ZID,
        title: "Zettelstore Place Manager",
        visibility: "expert",
        syntax: SYNTAX_ZMK,
        content: place_manager_content,
    },
    Generator {
        zid: METADATA_KEY_ZID,
        title: "Zettelstore Supported Metadata Keys",
        visibility: "expert",
        syntax: SYNTAX_ZMK,
        content: |_| metadata_key_content(),
    },
    Generator {
        zid: STARTUP_CONFIGURATION_ZID,
        title: "Zettelstore Startup Configuration",
        visibility: "expert",
        syntax: SYNTAX_TEXT,
        content: |info| info.startup_config.clone(),
    },
];

fn hostname() -> String {
    fs::read_to_string("/etc/hostname")
        .ok()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

fn place_manager_content(info: &RuntimeInfo) -> String {
    let mut out = String::from("|=No|=Location\n");
    for (idx, location) in info.locations().iter().enumerate() {
        out.push_str(&format!("|{}|{}\n", idx + 1, location));
    }
    out
}

fn metadata_key_content() -> String {
    let mut out = String::from("|=Name|=Type\n");
    for (key, kt) in registered_keys() {
        out.push_str(&format!("|{}|{}\n", key, kt.name()));
    }
    out
}

impl Generator {
    fn meta(&self) -> Meta {
        Meta::builder(self.zid)
            .with(KEY_TITLE, self.title)
            .with(KEY_ROLE, ROLE_CONFIGURATION)
            .with(KEY_SYNTAX, self.syntax)
            .with(KEY_NO_INDEX, VALUE_TRUE)
            .with(KEY_READ_ONLY, VALUE_TRUE)
            .with(KEY_VISIBILITY, self.visibility)
            .build()
    }
}

fn find(zid: Zid) -> Option<&'static Generator> {
    GENERATORS.iter().find(|g| g.zid == zid)
}

pub struct ProgPlace {
    info: Arc<RuntimeInfo>,
    lifecycle: Lifecycle,
}

impl ProgPlace {
    pub fn new(info: Arc<RuntimeInfo>) -> Self {
        Self {
            info,
            lifecycle: Lifecycle::new(),
        }
    }

    fn lookup(&self, zid: Zid) -> Result<&'static Generator> {
        self.lifecycle.check()?;
        find(zid).ok_or(PlaceError::UnknownId(zid))
    }
}

impl Place for ProgPlace {
    fn next(&self) -> Option<&dyn Place> {
        None
    }

    fn location(&self) -> String {
        String::new()
    }

    fn start(&self, _ctx: &Context) -> Result<()> {
        self.lifecycle.start()?;
        info!(version = %self.info.version, "Program place started");
        Ok(())
    }

    fn stop(&self, _ctx: &Context) -> Result<()> {
        self.lifecycle.stop();
        Ok(())
    }

    fn can_create_zettel(&self, _ctx: &Context) -> bool {
        false
    }

    fn create_zettel(&self, _ctx: &Context, _zettel: Zettel) -> Result<Zid> {
        Err(PlaceError::ReadOnly)
    }

    fn get_zettel(&self, _ctx: &Context, zid: Zid) -> Result<Zettel> {
        let generator = self.lookup(zid)?;
        Ok(Zettel::new(generator.meta(), (generator.content)(&self.info)))
    }

    fn get_meta(&self, _ctx: &Context, zid: Zid) -> Result<Meta> {
        Ok(self.lookup(zid)?.meta())
    }

    fn select_meta(
        &self,
        ctx: &Context,
        filter: Option<&Filter>,
        sorter: Option<&Sorter>,
    ) -> Result<Vec<Meta>> {
        self.lifecycle.check()?;
        let matches = create_filter_func(filter);
        let local = GENERATORS
            .iter()
            .map(Generator::meta)
            .filter(|m| matches(m))
            .collect();
        select_chain(ctx, local, None, filter, sorter)
    }

    fn can_update_zettel(&self, _ctx: &Context, _zettel: &Zettel) -> bool {
        false
    }

    fn update_zettel(&self, _ctx: &Context, zettel: Zettel) -> Result<()> {
        let zid = zettel.zid();
        if !zid.is_valid() {
            return Err(PlaceError::InvalidId(zid));
        }
        Err(PlaceError::ReadOnly)
    }

    fn can_rename_zettel(&self, _ctx: &Context, _zid: Zid) -> bool {
        false
    }

    fn rename_zettel(&self, _ctx: &Context, cur_zid: Zid, _new_zid: Zid) -> Result<()> {
        self.lookup(cur_zid)?;
        Err(PlaceError::ReadOnly)
    }

    fn can_delete_zettel(&self, _ctx: &Context, _zid: Zid) -> bool {
        false
    }

    fn delete_zettel(&self, _ctx: &Context, zid: Zid) -> Result<()> {
        self.lookup(zid)?;
        Err(PlaceError::ReadOnly)
    }

    fn register_change_observer(&self, _observer: ChangeObserver) {}

    fn reload(&self, _ctx: &Context) -> Result<()> {
        self.lifecycle.check()
    }
}
