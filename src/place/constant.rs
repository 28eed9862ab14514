//! Built-in zettel (`globals:`)
//!
//! A read-only place with the zettel every store needs: the runtime configuration, the
//! base CSS and the home zettel. Any of them can be shadowed by storing a zettel with the
//! same identifier in a place earlier in the chain.

use crate::error::PlaceError;
use crate::place::filter::create_filter_func;
use crate::place::{
    next_delete_zettel, next_get_meta, next_get_zettel, next_reload, next_rename_zettel,
    select_chain, ChangeObserver, Context, Filter, Lifecycle, Place, Result, Sorter,
};
use crate::zettel::id::{BASE_CSS_ZID, CONFIGURATION_ZID, DEFAULT_HOME_ZID};
use crate::zettel::keys::{
    KEY_NO_INDEX, KEY_ROLE, KEY_SYNTAX, KEY_TITLE, KEY_VISIBILITY, ROLE_CONFIGURATION,
    ROLE_ZETTEL, SYNTAX_CSS, SYNTAX_NONE, SYNTAX_ZMK, VALUE_TRUE,
};
use crate::zettel::{Meta, Zettel, Zid};
use std::collections::BTreeMap;
use tracing::info;
use url::Url;

pub const SCHEME: &str = "globals";

const BASE_CSS: &str = "\
html {
  font-family: sans-serif;
  line-height: 1.4;
}
body {
  margin: 0 auto;
  max-width: 50rem;
  padding: 0 1rem;
}
h1, h2, h3 { font-weight: normal; }
a { text-decoration: none; }
a:hover { text-decoration: underline; }
pre, code { font-family: monospace; }
";

const HOME_CONTENT: &str = "\
=== Thank you for using Zettelstore!

You will find the latest information about Zettelstore at [[https://zettelstore.de]].

This zettel is your home zettel. Update it, or shadow it with a zettel of your own, to
change what you see first.
";

struct Builtin {
    zid: Zid,
    pairs: &'static [(&'static str, &'static str)],
    content: &'static str,
}

const BUILTINS: &[Builtin] = &[
    Builtin {
        zid: CONFIGURATION_ZID,
        pairs: &[
            (KEY_TITLE, "Zettelstore Runtime Configuration"),
            (KEY_ROLE, ROLE_CONFIGURATION),
            (KEY_SYNTAX, SYNTAX_NONE),
            (KEY_NO_INDEX, VALUE_TRUE),
            (KEY_VISIBILITY, "owner"),
        ],
        content: "",
    },
    Builtin {
        zid: BASE_CSS_ZID,
        pairs: &[
            (KEY_TITLE, "Zettelstore Base CSS"),
            (KEY_ROLE, ROLE_CONFIGURATION),
            (KEY_SYNTAX, SYNTAX_CSS),
            (KEY_NO_INDEX, VALUE_TRUE),
            (KEY_VISIBILITY, "public"),
        ],
        content: BASE_CSS,
    },
    Builtin {
        zid: DEFAULT_HOME_ZID,
        pairs: &[
            (KEY_TITLE, "Home"),
            (KEY_ROLE, ROLE_ZETTEL),
            (KEY_SYNTAX, SYNTAX_ZMK),
            (KEY_VISIBILITY, "public"),
        ],
        content: HOME_CONTENT,
    },
];

pub struct ConstPlace {
    location: String,
    next: Option<Box<dyn Place>>,
    zettel: BTreeMap<Zid, Zettel>,
    lifecycle: Lifecycle,
}

/// Factory for the place registry.
pub fn connect(url: &Url, next: Option<Box<dyn Place>>) -> Result<Box<dyn Place>> {
    Ok(Box::new(ConstPlace::new(url.as_str(), next)))
}

impl ConstPlace {
    pub fn new(location: &str, next: Option<Box<dyn Place>>) -> Self {
        let zettel = BUILTINS
            .iter()
            .map(|b| {
                let mut builder = Meta::builder(b.zid);
                for (key, value) in b.pairs {
                    builder.set(key, value);
                }
                (b.zid, Zettel::new(builder.build(), b.content))
            })
            .collect();
        Self {
            location: location.to_string(),
            next,
            zettel,
            lifecycle: Lifecycle::new(),
        }
    }

    fn next_ref(&self) -> Option<&dyn Place> {
        self.next.as_deref()
    }

    fn has_local(&self, zid: Zid) -> Result<bool> {
        self.lifecycle.check()?;
        Ok(self.zettel.contains_key(&zid))
    }
}

impl Place for ConstPlace {
    fn next(&self) -> Option<&dyn Place> {
        self.next_ref()
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn start(&self, _ctx: &Context) -> Result<()> {
        self.lifecycle.start()?;
        info!(location = %self.location, count = self.zettel.len(), "Built-in place started");
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

    fn get_zettel(&self, ctx: &Context, zid: Zid) -> Result<Zettel> {
        self.lifecycle.check()?;
        match self.zettel.get(&zid) {
            Some(zettel) => Ok(zettel.clone()),
            None => next_get_zettel(ctx, self.next_ref(), zid),
        }
    }

    fn get_meta(&self, ctx: &Context, zid: Zid) -> Result<Meta> {
        self.lifecycle.check()?;
        match self.zettel.get(&zid) {
            Some(zettel) => Ok(zettel.meta.clone()),
            None => next_get_meta(ctx, self.next_ref(), zid),
        }
    }

    fn select_meta(
        &self,
        ctx: &Context,
        filter: Option<&Filter>,
        sorter: Option<&Sorter>,
    ) -> Result<Vec<Meta>> {
        self.lifecycle.check()?;
        let matches = create_filter_func(filter);
        let local = self
            .zettel
            .values()
            .filter(|z| matches(&z.meta))
            .map(|z| z.meta.clone())
            .collect();
        select_chain(ctx, local, self.next_ref(), filter, sorter)
    }

    fn can_update_zettel(&self, ctx: &Context, zettel: &Zettel) -> bool {
        match self.has_local(zettel.zid()) {
            Ok(false) => self
                .next_ref()
                .is_some_and(|n| n.can_update_zettel(ctx, zettel)),
            _ => false,
        }
    }

    fn update_zettel(&self, ctx: &Context, zettel: Zettel) -> Result<()> {
        let zid = zettel.zid();
        if !zid.is_valid() {
            return Err(PlaceError::InvalidId(zid));
        }
        if self.has_local(zid)? {
            return Err(PlaceError::ReadOnly);
        }
        match self.next_ref() {
            Some(next) => next.update_zettel(ctx, zettel),
            None => Err(PlaceError::ReadOnly),
        }
    }

    fn can_rename_zettel(&self, ctx: &Context, zid: Zid) -> bool {
        match self.has_local(zid) {
            Ok(false) => self.next_ref().is_some_and(|n| n.can_rename_zettel(ctx, zid)),
            _ => false,
        }
    }

    fn rename_zettel(&self, ctx: &Context, cur_zid: Zid, new_zid: Zid) -> Result<()> {
        if self.has_local(cur_zid)? {
            return Err(PlaceError::ReadOnly);
        }
        if self.has_local(new_zid)? {
            return Err(PlaceError::InvalidId(new_zid));
        }
        next_rename_zettel(ctx, self.next_ref(), cur_zid, new_zid)
    }

    fn can_delete_zettel(&self, ctx: &Context, zid: Zid) -> bool {
        match self.has_local(zid) {
            Ok(false) => self.next_ref().is_some_and(|n| n.can_delete_zettel(ctx, zid)),
            _ => false,
        }
    }

    fn delete_zettel(&self, ctx: &Context, zid: Zid) -> Result<()> {
        if self.has_local(zid)? {
            return Err(PlaceError::ReadOnly);
        }
        next_delete_zettel(ctx, self.next_ref(), zid)
    }

    fn register_change_observer(&self, observer: ChangeObserver) {
        // Built-in zettel never change.
        if let Some(next) = self.next_ref() {
            next.register_change_observer(observer);
        }
    }

    fn reload(&self, ctx: &Context) -> Result<()> {
        self.lifecycle.check()?;
        next_reload(ctx, self.next_ref())
    }
}
