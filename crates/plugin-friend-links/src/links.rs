//! Link model and the configuration it is stored in.

use serde::{Deserialize, Serialize};
use tracing::warn;

use noteblog_extension_sdk::prelude::*;

/// One friendly site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendLink {
    pub id: u64,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub logo: String,
    /// Higher sorts first.
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Fields accepted when creating or editing a link.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkInput {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub sort_order: Option<i32>,
    pub active: Option<bool>,
}

/// Plugin configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FriendLinksConfig {
    pub max_links: usize,
    pub show_in_sidebar: bool,
    pub title: String,
    pub open_new_window: bool,
    pub show_description: bool,
    pub links: Vec<FriendLink>,
}

impl Default for FriendLinksConfig {
    fn default() -> Self {
        Self {
            max_links: 10,
            show_in_sidebar: true,
            title: "Friend Links".to_string(),
            open_new_window: true,
            show_description: false,
            links: Vec::new(),
        }
    }
}

impl FriendLinksConfig {
    /// Defaults plus a few starter links.
    pub fn seeded() -> Self {
        let seed = |id, name: &str, url: &str, description: &str, sort_order| FriendLink {
            id,
            name: name.to_string(),
            url: url.to_string(),
            description: description.to_string(),
            logo: format!("{url}/favicon.ico"),
            sort_order,
            active: true,
        };
        Self {
            links: vec![
                seed(1, "GitHub", "https://github.com", "Where the code lives", 100),
                seed(2, "Rust", "https://www.rust-lang.org", "The Rust programming language", 90),
                seed(3, "Tokio", "https://tokio.rs", "Asynchronous runtime for Rust", 80),
            ],
            ..Self::default()
        }
    }

    /// Loads the configuration of `ctx`, falling back to defaults when the
    /// stored map does not fit.
    pub async fn load(ctx: &ExtensionContext) -> AppResult<Self> {
        Ok(Self::from_stored(ctx.key(), ctx.get_config().await?))
    }

    fn from_stored(key: &ExtensionKey, stored: Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(stored)).unwrap_or_else(|e| {
            warn!(extension = %key, error = %e, "Malformed friend links configuration, using defaults");
            Self::default()
        })
    }

    /// Persists the configuration of `ctx`.
    pub async fn save(&self, ctx: &ExtensionContext) -> AppResult<()> {
        ctx.set_config(self).await
    }

    /// Applies `edit` to the stored configuration of `ctx` and saves the
    /// result, without losing writes that race with it.
    pub async fn modify<R>(
        ctx: &ExtensionContext,
        edit: impl FnOnce(&mut Self) -> AppResult<R>,
    ) -> AppResult<R> {
        let key = ctx.key().clone();
        ctx.modify_config(move |stored| {
            let mut config = Self::from_stored(&key, stored);
            let out = edit(&mut config)?;
            Ok((config, out))
        })
        .await
    }

    /// Active links in display order, capped at `max_links`.
    pub fn visible_links(&self) -> Vec<&FriendLink> {
        let mut links: Vec<&FriendLink> = self.links.iter().filter(|l| l.active).collect();
        links.sort_by(|a, b| b.sort_order.cmp(&a.sort_order).then(a.id.cmp(&b.id)));
        links.truncate(self.max_links);
        links
    }

    /// Adds a link and returns it.
    pub fn add(&mut self, input: LinkInput) -> AppResult<FriendLink> {
        let name = input.name.unwrap_or_default();
        let url = input.url.unwrap_or_default();
        validate(&name, &url)?;

        let link = FriendLink {
            id: self.links.iter().map(|l| l.id).max().unwrap_or(0) + 1,
            name,
            url,
            description: input.description.unwrap_or_default(),
            logo: input.logo.unwrap_or_default(),
            sort_order: input.sort_order.unwrap_or(0),
            active: input.active.unwrap_or(true),
        };
        self.links.push(link.clone());
        Ok(link)
    }

    /// Applies the fields present in `input` to link `id`.
    pub fn edit(&mut self, id: u64, input: LinkInput) -> AppResult<FriendLink> {
        let link = self
            .links
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| AppError::not_found(format!("Link {id} does not exist")))?;

        let name = input.name.unwrap_or_else(|| link.name.clone());
        let url = input.url.unwrap_or_else(|| link.url.clone());
        validate(&name, &url)?;

        link.name = name;
        link.url = url;
        if let Some(description) = input.description {
            link.description = description;
        }
        if let Some(logo) = input.logo {
            link.logo = logo;
        }
        if let Some(sort_order) = input.sort_order {
            link.sort_order = sort_order;
        }
        if let Some(active) = input.active {
            link.active = active;
        }
        Ok(link.clone())
    }

    /// Removes link `id`.
    pub fn remove(&mut self, id: u64) -> AppResult<()> {
        let before = self.links.len();
        self.links.retain(|l| l.id != id);
        if self.links.len() == before {
            return Err(AppError::not_found(format!("Link {id} does not exist")));
        }
        Ok(())
    }
}

fn validate(name: &str, url: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("Link name is required"));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::validation(format!("Link URL '{url}' must start with http:// or https://")));
    }
    Ok(())
}

fn default_true() -> bool {
    true
}
