//! Friend links plugin implementation.

use tracing::info;

use noteblog_extension_sdk::prelude::*;

use crate::hooks::{script_tag, sidebar_widget, stylesheet_tag};
use crate::links::FriendLinksConfig;
use crate::routes::link_routes;

/// Catalog entry name, referenced by `plugin.toml`.
pub const ENTRY: &str = "friend_links";

/// Friend links plugin.
#[derive(Debug, Default)]
pub struct FriendLinksPlugin;

impl FriendLinksPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Plugin for FriendLinksPlugin {
    fn name(&self) -> &str {
        "Friend Links"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Shows friend links in the sidebar"
    }

    fn author(&self) -> &str {
        "Noteblog"
    }

    async fn install(&self, ctx: &ExtensionContext) -> AppResult<bool> {
        // Keep links from an earlier installation.
        if ctx.get_config().await?.is_empty() {
            FriendLinksConfig::seeded().save(ctx).await?;
            info!(extension = %ctx.key(), "Seeded default friend links");
        }
        Ok(true)
    }

    async fn uninstall(&self, ctx: &ExtensionContext) -> AppResult<bool> {
        info!(extension = %ctx.key(), "Removing friend links");
        Ok(true)
    }

    async fn register_hooks(&self, ctx: &ExtensionContext) -> AppResult<()> {
        let widget_ctx = ctx.clone();
        ctx.register_action(
            "sidebar_bottom",
            HookFn::arity0(move || {
                let ctx = widget_ctx.clone();
                async move { sidebar_widget(&ctx).await }
            }),
            DEFAULT_PRIORITY,
        )
        .await?;

        let stylesheet = stylesheet_tag(ctx);
        ctx.register_action(
            "head_assets",
            HookFn::arity0(move || {
                let tag = stylesheet.clone();
                async move { Ok(Some(tag)) }
            }),
            DEFAULT_PRIORITY,
        )
        .await?;

        let script = script_tag(ctx);
        ctx.register_action(
            "scripts_assets",
            HookFn::arity0(move || {
                let tag = script.clone();
                async move { Ok(Some(tag)) }
            }),
            DEFAULT_PRIORITY,
        )
        .await?;

        for route in link_routes() {
            ctx.register_route(route).await?;
        }
        ctx.register_static_assets("static").await
    }
}
