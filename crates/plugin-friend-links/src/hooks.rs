//! Markup contributed to host pages.

use noteblog_extension_sdk::prelude::*;

use crate::links::FriendLinksConfig;

/// Sidebar widget template.
pub const SIDEBAR_TEMPLATE: &str = r#"<div class="widget friend-links">
  <h3 class="widget-title">{{ friend_links.title }}</h3>
  <ul>
  {% for link in friend_links.links %}
    <li>
      <a href="{{ link.url }}"{% if friend_links.open_new_window %} target="_blank" rel="noopener"{% endif %}>
        {% if link.logo %}<img src="{{ link.logo }}" alt="" loading="lazy">{% endif %}{{ link.name }}
      </a>
      {% if friend_links.show_description and link.description %}<p>{{ link.description }}</p>{% endif %}
    </li>
  {% endfor %}
  </ul>
</div>"#;

/// Renders the sidebar widget, or nothing when it is switched off.
pub async fn sidebar_widget(ctx: &ExtensionContext) -> AppResult<Option<String>> {
    let config = FriendLinksConfig::load(ctx).await?;
    if !config.show_in_sidebar {
        return Ok(None);
    }

    let html = ctx.render(
        SIDEBAR_TEMPLATE,
        &json!({
            "friend_links": {
                "title": config.title,
                "links": config.visible_links(),
                "open_new_window": config.open_new_window,
                "show_description": config.show_description,
            }
        }),
    )?;
    Ok(Some(html))
}

/// Stylesheet link for the page head.
pub fn stylesheet_tag(ctx: &ExtensionContext) -> String {
    format!(
        r#"<link rel="stylesheet" href="{}/css/friend_links.css">"#,
        static_url_prefix(ctx.key())
    )
}

/// Script tag for the end of the page body.
pub fn script_tag(ctx: &ExtensionContext) -> String {
    format!(
        r#"<script src="{}/js/friend_links.js" defer></script>"#,
        static_url_prefix(ctx.key())
    )
}
