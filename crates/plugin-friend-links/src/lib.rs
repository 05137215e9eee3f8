//! Friend links plugin for Noteblog.
//!
//! Shows a list of friendly sites at the bottom of the sidebar. Links live
//! in the plugin's own configuration and are managed through a small JSON
//! API under `/plugins/friend_links/api`.

pub mod hooks;
pub mod links;
pub mod plugin;
pub mod routes;

pub use plugin::FriendLinksPlugin;

noteblog_extension_sdk::export_plugin!(plugin::ENTRY, FriendLinksPlugin::new);
