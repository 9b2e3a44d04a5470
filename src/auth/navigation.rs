//! Navigation tree pruning by permission.

use serde::{Deserialize, Serialize};

use super::permission::{Permission, PermissionSet};

/// A node of the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationItem {
    /// Stable key.
    pub key: String,
    /// Display title.
    pub title: String,
    /// Target route; groups may have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Icon name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Any one of these grants visibility. Empty means visible to everyone.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
    /// Child items.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavigationItem>,
}

/// Prune `items` to what the holder of `permissions` may see.
///
/// An item survives when it declares no permissions or the caller holds any
/// of them. A surviving group without a link that ends up with no visible
/// children is dropped as well.
pub fn filter_navigation(items: &[NavigationItem], permissions: &PermissionSet) -> Vec<NavigationItem> {
    items
        .iter()
        .filter_map(|item| {
            if !item.permissions.is_empty() && !permissions.contains_any(&item.permissions) {
                return None;
            }

            let children = filter_navigation(&item.children, permissions);
            if item.link.is_none() && !item.children.is_empty() && children.is_empty() {
                return None;
            }

            Some(NavigationItem {
                children,
                ..item.clone()
            })
        })
        .collect()
}
