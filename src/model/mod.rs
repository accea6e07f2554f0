//! Value objects of the API and their JSON representation.
//!
//! Every field is optional: a field that was never set is absent from the
//! JSON document, while an explicit `false`, `0` or `""` is written out. This
//! keeps "unset" distinct from "zero value" on both the encode and the decode
//! side, which is what `PATCH` requests rely on.

use serde::{Deserialize, Serialize};

#[macro_use]
mod macros;

pub mod clusters_mgmt;
pub mod service_logs;

/// Metadata shared by all resources: kind, identifier and link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl ObjectMeta {
    pub fn with_kind(kind: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            ..Default::default()
        }
    }
}

/// Implemented by every type that has an identity in the API.
pub trait Resource {
    /// Kind of a complete object, e.g. `Cluster`.
    const KIND: &'static str;

    /// Kind of a link to an object, e.g. `ClusterLink`.
    const LINK_KIND: &'static str;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn object_id(&self) -> Option<&str> {
        self.meta().id.as_deref()
    }

    fn object_href(&self) -> Option<&str> {
        self.meta().href.as_deref()
    }

    fn kind(&self) -> &str {
        self.meta().kind.as_deref().unwrap_or(Self::KIND)
    }

    fn is_link(&self) -> bool {
        self.meta().kind.as_deref() == Some(Self::LINK_KIND)
    }

    /// Sets the kind to the complete-object kind when it is missing.
    fn ensure_kind(&mut self) {
        let meta = self.meta_mut();
        if meta.kind.is_none() {
            meta.kind = Some(Self::KIND.to_string());
        }
    }

    /// Builds a link to the object with the given identifier.
    fn link_to(id: impl Into<String>) -> Self
    where
        Self: Default,
    {
        let mut object = Self::default();
        let meta = object.meta_mut();
        meta.kind = Some(Self::LINK_KIND.to_string());
        meta.id = Some(id.into());
        object
    }
}

/// Collection embedded in another object, e.g. the add-ons of a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectList<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for ObjectList<T> {
    fn default() -> Self {
        Self {
            kind: None,
            href: None,
            items: Vec::new(),
        }
    }
}

impl<T> From<Vec<T>> for ObjectList<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }
}

impl<T> ObjectList<T> {
    /// Link to a collection without its items.
    pub fn link(href: impl Into<String>) -> Self {
        Self {
            kind: None,
            href: Some(href.into()),
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Page of a collection as returned by a `GET` on a collection path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<i32>,

    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T: Resource> Page<T> {
    /// Creates a page whose kind is derived from the item kind, e.g. `ClusterList`.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            kind: Some(format!("{}List", T::KIND)),
            page: None,
            size: None,
            total: None,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::clusters_mgmt::{Cluster, ClusterState};
    use super::*;

    #[test]
    fn test_unset_fields_are_omitted() {
        let cluster = Cluster::new().name("mycluster");
        let json = serde_json::to_value(&cluster).unwrap();

        assert_eq!(json["kind"], "Cluster");
        assert_eq!(json["name"], "mycluster");
        assert!(json.get("multi_az").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_zero_values_are_kept() {
        let cluster = Cluster::new()
            .multi_az(false)
            .load_balancer_quota(0)
            .display_name("");
        let json = serde_json::to_value(&cluster).unwrap();

        assert_eq!(json["multi_az"], false);
        assert_eq!(json["load_balancer_quota"], 0);
        assert_eq!(json["display_name"], "");
    }

    #[test]
    fn test_decode_preserves_presence() {
        let json = r#"{"kind": "Cluster", "id": "123", "managed": false}"#;
        let cluster: Cluster = serde_json::from_str(json).unwrap();

        assert_eq!(cluster.object_id(), Some("123"));
        assert_eq!(cluster.managed, Some(false));
        assert_eq!(cluster.multi_az, None);
        assert!(!cluster.is_link());
    }

    #[test]
    fn test_link_kind() {
        let link = Cluster::link_to("123");
        let json = serde_json::to_value(&link).unwrap();

        assert_eq!(json["kind"], "ClusterLink");
        assert_eq!(json["id"], "123");

        let decoded: Cluster = serde_json::from_value(json).unwrap();
        assert!(decoded.is_link());
    }

    #[test]
    fn test_ensure_kind() {
        let mut cluster: Cluster = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert!(cluster.meta.kind.is_none());
        assert_eq!(cluster.kind(), "Cluster");

        cluster.ensure_kind();
        assert_eq!(cluster.meta.kind.as_deref(), Some("Cluster"));
    }

    #[test]
    fn test_page_kind_and_paging() {
        let mut page = Page::new(vec![Cluster::new().state(ClusterState::Ready)]);
        page.page = Some(1);
        page.total = Some(1);

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["kind"], "ClusterList");
        assert_eq!(json["page"], 1);
        assert!(json.get("size").is_none());
        assert_eq!(json["items"][0]["state"], "ready");
    }

    #[test]
    fn test_page_without_items() {
        let page: Page<Cluster> = serde_json::from_str(r#"{"kind": "ClusterList"}"#).unwrap();
        assert!(page.items.is_empty());
    }
}
