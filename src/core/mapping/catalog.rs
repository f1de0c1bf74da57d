//! In-memory table of the resource types a cluster serves.
//!
//! Entries are kept in discovery order (core group first), which is also the
//! priority order used when a token is valid in several versions of one group.

use std::collections::BTreeSet;

use crate::core::mapping::category::CategoryExpander;
use crate::core::mapping::rest_mapping::{Mapping, Scope};
use crate::core::mapping::schema::{GroupKind, GroupResource, GroupVersionKind, GroupVersionResource};
use crate::errors::ResourceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub group: String,
    pub version: String,
    pub kind: String,
    /// Plural resource name, e.g. `deployments`.
    pub plural: String,
    pub singular: String,
    pub short_names: Vec<String>,
    pub categories: Vec<String>,
    pub scope: Scope,
    /// Whether `version` is the server's preferred version of `group`.
    pub preferred: bool,
}

impl CatalogEntry {
    pub fn new(group: &str, version: &str, kind: &str, plural: &str, scope: Scope) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            plural: plural.to_string(),
            singular: kind.to_lowercase(),
            short_names: Vec::new(),
            categories: Vec::new(),
            scope,
            preferred: true,
        }
    }

    pub fn namespaced(group: &str, version: &str, kind: &str, plural: &str) -> Self {
        Self::new(group, version, kind, plural, Scope::Namespaced)
    }

    pub fn cluster(group: &str, version: &str, kind: &str, plural: &str) -> Self {
        Self::new(group, version, kind, plural, Scope::Cluster)
    }

    pub fn short_names(mut self, names: &[&str]) -> Self {
        self.short_names = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn not_preferred(mut self) -> Self {
        self.preferred = false;
        self
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::new(&self.group, &self.version, &self.kind)
    }

    pub fn mapping(&self) -> Mapping {
        Mapping::new(
            GroupVersionResource::new(&self.group, &self.version, &self.plural),
            self.gvk(),
            self.scope,
        )
    }

    fn answers_to_resource(&self, resource: &str) -> bool {
        let resource = resource.to_lowercase();
        self.plural == resource
            || self.singular == resource
            || self.short_names.iter().any(|s| *s == resource)
    }

    fn answers_to_kind(&self, kind: &str) -> bool {
        self.kind.eq_ignore_ascii_case(kind)
    }

    fn in_group(&self, group: &str) -> bool {
        group.is_empty() || self.group == group
    }

    fn in_version(&self, version: &str) -> bool {
        version.is_empty() || self.version == version
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a (possibly partial) resource coordinate to its kind.
    pub fn kind_for(&self, gvr: &GroupVersionResource) -> Result<GroupVersionKind, ResourceError> {
        let matches: Vec<&CatalogEntry> = self
            .entries
            .iter()
            .filter(|e| e.answers_to_resource(&gvr.resource) && e.in_group(&gvr.group) && e.in_version(&gvr.version))
            .collect();

        let entry = pick_single(matches, || {
            ResourceError::NoResourceMatch(gvr.group_resource().to_string())
        }, |candidates| ResourceError::AmbiguousResource {
            token: gvr.group_resource().to_string(),
            candidates,
        })?;
        Ok(entry.gvk())
    }

    /// Resolves a kind to its mapping, in `version` when one is given or in the
    /// group's preferred version otherwise.
    pub fn rest_mapping(&self, gk: &GroupKind, version: Option<&str>) -> Result<Mapping, ResourceError> {
        let version = version.unwrap_or_default();
        let matches: Vec<&CatalogEntry> = self
            .entries
            .iter()
            .filter(|e| e.answers_to_kind(&gk.kind) && e.in_group(&gk.group) && e.in_version(version))
            .collect();

        let entry = pick_single(matches, || ResourceError::NoKindMatch {
            group: gk.group.clone(),
            kind: gk.kind.clone(),
        }, |candidates| ResourceError::AmbiguousKind {
            kind: gk.kind.clone(),
            candidates,
        })?;
        Ok(entry.mapping())
    }
}

/// All candidates must belong to one group/kind; among them the preferred
/// version wins, falling back to discovery order.
fn pick_single<'a>(
    matches: Vec<&'a CatalogEntry>,
    none: impl FnOnce() -> ResourceError,
    ambiguous: impl FnOnce(Vec<String>) -> ResourceError,
) -> Result<&'a CatalogEntry, ResourceError> {
    let kinds: BTreeSet<GroupKind> = matches
        .iter()
        .map(|e| GroupKind { group: e.group.clone(), kind: e.kind.clone() })
        .collect();

    match kinds.len() {
        0 => Err(none()),
        1 => Ok(matches
            .iter()
            .find(|e| e.preferred)
            .or_else(|| matches.first())
            .copied()
            .ok_or_else(none)?),
        _ => Err(ambiguous(kinds.iter().map(|gk| gk.to_string()).collect())),
    }
}

impl CategoryExpander for Catalog {
    fn expand(&self, category: &str) -> Option<Vec<GroupResource>> {
        let mut seen = BTreeSet::new();
        let expanded: Vec<GroupResource> = self
            .entries
            .iter()
            .filter(|e| e.preferred && e.categories.iter().any(|c| c == category))
            .map(|e| GroupResource { group: e.group.clone(), resource: e.plural.clone() })
            .filter(|gr| seen.insert(gr.clone()))
            .collect();

        if expanded.is_empty() {
            None
        } else {
            Some(expanded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            CatalogEntry::namespaced("", "v1", "Pod", "pods").short_names(&["po"]).categories(&["all"]),
            CatalogEntry::cluster("", "v1", "Node", "nodes").short_names(&["no"]),
            CatalogEntry::namespaced("apps", "v1", "Deployment", "deployments")
                .short_names(&["deploy"])
                .categories(&["all"]),
            CatalogEntry::namespaced("apps", "v1beta1", "Deployment", "deployments").not_preferred(),
            CatalogEntry::namespaced("extensions", "v1beta1", "Widget", "widgets"),
            CatalogEntry::namespaced("other.io", "v1", "Widget", "widgets"),
        ])
    }

    #[test]
    fn kind_for_plural_singular_and_short_name() {
        let c = catalog();
        for token in ["pods", "pod", "po", "PODS"] {
            let gvk = c.kind_for(&GroupVersionResource::new("", "", token)).unwrap();
            assert_eq!(gvk, GroupVersionKind::new("", "v1", "Pod"), "token {token}");
        }
    }

    #[test]
    fn kind_for_prefers_preferred_version() {
        let gvk = catalog()
            .kind_for(&GroupVersionResource::new("apps", "", "deployments"))
            .unwrap();
        assert_eq!(gvk.version, "v1");
    }

    #[test]
    fn kind_for_honours_explicit_version() {
        let gvk = catalog()
            .kind_for(&GroupVersionResource::new("apps", "v1beta1", "deployments"))
            .unwrap();
        assert_eq!(gvk.version, "v1beta1");
    }

    #[test]
    fn kind_for_unknown_resource_is_no_match() {
        let err = catalog()
            .kind_for(&GroupVersionResource::new("", "", "gizmos"))
            .unwrap_err();
        assert!(err.is_no_match());
    }

    #[test]
    fn same_resource_in_two_groups_is_ambiguous() {
        let err = catalog()
            .kind_for(&GroupVersionResource::new("", "", "widgets"))
            .unwrap_err();
        assert!(matches!(err, ResourceError::AmbiguousResource { .. }));
    }

    #[test]
    fn rest_mapping_by_kind_is_case_insensitive() {
        let mapping = catalog()
            .rest_mapping(&GroupKind { group: String::new(), kind: "node".into() }, None)
            .unwrap();
        assert_eq!(mapping.scope, Scope::Cluster);
        assert_eq!(mapping.resource.resource, "nodes");
    }

    #[test]
    fn category_expansion_lists_preferred_resources() {
        let expanded = catalog().expand("all").unwrap();
        assert_eq!(
            expanded.iter().map(|gr| gr.to_string()).collect::<Vec<_>>(),
            vec!["pods", "deployments.apps"]
        );
        assert!(catalog().expand("nothing").is_none());
    }
}
