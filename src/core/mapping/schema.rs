//! Group/version/kind and group/version/resource coordinates plus the token
//! parsers used to read user supplied type names.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

impl GroupVersion {
    pub fn new(group: &str, version: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
        }
    }

    /// Parses an `apiVersion` value such as `v1` or `apps/v1`.
    pub fn parse(api_version: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version),
            None => Self::new("", api_version),
        }
    }

    /// Renders the `apiVersion` form: core group omits the group prefix.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.api_version())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn with_version(&self, version: &str) -> GroupVersionKind {
        GroupVersionKind {
            group: self.group.clone(),
            version: version.to_string(),
            kind: self.kind.clone(),
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            f.write_str(&self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }

    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        let gv = GroupVersion::parse(api_version);
        Self {
            group: gv.group,
            version: gv.version,
            kind: kind.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_empty() && self.version.is_empty() && self.kind.is_empty()
    }

    pub fn group_kind(&self) -> GroupKind {
        GroupKind {
            group: self.group.clone(),
            kind: self.kind.clone(),
        }
    }

    pub fn group_version(&self) -> GroupVersion {
        GroupVersion::new(&self.group, &self.version)
    }

    pub fn api_version(&self) -> String {
        self.group_version().api_version()
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.group_version(), self.kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupResource {
    pub group: String,
    pub resource: String,
}

impl GroupResource {
    pub fn with_version(&self, version: &str) -> GroupVersionResource {
        GroupVersionResource {
            group: self.group.clone(),
            version: version.to_string(),
            resource: self.resource.clone(),
        }
    }
}

impl fmt::Display for GroupResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            f.write_str(&self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
        }
    }

    pub fn group_resource(&self) -> GroupResource {
        GroupResource {
            group: self.group.clone(),
            resource: self.resource.clone(),
        }
    }

    pub fn group_version(&self) -> GroupVersion {
        GroupVersion::new(&self.group, &self.version)
    }
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Resource={}", self.group_version(), self.resource)
    }
}

/// Reads `resource[.group]`.
pub fn parse_group_resource(token: &str) -> GroupResource {
    match token.split_once('.') {
        Some((resource, group)) => GroupResource {
            group: group.to_string(),
            resource: resource.to_string(),
        },
        None => GroupResource {
            group: String::new(),
            resource: token.to_string(),
        },
    }
}

/// Reads `Kind[.group]`.
pub fn parse_group_kind(token: &str) -> GroupKind {
    match token.split_once('.') {
        Some((kind, group)) => GroupKind {
            group: group.to_string(),
            kind: kind.to_string(),
        },
        None => GroupKind {
            group: String::new(),
            kind: token.to_string(),
        },
    }
}

/// Splits `resource.version.group` into a fully specified resource (when the
/// token carries at least two dots) and always returns the `resource.group`
/// reading of the same token.
pub fn parse_resource_arg(token: &str) -> (Option<GroupVersionResource>, GroupResource) {
    let fully_specified = if token.matches('.').count() >= 2 {
        let mut parts = token.splitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(resource), Some(version), Some(group)) => {
                Some(GroupVersionResource::new(group, version, resource))
            }
            _ => None,
        }
    } else {
        None
    };
    (fully_specified, parse_group_resource(token))
}

/// Same as [`parse_resource_arg`] for `Kind.version.group` tokens.
pub fn parse_kind_arg(token: &str) -> (Option<GroupVersionKind>, GroupKind) {
    let fully_specified = if token.matches('.').count() >= 2 {
        let mut parts = token.splitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(kind), Some(version), Some(group)) => {
                Some(GroupVersionKind::new(group, version, kind))
            }
            _ => None,
        }
    } else {
        None
    };
    (fully_specified, parse_group_kind(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_arg_with_version_and_group() {
        let (gvr, gr) = parse_resource_arg("deployments.v1.apps");
        assert_eq!(gvr, Some(GroupVersionResource::new("apps", "v1", "deployments")));
        assert_eq!(gr.resource, "deployments");
        assert_eq!(gr.group, "v1.apps");
    }

    #[test]
    fn resource_arg_with_group_only() {
        let (gvr, gr) = parse_resource_arg("deployments.apps");
        assert!(gvr.is_none());
        assert_eq!(gr, GroupResource { group: "apps".into(), resource: "deployments".into() });
    }

    #[test]
    fn dotted_group_keeps_the_tail_together() {
        let (gvr, _) = parse_resource_arg("httproutes.v1.gateway.networking.k8s.io");
        let gvr = gvr.unwrap();
        assert_eq!(gvr.group, "gateway.networking.k8s.io");
        assert_eq!(gvr.version, "v1");
    }

    #[test]
    fn kind_arg_without_dots() {
        let (gvk, gk) = parse_kind_arg("Pod");
        assert!(gvk.is_none());
        assert_eq!(gk, GroupKind { group: String::new(), kind: "Pod".into() });
    }

    #[test]
    fn api_version_round_trip() {
        assert_eq!(GroupVersion::parse("apps/v1").api_version(), "apps/v1");
        assert_eq!(GroupVersion::parse("v1").group, "");
    }
}
