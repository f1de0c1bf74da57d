use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Example resource specifications shown when no input was given at all.
const MISSING_RESOURCE_MESSAGE: &str = "You must provide one or more resources by argument or filename.
Example resource specifications include:
   '-f rsrc.yaml'
   '--filename=rsrc.json'
   '<resource> <name>'
   '<resource>'";

#[derive(Debug, Clone, Error)]
pub enum ResourceError {
    // ---- configuration ----
    #[error("standard input cannot be used for multiple arguments")]
    StdinMultiUse,

    #[error("{}", MISSING_RESOURCE_MESSAGE)]
    MissingResource,

    #[error("{0}")]
    Usage(String),

    #[error("the path {0:?} does not exist")]
    PathNotExist(String),

    #[error("pattern {pattern:?} is not valid: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("the provided selector {selector:?} is not valid: {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("the URL passed to filename {url:?} is not valid: {message}")]
    InvalidUrl { url: String, message: String },

    // ---- type resolution ----
    #[error("the server doesn't have a resource type {0:?}")]
    NoResourceType(String),

    #[error("no matches for resource {0:?}")]
    NoResourceMatch(String),

    #[error("no matches for kind {kind:?} in group {group:?}")]
    NoKindMatch { group: String, kind: String },

    #[error("{token:?} matches multiple resource types: {candidates:?}")]
    AmbiguousResource { token: String, candidates: Vec<String> },

    #[error("kind {kind:?} matches multiple groups: {candidates:?}")]
    AmbiguousKind { kind: String, candidates: Vec<String> },

    #[error("resource mapping not found for name: {name:?} namespace: {namespace:?} from {source_name:?}: {message}\nensure CRDs are installed first")]
    UnrecognizedObject {
        name: String,
        namespace: String,
        source_name: String,
        message: String,
    },

    // ---- per item ----
    #[error("error parsing {source_name}: {message}")]
    Parse { source_name: String, message: String },

    #[error("unable to decode {source_name:?}: {message}")]
    Decode { source_name: String, message: String },

    #[error("error reading {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("unable to read URL {url:?}, server reported {status}, status code={code}")]
    Http { url: String, status: String, code: u16 },

    #[error(transparent)]
    Transport(Arc<reqwest::Error>),

    #[error("the namespace from the provided object {object_namespace:?} does not match the namespace {namespace:?}. You must pass '--namespace={object_namespace}' to perform this operation.")]
    NamespaceMismatch {
        object_namespace: String,
        namespace: String,
    },

    #[error("no namespace set on resource {resource} {name:?}")]
    MissingNamespace { resource: String, name: String },

    #[error("Unable to find {resource:?} that match label selector {label_selector:?}, field selector {field_selector:?}: {source}")]
    NotFoundForSelector {
        resource: String,
        label_selector: String,
        field_selector: String,
        #[source]
        source: Arc<kube::Error>,
    },

    // ---- transport / discovery, surfaced verbatim ----
    #[error(transparent)]
    Kube(Arc<kube::Error>),

    #[error(transparent)]
    Aggregate(AggregateError),
}

impl ResourceError {
    /// True for the "nothing was specified" failure callers print usage for.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, ResourceError::MissingResource)
    }

    /// True when a type token or kind could not be found in the catalog.
    pub fn is_no_match(&self) -> bool {
        matches!(
            self,
            ResourceError::NoResourceMatch(_) | ResourceError::NoKindMatch { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            ResourceError::Kube(err) => {
                matches!(err.as_ref(), kube::Error::Api(resp) if resp.code == 404)
            }
            ResourceError::NotFoundForSelector { .. } => true,
            _ => false,
        }
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        ResourceError::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

impl From<kube::Error> for ResourceError {
    fn from(err: kube::Error) -> Self {
        ResourceError::Kube(Arc::new(err))
    }
}

impl From<reqwest::Error> for ResourceError {
    fn from(err: reqwest::Error) -> Self {
        ResourceError::Transport(Arc::new(err))
    }
}

/// A flattened set of failures collected while visiting in best-effort mode.
#[derive(Debug, Clone)]
pub struct AggregateError(Vec<ResourceError>);

impl AggregateError {
    pub fn errors(&self) -> &[ResourceError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => Ok(()),
            [only] => write!(f, "{only}"),
            many => {
                for (i, err) in many.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "error: {err}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for AggregateError {}

/// Folds a list of errors into one. Nested aggregates are flattened so the
/// summary enumerates every item failure once.
pub fn aggregate(errors: Vec<ResourceError>) -> Result<(), ResourceError> {
    let mut flat = Vec::with_capacity(errors.len());
    for err in errors {
        push_flat(&mut flat, err);
    }
    if flat.is_empty() {
        Ok(())
    } else {
        Err(ResourceError::Aggregate(AggregateError(flat)))
    }
}

fn push_flat(out: &mut Vec<ResourceError>, err: ResourceError) {
    match err {
        ResourceError::Aggregate(AggregateError(inner)) => {
            for e in inner {
                push_flat(out, e);
            }
        }
        other => out.push(other),
    }
}

/// Predicate used by `ResourceResult::ignore_errors`.
pub type ErrMatchFunc = Arc<dyn Fn(&ResourceError) -> bool + Send + Sync>;

/// Removes every error matched by one of `matchers`, looking through aggregates.
pub fn filter_out(err: ResourceError, matchers: &[ErrMatchFunc]) -> Option<ResourceError> {
    if matchers.is_empty() {
        return Some(err);
    }
    match err {
        ResourceError::Aggregate(AggregateError(inner)) => {
            let kept: Vec<_> = inner
                .into_iter()
                .filter_map(|e| filter_out(e, matchers))
                .collect();
            aggregate(kept).err()
        }
        other if matchers.iter().any(|m| m(&other)) => None,
        other => Some(other),
    }
}
