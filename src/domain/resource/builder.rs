//! Collects user input (files, URLs, streams, type names, selectors) and
//! resolves it into a [`ResourceResult`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::ResolverConfig;
use crate::core::client::http_fetch::{HttpGet, ReqwestGet};
use crate::core::client::kube_client::build_kube_client;
use crate::core::client::resource_client::{ClientFactory, KubeClientFactory, ResourceClient};
use crate::core::mapping::category::CachingCategoryExpander;
use crate::core::mapping::discovery::KubeDiscovery;
use crate::core::mapping::rest_mapper::{CatalogSource, DeferredRestMapper, RestMapper};
use crate::core::mapping::rest_mapping::Mapping;
use crate::core::mapping::schema::{parse_kind_arg, parse_resource_arg, GroupVersionKind, GroupVersionResource};
use crate::domain::resource::decorators::{filter_by_label_selector, Decorator};
use crate::domain::resource::info::Info;
use crate::domain::resource::info_mapper::InfoMapper;
use crate::domain::resource::label_selector::LabelSelector;
use crate::domain::resource::path_expansion::{expand_if_file_pattern, expand_path, FILE_EXTENSIONS};
use crate::domain::resource::pipeline::{FinalizePipeline, FinalizePolicy};
use crate::domain::resource::result::ResourceResult;
use crate::domain::resource::selector_source::SelectorSource;
use crate::domain::resource::sources::{FileSource, ManifestReader, StreamSource, UrlSource};
use crate::domain::resource::visitor::Visitor;
use crate::errors::{aggregate, ResourceError};

/// Files, directories, globs, URLs or `-` given as `--filename` values.
#[derive(Debug, Clone, Default)]
pub struct FilenameOptions {
    pub filenames: Vec<String>,
    pub recursive: bool,
}

/// A `resource/name` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTuple {
    pub resource: String,
    pub name: String,
}

pub struct Builder {
    rest_mapper: Arc<dyn RestMapper>,
    categories: CachingCategoryExpander,
    clients: Arc<dyn ClientFactory>,
    mapper: Arc<InfoMapper>,
    http: Arc<dyn HttpGet>,

    errors: Vec<ResourceError>,

    paths: Vec<Arc<Visitor>>,
    stream: bool,
    stdin_in_use: bool,
    dir: bool,

    label_selector: Option<String>,
    field_selector: Option<String>,
    select_all: bool,
    limit_chunks: u32,

    resources: Vec<String>,
    names: Vec<String>,
    resource_tuples: Vec<ResourceTuple>,
    subresource: String,

    namespace: String,
    all_namespaces: bool,
    require_namespace: bool,
    default_namespace: bool,

    flatten: bool,
    latest: bool,
    require_object: bool,
    single_resource_type: bool,
    continue_on_error: bool,
    single_item_implied: bool,

    concurrency: usize,
    http_attempts: i32,
    http_retry_delay: Duration,
}

impl Builder {
    /// `catalog` backs category expansion; it is loaded at most once per
    /// builder.
    pub fn new(
        rest_mapper: Arc<dyn RestMapper>,
        catalog: Arc<dyn CatalogSource>,
        clients: Arc<dyn ClientFactory>,
    ) -> Self {
        let defaults = ResolverConfig::default();
        Self {
            mapper: Arc::new(InfoMapper::new(rest_mapper.clone(), clients.clone())),
            rest_mapper,
            categories: CachingCategoryExpander::new(catalog),
            clients,
            http: Arc::new(ReqwestGet::new()),
            errors: Vec::new(),
            paths: Vec::new(),
            stream: false,
            stdin_in_use: false,
            dir: false,
            label_selector: None,
            field_selector: None,
            select_all: false,
            limit_chunks: 0,
            resources: Vec::new(),
            names: Vec::new(),
            resource_tuples: Vec::new(),
            subresource: String::new(),
            namespace: String::new(),
            all_namespaces: false,
            require_namespace: false,
            default_namespace: false,
            flatten: false,
            latest: false,
            require_object: true,
            single_resource_type: false,
            continue_on_error: false,
            single_item_implied: false,
            concurrency: defaults.visitor_concurrency,
            http_attempts: defaults.http_attempts,
            http_retry_delay: defaults.http_retry_delay(),
        }
    }

    /// Builder talking to a live cluster through `client`. Discovery runs on
    /// first use and is shared by type resolution and category expansion.
    pub fn for_cluster(client: kube::Client) -> Self {
        let discovery = Arc::new(DeferredRestMapper::new(Arc::new(KubeDiscovery::new(client.clone()))));
        Self::new(discovery.clone(), discovery, Arc::new(KubeClientFactory::new(client)))
    }

    /// Connects using the ambient kubeconfig and applies `config`.
    pub async fn connect(config: &ResolverConfig) -> anyhow::Result<Self> {
        let client = build_kube_client(config).await?;
        Ok(Self::for_cluster(client).with_config(config))
    }

    pub fn with_config(mut self, config: &ResolverConfig) -> Self {
        self.concurrency = config.visitor_concurrency;
        self.limit_chunks = config.chunk_size;
        self.http_attempts = config.http_attempts;
        self.http_retry_delay = config.http_retry_delay();
        self
    }

    /// Replaces the fetcher used for URL sources.
    pub fn http_getter(mut self, getter: Arc<dyn HttpGet>) -> Self {
        self.http = getter;
        self
    }

    pub fn add_error(mut self, err: ResourceError) -> Self {
        self.errors.push(err);
        self
    }

    pub fn filename_param(mut self, enforce_namespace: bool, options: &FilenameOptions) -> Self {
        let recursive = options.recursive;
        for name in &options.filenames {
            if name == "-" {
                self = self.stdin();
            } else if name.starts_with("http://") || name.starts_with("https://") {
                let attempts = self.http_attempts;
                match reqwest::Url::parse(name) {
                    Ok(url) => self = self.url(attempts, &[url.as_str()]),
                    Err(e) => self.errors.push(ResourceError::InvalidUrl {
                        url: name.clone(),
                        message: e.to_string(),
                    }),
                }
            } else {
                match expand_if_file_pattern(name) {
                    Ok(matches) => {
                        if !recursive && matches.len() == 1 {
                            self.single_item_implied = true;
                        }
                        let matches: Vec<&str> = matches.iter().map(String::as_str).collect();
                        self = self.path(recursive, &matches);
                    }
                    Err(err) => self.errors.push(err),
                }
            }
        }

        if enforce_namespace {
            self = self.require_namespace();
        }
        self
    }

    /// Reads manifests from each URL, retrying `attempts` times.
    pub fn url(mut self, attempts: i32, urls: &[&str]) -> Self {
        for url in urls {
            let source = UrlSource::new(url, attempts, self.http_retry_delay, self.http.clone(), self.mapper.clone());
            self.paths.push(Arc::new(Visitor::Url(source)));
        }
        self
    }

    /// Reads manifests from standard input. Standard input can only be
    /// claimed once.
    pub fn stdin(mut self) -> Self {
        self.stream = true;
        if self.stdin_in_use {
            self.errors.push(ResourceError::StdinMultiUse);
        }
        self.stdin_in_use = true;
        self.paths
            .push(Arc::new(Visitor::Stream(StreamSource::stdin(self.mapper.clone()))));
        self
    }

    /// Records that standard input is consumed elsewhere, so a later
    /// [`stdin`](Self::stdin) is rejected.
    pub fn stdin_in_use(mut self) -> Self {
        self.stdin_in_use = true;
        self
    }

    /// Reads manifests from `reader`, reported as `name`.
    pub fn stream(mut self, reader: ManifestReader, name: &str) -> Self {
        self.stream = true;
        self.paths
            .push(Arc::new(Visitor::Stream(StreamSource::new(reader, name, self.mapper.clone()))));
        self
    }

    pub fn path(mut self, recursive: bool, paths: &[&str]) -> Self {
        for p in paths {
            let root = Path::new(p);
            match root.metadata() {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    self.errors.push(ResourceError::PathNotExist(p.to_string()));
                    continue;
                }
                Err(e) => {
                    self.errors.push(ResourceError::io(*p, e));
                    continue;
                }
                Ok(meta) if meta.is_dir() => self.dir = true,
                Ok(_) => {}
            }

            match expand_path(root, recursive) {
                Ok(files) => {
                    debug!("Expanded {} to {} file(s)", p, files.len());
                    for file in files {
                        self.paths
                            .push(Arc::new(Visitor::File(FileSource::new(file, self.mapper.clone()))));
                    }
                }
                Err(err) => self.errors.push(ResourceError::Usage(format!("error reading {p:?}: {err}"))),
            }
        }

        if self.paths.is_empty() && self.errors.is_empty() {
            self.errors.push(ResourceError::Usage(format!(
                "error reading [{}]: recognized file extensions are [{}]",
                paths.join(" "),
                FILE_EXTENSIONS.join(" ")
            )));
        }
        self
    }

    /// Adds type tokens to resolve, e.g. `pods` or `deployments.apps`.
    pub fn resource_types(mut self, types: &[&str]) -> Self {
        self.resources.extend(types.iter().map(|t| t.to_string()));
        self
    }

    /// Adds names, each either `resource/name` or a bare name of type
    /// `resource`.
    pub fn resource_names(mut self, resource: &str, names: &[&str]) -> Self {
        for name in names {
            match split_resource_type_name(name) {
                Err(err) => {
                    self.errors.push(err);
                    return self;
                }
                Ok(Some(tuple)) => self.resource_tuples.push(tuple),
                Ok(None) if resource.is_empty() => self.errors.push(ResourceError::Usage(format!(
                    "the argument {name:?} must be RESOURCE/NAME"
                ))),
                Ok(None) => self.resource_tuples.push(ResourceTuple {
                    resource: resource.to_string(),
                    name: name.to_string(),
                }),
            }
        }
        self
    }

    /// Interprets positional arguments: `type`, `type name...`,
    /// `type1,type2 name...` or `type/name...`.
    pub fn resource_type_or_name_args(mut self, allow_empty_selector: bool, args: &[&str]) -> Self {
        let args = normalize_multiple_resources_args(args);
        match has_combined_type_args(&args) {
            Err(err) => {
                self.errors.push(err);
                return self;
            }
            Ok(true) => {
                for arg in &args {
                    match split_resource_type_name(arg) {
                        Err(err) => {
                            self.errors.push(err);
                            return self;
                        }
                        Ok(Some(tuple)) => self.resource_tuples.push(tuple),
                        Ok(None) => {}
                    }
                }
                return self;
            }
            Ok(false) => {}
        }

        match args.as_slice() {
            [] => {}
            [types] => {
                self.resources.extend(split_resource_argument(types));
                if self.label_selector.is_none() && allow_empty_selector {
                    self.label_selector = Some(LabelSelector::everything().to_string());
                }
            }
            [types, names @ ..] => {
                self.names.extend(names.iter().cloned());
                self.resources.extend(split_resource_argument(types));
            }
        }
        self
    }

    pub fn label_selector_param(mut self, selector: &str) -> Self {
        let selector = selector.trim();
        if selector.is_empty() {
            return self;
        }
        if self.select_all {
            self.errors.push(ResourceError::Usage(format!(
                "found non-empty label selector {selector:?} with previously set 'all' parameter. "
            )));
            return self;
        }
        self.label_selector(selector)
    }

    pub fn label_selector(mut self, selector: &str) -> Self {
        if !selector.is_empty() {
            self.label_selector = Some(selector.to_string());
        }
        self
    }

    pub fn field_selector_param(mut self, selector: &str) -> Self {
        let selector = selector.trim();
        if selector.is_empty() {
            return self;
        }
        if self.select_all {
            self.errors.push(ResourceError::Usage(format!(
                "found non-empty field selector {selector:?} with previously set 'all' parameter. "
            )));
            return self;
        }
        self.field_selector = Some(selector.to_string());
        self
    }

    pub fn select_all_param(mut self, select_all: bool) -> Self {
        if select_all && (self.label_selector.is_some() || self.field_selector.is_some()) {
            self.errors.push(ResourceError::Usage(
                "setting 'all' parameter but found a non empty selector. ".into(),
            ));
            return self;
        }
        self.select_all = select_all;
        self
    }

    pub fn namespace_param(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    /// Namespaced items without a namespace get the configured one.
    pub fn default_namespace(mut self) -> Self {
        self.default_namespace = true;
        self
    }

    pub fn all_namespaces(mut self, all_namespaces: bool) -> Self {
        if all_namespaces {
            self.namespace.clear();
        }
        self.all_namespaces = all_namespaces;
        self
    }

    /// Items in any other namespace than the configured one are an error.
    pub fn require_namespace(mut self) -> Self {
        self.require_namespace = true;
        self
    }

    /// Page size for selector listing; 0 lists everything at once.
    pub fn request_chunks_of(mut self, chunk_size: u32) -> Self {
        self.limit_chunks = chunk_size;
        self
    }

    pub fn subresource(mut self, subresource: &str) -> Self {
        self.subresource = subresource.to_string();
        self
    }

    /// List objects are expanded into their members.
    pub fn flatten(mut self) -> Self {
        self.flatten = true;
        self
    }

    /// Items read from files, URLs or streams are re-fetched from the server.
    pub fn latest(mut self) -> Self {
        self.latest = true;
        self
    }

    /// When false, by-name items are not fetched and carry no body.
    pub fn require_object(mut self, require: bool) -> Self {
        self.require_object = require;
        self
    }

    pub fn single_resource_type(mut self) -> Self {
        self.single_resource_type = true;
        self
    }

    /// Item failures are collected and reported together at the end.
    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    /// Number of sources read at the same time; 0 or 1 reads them in order.
    pub fn visitor_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Resolves the collected input. Configuration problems are reported
    /// through the result and short-circuit every later call on it.
    pub async fn resolve(mut self) -> ResourceResult {
        if let Err(err) = self.staging_error() {
            return ResourceResult::failed(err);
        }
        if let Err(err) = self.expand_categories().await {
            return ResourceResult::failed(err);
        }

        let (result, flattened) = match self.visitor_result().await {
            Ok(resolved) => resolved,
            Err(err) => return ResourceResult::failed(err),
        };

        let pipeline = FinalizePipeline::new(&FinalizePolicy {
            flatten: self.flatten && !flattened,
            namespace: self.namespace.clone(),
            default_namespace: self.default_namespace,
            require_namespace: self.require_namespace,
            all_namespaces: self.all_namespaces,
            require_object: self.require_object,
            continue_on_error: self.continue_on_error,
        });
        debug!("Finalizing with stages {:?}", pipeline.stages());
        let mapper = self.mapper.clone();
        result.map_visitor(|visitor| pipeline.apply(visitor, mapper))
    }

    /// Mapping for a type or kind token such as `po`, `deployments.v1.apps`
    /// or `Deployment.apps`.
    pub async fn mapping_for(&self, token: &str) -> Result<Mapping, ResourceError> {
        let (fully_specified_gvr, group_resource) = parse_resource_arg(token);

        let mut gvk = GroupVersionKind::default();
        if let Some(gvr) = &fully_specified_gvr {
            gvk = self.kind_or_empty(gvr).await?;
        }
        if gvk.is_empty() {
            gvk = self.kind_or_empty(&group_resource.with_version("")).await?;
        }
        if !gvk.is_empty() {
            return self
                .rest_mapper
                .rest_mapping(&gvk.group_kind(), Some(gvk.version.as_str()))
                .await;
        }

        let (fully_specified_gvk, group_kind) = parse_kind_arg(token);
        let candidate = fully_specified_gvk.unwrap_or_else(|| group_kind.with_version(""));
        if !candidate.is_empty() {
            let version = (!candidate.version.is_empty()).then_some(candidate.version.as_str());
            match self.rest_mapper.rest_mapping(&candidate.group_kind(), version).await {
                Ok(mapping) => return Ok(mapping),
                Err(err) if err.is_no_match() => {}
                Err(err) => return Err(err),
            }
        }

        match self.rest_mapper.rest_mapping(&group_kind, None).await {
            Ok(mapping) => Ok(mapping),
            Err(err) if err.is_no_match() => Err(ResourceError::NoResourceType(group_resource.resource)),
            Err(err) => Err(err),
        }
    }

    async fn kind_or_empty(&self, gvr: &GroupVersionResource) -> Result<GroupVersionKind, ResourceError> {
        match self.rest_mapper.kind_for(gvr).await {
            Ok(gvk) => Ok(gvk),
            Err(err) if err.is_no_match() => Ok(GroupVersionKind::default()),
            Err(err) => Err(err),
        }
    }

    fn staging_error(&mut self) -> Result<(), ResourceError> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => aggregate(std::mem::take(&mut self.errors)),
        }
    }

    /// Replaces category tokens such as `all` among the type tokens.
    async fn expand_categories(&mut self) -> Result<(), ResourceError> {
        if self.resources.is_empty() {
            return Ok(());
        }
        let mut seen = BTreeSet::new();
        let mut expanded = Vec::new();
        for token in &self.resources {
            let replaced = self.categories.replace_aliases(token).await?;
            for resource in replaced.split(',') {
                if seen.insert(resource.to_string()) {
                    expanded.push(resource.to_string());
                }
            }
        }
        self.resources = expanded;
        Ok(())
    }

    /// The unfinalized result and whether lists were already flattened.
    async fn visitor_result(&mut self) -> Result<(ResourceResult, bool), ResourceError> {
        if self.select_all {
            self.label_selector = Some(LabelSelector::everything().to_string());
        }

        if !self.paths.is_empty() {
            return self.visit_by_paths().map(|result| (result, self.flatten));
        }
        if self.label_selector.is_some() || self.field_selector.is_some() {
            return self.visit_by_selector().await.map(|result| (result, false));
        }
        if !self.resource_tuples.is_empty() {
            return self.visit_by_resource().await.map(|result| (result, false));
        }
        if !self.names.is_empty() {
            return self.visit_by_name().await.map(|result| (result, false));
        }
        if !self.resources.is_empty() {
            for resource in &self.resources {
                self.mapping_for(resource).await?;
            }
            return Err(ResourceError::Usage(
                "resource(s) were provided, but no name was specified".into(),
            ));
        }
        Err(ResourceError::MissingResource)
    }

    fn visit_by_paths(&self) -> Result<ResourceResult, ResourceError> {
        if !self.resources.is_empty() {
            return Err(ResourceError::Usage(
                "when paths, URLs, or stdin is provided as input, you may not specify resource arguments as well"
                    .into(),
            ));
        }
        if !self.names.is_empty() {
            return Err(ResourceError::Usage("name cannot be provided when a path is specified".into()));
        }
        if !self.resource_tuples.is_empty() {
            return Err(ResourceError::Usage(
                "resource/name arguments cannot be provided when a path is specified".into(),
            ));
        }

        let single_item_implied = !self.dir && !self.stream && self.paths.len() == 1;
        let mut visitor = if self.continue_on_error {
            Visitor::Eager(self.paths.clone())
        } else {
            Visitor::Concurrent {
                visitors: self.paths.clone(),
                concurrency: self.concurrency,
            }
        };
        if self.flatten {
            visitor = visitor.flattened(self.mapper.clone());
        }
        if self.latest {
            // Namespace must be known before fetching.
            if self.default_namespace {
                visitor = visitor.decorated(vec![Decorator::SetNamespace(self.namespace.clone())]);
            }
            visitor = visitor.decorated(vec![Decorator::RetrieveLatest]);
        }
        if let Some(selector) = &self.label_selector {
            let selector = LabelSelector::parse(selector)?;
            visitor = visitor.filtered(vec![filter_by_label_selector(selector)]);
        }

        Ok(ResourceResult::new(visitor, self.paths.clone()).with_flags(single_item_implied, true))
    }

    async fn visit_by_selector(&self) -> Result<ResourceResult, ResourceError> {
        if !self.names.is_empty() {
            return Err(ResourceError::Usage("name cannot be provided when a selector is specified".into()));
        }
        if !self.resource_tuples.is_empty() {
            return Err(ResourceError::Usage(
                "selectors and the all flag cannot be used when passing resource/name arguments".into(),
            ));
        }
        if self.resources.is_empty() {
            return Err(ResourceError::Usage(
                "at least one resource must be specified to use a selector".into(),
            ));
        }
        if !self.subresource.is_empty() {
            return Err(ResourceError::Usage(
                "subresource cannot be used when bulk resources are specified".into(),
            ));
        }

        let label_selector = self.label_selector.clone().unwrap_or_default();
        let field_selector = self.field_selector.clone().unwrap_or_default();
        let mut sources = Vec::new();
        for mapping in self.resource_mappings().await? {
            let client = self.clients.client_for(&mapping.gvk.group_version())?;
            let namespace = if mapping.is_namespaced() { self.namespace.as_str() } else { "" };
            sources.push(Arc::new(Visitor::Selector(SelectorSource::new(
                client,
                mapping,
                namespace,
                &label_selector,
                &field_selector,
                self.limit_chunks,
            ))));
        }

        let visitor = if self.continue_on_error {
            Visitor::Eager(sources.clone())
        } else {
            Visitor::List(sources.clone())
        };
        Ok(ResourceResult::new(visitor, sources).with_flags(false, false))
    }

    async fn visit_by_resource(&self) -> Result<ResourceResult, ResourceError> {
        let single_item_implied = self.single_item_implied || self.resource_tuples.len() == 1;
        if !self.resources.is_empty() {
            return Err(ResourceError::Usage(
                "you may not specify individual resources and bulk resources in the same call".into(),
            ));
        }

        let mappings = self.resource_tuple_mappings().await?;
        let mut clients: BTreeMap<String, Arc<dyn ResourceClient>> = BTreeMap::new();
        let mut items = Vec::new();
        for tuple in &self.resource_tuples {
            let mapping = mappings.get(&tuple.resource).ok_or_else(|| {
                ResourceError::Usage(format!("resource {:?} is not recognized", tuple.resource))
            })?;
            let key = format!("{}/{}", mapping.gvk.group_version(), mapping.resource.resource);
            let client = match clients.get(&key) {
                Some(client) => client.clone(),
                None => {
                    let client = self.clients.client_for(&mapping.gvk.group_version())?;
                    clients.insert(key, client.clone());
                    client
                }
            };

            let namespace = self.by_name_namespace(mapping)?;
            let info = Info::by_name(client, mapping.clone(), &namespace, &tuple.name).with_subresource(&self.subresource);
            items.push(Arc::new(Visitor::Info(Box::new(info))));
        }

        let visitor = if self.continue_on_error {
            Visitor::Eager(items.clone())
        } else {
            Visitor::List(items.clone())
        };
        Ok(ResourceResult::new(visitor, items).with_flags(single_item_implied, true))
    }

    async fn visit_by_name(&self) -> Result<ResourceResult, ResourceError> {
        let single_item_implied = self.names.len() == 1;
        let mapping = match self.resources.as_slice() {
            [] => {
                return Err(ResourceError::Usage(
                    "you must provide a resource and a resource name together".into(),
                ))
            }
            [resource] => self.mapping_for(resource).await?,
            _ => return Err(ResourceError::Usage("you must specify only one resource".into())),
        };

        let client = self.clients.client_for(&mapping.gvk.group_version())?;
        let namespace = self.by_name_namespace(&mapping)?;
        let items: Vec<Arc<Visitor>> = self
            .names
            .iter()
            .map(|name| {
                let info = Info::by_name(client.clone(), mapping.clone(), &namespace, name)
                    .with_subresource(&self.subresource);
                Arc::new(Visitor::Info(Box::new(info)))
            })
            .collect();

        Ok(ResourceResult::new(Visitor::List(items.clone()), items).with_flags(single_item_implied, true))
    }

    /// Namespace to look a named object up in.
    fn by_name_namespace(&self, mapping: &Mapping) -> Result<String, ResourceError> {
        if !mapping.is_namespaced() {
            return Ok(String::new());
        }
        if self.namespace.is_empty() {
            let message = if self.all_namespaces {
                "a resource cannot be retrieved by name across all namespaces"
            } else {
                "namespace may not be empty when retrieving a resource by name"
            };
            return Err(ResourceError::Usage(message.into()));
        }
        Ok(self.namespace.clone())
    }

    /// Distinct mappings for the type tokens, in input order.
    async fn resource_mappings(&self) -> Result<Vec<Mapping>, ResourceError> {
        let mut seen = BTreeSet::new();
        let mut mappings = Vec::new();
        for resource in &self.resources {
            let mapping = self.mapping_for(resource).await?;
            if seen.insert(mapping.gvk.clone()) {
                mappings.push(mapping);
            }
        }
        if mappings.len() > 1 && self.single_resource_type {
            return Err(ResourceError::Usage("you may only specify a single resource type".into()));
        }
        Ok(mappings)
    }

    /// Mapping per distinct tuple type token.
    async fn resource_tuple_mappings(&self) -> Result<BTreeMap<String, Mapping>, ResourceError> {
        let mut mappings = BTreeMap::new();
        let mut canonical = BTreeSet::new();
        for tuple in &self.resource_tuples {
            if mappings.contains_key(&tuple.resource) {
                continue;
            }
            let mapping = self.mapping_for(&tuple.resource).await?;
            canonical.insert(mapping.resource.clone());
            mappings.insert(tuple.resource.clone(), mapping);
        }
        if canonical.len() > 1 && self.single_resource_type {
            return Err(ResourceError::Usage("you may only specify a single resource type".into()));
        }
        Ok(mappings)
    }
}

/// Splits `a,b,a` into `[a, b]`, keeping first occurrences.
pub fn split_resource_argument(arg: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    arg.split(',')
        .filter(|s| seen.insert(*s))
        .map(str::to_string)
        .collect()
}

/// Whether `args` name individual objects.
pub fn has_names(args: &[&str]) -> Result<bool, ResourceError> {
    let args = normalize_multiple_resources_args(args);
    let combined = has_combined_type_args(&args)?;
    Ok(combined || args.len() > 1)
}

/// `a,b x y` becomes `a/x a/y b/x b/y`.
fn normalize_multiple_resources_args(args: &[&str]) -> Vec<String> {
    if let [types, names @ ..] = args {
        let resources = split_resource_argument(types);
        if !names.is_empty() && resources.len() > 1 {
            return resources
                .iter()
                .flat_map(|resource| names.iter().map(move |name| format!("{resource}/{name}")))
                .collect();
        }
    }
    args.iter().map(|a| a.to_string()).collect()
}

fn has_combined_type_args(args: &[String]) -> Result<bool, ResourceError> {
    let with_slash = args.iter().filter(|a| a.contains('/')).count();
    if with_slash == 0 {
        return Ok(false);
    }
    if with_slash != args.len() {
        return Err(ResourceError::Usage(
            "there is no need to specify a resource type as a separate argument when passing arguments in \
             resource/name form (e.g. 'cmd get resource/<resource_name>' instead of 'cmd get resource \
             resource/<resource_name>'"
                .into(),
        ));
    }
    Ok(true)
}

/// Reads `resource/name`; `None` when there is no slash.
fn split_resource_type_name(arg: &str) -> Result<Option<ResourceTuple>, ResourceError> {
    if !arg.contains('/') {
        return Ok(None);
    }
    let segments: Vec<&str> = arg.split('/').collect();
    let [resource, name] = segments.as_slice() else {
        return Err(ResourceError::Usage(
            "arguments in resource/name form may not have more than one slash".into(),
        ));
    };
    if resource.is_empty() || name.is_empty() || split_resource_argument(resource).len() != 1 {
        return Err(ResourceError::Usage(
            "arguments in resource/name form must have a single resource and name".into(),
        ));
    }
    Ok(Some(ResourceTuple {
        resource: resource.to_string(),
        name: name.to_string(),
    }))
}
