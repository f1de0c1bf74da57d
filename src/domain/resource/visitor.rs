//! The traversal primitive and its combinators.
//!
//! A [`Visitor`] walks some set of [`Info`]s and hands each to a
//! [`VisitorFn`]. Sources report per-item failures through the callback
//! (`Err(item_error)`) so the callback decides whether to stop; returning an
//! error from the callback stops every fail-fast visitor above it.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::Mutex;

use crate::core::client::resource_client::WatchStream;
use crate::core::mapping::rest_mapping::Mapping;
use crate::domain::resource::decorators::{Decorator, Disposition, FilterFunc};
use crate::domain::resource::flatten::FlattenFn;
use crate::domain::resource::info::Info;
use crate::domain::resource::info_mapper::InfoMapper;
use crate::domain::resource::selector_source::SelectorSource;
use crate::domain::resource::sources::{FileSource, StreamSource, UrlSource};
use crate::errors::{aggregate, ResourceError};

/// Callback invoked once per visited item.
#[async_trait]
pub trait VisitorFn: Send {
    async fn call(&mut self, item: Result<Info, ResourceError>) -> Result<(), ResourceError>;
}

#[async_trait]
impl<F> VisitorFn for F
where
    F: FnMut(Result<Info, ResourceError>) -> Result<(), ResourceError> + Send,
{
    async fn call(&mut self, item: Result<Info, ResourceError>) -> Result<(), ResourceError> {
        self(item)
    }
}

pub enum Visitor {
    /// A single already-addressed item.
    Info(Box<Info>),
    /// Children in order, stopping at the first error.
    List(Vec<Arc<Visitor>>),
    /// Every child, whatever fails; failures come back aggregated.
    Eager(Vec<Arc<Visitor>>),
    /// Up to `concurrency` children at a time.
    Concurrent {
        visitors: Vec<Arc<Visitor>>,
        concurrency: usize,
    },
    Decorated(Box<Visitor>, Vec<Decorator>),
    Filtered(Box<Visitor>, Vec<FilterFunc>),
    Flatten(Box<Visitor>, Arc<InfoMapper>),
    ContinueOnError(Box<Visitor>),
    File(FileSource),
    Stream(StreamSource),
    Url(UrlSource),
    Selector(SelectorSource),
}

impl Visitor {
    pub fn visit<'a>(&'a self, f: &'a mut dyn VisitorFn) -> BoxFuture<'a, Result<(), ResourceError>> {
        async move {
            match self {
                Visitor::Info(info) => f.call(Ok(info.as_ref().clone())).await,
                Visitor::List(children) => visit_sequential(children, f).await,
                Visitor::Eager(children) => {
                    let mut errors = Vec::new();
                    for child in children {
                        let mut collecting = CollectingFn::new(&mut *f);
                        let outcome = child.visit(&mut collecting).await;
                        errors.append(&mut collecting.errors);
                        if let Err(err) = outcome {
                            errors.push(err);
                        }
                    }
                    aggregate(errors)
                }
                Visitor::Concurrent { visitors, concurrency } => visit_concurrent(visitors, *concurrency, f).await,
                Visitor::Decorated(inner, decorators) => {
                    let mut decorated = DecoratedFn { decorators, inner: f };
                    inner.visit(&mut decorated).await
                }
                Visitor::Filtered(inner, filters) => {
                    let mut filtered = FilteredFn { filters, inner: f };
                    inner.visit(&mut filtered).await
                }
                Visitor::Flatten(inner, mapper) => {
                    let mut flatten = FlattenFn::new(mapper, f);
                    inner.visit(&mut flatten).await
                }
                Visitor::ContinueOnError(inner) => {
                    let mut collecting = CollectingFn::new(f);
                    let outcome = inner.visit(&mut collecting).await;
                    let mut errors = collecting.errors;
                    if let Err(err) = outcome {
                        errors.push(err);
                    }
                    if errors.len() == 1 {
                        return Err(errors.remove(0));
                    }
                    aggregate(errors)
                }
                Visitor::File(source) => source.visit(f).await,
                Visitor::Stream(source) => source.visit(f).await,
                Visitor::Url(source) => source.visit(f).await,
                Visitor::Selector(source) => source.visit(f).await,
            }
        }
        .boxed()
    }

    /// The single type this source is known to produce, if any.
    pub fn resource_mapping(&self) -> Option<&Mapping> {
        match self {
            Visitor::Info(info) => info.mapping.as_ref(),
            Visitor::Selector(source) => Some(source.mapping()),
            _ => None,
        }
    }

    /// Watches the source directly when it supports it; `None` otherwise.
    pub async fn watch(&self, resource_version: &str) -> Option<Result<WatchStream, ResourceError>> {
        match self {
            Visitor::Info(info) => Some(info.watch(resource_version).await),
            Visitor::Selector(source) => Some(source.watch(resource_version).await),
            _ => None,
        }
    }

    pub fn decorated(self, decorators: Vec<Decorator>) -> Self {
        Visitor::Decorated(Box::new(self), decorators)
    }

    pub fn filtered(self, filters: Vec<FilterFunc>) -> Self {
        Visitor::Filtered(Box::new(self), filters)
    }

    pub fn flattened(self, mapper: Arc<InfoMapper>) -> Self {
        Visitor::Flatten(Box::new(self), mapper)
    }

    pub fn continue_on_error(self) -> Self {
        Visitor::ContinueOnError(Box::new(self))
    }
}

async fn visit_sequential(children: &[Arc<Visitor>], f: &mut dyn VisitorFn) -> Result<(), ResourceError> {
    for child in children {
        child.visit(&mut *f).await?;
    }
    Ok(())
}

/// Children run interleaved inside the calling task; calls into `f` are
/// serialized. The first failure stops new children from starting, lets the
/// running ones finish and is the error returned.
async fn visit_concurrent(
    children: &[Arc<Visitor>],
    concurrency: usize,
    f: &mut dyn VisitorFn,
) -> Result<(), ResourceError> {
    if concurrency <= 1 || children.len() <= 1 {
        return visit_sequential(children, f).await;
    }

    let shared = Mutex::new(f);
    let mut queued = children.iter();
    let mut running = FuturesUnordered::new();
    for child in queued.by_ref().take(concurrency) {
        running.push(visit_serialized(child, &shared));
    }

    let mut first_error = None;
    while let Some(outcome) = running.next().await {
        match outcome {
            Err(err) => {
                first_error.get_or_insert(err);
            }
            Ok(()) if first_error.is_none() => {
                if let Some(child) = queued.next() {
                    running.push(visit_serialized(child, &shared));
                }
            }
            Ok(()) => {}
        }
    }
    first_error.map_or(Ok(()), Err)
}

async fn visit_serialized(child: &Visitor, shared: &Mutex<&mut dyn VisitorFn>) -> Result<(), ResourceError> {
    let mut serialized = SharedFn { shared };
    child.visit(&mut serialized).await
}

/// Records item and callback failures instead of stopping.
struct CollectingFn<'a> {
    inner: &'a mut dyn VisitorFn,
    errors: Vec<ResourceError>,
}

impl<'a> CollectingFn<'a> {
    fn new(inner: &'a mut dyn VisitorFn) -> Self {
        Self {
            inner,
            errors: Vec::new(),
        }
    }
}

#[async_trait]
impl<'a> VisitorFn for CollectingFn<'a> {
    async fn call(&mut self, item: Result<Info, ResourceError>) -> Result<(), ResourceError> {
        match item {
            Err(err) => self.errors.push(err),
            Ok(info) => {
                if let Err(err) = self.inner.call(Ok(info)).await {
                    self.errors.push(err);
                }
            }
        }
        Ok(())
    }
}

struct DecoratedFn<'a> {
    decorators: &'a [Decorator],
    inner: &'a mut dyn VisitorFn,
}

#[async_trait]
impl<'a> VisitorFn for DecoratedFn<'a> {
    async fn call(&mut self, item: Result<Info, ResourceError>) -> Result<(), ResourceError> {
        let mut info = item?;
        for decorator in self.decorators {
            if decorator.apply(&mut info).await? == Disposition::Drop {
                return Ok(());
            }
        }
        self.inner.call(Ok(info)).await
    }
}

struct FilteredFn<'a> {
    filters: &'a [FilterFunc],
    inner: &'a mut dyn VisitorFn,
}

#[async_trait]
impl<'a> VisitorFn for FilteredFn<'a> {
    async fn call(&mut self, item: Result<Info, ResourceError>) -> Result<(), ResourceError> {
        let info = item?;
        for filter in self.filters {
            if !filter(&info)? {
                return Ok(());
            }
        }
        self.inner.call(Ok(info)).await
    }
}

struct SharedFn<'s, 'f> {
    shared: &'s Mutex<&'f mut dyn VisitorFn>,
}

#[async_trait]
impl<'s, 'f> VisitorFn for SharedFn<'s, 'f> {
    async fn call(&mut self, item: Result<Info, ResourceError>) -> Result<(), ResourceError> {
        let mut inner = self.shared.lock().await;
        inner.call(item).await
    }
}
