//! The fixed sequence of wrappers applied to a resolved visitor before it is
//! handed to the caller.

use std::sync::Arc;

use crate::domain::resource::decorators::Decorator;
use crate::domain::resource::info_mapper::InfoMapper;
use crate::domain::resource::visitor::Visitor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Expand list objects into their members.
    Flatten,
    DefaultNamespace(String),
    RequireNamespace(String),
    /// Always present; an empty namespace only clears cluster-scoped items.
    FilterNamespace(String),
    RetrieveObject,
    ContinueOnError,
}

/// Policy switches read by [`FinalizePipeline::new`].
#[derive(Debug, Clone, Default)]
pub struct FinalizePolicy {
    pub flatten: bool,
    pub namespace: String,
    pub default_namespace: bool,
    pub require_namespace: bool,
    pub all_namespaces: bool,
    pub require_object: bool,
    pub continue_on_error: bool,
}

#[derive(Debug, Clone)]
pub struct FinalizePipeline {
    stages: Vec<Stage>,
}

impl FinalizePipeline {
    pub fn new(policy: &FinalizePolicy) -> Self {
        let mut stages = Vec::new();
        if policy.flatten {
            stages.push(Stage::Flatten);
        }
        if policy.default_namespace {
            stages.push(Stage::DefaultNamespace(policy.namespace.clone()));
        }
        if policy.require_namespace {
            stages.push(Stage::RequireNamespace(policy.namespace.clone()));
        }
        let filter = if policy.all_namespaces {
            String::new()
        } else {
            policy.namespace.clone()
        };
        stages.push(Stage::FilterNamespace(filter));
        if policy.require_object {
            stages.push(Stage::RetrieveObject);
        }
        if policy.continue_on_error {
            stages.push(Stage::ContinueOnError);
        }
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Wraps `visitor` in the stages. The error collector sits beneath the
    /// per-item hooks so that hook failures are collected as well.
    pub fn apply(&self, visitor: Visitor, mapper: Arc<InfoMapper>) -> Visitor {
        let mut visitor = visitor;
        let mut hooks = Vec::new();
        let mut collect_errors = false;

        for stage in &self.stages {
            match stage {
                Stage::Flatten => visitor = visitor.flattened(mapper.clone()),
                Stage::DefaultNamespace(ns) => hooks.push(Decorator::SetNamespace(ns.clone())),
                Stage::RequireNamespace(ns) => hooks.push(Decorator::RequireNamespace(ns.clone())),
                Stage::FilterNamespace(ns) => hooks.push(Decorator::FilterNamespace { namespace: ns.clone() }),
                Stage::RetrieveObject => hooks.push(Decorator::RetrieveLazy),
                Stage::ContinueOnError => collect_errors = true,
            }
        }

        if collect_errors {
            visitor = visitor.continue_on_error();
        }
        visitor.decorated(hooks)
    }
}
