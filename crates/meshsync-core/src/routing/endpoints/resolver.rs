use meshsync_types::models::{
    ClusterLoadAssignment, LbEndpoint, LocalityLbEndpoints, RoutingPolicy, ServiceTagsConfig,
};
use std::sync::Arc;
use tracing::trace;

/// Filters a service's endpoint view by a client group's preferred tags.
///
/// Unchanged parts of the view are handed back as the same allocations, so
/// callers can compare results with `Arc::ptr_eq`.
#[derive(Debug, Clone, Copy)]
pub struct EndpointSetResolver {
    enabled: bool,
}

impl EndpointSetResolver {
    pub fn new(service_tags: &ServiceTagsConfig) -> Self {
        Self { enabled: service_tags.is_auto_routing_enabled() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn resolve(
        &self,
        view: &Arc<ClusterLoadAssignment>,
        policy: &RoutingPolicy,
    ) -> Arc<ClusterLoadAssignment> {
        if !self.enabled || !policy.auto_service_tag {
            return Arc::clone(view);
        }

        let winner = policy
            .service_tag_preference
            .iter()
            .find(|tag| view.endpoints.iter().any(|l| l.lb_endpoints.iter().any(|e| e.has_tag(tag))));

        let Some(tag) = winner else {
            if policy.fallback_to_any_instance {
                trace!(cluster = %view.cluster_name, "[Resolver] no preferred tag present, serving all");
                return Arc::clone(view);
            }
            trace!(cluster = %view.cluster_name, "[Resolver] no preferred tag present, serving none");
            return Arc::new(filtered(view, |_| false));
        };

        trace!(cluster = %view.cluster_name, tag = %tag, "[Resolver] filtering by tag");
        let resolved = filtered(view, |endpoint| endpoint.has_tag(tag));
        if resolved.endpoints.iter().zip(&view.endpoints).all(|(new, old)| Arc::ptr_eq(new, old)) {
            return Arc::clone(view);
        }
        Arc::new(resolved)
    }
}

fn filtered<F>(view: &ClusterLoadAssignment, keep: F) -> ClusterLoadAssignment
where
    F: Fn(&LbEndpoint) -> bool,
{
    let endpoints = view.endpoints.iter().map(|locality| partition(locality, &keep)).collect();
    ClusterLoadAssignment::new(view.cluster_name.clone(), endpoints)
}

fn partition<F>(locality: &Arc<LocalityLbEndpoints>, keep: &F) -> Arc<LocalityLbEndpoints>
where
    F: Fn(&LbEndpoint) -> bool,
{
    let kept: Vec<Arc<LbEndpoint>> =
        locality.lb_endpoints.iter().filter(|endpoint| keep(endpoint)).cloned().collect();

    if kept.len() == locality.lb_endpoints.len() {
        // all matched, or nothing there to begin with
        return Arc::clone(locality);
    }
    Arc::new(locality.with_endpoints(kept))
}
