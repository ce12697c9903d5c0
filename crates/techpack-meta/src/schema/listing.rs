//! Listing projection of technology metadata
//!
//! A flattened, output-only view exposing docker image references. The
//! projection traverses contexts and exactly two nested inner-context
//! levels; it is never round-tripped back into the build model.

use serde::Serialize;

use super::{Context, TechnologyDescriptor};

/// Number of inner-context levels the listing traversal descends.
const LISTING_INNER_DEPTH: usize = 2;

/// Listing entry for one technology
#[derive(Debug, Clone, Serialize)]
pub struct ListingEntry {
    /// Technology directory name
    pub technology: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<ListingContext>,
}

/// Listing view of one context
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Full docker image reference, when the context carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inner_contexts: Vec<ListingContext>,
}

impl ListingEntry {
    /// Project a technology descriptor into its listing form.
    pub fn project(technology: &str, descriptor: &TechnologyDescriptor) -> Self {
        Self {
            technology: technology.to_string(),
            contexts: descriptor
                .contexts
                .iter()
                .map(|ctx| project_context(ctx, 0))
                .collect(),
        }
    }

    /// Every docker reference in this entry, in document order.
    pub fn image_references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        for ctx in &self.contexts {
            collect_references(ctx, &mut refs);
        }
        refs
    }
}

fn project_context(ctx: &Context, level: usize) -> ListingContext {
    let inner_contexts = if level < LISTING_INNER_DEPTH {
        ctx.inner_contexts
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|inner| project_context(inner, level + 1))
            .collect()
    } else {
        Vec::new()
    };

    ListingContext {
        id: ctx.id.clone(),
        docker: ctx.docker_info.as_ref().map(|info| info.reference()),
        inner_contexts,
    }
}

fn collect_references<'a>(ctx: &'a ListingContext, refs: &mut Vec<&'a str>) {
    if let Some(docker) = &ctx.docker {
        refs.push(docker);
    }
    for inner in &ctx.inner_contexts {
        collect_references(inner, refs);
    }
}
