//! Promotion engine
//!
//! Given a target version, rewrites the pre-release version suffixes
//! embedded in metadata documents and docker-info fragments, and drives
//! pull → tag → push against the registry for every matching image.
//!
//! The two passes deliberately do not observe each other: which images to
//! promote is decided from the structurally parsed, pre-rewrite document,
//! while the rewrite itself is a line-targeted text edit that leaves every
//! untouched line byte-for-byte intact.

mod registry;

pub use registry::{DockerCliClient, RegistryAuth, RegistryClient, TRANSFER_TIMEOUT};

use techpack_fs::{DocumentStore, NormalizedPath, io};
use techpack_meta::{Context, Scanner, TechnologyDescriptor};

use crate::Result;

/// Inner-context levels the promotion visit descends, matching the
/// listing traversal.
const PROMOTE_INNER_DEPTH: usize = 2;

/// The target version with `+` replaced by `_`, matching container tag
/// character restrictions.
pub fn docker_formatted_version(target: &str) -> String {
    target.replace('+', "_")
}

/// The target version up to its first `+`.
pub fn release_version(target: &str) -> &str {
    target.split('+').next().unwrap_or(target)
}

/// One pull/tag/push to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionAction {
    /// Pre-release reference to pull
    pub pre_release: String,
    /// Image name for the tag call
    pub image: String,
    /// Release tag (`baseTag-newVersion`)
    pub release_tag: String,
    /// Release reference to push
    pub release: String,
}

/// The registry work one promotion run will perform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionPlan {
    pub actions: Vec<PromotionAction>,
}

/// Drives version rewriting and registry promotion over a root tree of
/// built metadata documents.
pub struct PromotionEngine {
    scanner: Scanner,
    store: DocumentStore,
    registry: Box<dyn RegistryClient>,
}

impl PromotionEngine {
    pub fn new(root: NormalizedPath, registry: Box<dyn RegistryClient>) -> Self {
        Self {
            scanner: Scanner::new(root),
            store: DocumentStore::new(),
            registry,
        }
    }

    /// Rewrite pre-release version suffixes everywhere, without touching
    /// the registry.
    ///
    /// Metadata documents get the line-targeted rewrite; standalone
    /// docker-info fragments get whole-file substring replacement.
    /// Re-running against already-rewritten files is a no-op: the
    /// pre-release suffix no longer matches.
    pub fn fix_version(&self, target: &str) -> Result<()> {
        let formatted = docker_formatted_version(target);
        let release = release_version(target);

        for subtree in self.scanner.scan()? {
            if let Some(metadata) = subtree.metadata_file() {
                self.rewrite_metadata(&metadata, &formatted, release)?;
            }
        }
        self.rewrite_docker_fragments(&formatted, release)
    }

    /// Compute the registry work for `target` from the current (pre-rewrite)
    /// metadata documents, in traversal order.
    pub fn plan(&self, target: &str) -> Result<PromotionPlan> {
        let formatted = docker_formatted_version(target);
        let release = release_version(target);

        let mut plan = PromotionPlan::default();
        for subtree in self.scanner.scan()? {
            if let Some(metadata) = subtree.metadata_file() {
                let descriptor: TechnologyDescriptor = self.store.load(&metadata)?;
                collect_actions(&descriptor, &formatted, release, &mut plan.actions);
            }
        }
        Ok(plan)
    }

    /// Execute a previously computed plan: pull, tag, push, per action.
    pub fn execute(&self, plan: &PromotionPlan) -> Result<()> {
        for action in &plan.actions {
            tracing::info!(
                from = %action.pre_release,
                to = %action.release,
                "promoting image"
            );
            self.registry.pull(&action.pre_release)?;
            self.registry
                .tag(&action.pre_release, &action.image, &action.release_tag)?;
            self.registry.push(&action.release)?;
        }
        Ok(())
    }

    /// Promote `target` file by file: parse the document, rewrite its
    /// version lines, then pull/tag/push its matching images.
    ///
    /// Each file is fully rewritten before its own registry operations;
    /// cross-file ordering follows the scanner's traversal order.
    pub fn promote(&self, target: &str) -> Result<()> {
        let formatted = docker_formatted_version(target);
        let release = release_version(target);

        for subtree in self.scanner.scan()? {
            let Some(metadata) = subtree.metadata_file() else {
                continue;
            };

            // decision parse happens before the rewrite
            let text = io::read_text(&metadata)?;
            let descriptor: TechnologyDescriptor = self.store.parse_yaml(&text, &metadata)?;

            let (rewritten, changed) = rewrite_version_lines(&text, &formatted, release);
            if changed {
                io::write_text(&metadata, &rewritten)?;
                tracing::info!(file = %metadata, "rewrote pre-release version suffixes");
            }

            let mut actions = Vec::new();
            collect_actions(&descriptor, &formatted, release, &mut actions);
            self.execute(&PromotionPlan { actions })?;
        }

        self.rewrite_docker_fragments(&formatted, release)
    }

    fn rewrite_metadata(
        &self,
        metadata: &NormalizedPath,
        formatted: &str,
        release: &str,
    ) -> Result<()> {
        let text = io::read_text(metadata)?;
        let (rewritten, changed) = rewrite_version_lines(&text, formatted, release);
        if changed {
            io::write_text(metadata, &rewritten)?;
            tracing::info!(file = %metadata, "rewrote pre-release version suffixes");
        }
        Ok(())
    }

    fn rewrite_docker_fragments(&self, formatted: &str, release: &str) -> Result<()> {
        let old_suffix = format!("-{formatted}");
        let new_suffix = format!("-{release}");
        for fragment in self.scanner.docker_fragments()? {
            let text = io::read_text(&fragment)?;
            if text.contains(&old_suffix) {
                io::write_text(&fragment, &text.replace(&old_suffix, &new_suffix))?;
                tracing::info!(file = %fragment, "rewrote docker-info fragment");
            }
        }
        Ok(())
    }
}

/// Collect the promotion actions for one document: every `dockerInfo` at
/// the context level and both inner-context levels whose version ends
/// with the docker-formatted target.
fn collect_actions(
    descriptor: &TechnologyDescriptor,
    formatted: &str,
    release: &str,
    actions: &mut Vec<PromotionAction>,
) {
    fn visit(ctx: &Context, level: usize, formatted: &str, release: &str, actions: &mut Vec<PromotionAction>) {
        if let Some(info) = &ctx.docker_info
            && info.version.ends_with(formatted)
        {
            actions.push(PromotionAction {
                pre_release: info.reference(),
                image: info.image.clone(),
                release_tag: info.promoted_tag(release),
                release: info.promoted_reference(release),
            });
        }
        if level < PROMOTE_INNER_DEPTH {
            for inner in ctx.inner_contexts.as_deref().unwrap_or_default() {
                visit(inner, level + 1, formatted, release, actions);
            }
        }
    }

    for ctx in &descriptor.contexts {
        visit(ctx, 0, formatted, release, actions);
    }
}

/// Rewrite `version:` lines whose value ends with `-<formatted>`,
/// replacing that suffix with `-<release>`. Every other line, and all
/// line endings, are preserved byte-for-byte.
pub(crate) fn rewrite_version_lines(
    text: &str,
    formatted: &str,
    release: &str,
) -> (String, bool) {
    let old_suffix = format!("-{formatted}");
    let new_suffix = format!("-{release}");

    let mut out = String::with_capacity(text.len());
    let mut changed = false;

    for piece in text.split_inclusive('\n') {
        let (content, ending) = match piece.strip_suffix("\r\n") {
            Some(content) => (content, "\r\n"),
            None => match piece.strip_suffix('\n') {
                Some(content) => (content, "\n"),
                None => (piece, ""),
            },
        };
        match rewrite_version_line(content, &old_suffix, &new_suffix) {
            Some(rewritten) => {
                out.push_str(&rewritten);
                changed = true;
            }
            None => out.push_str(content),
        }
        out.push_str(ending);
    }

    (out, changed)
}

fn rewrite_version_line(content: &str, old_suffix: &str, new_suffix: &str) -> Option<String> {
    let trimmed = content.trim_start();
    let value = trimmed.strip_prefix("version: ")?;
    let indent = &content[..content.len() - trimmed.len()];

    let (inner, quoted) = if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        (&value[1..value.len() - 1], true)
    } else {
        (value, false)
    };
    let kept = inner.strip_suffix(old_suffix)?;

    Some(if quoted {
        format!("{indent}version: \"{kept}{new_suffix}\"")
    } else {
        format!("{indent}version: {kept}{new_suffix}")
    })
}
