//! Metadata builder
//!
//! Merges a technology subtree's base descriptor and its discovered
//! context fragments into one `metadata.yaml`. The merge is text-level:
//! fragment lines are spliced under a `contexts:` block with positional
//! indentation, `script:` references are rewritten to be root-relative,
//! and `dockerInfo.yaml` descriptors are injected after their context.

use regex::Regex;

use techpack_fs::{DocumentStore, NormalizedPath, TreeMarker, io};
use techpack_meta::{DockerInfo, MergeItem, TechnologySubtree};

use crate::Result;

/// Merges fragment trees into technology metadata documents.
pub struct MetadataBuilder {
    store: DocumentStore,
    script_line: Regex,
}

impl MetadataBuilder {
    pub fn new() -> Self {
        Self {
            store: DocumentStore::new(),
            // `script: ./x` or `script: ../x`, plain or as a list item
            script_line: Regex::new(r"^(?P<prefix>\s*(?:- )?script: )(?P<path>\.\.?/.*)$")
                .expect("script line pattern is valid"),
        }
    }

    /// Build one technology's metadata document and write it to
    /// `<technology root>/metadata.yaml`, overwriting any previous run.
    pub fn build(&self, subtree: &TechnologySubtree) -> Result<NormalizedPath> {
        let rendered = self.render(subtree)?;
        let output = subtree.root.join(TreeMarker::Metadata.as_str());
        io::write_text(&output, &rendered)?;
        tracing::info!(technology = %subtree.name, output = %output, "built metadata document");
        Ok(output)
    }

    /// Render the merged document without writing it.
    pub fn render(&self, subtree: &TechnologySubtree) -> Result<String> {
        let base = self.read_fragment(&subtree.base_file)?;

        let mut out = String::with_capacity(base.len() + 256);
        out.push_str(base.trim_end_matches('\n'));
        out.push('\n');
        out.push_str("contexts:\n");

        for item in &subtree.items {
            match item {
                MergeItem::InnerContextsHeader { depth } => {
                    out.push_str(&indent(*depth));
                    out.push_str("innerContexts:\n");
                }
                MergeItem::Context {
                    rel_dir,
                    context_file,
                    depth,
                    docker_info,
                } => {
                    let text = self.read_fragment(context_file)?;
                    self.emit_fragment(&mut out, &text, rel_dir, *depth);
                    if let Some(docker_file) = docker_info {
                        let info: DockerInfo = self.store.load(docker_file)?;
                        emit_docker_info(&mut out, &info, *depth);
                    }
                }
            }
        }

        Ok(out)
    }

    /// Read and validate one fragment file.
    ///
    /// The file must exist, carry a `.yaml`/`.yml` extension, and parse as
    /// YAML (the ambiguous-scalar guard applies). Anything else fails the
    /// enclosing technology's build.
    fn read_fragment(&self, path: &NormalizedPath) -> Result<String> {
        match path.extension() {
            Some("yaml") | Some("yml") => {}
            other => {
                return Err(techpack_meta::Error::MalformedFragment {
                    path: path.to_native(),
                    reason: format!("unexpected extension {:?}", other.unwrap_or("")),
                }
                .into());
            }
        }
        if !path.is_file() {
            return Err(techpack_meta::Error::MalformedFragment {
                path: path.to_native(),
                reason: "file not found".into(),
            }
            .into());
        }

        let text = io::read_text(path)?;
        let _: serde_yaml::Value = self.store.parse_yaml(&text, path)?;
        Ok(text)
    }

    /// Splice one fragment's lines under the `contexts:` block.
    ///
    /// The first line gets the list-item marker, continuation lines plain
    /// spacing. Blank lines are kept blank.
    fn emit_fragment(&self, out: &mut String, text: &str, rel_dir: &str, depth: usize) {
        let indent = indent(depth);
        let mut first = true;
        for line in text.lines() {
            if line.trim().is_empty() {
                if !first {
                    out.push('\n');
                }
                continue;
            }
            let line = self.rewrite_script_line(line, rel_dir);
            out.push_str(&indent);
            if first {
                out.push_str("- ");
                first = false;
            } else {
                out.push_str("  ");
            }
            out.push_str(&line);
            out.push('\n');
        }
    }

    fn rewrite_script_line(&self, line: &str, rel_dir: &str) -> String {
        match self.script_line.captures(line) {
            Some(caps) => format!(
                "{}{}",
                &caps["prefix"],
                rewrite_script_path(&caps["path"], rel_dir)
            ),
            None => line.to_string(),
        }
    }
}

impl Default for MetadataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Rewrite a fragment-relative script path to be technology-root-relative.
///
/// `./x` is prefixed with the fragment's own relative directory; each
/// leading `../` resolves against that directory first.
pub(crate) fn rewrite_script_path(path: &str, rel_dir: &str) -> String {
    let mut base: Vec<&str> = rel_dir.split('/').filter(|s| !s.is_empty()).collect();
    let mut rest = path;

    if let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    } else {
        while let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped;
            base.pop();
        }
    }

    if base.is_empty() {
        format!("./{rest}")
    } else {
        format!("./{}/{rest}", base.join("/"))
    }
}

fn emit_docker_info(out: &mut String, info: &DockerInfo, depth: usize) {
    let indent = indent(depth + 1);
    out.push_str(&format!("{indent}dockerInfo:\n"));
    out.push_str(&format!("{indent}  image: \"{}\"\n", info.image));
    out.push_str(&format!("{indent}  baseTag: \"{}\"\n", info.base_tag));
    out.push_str(&format!("{indent}  version: \"{}\"\n", info.version));
}
