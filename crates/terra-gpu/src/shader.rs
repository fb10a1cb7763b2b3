//! WGSL snippet resolution and per-stage source assembly.
//!
//! Kernel sources are stitched together from named snippets. For a stage
//! named `displace` the assembled text is `displace_args` (optional), then
//! every include in order, then `displace_body`. The snippets shipped with
//! the crate are compiled in via [`EmbeddedSnippets`]; [`DirectorySnippets`]
//! reads the same names from disk while iterating on shaders.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::PathBuf;

use log::debug;
use thiserror::Error;

/// Error types for shader assembly.
#[derive(Debug, Error, PartialEq)]
pub enum ShaderError {
    #[error("snippet '{snippet}' required by the {stage:?} stage was not found")]
    MissingSnippet {
        stage: PipelineStage,
        snippet: String,
    },
}

/// Provides snippet text by name.
pub trait SnippetSource {
    fn resolve_snippet(&self, name: &str) -> Option<Cow<'static, str>>;
}

/// Snippets compiled into the crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedSnippets;

const EMBEDDED: &[(&str, &str)] = &[
    ("deform_common", include_str!("shaders/deform_common.wgsl")),
    ("simplex2d", include_str!("shaders/simplex2d.wgsl")),
    ("terrain_height", include_str!("shaders/terrain_height.wgsl")),
    ("displace_args", include_str!("shaders/displace_args.wgsl")),
    ("displace_body", include_str!("shaders/displace_body.wgsl")),
    ("normals_args", include_str!("shaders/normals_args.wgsl")),
    ("normals_body", include_str!("shaders/normals_body.wgsl")),
];

impl SnippetSource for EmbeddedSnippets {
    fn resolve_snippet(&self, name: &str) -> Option<Cow<'static, str>> {
        EMBEDDED
            .iter()
            .find(|(snippet, _)| *snippet == name)
            .map(|(_, text)| Cow::Borrowed(*text))
    }
}

/// Snippets read from `<dir>/<name>.wgsl` on every lookup.
#[derive(Clone, Debug)]
pub struct DirectorySnippets {
    dir: PathBuf,
}

impl DirectorySnippets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SnippetSource for DirectorySnippets {
    fn resolve_snippet(&self, name: &str) -> Option<Cow<'static, str>> {
        let path = self.dir.join(format!("{name}.wgsl"));
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(Cow::Owned(text)),
            Err(err) => {
                debug!("Snippet '{}' unavailable at {:?}: {}", name, path, err);
                None
            }
        }
    }
}

/// Compute stages of the deformation pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    /// Per-vertex height displacement.
    Displacement,
    /// Per-triangle normal recomputation.
    NormalRecompute,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 2] = [PipelineStage::Displacement, PipelineStage::NormalRecompute];

    /// Kernel entry point inside the assembled module.
    pub fn entry_point(self) -> &'static str {
        match self {
            PipelineStage::Displacement => "displace_vertices",
            PipelineStage::NormalRecompute => "recompute_normals",
        }
    }

    /// Name of the pipeline-overridable constant holding the workgroup width.
    pub fn width_constant(self) -> &'static str {
        match self {
            PipelineStage::Displacement => "thread_width",
            PipelineStage::NormalRecompute => "group_width",
        }
    }

    /// Snippets the stage is assembled from.
    pub fn descriptor(self) -> StageDescriptor {
        match self {
            PipelineStage::Displacement => StageDescriptor {
                name: "displace",
                includes: &["deform_common", "simplex2d", "terrain_height"],
            },
            PipelineStage::NormalRecompute => StageDescriptor {
                name: "normals",
                includes: &["deform_common"],
            },
        }
    }
}

/// Snippet names making up one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageDescriptor {
    pub name: &'static str,
    pub includes: &'static [&'static str],
}

impl StageDescriptor {
    /// Assemble `<name>_args`, the includes, and `<name>_body`.
    pub fn assemble(
        &self,
        stage: PipelineStage,
        source: &dyn SnippetSource,
    ) -> Result<String, ShaderError> {
        let missing = |snippet: String| ShaderError::MissingSnippet { stage, snippet };

        let mut text = String::new();
        if let Some(args) = source.resolve_snippet(&format!("{}_args", self.name)) {
            text.push_str(&args);
            text.push('\n');
        }

        for include in self.includes {
            let snippet = source
                .resolve_snippet(include)
                .ok_or_else(|| missing(include.to_string()))?;
            text.push_str(&snippet);
            text.push('\n');
        }

        let body_name = format!("{}_body", self.name);
        let body = source
            .resolve_snippet(&body_name)
            .ok_or_else(|| missing(body_name))?;
        text.push_str(&body);

        Ok(text)
    }
}

/// Assemble the source text of every stage.
pub fn assemble_stages(
    source: &dyn SnippetSource,
) -> Result<BTreeMap<PipelineStage, String>, ShaderError> {
    let mut stages = BTreeMap::new();
    for stage in PipelineStage::ALL {
        let text = stage.descriptor().assemble(stage, source)?;
        debug!("Assembled {:?} kernel ({} bytes)", stage, text.len());
        stages.insert(stage, text);
    }
    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapSnippets(HashMap<&'static str, &'static str>);

    impl SnippetSource for MapSnippets {
        fn resolve_snippet(&self, name: &str) -> Option<Cow<'static, str>> {
            self.0.get(name).map(|text| Cow::Borrowed(*text))
        }
    }

    #[test]
    fn test_embedded_snippets_cover_every_stage() {
        for stage in PipelineStage::ALL {
            let descriptor = stage.descriptor();
            for include in descriptor.includes {
                assert!(EmbeddedSnippets.resolve_snippet(include).is_some());
            }
            let body = format!("{}_body", descriptor.name);
            assert!(EmbeddedSnippets.resolve_snippet(&body).is_some());
        }
    }

    #[test]
    fn test_assembled_stages_contain_entry_points() {
        let stages = assemble_stages(&EmbeddedSnippets).unwrap();
        assert_eq!(stages.len(), 2);
        for (stage, text) in &stages {
            assert!(text.contains(stage.entry_point()), "{stage:?}");
            assert!(text.contains(stage.width_constant()), "{stage:?}");
        }
        assert!(stages[&PipelineStage::Displacement].contains("fn simplex2d"));
        assert!(!stages[&PipelineStage::NormalRecompute].contains("fn simplex2d"));
    }

    #[test]
    fn test_assembly_order_is_args_includes_body() {
        let source = MapSnippets(HashMap::from([
            ("demo_args", "ARGS"),
            ("first", "ONE"),
            ("second", "TWO"),
            ("demo_body", "BODY"),
        ]));
        let descriptor = StageDescriptor {
            name: "demo",
            includes: &["first", "second"],
        };
        let text = descriptor
            .assemble(PipelineStage::Displacement, &source)
            .unwrap();
        assert_eq!(text, "ARGS\nONE\nTWO\nBODY");
    }

    #[test]
    fn test_args_snippet_is_optional() {
        let source = MapSnippets(HashMap::from([("demo_body", "BODY")]));
        let descriptor = StageDescriptor {
            name: "demo",
            includes: &[],
        };
        let text = descriptor
            .assemble(PipelineStage::NormalRecompute, &source)
            .unwrap();
        assert_eq!(text, "BODY");
    }

    #[test]
    fn test_missing_include_is_an_error() {
        let source = MapSnippets(HashMap::from([("demo_body", "BODY")]));
        let descriptor = StageDescriptor {
            name: "demo",
            includes: &["absent"],
        };
        assert_eq!(
            descriptor.assemble(PipelineStage::Displacement, &source),
            Err(ShaderError::MissingSnippet {
                stage: PipelineStage::Displacement,
                snippet: "absent".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_body_is_an_error() {
        let source = MapSnippets(HashMap::new());
        let err = assemble_stages(&source).unwrap_err();
        assert!(matches!(err, ShaderError::MissingSnippet { .. }));
    }

    #[test]
    fn test_directory_snippets_read_wgsl_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("custom.wgsl"), "// custom").unwrap();
        let source = DirectorySnippets::new(dir.path());
        assert_eq!(source.resolve_snippet("custom").as_deref(), Some("// custom"));
        assert!(source.resolve_snippet("missing").is_none());
    }
}
