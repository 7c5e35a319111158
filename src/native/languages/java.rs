use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use uuid::Uuid;

use crate::core::{
    domain::{BuildMeta, Language, PreparedSource, Runnable, SourceArtifact},
    errors::SpawnError,
    pipeline::compiling::invoke_compiler,
    traits::language::{BuildContext, CompileStatus, LanguageStrategy},
};

static PUBLIC_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"public\s+class\s+(\w+)").unwrap());
static MAIN_METHOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"static\s+void\s+main\s*\(").unwrap());
static ANY_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bclass\s+(\w+)").unwrap());

/// javac compiles into a per-job class directory, `java` launches the
/// renamed public class from it.
#[derive(Debug, Clone)]
pub struct JavaStrategy {
    javac: PathBuf,
    java: PathBuf,
}

impl JavaStrategy {
    pub fn new<T, U>(javac: T, java: U) -> Self
    where
        T: AsRef<Path>,
        U: AsRef<Path>,
    {
        Self {
            javac: javac.as_ref().into(),
            java: java.as_ref().into(),
        }
    }

    fn class_dir(&self, source: &SourceArtifact, outputs_dir: &Path) -> PathBuf {
        outputs_dir.join(source.job_id.to_string())
    }
}

/// Class name derived from the job id, valid as a Java identifier.
pub fn safe_class_name(job_id: Uuid) -> String {
    format!("Class_{}", job_id.to_string().replace('-', "_"))
}

/// Makes the entry-point class match the generated file name.
///
/// A `public class` is renamed. Otherwise, if there is a `main` method, the
/// first declared class is renamed, and if there is no class at all the body
/// is wrapped in one. Whole-word references to a renamed class follow the
/// rename. String, char and text block literals and comments are left as is.
pub fn rewrite_entry_class(source: &str, class_name: &str) -> String {
    let segments = split_segments(source);
    let code: String = segments
        .iter()
        .map(|segment| match segment {
            Segment::Code(text) => *text,
            Segment::Verbatim(_) => " ",
        })
        .collect();

    if let Some(caps) = PUBLIC_CLASS.captures(&code) {
        return rename_class(&segments, &caps[1], class_name);
    }
    if MAIN_METHOD.is_match(&code) {
        if let Some(caps) = ANY_CLASS.captures(&code) {
            return rename_class(&segments, &caps[1], class_name);
        }
    }
    format!("public class {} {{\n{}\n}}", class_name, source)
}

fn rename_class(segments: &[Segment<'_>], old: &str, new: &str) -> String {
    let references = match Regex::new(&format!(r"\b{}\b", regex::escape(old))) {
        Ok(references) => references,
        Err(e) => {
            tracing::warn!("Cannot rename class {}: {}", old, e);
            return segments.iter().map(Segment::text).collect();
        }
    };

    segments
        .iter()
        .map(|segment| match segment {
            Segment::Code(text) => references.replace_all(text, NoExpand(new)),
            Segment::Verbatim(text) => (*text).into(),
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Segment<'a> {
    Code(&'a str),
    /// Literal or comment.
    Verbatim(&'a str),
}

impl<'a> Segment<'a> {
    fn text(&self) -> &'a str {
        match self {
            Segment::Code(text) | Segment::Verbatim(text) => text,
        }
    }
}

/// Splits source into code and literal/comment spans. Every delimiter is ASCII,
/// so all cuts land on char boundaries. Unterminated spans run to the end.
fn split_segments(source: &str) -> Vec<Segment<'_>> {
    let bytes = source.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let end = match (bytes[i], bytes.get(i + 1)) {
            (b'/', Some(&b'/')) => source[i..].find('\n').map_or(bytes.len(), |n| i + n),
            (b'/', Some(&b'*')) => source[i + 2..]
                .find("*/")
                .map_or(bytes.len(), |n| i + 2 + n + 2),
            (b'"', _) if source[i..].starts_with("\"\"\"") => closing(bytes, i + 3, b"\"\"\""),
            (b'"', _) => closing(bytes, i + 1, b"\""),
            (b'\'', _) => closing(bytes, i + 1, b"'"),
            _ => {
                i += 1;
                continue;
            }
        };

        if start < i {
            segments.push(Segment::Code(&source[start..i]));
        }
        segments.push(Segment::Verbatim(&source[i..end]));
        start = end;
        i = end;
    }

    if start < bytes.len() {
        segments.push(Segment::Code(&source[start..]));
    }
    segments
}

/// Index just past `delim`, honoring backslash escapes.
fn closing(bytes: &[u8], mut i: usize, delim: &[u8]) -> usize {
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
        } else if bytes[i..].starts_with(delim) {
            return i + delim.len();
        } else {
            i += 1;
        }
    }
    bytes.len()
}

#[async_trait::async_trait]
impl LanguageStrategy for JavaStrategy {
    fn language(&self) -> Language {
        Language::Java
    }

    fn materialize(&self, job_id: Uuid, source: &str) -> PreparedSource {
        let class_name = safe_class_name(job_id);
        PreparedSource {
            file_name: format!("{}.java", class_name),
            contents: rewrite_entry_class(source, &class_name),
            meta: BuildMeta {
                class_name: Some(class_name),
            },
        }
    }

    fn artifacts(&self, source: &SourceArtifact, ctx: &BuildContext<'_>) -> Vec<PathBuf> {
        vec![self.class_dir(source, ctx.outputs_dir)]
    }

    async fn compile(
        &self,
        source: &SourceArtifact,
        ctx: &BuildContext<'_>,
    ) -> Result<CompileStatus, SpawnError> {
        let class_dir = self.class_dir(source, ctx.outputs_dir);
        tokio::fs::create_dir_all(&class_dir)
            .await
            .map_err(|e| SpawnError {
                program: self.javac.display().to_string(),
                msg: format!("cannot create {}: {}", class_dir.display(), e),
            })?;

        let command = Runnable::new(&self.javac)
            .arg("-encoding")
            .arg("UTF-8")
            .arg("-d")
            .arg(class_dir)
            .arg(&source.path);

        invoke_compiler(&command, ctx).await
    }

    fn resolve_runnable(&self, source: &SourceArtifact, ctx: &BuildContext<'_>) -> Runnable {
        let class_name = source.meta.class_name.clone().unwrap_or_else(|| {
            source
                .path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        Runnable::new(&self.java)
            .arg("-cp")
            .arg(self.class_dir(source, ctx.outputs_dir))
            .arg(class_name)
    }
}
