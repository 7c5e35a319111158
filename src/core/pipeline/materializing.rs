use std::path::Path;

use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::core::{domain::SourceArtifact, traits::language::LanguageStrategy};

/// Writes the job's source into `codes_dir` under a name derived from the job
/// id. The returned path is known even when writing fails, so the caller can
/// still clean it up.
#[tracing::instrument(skip(strategy, source), fields(language = %strategy.language()))]
pub async fn materialize(
    strategy: &dyn LanguageStrategy,
    codes_dir: &Path,
    job_id: Uuid,
    source: &str,
) -> (SourceArtifact, std::io::Result<()>) {
    let prepared = strategy.materialize(job_id, source);
    let artifact = SourceArtifact {
        job_id,
        path: codes_dir.join(&prepared.file_name),
        meta: prepared.meta,
    };

    let written = write_source(&artifact.path, &prepared.contents).await;
    match &written {
        Ok(()) => tracing::debug!(path = %artifact.path.display(), "Source materialized"),
        Err(e) => tracing::error!(path = %artifact.path.display(), "Failed to write source: {}", e),
    }

    (artifact, written)
}

async fn write_source(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use futures::StreamExt;

    use super::*;
    use crate::core::domain::Language;
    use crate::native::languages::{gnu::GnuStrategy, java::JavaStrategy};

    #[tokio::test]
    async fn test_materialize_writes_source_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = GnuStrategy::cpp("g++");
        let job_id = Uuid::new_v4();
        let source = "int main() { return 0; }\n";

        let (artifact, written) = materialize(&strategy, dir.path(), job_id, source).await;

        written.unwrap();
        assert_eq!(artifact.path, dir.path().join(format!("{}.cpp", job_id)));
        assert_eq!(std::fs::read_to_string(&artifact.path).unwrap(), source);
        assert!(artifact.meta.class_name.is_none());
    }

    #[tokio::test]
    async fn test_materialize_reports_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let codes_dir = dir.path().join("missing");
        let strategy = GnuStrategy::c("gcc");

        let (artifact, written) =
            materialize(&strategy, &codes_dir, Uuid::new_v4(), "int main(){}").await;

        assert!(written.is_err());
        assert!(artifact.path.starts_with(&codes_dir));
    }

    #[tokio::test]
    async fn test_concurrent_materializations_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = JavaStrategy::new("javac", "java");
        let source = "public class Main { public static void main(String[] a) {} }";

        let paths: HashSet<_> = futures::stream::iter(0..1000)
            .map(|_| async {
                let (artifact, written) =
                    materialize(&strategy, dir.path(), Uuid::new_v4(), source).await;
                written.unwrap();
                artifact.path
            })
            .buffer_unordered(128)
            .collect()
            .await;

        assert_eq!(paths.len(), 1000);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1000);
        assert_eq!(strategy.language(), Language::Java);
    }
}
