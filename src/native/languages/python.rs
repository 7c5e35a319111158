use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::core::{
    domain::{BuildMeta, Language, PreparedSource, Runnable, SourceArtifact},
    traits::language::{BuildContext, LanguageStrategy},
};

#[derive(Debug, Clone)]
pub struct PythonStrategy {
    interpreter: PathBuf,
}

impl PythonStrategy {
    pub fn new<P: AsRef<Path>>(interpreter: P) -> Self {
        Self {
            interpreter: interpreter.as_ref().into(),
        }
    }
}

impl LanguageStrategy for PythonStrategy {
    fn language(&self) -> Language {
        Language::Python
    }

    fn materialize(&self, job_id: Uuid, source: &str) -> PreparedSource {
        PreparedSource {
            file_name: format!("{}.py", job_id),
            contents: source.to_string(),
            meta: BuildMeta::default(),
        }
    }

    fn resolve_runnable(&self, source: &SourceArtifact, _ctx: &BuildContext<'_>) -> Runnable {
        Runnable::new(&self.interpreter).arg(&source.path)
    }
}
