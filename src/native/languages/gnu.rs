use std::ffi::OsString;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::core::{
    domain::{BuildMeta, Language, PreparedSource, Runnable, SourceArtifact},
    errors::SpawnError,
    pipeline::compiling::invoke_compiler,
    traits::language::{BuildContext, CompileStatus, LanguageStrategy},
};

/// Ahead-of-time build through a GNU compiler driver. C and C++ differ only in
/// the driver binary, the file extension and the flags.
#[derive(Debug, Clone)]
pub struct GnuStrategy {
    language: Language,
    compiler: PathBuf,
    flags: Vec<OsString>,
}

impl GnuStrategy {
    pub fn cpp<P: AsRef<Path>>(gnucpp_path: P) -> Self {
        Self {
            language: Language::Cpp,
            compiler: gnucpp_path.as_ref().into(),
            flags: vec!["-std=c++17".into(), "-O2".into()],
        }
    }

    pub fn c<P: AsRef<Path>>(gcc_path: P) -> Self {
        Self {
            language: Language::C,
            compiler: gcc_path.as_ref().into(),
            flags: vec!["-O2".into()],
        }
    }

    fn binary_path(&self, source: &SourceArtifact, outputs_dir: &Path) -> PathBuf {
        outputs_dir.join(format!("{}.out", source.job_id))
    }
}

#[async_trait::async_trait]
impl LanguageStrategy for GnuStrategy {
    fn language(&self) -> Language {
        self.language
    }

    fn materialize(&self, job_id: Uuid, source: &str) -> PreparedSource {
        PreparedSource {
            file_name: format!("{}.{}", job_id, self.language.extension()),
            contents: source.to_string(),
            meta: BuildMeta::default(),
        }
    }

    fn artifacts(&self, source: &SourceArtifact, ctx: &BuildContext<'_>) -> Vec<PathBuf> {
        vec![self.binary_path(source, ctx.outputs_dir)]
    }

    async fn compile(
        &self,
        source: &SourceArtifact,
        ctx: &BuildContext<'_>,
    ) -> Result<CompileStatus, SpawnError> {
        let mut command = Runnable::new(&self.compiler)
            .arg(&source.path)
            .arg("-o")
            .arg(self.binary_path(source, ctx.outputs_dir));
        command.args.extend(self.flags.iter().cloned());

        invoke_compiler(&command, ctx).await
    }

    fn resolve_runnable(&self, source: &SourceArtifact, ctx: &BuildContext<'_>) -> Runnable {
        Runnable::new(self.binary_path(source, ctx.outputs_dir))
    }
}
