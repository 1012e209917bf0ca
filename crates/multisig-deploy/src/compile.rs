/// Compiles the Solidity sources with solc and writes the results in the
/// hardhat artifact layout so that `ArtifactStore` can read them back.
use std::path::PathBuf;

use ethers_solc::{error::SolcError, Artifact, Project, ProjectPathsConfig, Solc, SolcConfig};
use tracing::info;

use crate::{
    artifacts::{ArtifactStore, ContractArtifact, ARTIFACT_FORMAT},
    config::{CompilerProfile, PathsConfig},
    error::CompilationError,
};

/// Turns sources into deployable artifacts.
pub trait Compiler {
    fn compile(&self) -> Result<Vec<ContractArtifact>, CompilationError>;
}

/// A compiler backed by a pinned solc release. The release is installed with
/// svm the first time it's needed.
///
/// NOTE: Installing solc uses a blocking http client, so this must not be
/// called directly from an async context.
#[derive(Clone, Debug)]
pub struct SolcCompiler {
    profile: CompilerProfile,
    paths: PathsConfig,
}

impl SolcCompiler {
    pub fn new(profile: CompilerProfile, paths: PathsConfig) -> Self {
        Self { profile, paths }
    }

    /// Compiles the sources and writes an artifact per contract. Returns the
    /// paths of the written artifacts.
    pub fn compile_to(&self, store: &ArtifactStore) -> Result<Vec<PathBuf>, CompilationError> {
        let mut written = vec![];
        for artifact in self.compile()? {
            written.push(store.write(&artifact)?);
        }
        info!(count = written.len(), "wrote artifacts");
        Ok(written)
    }

    /// The standard-json input of a source and its dependencies together with
    /// the long compiler version, which is what block explorers verify.
    pub fn verification_input(
        &self,
        source_name: &str,
    ) -> Result<(String, String), CompilationError> {
        let project = self.project()?;
        let input = project.standard_json_input(project.paths.root.join(source_name))?;
        let version = project.solc.version()?;
        let commit = version
            .build
            .as_str()
            .split('.')
            .take(2)
            .collect::<Vec<_>>()
            .join(".");
        let long_version = format!(
            "v{}.{}.{}+{}",
            version.major, version.minor, version.patch, commit
        );
        Ok((serde_json::to_string(&input)?, long_version))
    }

    fn project(&self) -> Result<Project, SolcError> {
        let paths = ProjectPathsConfig::builder()
            .root(&self.paths.root)
            .sources(self.paths.sources_dir())
            .artifacts(self.paths.artifacts_dir())
            .cache(self.paths.cache_dir().join("solidity-files-cache.json"))
            .build()?;

        let mut settings = ethers_solc::artifacts::Settings::default();
        settings.optimizer.enabled = Some(self.profile.optimizer.enabled);
        settings.optimizer.runs = Some(self.profile.optimizer.runs);

        let solc = Solc::find_or_install_svm_version(&self.profile.version)?;
        Project::builder()
            .paths(paths)
            .solc_config(SolcConfig::builder().settings(settings).build())
            .solc(solc)
            .no_auto_detect()
            .no_artifacts()
            .ephemeral()
            .build()
    }
}

impl Compiler for SolcCompiler {
    fn compile(&self) -> Result<Vec<ContractArtifact>, CompilationError> {
        info!(
            version = %self.profile.version,
            optimizer = self.profile.optimizer.enabled,
            runs = self.profile.optimizer.runs,
            "compiling contracts"
        );
        let project = self.project()?;
        let root = project.paths.root.clone();
        let output = project.compile()?;
        if output.has_compiler_errors() {
            return Err(CompilationError::Diagnostics(output.to_string()));
        }

        let mut artifacts = vec![];
        for (id, artifact) in output.into_artifacts() {
            let abi = match artifact.get_abi() {
                Some(abi) => abi.into_owned(),
                None => continue,
            };
            let source_name = id
                .source
                .strip_prefix(&root)
                .unwrap_or(&id.source)
                .to_string_lossy()
                .into_owned();
            artifacts.push(ContractArtifact {
                format: ARTIFACT_FORMAT.to_string(),
                contract_name: id.name,
                source_name,
                abi,
                bytecode: artifact
                    .get_bytecode_bytes()
                    .map(|b| b.into_owned())
                    .unwrap_or_default(),
                deployed_bytecode: artifact
                    .get_deployed_bytecode_bytes()
                    .map(|b| b.into_owned())
                    .unwrap_or_default(),
            });
        }
        Ok(artifacts)
    }
}
