use async_trait::async_trait;
use clcore::{FileStager, GenesisArtifacts, KeystoreDirpaths, SharedPath, StagingError};
use std::fs;
use std::path::Path;

pub const GENESIS_CONFIG_YML_REL_FILEPATH: &str = "genesis-config.yml";
pub const GENESIS_SSZ_REL_FILEPATH: &str = "genesis.ssz";
pub const VALIDATOR_KEYS_REL_DIRPATH: &str = "validator-keys";
pub const VALIDATOR_SECRETS_REL_DIRPATH: &str = "validator-secrets";

/// Where each artifact lives inside a launch's shared directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifacts {
    pub genesis_config_yml: SharedPath,
    pub genesis_ssz: SharedPath,
    pub validator_keys: SharedPath,
    pub validator_secrets: SharedPath,
}

impl StagedArtifacts {
    pub fn under(shared_dir: &SharedPath) -> Self {
        Self {
            genesis_config_yml: shared_dir.child(GENESIS_CONFIG_YML_REL_FILEPATH),
            genesis_ssz: shared_dir.child(GENESIS_SSZ_REL_FILEPATH),
            validator_keys: shared_dir.child(VALIDATOR_KEYS_REL_DIRPATH),
            validator_secrets: shared_dir.child(VALIDATOR_SECRETS_REL_DIRPATH),
        }
    }
}

/// Copy genesis files and validator keystores into `shared_dir`.
///
/// Stops at the first failure; whatever was copied before stays in place.
pub async fn stage_artifacts(
    stager: &dyn FileStager,
    shared_dir: &SharedPath,
    genesis: &GenesisArtifacts,
    keystores: &KeystoreDirpaths,
) -> Result<StagedArtifacts, StagingError> {
    let staged = StagedArtifacts::under(shared_dir);

    stager
        .copy_file(&genesis.config_yml_filepath, &staged.genesis_config_yml)
        .await?;
    stager
        .copy_file(&genesis.genesis_ssz_filepath, &staged.genesis_ssz)
        .await?;
    stager
        .copy_dir_recursive(&keystores.keys_dirpath, &staged.validator_keys)
        .await?;
    stager
        .copy_dir_recursive(&keystores.secrets_dirpath, &staged.validator_secrets)
        .await?;

    tracing::debug!(
        "Staged genesis and keystores into {}",
        shared_dir.path_on_launcher().display()
    );
    Ok(staged)
}

/// Stager working on the launcher's local filesystem
#[derive(Debug, Default, Clone)]
pub struct LocalFileStager;

#[async_trait]
impl FileStager for LocalFileStager {
    async fn copy_file(&self, src: &Path, dest: &SharedPath) -> Result<(), StagingError> {
        let src = src.to_path_buf();
        let dest = dest.path_on_launcher().to_path_buf();
        run_blocking(move || copy_single_file(&src, &dest)).await
    }

    async fn copy_dir_recursive(&self, src: &Path, dest: &SharedPath) -> Result<(), StagingError> {
        let src = src.to_path_buf();
        let dest = dest.path_on_launcher().to_path_buf();
        run_blocking(move || {
            let metadata = fs::metadata(&src).map_err(|e| copy_err(&src, &dest, e))?;
            if !metadata.is_dir() {
                return Err(StagingError::UnexpectedSourceKind {
                    path: src,
                    expected: "directory".to_string(),
                });
            }
            copy_tree(&src, &dest)
        })
        .await
    }
}

async fn run_blocking<F>(f: F) -> Result<(), StagingError>
where
    F: FnOnce() -> Result<(), StagingError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StagingError::Task(e.to_string()))?
}

fn copy_single_file(src: &Path, dest: &Path) -> Result<(), StagingError> {
    let metadata = fs::metadata(src).map_err(|e| copy_err(src, dest, e))?;
    if !metadata.is_file() {
        return Err(StagingError::UnexpectedSourceKind {
            path: src.to_path_buf(),
            expected: "file".to_string(),
        });
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| copy_err(src, dest, e))?;
    }
    // fs::copy carries the permission bits over
    fs::copy(src, dest).map_err(|e| copy_err(src, dest, e))?;
    Ok(())
}

fn copy_tree(src: &Path, dest: &Path) -> Result<(), StagingError> {
    fs::create_dir_all(dest).map_err(|e| copy_err(src, dest, e))?;

    for entry in fs::read_dir(src).map_err(|e| copy_err(src, dest, e))? {
        let entry = entry.map_err(|e| copy_err(src, dest, e))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        // Follows symlinks so the node receives real files
        let metadata = fs::metadata(&from).map_err(|e| copy_err(&from, &to, e))?;

        if metadata.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| copy_err(&from, &to, e))?;
        }
    }

    let permissions = fs::metadata(src)
        .map_err(|e| copy_err(src, dest, e))?
        .permissions();
    fs::set_permissions(dest, permissions).map_err(|e| copy_err(src, dest, e))?;
    Ok(())
}

fn copy_err(from: &Path, to: &Path, source: std::io::Error) -> StagingError {
    StagingError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    }
}
