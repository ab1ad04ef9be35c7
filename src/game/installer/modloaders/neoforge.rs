use crate::game::installer::config::NEOFORGE_MAVEN_URL;
use crate::game::installer::core::traits::ModloaderInstaller;
use crate::game::installer::modloaders::forge::installer::install_forge_modloader;
use crate::game::installer::types::{InstallSpec, ProgressReporter};
use crate::game::installer::{track_artifact_from_path, try_restore_artifact};
use crate::game::metadata::ModloaderType as MetadataModloaderType;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct NeoForgeInstaller;

impl ModloaderInstaller for NeoForgeInstaller {
    fn install<'a>(
        &'a self,
        spec: &'a InstallSpec,
        reporter: Arc<dyn ProgressReporter>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(install_neoforge(spec, reporter))
    }
}

/// Install NeoForge modloader
pub async fn install_neoforge(
    spec: &InstallSpec,
    reporter: std::sync::Arc<dyn ProgressReporter>,
) -> Result<()> {
    log::info!("Installing NeoForge for Minecraft {}", spec.version_id);

    // Determine NeoForge version
    let neoforge_version = spec
        .modloader_version
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("NeoForge version not specified"))?;

    // Download NeoForge installer JAR, trying the current coordinate space
    // before falling back to the legacy net.neoforged:forge one.
    let (installer_path, old_api) = download_neoforge_installer(
        spec.version_id.clone(),
        neoforge_version.clone(),
        spec.data_dir().clone(),
    )
    .await?;
    log::info!(
        "Resolved NeoForge installer via {} coordinate space",
        if old_api { "legacy (net.neoforged:forge)" } else { "current (net.neoforged:neoforge)" }
    );

    // Use the same simplified installer as Forge
    install_forge_modloader(
        spec,
        reporter,
        MetadataModloaderType::NeoForge,
        "NeoForge",
        installer_path,
    )
    .await
}

/// The two Maven coordinate spaces NeoForge has published installers under.
/// Builds before the NeoForge/Forge split (pre-1.20.2-ish) only exist under
/// the legacy `net.neoforged:forge` group; current builds live under
/// `net.neoforged:neoforge`. We try the current coordinate first and fall
/// back to the legacy one on a 404, since there is no version-range table
/// worth hardcoding here -- the Maven server is authoritative.
struct NeoForgeCoordinate {
    group_path: &'static str,
    artifact: &'static str,
    old_api: bool,
}

const NEOFORGE_CURRENT: NeoForgeCoordinate = NeoForgeCoordinate {
    group_path: "net/neoforged/neoforge",
    artifact: "neoforge",
    old_api: false,
};
const NEOFORGE_LEGACY: NeoForgeCoordinate = NeoForgeCoordinate {
    group_path: "net/neoforged/forge",
    artifact: "forge",
    old_api: true,
};

/// Download NeoForge installer JAR, trying the current coordinate space
/// first and falling back to the legacy one. Returns the installer path and
/// whether the legacy (`old_api`) coordinate space was the one that resolved.
async fn download_neoforge_installer(
    minecraft_version: String,
    neoforge_version: String,
    data_dir: PathBuf,
) -> Result<(PathBuf, bool)> {
    match try_download_neoforge_installer(&NEOFORGE_CURRENT, &minecraft_version, &neoforge_version, &data_dir).await {
        Ok(path) => Ok((path, false)),
        Err(current_err) => {
            log::warn!(
                "NeoForge installer not found under current coordinate space, trying legacy net.neoforged:forge: {}",
                current_err
            );
            let path = try_download_neoforge_installer(&NEOFORGE_LEGACY, &minecraft_version, &neoforge_version, &data_dir)
                .await
                .with_context(|| {
                    format!(
                        "NeoForge installer not found under current or legacy coordinate space for {}",
                        neoforge_version
                    )
                })?;
            Ok((path, true))
        }
    }
}

async fn try_download_neoforge_installer(
    coord: &NeoForgeCoordinate,
    minecraft_version: &str,
    neoforge_version: &str,
    data_dir: &Path,
) -> Result<PathBuf> {
    // The legacy coordinate space (net.neoforged:forge) prefixes versions
    // with the Minecraft version, mirroring classic Forge; the current
    // space (net.neoforged:neoforge) uses bare NeoForge version numbers.
    let full_version = if coord.old_api {
        format!("{}-{}", minecraft_version, neoforge_version)
    } else {
        neoforge_version.to_string()
    };

    let installer_filename = format!("{}-{}-installer.jar", coord.artifact, full_version);
    let cache_dir = data_dir.join("cache").join("neoforge_installers");
    tokio::fs::create_dir_all(&cache_dir).await?;

    let installer_path = cache_dir.join(&installer_filename);
    let label = format!("installers/neoforge/{}/{}", coord.group_path, installer_filename);

    if installer_path.exists() {
        log::info!("Using cached NeoForge installer: {:?}", installer_path);
        track_artifact_from_path(label, &installer_path, None, None)
            .await
            .ok();
        return Ok(installer_path);
    }

    if try_restore_artifact(&label, &installer_path).await? {
        log::info!(
            "Restored NeoForge installer from cache: {:?}",
            installer_path
        );
        return Ok(installer_path);
    }

    let url = format!(
        "{}{}/{}/{}",
        NEOFORGE_MAVEN_URL, coord.group_path, full_version, installer_filename
    );

    log::info!("Downloading NeoForge installer from: {}", url);

    let response = reqwest::get(&url)
        .await
        .context("Failed to download NeoForge installer")?;

    if !response.status().is_success() {
        anyhow::bail!(
            "Failed to download NeoForge installer: HTTP {}",
            response.status()
        );
    }

    let bytes = response.bytes().await?;
    tokio::fs::write(&installer_path, &bytes).await?;
    track_artifact_from_path(label, &installer_path, None, Some(url)).await?;

    log::info!("Downloaded NeoForge installer to: {:?}", installer_path);
    Ok(installer_path)
}
