// 密钥包解压适配器
//
// iOS 的检测接口要求传入解压后的 export.bin / export.sig，
// 而后端返回的是压缩包，这里在原生接口前面做一层转换

use super::ExposureNotificationApi;
use crate::models::{
    ExposureConfiguration, ExposureInformation, ExposureSummary, SystemStatus,
    TemporaryExposureKey,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 解压目标目录名（与压缩包同级）
const EXPORT_DIR_NAME: &str = "keys-export";

/// 包装原生接口，detect_exposure 之前先解压密钥包
pub struct ArchiveUnpackingAdapter<A> {
    inner: A,
}

impl<A: ExposureNotificationApi> ArchiveUnpackingAdapter<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

/// 把压缩包解压到同级的 keys-export 目录，返回该目录
pub async fn unpack_keys_archive(archive_path: &Path) -> Result<PathBuf> {
    let target_dir = archive_path
        .parent()
        .map(|parent| parent.join(EXPORT_DIR_NAME))
        .ok_or_else(|| anyhow!("密钥包路径没有上级目录: {:?}", archive_path))?;

    let archive = archive_path.to_path_buf();
    let target = target_dir.clone();

    // zip 是同步 IO，放到阻塞线程池
    tokio::task::spawn_blocking(move || -> Result<()> {
        std::fs::create_dir_all(&target)?;
        let file = std::fs::File::open(&archive)
            .with_context(|| format!("无法打开密钥包: {:?}", archive))?;
        let mut zip = zip::ZipArchive::new(file)
            .with_context(|| format!("密钥包格式错误: {:?}", archive))?;
        zip.extract(&target)?;
        Ok(())
    })
    .await??;

    debug!("密钥包已解压: {:?}", target_dir);
    Ok(target_dir)
}

#[async_trait]
impl<A: ExposureNotificationApi> ExposureNotificationApi for ArchiveUnpackingAdapter<A> {
    async fn start(&self) -> Result<()> {
        self.inner.start().await
    }

    async fn get_status(&self) -> Result<SystemStatus> {
        self.inner.get_status().await
    }

    async fn detect_exposure(
        &self,
        configuration: &ExposureConfiguration,
        diagnosis_keys_urls: &[String],
    ) -> Result<ExposureSummary> {
        let keys_zip = diagnosis_keys_urls
            .first()
            .ok_or_else(|| anyhow!("detect_exposure 调用时没有任何已下载的密钥文件"))?;

        let unpacked = unpack_keys_archive(Path::new(keys_zip)).await?;
        let files = vec![
            unpacked.join("export.bin").to_string_lossy().to_string(),
            unpacked.join("export.sig").to_string_lossy().to_string(),
        ];

        self.inner.detect_exposure(configuration, &files).await
    }

    async fn get_exposure_information(
        &self,
        summary: &ExposureSummary,
    ) -> Result<Vec<ExposureInformation>> {
        self.inner.get_exposure_information(summary).await
    }

    async fn get_temporary_exposure_key_history(&self) -> Result<Vec<TemporaryExposureKey>> {
        self.inner.get_temporary_exposure_key_history().await
    }
}
