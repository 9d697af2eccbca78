// 单元测试用的可记录假实现

use crate::backend::{BackendInterface, BackendResult};
use crate::bridge::{ExposureNotificationApi, PushNotifier};
use crate::error::BackendError;
use crate::storage::KeyValueStore;
use crate::models::{
    ExposureConfiguration, ExposureInformation, ExposureSummary, SubmissionKeySet, SystemStatus,
    TemporaryExposureKey,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn key_file(period: i64) -> String {
    format!("keys-{}", period)
}

pub fn sample_key_set() -> SubmissionKeySet {
    SubmissionKeySet {
        server_public_key: "serverPublicKey".to_string(),
        client_private_key: "clientPrivateKey".to_string(),
        client_public_key: "clientPublicKey".to_string(),
    }
}

pub fn sample_exposure() -> ExposureInformation {
    ExposureInformation {
        date_millis_since_epoch: 1_589_846_400_000,
        duration_minutes: 15,
        attenuation_value: 3,
        transmission_risk_level: 4,
        total_risk_score: 10,
    }
}

/// 记录调用的后端
#[derive(Default)]
pub struct FakeBackend {
    pub configuration_calls: AtomicUsize,
    pub retrieved_periods: Mutex<Vec<i64>>,
    pub claimed_codes: Mutex<Vec<String>>,
    pub reported: Mutex<Vec<(SubmissionKeySet, Vec<TemporaryExposureKey>)>>,
    /// 获取配置时让出一次执行权，便于构造并发
    pub yield_on_configuration: AtomicBool,
    pub reject_claims: AtomicBool,
    pub fail_periods: Mutex<HashSet<i64>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configuration_calls(&self) -> usize {
        self.configuration_calls.load(Ordering::SeqCst)
    }

    pub fn retrieved_periods(&self) -> Vec<i64> {
        self.retrieved_periods.lock().unwrap().clone()
    }

    pub fn fail_period(&self, period: i64) {
        self.fail_periods.lock().unwrap().insert(period);
    }
}

#[async_trait]
impl BackendInterface for FakeBackend {
    async fn get_exposure_configuration(&self) -> BackendResult<ExposureConfiguration> {
        self.configuration_calls.fetch_add(1, Ordering::SeqCst);
        if self.yield_on_configuration.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        Ok(ExposureConfiguration::default())
    }

    async fn retrieve_diagnosis_keys(&self, period: i64) -> BackendResult<String> {
        self.retrieved_periods.lock().unwrap().push(period);
        if self.fail_periods.lock().unwrap().contains(&period) {
            return Err(BackendError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(key_file(period))
    }

    async fn claim_one_time_code(&self, code: &str) -> BackendResult<SubmissionKeySet> {
        self.claimed_codes.lock().unwrap().push(code.to_string());
        if self.reject_claims.load(Ordering::SeqCst) {
            return Err(BackendError::Unauthorized);
        }
        Ok(sample_key_set())
    }

    async fn report_diagnosis_keys(
        &self,
        key_set: &SubmissionKeySet,
        keys: &[TemporaryExposureKey],
    ) -> BackendResult<()> {
        self.reported
            .lock()
            .unwrap()
            .push((key_set.clone(), keys.to_vec()));
        Ok(())
    }
}

/// 可编排的原生能力
pub struct FakeBridge {
    pub start_fails: AtomicBool,
    pub status_fails: AtomicBool,
    pub status: Mutex<SystemStatus>,
    pub start_calls: AtomicUsize,
    pub detect_calls: Mutex<Vec<Vec<String>>>,
    /// 这些密钥文件会报告匹配
    pub matching_files: Mutex<HashSet<String>>,
    pub exposures: Mutex<Vec<ExposureInformation>>,
    pub keys: Mutex<Vec<TemporaryExposureKey>>,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self {
            start_fails: AtomicBool::new(false),
            status_fails: AtomicBool::new(false),
            status: Mutex::new(SystemStatus::Active),
            start_calls: AtomicUsize::new(0),
            detect_calls: Mutex::new(Vec::new()),
            matching_files: Mutex::new(HashSet::new()),
            exposures: Mutex::new(vec![sample_exposure()]),
            keys: Mutex::new(vec![TemporaryExposureKey {
                key_data: "AAAAAAAAAAAAAAAAAAAAAA==".to_string(),
                rolling_start_interval_number: 2_649_600,
                rolling_period: 144,
                transmission_risk_level: 1,
            }]),
        }
    }

    pub fn with_status(self, status: SystemStatus) -> Self {
        *self.status.lock().unwrap() = status;
        self
    }

    pub fn match_file(&self, file: String) {
        self.matching_files.lock().unwrap().insert(file);
    }

    pub fn detect_calls(&self) -> Vec<Vec<String>> {
        self.detect_calls.lock().unwrap().clone()
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExposureNotificationApi for FakeBridge {
    async fn start(&self) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.start_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("exposure notification framework unavailable"));
        }
        Ok(())
    }

    async fn get_status(&self) -> Result<SystemStatus> {
        if self.status_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("status unavailable"));
        }
        Ok(*self.status.lock().unwrap())
    }

    async fn detect_exposure(
        &self,
        _configuration: &ExposureConfiguration,
        diagnosis_keys_urls: &[String],
    ) -> Result<ExposureSummary> {
        self.detect_calls
            .lock()
            .unwrap()
            .push(diagnosis_keys_urls.to_vec());
        let matching = self.matching_files.lock().unwrap();
        let matched = diagnosis_keys_urls.iter().any(|f| matching.contains(f));
        Ok(ExposureSummary {
            days_since_last_exposure: if matched { 2 } else { 0 },
            matched_key_count: if matched { 1 } else { 0 },
            maximum_risk_score: if matched { 10 } else { 0 },
        })
    }

    async fn get_exposure_information(
        &self,
        _summary: &ExposureSummary,
    ) -> Result<Vec<ExposureInformation>> {
        Ok(self.exposures.lock().unwrap().clone())
    }

    async fn get_temporary_exposure_key_history(&self) -> Result<Vec<TemporaryExposureKey>> {
        Ok(self.keys.lock().unwrap().clone())
    }
}

/// 记录通知的通知器
#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }
}

impl PushNotifier for RecordingNotifier {
    fn present_local_notification(&self, title: &str, body: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

/// 读取总是为空、写入总是失败的存储
#[derive(Default)]
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn set_item(&self, key: &str, _value: &str) -> Result<()> {
        Err(anyhow!("写入 {} 失败: 磁盘已满", key))
    }

    async fn get_item(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
