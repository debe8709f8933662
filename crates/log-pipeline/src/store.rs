//! 협력자 참조 구현 -- 엔트리 저장소, 알림 전송, 모델 저장소
//!
//! 데몬이 외부 시스템 없이 단독으로 동작할 수 있도록 최소한의 구현을 제공합니다.
//! 메모리 구현은 테스트와 단발 실행에서 결과를 확인하는 용도입니다.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use logwarden_core::error::{DispatchError, StorageError};
use logwarden_core::event::AlertEvent;
use logwarden_core::pipeline::{EntryStore, Notifier};
use logwarden_core::types::LogEntry;

use crate::anomaly::AnomalyModel;

/// 학습된 이상 모델을 보존하는 저장소
pub trait ModelStore: Send + Sync {
    /// 저장된 모델을 읽습니다. 저장된 모델이 없으면 `Ok(None)`입니다.
    fn load(&self) -> Result<Option<AnomalyModel>, StorageError>;

    /// 모델을 저장합니다.
    fn save(&self, model: &AnomalyModel) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|_| StorageError::Write("store lock poisoned".to_owned()))
}

/// JSON Lines 파일 저장소 -- 엔트리 하나를 한 줄의 JSON 객체로 추가합니다.
pub struct JsonLinesStore {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesStore {
    /// 파일을 추가 모드로 엽니다. 부모 디렉토리가 없으면 생성합니다.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::Write(format!("{}: {e}", parent.display())))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::Write(format!("{}: {e}", path.display())))?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// 저장 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntryStore for JsonLinesStore {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn append(&self, entry: &LogEntry) -> Result<(), StorageError> {
        let mut line =
            serde_json::to_vec(entry).map_err(|e| StorageError::Serialization(e.to_string()))?;
        line.push(b'\n');

        let mut writer = lock(&self.writer)?;
        writer
            .write_all(&line)
            .and_then(|()| writer.flush())
            .map_err(|e| StorageError::Write(format!("{}: {e}", self.path.display())))
    }
}

/// 메모리 저장소
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 엔트리 사본
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// 저장된 엔트리 수
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntryStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn append(&self, entry: &LogEntry) -> Result<(), StorageError> {
        lock(&self.entries)?.push(entry.clone());
        Ok(())
    }
}

/// 알림을 구조화된 warn 로그로 남기는 전송 구현
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn name(&self) -> &str {
        "tracing"
    }

    fn send(&self, event: &AlertEvent) -> Result<(), DispatchError> {
        let threats: Vec<String> = event
            .threat_counts
            .iter()
            .map(|(category, count)| format!("{category}={count}"))
            .collect();
        let sources: Vec<String> = event
            .top_sources
            .iter()
            .map(|(addr, count)| format!("{addr}={count}"))
            .collect();

        tracing::warn!(
            alert_id = %event.id,
            trace_id = %event.metadata.trace_id,
            source = %event.source,
            severity = %event.severity,
            suspicious = event.suspicious_count,
            anomalies = event.anomaly_count,
            threats = %threats.join(","),
            top_sources = %sources.join(","),
            "{}",
            event.title()
        );
        Ok(())
    }
}

/// 받은 알림을 보관하는 메모리 전송 구현
#[derive(Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<AlertEvent>>,
}

impl MemoryNotifier {
    /// 빈 전송 구현을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 받은 알림 사본
    pub fn events(&self) -> Vec<AlertEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn name(&self) -> &str {
        "memory"
    }

    fn send(&self, event: &AlertEvent) -> Result<(), DispatchError> {
        self.events
            .lock()
            .map_err(|_| DispatchError::Unavailable("notifier lock poisoned".to_owned()))?
            .push(event.clone());
        Ok(())
    }
}

/// JSON 파일 모델 저장소
///
/// 저장은 임시 파일에 쓴 뒤 이름을 바꾸므로 읽는 쪽이 잘린 파일을 보지 않습니다.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    path: PathBuf,
}

impl FileModelStore {
    /// 새 모델 저장소를 생성합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 모델 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModelStore for FileModelStore {
    fn load(&self) -> Result<Option<AnomalyModel>, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::Read(format!("{}: {e}", self.path.display())));
            }
        };

        let model: AnomalyModel = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Serialization(format!("{}: {e}", self.path.display())))?;
        Ok(model.is_trained().then_some(model))
    }

    fn save(&self, model: &AnomalyModel) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::Write(format!("{}: {e}", parent.display())))?;
        }

        let json =
            serde_json::to_vec(model).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| StorageError::Write(format!("{}: {e}", self.path.display())))?;

        tracing::debug!(path = %self.path.display(), "anomaly model saved");
        Ok(())
    }
}

/// 모델을 메모리에만 보관하는 저장소
#[derive(Default)]
pub struct MemoryModelStore {
    model: Mutex<Option<AnomalyModel>>,
}

impl MemoryModelStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelStore for MemoryModelStore {
    fn load(&self) -> Result<Option<AnomalyModel>, StorageError> {
        Ok(self
            .model
            .lock()
            .map_err(|_| StorageError::Read("model store lock poisoned".to_owned()))?
            .clone())
    }

    fn save(&self, model: &AnomalyModel) -> Result<(), StorageError> {
        *lock(&self.model)? = Some(model.clone());
        Ok(())
    }
}
