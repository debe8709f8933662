//! 협력자 trait -- 파이프라인 바깥 세계와의 확장 포인트 정의
//!
//! 코어는 저장된 이력을 조회하지 않고 추가만 하며,
//! 알림 전송 방식(메일, 웹훅 등)은 [`Notifier`] 구현에 위임합니다.
//! 두 호출 모두 동기이며, 타임아웃 정책은 각 구현이 책임집니다.

use crate::error::{DispatchError, StorageError};
use crate::event::AlertEvent;
use crate::types::LogEntry;

/// 분류된 엔트리를 저장하는 append-only 저장소
pub trait EntryStore: Send + Sync {
    /// 저장소 이름 (로깅용)
    fn name(&self) -> &str;

    /// 엔트리 하나를 추가합니다.
    fn append(&self, entry: &LogEntry) -> Result<(), StorageError>;
}

/// 알림 이벤트를 외부로 전달하는 trait
///
/// 실패는 호출자가 기록만 하며 같은 주기 안에서 재시도하지 않습니다.
pub trait Notifier: Send + Sync {
    /// 전송 채널 이름 (로깅용)
    fn name(&self) -> &str;

    /// 알림을 전송합니다.
    fn send(&self, event: &AlertEvent) -> Result<(), DispatchError>;
}
