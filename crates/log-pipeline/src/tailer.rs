//! 파일 테일러 -- 마지막 폴링 이후 추가된 완전한 라인만 읽습니다.
//!
//! `tail -f`와 비슷하지만 백그라운드 태스크 없이 폴링 한 번이
//! 호출 한 번에 대응합니다. 진행 상태는 [`TailCursor`] 값에 담겨
//! 호출자가 소유하며, 폴링은 새 커서를 돌려줍니다.
//!
//! # 로테이션 감지
//! 파일 크기가 지난 폴링보다 작아지면 (logrotate의 copytruncate, 재생성 등)
//! 오프셋을 0으로 되돌려 처음부터 다시 읽습니다.
//!
//! # 부분 라인
//! `\n`으로 끝나지 않은 마지막 조각은 반환하지 않고 다음 폴링으로 미룹니다.
//! 폴링당 읽기 상한보다 긴 라인은 조각내지 않고 종결자까지 통째로 버립니다.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::LogPipelineError;

/// 폴링당 기본 최대 읽기 크기
pub const DEFAULT_MAX_BYTES_PER_POLL: u64 = 8 * 1024 * 1024; // 8MB

/// 파일별 읽기 위치
///
/// 모든 폴링 이후 `byte_offset <= last_size`가 성립합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailCursor {
    /// 파일 경로
    pub path: PathBuf,
    /// 다음에 읽을 바이트 오프셋 (항상 라인 경계)
    pub byte_offset: u64,
    /// 마지막 폴링에서 관측한 파일 크기
    pub last_size: u64,
}

impl TailCursor {
    /// 파일 처음부터 읽는 커서를 생성합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            byte_offset: 0,
            last_size: 0,
        }
    }

    /// 파일 끝에서 시작하는 커서를 생성합니다 (기존 내용 건너뛰기).
    ///
    /// 모니터 빌드 시점에 동기적으로 호출됩니다.
    pub fn at_end(path: impl Into<PathBuf>) -> Result<Self, LogPipelineError> {
        let path = path.into();
        let metadata = std::fs::metadata(&path).map_err(|e| file_access(&path, e))?;
        let size = metadata.len();
        Ok(Self {
            path,
            byte_offset: size,
            last_size: size,
        })
    }
}

/// 파일 테일러
#[derive(Debug, Clone)]
pub struct Tailer {
    max_bytes_per_poll: u64,
}

impl Tailer {
    /// 기본 설정으로 테일러를 생성합니다.
    pub fn new() -> Self {
        Self {
            max_bytes_per_poll: DEFAULT_MAX_BYTES_PER_POLL,
        }
    }

    /// 폴링당 최대 읽기 크기를 설정합니다.
    ///
    /// 큰 백로그는 여러 폴링에 걸쳐 소비됩니다.
    pub fn with_max_bytes_per_poll(mut self, max_bytes: u64) -> Self {
        self.max_bytes_per_poll = max_bytes.max(1);
        self
    }

    /// 커서 이후에 추가된 완전한 라인을 읽습니다.
    ///
    /// 라인 끝의 `\r\n`은 제거되고, 잘못된 UTF-8은 대체 문자로 바뀌며,
    /// 빈 라인은 건너뜁니다. 새 내용이 없으면 빈 목록을 반환합니다.
    ///
    /// # Errors
    /// 파일이 없거나 읽을 수 없으면 `FileAccess`를 반환합니다.
    pub async fn poll(
        &self,
        cursor: &TailCursor,
    ) -> Result<(Vec<String>, TailCursor), LogPipelineError> {
        let path = cursor.path.as_path();
        let size = file_size(path).await?;

        let mut offset = cursor.byte_offset;
        if size < cursor.last_size || size < offset {
            tracing::info!(
                path = %path.display(),
                previous_size = cursor.last_size,
                current_size = size,
                "file rotation detected, rewinding"
            );
            offset = 0;
        }

        if size == offset {
            return Ok((
                Vec::new(),
                TailCursor {
                    path: cursor.path.clone(),
                    byte_offset: offset,
                    last_size: size,
                },
            ));
        }

        let to_read = (size - offset).min(self.max_bytes_per_poll);
        let buffer = read_range(path, offset, to_read).await?;

        let consumed = match buffer.iter().rposition(|&b| b == b'\n') {
            Some(last_newline) => last_newline + 1,
            // 상한 안에 종결자가 없으면 라인 전체를 버리고 다음 라인 경계로 이동
            None if to_read == self.max_bytes_per_poll && buffer.len() as u64 == to_read => {
                let Some(newline_at) =
                    find_newline(path, offset + to_read, size, self.max_bytes_per_poll).await?
                else {
                    return Ok((
                        Vec::new(),
                        TailCursor {
                            path: cursor.path.clone(),
                            byte_offset: offset,
                            last_size: size,
                        },
                    ));
                };
                tracing::warn!(
                    path = %path.display(),
                    offset,
                    bytes = newline_at + 1 - offset,
                    limit = self.max_bytes_per_poll,
                    "line exceeds per-poll read limit, dropping"
                );
                return Ok((
                    Vec::new(),
                    TailCursor {
                        path: cursor.path.clone(),
                        byte_offset: newline_at + 1,
                        last_size: size,
                    },
                ));
            }
            None => 0,
        };

        let lines = split_lines(&buffer[..consumed]);

        Ok((
            lines,
            TailCursor {
                path: cursor.path.clone(),
                byte_offset: offset + consumed as u64,
                last_size: size,
            },
        ))
    }
}

impl Default for Tailer {
    fn default() -> Self {
        Self::new()
    }
}

async fn file_size(path: &Path) -> Result<u64, LogPipelineError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| file_access(path, e))?;
    if !metadata.is_file() {
        return Err(LogPipelineError::FileAccess {
            path: path.display().to_string(),
            reason: "not a regular file".to_owned(),
        });
    }
    Ok(metadata.len())
}

async fn read_range(path: &Path, offset: u64, len: u64) -> Result<Vec<u8>, LogPipelineError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| file_access(path, e))?;
    file.seek(std::io::SeekFrom::Start(offset))
        .await
        .map_err(|e| file_access(path, e))?;

    let mut buffer = Vec::with_capacity(len as usize);
    file.take(len)
        .read_to_end(&mut buffer)
        .await
        .map_err(|e| file_access(path, e))?;
    Ok(buffer)
}

/// `start..end` 구간에서 첫 `\n`의 절대 위치를 찾습니다.
async fn find_newline(
    path: &Path,
    start: u64,
    end: u64,
    chunk: u64,
) -> Result<Option<u64>, LogPipelineError> {
    let mut position = start;
    while position < end {
        let buffer = read_range(path, position, (end - position).min(chunk)).await?;
        if buffer.is_empty() {
            break;
        }
        if let Some(index) = buffer.iter().position(|&b| b == b'\n') {
            return Ok(Some(position + index as u64));
        }
        position += buffer.len() as u64;
    }
    Ok(None)
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .collect()
}

fn file_access(path: &Path, err: std::io::Error) -> LogPipelineError {
    LogPipelineError::FileAccess {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
