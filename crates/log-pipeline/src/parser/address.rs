//! 출발지 주소 추출
//!
//! 원본 라인에서 처음 등장하는 유효한 IPv4/IPv6 리터럴을 찾습니다.
//! 후보는 정규식으로 찾고 `std::net` 파서로 한 번 더 검증하므로
//! `999.1.1.1`이나 `10:00:00` 같은 문자열은 걸러집니다.
//! `::`로 줄인 IPv6 후보는 숫자를 하나 이상 포함해야 하며 (`dead::beef` 제외),
//! 미지정 주소 `::`는 출발지로 취급하지 않습니다.

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;

static IPV4_CANDIDATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").ok());

static IPV6_CANDIDATE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?:[0-9A-Fa-f]{0,4}:){2,7}(?:\d{1,3}(?:\.\d{1,3}){3}|[0-9A-Fa-f]{0,4})").ok()
});

/// 라인에서 처음 등장하는 유효한 IP 주소를 추출합니다.
pub fn extract_address(raw: &str) -> Option<IpAddr> {
    let mut best: Option<(usize, IpAddr)> = None;

    for pattern in [&*IPV4_CANDIDATE, &*IPV6_CANDIDATE].into_iter().flatten() {
        for candidate in pattern.find_iter(raw) {
            if best.is_some_and(|(pos, _)| pos <= candidate.start()) {
                break;
            }
            if !is_token_start(raw, candidate.start()) {
                continue;
            }
            if let Ok(addr) = candidate.as_str().parse::<IpAddr>()
                && is_plausible(candidate.as_str(), &addr)
            {
                best = Some((candidate.start(), addr));
                break;
            }
        }
    }

    best.map(|(_, addr)| addr)
}

fn is_plausible(candidate: &str, addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(_) => true,
        IpAddr::V6(v6) => {
            !v6.is_unspecified()
                && (!candidate.contains("::") || candidate.bytes().any(|b| b.is_ascii_digit()))
        }
    }
}

/// 후보가 다른 단어 중간에서 시작하지 않는지 확인합니다.
fn is_token_start(raw: &str, start: usize) -> bool {
    raw[..start]
        .chars()
        .next_back()
        .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == ':' || c == '.'))
}
