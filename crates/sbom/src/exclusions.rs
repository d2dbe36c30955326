//! 스캔 제외 경로
//!
//! 런타임 저장소, 가상 파일시스템, 네트워크/메모리 마운트는 카탈로그 대상에서 제외합니다.
//! NFS/tmpfs 마운트는 프로세스 시작 시 한 번 `findmnt`로 탐색합니다.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, warn};

use pkgscan_core::types::DIR_SCHEME;

/// 항상 제외하는 경로
pub const EXCLUDED_PATHS: [&str; 13] = [
    "/var/lib/docker",
    "/var/lib/containerd",
    "/var/lib/containers",
    "/var/lib/crio",
    "/var/run/containers",
    "/mnt",
    "/run",
    "/proc",
    "/dev",
    "/boot",
    "/home/kubernetes/containerized_mounter",
    "/sys",
    "/lost+found",
];

/// NFS/tmpfs 마운트 지점을 탐색합니다.
///
/// `findmnt`가 없거나 실패하면 빈 목록을 반환합니다.
pub async fn discover_mounts() -> Vec<PathBuf> {
    let output = Command::new("findmnt")
        .args(["-l", "-t", "nfs4,tmpfs", "-n", "--output=TARGET"])
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => {
            let mounts = parse_findmnt_output(&String::from_utf8_lossy(&out.stdout));
            debug!(count = mounts.len(), "discovered nfs/tmpfs mounts");
            mounts
        }
        Ok(out) => {
            warn!(status = %out.status, "findmnt failed, no mounts excluded");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "findmnt unavailable, no mounts excluded");
            Vec::new()
        }
    }
}

/// `findmnt -l -n --output=TARGET` 출력을 마운트 경로 목록으로 변환합니다.
pub fn parse_findmnt_output(output: &str) -> Vec<PathBuf> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// 디렉토리 대상의 절대 스캔 경로를 구합니다.
///
/// `dir:` 접두어를 제거하고 `.`은 현재 디렉토리로 해석합니다.
pub fn scan_root(source: &str) -> PathBuf {
    let raw = source.strip_prefix(DIR_SCHEME).unwrap_or(source);
    let raw = if raw.is_empty() { "." } else { raw };
    std::path::absolute(raw).unwrap_or_else(|_| PathBuf::from(raw))
}

/// 디렉토리 대상에 추가할 `--exclude` 인자.
///
/// 고정 경로는 `./<path>/**`, 마운트는 스캔 경로 기준 상대 경로로 변환합니다.
/// 스캔 경로 밖의 마운트는 절대 경로를 그대로 `./<mount>/**`로 쓰고,
/// 스캔 경로와 같은 마운트는 건너뜁니다.
pub fn directory_exclusions(source: &str, mounts: &[PathBuf]) -> Vec<String> {
    let mut args = Vec::with_capacity((EXCLUDED_PATHS.len() + mounts.len()) * 2);
    for path in EXCLUDED_PATHS {
        args.push("--exclude".to_owned());
        args.push(format!(".{path}/**"));
    }

    let root = scan_root(source);
    for mount in mounts {
        if let Some(pattern) = mount_pattern(&root, mount) {
            args.push("--exclude".to_owned());
            args.push(pattern);
        }
    }
    args
}

fn mount_pattern(root: &Path, mount: &Path) -> Option<String> {
    let relative = match mount.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => return None,
        Ok(rel) => rel.to_path_buf(),
        Err(_) => mount.strip_prefix("/").unwrap_or(mount).to_path_buf(),
    };
    Some(format!("./{}/**", relative.display()))
}

/// 디렉토리가 아닌 대상에 추가할 `--exclude` 인자 (고정 경로 그대로).
pub fn image_exclusions() -> Vec<String> {
    EXCLUDED_PATHS
        .iter()
        .flat_map(|path| ["--exclude".to_owned(), (*path).to_owned()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_findmnt_lines() {
        let out = "/run\n/dev/shm\n\n  /data/nfs  \n";
        assert_eq!(
            parse_findmnt_output(out),
            vec![
                PathBuf::from("/run"),
                PathBuf::from("/dev/shm"),
                PathBuf::from("/data/nfs")
            ]
        );
    }

    #[test]
    fn directory_exclusions_start_with_fixed_list() {
        let args = directory_exclusions("dir:/", &[]);
        assert_eq!(args.len(), EXCLUDED_PATHS.len() * 2);
        assert_eq!(args[0], "--exclude");
        assert_eq!(args[1], "./var/lib/docker/**");
        assert!(args.contains(&"./lost+found/**".to_owned()));
    }

    #[test]
    fn mount_inside_scan_dir_is_relative() {
        let args = directory_exclusions("dir:/data", &[PathBuf::from("/data/nfs/share")]);
        assert_eq!(args.last().unwrap(), "./nfs/share/**");
    }

    #[test]
    fn mount_outside_scan_dir_is_absolute_rooted() {
        let args = directory_exclusions("dir:/data", &[PathBuf::from("/var/cache/tmp")]);
        assert_eq!(args.last().unwrap(), "./var/cache/tmp/**");
    }

    #[test]
    fn mount_equal_to_scan_dir_is_skipped() {
        let args = directory_exclusions("dir:/data", &[PathBuf::from("/data")]);
        assert_eq!(args.len(), EXCLUDED_PATHS.len() * 2);
    }

    #[test]
    fn sibling_with_common_prefix_is_not_relative() {
        // "/database"는 "/data" 하위가 아님
        let args = directory_exclusions("dir:/data", &[PathBuf::from("/database")]);
        assert_eq!(args.last().unwrap(), "./database/**");
    }

    #[test]
    fn dot_scan_root_is_current_dir() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(scan_root("."), cwd);
    }

    #[test]
    fn image_exclusions_are_verbatim() {
        let args = image_exclusions();
        assert_eq!(args.len(), 26);
        assert_eq!(args[0], "--exclude");
        assert_eq!(args[1], "/var/lib/docker");
        assert_eq!(args[25], "/lost+found");
    }
}
