//! 에코시스템 태그 → syft 카탈로거 매핑

/// `base` 태그 (OS 패키지 DB)
const BASE: &[&str] = &[
    "dpkgdb-cataloger",
    "rpmdb-cataloger",
    "apkdb-cataloger",
    "alpmdb-cataloger",
];
const RUBY: &[&str] = &["ruby-gemfile-cataloger", "ruby-gemspec-cataloger"];
const PYTHON: &[&str] = &["python-index-cataloger", "python-package-cataloger"];
const JAVASCRIPT: &[&str] = &["javascript-lock-cataloger", "javascript-package-cataloger"];
const PHP: &[&str] = &[
    "php-composer-installed-cataloger",
    "php-composer-lock-cataloger",
];
const GOLANG: &[&str] = &["go-mod-file-cataloger"];
const JAVA: &[&str] = &["java-cataloger"];
const RUST: &[&str] = &["rust-cataloger"];
const DOTNET: &[&str] = &["dotnet-deps-cataloger"];

/// 태그에 해당하는 카탈로거 목록. 알 수 없는 태그는 빈 슬라이스.
pub fn catalogers_for(tag: &str) -> &'static [&'static str] {
    match tag {
        "base" => BASE,
        "ruby" => RUBY,
        "python" => PYTHON,
        "javascript" => JAVASCRIPT,
        "php" => PHP,
        "golang" => GOLANG,
        "java" => JAVA,
        "rust" => RUST,
        "dotnet" => DOTNET,
        _ => &[],
    }
}

/// `scan_type`에서 `--catalogers <name>` 인자 쌍을 만듭니다.
///
/// 비어 있거나 `all`이면 인자를 추가하지 않습니다 (도구 기본값 사용).
pub fn cataloger_args(scan_type: &str) -> Vec<String> {
    if scan_type.is_empty() || scan_type == "all" {
        return Vec::new();
    }
    scan_type
        .split(',')
        .map(str::trim)
        .flat_map(catalogers_for)
        .flat_map(|name| ["--catalogers".to_owned(), (*name).to_owned()])
        .collect()
}
