use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::Result;
use svm_core::{
    ArchiveKind, HostArch, HostOs, HostPlatform, ProviderAdapter, SvmError, Transport,
    EXCLUDE_KEYWORDS_KEY, PATH_KEY,
};
use tempfile::TempDir;

use super::*;
use crate::catalog::newest_per_line;
use crate::dotnet::{channel_of, runtime_identifier, score_file};

#[derive(Default)]
struct FakeTransport {
    responses: BTreeMap<String, Vec<u8>>,
    present: BTreeSet<String>,
    fetches: RefCell<Vec<String>>,
}

impl FakeTransport {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.responses
            .insert(url.to_string(), body.as_bytes().to_vec());
        self
    }

    fn with_present(mut self, url: &str) -> Self {
        self.present.insert(url.to_string());
        self
    }

    fn fetch_count(&self, url: &str) -> usize {
        self.fetches
            .borrow()
            .iter()
            .filter(|fetched| fetched.as_str() == url)
            .count()
    }
}

impl Transport for FakeTransport {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.fetches.borrow_mut().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("GET {url} returned 404 Not Found"))
    }

    fn exists(&self, url: &str) -> Result<bool> {
        Ok(self.present.contains(url) || self.responses.contains_key(url))
    }

    fn download(&self, url: &str, _dest: &Path) -> Result<()> {
        anyhow::bail!("unexpected download of {url}")
    }
}

fn linux_x64() -> HostPlatform {
    HostPlatform::new(HostOs::Linux, HostArch::X64)
}

fn windows_x64() -> HostPlatform {
    HostPlatform::new(HostOs::Windows, HostArch::X64)
}

fn env_value(vars: &[svm_core::EnvVar], key: &str) -> Option<String> {
    vars.iter()
        .find(|var| var.key == key)
        .map(|var| var.value.clone())
}

const NODE_INDEX: &str = "https://nodejs.org/dist/index.json";
const NODE_CATALOG: &str = r#"[
    {"version": "v22.1.0", "lts": false},
    {"version": "v20.11.1", "lts": "Iron"},
    {"version": "v20.9.0", "lts": "Iron"},
    {"version": "v20.10.0", "lts": "Iron"},
    {"version": "v18.19.0", "lts": "Hydrogen"}
]"#;

#[test]
fn node_filtered_list_keeps_newest_release_per_major() {
    let transport = FakeTransport::default().with(NODE_INDEX, NODE_CATALOG);
    let provider = NodeProvider::new(&transport, linux_x64());

    let filtered = provider.list_filtered().expect("must list node");
    assert_eq!(filtered, vec!["v22.1.0", "v20.11.1", "v18.19.0"]);

    let all = provider.list_all().expect("must list all node");
    assert_eq!(
        all,
        vec!["v22.1.0", "v20.11.1", "v20.10.0", "v20.9.0", "v18.19.0"]
    );
    assert_eq!(transport.fetch_count(NODE_INDEX), 1);
}

#[test]
fn node_download_url_and_layout_follow_the_host() {
    let transport = FakeTransport::default();
    let linux = NodeProvider::new(&transport, linux_x64());
    assert_eq!(
        linux
            .download_url("20.11.1", &linux_x64())
            .expect("must build url"),
        Some("https://nodejs.org/dist/v20.11.1/node-v20.11.1-linux-x64.tar.gz".to_string())
    );
    assert_eq!(
        linux.extract_subdir("v20.11.1", Path::new("node.tar.gz")),
        Some("node-v20.11.1-linux-x64".to_string())
    );
    assert_eq!(linux.archive_kind(), ArchiveKind::TarGz);
    assert_eq!(linux.bin_dir(Path::new("/r")), Path::new("/r").join("bin"));

    let windows = NodeProvider::new(&transport, windows_x64());
    assert_eq!(
        windows
            .download_url("v18.19.0", &windows_x64())
            .expect("must build url"),
        Some("https://nodejs.org/dist/v18.19.0/node-v18.19.0-win-x64.zip".to_string())
    );
    assert_eq!(windows.archive_kind(), ArchiveKind::Zip);
    assert_eq!(windows.bin_dir(Path::new("/r")), Path::new("/r"));

    let vars = linux
        .configure_env("v20.11.1", Path::new("/r"))
        .expect("must configure env");
    assert_eq!(env_value(&vars, "NODE_HOME").as_deref(), Some("/r"));
    assert_eq!(env_value(&vars, EXCLUDE_KEYWORDS_KEY).as_deref(), Some("node"));
}

const GO_CATALOG_URL: &str = "https://go.dev/dl/?mode=json&include=all";
const GO_CATALOG: &str = r#"[
    {"version": "go1.22.1", "stable": true, "files": [
        {"filename": "go1.22.1.linux-amd64.tar.gz", "os": "linux", "arch": "amd64",
         "sha256": "aab8e15785c997ae20f9c88422ee35d962c4562212bb0f879d052a35c8307c7f", "kind": "archive"},
        {"filename": "go1.22.1.windows-amd64.zip", "os": "windows", "arch": "amd64",
         "sha256": "", "kind": "archive"}
    ]},
    {"version": "go1.22.0", "stable": true, "files": []},
    {"version": "go1.23rc1", "stable": false, "files": []},
    {"version": "go1.21.8", "stable": true, "files": []},
    {"version": "go1.9", "stable": true}
]"#;

#[test]
fn go_lists_stable_releases_without_prefix() {
    let transport = FakeTransport::default().with(GO_CATALOG_URL, GO_CATALOG);
    let provider = GoProvider::new(&transport, linux_x64());

    assert_eq!(
        provider.list_filtered().expect("must list go"),
        vec!["1.22.1", "1.21.8", "1.9"]
    );
    assert_eq!(
        provider.list_all().expect("must list all go"),
        vec!["1.22.1", "1.22.0", "1.21.8", "1.9"]
    );
}

#[test]
fn go_download_url_and_checksum_come_from_the_catalog() {
    let transport = FakeTransport::default().with(GO_CATALOG_URL, GO_CATALOG);
    let provider = GoProvider::new(&transport, linux_x64());

    assert_eq!(
        provider
            .download_url("1.22.1", &linux_x64())
            .expect("must build url"),
        Some("https://dl.google.com/go/go1.22.1.linux-amd64.tar.gz".to_string())
    );
    assert_eq!(
        provider
            .download_url("1.22.1", &HostPlatform::new(HostOs::Windows, HostArch::X86))
            .expect("must build url"),
        Some("https://dl.google.com/go/go1.22.1.windows-386.zip".to_string())
    );
    assert_eq!(
        provider
            .expected_sha256("1.22.1", &linux_x64())
            .expect("must look up checksum")
            .as_deref(),
        Some("aab8e15785c997ae20f9c88422ee35d962c4562212bb0f879d052a35c8307c7f")
    );
    assert_eq!(
        provider
            .expected_sha256("1.22.1", &windows_x64())
            .expect("must look up checksum"),
        None
    );
    assert_eq!(
        provider.extract_subdir("1.22.1", Path::new("go.tar.gz")),
        Some("go".to_string())
    );
    assert_eq!(transport.fetch_count(GO_CATALOG_URL), 1);
}

#[test]
fn go_env_requires_a_bin_directory() {
    let transport = FakeTransport::default();
    let provider = GoProvider::new(&transport, linux_x64());
    let temp = TempDir::new().expect("must create temp dir");

    provider
        .configure_env("1.22.1", temp.path())
        .expect_err("must reject root without bin");

    fs::create_dir_all(temp.path().join("bin")).expect("must create bin");
    let vars = provider
        .configure_env("1.22.1", temp.path())
        .expect("must configure env");
    assert_eq!(
        env_value(&vars, "GOROOT"),
        Some(temp.path().display().to_string())
    );
    assert_eq!(
        env_value(&vars, PATH_KEY),
        Some(temp.path().join("bin").display().to_string())
    );
    assert_eq!(
        env_value(&vars, EXCLUDE_KEYWORDS_KEY).as_deref(),
        Some("golang,go")
    );
}

const JAVA_RELEASES_URL: &str = "https://api.adoptium.net/v3/info/available_releases";

fn java_assets_url(version: &str) -> String {
    format!(
        "https://api.adoptium.net/v3/assets/latest/{version}/hotspot?architecture=x64&os=linux&image_type=jdk&vendor=eclipse"
    )
}

#[test]
fn java_lists_feature_releases_newest_first() {
    let transport = FakeTransport::default().with(
        JAVA_RELEASES_URL,
        r#"{"available_lts_releases": [8, 11, 17, 21], "available_releases": [8, 11, 17, 21, 22]}"#,
    );
    let provider = JavaProvider::new(&transport, linux_x64());

    let expected = vec!["22", "21", "17", "11", "8"];
    assert_eq!(provider.list_filtered().expect("must list java"), expected);
    assert_eq!(provider.list_all().expect("must list all java"), expected);
}

#[test]
fn java_download_url_prefers_package_link_and_carries_checksum() {
    let transport = FakeTransport::default()
        .with(
            &java_assets_url("21"),
            r#"[{"binary": {"package": {"link": "https://example.test/jdk21.tar.gz",
                "checksum": "abc123"}}, "release_name": "jdk-21.0.2+13"}]"#,
        )
        .with(
            &java_assets_url("17"),
            r#"[{"binary_link": "https://example.test/jdk17.tar.gz"}]"#,
        )
        .with(&java_assets_url("8"), "[]");
    let provider = JavaProvider::new(&transport, linux_x64());

    assert_eq!(
        provider
            .download_url("21", &linux_x64())
            .expect("must resolve 21"),
        Some("https://example.test/jdk21.tar.gz".to_string())
    );
    assert_eq!(
        provider
            .expected_sha256("21", &linux_x64())
            .expect("must resolve checksum")
            .as_deref(),
        Some("abc123")
    );
    assert_eq!(transport.fetch_count(&java_assets_url("21")), 1);

    assert_eq!(
        provider
            .download_url("17", &linux_x64())
            .expect("must resolve 17"),
        Some("https://example.test/jdk17.tar.gz".to_string())
    );
    assert_eq!(
        provider
            .download_url("8", &linux_x64())
            .expect("must resolve 8"),
        None
    );
}

#[test]
fn java_post_install_flattens_the_jdk_directory() {
    let transport = FakeTransport::default();
    let provider = JavaProvider::new(&transport, linux_x64());
    let temp = TempDir::new().expect("must create temp dir");
    let jdk = temp.path().join("jdk-21.0.2+13");
    fs::create_dir_all(jdk.join("bin")).expect("must create bin");
    fs::write(jdk.join("bin").join("java"), "java").expect("must write java");
    fs::write(jdk.join("release"), "JAVA_VERSION=21").expect("must write release");

    provider
        .post_install("21", temp.path())
        .expect("must flatten jdk");

    assert!(temp.path().join("bin").join("java").is_file());
    assert!(temp.path().join("release").is_file());
    assert!(!jdk.exists());
}

#[test]
fn java_post_install_lifts_macos_contents_home() {
    let transport = FakeTransport::default();
    let provider = JavaProvider::new(&transport, HostPlatform::new(HostOs::Darwin, HostArch::Arm64));
    let temp = TempDir::new().expect("must create temp dir");
    let home = temp
        .path()
        .join("jdk-21.0.2+13")
        .join("Contents")
        .join("Home");
    fs::create_dir_all(home.join("bin")).expect("must create bin");
    fs::write(home.join("bin").join("java"), "java").expect("must write java");

    provider
        .post_install("21", temp.path())
        .expect("must lift home");

    assert!(temp.path().join("bin").join("java").is_file());
    assert!(!temp.path().join("Contents").exists());
}

#[test]
fn java_post_install_rejects_unrecognized_layout() {
    let transport = FakeTransport::default();
    let provider = JavaProvider::new(&transport, linux_x64());
    let temp = TempDir::new().expect("must create temp dir");
    fs::write(temp.path().join("README"), "nothing").expect("must write file");

    provider
        .post_install("21", temp.path())
        .expect_err("must fail without bin");
}

const PYTHON_FTP: &str = "https://www.python.org/ftp/python/";

#[test]
fn python_versions_are_scraped_from_the_ftp_listing() {
    let listing = r#"<a href="3.12.2/">3.12.2/</a>
<a href="3.12.1/">3.12.1/</a>
<a href="3.11.8/">3.11.8/</a>
<a href="3.13.0a4/">3.13.0a4/</a>
<a href="2.7.18/">2.7.18/</a>"#;
    let transport = FakeTransport::default().with(PYTHON_FTP, listing);
    let provider = PythonProvider::new(&transport, linux_x64());

    assert_eq!(
        provider.list_filtered().expect("must list python"),
        vec!["3.12.2", "3.11.8", "2.7.18"]
    );
    assert_eq!(
        provider.list_all().expect("must list all python"),
        vec!["3.12.2", "3.12.1", "3.11.8", "2.7.18"]
    );
}

#[test]
fn python_scrape_falls_back_to_link_text() {
    let listing = "<a href='3.10.13/'>3.10.13/</a>\n<a href='3.9.18/'>3.9.18/</a>";
    let transport = FakeTransport::default().with(PYTHON_FTP, listing);
    let provider = PythonProvider::new(&transport, linux_x64());

    assert_eq!(
        provider.list_all().expect("must list python"),
        vec!["3.10.13", "3.9.18"]
    );
}

#[test]
fn python_windows_prefers_full_zip_then_embedded() {
    let release_dir = "https://www.python.org/ftp/python/3.12.2/";
    let listing = r#"<a href="python-3.12.2-embed-amd64.zip">x</a>
<a href="python-3.12.2-embed-arm64.zip">x</a>
<a href="python-3.12.2-amd64.zip">x</a>"#;
    let transport = FakeTransport::default().with(release_dir, listing);
    let provider = PythonProvider::new(&transport, windows_x64());

    assert_eq!(
        provider
            .download_url("3.12.2", &windows_x64())
            .expect("must pick zip"),
        Some("https://www.python.org/ftp/python/3.12.2/python-3.12.2-amd64.zip".to_string())
    );
    let arm = HostPlatform::new(HostOs::Windows, HostArch::Arm64);
    assert_eq!(
        provider.download_url("3.12.2", &arm).expect("must pick zip"),
        Some(
            "https://www.python.org/ftp/python/3.12.2/python-3.12.2-embed-arm64.zip".to_string()
        )
    );
}

#[test]
fn python_windows_probes_conventional_names_without_listing() {
    let embed = "https://www.python.org/ftp/python/3.11.8/python-3.11.8-embed-amd64.zip";
    let transport = FakeTransport::default().with_present(embed);
    let provider = PythonProvider::new(&transport, windows_x64());

    assert_eq!(
        provider
            .download_url("3.11.8", &windows_x64())
            .expect("must probe"),
        Some(embed.to_string())
    );
}

#[test]
fn python_unix_urls_pick_installer_or_sources() {
    let transport = FakeTransport::default();
    let provider = PythonProvider::new(&transport, linux_x64());

    assert_eq!(
        provider
            .download_url("3.12.2", &linux_x64())
            .expect("must build url"),
        Some("https://www.python.org/ftp/python/3.12.2/Python-3.12.2.tgz".to_string())
    );
    assert_eq!(
        provider
            .download_url("3.12.2", &HostPlatform::new(HostOs::Darwin, HostArch::Arm64))
            .expect("must build url"),
        Some("https://www.python.org/ftp/python/3.12.2/python-3.12.2-macos11.pkg".to_string())
    );
    assert_eq!(
        provider
            .download_url("3.12.2", &HostPlatform::new(HostOs::Darwin, HostArch::X64))
            .expect("must build url"),
        Some("https://www.python.org/ftp/python/3.12.2/python-3.12.2-macosx10.9.pkg".to_string())
    );
    assert_eq!(
        provider.archive_kind_for_file(Path::new("python-3.12.2-macos11.pkg")),
        Some(ArchiveKind::PlatformInstaller)
    );
}

#[test]
fn python_path_includes_scripts_and_bin_when_present() {
    let transport = FakeTransport::default();
    let provider = PythonProvider::new(&transport, windows_x64());
    let temp = TempDir::new().expect("must create temp dir");
    fs::create_dir_all(temp.path().join("Scripts")).expect("must create Scripts");

    let vars = provider
        .configure_env("3.12.2", temp.path())
        .expect("must configure env");
    let path = env_value(&vars, PATH_KEY).expect("must set PATH");
    assert_eq!(
        path,
        svm_core::EnvVar::path(&[temp.path().to_path_buf(), temp.path().join("Scripts")]).value
    );
    assert_eq!(
        env_value(&vars, "PYTHONHOME"),
        Some(temp.path().display().to_string())
    );
}

const DOTNET_INDEX_URL: &str =
    "https://dotnetcli.blob.core.windows.net/dotnet/release-metadata/releases-index.json";
const DOTNET_8_URL: &str = "https://example.test/8.0/releases.json";
const DOTNET_9_URL: &str = "https://example.test/9.0/releases.json";

fn dotnet_index() -> String {
    format!(
        r#"{{"releases-index": [
            {{"channel-version": "9.0", "latest-release": "9.0.0-rc.1.24431.7",
              "support-phase": "preview", "releases.json": "{DOTNET_9_URL}"}},
            {{"channel-version": "8.0", "latest-release": "8.0.2",
              "support-phase": "active", "releases.json": "{DOTNET_8_URL}"}},
            {{"channel-version": "6.0", "latest-release": "6.0.27",
              "support-phase": "eol", "releases.json": "https://example.test/6.0/releases.json"}}
        ]}}"#
    )
}

const DOTNET_8_RELEASES: &str = r#"{"releases": [
    {"release-version": "8.0.2",
     "sdk": {"version": "8.0.201", "files": [
        {"name": "dotnet-sdk-linux-x64.tar.gz", "rid": "linux-x64", "url": "https://example.test/sdk-linux-x64.tar.gz"},
        {"name": "dotnet-sdk-linux-x64.zip", "rid": "linux-x64", "url": "https://example.test/sdk-linux-x64.zip"},
        {"name": "dotnet-sdk-win-x64.exe", "rid": "win-x64", "url": "https://example.test/sdk-win-x64.exe"},
        {"name": "dotnet-sdk-win-x64.zip", "rid": "win-x64", "url": "https://example.test/sdk-win-x64.zip"}
     ]},
     "runtime": {"version": "8.0.2", "files": [
        {"name": "aspnetcore-runtime-linux-x64.tar.gz", "url": "https://example.test/asp-linux-x64.tar.gz"},
        {"name": "dotnet-runtime-linux-x64.tar.gz", "url": "https://example.test/runtime-linux-x64.tar.gz"}
     ]},
     "files": [
        {"name": "windowsdesktop-runtime-win-x64.zip", "url": "https://example.test/desktop-win-x64.zip"}
     ]},
    {"release-version": "8.0.1", "sdk": {"files": []}}
]}"#;

#[test]
fn dotnet_filtered_list_uses_latest_release_of_supported_channels() {
    let transport = FakeTransport::default().with(DOTNET_INDEX_URL, &dotnet_index());
    let provider = DotnetProvider::new(&transport, linux_x64(), DotnetComponent::Sdk);

    assert_eq!(
        provider.list_filtered().expect("must list dotnet"),
        vec!["9.0.0-rc.1.24431.7", "8.0.2"]
    );
}

#[test]
fn dotnet_full_list_skips_channels_that_fail() {
    let transport = FakeTransport::default()
        .with(DOTNET_INDEX_URL, &dotnet_index())
        .with(DOTNET_8_URL, DOTNET_8_RELEASES);
    let provider = DotnetProvider::new(&transport, linux_x64(), DotnetComponent::Sdk);

    assert_eq!(
        provider.list_all().expect("must list all dotnet"),
        vec!["8.0.2", "8.0.1"]
    );
    assert_eq!(transport.fetch_count(DOTNET_INDEX_URL), 1);
}

#[test]
fn dotnet_download_url_scores_files_for_component_and_host() {
    let transport = FakeTransport::default()
        .with(DOTNET_INDEX_URL, &dotnet_index())
        .with(DOTNET_8_URL, DOTNET_8_RELEASES);

    let sdk = DotnetProvider::new(&transport, linux_x64(), DotnetComponent::Sdk);
    assert_eq!(
        sdk.download_url("8.0.2", &linux_x64()).expect("must pick sdk"),
        Some("https://example.test/sdk-linux-x64.tar.gz".to_string())
    );
    assert_eq!(
        sdk.download_url("8.0.2", &windows_x64())
            .expect("must pick sdk"),
        Some("https://example.test/sdk-win-x64.zip".to_string())
    );

    let runtime = DotnetProvider::new(&transport, linux_x64(), DotnetComponent::Runtime);
    assert_eq!(
        runtime
            .download_url("8.0.2", &linux_x64())
            .expect("must pick runtime"),
        Some("https://example.test/runtime-linux-x64.tar.gz".to_string())
    );

    let desktop = DotnetProvider::new(&transport, windows_x64(), DotnetComponent::Desktop);
    assert_eq!(
        desktop
            .download_url("8.0.2", &windows_x64())
            .expect("must fall back to release files"),
        Some("https://example.test/desktop-win-x64.zip".to_string())
    );
    assert_eq!(
        desktop
            .download_url("8.0.2", &linux_x64())
            .expect("must search"),
        None
    );
    assert_eq!(
        sdk.download_url("7.0.5", &linux_x64())
            .expect("must search channels"),
        None
    );
}

#[test]
fn dotnet_scoring_requires_platform_and_supported_format() {
    assert_eq!(
        score_file("dotnet-sdk-linux-x64.tar.gz", "linux-x64", DotnetComponent::Sdk, "8.0.2", HostOs::Linux),
        Some(20)
    );
    assert_eq!(
        score_file("dotnet-sdk-linux-x64.zip", "linux-x64", DotnetComponent::Sdk, "8.0.2", HostOs::Linux),
        Some(15)
    );
    assert_eq!(
        score_file("dotnet-sdk-osx-arm64.pkg", "osx-arm64", DotnetComponent::Sdk, "8.0.2", HostOs::Darwin),
        Some(20)
    );
    assert_eq!(
        score_file("dotnet-sdk-win-x64.exe", "win-x64", DotnetComponent::Sdk, "8.0.2", HostOs::Windows),
        None
    );
    assert_eq!(
        score_file("dotnet-sdk-linux-arm64.tar.gz", "linux-x64", DotnetComponent::Sdk, "8.0.2", HostOs::Linux),
        None
    );
    assert_eq!(
        runtime_identifier(&HostPlatform::new(HostOs::Darwin, HostArch::X86)),
        None
    );
    assert_eq!(channel_of("8.0.2").as_deref(), Some("8.0"));
    assert_eq!(channel_of("9.0.0-rc.1.24431.7").as_deref(), Some("9.0"));
}

#[test]
fn dotnet_env_points_at_the_component_link() {
    let transport = FakeTransport::default();
    let link = Path::new("/svm").join("dotnet").join("sdk").join("current");

    let sdk = DotnetProvider::new(&transport, linux_x64(), DotnetComponent::Sdk);
    let vars = sdk.configure_env("8.0.2", &link).expect("must configure sdk");
    assert_eq!(
        env_value(&vars, "DOTNET_ROOT"),
        Some(link.display().to_string())
    );
    assert_eq!(env_value(&vars, PATH_KEY), Some(link.display().to_string()));
    assert_eq!(
        env_value(&vars, EXCLUDE_KEYWORDS_KEY),
        Some(format!(
            "{},{}",
            Path::new("/svm").join("dotnet").display(),
            Path::new("/svm").join("dotnet").join("sdk").display()
        ))
    );
    assert_eq!(sdk.bin_dir(&link), link);

    let runtime = DotnetProvider::new(&transport, linux_x64(), DotnetComponent::Runtime);
    let link = Path::new("/svm").join("dotnet").join("runtime").join("current");
    let vars = runtime
        .configure_env("8.0.2", &link)
        .expect("must configure runtime");
    assert_eq!(env_value(&vars, "DOTNET_ROOT"), None);
}

#[test]
fn dotnet_post_install_lifts_a_nested_executable() {
    let transport = FakeTransport::default();
    let provider = DotnetProvider::new(&transport, linux_x64(), DotnetComponent::Sdk);
    let temp = TempDir::new().expect("must create temp dir");
    let nested = temp.path().join("usr").join("share").join("dotnet");
    fs::create_dir_all(nested.join("host")).expect("must create nested tree");
    fs::write(nested.join("dotnet"), "#!/bin/sh").expect("must write executable");

    provider
        .post_install("8.0.2", temp.path())
        .expect("must lift executable");

    assert!(temp.path().join("dotnet").is_file());
    assert!(temp.path().join("host").is_dir());
}

#[test]
fn dotnet_post_install_fails_without_executable() {
    let transport = FakeTransport::default();
    let provider = DotnetProvider::new(&transport, linux_x64(), DotnetComponent::Runtime);
    let temp = TempDir::new().expect("must create temp dir");
    fs::create_dir_all(temp.path().join("shared")).expect("must create dir");

    let err = provider
        .post_install("8.0.2", temp.path())
        .expect_err("must fail");
    assert!(format!("{err:#}").contains("dotnet"));
}

#[test]
fn dotnet_reports_its_component() {
    let transport = FakeTransport::default();
    let provider = DotnetProvider::new(&transport, linux_x64(), DotnetComponent::AspCore);
    let components = provider.components().expect("must expose components");
    assert_eq!(components.component(), "asp-core");
    assert_eq!(components.supported_components(), DOTNET_COMPONENTS);
}

#[test]
fn catalog_failures_surface_as_catalog_fetch_errors() {
    let transport = FakeTransport::default().with(NODE_INDEX, "not json");
    let provider = NodeProvider::new(&transport, linux_x64());
    let err = provider.list_filtered().expect_err("must fail");
    assert!(matches!(
        err.downcast_ref::<SvmError>(),
        Some(SvmError::CatalogFetch { .. })
    ));

    let transport = FakeTransport::default();
    let provider = GoProvider::new(&transport, linux_x64());
    let err = provider.list_all().expect_err("must fail");
    assert!(matches!(
        err.downcast_ref::<SvmError>(),
        Some(SvmError::CatalogFetch { .. })
    ));
}

#[test]
fn newest_per_line_groups_by_depth() {
    let versions = ["1.2.3", "1.2.10", "1.3.0", "2.0.0", "bogus"]
        .into_iter()
        .map(str::to_string);
    assert_eq!(newest_per_line(versions, 2), vec!["2.0.0", "1.3.0", "1.2.10"]);
}

#[test]
fn provider_for_builds_each_toolchain() {
    let transport = FakeTransport::default();
    for toolchain in [
        Toolchain::Node,
        Toolchain::Go,
        Toolchain::Java,
        Toolchain::Python,
        Toolchain::Dotnet,
    ] {
        let provider =
            provider_for(toolchain, None, &transport, linux_x64()).expect("must build provider");
        assert_eq!(provider.name(), toolchain.as_str());
    }

    let dotnet = provider_for(Toolchain::Dotnet, Some("runtime"), &transport, linux_x64())
        .expect("must build runtime");
    assert_eq!(
        dotnet.components().map(|components| components.component()),
        Some("runtime")
    );
    assert!(provider_for(Toolchain::Dotnet, Some("bogus"), &transport, linux_x64()).is_err());
    assert!(provider_for(Toolchain::Node, Some("sdk"), &transport, linux_x64()).is_err());
}
