#![cfg(unix)]

use std::path::Path;
use unarc_core::catalog::{Catalog, Tool, ToolKind};
use unarc_core::mime::{self, MediaType};
use unarc_core::{CommandLine, Error, ExecutableSearch, Resolver};
use unarc_testing::fixtures::{fake_archive, fake_tool, GZIP_SCRIPT, TAR_SCRIPT, UNZIP_SCRIPT};
use unarc_testing::TestDir;

fn search_in(test_dir: &TestDir) -> ExecutableSearch {
    ExecutableSearch::with_path(test_dir.search_path().unwrap())
}

/// A catalog without any tar-capable tool
fn zip_and_gzip_catalog() -> &'static Catalog {
    Box::leak(Box::new(Catalog::from_tools(vec![
        Tool::archive(
            CommandLine::new("unzip", ["-o", "%{src}", "-d", "%{dest}"]),
            [mime::ZIP],
        ),
        Tool::stream_decompressor(
            CommandLine::new("gzip", ["-d", "%{src}", "-c"]),
            [mime::GZIP],
        ),
    ])))
}

#[test]
fn test_first_installed_candidate_wins() {
    let test_dir = TestDir::new().unwrap();
    let bin = test_dir.bin_dir().unwrap();
    let unzip = fake_tool(&bin, "unzip", UNZIP_SCRIPT).unwrap();
    fake_tool(&bin, "tar", TAR_SCRIPT).unwrap();
    let archive = fake_archive(&test_dir.path().join("a.zip"), &[]).unwrap();

    let resolver = Resolver::new().search(search_in(&test_dir));
    for _ in 0..3 {
        let resolved = resolver.resolve(&archive).unwrap();
        assert_eq!(resolved.command().executable(), unzip);
        assert_eq!(resolved.kind(), &ToolKind::Archive);
        assert_eq!(resolved.source_file(), archive);
    }
}

#[test]
fn test_falls_through_to_later_candidate() {
    let test_dir = TestDir::new().unwrap();
    let tar = fake_tool(&test_dir.bin_dir().unwrap(), "tar", TAR_SCRIPT).unwrap();
    let archive = fake_archive(&test_dir.path().join("a.zip"), &[]).unwrap();

    let resolved = Resolver::new()
        .search(search_in(&test_dir))
        .resolve(&archive)
        .unwrap();
    assert_eq!(resolved.command().executable(), tar);
    assert_eq!(
        resolved.command().to_string(),
        format!("{} xvf %{{src}}", tar.display())
    );
}

#[test]
fn test_extra_dirs_are_searched_after_path() {
    let test_dir = TestDir::new().unwrap();
    let extra = test_dir.create_dir("opt/bin").unwrap();
    let unzip = fake_tool(&extra, "unzip", UNZIP_SCRIPT).unwrap();
    let archive = fake_archive(&test_dir.path().join("a.zip"), &[]).unwrap();

    let resolver = Resolver::new().search(search_in(&test_dir).with_extra_dirs([extra]));
    assert_eq!(
        resolver.resolve(&archive).unwrap().command().executable(),
        unzip
    );
}

#[test]
fn test_no_executable_found_lists_every_candidate() {
    let test_dir = TestDir::new().unwrap();
    let archive = fake_archive(&test_dir.path().join("a.zip"), &[]).unwrap();

    let err = Resolver::new()
        .search(search_in(&test_dir))
        .resolve(&archive)
        .unwrap_err();
    assert!(err.is_resolution_error());

    let expected = vec!["unzip", "7z", "cmake", "tar"];
    match &err {
        Error::NoExecutableFound { executables } => assert_eq!(executables, &expected),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        err.to_string(),
        format!(
            "Could not find any unarchiving executable in PATH ({}).",
            expected.join(", ")
        )
    );
}

#[test]
fn test_gzip_never_selected_for_compressed_tar() {
    let test_dir = TestDir::new().unwrap();
    fake_tool(&test_dir.bin_dir().unwrap(), "gzip", GZIP_SCRIPT).unwrap();
    let archive = fake_archive(&test_dir.path().join("archive.tar.gz"), &[]).unwrap();

    let resolver = Resolver::with_catalog(zip_and_gzip_catalog()).search(search_in(&test_dir));
    match resolver.resolve(&archive) {
        Err(Error::UnsupportedFormat(media_type)) => assert_eq!(media_type, mime::COMPRESSED_TAR),
        other => panic!("unexpected result: {other:?}"),
    }

    // With the tar tools in the catalog but absent, gzip is still not a candidate.
    match Resolver::new().search(search_in(&test_dir)).resolve(&archive) {
        Err(Error::NoExecutableFound { executables }) => assert_eq!(executables, ["cmake", "tar"]),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_plain_gzip_resolves_to_stream_decompressor() {
    let test_dir = TestDir::new().unwrap();
    let gzip = fake_tool(&test_dir.bin_dir().unwrap(), "gzip", GZIP_SCRIPT).unwrap();
    let source = test_dir.create_file("data.gz", b"payload").unwrap();

    let resolved = Resolver::with_catalog(zip_and_gzip_catalog())
        .search(search_in(&test_dir))
        .resolve(&source)
        .unwrap();
    assert_eq!(resolved.kind(), &ToolKind::StreamDecompressor);
    assert_eq!(resolved.command().executable(), gzip);
}

#[test]
fn test_custom_detector_overrides_file_name() {
    let test_dir = TestDir::new().unwrap();
    let unzip = fake_tool(&test_dir.bin_dir().unwrap(), "unzip", UNZIP_SCRIPT).unwrap();

    let resolver = Resolver::new()
        .search(search_in(&test_dir))
        .detector(|_: &Path| MediaType::new(mime::ZIP));
    let resolved = resolver.resolve(Path::new("download.bin")).unwrap();
    assert_eq!(resolved.command().executable(), unzip);
}

#[test]
fn test_content_sniffing_beats_misleading_name() {
    let test_dir = TestDir::new().unwrap();
    fake_tool(&test_dir.bin_dir().unwrap(), "gzip", GZIP_SCRIPT).unwrap();
    let source = test_dir
        .create_file("looks-like.zip", &[0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0])
        .unwrap();

    let resolved = Resolver::new()
        .search(search_in(&test_dir))
        .resolve(&source)
        .unwrap();
    assert_eq!(resolved.kind(), &ToolKind::StreamDecompressor);
}
