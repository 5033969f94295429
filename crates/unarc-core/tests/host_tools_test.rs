//! Extraction with the real tools of the host, skipped when they are missing

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::Path;
use unarc_core::{DoneResult, ExecutableSearch, Unarchiver};
use unarc_testing::assertions::{assert_file_content, assert_files_exactly};
use unarc_testing::TestDir;

fn host_has(tool: &str) -> bool {
    let found = ExecutableSearch::from_env()
        .find(Path::new(tool), &[])
        .is_some();
    if !found {
        eprintln!("Skipping: {tool} not found on PATH");
    }
    found
}

#[tokio::test]
async fn test_real_gzip_stream() {
    if !host_has("gzip") {
        return;
    }
    let test_dir = TestDir::new().unwrap();
    let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&payload).unwrap();
    let source = test_dir
        .create_file("blob.bin.gz", &encoder.finish().unwrap())
        .unwrap();
    let dest = test_dir.path().join("out");

    let mut unarchiver = Unarchiver::new();
    unarchiver.set_source(&source).unwrap();
    unarchiver.set_destination(&dest);
    let result = unarchiver.run(|_| {}).await;

    assert_eq!(result, DoneResult::Success);
    assert_files_exactly(&dest, &["blob.bin"]).unwrap();
    assert_file_content(&dest.join("blob.bin"), &payload).unwrap();
}

#[tokio::test]
async fn test_real_zip_archive() {
    // Plain tar cannot be relied on to read zip files.
    if !host_has("unzip") && !host_has("7z") {
        return;
    }
    let test_dir = TestDir::new().unwrap();
    let source = test_dir.path().join("bundle.zip");

    let mut writer = zip::ZipWriter::new(std::fs::File::create(&source).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    writer.start_file("hello.txt", options).unwrap();
    writer.write_all(b"Hello, World!").unwrap();
    writer.start_file("nested/data.txt", options).unwrap();
    writer.write_all(b"data").unwrap();
    writer.finish().unwrap();
    let dest = test_dir.path().join("out");

    let mut unarchiver = Unarchiver::new();
    unarchiver.set_source(&source).unwrap();
    unarchiver.set_destination(&dest);
    let mut output = String::new();
    let result = unarchiver.run(|text| output.push_str(text)).await;

    assert_eq!(result, DoneResult::Success, "output: {output}");
    assert_file_content(&dest.join("hello.txt"), b"Hello, World!").unwrap();
    assert_file_content(&dest.join("nested/data.txt"), b"data").unwrap();
}
