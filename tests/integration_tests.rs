//! Integration tests for timeline
//!
//! These tests run the builder and the aggregator against real temporary
//! directory trees.
//!
//! Test categories:
//! 1. Selection and placement
//! 2. Re-runs and pre-existing output
//! 3. Collisions and failures
//! 4. Counting and the report file
//! 5. Configuration-driven runs

use chrono::{Local, TimeZone};
use filetime::FileTime;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;
use timeline::cli::{build_timeline, count_timeline};
use timeline::{
    BuildError, CountEntry, ExtensionSet, FailurePolicy, TimelineAggregator, TimelineBuilder,
    TimelineConfig,
};

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary workspace with a `sources` directory and an `timeline` output
/// directory (not created until something is written to it).
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        TestFixture { temp_dir }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn sources(&self) -> PathBuf {
        self.path().join("sources")
    }

    fn output(&self) -> PathBuf {
        self.path().join("timeline")
    }

    /// Create a file below `sources` with content and a pinned modification
    /// time (noon, local time, on the given day).
    fn create_source(&self, rel_path: &str, content: &[u8], date: (i32, u32, u32)) -> PathBuf {
        let path = self.sources().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        let mut file = File::create(&path).expect("Failed to create file");
        file.write_all(content)
            .expect("Failed to write file content");
        drop(file);

        filetime::set_file_mtime(&path, FileTime::from_system_time(noon(date)))
            .expect("Failed to set mtime");
        path
    }

    fn builder(&self, extensions: &[&str]) -> TimelineBuilder {
        TimelineBuilder::new(self.output(), ExtensionSet::new(extensions.iter().copied()))
    }

    fn assert_output_exists(&self, rel_path: &str) {
        let path = self.output().join(rel_path);
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    /// All files below the output directory, relative to it, sorted.
    fn output_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        Self::walk_dir(&self.output(), &mut files);
        let root = self.output();
        let mut files: Vec<PathBuf> = files
            .into_iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_path_buf())
            .collect();
        files.sort();
        files
    }

    fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) {
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    files.push(path);
                } else if path.is_dir() {
                    Self::walk_dir(&path, files);
                }
            }
        }
    }

    /// Snapshot of every output file and its bytes.
    fn output_snapshot(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.output_files()
            .into_iter()
            .map(|rel| {
                let bytes = fs::read(self.output().join(&rel)).expect("Failed to read output");
                (rel, bytes)
            })
            .collect()
    }
}

fn noon((y, m, d): (i32, u32, u32)) -> SystemTime {
    Local
        .with_ymd_and_hms(y, m, d, 12, 0, 0)
        .single()
        .expect("unambiguous local time")
        .into()
}

// First six hex digits of SHA-256 of the test contents.
const ABC_HASH6: &str = "ba7816";
const EMPTY_HASH6: &str = "e3b0c4";

// ============================================================================
// Test Suite 1: Selection and Placement
// ============================================================================

#[test]
fn test_allowed_file_lands_in_date_bucket() {
    let fixture = TestFixture::new();
    fixture.create_source("beach.jpg", b"abc", (2024, 3, 9));

    let report = fixture
        .builder(&[".jpg"])
        .build(&[fixture.sources()])
        .expect("build failed");

    assert_eq!(report.placed, 1);
    assert!(report.planned.is_empty());
    fixture.assert_output_exists(&format!("2024_03_09/beach_{}.jpg", ABC_HASH6));
    assert_eq!(fixture.output_files().len(), 1);
}

#[test]
fn test_nested_source_folders_are_flattened() {
    let fixture = TestFixture::new();
    fixture.create_source("2019/summer/beach.jpg", b"abc", (2019, 7, 1));
    fixture.create_source("phone/empty.jpg", b"", (2019, 7, 2));

    fixture
        .builder(&[".jpg"])
        .build(&[fixture.sources()])
        .expect("build failed");

    assert_eq!(
        fixture.output_files(),
        vec![
            PathBuf::from("2019_07_01").join(format!("beach_{}.jpg", ABC_HASH6)),
            PathBuf::from("2019_07_02").join(format!("empty_{}.jpg", EMPTY_HASH6)),
        ]
    );
}

#[test]
fn test_copy_preserves_content_and_source() {
    let fixture = TestFixture::new();
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let source = fixture.create_source("video.mp4", &content, (2022, 12, 31));

    let report = fixture
        .builder(&[".mp4"])
        .build(&[fixture.sources()])
        .expect("build failed");

    assert_eq!(report.placed, 1);
    let files = fixture.output_files();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("2022_12_31"));
    assert_eq!(fs::read(fixture.output().join(&files[0])).unwrap(), content);
    assert_eq!(fs::read(&source).unwrap(), content);
}

#[test]
fn test_disallowed_extension_is_not_copied() {
    let fixture = TestFixture::new();
    fixture.create_source("notes.txt", b"abc", (2024, 1, 1));
    fixture.create_source("photo.JPG", b"abc", (2024, 1, 1));
    fixture.create_source("README", b"abc", (2024, 1, 1));

    let report = fixture
        .builder(&[".jpg"])
        .build(&[fixture.sources()])
        .expect("build failed");

    assert_eq!(report.unmatched, 3);
    assert!(fixture.output_files().is_empty());
}

#[test]
fn test_reserved_marker_excludes_even_matching_files() {
    let fixture = TestFixture::new();
    fixture.create_source("price$list.jpg", b"abc", (2024, 1, 1));
    fixture.create_source("$Recycle.Bin/S-1-5/old.jpg", b"abc", (2024, 1, 1));
    fixture.create_source("backup$/kept.jpg", b"abc", (2024, 1, 1));
    fixture.create_source("ok.jpg", b"abc", (2024, 1, 1));

    let report = fixture
        .builder(&[".jpg"])
        .build(&[fixture.sources()])
        .expect("build failed");

    assert_eq!(report.excluded, 3);
    assert_eq!(
        fixture.output_files(),
        vec![PathBuf::from("2024_01_01").join(format!("ok_{}.jpg", ABC_HASH6))]
    );
}

#[test]
fn test_empty_extension_set_selects_nothing() {
    let fixture = TestFixture::new();
    fixture.create_source("beach.jpg", b"abc", (2024, 1, 1));

    let report = fixture
        .builder(&[])
        .build(&[fixture.sources()])
        .expect("build failed");

    assert_eq!(report.placed, 0);
    assert!(!fixture.output().exists());
}

#[test]
fn test_multiple_roots_processed_in_order() {
    let fixture = TestFixture::new();
    fixture.create_source("a/one.jpg", b"1", (2024, 1, 1));
    fixture.create_source("b/two.jpg", b"2", (2024, 1, 2));

    let roots = vec![fixture.sources().join("b"), fixture.sources().join("a")];
    let report = fixture
        .builder(&[".jpg"])
        .with_dry_run(true)
        .build(&roots)
        .expect("build failed");

    let sources: Vec<_> = report.planned.iter().map(|p| p.source.clone()).collect();
    assert_eq!(
        sources,
        vec![
            fixture.sources().join("b").join("two.jpg"),
            fixture.sources().join("a").join("one.jpg"),
        ]
    );
}

// ============================================================================
// Test Suite 2: Re-runs and Pre-existing Output
// ============================================================================

#[test]
fn test_rebuild_is_idempotent() {
    let fixture = TestFixture::new();
    fixture.create_source("a.jpg", b"first", (2024, 1, 1));
    fixture.create_source("sub/b.jpg", b"second", (2024, 2, 1));
    fixture.create_source("sub/c.png", b"third", (2024, 2, 1));
    let builder = fixture.builder(&[".jpg", ".png"]);

    builder.build(&[fixture.sources()]).expect("first build failed");
    let first = fixture.output_snapshot();

    builder.build(&[fixture.sources()]).expect("second build failed");
    let second = fixture.output_snapshot();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[test]
fn test_existing_buckets_are_reused() {
    let fixture = TestFixture::new();
    fixture.create_source("a.jpg", b"a", (2024, 1, 1));
    fixture.create_source("b.jpg", b"b", (2024, 1, 2));
    fs::create_dir_all(fixture.output().join("2024_01_01")).unwrap();
    fs::write(fixture.output().join("2024_01_01").join("keep.txt"), "x").unwrap();

    let report = fixture
        .builder(&[".jpg"])
        .build(&[fixture.sources()])
        .expect("build should not fail on existing buckets");

    assert_eq!(report.placed, 2);
    fixture.assert_output_exists("2024_01_01/keep.txt");
    assert_eq!(fixture.output_files().len(), 3);
}

#[test]
fn test_dry_run_writes_nothing() {
    let fixture = TestFixture::new();
    fixture.create_source("beach.jpg", b"abc", (2024, 3, 9));

    let report = fixture
        .builder(&[".jpg"])
        .with_dry_run(true)
        .build(&[fixture.sources()])
        .expect("dry run failed");

    assert_eq!(report.placed, 1);
    assert_eq!(
        report.planned[0].destination,
        fixture
            .output()
            .join("2024_03_09")
            .join(format!("beach_{}.jpg", ABC_HASH6))
    );
    assert!(!fixture.output().exists());
}

// ============================================================================
// Test Suite 3: Collisions and Failures
// ============================================================================

#[test]
fn test_same_name_same_content_collapses_without_error() {
    let fixture = TestFixture::new();
    fixture.create_source("camera/IMG_0001.jpg", b"abc", (2024, 5, 5));
    fixture.create_source("phone/IMG_0001.jpg", b"abc", (2024, 5, 5));

    let report = fixture
        .builder(&[".jpg"])
        .build(&[fixture.sources()])
        .expect("collision must not be fatal");

    assert_eq!(report.placed, 2);
    assert_eq!(report.overwritten, 1);
    assert_eq!(report.distinct_destinations(), 1);
    assert_eq!(
        fixture.output_files(),
        vec![PathBuf::from("2024_05_05").join(format!("IMG_0001_{}.jpg", ABC_HASH6))]
    );
}

#[test]
fn test_same_name_different_content_both_kept() {
    let fixture = TestFixture::new();
    fixture.create_source("camera/IMG_0001.jpg", b"abc", (2024, 5, 5));
    fixture.create_source("phone/IMG_0001.jpg", b"", (2024, 5, 5));

    let report = fixture
        .builder(&[".jpg"])
        .build(&[fixture.sources()])
        .expect("build failed");

    assert_eq!(report.overwritten, 0);
    assert_eq!(fixture.output_files().len(), 2);
}

/// Places a regular file where the 2024_01_01 bucket directory would go.
fn block_bucket(fixture: &TestFixture) {
    fs::create_dir_all(fixture.output()).unwrap();
    fs::write(fixture.output().join("2024_01_01"), "in the way").unwrap();
}

#[test]
fn test_directory_creation_failure_aborts_by_default() {
    let fixture = TestFixture::new();
    fixture.create_source("a.jpg", b"a", (2024, 1, 1));
    fixture.create_source("b.jpg", b"b", (2024, 1, 2));
    block_bucket(&fixture);

    let result = fixture.builder(&[".jpg"]).build(&[fixture.sources()]);

    assert!(matches!(result, Err(BuildError::DirectoryCreation { .. })));
    assert!(!fixture.output().join("2024_01_02").exists());
}

#[test]
fn test_skip_file_policy_continues_past_failures() {
    let fixture = TestFixture::new();
    fixture.create_source("a.jpg", b"a", (2024, 1, 1));
    fixture.create_source("b.jpg", b"b", (2024, 1, 2));
    block_bucket(&fixture);

    let report = fixture
        .builder(&[".jpg"])
        .with_failure_policy(FailurePolicy::SkipFile)
        .build(&[fixture.sources()])
        .expect("skip-file policy should not abort");

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, fixture.sources().join("a.jpg"));
    assert_eq!(report.placed, 1);
    assert!(fixture.output().join("2024_01_02").is_dir());
}

#[cfg(unix)]
fn dangling_link(fixture: &TestFixture, name: &str) -> PathBuf {
    let link = fixture.sources().join(name);
    std::os::unix::fs::symlink(fixture.sources().join("gone.jpg"), &link)
        .expect("Failed to create symlink");
    link
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_aborts_by_default() {
    let fixture = TestFixture::new();
    fixture.create_source("b.jpg", b"b", (2024, 1, 2));
    let link = dangling_link(&fixture, "a.jpg");

    let result = fixture.builder(&[".jpg"]).build(&[fixture.sources()]);

    match result {
        Err(BuildError::Io { action, path, .. }) => {
            assert_eq!(action, "open");
            assert_eq!(path, link);
        }
        other => panic!("expected open error, got {:?}", other),
    }
    assert!(!fixture.output().exists());
}

#[cfg(unix)]
#[test]
fn test_skip_file_policy_continues_past_unreadable_file() {
    let fixture = TestFixture::new();
    fixture.create_source("b.jpg", b"abc", (2024, 1, 2));
    let link = dangling_link(&fixture, "a.jpg");

    let report = fixture
        .builder(&[".jpg"])
        .with_failure_policy(FailurePolicy::SkipFile)
        .build(&[fixture.sources()])
        .expect("skip-file policy should not abort");

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, link);
    assert_eq!(report.placed, 1);
    fixture.assert_output_exists(&format!("2024_01_02/b_{}.jpg", ABC_HASH6));
}

#[cfg(unix)]
#[test]
fn test_symlinked_source_file_is_copied_under_link_name() {
    let fixture = TestFixture::new();
    let real = fixture.create_source("real.jpg", b"abc", (2024, 4, 1));
    std::os::unix::fs::symlink(&real, fixture.sources().join("link.jpg"))
        .expect("Failed to create symlink");

    let report = fixture
        .builder(&[".jpg"])
        .build(&[fixture.sources()])
        .expect("build failed");

    assert_eq!(report.placed, 2);
    assert_eq!(
        fixture.output_files(),
        vec![
            PathBuf::from("2024_04_01").join(format!("link_{}.jpg", ABC_HASH6)),
            PathBuf::from("2024_04_01").join(format!("real_{}.jpg", ABC_HASH6)),
        ]
    );
    assert_eq!(
        fs::read(fixture.output().join("2024_04_01").join(format!("link_{}.jpg", ABC_HASH6)))
            .unwrap(),
        b"abc"
    );
}

#[cfg(unix)]
#[test]
fn test_symlinked_source_directory_is_not_followed() {
    let fixture = TestFixture::new();
    fixture.create_source("kept.jpg", b"abc", (2024, 4, 1));
    let elsewhere = fixture.path().join("elsewhere");
    fs::create_dir_all(&elsewhere).unwrap();
    fs::write(elsewhere.join("outside.jpg"), "x").unwrap();
    std::os::unix::fs::symlink(&elsewhere, fixture.sources().join("linked"))
        .expect("Failed to create symlink");

    let report = fixture
        .builder(&[".jpg"])
        .build(&[fixture.sources()])
        .expect("build failed");

    assert_eq!(report.placed, 1);
    assert_eq!(fixture.output_files().len(), 1);
}

#[test]
fn test_missing_source_root_is_fatal() {
    let fixture = TestFixture::new();
    fixture.create_source("a.jpg", b"a", (2024, 1, 1));

    let roots = vec![fixture.path().join("does-not-exist"), fixture.sources()];
    let result = fixture.builder(&[".jpg"]).build(&roots);

    assert!(matches!(result, Err(BuildError::Traversal { .. })));
    assert!(!fixture.output().exists());
}

// ============================================================================
// Test Suite 4: Counting and the Report File
// ============================================================================

#[test]
fn test_aggregation_report_order() {
    let fixture = TestFixture::new();
    let output = fixture.output();
    fs::create_dir_all(output.join("2024_01_01")).unwrap();
    fs::create_dir_all(output.join("2024_01_02")).unwrap();
    fs::write(output.join("2024_01_01").join("a_111111.jpg"), "a").unwrap();
    fs::write(output.join("2024_01_01").join("b_222222.jpg"), "b").unwrap();
    fs::write(output.join("2024_01_02").join("c_333333.txt"), "c").unwrap();

    let aggregator = TimelineAggregator::new(&output, "file_count.csv");
    let entries = aggregator.run().expect("count failed");

    assert_eq!(
        entries,
        vec![
            CountEntry::new("2024_01_02", "txt", 1),
            CountEntry::new("2024_01_01", "jpg", 2),
        ]
    );
    assert_eq!(
        fs::read_to_string(output.join("file_count.csv")).unwrap(),
        "Folder;File Type;Count\n2024_01_02;txt;1\n2024_01_01;jpg;2\n"
    );
}

#[test]
fn test_recount_ignores_previous_report() {
    let fixture = TestFixture::new();
    let output = fixture.output();
    fs::create_dir_all(output.join("2024_01_01")).unwrap();
    fs::write(output.join("2024_01_01").join("a_111111.jpg"), "a").unwrap();

    let aggregator = TimelineAggregator::new(&output, "file_count.csv");
    let first = aggregator.run().expect("first count failed");
    let second = aggregator.run().expect("second count failed");

    assert_eq!(first, second);
    assert_eq!(second, vec![CountEntry::new("2024_01_01", "jpg", 1)]);
}

#[test]
fn test_count_after_build() {
    let fixture = TestFixture::new();
    fixture.create_source("a.jpg", b"a", (2023, 6, 1));
    fixture.create_source("b.jpg", b"b", (2023, 6, 1));
    fixture.create_source("c.mp4", b"c", (2023, 6, 1));
    fixture.create_source("d.jpg", b"d", (2024, 6, 1));
    fixture
        .builder(&[".jpg", ".mp4"])
        .build(&[fixture.sources()])
        .expect("build failed");

    let entries = TimelineAggregator::new(fixture.output(), "file_count.csv")
        .run()
        .expect("count failed");

    assert_eq!(
        entries,
        vec![
            CountEntry::new("2024_06_01", "jpg", 1),
            CountEntry::new("2023_06_01", "jpg", 2),
            CountEntry::new("2023_06_01", "mp4", 1),
        ]
    );
}

#[test]
fn test_count_missing_output_is_error() {
    let fixture = TestFixture::new();
    let aggregator = TimelineAggregator::new(fixture.output(), "file_count.csv");
    assert!(aggregator.run().is_err());
}

// ============================================================================
// Test Suite 5: Configuration-driven Runs
// ============================================================================

fn write_lists(fixture: &TestFixture, roots: &[PathBuf], extensions: &str) -> TimelineConfig {
    let sources_file = fixture.path().join("inputFolders.csv");
    let extensions_file = fixture.path().join("extensions.csv");
    let roots: Vec<String> = roots
        .iter()
        .map(|root| format!("{};comment", root.display()))
        .collect();
    fs::write(&sources_file, roots.join("\n")).unwrap();
    fs::write(&extensions_file, extensions).unwrap();

    TimelineConfig {
        sources_file,
        extensions_file,
        output_root: fixture.output(),
        ..Default::default()
    }
}

#[test]
fn test_build_and_count_from_config() {
    let fixture = TestFixture::new();
    fixture.create_source("beach.jpg", b"abc", (2024, 3, 9));
    fixture.create_source("clip.mov", b"abc", (2024, 3, 10));
    let config = write_lists(&fixture, &[fixture.sources()], ".jpg\n.mov;video\n");

    let report = build_timeline(&config, false).expect("build failed");
    assert_eq!(report.placed, 2);

    count_timeline(&config, false).expect("count failed");
    assert_eq!(
        fs::read_to_string(config.report_path()).unwrap(),
        "Folder;File Type;Count\n2024_03_10;mov;1\n2024_03_09;jpg;1\n"
    );
}

#[test]
fn test_missing_list_is_config_error() {
    let fixture = TestFixture::new();
    let config = TimelineConfig {
        sources_file: fixture.path().join("missing.csv"),
        extensions_file: fixture.path().join("missing-too.csv"),
        output_root: fixture.output(),
        ..Default::default()
    };

    let err = build_timeline(&config, false).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_dry_run_from_config_writes_nothing() {
    let fixture = TestFixture::new();
    fixture.create_source("beach.jpg", b"abc", (2024, 3, 9));
    let config = write_lists(&fixture, &[fixture.sources()], ".jpg\n");

    let report = build_timeline(&config, true).expect("dry run failed");
    assert_eq!(report.placed, 1);
    assert_eq!(report.planned.len(), 1);
    assert!(!fixture.output().exists());
}
