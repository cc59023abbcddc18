//! Commit pipeline integration tests: strategy selection, fallbacks, and
//! the on-disk effects of each commit.

mod common;

use common::fixtures::{PsdBuilder, noise, zeros};
use common::{test_repo, test_repo_with};
use dgit_engine::error::ErrorKind;

#[test]
fn test_first_commit_small_mixed_set() {
    let mut fixture = test_repo();
    fixture.write_file("icon.png", &noise(7, 12 * 1024));
    fixture.write_file("notes.txt", &vec![b'n'; 400]);
    fixture.repo.stage("icon.png").unwrap();
    fixture.repo.stage("notes.txt").unwrap();

    let record = fixture.repo.commit("init").unwrap();
    assert_eq!(record.version, 1);
    assert_eq!(record.message, "init");
    assert_eq!(record.files_count, 2);
    assert_eq!(record.hash.len(), 12);
    assert!(record.hash.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(record.parent_hash, "");

    let layout = fixture.layout();
    assert!(layout.commit_record(1).is_file());
    assert!(layout.version_snapshot(1).is_file());
    let info = record.compression_info.as_ref().unwrap();
    assert_eq!(info.strategy, "lz4");
    assert_eq!(info.original_size, 12 * 1024 + 400);

    // HEAD holds the commit hash.
    assert_eq!(fixture.repo.head().unwrap().as_deref(), Some(record.hash.as_str()));
    // Staging is consumed by the commit.
    assert!(fixture.repo.staged_files().is_empty());

    // The snapshot decodes back to byte-identical files.
    let out = fixture.out_dir("restore");
    let result = fixture.repo.restore("v1", &[], &out).unwrap();
    assert_eq!(result.method.as_str(), "lz4");
    assert_eq!(result.restored, vec!["icon.png", "notes.txt"]);
    assert_eq!(std::fs::read(out.join("icon.png")).unwrap(), noise(7, 12 * 1024));
    assert_eq!(std::fs::read(out.join("notes.txt")).unwrap(), vec![b'n'; 400]);
}

#[test]
fn test_empty_staging_creates_nothing() {
    let mut fixture = test_repo();
    let err = fixture.repo.commit("nothing staged").unwrap_err();
    assert!(matches!(&*err, ErrorKind::EmptyStaging));

    let layout = fixture.layout();
    assert!(!layout.commit_record(1).exists());
    assert!(!layout.version_snapshot(1).exists());
    assert_eq!(fixture.repo.head().unwrap(), None);
    assert_eq!(fixture.repo.current_version().unwrap(), 0);
}

#[test]
fn test_second_commit_single_psd_takes_smart_delta() {
    let mut fixture = test_repo();
    // A padded document so the delta ratio clears the 0.7 threshold.
    PsdBuilder::new(1920, 1080)
        .resources(zeros(64 * 1024))
        .layer("Background")
        .layer("Old Title")
        .write_to(&fixture.write_file("design.psd", b""));
    fixture.repo.stage("design.psd").unwrap();
    fixture.repo.commit("v1").unwrap();

    // Same document with one renamed layer.
    PsdBuilder::new(1920, 1080)
        .resources(zeros(64 * 1024))
        .layer("Background")
        .layer("New Title")
        .write_to(&fixture.path().join("design.psd"));
    fixture.repo.stage("design.psd").unwrap();
    let record = fixture.repo.commit("rename title layer").unwrap();

    let info = record.compression_info.as_ref().unwrap();
    assert_eq!(info.strategy, "psd_smart");
    assert_eq!(info.base_version, Some(1));
    assert!(info.compression_ratio <= 0.7);
    let layout = fixture.layout();
    assert!(layout.smart_delta(2, 1).is_file());
    assert!(!layout.version_snapshot(2).exists());

    // The manifest records the rename as one addition plus one deletion.
    let manifest = dgit_compress::smart::read_manifest(&layout.smart_delta(2, 1)).unwrap();
    assert!(manifest.layer_analysis.changes_summary.contains("1 added"));
    assert!(manifest.layer_analysis.changes_summary.contains("1 deleted"));
    assert_eq!(manifest.from_version, 1);
    assert_eq!(manifest.to_version, 2);

    // Restore reproduces the staged bytes exactly.
    let out = fixture.out_dir("restore");
    let result = fixture.repo.restore("v2", &[], &out).unwrap();
    assert_eq!(result.method.as_str(), "smart_delta");
    let expected = std::fs::read(fixture.path().join("design.psd")).unwrap();
    assert_eq!(std::fs::read(out.join("design.psd")).unwrap(), expected);
}

#[test]
fn test_ineffective_delta_falls_back_to_snapshot() {
    let mut fixture = test_repo();
    PsdBuilder::new(800, 600)
        .resources(noise(11, 64 * 1024))
        .layer("Background")
        .write_to(&fixture.write_file("design.psd", b""));
    fixture.repo.stage("design.psd").unwrap();
    fixture.repo.commit("v1").unwrap();

    // A second revision sharing no compressible structure: the smart delta
    // cannot beat 0.7x and must be discarded for a snapshot.
    PsdBuilder::new(800, 600)
        .resources(noise(99, 64 * 1024))
        .layer("Background")
        .write_to(&fixture.path().join("design.psd"));
    fixture.repo.stage("design.psd").unwrap();
    let record = fixture.repo.commit("total rework").unwrap();

    let info = record.compression_info.as_ref().unwrap();
    assert_eq!(info.strategy, "lz4");
    assert!(info.base_version.is_none());
    let layout = fixture.layout();
    assert!(!layout.smart_delta(2, 1).exists());
    assert!(layout.version_snapshot(2).is_file());

    let out = fixture.out_dir("restore");
    fixture.repo.restore("2", &[], &out).unwrap();
    let expected = std::fs::read(fixture.path().join("design.psd")).unwrap();
    assert_eq!(std::fs::read(out.join("design.psd")).unwrap(), expected);
}

#[test]
fn test_psd_with_companion_takes_binary_delta() {
    let mut fixture = test_repo();
    PsdBuilder::new(640, 480)
        .resources(zeros(32 * 1024))
        .layer("Background")
        .write_to(&fixture.write_file("design.psd", b""));
    fixture.write_file("notes.txt", b"layer naming conventions\n");
    fixture.repo.stage("design.psd").unwrap();
    fixture.repo.stage("notes.txt").unwrap();
    fixture.repo.commit("v1").unwrap();

    fixture.write_file("notes.txt", b"layer naming conventions\nplus an addendum\n");
    fixture.repo.stage("design.psd").unwrap();
    fixture.repo.stage("notes.txt").unwrap();
    let record = fixture.repo.commit("v2").unwrap();

    let info = record.compression_info.as_ref().unwrap();
    assert_eq!(info.strategy, "bsdiff");
    assert_eq!(info.base_version, Some(1));
    assert!(fixture.layout().binary_delta(2, 1).is_file());

    // Both files come back through the delta chain.
    let out = fixture.out_dir("restore");
    let result = fixture.repo.restore("v2", &[], &out).unwrap();
    assert_eq!(result.method.as_str(), "delta_chain");
    assert_eq!(
        std::fs::read(out.join("notes.txt")).unwrap(),
        b"layer naming conventions\nplus an addendum\n"
    );
    let expected = std::fs::read(fixture.path().join("design.psd")).unwrap();
    assert_eq!(std::fs::read(out.join("design.psd")).unwrap(), expected);
}

#[test]
fn test_delta_chain_cap_forces_snapshot() {
    let mut fixture = test_repo_with(|config| {
        config.background_optimization = false;
        config.max_delta_chain_length = 2;
    });

    let write_revision = |fixture: &common::TestRepo, note: &[u8]| {
        PsdBuilder::new(640, 480)
            .resources(zeros(32 * 1024))
            .layer("Background")
            .write_to(&fixture.path().join("design.psd"));
        std::fs::write(fixture.path().join("notes.txt"), note).unwrap();
    };

    write_revision(&fixture, b"rev 1");
    fixture.repo.stage("design.psd").unwrap();
    fixture.repo.stage("notes.txt").unwrap();
    let v1 = fixture.repo.commit("v1").unwrap();
    assert_eq!(v1.compression_info.as_ref().unwrap().strategy, "lz4");

    for (version, note) in [(2u64, b"rev 2".as_slice()), (3, b"rev 3".as_slice())] {
        write_revision(&fixture, note);
        fixture.repo.stage("design.psd").unwrap();
        fixture.repo.stage("notes.txt").unwrap();
        let record = fixture.repo.commit(&format!("v{version}")).unwrap();
        assert_eq!(record.compression_info.as_ref().unwrap().strategy, "bsdiff");
    }

    // The chain below v3 is two deltas long: v4 must snapshot.
    write_revision(&fixture, b"rev 4");
    fixture.repo.stage("design.psd").unwrap();
    fixture.repo.stage("notes.txt").unwrap();
    let v4 = fixture.repo.commit("v4").unwrap();
    assert_eq!(v4.compression_info.as_ref().unwrap().strategy, "lz4");
    assert!(fixture.layout().version_snapshot(4).is_file());

    // v4 restores from its own snapshot; v3 walks the two-step chain.
    let out4 = fixture.out_dir("out4");
    assert_eq!(fixture.repo.restore("v4", &[], &out4).unwrap().method.as_str(), "lz4");
    assert_eq!(std::fs::read(out4.join("notes.txt")).unwrap(), b"rev 4");

    let out3 = fixture.out_dir("out3");
    let result = fixture.repo.restore("v3", &[], &out3).unwrap();
    assert_eq!(result.method.as_str(), "delta_chain");
    assert_eq!(std::fs::read(out3.join("notes.txt")).unwrap(), b"rev 3");
}

#[test]
fn test_commit_hash_chain_links_parents() {
    let mut fixture = test_repo();
    fixture.write_file("a.txt", b"one");
    fixture.repo.stage("a.txt").unwrap();
    let first = fixture.repo.commit("first").unwrap();

    fixture.write_file("a.txt", b"two");
    fixture.repo.stage("a.txt").unwrap();
    let second = fixture.repo.commit("second").unwrap();

    assert_eq!(second.parent_hash, first.hash);
    assert_eq!(second.version, 2);
    let history = fixture.repo.log().unwrap();
    let versions: Vec<u64> = history.iter().map(|r| r.version).collect();
    assert_eq!(versions, vec![2, 1]);
}

#[test]
fn test_metadata_scan_records_psd_layers() {
    let mut fixture = test_repo();
    PsdBuilder::new(320, 240)
        .layer("Background")
        .layer_blended("Shadow", *b"mul ")
        .write_to(&fixture.write_file("art.psd", b""));
    fixture.repo.stage("art.psd").unwrap();
    let record = fixture.repo.commit("with metadata").unwrap();

    let meta = &record.metadata["art.psd"];
    assert_eq!(meta.file_type, "psd");
    assert_eq!(meta.dimensions.as_deref(), Some("320x240"));
    assert_eq!(meta.color_mode.as_deref(), Some("RGB"));
    assert_eq!(meta.layers, Some(2));
    assert_eq!(meta.layer_names, vec!["Background", "Shadow"]);
    assert!(meta.scan_error.is_none());
}

#[test]
fn test_unparseable_psd_degrades_to_minimal_metadata() {
    let mut fixture = test_repo();
    fixture.write_file("broken.psd", b"not actually a psd at all");
    fixture.repo.stage("broken.psd").unwrap();
    let record = fixture.repo.commit("broken file still commits").unwrap();

    let meta = &record.metadata["broken.psd"];
    assert_eq!(meta.file_type, "psd");
    assert!(meta.scan_error.is_some());
    assert!(meta.layers.is_none());

    // And it restores byte-identically regardless.
    let out = fixture.out_dir("restore");
    fixture.repo.restore("v1", &[], &out).unwrap();
    assert_eq!(std::fs::read(out.join("broken.psd")).unwrap(), b"not actually a psd at all");
}

#[test]
fn test_cancelled_commit_leaves_no_record() {
    let mut fixture = test_repo();
    fixture.write_file("a.txt", b"data");
    fixture.repo.stage("a.txt").unwrap();

    let cancel = dgit_engine::CancelToken::new();
    cancel.cancel();
    let err = fixture.repo.commit_with("doomed", &cancel).unwrap_err();
    assert!(matches!(&*err, ErrorKind::Cancelled));
    assert!(!fixture.layout().commit_record(1).exists());
    assert_eq!(fixture.repo.head().unwrap(), None);
    // The staged set survives for a retry.
    assert_eq!(fixture.repo.staged_files().len(), 1);
}

#[test]
fn test_background_optimization_produces_equivalent_artifact() {
    let mut fixture = test_repo_with(|config| config.background_optimization = true);
    fixture.write_file("big.txt", &zeros(128 * 1024));
    fixture.repo.stage("big.txt").unwrap();
    fixture.repo.commit("optimizable").unwrap();

    let layout = fixture.layout();
    // close() drains the optimizer queue before returning.
    let common::TestRepo { repo, dir } = fixture;
    repo.close();

    let optimized = layout.optimized_snapshot(1);
    assert!(optimized.is_file());
    // Decodes to the same record stream as the primary artifact.
    use std::io::Read;
    let mut primary = Vec::new();
    dgit_compress::container::open_artifact(&layout.version_snapshot(1))
        .unwrap()
        .read_to_end(&mut primary)
        .unwrap();
    let mut recoded = Vec::new();
    dgit_compress::container::open_artifact(&optimized).unwrap().read_to_end(&mut recoded).unwrap();
    assert_eq!(primary, recoded);
    drop(dir);
}
