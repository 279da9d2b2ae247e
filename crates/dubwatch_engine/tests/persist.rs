use std::fs;

use dubwatch_engine::AtomicFileWriter;
use tempfile::TempDir;

fn entries(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn staged_chunks_land_under_target_name_on_commit() {
    let dir = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(dir.path().to_path_buf());

    let mut staged = writer.stage("final_es.mp4").unwrap();
    staged.write_chunk(b"first-").unwrap();
    assert!(!dir.path().join("final_es.mp4").exists());
    staged.write_chunk(b"second").unwrap();
    assert_eq!(staged.written(), 12);

    let path = staged.commit().unwrap();
    assert_eq!(path, dir.path().join("final_es.mp4"));
    assert_eq!(fs::read(&path).unwrap(), b"first-second");
    assert_eq!(entries(&dir), vec!["final_es.mp4"]);
}

#[test]
fn abandoned_stage_leaves_nothing_behind() {
    let dir = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(dir.path().to_path_buf());
    writer.write("final_es.mp4", b"old").unwrap();

    let mut staged = writer.stage("final_es.mp4").unwrap();
    staged.write_chunk(b"partial").unwrap();
    drop(staged);

    assert_eq!(entries(&dir), vec!["final_es.mp4"]);
    assert_eq!(fs::read(dir.path().join("final_es.mp4")).unwrap(), b"old");
}

#[test]
fn write_creates_dir_and_remove_tolerates_missing_file() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("out");
    let writer = AtomicFileWriter::new(nested.clone());

    writer.write("a.ron", b"(x: 1)").unwrap();
    assert_eq!(fs::read(nested.join("a.ron")).unwrap(), b"(x: 1)");

    writer.remove("a.ron").unwrap();
    writer.remove("a.ron").unwrap();
    assert!(!nested.join("a.ron").exists());
}
