use std::fs;

use studio_engine::{ensure_output_dir, video_filename, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("videos").join("today");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write_bytes("clip.y4m", b"first").unwrap();
    let second = writer.write_bytes("clip.y4m", b"second").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"second");
}

#[test]
fn file_in_place_of_output_dir_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write_bytes("clip.y4m", b"data");
    assert!(matches!(result, Err(PersistError::OutputDir(_))));
    assert!(!file_path.with_file_name("clip.y4m").exists());
}

#[test]
fn filenames_are_portable_and_distinguish_runs() {
    let a = video_filename("A cat: walking / on grass?", "cat|1|t0", "y4m");
    let b = video_filename("A cat: walking / on grass?", "cat|2|t0", "y4m");

    assert!(a.starts_with("A_cat_walking_on_grass--"));
    assert!(a.ends_with(".y4m"));
    assert_ne!(a, b);
    assert_eq!(video_filename("   ", "x", "y4m").split("--").next(), Some("untitled"));
    assert!(video_filename("con", "x", "y4m").starts_with("con_--"));
}
