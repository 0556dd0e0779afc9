//! Integration tests for the filesystem scanner

use shelf_config::ScannerSettings;
use shelf_library::{ExternalScanner, FsScanner, GameRecord, ScanError};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A throwaway library root
struct LibraryTestEnv {
    #[allow(dead_code)]
    temp_dir: TempDir,
    root: PathBuf,
}

impl LibraryTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("Games");
        fs::create_dir_all(&root).unwrap();

        Self { temp_dir, root }
    }

    fn root_str(&self) -> String {
        self.root.to_string_lossy().into_owned()
    }

    fn create_exe(&self, rel: &str, size_kb: usize) -> String {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, vec![0u8; size_kb * 1024]).unwrap();
        path.to_string_lossy().into_owned()
    }
}

fn names(games: &[GameRecord]) -> Vec<&str> {
    games.iter().map(|g| g.name.as_str()).collect()
}

#[tokio::test]
async fn test_full_scan_applies_heuristics() {
    let env = LibraryTestEnv::new();
    let real = env.create_exe("Summer Days/SummerDays.exe", 150);
    env.create_exe("Summer Days/unins000.exe", 150);
    env.create_exe("Summer Days/UnityCrashHandler64.exe", 150);
    env.create_exe("Summer Days/tiny.exe", 10);
    env.create_exe("Summer Days/readme.txt", 150);
    env.create_exe("072 project_Sonia/Game.exe", 150);
    env.create_exe("tool/node_modules/electron/app.exe", 150);

    let output = FsScanner::default().scan_full(&env.root_str()).await.unwrap();

    assert_eq!(names(&output.games), vec!["072 project_Sonia", "SummerDays"]);
    assert_eq!(output.games[1].path, real);
    assert!(output.games.iter().all(|g| g.installed));
    // root, both game dirs and tool/ (node_modules is never entered)
    assert_eq!(output.fingerprints.len(), 4);
    assert!(output.fingerprints.iter().all(|f| f.mtime > 0));
}

#[tokio::test]
async fn test_custom_settings() {
    let env = LibraryTestEnv::new();
    env.create_exe("A/a.exe", 2);
    env.create_exe("B/b.bat", 2);

    let settings = ScannerSettings {
        extensions: vec!["exe".to_string(), ".BAT".to_string()],
        min_file_size_kb: 1,
        ..Default::default()
    };
    let output = FsScanner::new(&settings).scan_full(&env.root_str()).await.unwrap();

    assert_eq!(names(&output.games), vec!["a", "b"]);
}

#[tokio::test]
async fn test_full_scan_missing_root_fails() {
    let env = LibraryTestEnv::new();
    let missing = env.root.join("unplugged").to_string_lossy().into_owned();

    let err = FsScanner::default().scan_full(&missing).await.unwrap_err();
    assert!(matches!(err, ScanError::RootMissing(_)));
}

#[tokio::test]
async fn test_incremental_reuses_unchanged_directories() {
    let env = LibraryTestEnv::new();
    env.create_exe("VN1/vn1.exe", 150);
    let scanner = FsScanner::default();
    let full = scanner.scan_full(&env.root_str()).await.unwrap();

    // A cached record the disk does not have; only a reused directory keeps it
    let ghost = GameRecord::new(
        "ghost",
        env.root.join("VN1").join("ghost.exe").to_string_lossy(),
    );
    let mut cached = full.games.clone();
    cached.push(ghost.clone());

    let output = scanner
        .scan_incremental(&env.root_str(), &cached, &full.fingerprints)
        .await
        .unwrap();
    assert!(output.games.contains(&ghost));
    assert_eq!(output.fingerprints.len(), full.fingerprints.len());

    let mut stale = full.fingerprints.clone();
    for print in &mut stale {
        print.mtime = 1;
    }
    let output = scanner
        .scan_incremental(&env.root_str(), &cached, &stale)
        .await
        .unwrap();
    assert!(!output.games.contains(&ghost));
    assert_eq!(names(&output.games), vec!["vn1"]);
}

#[tokio::test]
async fn test_incremental_finds_new_directory() {
    let env = LibraryTestEnv::new();
    env.create_exe("VN1/vn1.exe", 150);
    let scanner = FsScanner::default();
    let full = scanner.scan_full(&env.root_str()).await.unwrap();

    env.create_exe("VN2/vn2.exe", 150);
    let output = scanner
        .scan_incremental(&env.root_str(), &full.games, &full.fingerprints)
        .await
        .unwrap();

    assert_eq!(names(&output.games), vec!["vn1", "vn2"]);
    assert_eq!(output.fingerprints.len(), 3);
}
