//! Install, update and reopen through the module store.

mod common;

use common::{MANIFEST, config, module_dir, module_jar, services};
use modstore_core::descriptor::Version;
use modstore_core::{ModuleStore, PersistenceMode, StoreError};
use tempfile::TempDir;

fn open_immediate(root: &TempDir) -> ModuleStore {
    ModuleStore::open(&config(root).with_save_delay(0), services(root)).unwrap()
}

#[test]
fn test_install_copies_into_first_generation() {
    let root = TempDir::new().unwrap();
    let source = module_jar(root.path(), "com.x.jar");
    let store = open_immediate(&root);

    let record = store.install("file:/mods/com.x.jar", &source).unwrap();
    assert_eq!(record.generation(), 1);
    assert!(!record.is_reference());
    assert_eq!(record.file_name(), "com.x.jar");
    assert!(record.base_file().is_file());
    assert_eq!(record.symbolic_name(), Some("com.x"));
    assert_eq!(record.version(), Some(&Version::new(1, 2, 0)));
}

#[test]
fn test_install_directory_module() {
    let root = TempDir::new().unwrap();
    let source = module_dir(root.path(), "com.d", "Bundle-SymbolicName: com.d\nFragment-Host: com.x\n");
    let store = open_immediate(&root);

    let record = store.install("file:/mods/com.d/", &source).unwrap();
    assert_eq!(record.file_name(), "com.d");
    assert!(record.base_file().join("META-INF/MANIFEST.MF").is_file());
    assert!(record.is_fragment());
}

#[test]
fn test_failed_install_cleans_up() {
    let root = TempDir::new().unwrap();
    let source = module_dir(root.path(), "broken", "not a manifest\n");
    let store = open_immediate(&root);

    let err = store.install("file:/mods/broken", &source).unwrap_err();
    assert!(matches!(err, StoreError::DescriptorLoad { .. }));
    assert!(store.records().is_empty());
    assert!(store.layout().module_ids().is_empty());
}

#[test]
fn test_update_swaps_generation() {
    let root = TempDir::new().unwrap();
    let source = module_jar(root.path(), "com.x.jar");
    let store = open_immediate(&root);
    let first = store.install("file:/mods/com.x.jar", &source).unwrap();
    first.set_start_level(5);

    let second = store.update(first.id(), &source).unwrap();
    assert_eq!(second.generation(), 2);
    assert_eq!(second.start_level(), 5);
    assert!(second.base_file().is_file());
    assert_eq!(second.symbolic_name(), Some("com.x"));

    let current = store.get(first.id()).unwrap();
    assert_eq!(current.generation(), 2);
    // Old generations stay until explicitly discarded
    assert!(first.generation_dir().is_dir());
    assert_eq!(store.layout().generations(first.id()), vec![1, 2]);

    assert!(matches!(
        store.discard_generation(first.id(), 2),
        Err(StoreError::GenerationInUse { .. })
    ));
    store.discard_generation(first.id(), 1).unwrap();
    assert_eq!(store.layout().generations(first.id()), vec![2]);
}

#[test]
fn test_update_reference() {
    let root = TempDir::new().unwrap();
    let source = module_jar(root.path(), "com.x.jar");
    let store = open_immediate(&root);
    let first = store.install("file:/mods/com.x.jar", &source).unwrap();

    let second = store.update_reference(first.id(), &source).unwrap();
    assert!(second.is_reference());
    assert_eq!(second.generation(), 2);
    assert_eq!(second.base_file(), source);
}

#[test]
fn test_failed_update_keeps_current_record() {
    let root = TempDir::new().unwrap();
    let good = module_jar(root.path(), "com.x.jar");
    let bad = module_dir(root.path(), "bad", "Bundle-Version: x.y\n");
    let store = open_immediate(&root);
    let first = store.install("file:/mods/com.x", &good).unwrap();

    assert!(store.update(first.id(), &bad).is_err());
    assert_eq!(store.get(first.id()).unwrap().generation(), 1);
    assert_eq!(store.layout().generations(first.id()), vec![1]);
}

#[test]
fn test_reopen_restores_records_and_never_reuses_ids() {
    let root = TempDir::new().unwrap();
    let source = module_jar(root.path(), "com.x.jar");

    let (kept, removed) = {
        let store = open_immediate(&root);
        let kept = store.install("file:/mods/a.jar", &source).unwrap();
        let removed = store.install("file:/mods/b.jar", &source).unwrap();
        kept.set_native_paths_str("lib/linux/libx.so");
        store.touch(kept.id()).unwrap();
        store.uninstall(removed.id()).unwrap();
        store.shutdown().unwrap();
        (kept.id(), removed.id())
    };

    let store = open_immediate(&root);
    let restored = store.get(kept).unwrap();
    assert_eq!(restored.symbolic_name(), Some("com.x"));
    assert_eq!(
        restored.native_paths(),
        Some(vec!["lib/linux/libx.so".to_string()])
    );
    assert!(store.get(removed).is_none());

    let fresh = store.install("file:/mods/c.jar", &source).unwrap();
    assert!(fresh.id() > removed);
}

#[test]
fn test_deferred_persistence_needs_flush() {
    let root = TempDir::new().unwrap();
    let source = module_dir(root.path(), "m", MANIFEST);

    {
        let store =
            ModuleStore::open(&config(&root).with_save_delay(-1), services(&root)).unwrap();
        assert_eq!(store.persistence_mode(), PersistenceMode::Disabled);
        store.install("file:/mods/m", &source).unwrap();
        // Dropped without a flush
    }
    assert!(open_immediate(&root).records().is_empty());

    {
        let store = ModuleStore::open(&config(&root), services(&root)).unwrap();
        store.install("file:/mods/m", &source).unwrap();
        assert_eq!(store.flush().unwrap(), 1);
        assert_eq!(store.flush().unwrap(), 0);
    }
    assert_eq!(open_immediate(&root).records().len(), 1);
}

#[test]
fn test_uninstall_unknown_module() {
    let root = TempDir::new().unwrap();
    let store = open_immediate(&root);
    assert!(matches!(
        store.uninstall(42),
        Err(StoreError::ModuleNotFound(42))
    ));
}

#[test]
fn test_native_code_extracted_into_generation() {
    let root = TempDir::new().unwrap();
    let source = module_jar(root.path(), "com.x.jar");
    let store = open_immediate(&root);
    let record = store.install("file:/mods/com.x.jar", &source).unwrap();

    record.install_native_code(&["lib/linux/libx.so"]).unwrap();
    let extracted = record.generation_dir().join(".cp/lib/linux/libx.so");
    assert_eq!(std::fs::read(&extracted).unwrap(), b"\x7fELF linux");
    assert_eq!(
        record.find_library("libx.so"),
        Some(std::path::absolute(extracted).unwrap())
    );
}

#[test]
fn test_failed_flush_keeps_pending_snapshots() {
    let root = TempDir::new().unwrap();
    let source = module_jar(root.path(), "com.x.jar");
    let blocker = root.path().join("storage/.records/1.rec");

    {
        let store =
            ModuleStore::open(&config(&root).with_save_delay(-1), services(&root)).unwrap();
        let a = store.install("file:/mods/a.jar", &source).unwrap();
        let b = store.install("file:/mods/b.jar", &source).unwrap();
        assert_eq!((a.id(), b.id()), (1, 2));

        std::fs::create_dir_all(blocker.join("occupied")).unwrap();
        assert!(store.flush().is_err());

        std::fs::remove_dir_all(&blocker).unwrap();
        assert_eq!(store.flush().unwrap(), 2);
        store.shutdown().unwrap();
    }

    let store = open_immediate(&root);
    assert!(store.get(1).is_some());
    assert!(store.get(2).is_some());
}

#[test]
fn test_failed_snapshot_write_rejects_install() {
    let root = TempDir::new().unwrap();
    let source = module_jar(root.path(), "com.x.jar");
    let store = open_immediate(&root);
    std::fs::create_dir_all(root.path().join("storage/.records/1.rec/occupied")).unwrap();

    assert!(store.install("file:/mods/com.x.jar", &source).is_err());
    assert!(store.get(1).is_none());
    assert!(!store.layout().module_dir(1).exists());
}

#[test]
fn test_failed_snapshot_write_rejects_update() {
    let root = TempDir::new().unwrap();
    let source = module_jar(root.path(), "com.x.jar");
    let store = open_immediate(&root);
    let first = store.install("file:/mods/com.x.jar", &source).unwrap();

    let snapshot = root.path().join("storage/.records/1.rec");
    std::fs::remove_file(&snapshot).unwrap();
    std::fs::create_dir_all(snapshot.join("occupied")).unwrap();

    assert!(store.update(first.id(), &source).is_err());
    let current = store.get(first.id()).unwrap();
    assert_eq!(current.generation(), 1);
    // Still open and readable
    assert!(current.entry("META-INF/MANIFEST.MF").is_some());
    assert_eq!(store.layout().generations(first.id()), vec![1]);
}

#[test]
fn test_uninstall_racing_updates_stays_uninstalled() {
    let root = TempDir::new().unwrap();
    let source = module_jar(root.path(), "com.x.jar");
    let store = std::sync::Arc::new(open_immediate(&root));
    let id = store.install("file:/mods/com.x.jar", &source).unwrap().id();

    let barrier = std::sync::Arc::new(std::sync::Barrier::new(5));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        let barrier = barrier.clone();
        let source = source.clone();
        handles.push(std::thread::spawn(move || {
            barrier.wait();
            let _ = store.update(id, &source);
        }));
    }
    {
        let store = store.clone();
        let barrier = barrier.clone();
        handles.push(std::thread::spawn(move || {
            barrier.wait();
            store.uninstall(id).unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(store.get(id).is_none());
    assert!(matches!(store.update(id, &source), Err(StoreError::ModuleNotFound(_))));
    drop(store);
    assert!(open_immediate(&root).get(id).is_none());
}
