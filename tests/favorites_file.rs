use pokedex_tui::favorites::FAVORITES_STORAGE_KEY;
use pokedex_tui::storage::{FileStore, KeyValueStore};
use pokedex_tui::FavoritesStore;
use tempfile::tempdir;

#[test]
fn favorites_survive_a_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("storage.json");

    let mut favs = FavoritesStore::new(FileStore::new(&path));
    favs.load();
    assert!(favs.ids().is_empty());
    favs.add(25, "pikachu").unwrap();
    favs.add(1, "bulbasaur").unwrap();
    assert!(!favs.toggle(25, "pikachu").unwrap());
    assert!(favs.toggle(4, "charmander").unwrap());

    let mut reopened = FavoritesStore::new(FileStore::new(&path));
    reopened.load();
    assert_eq!(reopened.ids(), vec![1, 4]);
    assert!(reopened.error().is_none());
}

#[test]
fn corrupted_file_starts_empty_and_is_overwritten() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("storage.json");
    std::fs::write(&path, "{ not json").unwrap();

    let mut favs = FavoritesStore::new(FileStore::new(&path));
    favs.load();
    assert!(favs.ids().is_empty());

    favs.add(7, "squirtle").unwrap();
    let raw = FileStore::new(&path)
        .get_item(FAVORITES_STORAGE_KEY)
        .unwrap()
        .unwrap();
    assert_eq!(raw, "[7]");
}

#[test]
fn clear_removes_the_key() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("storage.json");
    let store = FileStore::new(&path);
    store.set_item("other", "kept").unwrap();

    let mut favs = FavoritesStore::new(store.clone());
    favs.load();
    favs.add(150, "mewtwo").unwrap();
    favs.clear().unwrap();

    assert!(store.get_item(FAVORITES_STORAGE_KEY).unwrap().is_none());
    assert_eq!(store.get_item("other").unwrap().as_deref(), Some("kept"));
}
