use std::fs;

use projectdesk::config::DataPaths;
use projectdesk::prefs::{Preferences, DEFAULT_THEME};
use projectdesk::Error;
use speculate2::speculate;

speculate! {
    before {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let paths = DataPaths::in_dir(dir.path());
        let file = paths.preferences_file();
    }

    describe "preferences" {
        it "starts empty when the file does not exist" {
            let prefs = Preferences::open(&file).unwrap();
            assert_eq!(prefs.theme(), DEFAULT_THEME);
            assert_eq!(prefs.get("sidebar", "expanded"), "expanded");
            assert!(!file.exists());
        }

        it "survives reopening" {
            let mut prefs = Preferences::open(&file).unwrap();
            prefs.set_theme("dark").unwrap();
            prefs.set("sidebar", "collapsed").unwrap();

            let reopened = Preferences::open(&file).unwrap();
            assert_eq!(reopened.theme(), "dark");
            assert_eq!(reopened.get("sidebar", "expanded"), "collapsed");
        }

        it "forgets removed keys" {
            let mut prefs = Preferences::open(&file).unwrap();
            prefs.set("sidebar", "collapsed").unwrap();
            assert!(prefs.remove("sidebar").unwrap());
            assert!(!prefs.remove("sidebar").unwrap());

            let reopened = Preferences::open(&file).unwrap();
            assert_eq!(reopened.get("sidebar", "expanded"), "expanded");
        }

        it "writes a versioned document" {
            let mut prefs = Preferences::open(&file).unwrap();
            prefs.set_theme("dark").unwrap();

            let json: serde_json::Value =
                serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
            assert_eq!(json["schema_version"], 1);
            assert_eq!(json["values"]["theme"], "dark");
        }

        it "rejects a malformed file" {
            fs::write(&file, "theme=dark").unwrap();
            let err = Preferences::open(&file).unwrap_err();
            assert!(matches!(err, Error::StorageCorrupt { .. }));
        }

        it "rejects an unknown version" {
            fs::write(&file, r#"{"schema_version": 3, "values": {}}"#).unwrap();
            assert!(matches!(
                Preferences::open(&file),
                Err(Error::StorageCorrupt { .. })
            ));
        }
    }
}
