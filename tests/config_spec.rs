use projectdesk::config::{DataPaths, DATA_DIR_ENV};
use projectdesk::db::Database;
use projectdesk::models::CreateProjectInput;
use speculate2::speculate;

// The only test in this binary that touches the environment.
speculate! {
    describe "default data directory" {
        it "follows the environment override" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            std::env::set_var(DATA_DIR_ENV, dir.path());

            let paths = DataPaths::resolve().unwrap();
            assert_eq!(paths.data_dir(), dir.path());

            let db = Database::open_default().unwrap();
            assert_eq!(db.location(), paths.dataset_file());
            db.create_project(CreateProjectInput {
                name: "Website Redesign".to_string(),
                ..Default::default()
            }).unwrap();
            assert!(paths.dataset_file().exists());

            std::env::remove_var(DATA_DIR_ENV);
        }
    }
}
