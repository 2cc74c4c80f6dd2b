use std::fs;

use projectdesk::db::{Database, JsonFileStorage, Storage, SCHEMA_VERSION};
use projectdesk::models::*;
use projectdesk::Error;
use serde_json::{json, Value};
use speculate2::speculate;

fn seed(db: &Database) {
    let project = db
        .create_project(CreateProjectInput {
            name: "Website Redesign".to_string(),
            budget: Some(0.1 + 0.2),
            ..Default::default()
        })
        .expect("Failed to create project");
    let member = db
        .create_member(CreateMemberInput {
            name: "Ada".to_string(),
            projects: [project.id].into_iter().collect(),
            ..Default::default()
        })
        .expect("Failed to create member");
    db.create_task(CreateTaskInput {
        project_id: project.id,
        title: "Design mockups".to_string(),
        assignee: Some(member.id),
        cost: Some(99.99),
        ..Default::default()
    })
    .expect("Failed to create task");
    db.create_document(CreateDocumentInput {
        project_id: project.id,
        title: "Brief".to_string(),
        path: "brief.pdf".to_string(),
        tags: vec!["kickoff".to_string()],
        ..Default::default()
    })
    .expect("Failed to create document");
}

/// A valid dataset file with one record of each core kind.
fn base_file() -> Value {
    json!({
        "schema_version": 1,
        "next_ids": {"project": 1, "task": 1, "member": 1, "document": 1},
        "projects": [{
            "id": 1,
            "name": "Website Redesign",
            "description": null,
            "status": "active",
            "priority": "high",
            "budget": 5000.0,
            "members": [1],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        }],
        "members": [{
            "id": 1,
            "name": "Ada",
            "role": null,
            "contact": null,
            "projects": [1],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }],
        "tasks": [{
            "id": 1,
            "project_id": 1,
            "title": "Design mockups",
            "description": null,
            "status": "todo",
            "priority": "medium",
            "assignee": 1,
            "start_date": "2024-05-01",
            "due_date": "2024-05-10",
            "duration_days": 3,
            "cost": 120.0,
            "is_milestone": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }],
        "documents": [{
            "id": 1,
            "project_id": 1,
            "title": "Brief",
            "description": null,
            "kind": "report",
            "category": null,
            "file": {"path": "brief.pdf", "size_bytes": null},
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }]
    })
}

/// Write `file` to `path` and return the load error message.
fn load_error(path: &std::path::Path, file: &Value) -> String {
    fs::write(path, serde_json::to_string_pretty(file).unwrap()).unwrap();
    let err = JsonFileStorage::new(path).load().unwrap_err();
    assert!(matches!(err, Error::StorageCorrupt { .. }), "unexpected error: {err}");
    err.to_string()
}

speculate! {
    before {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("data").join("dataset.json");
    }

    describe "json file storage" {
        it "loads a missing file as an empty dataset and creates the directory" {
            let storage = JsonFileStorage::new(&path);
            let dataset = storage.load().unwrap();

            assert_eq!(dataset.schema_version, SCHEMA_VERSION);
            assert!(dataset.projects.is_empty());
            assert!(path.parent().unwrap().is_dir());
            assert!(!path.exists());
        }

        it "round trips a saved dataset exactly" {
            let db = Database::open(&path).unwrap();
            seed(&db);
            let saved = db.snapshot();

            let loaded = JsonFileStorage::new(&path).load().unwrap();
            assert_eq!(loaded, saved);
            assert_eq!(loaded.projects[0].budget, 0.1 + 0.2);
        }

        it "writes records ordered by id with snake_case enums" {
            let db = Database::open(&path).unwrap();
            seed(&db);

            let json: serde_json::Value =
                serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
            assert_eq!(json["schema_version"], 1);
            assert_eq!(json["next_ids"]["project"], 1);
            assert_eq!(json["projects"][0]["status"], "planned");
            assert_eq!(json["tasks"][0]["status"], "todo");
            assert_eq!(json["documents"][0]["kind"], "general");
        }

        it "leaves only the dataset file behind after saving" {
            let db = Database::open(&path).unwrap();
            seed(&db);
            let entries: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
            assert_eq!(entries.len(), 1);
        }
    }

    describe "corrupt files" {
        before {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
        }

        it "rejects malformed JSON" {
            fs::write(&path, "{ not json").unwrap();
            let err = Database::open(&path).err().unwrap();
            assert!(matches!(err, Error::StorageCorrupt { .. }));
        }

        it "rejects an unsupported schema version" {
            fs::write(&path, r#"{"schema_version": 2, "projects": []}"#).unwrap();
            let err = JsonFileStorage::new(&path).load().unwrap_err();
            assert!(err.to_string().contains("unsupported schema version 2"));
        }

        it "rejects a file without a schema version" {
            fs::write(&path, r#"{"projects": []}"#).unwrap();
            let err = JsonFileStorage::new(&path).load().unwrap_err();
            assert!(matches!(err, Error::StorageCorrupt { .. }));
        }

        it "rejects a task pointing at a missing project" {
            fs::write(&path, r#"{
                "schema_version": 1,
                "next_ids": {"project": 0, "task": 1, "member": 0, "document": 0},
                "tasks": [{
                    "id": 1,
                    "project_id": 5,
                    "title": "Orphan",
                    "description": null,
                    "status": "todo",
                    "priority": "low",
                    "assignee": null,
                    "start_date": null,
                    "due_date": null,
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-01T00:00:00Z"
                }]
            }"#).unwrap();

            let err = JsonFileStorage::new(&path).load().unwrap_err();
            assert!(matches!(err, Error::StorageCorrupt { .. }));
            assert!(err.to_string().contains("missing project 5"));
        }

        it "rejects records with an unknown status" {
            fs::write(&path, r#"{
                "schema_version": 1,
                "next_ids": {"project": 1, "task": 0, "member": 0, "document": 0},
                "projects": [{
                    "id": 1,
                    "name": "Odd",
                    "description": null,
                    "status": "abandoned",
                    "priority": "low",
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-01T00:00:00Z"
                }]
            }"#).unwrap();

            let err = JsonFileStorage::new(&path).load().unwrap_err();
            assert!(matches!(err, Error::StorageCorrupt { .. }));
        }

        it "accepts the base file" {
            fs::write(&path, base_file().to_string()).unwrap();
            let dataset = JsonFileStorage::new(&path).load().unwrap();
            assert_eq!(dataset.tasks[0].title, "Design mockups");
            assert!(dataset.risks.is_empty());
            assert_eq!(dataset.projects[0].charter, ProjectCharter::default());
        }

        it "rejects a blank project name" {
            let mut file = base_file();
            file["projects"][0]["name"] = json!("");
            assert!(load_error(&path, &file).contains("project 1 has an invalid name"));
        }

        it "rejects a negative budget" {
            let mut file = base_file();
            file["projects"][0]["budget"] = json!(-500.0);
            assert!(load_error(&path, &file).contains("invalid budget"));
        }

        it "rejects a blank task title" {
            let mut file = base_file();
            file["tasks"][0]["title"] = json!("   ");
            assert!(load_error(&path, &file).contains("task 1 has an invalid title"));
        }

        it "rejects a negative task cost" {
            let mut file = base_file();
            file["tasks"][0]["cost"] = json!(-3.0);
            assert!(load_error(&path, &file).contains("invalid cost"));
        }

        it "rejects a milestone with a duration" {
            let mut file = base_file();
            file["tasks"][0]["is_milestone"] = json!(true);
            file["tasks"][0]["duration_days"] = json!(7);
            assert!(load_error(&path, &file).contains("invalid duration_days"));
        }

        it "rejects a due date before the start date" {
            let mut file = base_file();
            file["tasks"][0]["start_date"] = json!("2024-05-10");
            file["tasks"][0]["due_date"] = json!("2024-05-01");
            assert!(load_error(&path, &file).contains("invalid due_date"));
        }

        it "rejects a blank member name" {
            let mut file = base_file();
            file["members"][0]["name"] = json!("");
            assert!(load_error(&path, &file).contains("member 1 has an invalid name"));
        }

        it "rejects a blank document title" {
            let mut file = base_file();
            file["documents"][0]["title"] = json!(" ");
            assert!(load_error(&path, &file).contains("document 1 has an invalid title"));
        }

        it "rejects a blank document path" {
            let mut file = base_file();
            file["documents"][0]["file"]["path"] = json!("");
            assert!(load_error(&path, &file).contains("invalid path"));
        }

        it "rejects a risk rated off the scale" {
            let mut file = base_file();
            file["next_ids"]["risk"] = json!(1);
            file["risks"] = json!([{
                "id": 1,
                "project_id": 1,
                "name": "Vendor slips",
                "probability": 14,
                "impact": 3,
                "mitigation": null,
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }]);
            assert!(load_error(&path, &file).contains("risk 1 has an invalid probability"));
        }

        it "rejects a meeting note of a missing project" {
            let mut file = base_file();
            file["next_ids"]["meeting"] = json!(1);
            file["meeting_notes"] = json!([{
                "id": 1,
                "project_id": 2,
                "title": "Kickoff",
                "date": "2024-01-03",
                "agenda": null,
                "discussion": null,
                "action_items": null,
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }]);
            assert!(load_error(&path, &file).contains("missing project 2"));
        }

        it "does not overwrite the corrupt file" {
            fs::write(&path, "garbage").unwrap();
            assert!(Database::open(&path).is_err());
            assert_eq!(fs::read_to_string(&path).unwrap(), "garbage");
        }
    }
}
