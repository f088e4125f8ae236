use std::path::PathBuf;

use taskbox::error::{exit_codes, Error, JsonError};

#[test]
fn exit_codes_map_correctly() {
    let user = Error::ParseFailure("expected a JSON array".to_string());
    assert_eq!(user.exit_code(), exit_codes::USER_ERROR);

    let missing = Error::EntityNotFound {
        kind: "task",
        id: "t1".to_string(),
    };
    assert_eq!(missing.exit_code(), exit_codes::USER_ERROR);

    let op = Error::FlushFailure {
        collection: "tasks".to_string(),
        reason: "disk full".to_string(),
    };
    assert_eq!(op.exit_code(), exit_codes::OPERATION_FAILED);

    let closed = Error::NotInitialized("tasks".to_string());
    assert_eq!(closed.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn json_error_includes_code_and_details() {
    let err = Error::EntityNotFound {
        kind: "project",
        id: "prj-1".to_string(),
    };
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::USER_ERROR);
    assert!(json.error.contains("project not found"));
    assert_eq!(json.details.unwrap()["id"], "prj-1");

    let lock = Error::LockFailed(PathBuf::from(".taskbox/tasks.lock"));
    assert!(JsonError::from(&lock).details.is_some());
}
