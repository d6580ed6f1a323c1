use board_app::session_store::{load_session, save_session};
use board_remote::Session;
use chrono::{TimeZone, Utc};

fn session(token: &str) -> Session {
    Session {
        access_token: token.to_string(),
        user_id: "user-1".to_string(),
        expires_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
    }
}

#[test]
fn save_then_load_roundtrips() {
    let dir = tempfile::tempdir().expect("tempdir");

    save_session(dir.path(), &session("tok-1"));
    let loaded = load_session(dir.path()).expect("persisted session");

    assert_eq!(loaded, session("tok-1"));
}

#[test]
fn missing_file_yields_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(load_session(dir.path()).is_none());
}

#[test]
fn unparseable_file_yields_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join(".studioboard_session.ron"), "not ron {").expect("write");

    assert!(load_session(dir.path()).is_none());
}

#[test]
fn saving_twice_overwrites() {
    let dir = tempfile::tempdir().expect("tempdir");

    save_session(dir.path(), &session("tok-1"));
    save_session(dir.path(), &session("tok-2"));

    let loaded = load_session(dir.path()).expect("persisted session");
    assert_eq!(loaded.access_token, "tok-2");
}

#[test]
fn expiry_is_checked_against_the_clock() {
    let session = session("tok-1");
    assert!(!session.is_expired(Utc.with_ymd_and_hms(2029, 1, 1, 0, 0, 0).unwrap()));
    assert!(session.is_expired(Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap()));
}
