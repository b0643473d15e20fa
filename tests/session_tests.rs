//! Session Tests
//!
//! Statements run through a session over a data directory on disk:
//! queries, `load`, `load new`, `clear cache`, `save` and `debug`.

use std::fs;

use querylens::session::RESULT_FILE_NAME;
use querylens::{table_to_text, LoadError, Outcome, Session, SessionError};
use querylens_core::{Table, Value};
use tempfile::TempDir;

const SONGS: &str = "\
id:number title:string    year:number
1         Blue Monday     1983
2         Heroes          1977
";

const ITEMS: &str = "\
name:string price:number
pen         1.5
book        12
";

/// Create a data directory and open a session on it
fn create_session() -> (Session, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::create_dir(dir.path().join("musik")).unwrap();
    fs::create_dir(dir.path().join("shop")).unwrap();
    fs::write(dir.path().join("musik").join("songs.txt"), SONGS).unwrap();
    fs::write(dir.path().join("shop").join("items.txt"), ITEMS).unwrap();

    let session = Session::open(dir.path(), "musik").expect("Failed to open session");
    (session, dir)
}

fn run_table(session: &mut Session, text: &str) -> Table {
    match session.run(text, false) {
        Ok(Outcome::Table(table)) => table,
        other => panic!("expected table for {}: {:?}", text, other),
    }
}

#[test]
fn test_query_active_database() {
    let (mut session, _dir) = create_session();
    assert_eq!(session.active_database(), "musik");
    assert_eq!(session.table_names(), vec!["songs"]);

    let table = run_table(&mut session, "select title from songs where year < 1980");
    assert_eq!(table.rows(), &[vec![Value::string("Heroes")]]);
    assert_eq!(session.last_result(), Some(&table));
}

#[test]
fn test_load_switches_database() {
    let (mut session, _dir) = create_session();

    let outcome = session.run("load SHOP", false).unwrap();
    assert_eq!(outcome, Outcome::Switched("shop".to_string()));
    assert_eq!(session.active_database(), "shop");

    let table = run_table(&mut session, "select sum(price) from items");
    assert_eq!(table.rows(), &[vec![Value::Number(13.5)]]);

    // Other databases stay reachable by qualified name
    let table = run_table(&mut session, "select count(id) from musik.songs");
    assert_eq!(table.rows(), &[vec![Value::Number(2.0)]]);
}

#[test]
fn test_load_unknown_database() {
    let (mut session, _dir) = create_session();
    let err = session.run("load nope", false).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Load(LoadError::UnknownDatabase(ref name)) if name == "nope"
    ));
    assert_eq!(session.active_database(), "musik");
}

#[test]
fn test_clear_cache_and_load_new() {
    let (mut session, dir) = create_session();

    assert_eq!(session.run("clear cache", false).unwrap(), Outcome::CacheCleared);
    let err = session.run("select * from songs", false).unwrap_err();
    assert_eq!(err.to_string(), "can not find database 'musik'");

    fs::create_dir(dir.path().join("films")).unwrap();
    fs::write(dir.path().join("films").join("films.txt"), "title:string\nHeat\n").unwrap();

    let outcome = session.run("load new", false).unwrap();
    assert_eq!(
        outcome,
        Outcome::Loaded(vec!["films".to_string(), "musik".to_string(), "shop".to_string()])
    );
    assert_eq!(run_table(&mut session, "select * from songs").row_count(), 2);
}

#[test]
fn test_save_requires_a_result() {
    let (mut session, _dir) = create_session();
    let err = session.run("save", false).unwrap_err();
    assert!(matches!(err, SessionError::NothingToSave));
}

#[test]
fn test_save_writes_result_file() {
    let (mut session, dir) = create_session();
    let table = run_table(&mut session, "select title, year + 1 as next from songs");

    let outcome = session.run("save", false).unwrap();
    let path = dir.path().join("musik").join(RESULT_FILE_NAME);
    assert_eq!(outcome, Outcome::Saved(path.clone()));
    assert_eq!(fs::read_to_string(&path).unwrap(), table_to_text(&table));

    let saved = run_table(&mut session, "select next from result order by next");
    assert_eq!(
        saved.rows(),
        &[vec![Value::Number(1978.0)], vec![Value::Number(1984.0)]]
    );
}

#[test]
fn test_debug_records_trace() {
    let (mut session, _dir) = create_session();

    let outcome = session.run("debug select title from songs where year > 1980", false).unwrap();
    let Outcome::Traced { table, steps } = outcome else {
        panic!("expected traced outcome");
    };
    assert_eq!(table.rows(), &[vec![Value::string("Blue Monday")]]);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].name, "query");
    assert!(steps[0].steps.iter().any(|step| step.name == "where"));

    // Tracing can also be switched on for plain queries
    let outcome = session.run("select title from songs", true).unwrap();
    assert!(matches!(outcome, Outcome::Traced { .. }));
}

#[test]
fn test_query_errors_are_reported() {
    let (mut session, _dir) = create_session();
    let err = session.run("select nope from songs", false).unwrap_err();
    let SessionError::Query(err) = err else {
        panic!("expected query error");
    };
    assert_eq!(err.message, "can not find field 'nope'");
    assert_eq!((err.range.start, err.range.end), (7, 11));
}
