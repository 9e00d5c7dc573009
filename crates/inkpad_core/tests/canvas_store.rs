use inkpad_core::db::open_db_in_memory;
use inkpad_core::model::geometry::Point;
use inkpad_core::{
    CanvasDocument, CanvasRepository, NoteService, Rgba, SqliteCanvasRepository,
    SqliteNoteRepository, StrokePoint, Transform,
};
use rusqlite::{params, Connection};

const EPSILON: f64 = 1e-9;

fn create_note(conn: &mut Connection, title: &str) -> inkpad_core::NoteId {
    let mut service = NoteService::new(SqliteNoteRepository::new(conn));
    service.create_note(title).unwrap().id
}

fn drawn_document(note_id: inkpad_core::NoteId) -> CanvasDocument {
    let mut document = CanvasDocument::new(note_id);
    let id = document.begin_stroke(StrokePoint::new(1.0, 2.0, 0.8), Rgba(0xFF112233), 3.5, false);
    document.append_point(id, StrokePoint::new(4.0, 5.0, 0.6));
    document.append_point(id, StrokePoint::new(7.0, 8.0, 0.4));
    document.commit_stroke();
    document.begin_stroke(StrokePoint::plain(-10.0, -20.0), Rgba::BLACK, 1.0, false);
    document.commit_stroke();

    document.begin_text_edit(Point::new(30.0, 40.0), None);
    document.commit_text_edit("# heading");
    document.begin_text_edit(Point::new(-5.0, 60.0), None);
    document.commit_text_edit("plain words");

    let transform = Transform::IDENTITY
        .scaled_around_focal(Point::new(120.0, 90.0), 2.5)
        .translated_by(14.0, -3.0);
    document.set_transform(transform, 2.5);
    document
}

#[test]
fn save_then_load_round_trips_content_exactly() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "round trip");
    let document = drawn_document(note_id);

    {
        let mut repo = SqliteCanvasRepository::new(&mut conn);
        repo.save_canvas(&document).unwrap();
    }

    let repo = SqliteCanvasRepository::new(&mut conn);
    let restored = repo.load_canvas(note_id).unwrap();

    assert_eq!(restored.strokes(), document.strokes());
    // The second stroke never grew past its first sample.
    assert!(restored.strokes()[1].is_dot());
    assert_eq!(restored.text_elements().len(), 2);
    for (restored_text, original_text) in restored
        .text_elements()
        .iter()
        .zip(document.text_elements())
    {
        assert_eq!(restored_text.text, original_text.text);
        assert!((restored_text.position.x - original_text.position.x).abs() < EPSILON);
        assert!((restored_text.position.y - original_text.position.y).abs() < EPSILON);
    }
    for (restored_entry, original_entry) in restored
        .transform()
        .matrix()
        .iter()
        .zip(document.transform().matrix())
    {
        assert!((restored_entry - original_entry).abs() < EPSILON);
    }
    assert!((restored.scale() - document.scale()).abs() < EPSILON);
}

#[test]
fn resave_replaces_previous_content_without_leftovers() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "resave");

    {
        let mut repo = SqliteCanvasRepository::new(&mut conn);
        repo.save_canvas(&drawn_document(note_id)).unwrap();
    }

    let mut smaller = CanvasDocument::new(note_id);
    let id = smaller.begin_stroke(StrokePoint::plain(0.0, 0.0), Rgba::BLACK, 2.0, false);
    smaller.append_point(id, StrokePoint::plain(1.0, 1.0));
    smaller.commit_stroke();

    {
        let mut repo = SqliteCanvasRepository::new(&mut conn);
        repo.save_canvas(&smaller).unwrap();
    }

    let repo = SqliteCanvasRepository::new(&mut conn);
    let restored = repo.load_canvas(note_id).unwrap();
    assert_eq!(restored.strokes().len(), 1);
    assert!(restored.text_elements().is_empty());
}

#[test]
fn missing_view_state_loads_as_identity() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "no view row");

    let repo = SqliteCanvasRepository::new(&mut conn);
    let restored = repo.load_canvas(note_id).unwrap();
    assert_eq!(restored.transform(), Transform::IDENTITY);
    assert_eq!(restored.scale(), 1.0);
    assert!(restored.strokes().is_empty());
}

#[test]
fn degenerate_persisted_transform_recovers_to_identity() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "corrupted view");

    let zero_matrix = "[0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0,0.0]";
    conn.execute(
        "INSERT INTO canvas_state (note_id, matrix_data, scale) VALUES (?1, ?2, ?3);",
        params![note_id.to_string(), zero_matrix, 4.0],
    )
    .unwrap();

    let repo = SqliteCanvasRepository::new(&mut conn);
    let restored = repo.load_canvas(note_id).unwrap();
    assert_eq!(restored.transform(), Transform::IDENTITY);
    assert_eq!(restored.scale(), 1.0);
}

#[test]
fn unparseable_matrix_recovers_to_identity() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "garbage matrix");

    conn.execute(
        "INSERT INTO canvas_state (note_id, matrix_data, scale) VALUES (?1, ?2, ?3);",
        params![note_id.to_string(), "not json", 2.0],
    )
    .unwrap();

    let repo = SqliteCanvasRepository::new(&mut conn);
    let restored = repo.load_canvas(note_id).unwrap();
    assert_eq!(restored.transform(), Transform::IDENTITY);
    assert_eq!(restored.scale(), 1.0);
}

#[test]
fn interrupted_save_leaves_previous_content_intact() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "atomic");
    let original = drawn_document(note_id);

    {
        let mut repo = SqliteCanvasRepository::new(&mut conn);
        repo.save_canvas(&original).unwrap();
    }

    // Make the text-element insert step blow up mid-transaction.
    conn.execute_batch(
        "CREATE TEMP TRIGGER simulated_crash
         BEFORE INSERT ON text_elements
         BEGIN
             SELECT RAISE(ABORT, 'simulated mid-save failure');
         END;",
    )
    .unwrap();

    let mut replacement = CanvasDocument::new(note_id);
    let id = replacement.begin_stroke(StrokePoint::plain(99.0, 99.0), Rgba::BLACK, 9.0, false);
    replacement.append_point(id, StrokePoint::plain(98.0, 98.0));
    replacement.commit_stroke();
    replacement.begin_text_edit(Point::new(0.0, 0.0), None);
    replacement.commit_text_edit("will not survive");

    {
        let mut repo = SqliteCanvasRepository::new(&mut conn);
        assert!(repo.save_canvas(&replacement).is_err());
    }

    conn.execute_batch("DROP TRIGGER simulated_crash;").unwrap();

    let repo = SqliteCanvasRepository::new(&mut conn);
    let restored = repo.load_canvas(note_id).unwrap();
    assert_eq!(restored.strokes(), original.strokes());
    assert_eq!(restored.text_elements().len(), original.text_elements().len());
    for (restored_entry, original_entry) in restored
        .transform()
        .matrix()
        .iter()
        .zip(original.transform().matrix())
    {
        assert!((restored_entry - original_entry).abs() < EPSILON);
    }
}

#[test]
fn canvas_save_never_touches_note_modified_at() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "quiet save");

    conn.execute(
        "UPDATE notes SET modified_at = 1000 WHERE id = ?1;",
        params![note_id.to_string()],
    )
    .unwrap();

    {
        let mut repo = SqliteCanvasRepository::new(&mut conn);
        repo.save_canvas(&drawn_document(note_id)).unwrap();
    }

    let modified_at: i64 = conn
        .query_row(
            "SELECT modified_at FROM notes WHERE id = ?1;",
            [note_id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(modified_at, 1000);
}

#[test]
fn deleting_note_cascades_canvas_rows() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "cascade");

    {
        let mut repo = SqliteCanvasRepository::new(&mut conn);
        repo.save_canvas(&drawn_document(note_id)).unwrap();
    }
    {
        let mut service = NoteService::new(SqliteNoteRepository::new(&mut conn));
        service.delete_note(note_id).unwrap();
    }

    for table in ["strokes", "text_elements", "canvas_state"] {
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE note_id = ?1;"),
                [note_id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0, "{table} rows should cascade");
    }
}
