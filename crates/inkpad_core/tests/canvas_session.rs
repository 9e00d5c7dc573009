use inkpad_core::db::open_db_in_memory;
use inkpad_core::model::geometry::Point;
use inkpad_core::service::canvas_service::CHECKPOINT_POINT_INTERVAL;
use inkpad_core::{
    CanvasEvent, CanvasSession, CanvasSessionError, NoteService, Rgba, SqliteNoteRepository,
    StrokePoint, Transform,
};
use rusqlite::Connection;

fn create_note(conn: &mut Connection, title: &str) -> inkpad_core::NoteId {
    let mut service = NoteService::new(SqliteNoteRepository::new(conn));
    service.create_note(title).unwrap().id
}

fn create_text_note(conn: &mut Connection, title: &str) -> inkpad_core::NoteId {
    let mut service = NoteService::new(SqliteNoteRepository::new(conn));
    service.create_text_note(title, "body").unwrap().id
}

fn stroke_begin(x: f64, y: f64) -> CanvasEvent {
    CanvasEvent::StrokeBegin {
        point: StrokePoint::plain(x, y),
        color: Rgba::BLACK,
        pen_size: 3.0,
        eraser: false,
    }
}

fn persisted_stroke_count(conn: &Connection, note_id: inkpad_core::NoteId) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM strokes WHERE note_id = ?1;",
        [note_id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn committed_stroke_is_persisted() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "draws");

    {
        let mut session = CanvasSession::open(&mut conn, note_id).unwrap();
        session.handle(stroke_begin(0.0, 0.0)).unwrap();
        session
            .handle(CanvasEvent::PointAppended {
                point: StrokePoint::plain(1.0, 1.0),
            })
            .unwrap();
        session.handle(CanvasEvent::StrokeCommitted).unwrap();
        assert!(!session.is_dirty());
    }

    assert_eq!(persisted_stroke_count(&conn, note_id), 1);
}

#[test]
fn point_appends_do_not_save_until_checkpoint() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "checkpointing");

    {
        let mut session = CanvasSession::open(&mut conn, note_id).unwrap();
        session.handle(stroke_begin(0.0, 0.0)).unwrap();
        for i in 0..(CHECKPOINT_POINT_INTERVAL - 1) {
            session
                .handle(CanvasEvent::PointAppended {
                    point: StrokePoint::plain(i as f64, 0.0),
                })
                .unwrap();
        }
        // One below the checkpoint interval: everything still in memory only.
        assert!(session.is_dirty());
        session
            .handle(CanvasEvent::PointAppended {
                point: StrokePoint::plain(9999.0, 0.0),
            })
            .unwrap();
        // The checkpoint flushed without a stroke commit.
        assert!(!session.is_dirty());
        // Session dropped without flush; the checkpointed points must survive.
    }

    assert_eq!(persisted_stroke_count(&conn, note_id), 1);
}

#[test]
fn view_gesture_persists_on_gesture_end() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "panning");
    let zoomed = Transform::IDENTITY.scaled_around_focal(Point::new(50.0, 50.0), 2.0);

    {
        let mut session = CanvasSession::open(&mut conn, note_id).unwrap();
        session
            .handle(CanvasEvent::ViewChanged {
                transform: zoomed,
                scale: 2.0,
            })
            .unwrap();
        assert!(session.is_dirty());
        session.handle(CanvasEvent::GestureEnded).unwrap();
        assert!(!session.is_dirty());
    }

    let session = CanvasSession::open(&mut conn, note_id).unwrap();
    assert!((session.document().scale() - 2.0).abs() < 1e-9);
}

#[test]
fn transform_is_locked_while_text_editor_is_open() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "locked view");

    let mut session = CanvasSession::open(&mut conn, note_id).unwrap();
    session
        .handle(CanvasEvent::TextBegin {
            position: Point::new(10.0, 10.0),
            existing_index: None,
        })
        .unwrap();
    session
        .handle(CanvasEvent::ViewChanged {
            transform: Transform::IDENTITY.scaled_around_focal(Point::new(0.0, 0.0), 3.0),
            scale: 3.0,
        })
        .unwrap();
    assert_eq!(session.document().transform(), Transform::IDENTITY);

    session
        .handle(CanvasEvent::TextCommitted {
            text: "anchored".to_string(),
        })
        .unwrap();
    assert_eq!(session.document().text_elements().len(), 1);
}

#[test]
fn undo_after_commit_is_persisted() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "undoing");

    {
        let mut session = CanvasSession::open(&mut conn, note_id).unwrap();
        session.handle(stroke_begin(0.0, 0.0)).unwrap();
        session.handle(CanvasEvent::StrokeCommitted).unwrap();
        session.handle(CanvasEvent::UndoRequested).unwrap();
        assert!(session.document().strokes().is_empty());
    }

    assert_eq!(persisted_stroke_count(&conn, note_id), 0);
}

#[test]
fn eraser_gesture_only_ever_adds_points() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_note(&mut conn, "erasing");

    let mut session = CanvasSession::open(&mut conn, note_id).unwrap();
    session.handle(stroke_begin(0.0, 0.0)).unwrap();
    session
        .handle(CanvasEvent::PointAppended {
            point: StrokePoint::plain(5.0, 0.0),
        })
        .unwrap();
    session.handle(CanvasEvent::StrokeCommitted).unwrap();
    let points_before: usize = session
        .document()
        .strokes()
        .iter()
        .map(|s| s.points().len())
        .sum();

    session
        .handle(CanvasEvent::StrokeBegin {
            point: StrokePoint::plain(2.0, 0.0),
            color: Rgba(0xFF123456),
            pen_size: 9.0,
            eraser: true,
        })
        .unwrap();
    session
        .handle(CanvasEvent::PointAppended {
            point: StrokePoint::plain(3.0, 0.0),
        })
        .unwrap();
    session.handle(CanvasEvent::StrokeCommitted).unwrap();

    let strokes = session.document().strokes();
    let points_after: usize = strokes.iter().map(|s| s.points().len()).sum();
    assert!(points_after > points_before);
    assert_eq!(strokes.last().unwrap().color(), session.document().background());
}

#[test]
fn text_only_note_cannot_open_a_canvas_session() {
    let mut conn = open_db_in_memory().unwrap();
    let note_id = create_text_note(&mut conn, "plain");

    let err = CanvasSession::open(&mut conn, note_id)
        .err()
        .expect("text-only note must be refused");
    match err {
        CanvasSessionError::TextOnlyNote(id) => assert_eq!(id, note_id),
        other => panic!("expected TextOnlyNote error, got {other}"),
    }
}

#[test]
fn unknown_note_cannot_open_a_canvas_session() {
    let mut conn = open_db_in_memory().unwrap();
    let missing = uuid::Uuid::new_v4();

    let err = CanvasSession::open(&mut conn, missing)
        .err()
        .expect("unknown note must be refused");
    match err {
        CanvasSessionError::NoteNotFound(id) => assert_eq!(id, missing),
        other => panic!("expected NoteNotFound error, got {other}"),
    }
}
