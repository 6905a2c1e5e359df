use std::sync::Arc;

use mid::dialogue::DialogueEngine;
use mid::store::memory::InMemoryStore;
use mid::store::{MediaStore, MemoryFilter, MemoryStore};
use mid::types::{Payload, Turn};

fn engine() -> (DialogueEngine, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let memories: Arc<dyn MemoryStore> = store.clone();
    let media: Arc<dyn MediaStore> = store.clone();
    (DialogueEngine::new(memories, media), store)
}

fn text(turn: &Turn) -> String {
    turn.replies
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

async fn drive(engine: &mut DialogueEngine, lines: &[&str]) -> Turn {
    let mut last = Turn::default();
    for line in lines {
        last = engine.handle_line(line).await;
    }
    last
}

// =============================================================
// Table builder
// =============================================================

#[tokio::test]
async fn table_builder_full_flow() {
    let (mut engine, store) = engine();

    let turn = engine.handle_line("create table").await;
    assert!(text(&turn).contains("Let's create a table!"));

    drive(
        &mut engine,
        &[
            "Reading log",
            "Book, Pages",
            "Dune, 412",
            "Emma, 330",
            "done",
            "books",
            "personal",
        ],
    )
    .await;

    let all = store.list(&MemoryFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    let memory = &all[0];
    assert_eq!(memory.content, "Reading log");
    assert_eq!(memory.tags, vec!["books".to_string()]);
    assert_eq!(memory.category.as_deref(), Some("personal"));
    let Payload::Table { columns, rows } = &memory.payload else {
        panic!("expected table payload");
    };
    assert_eq!(columns, &vec!["Book".to_string(), "Pages".to_string()]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["Dune".to_string(), "412".to_string()]);
}

#[tokio::test]
async fn table_row_width_is_validated() {
    let (mut engine, store) = engine();
    drive(&mut engine, &["create table", "skip", "Name, Age"]).await;

    // 1 value against 2 columns: re-prompt, nothing accepted
    let turn = engine.handle_line("Bob").await;
    assert!(text(&turn).contains("Row should have 2 values (you entered 1). Try again:"));

    // Correct width is accepted as row 1
    let turn = engine.handle_line("Bob, 30").await;
    assert!(text(&turn).contains("Row 1 added: Bob | 30"));

    drive(&mut engine, &["done", "skip", "skip"]).await;
    let all = store.list(&MemoryFilter::default()).await.unwrap();
    let Payload::Table { rows, .. } = &all[0].payload else {
        panic!("expected table payload");
    };
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn table_needs_at_least_one_column_and_row() {
    let (mut engine, _store) = engine();
    drive(&mut engine, &["create table", "skip"]).await;

    let turn = engine.handle_line(" , ,").await;
    assert!(text(&turn).contains("at least one column name"));

    engine.handle_line("Name").await;
    let turn = engine.handle_line("done").await;
    assert!(text(&turn).contains("Please add at least one row of data."));
}

#[tokio::test]
async fn skipped_title_defaults_to_kind_name() {
    let (mut engine, store) = engine();
    drive(
        &mut engine,
        &["create table", "skip", "A", "1", "done", "skip", "skip"],
    )
    .await;
    let all = store.list(&MemoryFilter::default()).await.unwrap();
    assert_eq!(all[0].content, "Table");
}

// =============================================================
// List builder
// =============================================================

#[tokio::test]
async fn list_builder_full_flow() {
    let (mut engine, store) = engine();
    let turn = drive(
        &mut engine,
        &[
            "create list",
            "Groceries",
            "Milk",
            "Eggs",
            "done",
            "errands, food",
            "skip",
        ],
    )
    .await;

    assert!(text(&turn).contains("List created successfully!"));
    assert!(text(&turn).contains("── Groceries ──"));
    assert!(text(&turn).contains("• Milk"));

    let all = store.list(&MemoryFilter::default()).await.unwrap();
    let Payload::List { items } = &all[0].payload else {
        panic!("expected list payload");
    };
    assert_eq!(items, &vec!["Milk".to_string(), "Eggs".to_string()]);
    assert_eq!(
        all[0].tags,
        vec!["errands".to_string(), "food".to_string()]
    );
}

#[tokio::test]
async fn list_done_requires_an_item() {
    let (mut engine, _store) = engine();
    drive(&mut engine, &["create list", "skip"]).await;
    let turn = engine.handle_line("done").await;
    assert!(text(&turn).contains("Please add at least one item to the list."));
}

// =============================================================
// Timeline builder
// =============================================================

#[tokio::test]
async fn timeline_events_split_on_dash_only() {
    let (mut engine, store) = engine();
    drive(
        &mut engine,
        &[
            "create timeline",
            "Saturday",
            "9:00 AM - Wake up",
            "Woke up early",
            "done",
            "skip",
            "skip",
        ],
    )
    .await;

    let all = store.list(&MemoryFilter::default()).await.unwrap();
    let Payload::Timeline { events } = &all[0].payload else {
        panic!("expected timeline payload");
    };
    assert_eq!(events[0].time, "9:00 AM");
    assert_eq!(events[0].description, "Wake up");
    assert_eq!(events[1].time, "");
    assert_eq!(events[1].description, "Woke up early");
}

#[tokio::test]
async fn timeline_times_are_normalized() {
    let (mut engine, store) = engine();
    drive(
        &mut engine,
        &["create timeline", "skip", "9am - Coffee", "done", "skip", "skip"],
    )
    .await;

    let all = store.list(&MemoryFilter::default()).await.unwrap();
    let Payload::Timeline { events } = &all[0].payload else {
        panic!("expected timeline payload");
    };
    assert_eq!(events[0].time, "9:00 AM");
}

// =============================================================
// Cancellation and flow exclusivity
// =============================================================

#[tokio::test]
async fn cancel_aborts_without_persisting() {
    let (mut engine, store) = engine();
    drive(&mut engine, &["create list", "Chores", "Dishes"]).await;

    let turn = engine.handle_line("cancel").await;
    assert!(text(&turn).contains("List creation cancelled."));
    assert!(store.is_empty().await);

    // Second cancel falls through to the parser: bare "cancel" is not a
    // command.
    let turn = engine.handle_line("cancel").await;
    assert!(text(&turn).contains("Unknown command"));
}

#[tokio::test]
async fn active_builder_consumes_command_shaped_lines() {
    let (mut engine, store) = engine();
    drive(&mut engine, &["create memory: \"precious\"", "create list", "skip"]).await;

    // "delete all" is an item literal while the builder owns the input;
    // it must never reach the dispatcher or arm the gate.
    drive(&mut engine, &["delete all", "done", "skip", "skip"]).await;

    let all = store.list(&MemoryFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    let list = all
        .iter()
        .find_map(|m| match &m.payload {
            Payload::List { items } => Some(items.clone()),
            _ => None,
        })
        .expect("list should exist");
    assert_eq!(list, vec!["delete all".to_string()]);

    // And no confirmation is pending afterwards.
    let turn = engine.handle_line("yes").await;
    assert!(text(&turn).contains("Unknown command"));
}

// =============================================================
// Image builder
// =============================================================

#[tokio::test]
async fn image_builder_uploads_on_save() {
    let (mut engine, store) = engine();

    let turn = engine.handle_line("save picture").await;
    assert!(text(&turn).contains("Please select an image file to continue."));
    assert!(engine.awaiting_file());

    // Text while waiting for the file just re-prompts
    let turn = engine.handle_line("what now?").await;
    assert!(text(&turn).contains("Please select an image file to continue."));

    let turn = engine.attach_file("pier.jpg", vec![0xFF, 0xD8]).await;
    assert!(text(&turn).contains("Image selected: pier.jpg"));

    let turn = drive(&mut engine, &["Sunset at the pier", "beach", "Summer"]).await;
    assert!(text(&turn).contains("Ready to upload the image"));

    let turn = engine.handle_line("save").await;
    assert!(text(&turn).contains("Image uploaded successfully."));

    let all = store.list(&MemoryFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].content, "Sunset at the pier");
    let Payload::Image {
        image_url,
        media_id,
        album,
    } = &all[0].payload
    else {
        panic!("expected image payload");
    };
    assert!(image_url.starts_with("mid://media/"));
    assert!(media_id.is_some());
    assert_eq!(album.as_deref(), Some("Summer"));
}

#[tokio::test]
async fn image_confirm_anything_else_cancels() {
    let (mut engine, store) = engine();
    engine.handle_line("save picture").await;
    engine.attach_file("cat.png", vec![1, 2, 3]).await;
    drive(&mut engine, &["skip", "skip", "skip"]).await;

    let turn = engine.handle_line("nope").await;
    assert!(text(&turn).contains("Image upload cancelled."));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn attach_without_waiting_builder_is_rejected() {
    let (mut engine, _store) = engine();
    let turn = engine.attach_file("x.png", vec![1]).await;
    assert!(text(&turn).contains("No image upload is waiting"));
}
