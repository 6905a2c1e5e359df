use std::sync::Arc;

use mid::dialogue::DialogueEngine;
use mid::store::memory::InMemoryStore;
use mid::store::{MediaStore, MemoryStore, NewImage};
use mid::types::{NewMemory, Payload, TimelineEvent, Turn};

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

async fn seed_table(store: &InMemoryStore) -> String {
    let memory = store
        .create(NewMemory {
            content: "Reading log".into(),
            category: None,
            tags: vec!["books".into()],
            payload: Payload::Table {
                columns: vec!["Book".into(), "Pages".into()],
                rows: vec![vec!["Dune".into(), "412".into()]],
            },
        })
        .await
        .unwrap();
    memory.id
}

async fn seed_list(store: &InMemoryStore, items: &[&str]) -> String {
    let memory = store
        .create(NewMemory {
            content: "Groceries".into(),
            category: None,
            tags: vec![],
            payload: Payload::List {
                items: items.iter().map(|s| s.to_string()).collect(),
            },
        })
        .await
        .unwrap();
    memory.id
}

/// Structured edits pass the confirmation gate before the menu opens.
async fn open_editor(engine: &mut DialogueEngine, id: &str) -> Turn {
    let turn = engine.handle_line(&format!("edit memory #{id}")).await;
    assert!(
        text(&turn).contains(&format!("Do you want to edit memory #{id}? (yes/no)")),
        "expected edit confirmation, got: {}",
        text(&turn)
    );
    engine.handle_line("yes").await
}

// =============================================================
// Opening and the gate
// =============================================================

#[tokio::test]
async fn structured_edit_is_gated_then_opens_menu() {
    let (mut engine, store) = engine();
    let id = seed_table(&store).await;

    let turn = open_editor(&mut engine, &id).await;
    let body = text(&turn);
    assert!(body.contains(&format!("Editing Table #{id}: \"Reading log\"")));
    assert!(body.contains("What would you like to edit?"));
    assert!(body.contains("save - Save changes"));
}

#[tokio::test]
async fn declined_edit_leaves_no_session() {
    let (mut engine, store) = engine();
    let id = seed_table(&store).await;

    engine.handle_line(&format!("edit memory #{id}")).await;
    let turn = engine.handle_line("no").await;
    assert!(text(&turn).contains("Action cancelled."));

    // Next line goes to the parser, not an editor.
    let turn = engine.handle_line("1").await;
    assert!(text(&turn).contains("Unknown command"));
}

#[tokio::test]
async fn editing_a_missing_memory_fails_cleanly() {
    let (mut engine, _store) = engine();
    let turn = engine.handle_line("edit memory #nope").await;
    assert!(text(&turn).contains("Memory #nope not found."));
}

#[tokio::test]
async fn edit_without_id_gives_guidance() {
    let (mut engine, _store) = engine();
    let turn = engine.handle_line("edit memory").await;
    assert!(text(&turn).contains("Please specify memory ID: edit memory #12"));
}

// =============================================================
// Text memories bypass the session
// =============================================================

#[tokio::test]
async fn text_edit_is_direct() {
    let (mut engine, store) = engine();
    let memory = store
        .create(NewMemory {
            content: "Old words".into(),
            category: None,
            tags: vec![],
            payload: Payload::Text,
        })
        .await
        .unwrap();

    let turn = engine
        .handle_line(&format!("edit memory #{}: \"New words\"", memory.id))
        .await;
    assert!(text(&turn).contains("Memory updated successfully."));

    let updated = store.get(&memory.id).await.unwrap().unwrap();
    assert_eq!(updated.content, "New words");
}

#[tokio::test]
async fn text_add_appends_to_content() {
    let (mut engine, store) = engine();
    let memory = store
        .create(NewMemory {
            content: "First line".into(),
            category: None,
            tags: vec![],
            payload: Payload::Text,
        })
        .await
        .unwrap();

    engine
        .handle_line(&format!("edit memory #{} add: \"Second line\"", memory.id))
        .await;

    let updated = store.get(&memory.id).await.unwrap().unwrap();
    assert_eq!(updated.content, "First line\nSecond line");
}

// =============================================================
// Table editor: column reconciliation
// =============================================================

#[tokio::test]
async fn growing_columns_pads_rows_with_empty_strings() {
    let (mut engine, store) = engine();
    let id = seed_table(&store).await;
    open_editor(&mut engine, &id).await;

    let turn = drive(&mut engine, &["2", "Book, Pages, Rating"]).await;
    assert!(text(&turn).contains("Columns updated: Book | Pages | Rating"));
    engine.handle_line("save").await;

    let memory = store.get(&id).await.unwrap().unwrap();
    let Payload::Table { columns, rows } = &memory.payload else {
        panic!("expected table payload");
    };
    assert_eq!(columns.len(), 3);
    assert_eq!(
        rows[0],
        vec!["Dune".to_string(), "412".to_string(), String::new()]
    );
}

#[tokio::test]
async fn shrinking_columns_truncates_rows() {
    let (mut engine, store) = engine();
    let id = seed_table(&store).await;
    open_editor(&mut engine, &id).await;

    drive(&mut engine, &["2", "Book", "save"]).await;

    let memory = store.get(&id).await.unwrap().unwrap();
    let Payload::Table { columns, rows } = &memory.payload else {
        panic!("expected table payload");
    };
    assert_eq!(columns.len(), 1);
    assert_eq!(rows[0], vec!["Dune".to_string()]);
}

#[tokio::test]
async fn add_row_validates_width_against_columns() {
    let (mut engine, store) = engine();
    let id = seed_table(&store).await;
    open_editor(&mut engine, &id).await;

    engine.handle_line("3").await; // Add row
    let turn = engine.handle_line("only one").await;
    assert!(text(&turn).contains("Row should have 2 values (you entered 1). Try again:"));

    let turn = engine.handle_line("Emma, 330").await;
    assert!(text(&turn).contains("Row 2 added: Emma | 330"));
}

// =============================================================
// Element selection and reorder
// =============================================================

#[tokio::test]
async fn out_of_range_index_reprompts_with_range() {
    let (mut engine, store) = engine();
    let id = seed_list(&store, &["Milk", "Eggs", "Bread"]).await;
    open_editor(&mut engine, &id).await;

    engine.handle_line("3").await; // Edit item
    let turn = engine.handle_line("9").await;
    assert!(text(&turn).contains("Please enter a valid item number (1-3):"));
    let turn = engine.handle_line("seven").await;
    assert!(text(&turn).contains("Please enter a valid item number (1-3):"));

    // A valid index still works after the re-prompts
    let turn = engine.handle_line("2").await;
    assert!(text(&turn).contains("Current: \"Eggs\""));
    let turn = engine.handle_line("Oat milk").await;
    assert!(text(&turn).contains("Item 2 updated to: \"Oat milk\""));
}

#[tokio::test]
async fn reorder_is_remove_then_insert() {
    let (mut engine, store) = engine();
    let id = seed_list(&store, &["a", "b", "c"]).await;
    open_editor(&mut engine, &id).await;

    drive(&mut engine, &["5", "3 to 1", "save"]).await;

    let memory = store.get(&id).await.unwrap().unwrap();
    let Payload::List { items } = &memory.payload else {
        panic!("expected list payload");
    };
    assert_eq!(
        items,
        &vec!["c".to_string(), "a".to_string(), "b".to_string()]
    );
}

#[tokio::test]
async fn reorder_accepts_flexible_separators() {
    let (mut engine, store) = engine();
    let id = seed_list(&store, &["a", "b", "c"]).await;
    open_editor(&mut engine, &id).await;

    engine.handle_line("5").await;
    let turn = engine.handle_line("1, 3").await;
    assert!(text(&turn).contains("Moved item 1 to position 3."));
    engine.handle_line("save").await;

    let memory = store.get(&id).await.unwrap().unwrap();
    let Payload::List { items } = &memory.payload else {
        panic!("expected list payload");
    };
    assert_eq!(
        items,
        &vec!["b".to_string(), "c".to_string(), "a".to_string()]
    );
}

#[tokio::test]
async fn deleting_last_element_leaves_valid_empty_state() {
    let (mut engine, store) = engine();
    let id = seed_list(&store, &["only"]).await;
    open_editor(&mut engine, &id).await;

    let turn = drive(&mut engine, &["4", "1"]).await;
    assert!(text(&turn).contains("Item 1 deleted. 0 items remaining."));

    let turn = engine.handle_line("8").await; // View
    assert!(text(&turn).contains("(no items)"));
}

// =============================================================
// Save/cancel semantics
// =============================================================

#[tokio::test]
async fn cancel_discards_the_working_copy() {
    let (mut engine, store) = engine();
    let id = seed_table(&store).await;
    open_editor(&mut engine, &id).await;

    drive(&mut engine, &["1", "Renamed"]).await;
    let turn = engine.handle_line("cancel").await;
    assert!(text(&turn).contains("Table editing cancelled. No changes saved."));

    let memory = store.get(&id).await.unwrap().unwrap();
    assert_eq!(memory.content, "Reading log");
}

#[tokio::test]
async fn save_is_a_menu_command_not_a_sub_step_command() {
    let (mut engine, store) = engine();
    let id = seed_table(&store).await;
    open_editor(&mut engine, &id).await;

    // In the title sub-step, "save" is just a title.
    engine.handle_line("1").await;
    let turn = engine.handle_line("save").await;
    assert!(text(&turn).contains("Title updated to: \"save\""));

    engine.handle_line("cancel").await;
    let memory = store.get(&id).await.unwrap().unwrap();
    assert_eq!(memory.content, "Reading log");
}

#[tokio::test]
async fn save_persists_title_tags_and_category() {
    let (mut engine, store) = engine();
    let id = seed_table(&store).await;
    open_editor(&mut engine, &id).await;

    let turn = drive(
        &mut engine,
        &["1", "Library", "7", "reading, shelf", "8", "hobbies", "save"],
    )
    .await;
    assert!(text(&turn).contains(&format!("Table #{id} updated successfully!")));

    let memory = store.get(&id).await.unwrap().unwrap();
    assert_eq!(memory.content, "Library");
    assert_eq!(
        memory.tags,
        vec!["reading".to_string(), "shelf".to_string()]
    );
    assert_eq!(memory.category.as_deref(), Some("hobbies"));
}

#[tokio::test]
async fn invalid_menu_option_restates_range() {
    let (mut engine, store) = engine();
    let id = seed_table(&store).await;
    open_editor(&mut engine, &id).await;

    let turn = engine.handle_line("42").await;
    assert!(text(&turn).contains("Invalid option. Please enter 1-9, 'save', or 'cancel'."));
}

// =============================================================
// Timeline editor
// =============================================================

#[tokio::test]
async fn timeline_edit_event_normalizes_time() {
    let (mut engine, store) = engine();
    let memory = store
        .create(NewMemory {
            content: "Saturday".into(),
            category: None,
            tags: vec![],
            payload: Payload::Timeline {
                events: vec![TimelineEvent {
                    time: "9:00 AM".into(),
                    description: "Wake up".into(),
                }],
            },
        })
        .await
        .unwrap();
    open_editor(&mut engine, &memory.id).await;

    drive(&mut engine, &["3", "1", "10am - Breakfast", "save"]).await;

    let updated = store.get(&memory.id).await.unwrap().unwrap();
    let Payload::Timeline { events } = &updated.payload else {
        panic!("expected timeline payload");
    };
    assert_eq!(events[0].time, "10:00 AM");
    assert_eq!(events[0].description, "Breakfast");
}

// =============================================================
// Image editor
// =============================================================

#[tokio::test]
async fn image_editor_edits_description_and_tags() {
    let (mut engine, store) = engine();
    let stored = store
        .upload(NewImage {
            file_name: "pier.jpg".into(),
            bytes: vec![1],
            description: "Sunset".into(),
            tags: vec![],
            album: None,
        })
        .await
        .unwrap();
    let memory = store
        .create(NewMemory {
            content: "Sunset".into(),
            category: None,
            tags: vec![],
            payload: Payload::Image {
                image_url: stored.url.clone(),
                media_id: Some(stored.id.clone()),
                album: None,
            },
        })
        .await
        .unwrap();

    let turn = open_editor(&mut engine, &memory.id).await;
    let body = text(&turn);
    assert!(body.contains(&format!("Editing Image #{}: \"Sunset\"", memory.id)));
    assert!(body.contains("1. Description"));
    assert!(body.contains("3. View current image"));

    drive(&mut engine, &["1", "Sunset at the pier", "2", "beach, summer"]).await;

    let turn = engine.handle_line("3").await; // View
    let body = text(&turn);
    assert!(body.contains("Description: Sunset at the pier"));
    assert!(body.contains("Tags: beach, summer"));

    let turn = engine.handle_line("save").await;
    assert!(text(&turn).contains(&format!("Image #{} updated successfully.", memory.id)));

    let updated = store.get(&memory.id).await.unwrap().unwrap();
    assert_eq!(updated.content, "Sunset at the pier");
    assert_eq!(
        updated.tags,
        vec!["beach".to_string(), "summer".to_string()]
    );
}
