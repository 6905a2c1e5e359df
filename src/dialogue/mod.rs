pub mod builder;
pub mod confirm;
pub mod editor;
pub mod event;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::command::{self, Command, DeleteCommand, EditPatch, RetrieveFilters};
use crate::dialogue::builder::{BuilderSession, BuilderStep, EntryKind, FinishedBuild, PendingFile};
use crate::dialogue::confirm::{GateDecision, PendingAction};
use crate::dialogue::editor::{EditorSession, EditorStep};
use crate::store::{BulkDeleteScope, MediaStore, MemoryFilter, MemoryStore, NewImage};
use crate::types::{Memory, MemoryPatch, NewMemory, Payload, Reply, Turn};

/// Whichever flow currently owns the input stream. At most one is ever
/// active; the variants are mutually exclusive by construction.
pub enum ActiveFlow {
    Idle,
    Building(BuilderSession),
    Editing(EditorSession),
    Confirming(PendingAction),
}

impl ActiveFlow {
    pub fn name(&self) -> &'static str {
        match self {
            ActiveFlow::Idle => "idle",
            ActiveFlow::Building(_) => "builder",
            ActiveFlow::Editing(_) => "editor",
            ActiveFlow::Confirming(_) => "confirm",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DialogueOptions {
    /// Maximum entries printed per retrieve; anything beyond is counted
    /// in a trailing "... more" line rather than dropped silently.
    pub listing_limit: usize,
}

impl Default for DialogueOptions {
    fn default() -> Self {
        Self { listing_limit: 50 }
    }
}

/// The turn-based dialogue state machine for one diary user.
///
/// Input lines are processed strictly one at a time: `handle_line` takes
/// `&mut self`, so a session can never interleave two turns. Priority per
/// line: confirmation gate, then builder, then editor, then the command
/// parser. Every failure becomes a reply; this engine never errors out.
pub struct DialogueEngine {
    memories: Arc<dyn MemoryStore>,
    media: Arc<dyn MediaStore>,
    options: DialogueOptions,
    active: ActiveFlow,
    /// Drafts whose final persist failed; kept so user input survives a
    /// backend outage. The caller may surface or retry them.
    unsaved: Vec<NewMemory>,
}

impl DialogueEngine {
    pub fn new(memories: Arc<dyn MemoryStore>, media: Arc<dyn MediaStore>) -> Self {
        Self::with_options(memories, media, DialogueOptions::default())
    }

    pub fn with_options(
        memories: Arc<dyn MemoryStore>,
        media: Arc<dyn MediaStore>,
        options: DialogueOptions,
    ) -> Self {
        Self {
            memories,
            media,
            options,
            active: ActiveFlow::Idle,
            unsaved: Vec::new(),
        }
    }

    /// Name of the flow currently holding the input stream.
    pub fn active_flow(&self) -> &'static str {
        self.active.name()
    }

    /// True while the image builder waits for a file-selection event.
    pub fn awaiting_file(&self) -> bool {
        matches!(&self.active, ActiveFlow::Building(session) if session.awaiting_file())
    }

    /// Drafts that could not be persisted because the store was down.
    pub fn unsaved_drafts(&self) -> &[NewMemory] {
        &self.unsaved
    }

    /// Process one input line. Blank lines are ignored entirely.
    pub async fn handle_line(&mut self, input: &str) -> Turn {
        let line = input.trim();
        if line.is_empty() {
            return Turn::default();
        }

        match std::mem::replace(&mut self.active, ActiveFlow::Idle) {
            ActiveFlow::Confirming(pending) => self.resolve_pending(pending, line).await,
            ActiveFlow::Building(session) => self.drive_builder(session, line).await,
            ActiveFlow::Editing(session) => self.drive_editor(session, line).await,
            ActiveFlow::Idle => self.dispatch(line).await,
        }
    }

    /// Deliver an out-of-band file selection to a waiting image builder.
    pub async fn attach_file(&mut self, name: &str, bytes: Vec<u8>) -> Turn {
        match std::mem::replace(&mut self.active, ActiveFlow::Idle) {
            ActiveFlow::Building(mut session) if session.kind() == EntryKind::Image => {
                let replies = session.attach_file(name, bytes);
                self.active = ActiveFlow::Building(session);
                Turn::from_replies(replies)
            }
            other => {
                self.active = other;
                Turn::one(Reply::system(
                    "No image upload is waiting for a file right now.",
                ))
            }
        }
    }

    // -----------------------------------------------------------
    // Flow drivers
    // -----------------------------------------------------------

    async fn resolve_pending(&mut self, pending: PendingAction, line: &str) -> Turn {
        match confirm::resolve(line) {
            GateDecision::Unrecognized => {
                // The line is consumed by the gate; it never reaches the
                // parser while an action is pending.
                self.active = ActiveFlow::Confirming(pending);
                Turn::one(Reply::system("Please type 'yes' or 'no' to confirm."))
            }
            GateDecision::No => Turn::one(Reply::mother("Action cancelled.")),
            GateDecision::Yes => match pending {
                PendingAction::Delete(cmd) => self.execute_delete(cmd).await,
                PendingAction::Edit(memory) => self.open_editor(&memory),
            },
        }
    }

    async fn drive_builder(&mut self, session: BuilderSession, line: &str) -> Turn {
        match session.step(line) {
            BuilderStep::Continue(session, replies) => {
                self.active = ActiveFlow::Building(session);
                Turn::from_replies(replies)
            }
            BuilderStep::Cancelled(replies) => Turn::from_replies(replies),
            BuilderStep::Finished(build, mut replies) => {
                match build {
                    FinishedBuild::Entry(new) => {
                        replies.extend(self.persist_new(new).await);
                    }
                    FinishedBuild::Upload {
                        file,
                        description,
                        tags,
                        album,
                    } => {
                        replies.extend(self.persist_upload(file, description, tags, album).await);
                    }
                }
                Turn::from_replies(replies)
            }
        }
    }

    async fn drive_editor(&mut self, session: EditorSession, line: &str) -> Turn {
        match session.step(line) {
            EditorStep::Continue(session, replies) => {
                self.active = ActiveFlow::Editing(session);
                Turn::from_replies(replies)
            }
            EditorStep::Cancelled(replies) => Turn::from_replies(replies),
            EditorStep::Save(session, patch) => {
                let id = session.memory_id().to_string();
                match self.memories.update(&id, patch).await {
                    Ok(()) => {
                        info!(memory = %id, kind = session.kind().noun(), "memory updated");
                        if session.kind() == EntryKind::Image {
                            if let Some(media_id) = session.media_id() {
                                let (description, tags) = session.media_update();
                                if let Err(e) =
                                    self.media.update(media_id, &description, &tags).await
                                {
                                    warn!(media = %media_id, "media update failed: {e}");
                                }
                            }
                            Turn::one(Reply::mother(format!(
                                "Image #{id} updated successfully."
                            )))
                        } else {
                            Turn::one(Reply::mother(format!(
                                "{} #{id} updated successfully!",
                                session.kind().label()
                            )))
                        }
                    }
                    Err(e) => {
                        // Keep the session so the user can retry save or
                        // cancel; the working copy is not lost.
                        warn!(memory = %id, "editor save failed: {e}");
                        self.active = ActiveFlow::Editing(session);
                        Turn::one(Reply::system(format!("Error saving: {e}")))
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------
    // Command dispatch
    // -----------------------------------------------------------

    async fn dispatch(&mut self, line: &str) -> Turn {
        let command = command::parse(line);
        debug!(?command, "dispatching");

        match command {
            Command::Unknown { raw } => Turn::one(Reply::system(format!(
                "Unknown command: \"{raw}\". Type 'help' to see available commands."
            ))),

            Command::CreateMemory {
                content,
                category,
                tags,
            } => {
                let new = NewMemory {
                    content,
                    category,
                    tags,
                    payload: Payload::Text,
                };
                Turn::from_replies(self.persist_new(new).await)
            }

            Command::CreateTable => self.start_builder(EntryKind::Table),
            Command::CreateList => self.start_builder(EntryKind::List),
            Command::CreateTimeline => self.start_builder(EntryKind::Timeline),

            Command::SavePicture { description, tags } => {
                let (session, replies) = BuilderSession::start_image(description, tags);
                self.active = ActiveFlow::Building(session);
                Turn::from_replies(replies)
            }

            Command::EditMemory { id, updates } => self.handle_edit(id, updates).await,
            Command::Delete(cmd) => self.handle_delete(cmd),
            Command::Retrieve(filters) => self.handle_retrieve(filters).await,

            Command::Help => Turn::from_replies(help_lines()),

            Command::Clear => Turn {
                replies: vec![Reply::system("Terminal cleared.")],
                cleared: true,
            },
        }
    }

    fn start_builder(&mut self, kind: EntryKind) -> Turn {
        let (session, replies) = BuilderSession::start(kind);
        self.active = ActiveFlow::Building(session);
        Turn::from_replies(replies)
    }

    async fn handle_edit(&mut self, id: Option<String>, updates: EditPatch) -> Turn {
        let Some(id) = id else {
            return Turn::one(Reply::system("Please specify memory ID: edit memory #12"));
        };

        let memory = match self.memories.get(&id).await {
            Ok(Some(memory)) => memory,
            Ok(None) => {
                return Turn::one(Reply::system(format!("Memory #{id} not found.")));
            }
            Err(e) => return Turn::one(Reply::system(format!("Error: {e}"))),
        };

        if memory.payload != Payload::Text {
            // Structured edits go through the confirmation gate and then
            // into the interactive editor.
            let prompt = format!("Do you want to edit memory #{id}? (yes/no)");
            self.active = ActiveFlow::Confirming(PendingAction::Edit(memory));
            return Turn::one(Reply::mother(prompt));
        }

        if updates.is_empty() {
            return Turn::one(Reply::system(
                "Nothing to update. Try: edit memory #12: \"New content\"",
            ));
        }

        let patch = match updates.append {
            Some(addition) => {
                let content = if memory.content.is_empty() {
                    addition
                } else {
                    format!("{}\n{}", memory.content, addition)
                };
                MemoryPatch {
                    content: Some(content),
                    ..MemoryPatch::default()
                }
            }
            None => MemoryPatch {
                content: updates.content,
                ..MemoryPatch::default()
            },
        };

        match self.memories.update(&id, patch).await {
            Ok(()) => Turn::one(Reply::mother("Memory updated successfully.")),
            Err(e) => Turn::one(Reply::system(format!("Error: {e}"))),
        }
    }

    fn open_editor(&mut self, memory: &Memory) -> Turn {
        match EditorSession::start(memory) {
            Some((session, replies)) => {
                self.active = ActiveFlow::Editing(session);
                Turn::from_replies(replies)
            }
            None => Turn::one(Reply::system(
                "Text memories are edited directly: edit memory #12: \"New content\"",
            )),
        }
    }

    fn handle_delete(&mut self, cmd: DeleteCommand) -> Turn {
        let prompt = if cmd.delete_all {
            "Are you sure you want to DELETE ALL memories? This cannot be undone! (yes/no)"
                .to_string()
        } else if !cmd.tags.is_empty() {
            format!(
                "Are you sure you want to delete all memories with tags: {}? (yes/no)",
                cmd.tags.join(", ")
            )
        } else if let Some(category) = &cmd.category {
            format!(
                "Are you sure you want to delete all memories in category: {category}? (yes/no)"
            )
        } else if let Some(id) = &cmd.id {
            format!(
                "Are you sure you want to delete {} #{id}? (yes/no)",
                cmd.target.noun()
            )
        } else {
            // Unscoped and id-less: guidance, not a gate. The store
            // enforces the same guard for bulk calls.
            return Turn::one(Reply::system(
                "Please specify: delete memory #12, delete all, delete memories tags: work, \
                 or delete memories category: happy",
            ));
        };

        self.active = ActiveFlow::Confirming(PendingAction::Delete(cmd));
        Turn::one(Reply::mother(prompt))
    }

    async fn execute_delete(&mut self, cmd: DeleteCommand) -> Turn {
        if cmd.delete_all || !cmd.tags.is_empty() || cmd.category.is_some() {
            let scope = BulkDeleteScope {
                delete_all: cmd.delete_all,
                category: cmd.category.clone(),
                tags: cmd.tags.clone(),
            };
            return match self.memories.bulk_delete(&scope).await {
                Ok(count) if cmd.delete_all => {
                    info!(count, "bulk delete (all)");
                    Turn::one(Reply::mother(format!(
                        "All {count} memories deleted successfully."
                    )))
                }
                Ok(count) => {
                    info!(count, "bulk delete (filtered)");
                    Turn::one(Reply::mother(format!(
                        "{count} memories deleted successfully."
                    )))
                }
                Err(e) => Turn::one(Reply::system(format!("Error: {e}"))),
            };
        }

        let Some(id) = cmd.id else {
            return Turn::one(Reply::system("Please specify a memory ID to delete."));
        };

        // Deleting an image-backed memory also removes the media record;
        // a missing blob is non-fatal.
        if let Ok(Some(memory)) = self.memories.get(&id).await {
            if let Payload::Image {
                media_id: Some(media_id),
                ..
            } = &memory.payload
            {
                if let Err(e) = self.media.delete(media_id).await {
                    warn!(media = %media_id, "failed to delete associated image: {e}");
                }
            }
        }

        match self.memories.delete(&id).await {
            Ok(true) => Turn::one(Reply::mother(format!(
                "{} #{id} deleted successfully.",
                cmd.target.noun()
            ))),
            Ok(false) => Turn::one(Reply::system(format!("Memory #{id} not found."))),
            Err(e) => Turn::one(Reply::system(format!("Error: {e}"))),
        }
    }

    async fn handle_retrieve(&mut self, filters: RetrieveFilters) -> Turn {
        let filter = MemoryFilter {
            category: filters.category.clone(),
            tags: filters.tags.clone(),
            kind: filters.kind.clone(),
            date: filters.date.clone(),
            limit: filters.first.then_some(1),
        };

        if let Some(query) = &filters.search {
            return match self.memories.search(query, &filter).await {
                Ok(results) if results.is_empty() => {
                    Turn::one(Reply::mother("No memories found matching your search."))
                }
                Ok(results) => {
                    let mut replies = vec![Reply::mother(format!(
                        "Found {} memories:",
                        results.len()
                    ))];
                    replies.extend(self.listing(&results));
                    Turn::from_replies(replies)
                }
                Err(e) => Turn::one(Reply::system(format!("Error: {e}"))),
            };
        }

        match self.memories.list(&filter).await {
            Ok(results) if results.is_empty() => {
                Turn::one(Reply::mother("No memories found with those filters."))
            }
            Ok(results) => {
                let mut described = Vec::new();
                if let Some(category) = &filters.category {
                    described.push(format!("category: {category}"));
                }
                if !filters.tags.is_empty() {
                    described.push(format!("tags: {}", filters.tags.join(", ")));
                }
                let suffix = if described.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", described.join(", "))
                };
                let mut replies = vec![Reply::mother(format!(
                    "Retrieved {} memories{suffix}.",
                    results.len()
                ))];
                replies.extend(self.listing(&results));
                Turn::from_replies(replies)
            }
            Err(e) => Turn::one(Reply::system(format!("Error: {e}"))),
        }
    }

    fn listing(&self, memories: &[Memory]) -> Vec<Reply> {
        let mut replies: Vec<Reply> = memories
            .iter()
            .take(self.options.listing_limit)
            .map(|m| {
                let summary = if m.content.is_empty() {
                    m.id.clone()
                } else {
                    m.content.clone()
                };
                Reply::system(format!("  #{}: {summary}", m.id))
            })
            .collect();
        if memories.len() > self.options.listing_limit {
            let hidden = memories.len() - self.options.listing_limit;
            replies.push(Reply::system(format!("  ... {hidden} more not shown")));
        }
        replies
    }

    // -----------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------

    async fn persist_new(&mut self, new: NewMemory) -> Vec<Reply> {
        let label = new.payload.label();
        match self.memories.create(new.clone()).await {
            Ok(memory) => {
                info!(memory = %memory.id, kind = memory.payload.kind(), "memory created");
                let mut message = match &memory.payload {
                    Payload::Text => "Memory created successfully.".to_string(),
                    _ => format!("{label} created successfully!"),
                };
                if !memory.tags.is_empty() {
                    message.push_str(&format!(" Tags: {}.", memory.tags.join(", ")));
                }
                if let Some(category) = &memory.category {
                    message.push_str(&format!(" Category: {category}."));
                }
                let mut replies = vec![Reply::mother(message)];
                replies.extend(creation_preview(&memory));
                replies
            }
            Err(e) if e.is_outage() => {
                warn!("create failed, keeping draft locally: {e}");
                self.unsaved.push(new);
                vec![Reply::mother(format!(
                    "{label} saved locally. (Backend unavailable)"
                ))]
            }
            Err(e) => vec![Reply::system(format!("Error: {e}"))],
        }
    }

    async fn persist_upload(
        &mut self,
        file: PendingFile,
        description: String,
        tags: Vec<String>,
        album: Option<String>,
    ) -> Vec<Reply> {
        let image = NewImage {
            file_name: file.name,
            bytes: file.bytes,
            description: description.clone(),
            tags: tags.clone(),
            album: album.clone(),
        };

        let stored = match self.media.upload(image).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("image upload failed: {e}");
                return vec![Reply::system(format!("Error: {e}"))];
            }
        };

        let new = NewMemory {
            content: description,
            category: None,
            tags,
            payload: Payload::Image {
                image_url: stored.url,
                media_id: Some(stored.id),
                album,
            },
        };

        match self.memories.create(new.clone()).await {
            Ok(memory) => {
                info!(memory = %memory.id, "image memory created");
                vec![Reply::mother("Image uploaded successfully.")]
            }
            Err(e) if e.is_outage() => {
                warn!("image memory create failed, keeping draft locally: {e}");
                self.unsaved.push(new);
                vec![Reply::mother(
                    "Image saved locally. (Backend unavailable)",
                )]
            }
            Err(e) => vec![Reply::system(format!("Error: {e}"))],
        }
    }
}

/// Preview lines printed after a list or timeline is created.
fn creation_preview(memory: &Memory) -> Vec<Reply> {
    match &memory.payload {
        Payload::List { items } => {
            let mut replies = vec![Reply::system(format!("── {} ──", memory.content))];
            for item in items {
                replies.push(Reply::system(format!("  • {item}")));
            }
            replies
        }
        Payload::Timeline { events } => {
            let mut replies = vec![Reply::system(format!("── {} ──", memory.content))];
            for event in events {
                replies.push(Reply::system(format!("  {}", event.display())));
            }
            replies
        }
        _ => Vec::new(),
    }
}

fn help_lines() -> Vec<Reply> {
    [
        "═══ CREATE MEMORIES ═══",
        "  create memory: \"Your text\"",
        "  create memory: #work #ideas \"Your text\"",
        "  create memory: category: happy \"Your text\"",
        "  create memory: #work category: happy \"Your text\"",
        "",
        "═══ CREATE TABLE (Interactive) ═══",
        "  create table - Starts guided table creation",
        "    → Mother asks for: title, columns, rows, tags, category",
        "    → Type 'cancel' to abort at any step",
        "",
        "═══ CREATE LIST (Interactive) ═══",
        "  create list - Starts guided list creation",
        "    → Mother asks for: title, items, tags, category",
        "    → Type 'cancel' to abort at any step",
        "",
        "═══ CREATE TIMELINE (Interactive) ═══",
        "  create timeline - Starts guided timeline creation",
        "    → Mother asks for: title, events, tags, category",
        "    → Format for events: TIME - DESCRIPTION (e.g., '9:00 AM - Wake up')",
        "",
        "═══ SAVE IMAGES ═══",
        "  save picture - Prompts for an image file to upload",
        "",
        "═══ RETRIEVE MEMORIES ═══",
        "  show all - Retrieve all memories and images",
        "  show tags: work - Memories tagged with 'work'",
        "  show tags: work, ideas - Memories with any of these tags",
        "  show #tag1 #tag2 - Hashtag syntax for tags",
        "  show category: happy - All in category 'happy'",
        "  show pictures - All images only",
        "  show all tables - All table memories",
        "  search: \"coffee\" - Free-text search",
        "  Mother, show happy moments - Natural language retrieval",
        "",
        "═══ EDIT & DELETE ═══",
        "  edit memory #12: \"New content\" - Update memory text",
        "  edit memory #12 - For tables/lists: opens interactive editor",
        "  delete memory #12 - Delete single memory",
        "  delete picture #5 - Delete single image",
        "  delete all - Delete ALL memories (asks for confirmation)",
        "  delete memories tags: work - Delete all tagged 'work'",
        "  delete memories category: happy - Delete in category",
        "",
        "═══ OTHER ═══",
        "  clear - Clear terminal screen",
        "  help - Show this help (what you're reading)",
    ]
    .into_iter()
    .map(Reply::system)
    .collect()
}
