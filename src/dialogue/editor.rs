use crate::dialogue::builder::{Draft, EntryKind};
use crate::dialogue::event::split_event;
use crate::types::{Memory, MemoryPatch, Payload, Reply};

/// A menu-driven editing flow over a working copy of one structured
/// memory. Nothing is persisted until `save` is typed at the menu;
/// `cancel` discards the working copy at any step.
#[derive(Debug, Clone)]
pub struct EditorSession {
    kind: EntryKind,
    memory_id: String,
    media_id: Option<String>,
    step: EditStep,
    draft: Draft,
    pending_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditStep {
    Menu,
    Title,
    Columns,
    AddElement,
    SelectEditElement,
    EditElement,
    SelectDeleteElement,
    Reorder,
    Tags,
    Category,
    Description,
}

/// Result of feeding one input line to an editor.
pub enum EditorStep {
    Continue(EditorSession, Vec<Reply>),
    Cancelled(Vec<Reply>),
    /// The user typed `save` at the menu. The engine persists the patch;
    /// the session is handed back so it can be kept alive if the store
    /// call fails.
    Save(EditorSession, MemoryPatch),
}

/// One selectable menu entry; the menus are generated from these per-kind
/// tables, so numbering stays consistent with the entry list.
struct MenuEntry {
    label: &'static str,
    keywords: &'static [&'static str],
    action: MenuAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Title,
    Columns,
    Add,
    Edit,
    Delete,
    Reorder,
    Tags,
    Category,
    View,
    Description,
}

const TABLE_MENU: &[MenuEntry] = &[
    MenuEntry { label: "Title", keywords: &["title"], action: MenuAction::Title },
    MenuEntry { label: "Columns", keywords: &["columns"], action: MenuAction::Columns },
    MenuEntry { label: "Add row", keywords: &["add", "add row"], action: MenuAction::Add },
    MenuEntry { label: "Edit row", keywords: &["edit", "edit row"], action: MenuAction::Edit },
    MenuEntry { label: "Delete row", keywords: &["delete", "delete row"], action: MenuAction::Delete },
    MenuEntry { label: "Reorder rows", keywords: &["reorder", "move"], action: MenuAction::Reorder },
    MenuEntry { label: "Tags", keywords: &["tags"], action: MenuAction::Tags },
    MenuEntry { label: "Category", keywords: &["category"], action: MenuAction::Category },
    MenuEntry { label: "View current table", keywords: &["view"], action: MenuAction::View },
];

const LIST_MENU: &[MenuEntry] = &[
    MenuEntry { label: "Title", keywords: &["title"], action: MenuAction::Title },
    MenuEntry { label: "Add item", keywords: &["add", "add item"], action: MenuAction::Add },
    MenuEntry { label: "Edit item", keywords: &["edit", "edit item"], action: MenuAction::Edit },
    MenuEntry { label: "Delete item", keywords: &["delete", "delete item"], action: MenuAction::Delete },
    MenuEntry { label: "Reorder items", keywords: &["reorder", "move"], action: MenuAction::Reorder },
    MenuEntry { label: "Tags", keywords: &["tags"], action: MenuAction::Tags },
    MenuEntry { label: "Category", keywords: &["category"], action: MenuAction::Category },
    MenuEntry { label: "View current list", keywords: &["view"], action: MenuAction::View },
];

const TIMELINE_MENU: &[MenuEntry] = &[
    MenuEntry { label: "Title", keywords: &["title"], action: MenuAction::Title },
    MenuEntry { label: "Add event", keywords: &["add", "add event"], action: MenuAction::Add },
    MenuEntry { label: "Edit event", keywords: &["edit", "edit event"], action: MenuAction::Edit },
    MenuEntry { label: "Delete event", keywords: &["delete", "delete event"], action: MenuAction::Delete },
    MenuEntry { label: "Reorder events", keywords: &["reorder", "move"], action: MenuAction::Reorder },
    MenuEntry { label: "Tags", keywords: &["tags"], action: MenuAction::Tags },
    MenuEntry { label: "Category", keywords: &["category"], action: MenuAction::Category },
    MenuEntry { label: "View current timeline", keywords: &["view"], action: MenuAction::View },
];

const IMAGE_MENU: &[MenuEntry] = &[
    MenuEntry { label: "Description", keywords: &["description"], action: MenuAction::Description },
    MenuEntry { label: "Tags", keywords: &["tags"], action: MenuAction::Tags },
    MenuEntry { label: "View current image", keywords: &["view"], action: MenuAction::View },
];

impl EditorSession {
    /// Load a structured memory into a working copy and open the menu.
    /// Returns `None` for plain text memories — those are edited in a
    /// single turn, outside any session.
    pub fn start(memory: &Memory) -> Option<(Self, Vec<Reply>)> {
        let (kind, draft, media_id) = match &memory.payload {
            Payload::Text => return None,
            Payload::Table { columns, rows } => (
                EntryKind::Table,
                Draft {
                    title: memory.content.clone(),
                    columns: columns.clone(),
                    rows: rows.clone(),
                    tags: memory.tags.clone(),
                    category: memory.category.clone(),
                    ..Draft::default()
                },
                None,
            ),
            Payload::List { items } => (
                EntryKind::List,
                Draft {
                    title: memory.content.clone(),
                    items: items.clone(),
                    tags: memory.tags.clone(),
                    category: memory.category.clone(),
                    ..Draft::default()
                },
                None,
            ),
            Payload::Timeline { events } => (
                EntryKind::Timeline,
                Draft {
                    title: memory.content.clone(),
                    events: events.clone(),
                    tags: memory.tags.clone(),
                    category: memory.category.clone(),
                    ..Draft::default()
                },
                None,
            ),
            Payload::Image { media_id, .. } => (
                EntryKind::Image,
                Draft {
                    description: memory.content.clone(),
                    tags: memory.tags.clone(),
                    category: memory.category.clone(),
                    ..Draft::default()
                },
                media_id.clone(),
            ),
        };

        let session = Self {
            kind,
            memory_id: memory.id.clone(),
            media_id,
            step: EditStep::Menu,
            draft,
            pending_index: None,
        };

        let heading = match kind {
            EntryKind::Image => {
                let name = if session.draft.description.is_empty() {
                    "Untitled"
                } else {
                    &session.draft.description
                };
                format!("Editing Image #{}: \"{name}\"", session.memory_id)
            }
            _ => {
                let name = if session.draft.title.is_empty() {
                    "Untitled"
                } else {
                    &session.draft.title
                };
                format!(
                    "Editing {} #{}: \"{name}\"",
                    kind.label(),
                    session.memory_id
                )
            }
        };

        let mut replies = vec![Reply::mother(heading)];
        replies.extend(session.menu_lines());
        Some((session, replies))
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn memory_id(&self) -> &str {
        &self.memory_id
    }

    pub fn media_id(&self) -> Option<&str> {
        self.media_id.as_deref()
    }

    /// Feed one input line to the flow.
    pub fn step(mut self, input: &str) -> EditorStep {
        let trimmed = input.trim();
        let lower = trimmed.to_ascii_lowercase();

        // cancel/exit discard at every step
        if lower == "cancel" || lower == "exit" {
            let message = match self.kind {
                EntryKind::Image => "Image editing cancelled.".to_string(),
                kind => format!("{} editing cancelled. No changes saved.", kind.label()),
            };
            return EditorStep::Cancelled(vec![Reply::mother(message)]);
        }

        match self.step {
            EditStep::Menu => {
                if lower == "save" {
                    let patch = self.build_patch();
                    return EditorStep::Save(self, patch);
                }
                self.menu_choice(&lower)
            }

            EditStep::Title => {
                self.draft.title = trimmed.to_string();
                let feedback = Reply::mother(format!("Title updated to: \"{trimmed}\""));
                self.back_to_menu(vec![feedback])
            }

            EditStep::Columns => {
                let columns: Vec<String> = trimmed
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
                if columns.is_empty() {
                    return EditorStep::Continue(
                        self,
                        vec![Reply::system("Please enter at least one column name.")],
                    );
                }
                // Reconcile existing rows with the new width so rows never
                // desynchronize from the header.
                for row in &mut self.draft.rows {
                    if row.len() < columns.len() {
                        row.resize(columns.len(), String::new());
                    } else {
                        row.truncate(columns.len());
                    }
                }
                let heading = columns.join(" | ");
                self.draft.columns = columns;
                let feedback = Reply::mother(format!("Columns updated: {heading}"));
                self.back_to_menu(vec![feedback])
            }

            EditStep::AddElement => self.add_element(trimmed),

            EditStep::SelectEditElement => match self.parse_index(trimmed) {
                Ok(index) => {
                    self.pending_index = Some(index);
                    self.step = EditStep::EditElement;
                    let replies = self.edit_element_prompt(index);
                    EditorStep::Continue(self, replies)
                }
                Err(reply) => EditorStep::Continue(self, vec![reply]),
            },

            EditStep::EditElement => self.replace_element(trimmed),

            EditStep::SelectDeleteElement => match self.parse_index(trimmed) {
                Ok(index) => {
                    self.remove_element(index);
                    let remaining = self.element_count();
                    let feedback = Reply::mother(format!(
                        "{} {} deleted. {remaining} {}s remaining.",
                        capitalize(self.kind.element()),
                        index + 1,
                        self.kind.element()
                    ));
                    self.back_to_menu(vec![feedback])
                }
                Err(reply) => EditorStep::Continue(self, vec![reply]),
            },

            EditStep::Reorder => {
                let count = self.element_count();
                let parsed = parse_reorder(trimmed).filter(|(from, to)| {
                    (1..=count).contains(from) && (1..=count).contains(to)
                });
                let Some((from, to)) = parsed else {
                    return EditorStep::Continue(
                        self,
                        vec![Reply::system(
                            "Invalid. Enter two numbers like: 3 to 1 or 3, 1",
                        )],
                    );
                };
                self.move_element(from - 1, to - 1);
                let feedback = Reply::mother(format!(
                    "Moved {} {from} to position {to}.",
                    self.kind.element()
                ));
                self.back_to_menu(vec![feedback])
            }

            EditStep::Tags => {
                let feedback = if lower == "clear" {
                    self.draft.tags = Vec::new();
                    Reply::mother("Tags cleared.")
                } else {
                    self.draft.tags = trimmed
                        .split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect();
                    Reply::mother(format!("Tags updated: {}", self.draft.tags.join(", ")))
                };
                self.back_to_menu(vec![feedback])
            }

            EditStep::Category => {
                let feedback = if lower == "clear" {
                    self.draft.category = None;
                    Reply::mother("Category cleared.")
                } else {
                    self.draft.category = Some(trimmed.to_string());
                    Reply::mother(format!("Category updated: {trimmed}"))
                };
                self.back_to_menu(vec![feedback])
            }

            EditStep::Description => {
                self.draft.description = if lower == "skip" {
                    String::new()
                } else {
                    trimmed.to_string()
                };
                self.back_to_menu(Vec::new())
            }
        }
    }

    fn menu(&self) -> &'static [MenuEntry] {
        match self.kind {
            EntryKind::Table => TABLE_MENU,
            EntryKind::List => LIST_MENU,
            EntryKind::Timeline => TIMELINE_MENU,
            EntryKind::Image => IMAGE_MENU,
        }
    }

    fn menu_lines(&self) -> Vec<Reply> {
        let mut lines = vec![Reply::system("What would you like to edit?")];
        for (i, entry) in self.menu().iter().enumerate() {
            lines.push(Reply::system(format!("  {}. {}", i + 1, entry.label)));
        }
        lines.push(Reply::system("  save - Save changes"));
        lines.push(Reply::system("  cancel - Discard changes"));
        lines
    }

    fn menu_choice(mut self, lower: &str) -> EditorStep {
        let menu = self.menu();
        let chosen = lower
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| menu.get(i))
            .or_else(|| menu.iter().find(|e| e.keywords.contains(&lower)));

        let Some(entry) = chosen else {
            let max = menu.len();
            return EditorStep::Continue(
                self,
                vec![Reply::system(format!(
                    "Invalid option. Please enter 1-{max}, 'save', or 'cancel'."
                ))],
            );
        };

        let element = self.kind.element();
        match entry.action {
            MenuAction::Title => {
                self.step = EditStep::Title;
                let current = if self.draft.title.is_empty() {
                    "(none)".to_string()
                } else {
                    self.draft.title.clone()
                };
                EditorStep::Continue(
                    self,
                    vec![
                        Reply::mother(format!("Current title: \"{current}\"")),
                        Reply::system("Enter new title:"),
                    ],
                )
            }

            MenuAction::Columns => {
                self.step = EditStep::Columns;
                let current = if self.draft.columns.is_empty() {
                    "(none)".to_string()
                } else {
                    self.draft.columns.join(" | ")
                };
                EditorStep::Continue(
                    self,
                    vec![
                        Reply::mother(format!("Current columns: {current}")),
                        Reply::system("Enter new column names (comma-separated):"),
                    ],
                )
            }

            MenuAction::Add => {
                if self.kind == EntryKind::Table && self.draft.columns.is_empty() {
                    return EditorStep::Continue(
                        self,
                        vec![Reply::system("Please add columns first (option 2).")],
                    );
                }
                self.step = EditStep::AddElement;
                let replies = match self.kind {
                    EntryKind::Table => {
                        let count = self.draft.columns.len();
                        vec![
                            Reply::system(format!(
                                "Enter row values ({count} values, comma-separated):"
                            )),
                            Reply::system(format!(
                                "Columns: {}",
                                self.draft.columns.join(" | ")
                            )),
                        ]
                    }
                    EntryKind::List => vec![Reply::system("Enter the new item to add:")],
                    EntryKind::Timeline => vec![Reply::system(
                        "Enter the new event (TIME - DESCRIPTION or just DESCRIPTION):",
                    )],
                    EntryKind::Image => Vec::new(),
                };
                EditorStep::Continue(self, replies)
            }

            MenuAction::Edit => {
                if self.element_count() == 0 {
                    let add_option = if self.kind == EntryKind::Table { 3 } else { 2 };
                    return EditorStep::Continue(
                        self,
                        vec![Reply::system(format!(
                            "No {element}s to edit. Add {element}s first (option {add_option})."
                        ))],
                    );
                }
                self.step = EditStep::SelectEditElement;
                let mut replies = self.element_listing();
                replies.push(Reply::system(format!("Enter {element} number to edit:")));
                EditorStep::Continue(self, replies)
            }

            MenuAction::Delete => {
                if self.element_count() == 0 {
                    return EditorStep::Continue(
                        self,
                        vec![Reply::system(format!("No {element}s to delete."))],
                    );
                }
                self.step = EditStep::SelectDeleteElement;
                let mut replies = self.element_listing();
                replies.push(Reply::system(format!("Enter {element} number to delete:")));
                EditorStep::Continue(self, replies)
            }

            MenuAction::Reorder => {
                if self.element_count() < 2 {
                    return EditorStep::Continue(
                        self,
                        vec![Reply::system(format!(
                            "Need at least 2 {element}s to reorder."
                        ))],
                    );
                }
                self.step = EditStep::Reorder;
                let mut replies = self.element_listing();
                replies.push(Reply::system(
                    "Enter: [from] to [to] (e.g., '3 to 1' or '3, 1'):",
                ));
                EditorStep::Continue(self, replies)
            }

            MenuAction::Tags => {
                self.step = EditStep::Tags;
                let current = if self.draft.tags.is_empty() {
                    "(none)".to_string()
                } else {
                    self.draft.tags.join(", ")
                };
                EditorStep::Continue(
                    self,
                    vec![
                        Reply::mother(format!("Current tags: {current}")),
                        Reply::system("Enter new tags (comma-separated) or 'clear' to remove all:"),
                    ],
                )
            }

            MenuAction::Category => {
                self.step = EditStep::Category;
                let current = self
                    .draft
                    .category
                    .clone()
                    .unwrap_or_else(|| "(none)".into());
                EditorStep::Continue(
                    self,
                    vec![
                        Reply::mother(format!("Current category: {current}")),
                        Reply::system("Enter new category or 'clear' to remove:"),
                    ],
                )
            }

            MenuAction::Description => {
                self.step = EditStep::Description;
                let current = if self.draft.description.is_empty() {
                    "(none)".to_string()
                } else {
                    self.draft.description.clone()
                };
                EditorStep::Continue(
                    self,
                    vec![
                        Reply::mother(format!("Current description: \"{current}\"")),
                        Reply::system("Enter new description:"),
                    ],
                )
            }

            MenuAction::View => {
                let mut replies = self.preview();
                replies.extend(self.menu_lines());
                EditorStep::Continue(self, replies)
            }
        }
    }

    fn add_element(mut self, trimmed: &str) -> EditorStep {
        match self.kind {
            EntryKind::Table => {
                let values: Vec<String> =
                    trimmed.split(',').map(|v| v.trim().to_string()).collect();
                let expected = self.draft.columns.len();
                if values.len() != expected {
                    let got = values.len();
                    return EditorStep::Continue(
                        self,
                        vec![Reply::system(format!(
                            "Row should have {expected} values (you entered {got}). Try again:"
                        ))],
                    );
                }
                let rendered = values.join(" | ");
                self.draft.rows.push(values);
                let count = self.draft.rows.len();
                let feedback = Reply::mother(format!("Row {count} added: {rendered}"));
                self.back_to_menu(vec![feedback])
            }
            EntryKind::List => {
                self.draft.items.push(trimmed.to_string());
                let feedback = Reply::mother(format!("Item added: \"{trimmed}\""));
                self.back_to_menu(vec![feedback])
            }
            EntryKind::Timeline => {
                let event = split_event(trimmed);
                let display = event.display();
                self.draft.events.push(event);
                let feedback = Reply::mother(format!("Event added: \"{display}\""));
                self.back_to_menu(vec![feedback])
            }
            EntryKind::Image => self.back_to_menu(Vec::new()),
        }
    }

    fn replace_element(mut self, trimmed: &str) -> EditorStep {
        let Some(index) = self.pending_index else {
            return self.back_to_menu(Vec::new());
        };
        match self.kind {
            EntryKind::Table => {
                let values: Vec<String> =
                    trimmed.split(',').map(|v| v.trim().to_string()).collect();
                let expected = self.draft.columns.len();
                if values.len() != expected {
                    return EditorStep::Continue(
                        self,
                        vec![Reply::system(format!(
                            "Row should have {expected} values. Try again:"
                        ))],
                    );
                }
                let rendered = values.join(" | ");
                self.draft.rows[index] = values;
                self.pending_index = None;
                let feedback =
                    Reply::mother(format!("Row {} updated: {rendered}", index + 1));
                self.back_to_menu(vec![feedback])
            }
            EntryKind::List => {
                self.draft.items[index] = trimmed.to_string();
                self.pending_index = None;
                let feedback =
                    Reply::mother(format!("Item {} updated to: \"{trimmed}\"", index + 1));
                self.back_to_menu(vec![feedback])
            }
            EntryKind::Timeline => {
                self.draft.events[index] = split_event(trimmed);
                self.pending_index = None;
                let feedback = Reply::mother(format!("Event {} updated.", index + 1));
                self.back_to_menu(vec![feedback])
            }
            EntryKind::Image => self.back_to_menu(Vec::new()),
        }
    }

    fn edit_element_prompt(&self, index: usize) -> Vec<Reply> {
        match self.kind {
            EntryKind::Table => {
                let row = self.draft.rows[index].join(" | ");
                let count = self.draft.columns.len();
                vec![
                    Reply::mother(format!("Current row {}: {row}", index + 1)),
                    Reply::system(format!(
                        "Enter new values ({count} values, comma-separated):"
                    )),
                ]
            }
            EntryKind::List => vec![
                Reply::mother(format!("Current: \"{}\"", self.draft.items[index])),
                Reply::system("Enter new text for this item:"),
            ],
            EntryKind::Timeline => {
                let event = &self.draft.events[index];
                let display = if event.time.is_empty() {
                    event.description.clone()
                } else {
                    format!("{} - {}", event.time, event.description)
                };
                vec![
                    Reply::mother(format!("Current: \"{display}\"")),
                    Reply::system("Enter new event (TIME - DESCRIPTION or just DESCRIPTION):"),
                ]
            }
            EntryKind::Image => Vec::new(),
        }
    }

    fn element_count(&self) -> usize {
        match self.kind {
            EntryKind::Table => self.draft.rows.len(),
            EntryKind::List => self.draft.items.len(),
            EntryKind::Timeline => self.draft.events.len(),
            EntryKind::Image => 0,
        }
    }

    fn element_listing(&self) -> Vec<Reply> {
        let mut replies = vec![Reply::mother(format!(
            "Current {}s:",
            self.kind.element()
        ))];
        match self.kind {
            EntryKind::Table => {
                for (i, row) in self.draft.rows.iter().enumerate() {
                    replies.push(Reply::system(format!("  {}. {}", i + 1, row.join(" | "))));
                }
            }
            EntryKind::List => {
                for (i, item) in self.draft.items.iter().enumerate() {
                    replies.push(Reply::system(format!("  {}. {item}", i + 1)));
                }
            }
            EntryKind::Timeline => {
                for (i, event) in self.draft.events.iter().enumerate() {
                    replies.push(Reply::system(format!("  {}. {}", i + 1, event.display())));
                }
            }
            EntryKind::Image => {}
        }
        replies
    }

    fn remove_element(&mut self, index: usize) {
        match self.kind {
            EntryKind::Table => {
                self.draft.rows.remove(index);
            }
            EntryKind::List => {
                self.draft.items.remove(index);
            }
            EntryKind::Timeline => {
                self.draft.events.remove(index);
            }
            EntryKind::Image => {}
        }
    }

    /// Remove-then-insert, not a swap: the moved element lands at the
    /// target position and everything between shifts.
    fn move_element(&mut self, from: usize, to: usize) {
        match self.kind {
            EntryKind::Table => {
                let row = self.draft.rows.remove(from);
                self.draft.rows.insert(to, row);
            }
            EntryKind::List => {
                let item = self.draft.items.remove(from);
                self.draft.items.insert(to, item);
            }
            EntryKind::Timeline => {
                let event = self.draft.events.remove(from);
                self.draft.events.insert(to, event);
            }
            EntryKind::Image => {}
        }
    }

    /// Parse a 1-based element index, re-prompting with the valid range
    /// on anything out of bounds or non-numeric.
    fn parse_index(&self, input: &str) -> Result<usize, Reply> {
        let count = self.element_count();
        match input.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => Ok(n - 1),
            _ => Err(Reply::system(format!(
                "Please enter a valid {} number (1-{count}):",
                self.kind.element()
            ))),
        }
    }

    fn preview(&self) -> Vec<Reply> {
        let element = self.kind.element();
        match self.kind {
            EntryKind::Image => {
                let description = if self.draft.description.is_empty() {
                    "(none)".to_string()
                } else {
                    self.draft.description.clone()
                };
                let tags = if self.draft.tags.is_empty() {
                    "(none)".to_string()
                } else {
                    self.draft.tags.join(", ")
                };
                vec![
                    Reply::mother(format!("Image #{}:", self.memory_id)),
                    Reply::system(format!("  Description: {description}")),
                    Reply::system(format!("  Tags: {tags}")),
                    Reply::system("─────────────────────"),
                ]
            }
            kind => {
                let mut replies = vec![
                    Reply::mother(format!("═══ {} Preview ═══", kind.label())),
                    Reply::mother(format!(
                        "Title: {}",
                        if self.draft.title.is_empty() {
                            "(none)"
                        } else {
                            &self.draft.title
                        }
                    )),
                ];
                if kind == EntryKind::Table {
                    replies.push(Reply::mother(format!(
                        "Columns: {}",
                        if self.draft.columns.is_empty() {
                            "(none)".to_string()
                        } else {
                            self.draft.columns.join(" | ")
                        }
                    )));
                }
                if self.element_count() > 0 {
                    replies.push(Reply::mother(format!("{}s:", capitalize(element))));
                    replies.extend(self.element_listing().into_iter().skip(1));
                } else {
                    replies.push(Reply::system(format!("  (no {element}s)")));
                }
                replies.push(Reply::mother(format!(
                    "Tags: {}",
                    if self.draft.tags.is_empty() {
                        "(none)".to_string()
                    } else {
                        self.draft.tags.join(", ")
                    }
                )));
                replies.push(Reply::mother(format!(
                    "Category: {}",
                    self.draft.category.as_deref().unwrap_or("(none)")
                )));
                replies.push(Reply::system("─────────────────────"));
                replies
            }
        }
    }

    fn back_to_menu(mut self, mut replies: Vec<Reply>) -> EditorStep {
        self.step = EditStep::Menu;
        replies.extend(self.menu_lines());
        EditorStep::Continue(self, replies)
    }

    /// The working copy as a store patch. For images the payload is left
    /// alone; the engine mirrors description/tags to the media store.
    fn build_patch(&self) -> MemoryPatch {
        match self.kind {
            EntryKind::Table => MemoryPatch {
                content: Some(self.draft.title.clone()),
                tags: Some(self.draft.tags.clone()),
                category: Some(self.draft.category.clone()),
                payload: Some(Payload::Table {
                    columns: self.draft.columns.clone(),
                    rows: self.draft.rows.clone(),
                }),
            },
            EntryKind::List => MemoryPatch {
                content: Some(self.draft.title.clone()),
                tags: Some(self.draft.tags.clone()),
                category: Some(self.draft.category.clone()),
                payload: Some(Payload::List {
                    items: self.draft.items.clone(),
                }),
            },
            EntryKind::Timeline => MemoryPatch {
                content: Some(self.draft.title.clone()),
                tags: Some(self.draft.tags.clone()),
                category: Some(self.draft.category.clone()),
                payload: Some(Payload::Timeline {
                    events: self.draft.events.clone(),
                }),
            },
            EntryKind::Image => MemoryPatch {
                content: Some(self.draft.description.clone()),
                tags: Some(self.draft.tags.clone()),
                ..MemoryPatch::default()
            },
        }
    }

    /// Description/tags pair mirrored to the media store on save.
    pub fn media_update(&self) -> (String, Vec<String>) {
        (self.draft.description.clone(), self.draft.tags.clone())
    }
}

/// Parse "`3 to 1`", "`3, 1`", or "`3 1`" into a (from, to) pair.
fn parse_reorder(input: &str) -> Option<(usize, usize)> {
    let cleaned = input.to_ascii_lowercase().replace(',', " ");
    let mut numbers = cleaned.split_whitespace().filter(|t| *t != "to");
    let from = numbers.next()?.parse().ok()?;
    let to = numbers.next()?.parse().ok()?;
    Some((from, to))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
