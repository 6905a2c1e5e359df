use crate::dialogue::event::split_event;
use crate::types::{NewMemory, Payload, Reply, TimelineEvent};

/// The four structured entry kinds that get multi-turn builder and editor
/// flows. Plain text memories are created in a single turn and never
/// reach these engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Table,
    List,
    Timeline,
    Image,
}

impl EntryKind {
    /// Lowercase noun used in prompts ("Enter a category for this table").
    pub fn noun(self) -> &'static str {
        match self {
            EntryKind::Table => "table",
            EntryKind::List => "list",
            EntryKind::Timeline => "timeline",
            EntryKind::Image => "image",
        }
    }

    /// Capitalized label used in feedback ("Table created successfully!").
    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Table => "Table",
            EntryKind::List => "List",
            EntryKind::Timeline => "Timeline",
            EntryKind::Image => "Image",
        }
    }

    /// Noun for one repeated element of this kind.
    pub fn element(self) -> &'static str {
        match self {
            EntryKind::Table => "row",
            EntryKind::List => "item",
            EntryKind::Timeline => "event",
            EntryKind::Image => "field",
        }
    }

    /// Ordered step table for the builder flow of this kind.
    pub fn build_steps(self) -> &'static [StepSpec] {
        const TABLE: &[StepSpec] = &[
            StepSpec::skippable(BuildStep::Title),
            StepSpec::required(BuildStep::Columns),
            StepSpec::required(BuildStep::Elements),
            StepSpec::skippable(BuildStep::Tags),
            StepSpec::skippable(BuildStep::Category),
        ];
        const LIST: &[StepSpec] = &[
            StepSpec::skippable(BuildStep::Title),
            StepSpec::required(BuildStep::Elements),
            StepSpec::skippable(BuildStep::Tags),
            StepSpec::skippable(BuildStep::Category),
        ];
        const IMAGE: &[StepSpec] = &[
            StepSpec::required(BuildStep::FileSelect),
            StepSpec::skippable(BuildStep::Description),
            StepSpec::skippable(BuildStep::Tags),
            StepSpec::skippable(BuildStep::Album),
            StepSpec::required(BuildStep::ConfirmUpload),
        ];
        match self {
            EntryKind::Table => TABLE,
            EntryKind::List | EntryKind::Timeline => LIST,
            EntryKind::Image => IMAGE,
        }
    }
}

/// One step of a builder flow. `Elements` is the unbounded repeat step
/// (rows/items/events) terminated by `done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Title,
    Columns,
    Elements,
    FileSelect,
    Description,
    Album,
    ConfirmUpload,
    Tags,
    Category,
}

#[derive(Debug, Clone, Copy)]
pub struct StepSpec {
    pub step: BuildStep,
    pub skippable: bool,
}

impl StepSpec {
    const fn skippable(step: BuildStep) -> Self {
        Self {
            step,
            skippable: true,
        }
    }
    const fn required(step: BuildStep) -> Self {
        Self {
            step,
            skippable: false,
        }
    }
}

/// Accumulator for an in-progress builder or editor flow. Fields unused
/// by a kind stay at their defaults.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub items: Vec<String>,
    pub events: Vec<TimelineEvent>,
    pub description: String,
    pub album: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub file: Option<PendingFile>,
}

/// Raw bytes of an image picked out-of-band by the front end.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A builder flow that collects fields for one new structured memory
/// over multiple turns. Exactly one may be active per session; while
/// active it consumes every input line.
#[derive(Debug, Clone)]
pub struct BuilderSession {
    kind: EntryKind,
    step_idx: usize,
    draft: Draft,
}

/// Result of feeding one input line to a builder.
pub enum BuilderStep {
    Continue(BuilderSession, Vec<Reply>),
    Cancelled(Vec<Reply>),
    Finished(FinishedBuild, Vec<Reply>),
}

/// What a completed builder hands back for persistence. The engine owns
/// the store calls; the builder never touches the store itself.
pub enum FinishedBuild {
    Entry(NewMemory),
    Upload {
        file: PendingFile,
        description: String,
        tags: Vec<String>,
        album: Option<String>,
    },
}

impl BuilderSession {
    /// Start a table/list/timeline builder and return its opening prompt.
    pub fn start(kind: EntryKind) -> (Self, Vec<Reply>) {
        let session = Self {
            kind,
            step_idx: 0,
            draft: Draft::default(),
        };
        let replies = session.prompts_for_current();
        (session, replies)
    }

    /// Start an image builder, optionally pre-filled from a
    /// `save picture description: "..." tags: ...` command line.
    pub fn start_image(description: Option<String>, tags: Vec<String>) -> (Self, Vec<Reply>) {
        let mut session = Self {
            kind: EntryKind::Image,
            step_idx: 0,
            draft: Draft::default(),
        };
        if let Some(description) = description {
            session.draft.description = description;
        }
        session.draft.tags = tags;
        let replies = session.prompts_for_current();
        (session, replies)
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// True while the image builder is waiting for a file-selection event.
    pub fn awaiting_file(&self) -> bool {
        self.current().step == BuildStep::FileSelect
    }

    /// Deliver the out-of-band file selection. Only meaningful while
    /// `awaiting_file`; otherwise the session is unchanged.
    pub fn attach_file(&mut self, name: &str, bytes: Vec<u8>) -> Vec<Reply> {
        if !self.awaiting_file() {
            return vec![Reply::system(
                "No image upload is waiting for a file right now.",
            )];
        }
        self.draft.file = Some(PendingFile {
            name: name.to_string(),
            bytes,
        });
        self.step_idx += 1;
        let mut replies = vec![Reply::mother(format!("Image selected: {name}"))];
        replies.extend(self.prompts_for_current());
        replies
    }

    /// Feed one input line to the flow.
    pub fn step(mut self, input: &str) -> BuilderStep {
        let trimmed = input.trim();
        let lower = trimmed.to_ascii_lowercase();

        // cancel/exit abort at every step
        if lower == "cancel" || lower == "exit" {
            return BuilderStep::Cancelled(vec![Reply::mother(self.cancel_message())]);
        }

        let spec = *self.current();
        if spec.skippable && lower == "skip" {
            // Category is the last step of the entry flows, so a skip
            // there completes the build instead of advancing.
            if spec.step == BuildStep::Category {
                return self.finish();
            }
            return self.advance(Vec::new());
        }

        match spec.step {
            BuildStep::Title => {
                self.draft.title = trimmed.to_string();
                self.advance(Vec::new())
            }

            BuildStep::Columns => {
                let columns: Vec<String> = trimmed
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
                if columns.is_empty() {
                    return BuilderStep::Continue(
                        self,
                        vec![Reply::system("Please enter at least one column name.")],
                    );
                }
                let heading = columns.join(" | ");
                self.draft.columns = columns;
                self.advance(vec![Reply::mother(format!("Columns: {heading}"))])
            }

            BuildStep::Elements => self.element_step(trimmed, &lower),

            BuildStep::FileSelect => BuilderStep::Continue(
                self,
                vec![Reply::system("Please select an image file to continue.")],
            ),

            BuildStep::Description => {
                self.draft.description = trimmed.to_string();
                self.advance(Vec::new())
            }

            BuildStep::Tags => {
                self.draft.tags = trimmed
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                self.advance(Vec::new())
            }

            BuildStep::Album => {
                self.draft.album = Some(trimmed.to_string());
                self.advance(Vec::new())
            }

            BuildStep::Category => {
                self.draft.category = Some(trimmed.to_string());
                self.finish()
            }

            BuildStep::ConfirmUpload => {
                if lower == "save" || lower == "yes" || lower == "y" {
                    self.finish()
                } else {
                    // anything else discards the pending upload
                    BuilderStep::Cancelled(vec![Reply::mother("Image upload cancelled.")])
                }
            }
        }
    }

    /// Handle the repeated-element step: `done` closes it (requiring at
    /// least one element), anything else is an element literal — even
    /// text that would parse as a command elsewhere.
    fn element_step(mut self, trimmed: &str, lower: &str) -> BuilderStep {
        if lower == "done" {
            if self.element_count() == 0 {
                let noun = match self.kind {
                    EntryKind::Table => "row of data",
                    EntryKind::List => "item to the list",
                    EntryKind::Timeline => "event to the timeline",
                    EntryKind::Image => "field",
                };
                return BuilderStep::Continue(
                    self,
                    vec![Reply::system(format!("Please add at least one {noun}."))],
                );
            }
            return self.advance(Vec::new());
        }

        match self.kind {
            EntryKind::Table => {
                let values: Vec<String> =
                    trimmed.split(',').map(|v| v.trim().to_string()).collect();
                let expected = self.draft.columns.len();
                if values.len() != expected {
                    let got = values.len();
                    return BuilderStep::Continue(
                        self,
                        vec![Reply::system(format!(
                            "Row should have {expected} values (you entered {got}). Try again:"
                        ))],
                    );
                }
                let rendered = values.join(" | ");
                self.draft.rows.push(values);
                let count = self.draft.rows.len();
                BuilderStep::Continue(
                    self,
                    vec![
                        Reply::mother(format!("Row {count} added: {rendered}")),
                        Reply::system("Enter next row or type 'done' to finish:"),
                    ],
                )
            }

            EntryKind::List => {
                self.draft.items.push(trimmed.to_string());
                let count = self.draft.items.len();
                BuilderStep::Continue(
                    self,
                    vec![
                        Reply::mother(format!("  {count}. {trimmed}")),
                        Reply::system("Add another item or type 'done' to finish:"),
                    ],
                )
            }

            EntryKind::Timeline => {
                let event = split_event(trimmed);
                let display = event.display();
                self.draft.events.push(event);
                let count = self.draft.events.len();
                BuilderStep::Continue(
                    self,
                    vec![
                        Reply::mother(format!("  {count}. {display}")),
                        Reply::system("Add another event or type 'done' to finish:"),
                    ],
                )
            }

            EntryKind::Image => BuilderStep::Continue(self, Vec::new()),
        }
    }

    fn advance(mut self, mut replies: Vec<Reply>) -> BuilderStep {
        self.step_idx += 1;
        replies.extend(self.prompts_for_current());
        BuilderStep::Continue(self, replies)
    }

    fn finish(self) -> BuilderStep {
        let kind = self.kind;
        let draft = self.draft;
        let build = match kind {
            EntryKind::Image => FinishedBuild::Upload {
                file: draft.file.unwrap_or(PendingFile {
                    name: String::new(),
                    bytes: Vec::new(),
                }),
                description: draft.description,
                tags: draft.tags,
                album: draft.album,
            },
            _ => {
                let payload = match kind {
                    EntryKind::Table => Payload::Table {
                        columns: draft.columns,
                        rows: draft.rows,
                    },
                    EntryKind::List => Payload::List { items: draft.items },
                    EntryKind::Timeline => Payload::Timeline {
                        events: draft.events,
                    },
                    EntryKind::Image => unreachable!(),
                };
                let content = if draft.title.is_empty() {
                    kind.label().to_string()
                } else {
                    draft.title
                };
                FinishedBuild::Entry(NewMemory {
                    content,
                    category: draft.category,
                    tags: draft.tags,
                    payload,
                })
            }
        };
        BuilderStep::Finished(build, Vec::new())
    }

    fn current(&self) -> &'static StepSpec {
        &self.kind.build_steps()[self.step_idx]
    }

    fn cancel_message(&self) -> String {
        match self.kind {
            EntryKind::Image => "Image upload cancelled.".to_string(),
            kind => format!("{} creation cancelled.", kind.label()),
        }
    }

    /// The prompt the user sees on entering the current step.
    fn prompts_for_current(&self) -> Vec<Reply> {
        match (self.kind, self.current().step) {
            (EntryKind::Table, BuildStep::Title) => vec![Reply::mother(
                "Let's create a table! First, what's the title/heading for this table? \
                 (or type 'skip' to skip)",
            )],
            (EntryKind::List, BuildStep::Title) => vec![Reply::mother(
                "Let's create a list! First, what's the title for this list? (or type 'skip')",
            )],
            (EntryKind::Timeline, BuildStep::Title) => vec![Reply::mother(
                "Let's create a timeline! First, what's the title for this timeline? \
                 (or type 'skip')",
            )],

            (_, BuildStep::Columns) => vec![Reply::mother(
                "Enter column names separated by commas (e.g., Name, Age, City):",
            )],

            (EntryKind::Table, BuildStep::Elements) => {
                let count = self.draft.columns.len();
                vec![
                    Reply::mother(format!(
                        "Now enter row data. Each row should have {count} values \
                         separated by commas."
                    )),
                    Reply::mother("Type 'done' when finished adding rows."),
                ]
            }
            (EntryKind::List, BuildStep::Elements) => vec![
                Reply::mother("Now add your list items. Enter one item at a time."),
                Reply::system("Type 'done' when finished adding items."),
            ],
            (EntryKind::Timeline, BuildStep::Elements) => vec![
                Reply::mother("Now add your timeline events."),
                Reply::system(
                    "Format: TIME - DESCRIPTION (e.g., '9:00 AM - Wake up' or just \
                     'Morning - Wake up')",
                ),
                Reply::system("Type 'done' when finished adding events."),
            ],

            (EntryKind::Image, BuildStep::FileSelect) => vec![
                Reply::mother("Let's save a picture!"),
                Reply::system("Please select an image file to continue."),
            ],
            (_, BuildStep::Description) => vec![Reply::system(
                "Enter a description for this image (or type 'skip'):",
            )],
            (EntryKind::Image, BuildStep::Tags) => {
                vec![Reply::system("Add tags (comma-separated) or type 'skip':")]
            }
            (kind, BuildStep::Tags) => vec![Reply::mother(format!(
                "Add tags for this {} (comma-separated, or 'skip'):",
                kind.noun()
            ))],
            (_, BuildStep::Album) => {
                vec![Reply::system("Enter an album name (or type 'skip'):")]
            }
            (kind, BuildStep::Category) => vec![Reply::mother(format!(
                "Enter a category for this {} (or 'skip'):",
                kind.noun()
            ))],

            (_, BuildStep::ConfirmUpload) => {
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
                let album = self.draft.album.clone().unwrap_or_else(|| "(none)".into());
                vec![
                    Reply::mother("Ready to upload the image with the following:"),
                    Reply::system(format!("  Description: {description}")),
                    Reply::system(format!("  Tags: {tags}")),
                    Reply::system(format!("  Album: {album}")),
                    Reply::system("Type 'save' to upload or 'cancel' to abort."),
                ]
            }

            _ => Vec::new(),
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
}
