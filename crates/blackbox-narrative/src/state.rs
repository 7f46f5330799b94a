use serde::Serialize;

/// Which screen the user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViewKind {
    Selection,
    ActView,
}

/// Display toggles that survive case switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UiFlags {
    pub debug_visible: bool,
    pub modal_visible: bool,
}

/// Position of the user within the narrative.
///
/// `case_id` is `Some` exactly when `view` is `ActView`; `act` starts at 1 and
/// `sub_stage` returns to 0 whenever `act` changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrativeState {
    pub(crate) view: ViewKind,
    pub(crate) case_id: Option<String>,
    pub(crate) act: u32,
    pub(crate) sub_stage: u32,
    pub(crate) flags: UiFlags,
}

impl Default for NarrativeState {
    fn default() -> Self {
        Self {
            view: ViewKind::Selection,
            case_id: None,
            act: 1,
            sub_stage: 0,
            flags: UiFlags::default(),
        }
    }
}

impl NarrativeState {
    #[must_use]
    pub fn view(&self) -> ViewKind {
        self.view
    }

    #[must_use]
    pub fn case_id(&self) -> Option<&str> {
        self.case_id.as_deref()
    }

    #[must_use]
    pub fn act(&self) -> u32 {
        self.act
    }

    #[must_use]
    pub fn sub_stage(&self) -> u32 {
        self.sub_stage
    }

    #[must_use]
    pub fn flags(&self) -> UiFlags {
        self.flags
    }
}

/// Snapshot for debug display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSummary {
    pub view: ViewKind,
    pub case_id: Option<String>,
    pub act: u32,
    pub total_acts: Option<u32>,
    pub sub_stage: u32,
    pub context_keys: Vec<String>,
    pub tool_unlocked: bool,
    pub debug_visible: bool,
    pub modal_visible: bool,
}
